use super::admin::ProjectQuery;
use super::panels::AssignRequest;
use crate::error::{Error, Result};
use crate::http::envelope::Envelope;
use crate::http::guard::CurrentUser;
use crate::http::sanitize::SanitizedJson;
use crate::model::*;
use crate::store::{PanelAssignment, Store};
use axum::extract::{Path, Query, State};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReassignGuide {
    pub guide_employee_id: String,
}

/// Scopes the calling coordinator is responsible for.
async fn scopes_of(store: &Store, user: &CurrentUser) -> Result<Vec<Scope>> {
    let faculty = store.faculty(&user.employee_id).await?;
    store.coordinated_scopes(faculty.id).await
}

pub(super) async fn ensure_coordinates(store: &Store, user: &CurrentUser, scope: &Scope) -> Result<()> {
    if scopes_of(store, user).await?.contains(scope) {
        Ok(())
    } else {
        Err(Error::Forbidden("Access denied.".into()))
    }
}

/// `GET /project-coordinator/projects`
pub async fn list_projects(
    State(store): State<Store>,
    user: CurrentUser,
    Query(query): Query<ProjectQuery>,
) -> Result<Envelope<Vec<Project>>> {
    let scopes = scopes_of(&store, &user).await?;
    let filter = query.resolve(&store).await?;
    let projects = store
        .list_projects(&filter)
        .await?
        .into_iter()
        .filter(|p| scopes.contains(&p.scope))
        .collect();
    Ok(Envelope::list(projects))
}

/// `PUT /project-coordinator/projects/{id}/reassign-guide`
pub async fn reassign_guide(
    State(store): State<Store>,
    user: CurrentUser,
    Path(id): Path<i64>,
    SanitizedJson(body): SanitizedJson<ReassignGuide>,
) -> Result<Envelope<Project>> {
    let project = store.project(ProjectId(id)).await?;
    ensure_coordinates(&store, &user, &project.scope).await?;
    let project = store.reassign_guide(project.id, &body.guide_employee_id).await?;
    Ok(Envelope::data(project).with_message("Guide reassigned successfully."))
}

/// `POST /project-coordinator/panels/assign`
pub async fn assign_panel(
    State(store): State<Store>,
    user: CurrentUser,
    SanitizedJson(body): SanitizedJson<AssignRequest>,
) -> Result<Envelope<PanelAssignment>> {
    let project = store.project(body.project_id).await?;
    ensure_coordinates(&store, &user, &project.scope).await?;
    let assigned = store
        .assign_panel_to_project(body.panel_id, project.id, Some(&user.employee_id))
        .await?;
    Ok(Envelope::data(assigned).with_message("Panel assigned successfully."))
}
