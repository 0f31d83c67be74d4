use crate::error::Result;
use crate::http::envelope::Envelope;
use super::coordinator::ensure_coordinates;
use crate::http::guard::{CurrentUser, Role};
use crate::http::sanitize::SanitizedJson;
use crate::model::*;
use crate::store::{BatchReport, PanelAssignment, Store};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub panel_id: PanelId,
    pub project_id: ProjectId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoCreateRequest {
    pub departments: Vec<String>,
    pub school: String,
    pub academic_year: String,
    pub panel_size: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembersRequest {
    #[serde(default)]
    pub member_employee_ids: Vec<String>,
}

/// `GET /admin/panels`
pub async fn list(State(store): State<Store>, Query(filter): Query<PanelFilter>) -> Result<Envelope<Vec<Panel>>> {
    Ok(Envelope::list(store.list_panels(&filter).await?))
}

/// `POST /admin/panels`; coordinators may only create panels in scopes they
/// coordinate.
pub async fn create(
    State(store): State<Store>,
    user: CurrentUser,
    SanitizedJson(new): SanitizedJson<NewPanel>,
) -> Result<(StatusCode, Envelope<Panel>)> {
    if user.role == Role::ProjectCoordinator {
        ensure_coordinates(&store, &user, &new.scope).await?;
    }
    let panel = store.create_panel(new, Some(&user.employee_id)).await?;
    Ok((
        StatusCode::CREATED,
        Envelope::data(panel).with_message("Panel created successfully."),
    ))
}

/// `POST /admin/panels/assign`; coordinators are held to their own scopes.
pub async fn assign(
    State(store): State<Store>,
    user: CurrentUser,
    SanitizedJson(body): SanitizedJson<AssignRequest>,
) -> Result<Envelope<PanelAssignment>> {
    if user.role == Role::ProjectCoordinator {
        let project = store.project(body.project_id).await?;
        ensure_coordinates(&store, &user, &project.scope).await?;
    }
    let assigned = store
        .assign_panel_to_project(body.panel_id, body.project_id, Some(&user.employee_id))
        .await?;
    Ok(Envelope::data(assigned).with_message("Panel assigned successfully."))
}

/// `POST /admin/panels/auto-create`
pub async fn auto_create(
    State(store): State<Store>,
    user: CurrentUser,
    SanitizedJson(body): SanitizedJson<AutoCreateRequest>,
) -> Result<Envelope<BatchReport>> {
    let panel_size = body.panel_size.unwrap_or(store.defaults().default_size);
    let report = store
        .auto_create_panels(
            &body.departments,
            &body.school,
            &body.academic_year,
            panel_size,
            Some(&user.employee_id),
            false,
        )
        .await?;
    let message = format!("Created {} panels.", report.created.unwrap_or(0));
    Ok(Envelope::data(report).with_message(message))
}

/// `POST /admin/panels/auto-assign`
pub async fn auto_assign(
    State(store): State<Store>,
    user: CurrentUser,
    SanitizedJson(scope): SanitizedJson<Scope>,
) -> Result<Envelope<BatchReport>> {
    let report = store
        .auto_assign_panels(&scope, Some(&user.employee_id), false)
        .await?;
    let message = format!("Assigned {} projects.", report.assigned.unwrap_or(0));
    Ok(Envelope::data(report).with_message(message))
}

/// `PUT /admin/panels/{id}`
pub async fn update(
    State(store): State<Store>,
    Path(id): Path<i64>,
    SanitizedJson(update): SanitizedJson<PanelUpdate>,
) -> Result<Envelope<Panel>> {
    let panel = store.update_panel(PanelId(id), update).await?;
    Ok(Envelope::data(panel).with_message("Panel updated successfully."))
}

/// `PUT /admin/panels/{id}/members`
pub async fn update_members(
    State(store): State<Store>,
    user: CurrentUser,
    Path(id): Path<i64>,
    SanitizedJson(body): SanitizedJson<MembersRequest>,
) -> Result<Envelope<Panel>> {
    let panel = store
        .update_panel_members(PanelId(id), &body.member_employee_ids, Some(&user.employee_id))
        .await?;
    Ok(Envelope::data(panel).with_message("Panel members updated successfully."))
}

/// `DELETE /admin/panels/{id}`
pub async fn delete(State(store): State<Store>, user: CurrentUser, Path(id): Path<i64>) -> Result<Envelope<()>> {
    store.delete_panel(PanelId(id), Some(&user.employee_id)).await?;
    Ok(Envelope::message("Panel deleted successfully."))
}
