use crate::error::{Error, Result};
use crate::http::envelope::Envelope;
use crate::http::guard::CurrentUser;
use crate::http::sanitize::SanitizedJson;
use crate::model::*;
use crate::store::{BatchReport, Store};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

// Faculty

/// `GET /admin/faculty`
pub async fn list_faculty(
    State(store): State<Store>,
    Query(filter): Query<FacultyFilter>,
) -> Result<Envelope<Vec<Faculty>>> {
    Ok(Envelope::list(store.list_faculty(&filter).await?))
}

/// `POST /admin/faculty`
pub async fn create_faculty(
    State(store): State<Store>,
    SanitizedJson(new): SanitizedJson<NewFaculty>,
) -> Result<(StatusCode, Envelope<Faculty>)> {
    let faculty = store
        .create_faculty(NewFaculty {
            role: FacultyRole::Faculty,
            ..new
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Envelope::data(faculty).with_message("Faculty created successfully."),
    ))
}

/// `POST /admin/admins`
pub async fn create_admin(
    State(store): State<Store>,
    SanitizedJson(new): SanitizedJson<NewFaculty>,
) -> Result<(StatusCode, Envelope<Faculty>)> {
    let admin = store
        .create_faculty(NewFaculty {
            role: FacultyRole::Admin,
            ..new
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Envelope::data(admin).with_message("Admin created successfully."),
    ))
}

/// `POST /admin/faculty/bulk`
pub async fn create_faculty_bulk(
    State(store): State<Store>,
    SanitizedJson(rows): SanitizedJson<Vec<NewFaculty>>,
) -> Result<Envelope<BatchReport>> {
    let report = store.create_faculty_bulk(rows).await?;
    let message = format!("Created {} faculty members.", report.created.unwrap_or(0));
    Ok(Envelope::data(report).with_message(message))
}

/// `PUT /admin/faculty/{employeeId}`
pub async fn update_faculty(
    State(store): State<Store>,
    Path(employee_id): Path<String>,
    SanitizedJson(update): SanitizedJson<FacultyUpdate>,
) -> Result<Envelope<Faculty>> {
    let faculty = store.update_faculty(&employee_id, update).await?;
    Ok(Envelope::data(faculty).with_message("Faculty updated successfully."))
}

/// `DELETE /admin/faculty/{employeeId}`
pub async fn delete_faculty(State(store): State<Store>, Path(employee_id): Path<String>) -> Result<Envelope<()>> {
    store.delete_faculty(&employee_id).await?;
    Ok(Envelope::message("Faculty deleted successfully."))
}

// Students

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentUpload {
    #[serde(flatten)]
    pub scope: Scope,
    pub students: Vec<StudentRow>,
}

/// `GET /admin/students`
pub async fn list_students(
    State(store): State<Store>,
    Query(filter): Query<StudentFilter>,
) -> Result<Envelope<Vec<Student>>> {
    Ok(Envelope::list(store.list_students(&filter).await?))
}

/// `POST /admin/students`
pub async fn upload_students(
    State(store): State<Store>,
    SanitizedJson(upload): SanitizedJson<StudentUpload>,
) -> Result<Envelope<BatchReport>> {
    let report = store.upsert_students(upload.students, &upload.scope).await?;
    let message = format!(
        "{} students created, {} updated.",
        report.created.unwrap_or(0),
        report.updated.unwrap_or(0)
    );
    Ok(Envelope::data(report).with_message(message))
}

// Projects

/// Project listing filters as sent by clients: the guide is given by
/// employee id.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectQuery {
    pub academic_year: Option<String>,
    pub school: Option<String>,
    pub department: Option<String>,
    pub status: Option<ProjectStatus>,
    pub guide: Option<String>,
    pub panel_id: Option<i64>,
}

impl ProjectQuery {
    pub async fn resolve(self, store: &Store) -> Result<ProjectFilter> {
        let guide_faculty = match &self.guide {
            Some(employee_id) => Some(store.faculty(employee_id).await?.id),
            None => None,
        };
        Ok(ProjectFilter {
            academic_year: self.academic_year,
            school: self.school,
            department: self.department,
            status: self.status,
            guide_faculty,
            panel: self.panel_id.map(PanelId),
        })
    }
}

/// `GET /admin/projects`
pub async fn list_projects(
    State(store): State<Store>,
    Query(query): Query<ProjectQuery>,
) -> Result<Envelope<Vec<Project>>> {
    let filter = query.resolve(&store).await?;
    Ok(Envelope::list(store.list_projects(&filter).await?))
}

/// `POST /admin/projects`
pub async fn create_project(
    State(store): State<Store>,
    SanitizedJson(new): SanitizedJson<NewProject>,
) -> Result<(StatusCode, Envelope<Project>)> {
    let project = store.create_project(new).await?;
    Ok((
        StatusCode::CREATED,
        Envelope::data(project).with_message("Project created successfully."),
    ))
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BestProject {
    pub project_id: ProjectId,
    pub best_project: bool,
}

/// `PATCH /admin/projects/{id}/best`
pub async fn toggle_best_project(State(store): State<Store>, Path(id): Path<i64>) -> Result<Envelope<BestProject>> {
    let best_project = store.toggle_best_project(ProjectId(id)).await?;
    Ok(Envelope::data(BestProject {
        project_id: ProjectId(id),
        best_project,
    }))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: ProjectStatus,
}

/// `PATCH /admin/projects/{id}/status`
pub async fn set_project_status(
    State(store): State<Store>,
    Path(id): Path<i64>,
    SanitizedJson(update): SanitizedJson<StatusUpdate>,
) -> Result<Envelope<Project>> {
    let project = store.set_project_status(ProjectId(id), update.status).await?;
    Ok(Envelope::data(project).with_message("Project status updated successfully."))
}

// Scope configuration

/// `GET /admin/department-config`
pub async fn department_config(
    State(store): State<Store>,
    Query(scope): Query<Scope>,
) -> Result<Envelope<DepartmentConfig>> {
    Ok(Envelope::data(store.require_department_config(&scope).await?))
}

/// `PUT /admin/department-config`
pub async fn save_department_config(
    State(store): State<Store>,
    SanitizedJson(config): SanitizedJson<DepartmentConfig>,
) -> Result<Envelope<DepartmentConfig>> {
    let config = store.upsert_department_config(config).await?;
    Ok(Envelope::data(config).with_message("Department configuration saved."))
}

/// `GET /admin/marking-schema`
pub async fn marking_schema(State(store): State<Store>, Query(scope): Query<Scope>) -> Result<Envelope<MarkingSchema>> {
    Ok(Envelope::data(store.marking_schema(&scope).await?))
}

/// `PUT /admin/marking-schema`
pub async fn save_marking_schema(
    State(store): State<Store>,
    SanitizedJson(schema): SanitizedJson<MarkingSchema>,
) -> Result<Envelope<MarkingSchema>> {
    let schema = store.upsert_marking_schema(schema).await?;
    Ok(Envelope::data(schema).with_message("Marking schema saved."))
}

// Requests

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestQuery {
    pub status: Option<RequestStatus>,
    pub employee_id: Option<String>,
}

/// `GET /admin/requests`
pub async fn list_requests(
    State(store): State<Store>,
    Query(query): Query<RequestQuery>,
) -> Result<Envelope<Vec<Request>>> {
    let faculty = match &query.employee_id {
        Some(employee_id) => Some(store.faculty(employee_id).await?.id),
        None => None,
    };
    let filter = RequestFilter {
        status: query.status,
        faculty,
    };
    Ok(Envelope::list(store.list_requests(&filter).await?))
}

/// `PUT /admin/requests/{id}`
pub async fn decide_request(
    State(store): State<Store>,
    user: CurrentUser,
    Path(id): Path<i64>,
    SanitizedJson(decision): SanitizedJson<RequestDecision>,
) -> Result<Envelope<Request>> {
    let admin = store.faculty(&user.employee_id).await?;
    let request = store.decide_request(RequestId(id), decision, &admin).await?;
    let message = format!("Request {} successfully.", request.status.as_str());
    Ok(Envelope::data(request).with_message(message))
}

// Broadcasts

/// `GET /admin/broadcasts`
pub async fn list_broadcasts(
    State(store): State<Store>,
    Query(filter): Query<BroadcastFilter>,
) -> Result<Envelope<Vec<Broadcast>>> {
    Ok(Envelope::list(store.list_broadcasts(&filter).await?))
}

/// `POST /admin/broadcasts`
pub async fn create_broadcast(
    State(store): State<Store>,
    user: CurrentUser,
    SanitizedJson(new): SanitizedJson<NewBroadcast>,
) -> Result<(StatusCode, Envelope<Broadcast>)> {
    let creator = store.faculty(&user.employee_id).await?;
    let broadcast = store.create_broadcast(&creator, new).await?;
    Ok((
        StatusCode::CREATED,
        Envelope::data(broadcast).with_message("Broadcast created successfully."),
    ))
}

/// `PUT /admin/broadcasts/{id}`
pub async fn update_broadcast(
    State(store): State<Store>,
    Path(id): Path<i64>,
    SanitizedJson(update): SanitizedJson<BroadcastUpdate>,
) -> Result<Envelope<Broadcast>> {
    let broadcast = store.update_broadcast(BroadcastId(id), update).await?;
    Ok(Envelope::data(broadcast).with_message("Broadcast updated successfully."))
}

/// `DELETE /admin/broadcasts/{id}`
pub async fn delete_broadcast(State(store): State<Store>, Path(id): Path<i64>) -> Result<Envelope<()>> {
    store.delete_broadcast(BroadcastId(id)).await?;
    Ok(Envelope::message("Broadcast deleted successfully."))
}

// Coordinators

/// `GET /admin/coordinators`
pub async fn list_coordinators(
    State(store): State<Store>,
    Query(filter): Query<ScopeFilter>,
) -> Result<Envelope<Vec<ProjectCoordinator>>> {
    Ok(Envelope::list(store.list_coordinators(&filter).await?))
}

/// `POST /admin/coordinators`
pub async fn assign_coordinator(
    State(store): State<Store>,
    SanitizedJson(new): SanitizedJson<NewCoordinator>,
) -> Result<(StatusCode, Envelope<ProjectCoordinator>)> {
    if new.employee_id.is_empty() {
        return Err(Error::validation("Employee ID is required."));
    }
    let coordinator = store.assign_coordinator(new).await?;
    Ok((
        StatusCode::CREATED,
        Envelope::data(coordinator).with_message("Coordinator assigned successfully."),
    ))
}

/// `DELETE /admin/coordinators/{id}`
pub async fn remove_coordinator(State(store): State<Store>, Path(id): Path<i64>) -> Result<Envelope<()>> {
    store.remove_coordinator(id).await?;
    Ok(Envelope::message("Coordinator removed successfully."))
}
