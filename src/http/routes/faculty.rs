use crate::error::Result;
use crate::http::envelope::Envelope;
use crate::http::guard::CurrentUser;
use crate::http::sanitize::SanitizedJson;
use crate::marking::TeamSubmission;
use crate::model::*;
use crate::store::{SavedMarks, Store};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

/// `GET /faculty/marking-schema`
pub async fn marking_schema(State(store): State<Store>, Query(scope): Query<Scope>) -> Result<Envelope<MarkingSchema>> {
    Ok(Envelope::data(store.marking_schema(&scope).await?))
}

/// `GET /faculty/broadcasts`: active broadcasts for the caller. Without an
/// explicit audience the caller's first school and department are used.
pub async fn broadcasts(
    State(store): State<Store>,
    user: CurrentUser,
    Query(audience): Query<Audience>,
) -> Result<Envelope<Vec<Broadcast>>> {
    let faculty = store.faculty(&user.employee_id).await?;
    let audience = Audience {
        school: audience.school.or_else(|| faculty.schools.first().cloned()),
        department: audience.department.or_else(|| faculty.departments.first().cloned()),
        academic_year: audience.academic_year,
    };
    Ok(Envelope::list(store.active_broadcasts_for(audience).await?))
}

/// `POST /faculty/requests`
pub async fn create_request(
    State(store): State<Store>,
    user: CurrentUser,
    SanitizedJson(new): SanitizedJson<NewRequest>,
) -> Result<(StatusCode, Envelope<Request>)> {
    let faculty = store.faculty(&user.employee_id).await?;
    let request = store.create_request(&faculty, new).await?;
    Ok((
        StatusCode::CREATED,
        Envelope::data(request).with_message("Request submitted successfully."),
    ))
}

/// `POST /faculty/marks`
pub async fn save_marks(
    State(store): State<Store>,
    user: CurrentUser,
    SanitizedJson(submission): SanitizedJson<TeamSubmission>,
) -> Result<Envelope<SavedMarks>> {
    let faculty = store.faculty(&user.employee_id).await?;
    let saved = store.save_team_marks(&faculty, submission).await?;
    Ok(Envelope::data(saved).with_message("Marks saved successfully."))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarksQuery {
    pub project_id: i64,
    pub review: String,
}

/// `GET /faculty/marks`
pub async fn marks(
    State(store): State<Store>,
    user: CurrentUser,
    Query(query): Query<MarksQuery>,
) -> Result<Envelope<Option<TeamSubmission>>> {
    let faculty = store.faculty(&user.employee_id).await?;
    let saved = store
        .team_marks(&faculty, ProjectId(query.project_id), &query.review)
        .await?;
    Ok(Envelope::data(saved))
}
