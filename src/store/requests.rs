use super::Store;
use crate::error::{Error, Result, ensure_valid};
use crate::model::*;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::info;

const REQUEST_COLUMNS: &str =
    "id, faculty_id, project_id, kind, reason, status, remarks, new_deadline, created_at, decided_by";

fn request_from_row(row: &SqliteRow) -> Result<Request, sqlx::Error> {
    let status: String = row.try_get("status")?;
    Ok(Request {
        id: row.try_get("id")?,
        faculty: row.try_get("faculty_id")?,
        project: row.try_get("project_id")?,
        kind: row.try_get("kind")?,
        reason: row.try_get("reason")?,
        status: RequestStatus::parse(&status).unwrap_or_default(),
        remarks: row.try_get("remarks")?,
        new_deadline: row.try_get("new_deadline")?,
        created_at: row.try_get("created_at")?,
        decided_by: row.try_get("decided_by")?,
    })
}

impl Store {
    pub async fn create_request(&self, faculty: &Faculty, new: NewRequest) -> Result<Request> {
        ensure_valid!(!new.kind.is_empty(), "Request type is required.");
        ensure_valid!(!new.reason.is_empty(), "Reason is required.");
        if let Some(project) = new.project_id {
            self.project(project).await?;
        }
        let created_at = Utc::now();
        let id = sqlx::query(
            "INSERT INTO requests (faculty_id, project_id, kind, reason, status, created_at)
             VALUES (?, ?, ?, ?, 'pending', ?)",
        )
        .bind(faculty.id)
        .bind(new.project_id)
        .bind(&new.kind)
        .bind(&new.reason)
        .bind(created_at)
        .execute(self.pool())
        .await?
        .last_insert_rowid();
        info!(request_id = id, faculty = %faculty.employee_id, kind = %new.kind, "request_created");
        Ok(Request {
            id: RequestId(id),
            faculty: faculty.id,
            project: new.project_id,
            kind: new.kind,
            reason: new.reason,
            status: RequestStatus::Pending,
            remarks: None,
            new_deadline: None,
            created_at,
            decided_by: None,
        })
    }

    pub async fn request(&self, id: RequestId) -> Result<Request> {
        sqlx::query(&format!("SELECT {REQUEST_COLUMNS} FROM requests WHERE id = ?"))
            .bind(id)
            .try_map(|row: SqliteRow| request_from_row(&row))
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| Error::not_found("Request not found."))
    }

    /// Requests, newest first.
    pub async fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<Request>> {
        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {REQUEST_COLUMNS} FROM requests WHERE 1 = 1"));
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(faculty) = filter.faculty {
            query.push(" AND faculty_id = ").push_bind(faculty);
        }
        query.push(" ORDER BY created_at DESC, id DESC");
        Ok(query
            .build()
            .try_map(|row: SqliteRow| request_from_row(&row))
            .fetch_all(self.pool())
            .await?)
    }

    /// Approve or reject a pending request.
    pub async fn decide_request(&self, id: RequestId, decision: RequestDecision, admin: &Faculty) -> Result<Request> {
        let status = match RequestStatus::parse(&decision.status) {
            Some(status @ (RequestStatus::Approved | RequestStatus::Rejected)) => status,
            _ => return Err(Error::validation("Status must be approved or rejected.")),
        };
        let mut request = self.request(id).await?;
        ensure_valid!(
            request.status == RequestStatus::Pending,
            "Request has already been {}.",
            request.status.as_str()
        );
        let updated = sqlx::query(
            "UPDATE requests SET status = ?, remarks = ?, new_deadline = ?, decided_by = ?
             WHERE id = ? AND status = 'pending'",
        )
        .bind(status.as_str())
        .bind(&decision.remarks)
        .bind(decision.new_deadline)
        .bind(admin.id)
        .bind(id)
        .execute(self.pool())
        .await?
        .rows_affected();
        ensure_valid!(updated == 1, "Request has already been decided.");
        info!(request_id = %id, status = status.as_str(), decided_by = %admin.employee_id, "request_decided");
        request.status = status;
        request.remarks = decision.remarks;
        request.new_deadline = decision.new_deadline;
        request.decided_by = Some(admin.id);
        Ok(request)
    }
}
