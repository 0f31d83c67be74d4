use super::{BatchReport, Store, Subject};
use crate::error::{Error, Result, ensure_valid};
use crate::model::*;
use sqlx::sqlite::SqliteRow;
use sqlx::types::Json;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};
use tracing::info;

const FACULTY_COLUMNS: &str =
    "id, employee_id, name, email_id, role, specialization, schools, departments";

pub(super) fn faculty_from_row(row: &SqliteRow) -> Result<Faculty, sqlx::Error> {
    let role: String = row.try_get("role")?;
    Ok(Faculty {
        id: row.try_get("id")?,
        employee_id: row.try_get("employee_id")?,
        name: row.try_get("name")?,
        email_id: row.try_get("email_id")?,
        role: FacultyRole::parse(&role).unwrap_or_default(),
        specialization: row.try_get::<Json<_>, _>("specialization")?.0,
        schools: row.try_get::<Json<_>, _>("schools")?.0,
        departments: row.try_get::<Json<_>, _>("departments")?.0,
    })
}

/// Fetch faculty by employee id, preserving the order of `employee_ids`.
/// Unknown ids are skipped.
pub(super) async fn faculty_by_employee_ids(
    conn: &mut SqliteConnection,
    employee_ids: &[String],
) -> Result<Vec<Faculty>, sqlx::Error> {
    let mut found = Vec::with_capacity(employee_ids.len());
    for employee_id in employee_ids {
        let faculty = sqlx::query(&format!(
            "SELECT {FACULTY_COLUMNS} FROM faculty WHERE employee_id = ?"
        ))
        .bind(employee_id)
        .try_map(|row: SqliteRow| faculty_from_row(&row))
        .fetch_optional(&mut *conn)
        .await?;
        found.extend(faculty);
    }
    Ok(found)
}

impl Store {
    pub async fn create_faculty(&self, new: NewFaculty) -> Result<Faculty> {
        ensure_valid!(
            !new.employee_id.is_empty() && !new.name.is_empty() && !new.email_id.is_empty(),
            "Missing required fields: employeeId, name, or emailId"
        );
        if self.find_faculty(&new.employee_id).await?.is_some() {
            return Err(Error::validation(format!(
                "Faculty with employee ID {} already exists.",
                new.employee_id
            )));
        }
        let id = sqlx::query(
            "INSERT INTO faculty (employee_id, name, email_id, role, specialization, schools, departments)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&new.employee_id)
        .bind(&new.name)
        .bind(&new.email_id)
        .bind(new.role.as_str())
        .bind(Json(&new.specialization))
        .bind(Json(&new.schools))
        .bind(Json(&new.departments))
        .execute(self.pool())
        .await?
        .last_insert_rowid();
        info!(employee_id = %new.employee_id, role = new.role.as_str(), "faculty_created");
        Ok(Faculty {
            id: FacultyId(id),
            employee_id: new.employee_id,
            name: new.name,
            email_id: new.email_id,
            role: new.role,
            specialization: new.specialization,
            schools: new.schools,
            departments: new.departments,
        })
    }

    /// Create every row independently; failures are reported by position.
    pub async fn create_faculty_bulk(&self, rows: Vec<NewFaculty>) -> Result<BatchReport> {
        ensure_valid!(!rows.is_empty(), "Faculty list must be a non-empty array.");
        let mut report = BatchReport::creation();
        for (idx, row) in rows.into_iter().enumerate() {
            match self.create_faculty(row).await {
                Ok(_) => report.record_created(),
                Err(e) => report.record_failure(Subject::Row(idx + 1), e),
            }
        }
        Ok(report)
    }

    pub async fn find_faculty(&self, employee_id: &str) -> Result<Option<Faculty>> {
        Ok(sqlx::query(&format!(
            "SELECT {FACULTY_COLUMNS} FROM faculty WHERE employee_id = ?"
        ))
        .bind(employee_id)
        .try_map(|row: SqliteRow| faculty_from_row(&row))
        .fetch_optional(self.pool())
        .await?)
    }

    pub async fn faculty(&self, employee_id: &str) -> Result<Faculty> {
        self.find_faculty(employee_id)
            .await?
            .ok_or_else(|| Error::not_found("Faculty not found."))
    }

    /// Faculty matching every set filter. Schools, departments and
    /// specializations are JSON arrays, matched on membership.
    pub async fn list_faculty(&self, filter: &FacultyFilter) -> Result<Vec<Faculty>> {
        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {FACULTY_COLUMNS} FROM faculty WHERE 1 = 1"));
        if let Some(role) = filter.role {
            query.push(" AND role = ").push_bind(role.as_str());
        }
        let members = [
            ("schools", &filter.school),
            ("departments", &filter.department),
            ("specialization", &filter.specialization),
        ];
        for (column, value) in members {
            if let Some(value) = value {
                query
                    .push(format!(
                        " AND EXISTS (SELECT 1 FROM json_each(faculty.{column}) WHERE json_each.value = "
                    ))
                    .push_bind(value)
                    .push(")");
            }
        }
        query.push(match (filter.sort_by, filter.sort_order) {
            (FacultySort::Name, SortOrder::Asc) => " ORDER BY name ASC",
            (FacultySort::Name, SortOrder::Desc) => " ORDER BY name DESC",
            (FacultySort::EmployeeId, SortOrder::Asc) => " ORDER BY employee_id ASC",
            (FacultySort::EmployeeId, SortOrder::Desc) => " ORDER BY employee_id DESC",
        });
        Ok(query
            .build()
            .try_map(|row: SqliteRow| faculty_from_row(&row))
            .fetch_all(self.pool())
            .await?)
    }

    pub async fn update_faculty(&self, employee_id: &str, update: FacultyUpdate) -> Result<Faculty> {
        let mut faculty = self.faculty(employee_id).await?;
        if let Some(name) = update.name {
            ensure_valid!(!name.is_empty(), "Name cannot be empty.");
            faculty.name = name;
        }
        if let Some(email_id) = update.email_id {
            ensure_valid!(!email_id.is_empty(), "Email cannot be empty.");
            faculty.email_id = email_id;
        }
        if let Some(specialization) = update.specialization {
            faculty.specialization = specialization;
        }
        if let Some(schools) = update.schools {
            faculty.schools = schools;
        }
        if let Some(departments) = update.departments {
            faculty.departments = departments;
        }
        sqlx::query(
            "UPDATE faculty SET name = ?, email_id = ?, specialization = ?, schools = ?, departments = ?
             WHERE id = ?",
        )
        .bind(&faculty.name)
        .bind(&faculty.email_id)
        .bind(Json(&faculty.specialization))
        .bind(Json(&faculty.schools))
        .bind(Json(&faculty.departments))
        .bind(faculty.id)
        .execute(self.pool())
        .await?;
        info!(employee_id, "faculty_updated");
        Ok(faculty)
    }

    /// Faculty still guiding projects, sitting on a panel, or with requests or
    /// marks on record cannot be removed.
    pub async fn delete_faculty(&self, employee_id: &str) -> Result<()> {
        let faculty = self.faculty(employee_id).await?;
        let guided: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects WHERE guide_faculty_id = ?")
            .bind(faculty.id)
            .fetch_one(self.pool())
            .await?;
        ensure_valid!(
            guided == 0,
            "Cannot delete faculty who guides {guided} projects."
        );
        let panels: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM panel_members WHERE faculty_id = ?")
            .bind(faculty.id)
            .fetch_one(self.pool())
            .await?;
        ensure_valid!(
            panels == 0,
            "Cannot delete faculty who is a member of {panels} panels."
        );
        let requests: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM requests WHERE faculty_id = ? OR decided_by = ?")
                .bind(faculty.id)
                .bind(faculty.id)
                .fetch_one(self.pool())
                .await?;
        ensure_valid!(
            requests == 0,
            "Cannot delete faculty with {requests} requests on record."
        );
        let reviews: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM (
                 SELECT faculty_id FROM team_reviews WHERE faculty_id = ?
                 UNION ALL SELECT faculty_id FROM student_review_meta WHERE faculty_id = ?
                 UNION ALL SELECT faculty_id FROM marks WHERE faculty_id = ?
             )",
        )
        .bind(faculty.id)
        .bind(faculty.id)
        .bind(faculty.id)
        .fetch_one(self.pool())
        .await?;
        ensure_valid!(reviews == 0, "Cannot delete faculty who has submitted marks.");
        let mut tx = self.pool().begin().await?;
        sqlx::query("DELETE FROM project_coordinators WHERE faculty_id = ?")
            .bind(faculty.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM faculty WHERE id = ?")
            .bind(faculty.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        info!(employee_id, "faculty_deleted");
        Ok(())
    }
}
