use super::Store;
use crate::error::{Error, Result, ensure_valid};
use crate::model::*;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::info;

fn coordinator_from_row(row: &SqliteRow) -> Result<ProjectCoordinator, sqlx::Error> {
    Ok(ProjectCoordinator {
        id: row.try_get("id")?,
        faculty: row.try_get("faculty_id")?,
        employee_id: row.try_get("employee_id")?,
        name: row.try_get("name")?,
        scope: Scope {
            academic_year: row.try_get("academic_year")?,
            school: row.try_get("school")?,
            department: row.try_get("department")?,
        },
        is_primary: row.try_get("is_primary")?,
    })
}

impl Store {
    pub async fn assign_coordinator(&self, new: NewCoordinator) -> Result<ProjectCoordinator> {
        ensure_valid!(
            new.scope.is_complete(),
            "Academic year, school and department are required."
        );
        let faculty = self.faculty(&new.employee_id).await?;
        ensure_valid!(
            faculty.role == FacultyRole::Faculty,
            "Only faculty members can coordinate projects."
        );
        let existing: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM project_coordinators
             WHERE faculty_id = ? AND academic_year = ? AND school = ? AND department = ?",
        )
        .bind(faculty.id)
        .bind(&new.scope.academic_year)
        .bind(&new.scope.school)
        .bind(&new.scope.department)
        .fetch_one(self.pool())
        .await?;
        ensure_valid!(
            existing == 0,
            "{} is already a coordinator for {}.",
            faculty.employee_id,
            new.scope
        );
        let id = sqlx::query(
            "INSERT INTO project_coordinators (faculty_id, academic_year, school, department, is_primary)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(faculty.id)
        .bind(&new.scope.academic_year)
        .bind(&new.scope.school)
        .bind(&new.scope.department)
        .bind(new.is_primary)
        .execute(self.pool())
        .await?
        .last_insert_rowid();
        info!(employee_id = %faculty.employee_id, scope = %new.scope, "coordinator_assigned");
        Ok(ProjectCoordinator {
            id,
            faculty: faculty.id,
            employee_id: faculty.employee_id,
            name: faculty.name,
            scope: new.scope,
            is_primary: new.is_primary,
        })
    }

    pub async fn list_coordinators(&self, filter: &ScopeFilter) -> Result<Vec<ProjectCoordinator>> {
        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT c.id, c.faculty_id, f.employee_id, f.name, c.academic_year, c.school, c.department, c.is_primary
             FROM project_coordinators c JOIN faculty f ON f.id = c.faculty_id WHERE 1 = 1",
        );
        if let Some(year) = &filter.academic_year {
            query.push(" AND c.academic_year = ").push_bind(year);
        }
        if let Some(school) = &filter.school {
            query.push(" AND c.school = ").push_bind(school);
        }
        if let Some(department) = &filter.department {
            query.push(" AND c.department = ").push_bind(department);
        }
        query.push(" ORDER BY c.id");
        Ok(query
            .build()
            .try_map(|row: SqliteRow| coordinator_from_row(&row))
            .fetch_all(self.pool())
            .await?)
    }

    /// Scopes a faculty member coordinates.
    pub async fn coordinated_scopes(&self, faculty: FacultyId) -> Result<Vec<Scope>> {
        Ok(sqlx::query(
            "SELECT academic_year, school, department FROM project_coordinators WHERE faculty_id = ? ORDER BY id",
        )
        .bind(faculty)
        .try_map(|row: SqliteRow| {
            Ok(Scope {
                academic_year: row.try_get("academic_year")?,
                school: row.try_get("school")?,
                department: row.try_get("department")?,
            })
        })
        .fetch_all(self.pool())
        .await?)
    }

    pub async fn remove_coordinator(&self, id: i64) -> Result<()> {
        let deleted = sqlx::query("DELETE FROM project_coordinators WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(Error::not_found("Coordinator not found."));
        }
        info!(coordinator_id = id, "coordinator_removed");
        Ok(())
    }
}
