use super::{BatchReport, Store, Subject};
use crate::error::{Result, ensure_valid};
use crate::model::*;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::info;

const STUDENT_COLUMNS: &str =
    "id, reg_no, name, email_id, pat, academic_year, school, department, is_active";

fn student_from_row(row: &SqliteRow) -> Result<Student, sqlx::Error> {
    Ok(Student {
        id: row.try_get("id")?,
        reg_no: row.try_get("reg_no")?,
        name: row.try_get("name")?,
        email_id: row.try_get("email_id")?,
        pat: row.try_get("pat")?,
        scope: Scope {
            academic_year: row.try_get("academic_year")?,
            school: row.try_get("school")?,
            department: row.try_get("department")?,
        },
        is_active: row.try_get("is_active")?,
    })
}

impl Store {
    pub async fn find_student(&self, reg_no: &str, academic_year: &str) -> Result<Option<Student>> {
        Ok(sqlx::query(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE reg_no = ? AND academic_year = ?"
        ))
        .bind(reg_no)
        .bind(academic_year)
        .try_map(|row: SqliteRow| student_from_row(&row))
        .fetch_optional(self.pool())
        .await?)
    }

    /// Active students; `regNo` is matched as a case-insensitive substring.
    pub async fn list_students(&self, filter: &StudentFilter) -> Result<Vec<Student>> {
        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE is_active = 1"
        ));
        if let Some(year) = &filter.academic_year {
            query.push(" AND academic_year = ").push_bind(year);
        }
        if let Some(school) = &filter.school {
            query.push(" AND school = ").push_bind(school);
        }
        if let Some(department) = &filter.department {
            query.push(" AND department = ").push_bind(department);
        }
        if let Some(reg_no) = &filter.reg_no {
            query
                .push(" AND LOWER(reg_no) LIKE ")
                .push_bind(format!("%{}%", reg_no.to_lowercase()));
        }
        query.push(" ORDER BY reg_no");
        Ok(query
            .build()
            .try_map(|row: SqliteRow| student_from_row(&row))
            .fetch_all(self.pool())
            .await?)
    }

    /// Insert new students and refresh existing ones (matched on regNo within
    /// the academic year). Every row is handled on its own.
    pub async fn upsert_students(&self, rows: Vec<StudentRow>, scope: &Scope) -> Result<BatchReport> {
        ensure_valid!(
            scope.is_complete(),
            "Academic year, school and department are required."
        );
        let mut report = BatchReport::upsert();
        for (idx, row) in rows.into_iter().enumerate() {
            if row.reg_no.is_empty() || row.name.is_empty() || row.email_id.is_empty() {
                report.record_failure(
                    Subject::Row(idx + 1),
                    "Missing required fields: regNo, name, or emailId",
                );
                continue;
            }
            let outcome = match self.find_student(&row.reg_no, &scope.academic_year).await {
                Ok(Some(existing)) => sqlx::query("UPDATE students SET name = ?, email_id = ?, pat = ? WHERE id = ?")
                    .bind(&row.name)
                    .bind(&row.email_id)
                    .bind(row.pat)
                    .bind(existing.id)
                    .execute(self.pool())
                    .await
                    .map(|_| false)
                    .map_err(Into::into),
                Ok(None) => sqlx::query(
                    "INSERT INTO students (reg_no, name, email_id, pat, academic_year, school, department, is_active)
                     VALUES (?, ?, ?, ?, ?, ?, ?, 1)",
                )
                .bind(&row.reg_no)
                .bind(&row.name)
                .bind(&row.email_id)
                .bind(row.pat)
                .bind(&scope.academic_year)
                .bind(&scope.school)
                .bind(&scope.department)
                .execute(self.pool())
                .await
                .map(|_| true)
                .map_err(Into::into),
                Err(e) => Err(e),
            };
            match outcome {
                Ok(true) => report.record_created(),
                Ok(false) => report.record_updated(),
                Err(e) => report.record_failure(Subject::Row(idx + 1), e),
            }
        }
        info!(
            scope = %scope,
            created = report.created.unwrap_or(0),
            updated = report.updated.unwrap_or(0),
            errors = report.errors,
            "students_uploaded"
        );
        Ok(report)
    }
}
