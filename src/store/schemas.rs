use super::Store;
use crate::error::{Error, Result, ensure_valid};
use crate::model::*;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::types::Json;
use sqlx::{Row, SqliteConnection};
use std::collections::HashSet;
use tracing::info;

pub(super) async fn marking_schema_in(
    conn: &mut SqliteConnection,
    scope: &Scope,
) -> Result<Option<MarkingSchema>, sqlx::Error> {
    sqlx::query(
        "SELECT reviews FROM marking_schemas WHERE academic_year = ? AND school = ? AND department = ?",
    )
    .bind(&scope.academic_year)
    .bind(&scope.school)
    .bind(&scope.department)
    .try_map(|row: SqliteRow| {
        Ok(MarkingSchema {
            scope: scope.clone(),
            reviews: row.try_get::<Json<_>, _>("reviews")?.0,
        })
    })
    .fetch_optional(&mut *conn)
    .await
}

fn check_schema(schema: &MarkingSchema) -> Result<()> {
    ensure_valid!(
        schema.scope.is_complete(),
        "Academic year, school and department are required."
    );
    ensure_valid!(!schema.reviews.is_empty(), "At least one review is required.");
    let mut names = HashSet::new();
    for review in &schema.reviews {
        ensure_valid!(!review.name.is_empty(), "Review name is required.");
        ensure_valid!(names.insert(&review.name), "Duplicate review: {}", review.name);
        let mut ids = HashSet::new();
        for criterion in &review.rubric {
            ensure_valid!(
                ids.insert(&criterion.id),
                "Duplicate criterion {} in review {}.",
                criterion.id,
                review.name
            );
            ensure_valid!(
                !criterion.levels.is_empty(),
                "Criterion {} has no levels.",
                criterion.id
            );
            ensure_valid!(
                criterion.max_marks > 0.0,
                "Criterion {} must carry positive marks.",
                criterion.id
            );
        }
    }
    Ok(())
}

impl Store {
    pub async fn marking_schema(&self, scope: &Scope) -> Result<MarkingSchema> {
        let mut conn = self.pool().acquire().await?;
        marking_schema_in(&mut conn, scope)
            .await?
            .ok_or_else(|| Error::not_found("Marking schema not found."))
    }

    /// Create or replace the schema of a scope.
    pub async fn upsert_marking_schema(&self, schema: MarkingSchema) -> Result<MarkingSchema> {
        check_schema(&schema)?;
        sqlx::query(
            "INSERT INTO marking_schemas (academic_year, school, department, reviews, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (academic_year, school, department)
             DO UPDATE SET reviews = excluded.reviews, updated_at = excluded.updated_at",
        )
        .bind(&schema.scope.academic_year)
        .bind(&schema.scope.school)
        .bind(&schema.scope.department)
        .bind(Json(&schema.reviews))
        .bind(Utc::now())
        .execute(self.pool())
        .await?;
        info!(scope = %schema.scope, reviews = schema.reviews.len(), "marking_schema_saved");
        Ok(schema)
    }
}
