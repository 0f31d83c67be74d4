use super::Store;
use crate::error::{Error, Result, ensure_valid};
use crate::model::*;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::info;

pub(super) async fn department_config_in(
    conn: &mut SqliteConnection,
    scope: &Scope,
) -> Result<Option<DepartmentConfig>, sqlx::Error> {
    sqlx::query(
        "SELECT min_panel_size, max_panel_size FROM department_configs
         WHERE academic_year = ? AND school = ? AND department = ?",
    )
    .bind(&scope.academic_year)
    .bind(&scope.school)
    .bind(&scope.department)
    .try_map(|row: SqliteRow| {
        Ok(DepartmentConfig {
            scope: scope.clone(),
            min_panel_size: row.try_get("min_panel_size")?,
            max_panel_size: row.try_get("max_panel_size")?,
        })
    })
    .fetch_optional(&mut *conn)
    .await
}

impl Store {
    pub async fn department_config(&self, scope: &Scope) -> Result<Option<DepartmentConfig>> {
        let mut conn = self.pool().acquire().await?;
        Ok(department_config_in(&mut conn, scope).await?)
    }

    pub async fn require_department_config(&self, scope: &Scope) -> Result<DepartmentConfig> {
        self.department_config(scope)
            .await?
            .ok_or_else(|| Error::not_found("Department configuration not found."))
    }

    pub async fn upsert_department_config(&self, config: DepartmentConfig) -> Result<DepartmentConfig> {
        ensure_valid!(
            config.scope.is_complete(),
            "Academic year, school and department are required."
        );
        ensure_valid!(config.min_panel_size >= 1, "Minimum panel size must be at least 1.");
        ensure_valid!(
            config.min_panel_size <= config.max_panel_size,
            "Minimum panel size cannot exceed maximum panel size."
        );
        sqlx::query(
            "INSERT INTO department_configs (academic_year, school, department, min_panel_size, max_panel_size)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (academic_year, school, department)
             DO UPDATE SET min_panel_size = excluded.min_panel_size, max_panel_size = excluded.max_panel_size",
        )
        .bind(&config.scope.academic_year)
        .bind(&config.scope.school)
        .bind(&config.scope.department)
        .bind(config.min_panel_size)
        .bind(config.max_panel_size)
        .execute(self.pool())
        .await?;
        info!(
            scope = %config.scope,
            min = config.min_panel_size,
            max = config.max_panel_size,
            "department_config_saved"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;

    #[tokio::test]
    async fn test_upsert_replaces() {
        let store = fixtures::store().await;
        let scope = fixtures::scope();
        assert!(store.department_config(&scope).await.unwrap().is_none());
        let config = DepartmentConfig {
            scope: scope.clone(),
            min_panel_size: 2,
            max_panel_size: 3,
        };
        store.upsert_department_config(config.clone()).await.unwrap();
        store
            .upsert_department_config(DepartmentConfig {
                max_panel_size: 4,
                ..config
            })
            .await
            .unwrap();
        let saved = store.require_department_config(&scope).await.unwrap();
        assert_eq!(saved.max_panel_size, 4);
    }

    #[tokio::test]
    async fn test_rejects_inverted_bounds() {
        let store = fixtures::store().await;
        let err = store
            .upsert_department_config(DepartmentConfig {
                scope: fixtures::scope(),
                min_panel_size: 4,
                max_panel_size: 3,
            })
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Minimum panel size cannot exceed maximum panel size."
        );
    }
}
