use crate::error::Result;
use crate::store::Store;
use axum::Json;
use axum::extract::State;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
}

/// Liveness check: `GET /health`
pub async fn health(State(store): State<Store>) -> Result<Json<HealthResponse>> {
    sqlx::query("SELECT 1").execute(store.pool()).await?;
    Ok(Json(HealthResponse {
        status: "healthy",
        database: true,
    }))
}
