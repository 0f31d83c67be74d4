use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Errors surfaced by store operations and HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad or missing input (400).
    #[error("{0}")]
    Validation(String),

    /// Panel capacity exhausted (400).
    #[error("Panel has reached maximum capacity.")]
    PanelFull,

    /// Missing panel, project, faculty… (404).
    #[error("{0}")]
    NotFound(String),

    /// No caller identity (401).
    #[error("Authentication required.")]
    Unauthorized,

    /// Caller role outside the route's role set (403).
    #[error("{0}")]
    Forbidden(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Error::NotFound(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::Validation(_) | Error::PanelFull => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::Database(_) | Error::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(json!({
            "success": false,
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Fail with a validation error unless `cond` holds.
macro_rules! ensure_valid {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::error::Error::Validation(format!($($arg)+)));
        }
    };
}

pub(crate) use ensure_valid;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::PanelFull.to_string(),
            "Panel has reached maximum capacity."
        );
        assert_eq!(
            Error::not_found("Panel not found.").to_string(),
            "Panel not found."
        );
    }

    #[test]
    fn test_error_status() {
        assert_eq!(Error::PanelFull.status(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(Error::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            Error::Database(sqlx::Error::RowNotFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
