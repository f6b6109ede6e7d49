use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::backend::BackendError;
use crate::intake::session::IntakeError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// The session is in the wrong phase for the request.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Upstream error: {0}")]
    Upstream(#[from] BackendError),
}

impl From<IntakeError> for AppError {
    fn from(e: IntakeError) -> Self {
        match e {
            IntakeError::SessionNotFound(_) | IntakeError::CertificationNotFound(_) => {
                AppError::NotFound(e.to_string())
            }
            IntakeError::InvalidPhase { .. } => AppError::Conflict(e.to_string()),
            IntakeError::CertificationLimit { .. } | IntakeError::MissingResume => {
                AppError::Validation(e.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE_ENTITY",
                msg.clone(),
            ),
            AppError::Upstream(e) => {
                tracing::error!("Backend error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_ERROR",
                    "The staffing service is unavailable right now".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::session::IntakePhase;
    use uuid::Uuid;

    fn status_of(e: impl Into<AppError>) -> StatusCode {
        e.into().into_response().status()
    }

    #[test]
    fn test_intake_errors_map_to_http_status() {
        assert_eq!(status_of(IntakeError::SessionNotFound(Uuid::nil())), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(IntakeError::InvalidPhase {
                action: "cancel",
                phase: IntakePhase::Submitting
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(IntakeError::CertificationLimit { max: 5 }),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_backend_errors_are_bad_gateway() {
        let e = BackendError::Rejected {
            status: Some(500),
            message: String::new(),
        };
        assert_eq!(status_of(e), StatusCode::BAD_GATEWAY);
    }
}
