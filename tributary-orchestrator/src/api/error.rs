//! API Error Handling
//!
//! Unified error types and conversion for API responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::error::{BlueprintError, ErrorKind};

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    /// The request was valid but there is nothing to run
    EmptyPlan(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::EmptyPlan(msg) => {
                tracing::info!("Nothing to run: {}", msg);
                (StatusCode::UNPROCESSABLE_ENTITY, msg)
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<BlueprintError> for ApiError {
    fn from(err: BlueprintError) -> Self {
        match err.kind() {
            ErrorKind::BadInput => ApiError::BadRequest(err.to_string()),
            ErrorKind::NotFound => ApiError::NotFound(err.to_string()),
            ErrorKind::EmptyPlan => ApiError::EmptyPlan(err.to_string()),
            ErrorKind::Internal => ApiError::InternalError(err.to_string()),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CronError;
    use uuid::Uuid;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (BlueprintError::bad_input("bad"), StatusCode::BAD_REQUEST),
            (
                BlueprintError::NotFound("missing".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (BlueprintError::EmptyPlan, StatusCode::UNPROCESSABLE_ENTITY),
            (
                BlueprintError::Internal("boom".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), status);
        }
    }

    #[test]
    fn test_internal_message_keeps_sources() {
        let err = BlueprintError::Reload(Box::new(BlueprintError::Schedule {
            blueprint_id: Uuid::nil(),
            source: CronError::InvalidExpression {
                expr: "x".to_string(),
                message: "bad".to_string(),
            },
        }));

        match ApiError::from(err) {
            ApiError::InternalError(msg) => {
                assert!(msg.starts_with("error reloading blueprints"));
                assert!(msg.contains("invalid cron expression 'x'"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
