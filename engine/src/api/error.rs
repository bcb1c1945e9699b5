//! JSON error responses for the HTTP API
//!
//! Every failure is returned as `{"detail": "..."}`.

use crate::llm::LLMError;
use crate::robot::RobotError;
use crate::secrets::scrub;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug)]
pub enum ApiError {
    /// 400, the request names something that doesn't exist
    BadRequest(String),
    /// 500, a backend or the robot failed
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(json!({ "detail": scrub(&detail) }))).into_response()
    }
}

impl From<LLMError> for ApiError {
    fn from(e: LLMError) -> Self {
        match e {
            LLMError::UnknownModelIdentity(_) => ApiError::BadRequest(e.to_string()),
            other => {
                tracing::error!("Chat error: {}", other);
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl From<RobotError> for ApiError {
    fn from(e: RobotError) -> Self {
        match e {
            RobotError::UnknownRoom(_) => ApiError::BadRequest(e.to_string()),
            other => {
                tracing::error!("Robot error: {}", other);
                ApiError::Internal(other.to_string())
            }
        }
    }
}
