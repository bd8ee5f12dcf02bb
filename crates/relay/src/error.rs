use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug)]
pub enum ApiError {
    // Auth
    Unauthorized,
    /// Bearer token resolved to a session whose account no longer exists.
    /// Carries the USER_NOT_FOUND code so clients force a logout instead of
    /// treating it as a transient failure.
    UserNotFound,

    // Generic
    BadRequest(String),
    Internal(String),
}

pub type Result<T> = core::result::Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, code) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Not logged in".to_string(),
                None,
            ),
            ApiError::UserNotFound => (
                StatusCode::NOT_FOUND,
                "User no longer exists".to_string(),
                Some(ember_common::USER_NOT_FOUND_CODE),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg, None),
        };

        let body = match code {
            Some(code) => Json(json!({ "error": message, "code": code })),
            None => Json(json!({ "error": message })),
        };

        (status, body).into_response()
    }
}

// Allow conversion from storage/manager errors via string
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}
