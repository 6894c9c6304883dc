use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::auth::AuthError;

/// Errors surfaced by HTTP handlers.
#[derive(Debug)]
pub enum ApiError {
    Auth(AuthError),
    /// The request carried no credential at all.
    Unauthenticated,
    Internal(anyhow::Error),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::Auth(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Auth(err) => {
                let status = err.status_code();
                if status.is_server_error() {
                    error!("Request failed: {}", err);
                    (status, "Internal server error".to_string())
                } else {
                    (status, err.to_string())
                }
            }
            Self::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "Authentication required".to_string(),
            ),
            Self::Internal(err) => {
                error!("Request failed: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
