//! HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

/// Body returned for every store failure. Details stay in the log.
pub const DATABASE_ERROR: &str = "Database error";

/// An error that ends a request.
#[derive(Debug)]
pub enum ApiError {
    /// Invalid input; reported as 400 with the message.
    BadRequest(String),
    /// Store or infrastructure failure; reported as a generic 500.
    Store(crate::Error),
}

impl ApiError {
    /// Create a 400 error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }
}

impl From<crate::Error> for ApiError {
    fn from(err: crate::Error) -> Self {
        Self::Store(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            Self::Store(err) => {
                if err.is_database_error() {
                    error!("Database error: {}", err);
                } else {
                    error!("Store failure: {}", err);
                }
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": DATABASE_ERROR })),
                )
                    .into_response()
            }
        }
    }
}
