// ---------------------------------------------------------------------------
// handlers/ — HTTP façade over the pipeline and search aggregator
// ---------------------------------------------------------------------------

pub(crate) mod retrieval;
pub(crate) mod system;

pub use retrieval::{read_url, search_results};
pub use system::{health, openapi_json, readiness};

use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Request-level errors. Retrieval failures never come through here; they
/// are answered with the sentinel text or the search error entry.
///
/// Response format:
/// ```json
/// { "error": { "code": "BAD_REQUEST", "message": "..." } }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(m) => m,
        }
    }
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        tracing::warn!(code = self.error_code(), "API error ({}): {}", status.as_u16(), self);

        let body = json!({
            "error": {
                "code": self.error_code(),
                "message": self.message(),
            }
        });
        (status, Json(body)).into_response()
    }
}
