use crate::types::FinderError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Error returned by HTTP handlers.
///
/// Upstream and configuration detail is logged here and replaced with a
/// short message before it reaches the client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Finder(#[from] FinderError),

    /// Request body could not be read as an upload.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            ApiError::Finder(err) => {
                let (status, code) = classify(err);
                let message = match err {
                    // Input messages are ours, so they are safe to echo.
                    FinderError::InvalidInput(msg) => msg.clone(),
                    other => other.user_message().to_string(),
                };
                if status.is_server_error() {
                    tracing::error!(error = %err, code, "Analysis request failed");
                } else {
                    tracing::warn!(error = %err, code, "Analysis request rejected");
                }
                (status, code, message)
            }
        };

        let body = json!({
            "success": false,
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Map a pipeline error onto an HTTP status and a stable error code.
///
/// - Input problems and unidentifiable games map to 400.
/// - Upstream throttling maps to 429.
/// - Credential, upstream and exhausted-retry failures map to 500.
fn classify(err: &FinderError) -> (StatusCode, &'static str) {
    match err {
        FinderError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
        FinderError::MalformedResponse(_) | FinderError::AnalysisIncomplete => {
            (StatusCode::BAD_REQUEST, "GAME_NOT_IDENTIFIED")
        }
        FinderError::NothingToRetry => (StatusCode::BAD_REQUEST, "NOTHING_TO_RETRY"),
        FinderError::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
        FinderError::Cancelled => (StatusCode::CONFLICT, "SUPERSEDED"),
        FinderError::ServiceAuth(_) | FinderError::Config(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "SERVICE_CONFIGURATION")
        }
        FinderError::TransientNetwork(_)
        | FinderError::Timeout(_)
        | FinderError::RetriesExhausted { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, "SERVICE_UNAVAILABLE")
        }
        FinderError::Upstream { .. } | FinderError::SearchUnavailable(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "UPSTREAM_ERROR")
        }
    }
}
