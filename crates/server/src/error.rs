//! HTTP mapping of worker errors.
//!
//! Bodies carry the stable code of the underlying error.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use patchnotes_core::Error;

/// Error returned by the worker's routes.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] Error),

    /// Request body could not be parsed.
    #[error("INVALID_INPUT: {0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Core(err) => match err {
                Error::InvalidInput(_) | Error::InvalidUrl(_) => StatusCode::BAD_REQUEST,
                Error::Fetch(_) => StatusCode::BAD_GATEWAY,
                Error::WorkerUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                Error::MessagingTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
                Error::Lifecycle(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "INVALID_INPUT",
            ApiError::Core(err) => err.code(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self, "request failed");
        }
        let body = Json(json!({ "error": { "code": self.code(), "message": self.to_string() } }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::from(Error::Fetch("offline".into())).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            ApiError::from(Error::WorkerUnavailable("not active".into())).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(ApiError::BadRequest("bad json".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::from(Error::Lifecycle("not installed".into())).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::from(Error::InvalidInput("cross-origin".into())).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::from(Error::State("x".into())).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_code_passthrough() {
        assert_eq!(ApiError::from(Error::DataFormat("x".into())).code(), "DATA_FORMAT_ERROR");
        assert_eq!(ApiError::BadRequest("x".into()).code(), "INVALID_INPUT");
    }
}
