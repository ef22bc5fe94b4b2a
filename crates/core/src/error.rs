//! Unified error types for patchnotes.
//!
//! Every variant renders with a stable upper-case code prefix so that logs,
//! HTTP error bodies and the CLI all report the same identifier.

use tokio_rusqlite::rusqlite;

/// Unified error types shared by the worker, the loader and the bridge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Manifest or resource request failed at the network/HTTP layer.
    #[error("FETCH_ERROR: {0}")]
    Fetch(String),

    /// Manifest parsed but is structurally invalid.
    #[error("DATA_FORMAT_ERROR: {0}")]
    DataFormat(String),

    /// An app-shell asset could not be fetched during install.
    #[error("CACHE_INSTALL_ERROR: {url}: {reason}")]
    CacheInstall { url: String, reason: String },

    /// The worker did not answer a control message in time.
    #[error("MESSAGING_TIMEOUT: no reply after {0}ms")]
    MessagingTimeout(u64),

    /// The worker task is gone or never started.
    #[error("WORKER_UNAVAILABLE: {0}")]
    WorkerUnavailable(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A worker lifecycle step was invoked out of order.
    #[error("LIFECYCLE_ERROR: {0}")]
    Lifecycle(String),

    /// Local persisted state could not be read or written.
    #[error("STATE_ERROR: {0}")]
    State(String),
}

impl Error {
    /// The stable code carried in the Display output.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::InvalidUrl(_) => "INVALID_URL",
            Error::Fetch(_) => "FETCH_ERROR",
            Error::DataFormat(_) => "DATA_FORMAT_ERROR",
            Error::CacheInstall { .. } => "CACHE_INSTALL_ERROR",
            Error::MessagingTimeout(_) => "MESSAGING_TIMEOUT",
            Error::WorkerUnavailable(_) => "WORKER_UNAVAILABLE",
            Error::Database(_) | Error::MigrationFailed(_) => "CACHE_ERROR",
            Error::Lifecycle(_) => "LIFECYCLE_ERROR",
            Error::State(_) => "STATE_ERROR",
        }
    }

    /// Whether the page renders this failure as the load error panel.
    pub fn is_load_failure(&self) -> bool {
        matches!(self, Error::Fetch(_) | Error::DataFormat(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::DataFormat(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Fetch("status 404".to_string());
        assert!(err.to_string().contains("FETCH_ERROR"));
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn test_install_error_names_url() {
        let err = Error::CacheInstall { url: "/favicon.ico".into(), reason: "status 404".into() };
        assert_eq!(err.to_string(), "CACHE_INSTALL_ERROR: /favicon.ico: status 404");
        assert_eq!(err.code(), "CACHE_INSTALL_ERROR");
    }

    #[test]
    fn test_lifecycle_code() {
        let err = Error::Lifecycle("cannot activate a worker in state Redundant".into());
        assert_eq!(err.code(), "LIFECYCLE_ERROR");
        assert!(err.to_string().starts_with("LIFECYCLE_ERROR: "));
    }

    #[test]
    fn test_load_failures() {
        assert!(Error::Fetch("x".into()).is_load_failure());
        assert!(Error::DataFormat("x".into()).is_load_failure());
        assert!(!Error::MessagingTimeout(10).is_load_failure());
    }
}
