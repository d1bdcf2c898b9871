// ~/Sentinel/sentinel-addons/display/src/error.rs

use thiserror::Error;

/// Failure reported by the primary display backend.
///
/// Carries the name of the attempted operation so that callers can tell
/// which step of a multi-call sequence broke before falling back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed: {message}")]
pub struct BackendError {
    pub operation: &'static str,
    pub message: String,
}

impl BackendError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{operation} rejected by the display driver (code {code})")]
    Unsupported { operation: &'static str, code: i32 },

    #[error("unsupported url scheme '{0}' (expected http or https)")]
    UnsupportedScheme(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("network error: {0}")]
    Network(String),

    #[error("{operation} failed: {message}")]
    Native {
        operation: &'static str,
        message: String,
    },

    #[error("registry error: {0}")]
    Registry(String),

    #[error("wallpaper history error: {0}")]
    History(String),
}

impl DisplayError {
    pub fn native(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Native {
            operation,
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, DisplayError>;
