// Error types for scrobble-hook
// Every protocol status line maps onto exactly one variant

use thiserror::Error;

/// Main error type for the submission engine
#[derive(Error, Debug)]
pub enum ScrobbleError {
    #[error("user is banned")]
    Banned,

    #[error("bad credentials")]
    BadAuth,

    #[error("clock is too far off the server time")]
    BadTime,

    #[error("session is no longer valid")]
    BadSession,

    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("no session, handshake first")]
    NoSession,

    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using our error
pub type Result<T> = std::result::Result<T, ScrobbleError>;

impl ScrobbleError {
    /// Create a request failure carrying the raw status line or transport message
    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigInvalid(msg.into())
    }
}

impl From<attohttpc::Error> for ScrobbleError {
    fn from(e: attohttpc::Error) -> Self {
        Self::RequestFailed(e.to_string())
    }
}
