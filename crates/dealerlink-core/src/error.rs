//! Error types module
//!
//! Errors are split by the layer that produces them:
//!
//! - [`AuthError`]: the credential could not be obtained, or was rejected twice.
//!   It is `Clone` because a single in-flight exchange hands the same outcome to
//!   every caller waiting on it.
//! - [`ApiError`]: one authenticated request against the remote service.
//! - [`ItemError`]: one image in a batch upload. Never escapes the batch.
//! - [`BatchError`]: a batch that could not be attempted at all.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error reporting - lets errors self-describe how they are
/// surfaced to the tool caller and the logs.
pub trait ErrorMetadata {
    /// Machine-readable error kind (e.g., "AuthFailure")
    fn error_code(&self) -> &'static str;

    /// Whether retrying the same operation later may succeed
    fn is_recoverable(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Authentication request failed: {0}")]
    Request(String),

    #[error("Authentication rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Malformed token response: {0}")]
    MalformedResponse(String),

    #[error("Credential rejected twice by the remote service (HTTP {status})")]
    RejectedTwice { status: u16 },
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication failure: {0}")]
    Auth(#[from] AuthError),

    #[error("Transport failure: {message}")]
    Transport { message: String, timeout: bool },

    #[error("Remote request failed with status {status}: {message}")]
    Remote {
        status: u16,
        message: String,
        body: Option<serde_json::Value>,
    },

    #[error("Invalid response from remote service: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Auth(_))
    }

    /// HTTP status for remote failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Remote { status, .. } => Some(*status),
            ApiError::Auth(AuthError::Rejected { status, .. })
            | ApiError::Auth(AuthError::RejectedTwice { status }) => Some(*status),
            _ => None,
        }
    }

    /// Structured error body returned by the remote service, if any.
    pub fn body(&self) -> Option<&serde_json::Value> {
        match self {
            ApiError::Remote { body, .. } => body.as_ref(),
            _ => None,
        }
    }
}

/// Per-image failure inside a batch upload.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ItemError {
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    #[error("Unreadable source: {0}")]
    UnreadableSource(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error(transparent)]
    Upload(#[from] ApiError),
}

impl ItemError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ItemError::Upload(e) => e.status(),
            _ => None,
        }
    }

    pub fn body(&self) -> Option<&serde_json::Value> {
        match self {
            ItemError::Upload(e) => e.body(),
            _ => None,
        }
    }
}

/// Failure that prevents a batch from being attempted.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BatchError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Authentication failure: {0}")]
    Auth(#[from] AuthError),
}

impl ErrorMetadata for AuthError {
    fn error_code(&self) -> &'static str {
        "AuthFailure"
    }

    fn is_recoverable(&self) -> bool {
        // Network trouble during the exchange may clear up; bad credentials will not.
        matches!(self, AuthError::Request(_))
    }

    fn log_level(&self) -> LogLevel {
        LogLevel::Error
    }
}

impl ErrorMetadata for ApiError {
    fn error_code(&self) -> &'static str {
        match self {
            ApiError::Auth(e) => e.error_code(),
            ApiError::Transport { .. } => "TransportFailure",
            ApiError::Remote { .. } | ApiError::InvalidResponse(_) => "RemoteRequestFailure",
            ApiError::InvalidRequest(_) => "InvalidRequest",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            ApiError::Auth(e) => e.is_recoverable(),
            ApiError::Transport { .. } => true,
            ApiError::Remote { status, .. } => *status == 429 || *status >= 500,
            ApiError::InvalidResponse(_) | ApiError::InvalidRequest(_) => false,
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            ApiError::Auth(_) => LogLevel::Error,
            ApiError::Transport { .. } => LogLevel::Warn,
            ApiError::Remote { status, .. } if *status >= 500 => LogLevel::Error,
            ApiError::Remote { .. } => LogLevel::Warn,
            ApiError::InvalidResponse(_) => LogLevel::Error,
            ApiError::InvalidRequest(_) => LogLevel::Debug,
        }
    }
}

impl ErrorMetadata for ItemError {
    fn error_code(&self) -> &'static str {
        match self {
            ItemError::InvalidEncoding(_) => "InvalidEncoding",
            ItemError::UnreadableSource(_) => "UnreadableSource",
            ItemError::UnsupportedMediaType(_) => "UnsupportedMediaType",
            ItemError::Upload(e) => e.error_code(),
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            ItemError::Upload(e) => e.is_recoverable(),
            _ => false,
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            ItemError::Upload(e) => e.log_level(),
            _ => LogLevel::Debug,
        }
    }
}

impl ErrorMetadata for BatchError {
    fn error_code(&self) -> &'static str {
        match self {
            BatchError::InvalidRequest(_) => "InvalidRequest",
            BatchError::Auth(e) => e.error_code(),
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            BatchError::InvalidRequest(_) => false,
            BatchError::Auth(e) => e.is_recoverable(),
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            BatchError::InvalidRequest(_) => LogLevel::Debug,
            BatchError::Auth(e) => e.log_level(),
        }
    }
}
