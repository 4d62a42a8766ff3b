//! Error types shared by the backends, the dispatcher and the request handler

use thiserror::Error;

/// Classified gateway error
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ChatError {
    pub kind: ErrorKind,
    pub message: String,
    /// HTTP status returned by an upstream backend, when there was one
    pub upstream_status: Option<u16>,
}

impl ChatError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            upstream_status: None,
        }
    }

    #[must_use]
    pub fn with_upstream_status(mut self, status: u16) -> Self {
        self.upstream_status = Some(status);
        self
    }

    pub fn malformed_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedRequest, message)
    }

    pub fn no_backend_configured() -> Self {
        Self::new(
            ErrorKind::NoBackendConfigured,
            "No backend configured: set API_URL or AWS_BEARER_TOKEN_BEDROCK",
        )
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BackendUnavailable, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BackendTimeout, message)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BackendProtocolError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Client input violates the request contract
    MalformedRequest,
    /// Deployment error: neither backend is enabled
    NoBackendConfigured,
    /// Connection refused, DNS failure, non-2xx status
    BackendUnavailable,
    /// No response within the configured deadline
    BackendTimeout,
    /// Response received but not in the expected shape
    BackendProtocolError,
    /// Anything else
    Internal,
}

impl ErrorKind {
    /// Stable category name used in logs
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::MalformedRequest => "malformed_request",
            ErrorKind::NoBackendConfigured => "no_backend_configured",
            ErrorKind::BackendUnavailable => "backend_unavailable",
            ErrorKind::BackendTimeout => "backend_timeout",
            ErrorKind::BackendProtocolError => "backend_protocol_error",
            ErrorKind::Internal => "internal",
        }
    }

    pub fn is_backend_side(self) -> bool {
        matches!(
            self,
            ErrorKind::BackendUnavailable
                | ErrorKind::BackendTimeout
                | ErrorKind::BackendProtocolError
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
