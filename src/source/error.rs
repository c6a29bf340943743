use crate::error::{ErrorCode, ResultError};
use std::time::Duration;

/// Failures reported by the transport that delivers the response bytes
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Response timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Deferred result not found: {0}")]
    HandleNotFound(String),

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Whether this failure should surface as a `timeout` status
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::TimedOut,
            _ => false,
        }
    }
}

/// Convert TransportError to ResultError
impl From<TransportError> for ResultError {
    fn from(err: TransportError) -> Self {
        let code = match &err {
            e if e.is_timeout() => ErrorCode::TRANSPORT_TIMEOUT,
            TransportError::ConnectionLost(_) => ErrorCode::TRANSPORT_CONNECTION_LOST,
            TransportError::Io(_) => ErrorCode::TRANSPORT_IO,
            TransportError::HandleNotFound(_) => ErrorCode::TRANSPORT_HANDLE_NOT_FOUND,
            _ => ErrorCode::TRANSPORT_GENERIC,
        };
        ResultError::transport_with_code(code, err.to_string())
    }
}
