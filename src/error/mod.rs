use std::fmt::Display;
use thiserror::Error;

pub mod codes;
pub mod helpers;


pub use codes::{describe_error_code, ErrorCode};
pub use helpers::{common, ErrorExt};

/// The unified error type delivered on every result channel.
///
/// A single failure is fanned out to several channels at once, so the error
/// is `Clone` and carries rendered messages rather than boxed sources.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResultError {
    #[error("[E{code:04}] Parse error at byte {offset}: {message}")]
    Parse {
        code: u16,
        message: String,
        offset: u64,
    },

    #[error("[E{code:04}] Transport error: {message}")]
    Transport { code: u16, message: String },

    #[error("[E{code:04}] Channel '{channel}' error: {message}")]
    Channel {
        code: u16,
        message: String,
        channel: String,
    },

    #[error("[E{code:04}] Decode error: {message}")]
    Decode { code: u16, message: String },

    #[error("[E{code:04}] Configuration error: {message}")]
    Config {
        code: u16,
        message: String,
        field: Option<String>,
    },

    #[error("[E{code:04}] {message}")]
    Other { code: u16, message: String },
}

impl ResultError {
    /// Create a parse error at an absolute byte offset of the document
    pub fn parse(code: u16, message: impl Into<String>, offset: u64) -> Self {
        Self::Parse {
            code,
            message: message.into(),
            offset,
        }
    }

    /// Create a transport error with default code
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            code: ErrorCode::TRANSPORT_GENERIC,
            message: message.into(),
        }
    }

    /// Create a transport error with specific code
    pub fn transport_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Transport {
            code,
            message: message.into(),
        }
    }

    /// Create a channel error for the named channel
    pub fn channel(code: u16, channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Channel {
            code,
            message: message.into(),
            channel: channel.into(),
        }
    }

    /// Create a decode error with default code
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            code: ErrorCode::DECODE_GENERIC,
            message: message.into(),
        }
    }

    /// Create a decode error with specific code
    pub fn decode_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Decode {
            code,
            message: message.into(),
        }
    }

    /// Create a configuration error with default code
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            code: ErrorCode::CONFIG_GENERIC,
            message: message.into(),
            field: None,
        }
    }

    /// Create a configuration error with specific code and field
    pub fn config_with_code(code: u16, message: impl Into<String>, field: Option<String>) -> Self {
        Self::Config {
            code,
            message: message.into(),
            field,
        }
    }

    /// Create a generic other error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            code: ErrorCode::OTHER_GENERIC,
            message: message.into(),
        }
    }

    /// Add context to the error message
    pub fn with_context(mut self, context: impl Display) -> Self {
        match &mut self {
            Self::Parse { message, .. }
            | Self::Transport { message, .. }
            | Self::Channel { message, .. }
            | Self::Decode { message, .. }
            | Self::Config { message, .. }
            | Self::Other { message, .. } => {
                *message = format!("{}: {}", message, context);
            }
        }
        self
    }

    /// Get the error code
    pub fn code(&self) -> u16 {
        match self {
            Self::Parse { code, .. }
            | Self::Transport { code, .. }
            | Self::Channel { code, .. }
            | Self::Decode { code, .. }
            | Self::Config { code, .. }
            | Self::Other { code, .. } => *code,
        }
    }

    /// Whether the failure was a transport timeout
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Transport {
                code: ErrorCode::TRANSPORT_TIMEOUT,
                ..
            }
        )
    }

    /// Whether the failure came from the document itself rather than the transport
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Parse {
                message, offset, ..
            } => format!("Malformed response near byte {}: {}", offset, message),
            Self::Transport { message, .. } => format!("Response stream failed: {}", message),
            Self::Channel {
                message, channel, ..
            } => format!("Cannot read {}: {}", channel, message),
            Self::Decode { message, .. } => format!("Decode failed: {}", message),
            Self::Config { message, field, .. } => {
                if let Some(f) = field {
                    format!("Configuration problem with '{}': {}", f, message)
                } else {
                    format!("Configuration problem: {}", message)
                }
            }
            Self::Other { message, .. } => message.clone(),
        }
    }
}

/// Type alias for Results using ResultError
pub type Result<T> = std::result::Result<T, ResultError>;
