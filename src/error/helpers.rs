use super::{ErrorCode, ResultError};

/// Extension trait for convenient error conversion
pub trait ErrorExt<T> {
    /// Convert to a decode error, keeping the original message as context
    fn to_decode_error(self, code: u16, message: impl Into<String>) -> Result<T, ResultError>;

    /// Convert to a configuration error, keeping the original message as context
    fn to_config_error(self, code: u16, message: impl Into<String>) -> Result<T, ResultError>;
}

impl<T, E> ErrorExt<T> for Result<T, E>
where
    E: std::fmt::Display,
{
    fn to_decode_error(self, code: u16, message: impl Into<String>) -> Result<T, ResultError> {
        self.map_err(|e| ResultError::decode_with_code(code, message).with_context(e))
    }

    fn to_config_error(self, code: u16, message: impl Into<String>) -> Result<T, ResultError> {
        self.map_err(|e| ResultError::config_with_code(code, message, None).with_context(e))
    }
}

/// Helper functions for common error scenarios
pub mod common {
    use super::*;

    /// The document ended while a value or the root object was still open
    pub fn unexpected_eof(offset: u64, expecting: &str) -> ResultError {
        ResultError::parse(
            ErrorCode::PARSE_UNEXPECTED_EOF,
            format!("response ended while expecting {}", expecting),
            offset,
        )
    }

    /// A byte that cannot appear at this point of the document
    pub fn unexpected_byte(offset: u64, found: u8, expecting: &str) -> ResultError {
        ResultError::parse(
            ErrorCode::PARSE_UNEXPECTED_BYTE,
            format!(
                "found '{}' while expecting {}",
                found.escape_ascii(),
                expecting
            ),
            offset,
        )
    }

    /// A subscription arrived after items were handed out and evicted
    pub fn already_consumed(channel: &str) -> ResultError {
        ResultError::channel(
            ErrorCode::CHANNEL_ALREADY_CONSUMED,
            channel,
            "items were already delivered to an earlier subscriber",
        )
    }

    /// The producer of a channel went away without completing it
    pub fn abandoned(channel: &str) -> ResultError {
        ResultError::channel(
            ErrorCode::CHANNEL_ABANDONED,
            channel,
            "producer stopped before completing the channel",
        )
    }

    /// A configuration value outside its allowed range
    pub fn invalid_config_value(field: &str, reason: &str) -> ResultError {
        ResultError::config_with_code(
            ErrorCode::CONFIG_INVALID_VALUE,
            format!("'{}' {}", field, reason),
            Some(field.to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_extension_trait() {
        let parsed: Result<u64, std::num::ParseIntError> = "x".parse::<u64>();

        let err = parsed
            .to_config_error(ErrorCode::CONFIG_PARSE_ERROR, "bad buffer size")
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_PARSE_ERROR);
        assert!(err.to_string().contains("bad buffer size: invalid digit"));
    }

    #[test]
    fn test_common_error_helpers() {
        let err = common::unexpected_eof(42, "a value");
        assert_eq!(err.code(), ErrorCode::PARSE_UNEXPECTED_EOF);
        assert!(err.user_message().contains("near byte 42"));

        let err = common::unexpected_byte(3, b'}', "a key");
        assert!(err.to_string().contains("found '}' while expecting a key"));

        let err = common::already_consumed("rows");
        assert_eq!(err.code(), ErrorCode::CHANNEL_ALREADY_CONSUMED);
        assert!(err.user_message().starts_with("Cannot read rows"));
    }
}
