/// Error code registry for analytics-result
///
/// Error codes are organized by category:
/// - 1000-1999: Parse errors
/// - 2000-2999: Transport errors
/// - 3000-3999: Channel errors
/// - 4000-4999: Decode errors
/// - 5000-5999: Configuration errors
/// - 9000-9999: Other errors
#[allow(dead_code)]
pub struct ErrorCode;

impl ErrorCode {
    // Parse errors (1000-1999)
    pub const PARSE_GENERIC: u16 = 1000;
    pub const PARSE_NOT_AN_OBJECT: u16 = 1001;
    pub const PARSE_UNEXPECTED_BYTE: u16 = 1002;
    pub const PARSE_UNEXPECTED_EOF: u16 = 1003;
    pub const PARSE_INVALID_VALUE: u16 = 1004;
    pub const PARSE_VALUE_TOO_LARGE: u16 = 1005;
    pub const PARSE_TRAILING_DATA: u16 = 1006;
    pub const PARSE_UNEXPECTED_SECTION_TYPE: u16 = 1007;

    // Transport errors (2000-2999)
    pub const TRANSPORT_GENERIC: u16 = 2000;
    pub const TRANSPORT_TIMEOUT: u16 = 2001;
    pub const TRANSPORT_CONNECTION_LOST: u16 = 2002;
    pub const TRANSPORT_IO: u16 = 2003;
    pub const TRANSPORT_HANDLE_NOT_FOUND: u16 = 2004;

    // Channel errors (3000-3999)
    pub const CHANNEL_GENERIC: u16 = 3000;
    pub const CHANNEL_ALREADY_CONSUMED: u16 = 3001;
    pub const CHANNEL_ABANDONED: u16 = 3002;

    // Decode errors (4000-4999)
    pub const DECODE_GENERIC: u16 = 4000;
    pub const DECODE_ROW: u16 = 4001;

    // Configuration errors (5000-5999)
    pub const CONFIG_GENERIC: u16 = 5000;
    pub const CONFIG_NOT_FOUND: u16 = 5001;
    pub const CONFIG_PARSE_ERROR: u16 = 5002;
    pub const CONFIG_INVALID_VALUE: u16 = 5003;

    // Other errors (9000-9999)
    pub const OTHER_GENERIC: u16 = 9000;
    pub const OTHER_INTERNAL_ERROR: u16 = 9001;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        // Parse errors
        1000 => "Generic parse error",
        1001 => "Response is not a JSON object",
        1002 => "Unexpected byte in response",
        1003 => "Response ended before the document was complete",
        1004 => "Invalid JSON value in response",
        1005 => "Single value exceeds the configured size limit",
        1006 => "Unexpected data after the response document",
        1007 => "Section has an unexpected JSON type",

        // Transport errors
        2000 => "Generic transport error",
        2001 => "Response stream timed out",
        2002 => "Connection lost while streaming",
        2003 => "Transport I/O error",
        2004 => "Deferred result handle not found",

        // Channel errors
        3000 => "Generic channel error",
        3001 => "Channel items were already consumed by another subscriber",
        3002 => "Channel producer went away without completing",

        // Decode errors
        4000 => "Generic decode error",
        4001 => "Row could not be decoded into the requested type",

        // Configuration errors
        5000 => "Generic configuration error",
        5001 => "Configuration file not found",
        5002 => "Failed to parse configuration",
        5003 => "Invalid value in configuration",

        // Other errors
        9000 => "Generic error",
        9001 => "Internal error",

        _ => "Unknown error code",
    }
}
