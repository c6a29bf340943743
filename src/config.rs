//! Stream configuration
//!
//! Buffer sizes and limits for one query result. Values come from
//! `Default`, an optional TOML file, and `ANALYTICS_RESULT_*` environment
//! variables, in that order of precedence (later wins).

use crate::error::{common, ErrorCode, ErrorExt, Result, ResultError};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ENV_ROW_BUFFER: &str = "ANALYTICS_RESULT_ROW_BUFFER";
pub const ENV_ERROR_BUFFER: &str = "ANALYTICS_RESULT_ERROR_BUFFER";
pub const ENV_MAX_VALUE_BYTES: &str = "ANALYTICS_RESULT_MAX_VALUE_BYTES";
pub const ENV_READ_CHUNK_SIZE: &str = "ANALYTICS_RESULT_READ_CHUNK_SIZE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Rows buffered beyond the slowest row subscriber
    pub row_buffer: usize,
    /// Entries buffered beyond the slowest errors/warnings subscriber
    pub error_buffer: usize,
    /// Largest single value the splitter will hold
    pub max_value_bytes: usize,
    /// Read size used by reader-backed sources
    pub read_chunk_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            row_buffer: 256,
            error_buffer: 64,
            max_value_bytes: 16 * 1024 * 1024,
            read_chunk_size: 8192,
        }
    }
}

impl StreamConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .to_config_error(ErrorCode::CONFIG_PARSE_ERROR, "invalid stream configuration")
    }

    /// Load a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ResultError::config_with_code(
                ErrorCode::CONFIG_NOT_FOUND,
                format!("{} does not exist", path.display()),
                None,
            ));
        }
        let content = std::fs::read_to_string(path).to_config_error(
            ErrorCode::CONFIG_GENERIC,
            format!("failed to read {}", path.display()),
        )?;
        Self::from_toml_str(&content)
    }

    /// Apply `ANALYTICS_RESULT_*` overrides from the process environment
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable lookup
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fields: [(&str, &mut usize); 4] = [
            (ENV_ROW_BUFFER, &mut self.row_buffer),
            (ENV_ERROR_BUFFER, &mut self.error_buffer),
            (ENV_MAX_VALUE_BYTES, &mut self.max_value_bytes),
            (ENV_READ_CHUNK_SIZE, &mut self.read_chunk_size),
        ];
        for (name, field) in fields {
            if let Some(raw) = lookup(name) {
                *field = raw.trim().parse().map_err(|e| {
                    ResultError::config_with_code(
                        ErrorCode::CONFIG_INVALID_VALUE,
                        format!("{} is not a size: {}", name, e),
                        Some(name.to_string()),
                    )
                })?;
            }
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        let sizes = [
            ("row_buffer", self.row_buffer),
            ("error_buffer", self.error_buffer),
            ("max_value_bytes", self.max_value_bytes),
            ("read_chunk_size", self.read_chunk_size),
        ];
        for (field, value) in sizes {
            if value == 0 {
                return Err(common::invalid_config_value(field, "must be greater than zero"));
            }
        }
        Ok(())
    }

    pub fn with_row_buffer(mut self, row_buffer: usize) -> Self {
        self.row_buffer = row_buffer;
        self
    }

    pub fn with_error_buffer(mut self, error_buffer: usize) -> Self {
        self.error_buffer = error_buffer;
        self
    }

    pub fn with_max_value_bytes(mut self, max_value_bytes: usize) -> Self {
        self.max_value_bytes = max_value_bytes;
        self
    }

    pub fn with_read_chunk_size(mut self, read_chunk_size: usize) -> Self {
        self.read_chunk_size = read_chunk_size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let config = StreamConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.row_buffer, 256);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = StreamConfig::from_toml_str("row_buffer = 8\n").unwrap();
        assert_eq!(config.row_buffer, 8);
        assert_eq!(config.error_buffer, StreamConfig::default().error_buffer);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "max_value_bytes = 1024\nread_chunk_size = 16").unwrap();

        let config = StreamConfig::load(file.path()).unwrap();
        assert_eq!(config.max_value_bytes, 1024);
        assert_eq!(config.read_chunk_size, 16);
    }

    #[test]
    fn test_missing_file_and_bad_toml() {
        let err = StreamConfig::load(Path::new("/nonexistent/stream.toml")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_NOT_FOUND);

        let err = StreamConfig::from_toml_str("row_buffer = \"many\"").unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_PARSE_ERROR);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> =
            HashMap::from([(ENV_ROW_BUFFER, "4"), (ENV_READ_CHUNK_SIZE, " 32 ")]);
        let config = StreamConfig::default()
            .with_overrides_from(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.row_buffer, 4);
        assert_eq!(config.read_chunk_size, 32);

        let err = StreamConfig::default()
            .with_overrides_from(|name| (name == ENV_ERROR_BUFFER).then(|| "lots".to_string()))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_INVALID_VALUE);
    }

    #[test]
    fn test_zero_sizes_are_rejected() {
        let err = StreamConfig::default()
            .with_error_buffer(0)
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            ResultError::Config { field: Some(ref f), .. } if f == "error_buffer"
        ));
    }
}
