//! Values delivered by a query result

use crate::error::{ErrorCode, ErrorExt, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// One result row. Cheap to clone; every subscriber shares the same value.
#[derive(Debug, Clone, PartialEq)]
pub struct Row(Arc<Value>);

impl Row {
    pub fn new(value: Value) -> Self {
        Self(Arc::new(value))
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Arc::try_unwrap(self.0).unwrap_or_else(|shared| (*shared).clone())
    }

    /// Decode the row into a typed value
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        T::deserialize(self.0.as_ref()).to_decode_error(ErrorCode::DECODE_ROW, "row")
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

/// A warning or error reported by the query service
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorEntry {
    pub code: Option<i64>,
    pub message: Option<String>,
    pub raw: Value,
}

impl ErrorEntry {
    pub fn from_value(raw: Value) -> Self {
        let code = raw.get("code").and_then(Value::as_i64);
        let message = raw
            .get("msg")
            .or_else(|| raw.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string);
        Self { code, message, raw }
    }
}

impl fmt::Display for ErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.message.as_deref()) {
            (Some(code), Some(msg)) => write!(f, "{}: {}", code, msg),
            (None, Some(msg)) => f.write_str(msg),
            _ => write!(f, "{}", self.raw),
        }
    }
}

impl Serialize for ErrorEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

/// Execution metrics. Keeps the wire object so re-serialization is lossless.
///
/// Typed fields are best effort: a field of an unexpected type reads as
/// `None` while the raw object still carries it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    #[serde(default, deserialize_with = "lenient")]
    pub elapsed_time: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub execution_time: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub result_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub result_size: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub processed_objects: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub error_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub warning_count: Option<u64>,
    #[serde(skip)]
    raw: Value,
}

fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

impl Metrics {
    /// Never fails on well-formed JSON; a non-object leaves every typed field empty
    pub fn from_value(raw: Value) -> Self {
        let mut metrics: Metrics = serde_json::from_value(raw.clone()).unwrap_or_default();
        metrics.raw = raw;
        metrics
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

impl Serialize for Metrics {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

/// Terminal status of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Running,
    Success,
    Errors,
    Completed,
    Stopped,
    Timeout,
    Closed,
    Fatal,
    Aborted,
    Unknown,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Success => "success",
            Self::Errors => "errors",
            Self::Completed => "completed",
            Self::Stopped => "stopped",
            Self::Timeout => "timeout",
            Self::Closed => "closed",
            Self::Fatal => "fatal",
            Self::Aborted => "aborted",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Statuses that mean the query produced no usable result
    pub fn is_fatal_class(&self) -> bool {
        matches!(self, Self::Fatal | Self::Aborted | Self::Errors)
    }
}

impl FromStr for Status {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "running" => Self::Running,
            "success" => Self::Success,
            "errors" => Self::Errors,
            "completed" => Self::Completed,
            "stopped" => Self::Stopped,
            "timeout" => Self::Timeout,
            "closed" => Self::Closed,
            "fatal" => Self::Fatal,
            "aborted" => Self::Aborted,
            _ => Self::Unknown,
        })
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
