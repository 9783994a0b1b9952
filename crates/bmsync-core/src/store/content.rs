//! Values held by the store

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Severity of a trace log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceLogLevel {
    Trace,
    Warn,
    Error,
}

impl TraceLogLevel {
    /// Integer stored in the log table
    pub fn as_i64(self) -> i64 {
        match self {
            TraceLogLevel::Trace => 0,
            TraceLogLevel::Warn => 1,
            TraceLogLevel::Error => 2,
        }
    }

    /// Unknown levels read back from disk are treated as plain trace
    pub fn from_i64(value: i64) -> Self {
        match value {
            1 => TraceLogLevel::Warn,
            2 => TraceLogLevel::Error,
            _ => TraceLogLevel::Trace,
        }
    }
}

impl fmt::Display for TraceLogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceLogLevel::Trace => f.write_str("trace"),
            TraceLogLevel::Warn => f.write_str("warn"),
            TraceLogLevel::Error => f.write_str("error"),
        }
    }
}

impl std::str::FromStr for TraceLogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(TraceLogLevel::Trace),
            "warn" => Ok(TraceLogLevel::Warn),
            "error" => Ok(TraceLogLevel::Error),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

/// One row of the diagnostic trace log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceLogItem {
    /// Milliseconds since the epoch; unique and the ordering key
    pub timestamp: i64,
    pub level: TraceLogLevel,
    pub message: String,
}

impl TraceLogItem {
    pub fn new(timestamp: i64, level: TraceLogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            level,
            message: message.into(),
        }
    }
}

/// Value associated with a store key
///
/// Scalar keys hold `Bool`, `Int` or `Text`. Structured keys hold any
/// variant, usually `Document`. The log key reads back as `Log`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum StoreContent {
    Bool(bool),
    Int(i64),
    Text(String),
    Document(Value),
    /// A single entry, only meaningful when writing the log key
    LogItem(TraceLogItem),
    Log(Vec<TraceLogItem>),
}

impl StoreContent {
    /// Whether the primitive plugin can hold this value
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            StoreContent::Bool(_) | StoreContent::Int(_) | StoreContent::Text(_)
        )
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StoreContent::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StoreContent::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Value> {
        match self {
            StoreContent::Document(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_log(&self) -> Option<&[TraceLogItem]> {
        match self {
            StoreContent::Log(items) => Some(items),
            _ => None,
        }
    }

    /// Plain JSON view, used by the primitive plugin's file format and the CLI
    pub fn to_json(&self) -> Value {
        match self {
            StoreContent::Bool(b) => Value::Bool(*b),
            StoreContent::Int(i) => Value::from(*i),
            StoreContent::Text(s) => Value::String(s.clone()),
            StoreContent::Document(v) => v.clone(),
            StoreContent::LogItem(item) => serde_json::to_value(item).unwrap_or(Value::Null),
            StoreContent::Log(items) => serde_json::to_value(items).unwrap_or(Value::Null),
        }
    }

    /// Interpret plain JSON: primitives map to scalar variants, the rest is a document
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Bool(b) => StoreContent::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => StoreContent::Int(i),
                None => StoreContent::Document(Value::Number(n)),
            },
            Value::String(s) => StoreContent::Text(s),
            other => StoreContent::Document(other),
        }
    }
}

impl From<bool> for StoreContent {
    fn from(value: bool) -> Self {
        StoreContent::Bool(value)
    }
}

impl From<i64> for StoreContent {
    fn from(value: i64) -> Self {
        StoreContent::Int(value)
    }
}

impl From<&str> for StoreContent {
    fn from(value: &str) -> Self {
        StoreContent::Text(value.to_string())
    }
}

impl From<String> for StoreContent {
    fn from(value: String) -> Self {
        StoreContent::Text(value)
    }
}

impl From<Value> for StoreContent {
    fn from(value: Value) -> Self {
        StoreContent::Document(value)
    }
}

/// Explicit operation on the trace log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOp {
    Append(TraceLogItem),
    Clear,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_level_codes() {
        for level in [TraceLogLevel::Trace, TraceLogLevel::Warn, TraceLogLevel::Error] {
            assert_eq!(TraceLogLevel::from_i64(level.as_i64()), level);
        }
        assert_eq!(TraceLogLevel::from_i64(42), TraceLogLevel::Trace);
        assert_eq!("WARN".parse::<TraceLogLevel>().unwrap(), TraceLogLevel::Warn);
    }

    #[test]
    fn test_primitive_detection() {
        assert!(StoreContent::Bool(true).is_primitive());
        assert!(StoreContent::from("x").is_primitive());
        assert!(!StoreContent::Document(json!([1])).is_primitive());
        assert!(!StoreContent::Log(vec![]).is_primitive());
    }

    #[test]
    fn test_from_json() {
        assert_eq!(StoreContent::from_json(json!(true)), StoreContent::Bool(true));
        assert_eq!(StoreContent::from_json(json!(12)), StoreContent::Int(12));
        assert_eq!(StoreContent::from_json(json!("a")), StoreContent::from("a"));
        assert_eq!(
            StoreContent::from_json(json!(1.5)),
            StoreContent::Document(json!(1.5))
        );
        assert_eq!(
            StoreContent::from_json(json!([{"id": 1}])),
            StoreContent::Document(json!([{"id": 1}]))
        );
    }

    #[test]
    fn test_tagged_encoding_keeps_variant() {
        // A text value that looks like JSON must not come back as a document
        let content = StoreContent::Text("[1,2]".to_string());
        let encoded = serde_json::to_string(&content).unwrap();
        let decoded: StoreContent = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, content);
    }
}
