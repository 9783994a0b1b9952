//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use bmsync_core::store::{StoreContent, StoreKey, TraceLogItem};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print values read from the store, in the order they were requested
    pub fn print_values(&self, entries: &[(StoreKey, Option<StoreContent>)]) {
        match self.format {
            OutputFormat::Human => {
                for (key, value) in entries {
                    match value {
                        Some(StoreContent::Log(items)) => {
                            println!("{}: {} entr(ies)", key, items.len());
                        }
                        Some(value) => println!("{}: {}", key, render_value(value)),
                        None => println!("{}: (not set)", key),
                    }
                }
            }
            OutputFormat::Json => {
                let mut map = Map::new();
                for (key, value) in entries {
                    map.insert(
                        key.to_string(),
                        value.as_ref().map(StoreContent::to_json).unwrap_or(Value::Null),
                    );
                }
                println!("{}", pretty(&Value::Object(map)));
            }
            OutputFormat::Quiet => {
                for (_, value) in entries {
                    match value {
                        Some(value) => println!("{}", render_compact(value)),
                        None => println!(),
                    }
                }
            }
        }
    }

    /// Print the set of keys that hold data
    pub fn print_keys(&self, keys: &[StoreKey]) {
        match self.format {
            OutputFormat::Human => {
                if keys.is_empty() {
                    println!("No keys found.");
                    return;
                }
                for key in keys {
                    println!("{}", key);
                }
                println!("\n{} key(s)", keys.len());
            }
            OutputFormat::Json => {
                let names: Vec<_> = keys.iter().map(|k| k.as_str()).collect();
                println!("{}", pretty(&serde_json::json!(names)));
            }
            OutputFormat::Quiet => {
                for key in keys {
                    println!("{}", key);
                }
            }
        }
    }

    /// Print trace log entries, oldest first
    pub fn print_log(&self, items: &[TraceLogItem]) {
        match self.format {
            OutputFormat::Human => {
                if items.is_empty() {
                    println!("Trace log is empty.");
                    return;
                }
                for item in items {
                    println!(
                        "{} [{:<5}] {}",
                        format_timestamp(item.timestamp),
                        item.level,
                        item.message
                    );
                }
                println!("\n{} entr(ies)", items.len());
            }
            OutputFormat::Json => {
                let value = serde_json::to_value(items).unwrap_or(Value::Null);
                println!("{}", pretty(&value));
            }
            OutputFormat::Quiet => {
                for item in items {
                    println!("{}", item.message);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Human rendering of one stored value
fn render_value(value: &StoreContent) -> String {
    match value {
        StoreContent::Text(s) => s.clone(),
        StoreContent::Document(doc) => pretty(doc),
        other => render_compact(other),
    }
}

/// Single-line rendering of one stored value
fn render_compact(value: &StoreContent) -> String {
    match value {
        StoreContent::Text(s) => s.clone(),
        other => other.to_json().to_string(),
    }
}

/// Format a millisecond timestamp for display
fn format_timestamp(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
        .unwrap_or_else(|| millis.to_string())
}
