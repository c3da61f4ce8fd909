//! The declarative option set controlling container creation.
//!
//! Options are a permissive bag of named JSON values. A missing key, a value
//! of the wrong type, or a list holding non-string elements all behave as if
//! the option were absent; accessors never raise an error.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const WORKING_DIR: &str = "workingDir";
pub const ENV: &str = "env";
pub const CPU_SET: &str = "cpuset";
pub const PORTS: &str = "ports";
pub const MEMORY_LIMIT: &str = "memory";
pub const ADD_HOST: &str = "add-host";
// Declared for parity with the option surface; no behavior reads it yet.
pub const ADD_DNS: &str = "dns";
pub const NETWORK: &str = "network";
pub const TIMEOUT: &str = "timeout";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Options(Map<String, Value>);

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: Value) -> Self {
        self.0.insert(key.to_string(), value);
        self
    }

    pub fn with_str(self, key: &str, value: &str) -> Self {
        self.set(key, Value::String(value.to_string()))
    }

    pub fn with_str_list<I, S>(self, key: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list = values
            .into_iter()
            .map(|v| Value::String(v.into()))
            .collect();
        self.set(key, Value::Array(list))
    }

    pub fn with_int(self, key: &str, value: i64) -> Self {
        self.set(key, Value::Number(value.into()))
    }

    pub fn str_opt(&self, key: &str) -> Option<&str> {
        self.0.get(key)?.as_str()
    }

    /// A list option is honored only when every element is a string,
    /// mirroring a whole-value type assertion.
    pub fn str_list(&self, key: &str) -> Option<Vec<String>> {
        let list = self.0.get(key)?.as_array()?;
        list.iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect()
    }

    pub fn int_opt(&self, key: &str) -> Option<i64> {
        self.0.get(key)?.as_i64()
    }

    /// Bound on the synchronous wait, in seconds. Zero, negative, absent and
    /// mistyped all mean unbounded.
    pub fn timeout_secs(&self) -> i64 {
        self.int_opt(TIMEOUT).filter(|t| *t > 0).unwrap_or(0)
    }
}

/// Parses a human-readable size string ("32", "512 KB", "1.5GB") into bytes,
/// using SI base-1000 units. Returns `None` on anything unparseable; callers
/// treat that as the option being absent.
pub fn from_human_size(size: &str) -> Option<i64> {
    let trimmed = size.trim();
    let digits_end = trimmed
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(trimmed.len());
    if digits_end == 0 {
        return None;
    }

    let value: f64 = trimmed[..digits_end].parse().ok()?;
    let unit = trimmed[digits_end..].trim().to_ascii_lowercase();

    let multiplier: f64 = match unit.as_str() {
        "" | "b" => 1.0,
        "k" | "kb" => 1e3,
        "m" | "mb" => 1e6,
        "g" | "gb" => 1e9,
        "t" | "tb" => 1e12,
        "p" | "pb" => 1e15,
        _ => return None,
    };

    Some((value * multiplier) as i64)
}
