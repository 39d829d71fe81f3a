//! Client configuration.
//!
//! # Design
//! Every field is optional so a partial configuration can be layered over
//! defaults: only keys that were actually provided take part in a merge.
//! Merging happens on the JSON representation, recursively, with the
//! overlay winning on every leaf it sets. Headers are the exception; they
//! merge through `HeaderSet` so names stay case-insensitive.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::http::HeaderSet;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_uri: Option<String>,
    /// Default headers sent with every request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<HeaderSet>,
    /// Log the curl rendering of each request instead of its request line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_curl: Option<bool>,
    /// Turn 4xx and 5xx responses into errors. On unless set to false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_errors: Option<bool>,
    #[serde(skip_serializing_if = "TransportConfig::is_empty")]
    pub transport: TransportConfig,
    /// Keys this crate does not interpret, kept for profiles and transports.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Settings for the default transport. Durations are in seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_redirects: Option<u32>,
    /// Largest response body read, in bytes. Unlimited when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_body_size: Option<u64>,
    /// Keys the default transport does not apply, kept for custom transports.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TransportConfig {
    pub fn is_empty(&self) -> bool {
        self.timeout.is_none()
            && self.connect_timeout.is_none()
            && self.max_redirects.is_none()
            && self.max_body_size.is_none()
            && self.extra.is_empty()
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::BadConfiguration(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::BadConfiguration(e.to_string()))
    }

    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(Error::Serialization)
    }

    /// Layer `self` over `defaults`, recursing into nested maps.
    pub fn merged_over(self, defaults: &Config) -> Result<Config> {
        let mut merged = defaults.to_value()?;
        merge_values(&mut merged, self.to_value()?);
        let mut merged = Config::from_value(merged)?;

        merged.headers = match (&defaults.headers, self.headers) {
            (Some(base), Some(overlay)) => Some(base.clone().merged(&overlay)),
            (base, overlay) => overlay.or_else(|| base.clone()),
        };
        Ok(merged)
    }

    pub fn log_curl(&self) -> bool {
        self.log_curl.unwrap_or(false)
    }

    pub fn http_errors(&self) -> bool {
        self.http_errors.unwrap_or(true)
    }

    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = Some(base_uri.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.get_or_insert_with(HeaderSet::new).set(name, value);
        self
    }

    pub fn with_headers(mut self, headers: &HeaderSet) -> Self {
        self.headers.get_or_insert_with(HeaderSet::new).merge(headers);
        self
    }

    pub fn with_log_curl(mut self, enabled: bool) -> Self {
        self.log_curl = Some(enabled);
        self
    }

    pub fn with_http_errors(mut self, enabled: bool) -> Self {
        self.http_errors = Some(enabled);
        self
    }

    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.transport.timeout = Some(seconds);
        self
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Recursively replace `base` with `overlay`. Objects merge by key and
/// arrays by index; any other value replaces the base outright.
pub fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(base), Value::Array(overlay)) => {
            for (index, value) in overlay.into_iter().enumerate() {
                match base.get_mut(index) {
                    Some(existing) => merge_values(existing, value),
                    None => base.push(value),
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
