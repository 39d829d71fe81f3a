//! Request construction: URI resolution, header merging and body defaults.
//!
//! # Design
//! `RequestBuilder` borrows the client's defaults instead of owning them, so
//! building a request never clones client state beyond the merged header
//! set. The free functions here (`resolve_uri`, `append_query`,
//! `build_query`) are pure string manipulation and are shared by the
//! client, the curl formatter and the transport.

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::http::{HeaderSet, HttpMethod};
use crate::request::{Body, Request, RequestOptions, APPLICATION_JSON};

/// Builds `Request` values from per-call input and client defaults.
#[derive(Debug, Clone, Copy)]
pub struct RequestBuilder<'a> {
    base_uri: Option<&'a str>,
    default_headers: &'a HeaderSet,
    json_headers: bool,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(default_headers: &'a HeaderSet) -> Self {
        Self {
            base_uri: None,
            default_headers,
            json_headers: false,
        }
    }

    pub fn base_uri(mut self, base_uri: Option<&'a str>) -> Self {
        self.base_uri = base_uri;
        self
    }

    /// Default `Content-Type` and `Accept` to JSON for every request.
    pub fn json_headers(mut self, enabled: bool) -> Self {
        self.json_headers = enabled;
        self
    }

    pub fn build(
        &self,
        method: impl Into<HttpMethod>,
        uri: &str,
        headers: &HeaderSet,
        body: Body,
        options: RequestOptions,
    ) -> Request {
        let mut merged = self.default_headers.clone().merged(headers);
        if body.is_json() {
            merged.set_default("Content-Type", APPLICATION_JSON);
        }
        if self.json_headers {
            merged.set_default("Content-Type", APPLICATION_JSON);
            merged.set_default("Accept", APPLICATION_JSON);
        }

        Request {
            method: method.into(),
            uri: resolve_uri(self.base_uri, uri),
            headers: merged,
            body: body.into_bytes(),
            version: "1.1".to_string(),
            options,
        }
    }
}

/// Prefix `uri` with `base` unless it is already an absolute http(s) URL.
///
/// Exactly one `/` separates the base from the path.
pub fn resolve_uri(base: Option<&str>, uri: &str) -> String {
    if is_absolute(uri) {
        return uri.to_string();
    }
    let path = if uri.starts_with('/') {
        uri.to_string()
    } else {
        format!("/{uri}")
    };
    match base {
        Some(base) if !base.is_empty() => {
            format!("{}{path}", base.strip_suffix('/').unwrap_or(base))
        }
        _ => path,
    }
}

fn is_absolute(uri: &str) -> bool {
    // Lower-case schemes only; `HTTPS://x` is treated as a path.
    uri.starts_with("http://") || uri.starts_with("https://")
}

/// Append an encoded query string to `uri`, keeping any fragment last.
pub fn append_query(uri: &str, query: &str) -> String {
    if query.is_empty() {
        return uri.to_string();
    }
    let (head, fragment) = match uri.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (uri, None),
    };
    let separator = if !head.contains('?') {
        "?"
    } else if head.ends_with('?') || head.ends_with('&') {
        ""
    } else {
        "&"
    };
    match fragment {
        Some(fragment) => format!("{head}{separator}{query}#{fragment}"),
        None => format!("{head}{separator}{query}"),
    }
}

/// Encode `query` as `application/x-www-form-urlencoded`.
///
/// Accepts maps, structs and sequences of `(key, value)` pairs. Nested
/// arrays and objects use bracket keys (`tags[0]=a`, `filter[year]=1813`),
/// booleans encode as `1`/`0` and nulls are dropped.
pub fn build_query<T: Serialize + ?Sized>(query: &T) -> Result<String> {
    let value = serde_json::to_value(query).map_err(|e| Error::InvalidQuery(e.to_string()))?;
    let mut serializer = form_urlencoded::Serializer::new(String::new());

    match value {
        Value::Null => {}
        Value::Object(map) => {
            for (key, value) in &map {
                encode_value(&mut serializer, key, value);
            }
        }
        Value::Array(pairs) => {
            for pair in &pairs {
                let (key, value) = match pair.as_array().map(Vec::as_slice) {
                    Some([key, value]) => (key, value),
                    _ => {
                        return Err(Error::InvalidQuery(
                            "sequence items must be [key, value] pairs".to_string(),
                        ))
                    }
                };
                let key = scalar_to_string(key)
                    .ok_or_else(|| Error::InvalidQuery("query keys must be scalars".to_string()))?;
                encode_value(&mut serializer, &key, value);
            }
        }
        _ => {
            return Err(Error::InvalidQuery(
                "query must be a map, struct or sequence of pairs".to_string(),
            ))
        }
    }

    Ok(serializer.finish())
}

/// Encode ordered `(name, value)` pairs as a form body.
pub fn encode_pairs(pairs: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

fn encode_value(serializer: &mut form_urlencoded::Serializer<'_, String>, key: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                encode_value(serializer, &format!("{key}[{index}]"), item);
            }
        }
        Value::Object(map) => {
            for (name, item) in map {
                encode_value(serializer, &format!("{key}[{name}]"), item);
            }
        }
        scalar => {
            if let Some(text) = scalar_to_string(scalar) {
                serializer.append_pair(key, &text);
            }
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(true) => Some("1".to_string()),
        Value::Bool(false) => Some("0".to_string()),
        _ => None,
    }
}
