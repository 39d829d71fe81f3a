//! HTTP primitives shared by requests and responses.
//!
//! # Design
//! Methods and headers are plain data. `HeaderSet` keeps insertion order so
//! that rendered output (curl commands, log lines) is stable, while every
//! lookup compares names case-insensitively. The `ContentType` trait gives
//! requests and responses the same media-type inspection without either
//! owning the other.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// HTTP method for a request.
///
/// Unknown verbs are kept verbatim in `Other` so that non-standard methods
/// reach the transport untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Other(String),
}

impl HttpMethod {
    /// Trim and upper-case `method`, mapping it onto a known verb when possible.
    pub fn parse(method: &str) -> Self {
        let method = method.trim().to_ascii_uppercase();
        match method.as_str() {
            "GET" => HttpMethod::Get,
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "PATCH" => HttpMethod::Patch,
            "DELETE" => HttpMethod::Delete,
            "HEAD" => HttpMethod::Head,
            "OPTIONS" => HttpMethod::Options,
            _ => HttpMethod::Other(method),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Other(method) => method,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for HttpMethod {
    fn from(method: &str) -> Self {
        HttpMethod::parse(method)
    }
}

impl From<String> for HttpMethod {
    fn from(method: String) -> Self {
        HttpMethod::parse(&method)
    }
}

/// Ordered header list with case-insensitive names.
///
/// `set` replaces (last write wins), `append` repeats a header. Both keep
/// the position of the first occurrence so output order is predictable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    entries: Vec<(String, String)>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// First value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Every value stored under `name`, in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Replace every value of `name` with `value`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter().position(|(key, _)| key.eq_ignore_ascii_case(&name)) {
            Some(index) => {
                let mut seen = 0;
                self.entries.retain(|(key, _)| {
                    if key.eq_ignore_ascii_case(&name) {
                        seen += 1;
                        seen == 1
                    } else {
                        true
                    }
                });
                self.entries[index] = (name, value);
            }
            None => self.entries.push((name, value)),
        }
    }

    /// Set `name` only when no value is present yet.
    pub fn set_default(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if !self.contains(&name) {
            self.entries.push((name, value.into()));
        }
    }

    /// Add another value for `name` without replacing existing ones.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Remove every value of `name`, returning the first one.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let first = self.get(name).map(str::to_string);
        self.entries.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        first
    }

    /// Lay `other` over `self`; names present in `other` win.
    ///
    /// Repeated names inside `other` stay repeated.
    pub fn merge(&mut self, other: &HeaderSet) {
        let mut replaced: Vec<&str> = Vec::new();
        for (name, value) in &other.entries {
            if replaced.iter().any(|seen| seen.eq_ignore_ascii_case(name)) {
                self.append(name.clone(), value.clone());
            } else {
                self.set(name.clone(), value.clone());
                replaced.push(name);
            }
        }
    }

    pub fn merged(mut self, other: &HeaderSet) -> Self {
        self.merge(other);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HeaderSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = HeaderSet::new();
        for (name, value) in iter {
            headers.set(name, value);
        }
        headers
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for HeaderSet {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl Serialize for HeaderSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for HeaderSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HeaderSetVisitor;

        impl<'de> Visitor<'de> for HeaderSetVisitor {
            type Value = HeaderSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of header names to string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<HeaderSet, A::Error> {
                let mut headers = HeaderSet::new();
                while let Some((name, value)) = access.next_entry::<String, String>()? {
                    headers.set(name, value);
                }
                Ok(headers)
            }
        }

        deserializer.deserialize_map(HeaderSetVisitor)
    }
}

/// Media-type inspection shared by `Request` and `Response`.
pub trait ContentType {
    fn headers(&self) -> &HeaderSet;

    /// `Content-Type` without parameters such as `; charset=UTF-8`.
    fn content_type(&self) -> Option<&str> {
        self.headers().get("content-type").map(media_type)
    }

    /// True for `application/json` and `application/<subtype>+json`.
    fn is_json(&self) -> bool {
        self.content_type().is_some_and(is_json_media_type)
    }
}

/// Strip parameters from a `Content-Type` value.
pub fn media_type(value: &str) -> &str {
    value.split_once(';').map_or(value, |(media, _)| media).trim()
}

pub fn is_json_media_type(media: &str) -> bool {
    let media = media.trim().to_ascii_lowercase();
    if media == "application/json" {
        return true;
    }
    media
        .strip_prefix("application/")
        .and_then(|rest| rest.strip_suffix("+json"))
        .is_some_and(|subtype| !subtype.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Headers(HeaderSet);

    impl ContentType for Headers {
        fn headers(&self) -> &HeaderSet {
            &self.0
        }
    }

    fn with_content_type(value: &str) -> Headers {
        Headers(HeaderSet::from([("Content-Type", value)]))
    }

    #[test]
    fn method_is_trimmed_and_upper_cased() {
        assert_eq!(HttpMethod::parse(" get "), HttpMethod::Get);
        assert_eq!(HttpMethod::parse("Patch"), HttpMethod::Patch);
        assert_eq!(HttpMethod::parse("purge"), HttpMethod::Other("PURGE".to_string()));
        assert_eq!(HttpMethod::parse("purge").as_str(), "PURGE");
    }

    #[test]
    fn header_lookup_ignores_case() {
        let headers = HeaderSet::from([("X-App-Identity", "MyApplication1234")]);
        assert_eq!(headers.get("x-app-identity"), Some("MyApplication1234"));
        assert!(headers.contains("X-APP-IDENTITY"));
        assert_eq!(headers.get("X-Missing"), None);
    }

    #[test]
    fn set_replaces_in_place() {
        let mut headers = HeaderSet::from([("A", "1"), ("B", "2")]);
        headers.set("a", "9");
        let pairs: Vec<_> = headers.iter().collect();
        assert_eq!(pairs, vec![("a", "9"), ("B", "2")]);
    }

    #[test]
    fn set_collapses_repeated_values() {
        let mut headers = HeaderSet::new();
        headers.append("Accept", "text/html");
        headers.append("Accept", "application/json");
        headers.set("accept", "*/*");
        assert_eq!(headers.get_all("Accept").collect::<Vec<_>>(), vec!["*/*"]);
    }

    #[test]
    fn merge_prefers_incoming_values() {
        let defaults = HeaderSet::from([("A", "1"), ("B", "2")]);
        let merged = defaults.merged(&HeaderSet::from([("A", "9")]));
        assert_eq!(merged.get("A"), Some("9"));
        assert_eq!(merged.get("B"), Some("2"));
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn merge_keeps_repeats_from_incoming_set() {
        let mut incoming = HeaderSet::new();
        incoming.append("Cookie", "a=1");
        incoming.append("Cookie", "b=2");
        let merged = HeaderSet::from([("Cookie", "old=0")]).merged(&incoming);
        assert_eq!(merged.get_all("cookie").collect::<Vec<_>>(), vec!["a=1", "b=2"]);
    }

    #[test]
    fn set_default_never_overrides() {
        let mut headers = HeaderSet::from([("content-type", "text/plain")]);
        headers.set_default("Content-Type", "application/json");
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
    }

    #[test]
    fn remove_drops_every_value() {
        let mut headers = HeaderSet::new();
        headers.append("X-Tag", "a");
        headers.append("x-tag", "b");
        assert_eq!(headers.remove("X-TAG").as_deref(), Some("a"));
        assert!(headers.is_empty());
    }

    #[test]
    fn header_set_serializes_as_object() {
        let headers = HeaderSet::from([("Accept", "application/json")]);
        let json = serde_json::to_value(&headers).unwrap();
        assert_eq!(json["Accept"], "application/json");
        let back: HeaderSet = serde_json::from_value(json).unwrap();
        assert_eq!(back, headers);
    }

    #[test]
    fn content_type_strips_parameters() {
        let headers = with_content_type("application/json; charset=UTF-8");
        assert_eq!(headers.content_type(), Some("application/json"));
        assert_eq!(Headers(HeaderSet::new()).content_type(), None);
    }

    #[test]
    fn json_media_types() {
        assert!(with_content_type("application/json").is_json());
        assert!(with_content_type("application/vnd.api+json").is_json());
        assert!(with_content_type("application/calendar+json").is_json());
        assert!(with_content_type("Application/JSON; charset=UTF-8").is_json());
        assert!(!with_content_type("text/html").is_json());
        assert!(!with_content_type("text/plain").is_json());
        assert!(!with_content_type("application/+json").is_json());
        assert!(!Headers(HeaderSet::new()).is_json());
    }
}
