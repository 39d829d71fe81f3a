//! Responses returned by the transport and the wrapper handed to callers.
//!
//! # Design
//! `RawResponse` is what a transport produces: status line, headers and a
//! fully buffered body. `Response` wraps it together with the request that
//! produced it and a structured view of the body. The view is parsed on
//! first access and memoized; it never fails, so a body that is not JSON
//! simply reads as an empty object.

use std::borrow::Cow;
use std::fmt;
use std::sync::OnceLock;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::data::Data;
use crate::error::{Error, Result};
use crate::http::{ContentType, HeaderSet};
use crate::request::Request;

/// A response as received from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub reason: String,
    pub version: String,
    pub headers: HeaderSet,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            reason: String::new(),
            version: "1.1".to_string(),
            headers: HeaderSet::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_json(self, value: &Value) -> Self {
        self.with_header("Content-Type", "application/json")
            .with_body(value.to_string())
    }
}

/// A received response, linked to the request that produced it.
#[derive(Debug, Clone)]
pub struct Response {
    raw: RawResponse,
    request: Option<Request>,
    data: OnceLock<Data>,
}

impl Response {
    pub fn new(status: u16, headers: HeaderSet, body: impl Into<Vec<u8>>) -> Self {
        Self::from_raw(
            RawResponse {
                headers,
                body: body.into(),
                ..RawResponse::new(status)
            },
            None,
        )
    }

    pub fn from_raw(raw: RawResponse, request: Option<Request>) -> Self {
        Self {
            raw,
            request,
            data: OnceLock::new(),
        }
    }

    pub fn status(&self) -> u16 {
        self.raw.status
    }

    pub fn reason_phrase(&self) -> &str {
        &self.raw.reason
    }

    pub fn version(&self) -> &str {
        &self.raw.version
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.raw.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.raw.headers.get(name)
    }

    pub fn body(&self) -> &[u8] {
        &self.raw.body
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.raw.body)
    }

    pub fn request(&self) -> Option<&Request> {
        self.request.as_ref()
    }

    pub fn set_request(&mut self, request: Request) {
        self.request = Some(request);
    }

    /// Structured view of a JSON body, parsed once.
    pub fn data(&self) -> &Data {
        self.data.get_or_init(|| self.parse_data())
    }

    /// Apply `f` to the memoized structured view.
    pub fn update_data<R>(&mut self, f: impl FnOnce(&mut Data) -> R) -> R {
        let mut data = self.data.take().unwrap_or_else(|| self.parse_data());
        let result = f(&mut data);
        self.data = OnceLock::from(data);
        result
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        self.data().get(path)
    }

    pub fn has(&self, path: &str) -> bool {
        self.data().has(path)
    }

    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> bool {
        self.update_data(|data| data.set(path, value))
    }

    pub fn to_value(&self) -> Value {
        self.data().as_value().clone()
    }

    pub fn to_json(&self) -> String {
        self.data().to_json()
    }

    /// Decode the body into `T`, reporting malformed JSON as an error.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.raw.body).map_err(Error::Deserialization)
    }

    /// Curl rendering of the originating request.
    pub fn curl_request(&self) -> Option<String> {
        self.request.as_ref().map(Request::to_curl)
    }

    pub fn into_raw(self) -> RawResponse {
        self.raw
    }

    fn parse_data(&self) -> Data {
        if self.is_json() {
            Data::from_slice(&self.raw.body)
        } else {
            Data::empty()
        }
    }
}

impl ContentType for Response {
    fn headers(&self) -> &HeaderSet {
        &self.raw.headers
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}
