//! Outgoing request values.
//!
//! # Design
//! A `Request` is plain data: every field is owned and public so it can be
//! inspected after the fact (curl rendering, error reports, logging).
//! Options that only the transport understands, such as form fields and
//! multipart parts, ride along in `RequestOptions` instead of being encoded
//! into the body up front, so the request still shows what the caller asked
//! for.

use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::curl::CurlFormatter;
use crate::error::{Error, Result};
use crate::http::{ContentType, HeaderSet, HttpMethod};

pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";
pub const APPLICATION_JSON: &str = "application/json";

/// Request payload before it is attached to a `Request`.
///
/// `Json` marks bytes produced by serializing a structured value; the
/// builder uses it to default the `Content-Type` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Body {
    #[default]
    Empty,
    Raw(Vec<u8>),
    Json(Vec<u8>),
}

impl Body {
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        serde_json::to_vec(value).map(Body::Json).map_err(Error::Serialization)
    }

    pub fn is_json(&self) -> bool {
        matches!(self, Body::Json(_))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Body::Empty => true,
            Body::Raw(bytes) | Body::Json(bytes) => bytes.is_empty(),
        }
    }

    /// Raw bytes, or `None` for an empty body.
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Body::Empty => None,
            Body::Raw(bytes) | Body::Json(bytes) => (!bytes.is_empty()).then_some(bytes),
        }
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Raw(text.as_bytes().to_vec())
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Raw(text.into_bytes())
    }
}

impl From<&[u8]> for Body {
    fn from(bytes: &[u8]) -> Self {
        Body::Raw(bytes.to_vec())
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Raw(bytes)
    }
}

impl From<serde_json::Value> for Body {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Body::Empty,
            value => Body::Json(value.to_string().into_bytes()),
        }
    }
}

impl<T: Into<Body>> From<Option<T>> for Body {
    fn from(body: Option<T>) -> Self {
        body.map_or(Body::Empty, Into::into)
    }
}

/// One part of a `multipart/form-data` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub name: String,
    pub contents: Vec<u8>,
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

impl Part {
    pub fn text(name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into().into_bytes(),
            filename: None,
            content_type: None,
        }
    }

    pub fn file(name: impl Into<String>, filename: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
            filename: Some(filename.into()),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Contents as text, when they are valid UTF-8.
    pub fn contents_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.contents).ok()
    }
}

/// Per-call options handed to the transport alongside the request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub form_params: Option<Vec<(String, String)>>,
    pub multipart: Option<Vec<Part>>,
    pub timeout: Option<Duration>,
    /// Overrides the client's status policy for this call.
    pub http_errors: Option<bool>,
    /// Transport-specific keys, passed through untouched.
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Form fields recovered from a form request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormData<'a> {
    UrlEncoded(&'a [(String, String)]),
    Multipart(&'a [Part]),
}

impl<'a> FormData<'a> {
    /// First value submitted under `name`.
    pub fn get(&self, name: &str) -> Option<&'a str> {
        match *self {
            FormData::UrlEncoded(fields) => fields
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            FormData::Multipart(parts) => parts
                .iter()
                .find(|part| part.name == name)
                .and_then(Part::contents_str),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FormData::UrlEncoded(fields) => fields.len(),
            FormData::Multipart(parts) => parts.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A fully formed HTTP request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: HttpMethod,
    pub uri: String,
    pub headers: HeaderSet,
    pub body: Option<Vec<u8>>,
    pub version: String,
    pub options: RequestOptions,
}

impl Request {
    pub fn new(method: impl Into<HttpMethod>, uri: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            headers: HeaderSet::new(),
            body: None,
            version: "1.1".to_string(),
            options: RequestOptions::default(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into().into_bytes();
        self
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        match &self.body {
            Some(bytes) => String::from_utf8_lossy(bytes),
            None => Cow::Borrowed(""),
        }
    }

    /// Equivalent `curl` command line, for diagnostics.
    pub fn to_curl(&self) -> String {
        CurlFormatter::default().format(self)
    }

    pub fn is_form(&self) -> bool {
        self.is_url_encoded_form() || self.is_multipart_form()
    }

    pub fn is_url_encoded_form(&self) -> bool {
        self.is_post_with(FORM_URLENCODED)
    }

    pub fn is_multipart_form(&self) -> bool {
        self.is_post_with(MULTIPART_FORM_DATA)
    }

    /// Form fields of a url-encoded or multipart POST.
    pub fn form_data(&self) -> Result<FormData<'_>> {
        if self.is_url_encoded_form() {
            return Ok(FormData::UrlEncoded(
                self.options.form_params.as_deref().unwrap_or_default(),
            ));
        }
        if self.is_multipart_form() {
            return Ok(FormData::Multipart(
                self.options.multipart.as_deref().unwrap_or_default(),
            ));
        }
        Err(Error::NotAForm(
            self.content_type().unwrap_or("a request without a content type").to_string(),
        ))
    }

    fn is_post_with(&self, media: &str) -> bool {
        self.method == HttpMethod::Post
            && self.content_type().is_some_and(|ct| ct.eq_ignore_ascii_case(media))
    }
}

impl ContentType for Request {
    fn headers(&self) -> &HeaderSet {
        &self.headers
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people_form(content_type: &str) -> Request {
        Request::new("POST", "/api/v1/people").with_header("Content-Type", content_type)
    }

    #[test]
    fn url_encoded_form_exposes_fields() {
        let request = people_form(FORM_URLENCODED).with_options(RequestOptions {
            form_params: Some(vec![
                ("name".to_string(), "Walter".to_string()),
                ("age".to_string(), "21".to_string()),
            ]),
            ..RequestOptions::default()
        });
        assert!(request.is_form());
        assert!(request.is_url_encoded_form());
        assert!(!request.is_multipart_form());

        let form = request.form_data().unwrap();
        assert_eq!(form.get("name"), Some("Walter"));
        assert_eq!(form.get("age"), Some("21"));
        assert_eq!(form.len(), 2);
    }

    #[test]
    fn multipart_form_exposes_parts() {
        let request = people_form(MULTIPART_FORM_DATA).with_options(RequestOptions {
            multipart: Some(vec![Part::text("name", "Walter"), Part::text("age", "21")]),
            ..RequestOptions::default()
        });
        assert!(request.is_form());
        assert!(request.is_multipart_form());

        match request.form_data().unwrap() {
            FormData::Multipart(parts) => {
                assert_eq!(parts.len(), 2);
                assert_eq!(parts[0].name, "name");
                assert_eq!(parts[1].contents_str(), Some("21"));
            }
            other => panic!("expected multipart data, got {other:?}"),
        }
    }

    #[test]
    fn form_without_fields_is_empty() {
        let req = people_form(FORM_URLENCODED);
        let form = req.form_data().unwrap();
        assert!(form.is_empty());
    }

    #[test]
    fn non_form_request_refuses_form_data() {
        let request = Request::new("POST", "/api/v1/people");
        assert!(!request.is_form());
        let err = request.form_data().unwrap_err();
        assert!(matches!(err, Error::NotAForm(_)));
    }

    #[test]
    fn form_requires_post() {
        let request = Request::new("PUT", "/api/v1/people").with_header("Content-Type", FORM_URLENCODED);
        assert!(!request.is_form());
    }

    #[test]
    fn null_json_value_is_an_empty_body() {
        assert_eq!(Body::from(serde_json::Value::Null), Body::Empty);
        assert!(Body::from(serde_json::json!({"a": 1})).is_json());
        assert_eq!(Body::from(String::new()).into_bytes(), None);
    }

    #[test]
    fn body_json_keeps_struct_field_order() {
        #[derive(Serialize)]
        struct Person<'a> {
            name: &'a str,
            email: &'a str,
        }
        let body = Body::json(&Person { name: "Bob", email: "bob@example.com" }).unwrap();
        assert_eq!(
            body.into_bytes().unwrap(),
            br#"{"name":"Bob","email":"bob@example.com"}"#.to_vec()
        );
    }

    #[test]
    fn request_displays_its_body() {
        let request = Request::new("POST", "/").with_body("hello");
        assert_eq!(request.to_string(), "hello");
        assert_eq!(Request::new("GET", "/").to_string(), "");
    }
}
