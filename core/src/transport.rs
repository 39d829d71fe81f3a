//! The boundary to whatever actually performs HTTP.
//!
//! # Design
//! The façade never touches the network itself. It hands a fully formed
//! `Request` to a `Transport` and gets back a `RawResponse` or a
//! `TransportError`. `UreqTransport` is the default, blocking
//! implementation; it leaves status interpretation to the caller by
//! disabling ureq's status-as-error behaviour. `MockTransport` replays
//! queued results and records what was sent.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::builder::encode_pairs;
use crate::config::TransportConfig;
use crate::http::HeaderSet;
use crate::request::{Part, Request, FORM_URLENCODED, MULTIPART_FORM_DATA};
use crate::response::RawResponse;

/// Sends a request and returns the raw response.
pub trait Transport: Send + Sync {
    fn send(&self, request: &Request) -> Result<RawResponse, TransportError>;

    /// Settings currently in effect, for transports built from a `TransportConfig`.
    fn config(&self) -> Option<&TransportConfig> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Connect,
    Timeout,
    Dns,
    Io,
    InvalidRequest,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportErrorKind::Connect => "connect",
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Dns => "dns",
            TransportErrorKind::Io => "io",
            TransportErrorKind::InvalidRequest => "invalid request",
            TransportErrorKind::Other => "other",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The transport received a response but treats its status as an error.
    #[error("transport rejected HTTP {}", .0.status)]
    Status(RawResponse),

    /// No response was received.
    #[error("{kind}: {message}")]
    Failed {
        kind: TransportErrorKind,
        message: String,
    },
}

impl TransportError {
    pub fn failed(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        TransportError::Failed {
            kind,
            message: message.into(),
        }
    }
}

/// Blocking transport backed by a `ureq` agent.
///
/// Applies `timeout`, `connect_timeout`, `max_redirects` and
/// `max_body_size`. Keys in `TransportConfig::extra` and
/// `RequestOptions::extra` are kept on the request but not applied here;
/// a custom `Transport` can read them.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    config: TransportConfig,
}

impl UreqTransport {
    pub fn new(config: &TransportConfig) -> Self {
        Self {
            agent: build_agent(config, None),
            config: config.clone(),
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(&TransportConfig::default())
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &Request) -> Result<RawResponse, TransportError> {
        let (headers, body) = encode_body(request);

        let mut builder = ureq::http::Request::builder()
            .method(request.method.as_str())
            .uri(request.uri.as_str());
        for (name, value) in headers.iter() {
            builder = builder.header(name, value);
        }

        // A per-call timeout needs its own agent configuration.
        let agent = match request.options.timeout {
            Some(timeout) => build_agent(&self.config, Some(timeout)),
            None => self.agent.clone(),
        };

        let sent = match body {
            Some(bytes) => builder
                .body(bytes)
                .map_err(invalid_request)
                .and_then(|req| agent.run(req).map_err(from_ureq)),
            None => builder
                .body(())
                .map_err(invalid_request)
                .and_then(|req| agent.run(req).map_err(from_ureq)),
        };
        let mut response = sent?;

        let mut response_headers = HeaderSet::new();
        for (name, value) in response.headers() {
            response_headers.append(name.as_str(), String::from_utf8_lossy(value.as_bytes()));
        }
        let status = response.status();
        let version = format!("{:?}", response.version());
        let body = response
            .body_mut()
            .with_config()
            .limit(self.config.max_body_size.unwrap_or(u64::MAX))
            .read_to_vec()
            .map_err(from_ureq)?;

        Ok(RawResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            version: version.trim_start_matches("HTTP/").to_string(),
            headers: response_headers,
            body,
        })
    }

    fn config(&self) -> Option<&TransportConfig> {
        Some(&self.config)
    }
}

fn build_agent(config: &TransportConfig, timeout: Option<Duration>) -> ureq::Agent {
    let seconds = |value: Option<f64>| value.and_then(|s| Duration::try_from_secs_f64(s).ok());
    let mut builder = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .allow_non_standard_methods(true)
        .timeout_global(timeout.or_else(|| seconds(config.timeout)))
        .timeout_connect(seconds(config.connect_timeout));
    if let Some(max_redirects) = config.max_redirects {
        builder = builder.max_redirects(max_redirects);
    }
    builder.build().new_agent()
}

fn invalid_request(err: ureq::http::Error) -> TransportError {
    TransportError::failed(TransportErrorKind::InvalidRequest, err.to_string())
}

fn from_ureq(err: ureq::Error) -> TransportError {
    let kind = match &err {
        ureq::Error::Timeout(_) => TransportErrorKind::Timeout,
        ureq::Error::HostNotFound => TransportErrorKind::Dns,
        ureq::Error::ConnectionFailed => TransportErrorKind::Connect,
        ureq::Error::Io(io) if io.kind() == std::io::ErrorKind::ConnectionRefused => {
            TransportErrorKind::Connect
        }
        ureq::Error::Io(_) => TransportErrorKind::Io,
        ureq::Error::BadUri(_) | ureq::Error::Http(_) => TransportErrorKind::InvalidRequest,
        _ => TransportErrorKind::Other,
    };
    TransportError::failed(kind, err.to_string())
}

/// Headers and body bytes as they go on the wire.
///
/// An explicit body wins over form options; multipart parts get a fresh
/// boundary that replaces the bare `multipart/form-data` content type.
pub(crate) fn encode_body(request: &Request) -> (HeaderSet, Option<Vec<u8>>) {
    let mut headers = request.headers.clone();
    if let Some(body) = &request.body {
        return (headers, Some(body.clone()));
    }
    if let Some(parts) = &request.options.multipart {
        let boundary = format!("hyperhttp-{}", Uuid::new_v4().simple());
        headers.set("Content-Type", format!("{MULTIPART_FORM_DATA}; boundary={boundary}"));
        return (headers, Some(encode_multipart(parts, &boundary)));
    }
    if let Some(fields) = &request.options.form_params {
        headers.set_default("Content-Type", FORM_URLENCODED);
        return (headers, Some(encode_pairs(fields).into_bytes()));
    }
    (headers, None)
}

pub(crate) fn encode_multipart(parts: &[Part], boundary: &str) -> Vec<u8> {
    let quote = |value: &str| value.replace('"', "%22");
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", quote(&part.name));
        if let Some(filename) = &part.filename {
            disposition.push_str(&format!("; filename=\"{}\"", quote(filename)));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");

        let content_type = match (&part.content_type, &part.filename) {
            (Some(content_type), _) => Some(content_type.as_str()),
            (None, Some(_)) => Some("application/octet-stream"),
            (None, None) => None,
        };
        if let Some(content_type) = content_type {
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(&part.contents);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

/// Replays queued results in order and records every request it sees.
#[derive(Debug, Default)]
pub struct MockTransport {
    queue: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
    sent: Mutex<Vec<Request>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, response: RawResponse) -> Self {
        self.push(Ok(response));
        self
    }

    pub fn fail(self, error: TransportError) -> Self {
        self.push(Err(error));
        self
    }

    pub fn push(&self, result: Result<RawResponse, TransportError>) {
        self.queue.lock().push_back(result);
    }

    pub fn sent(&self) -> Vec<Request> {
        self.sent.lock().clone()
    }

    pub fn last_request(&self) -> Option<Request> {
        self.sent.lock().last().cloned()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: &Request) -> Result<RawResponse, TransportError> {
        self.sent.lock().push(request.clone());
        self.queue.lock().pop_front().unwrap_or_else(|| {
            Err(TransportError::failed(
                TransportErrorKind::Other,
                "mock transport has no queued response",
            ))
        })
    }
}
