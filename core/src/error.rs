//! Error types for the HTTP façade.
//!
//! # Design
//! Only two variants ever come back from a send: `ServerResponse` when the
//! round trip completed but the status signals failure, and
//! `TransportFailure` when no response arrived at all. Both keep the
//! request (and the response, when there is one) so callers can inspect
//! or replay it. The remaining variants are local failures raised before
//! anything reaches the transport.

use crate::request::Request;
use crate::response::Response;
use crate::transport::TransportErrorKind;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The server answered with a 4xx or 5xx status.
    #[error("{} {} returned HTTP {}", .request.method, .request.uri, .response.status())]
    ServerResponse {
        request: Box<Request>,
        response: Box<Response>,
    },

    /// The transport could not complete the round trip.
    #[error("request could not be completed ({kind}): {message}")]
    TransportFailure {
        request: Option<Box<Request>>,
        kind: TransportErrorKind,
        message: String,
    },

    /// A structured request body could not be encoded as JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// A response body could not be decoded into the requested type.
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),

    #[error("invalid query parameters: {0}")]
    InvalidQuery(String),

    /// Form data was requested from a request that is not a form.
    #[error("cannot get form data from {0}")]
    NotAForm(String),

    #[error("bad configuration: {0}")]
    BadConfiguration(String),
}

impl Error {
    pub fn request(&self) -> Option<&Request> {
        match self {
            Error::ServerResponse { request, .. } => Some(request),
            Error::TransportFailure { request, .. } => request.as_deref(),
            _ => None,
        }
    }

    pub fn response(&self) -> Option<&Response> {
        match self {
            Error::ServerResponse { response, .. } => Some(response),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.response().map(Response::status)
    }

    pub fn is_server_response(&self) -> bool {
        matches!(self, Error::ServerResponse { .. })
    }

    pub fn is_transport_failure(&self) -> bool {
        matches!(self, Error::TransportFailure { .. })
    }

    /// Curl rendering of the failed request, when one is attached.
    pub fn curl_request(&self) -> Option<String> {
        self.request().map(Request::to_curl)
    }

    /// Structured view of the error response body; empty without a response.
    pub fn response_value(&self) -> serde_json::Value {
        self.response()
            .map(Response::to_value)
            .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()))
    }
}
