//! The façade client and its per-call builder.
//!
//! # Design
//! `Client` holds defaults (base URI, headers, configuration) and hands
//! every fully built request to a shared `Transport`. Verb methods return a
//! `Call`, a short-lived builder that collects per-call headers, query and
//! options before `send` runs the round trip. Derived clients
//! (`with_headers`, `using_json`) are new values, so a caller holding the
//! original never sees them change.
//!
//! Status policy lives here, not in the transport: with `http_errors` on
//! (the default) any 4xx or 5xx response becomes `Error::ServerResponse`.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;

use crate::builder::{append_query, build_query, resolve_uri, RequestBuilder};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::http::{HeaderSet, HttpMethod};
use crate::logging::{self, RequestLogger};
use crate::request::{Body, Part, Request, RequestOptions, FORM_URLENCODED, MULTIPART_FORM_DATA};
use crate::response::{RawResponse, Response};
use crate::transport::{Transport, TransportError, UreqTransport};

#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    logger: Option<Arc<dyn RequestLogger>>,
    config: Config,
    base_uri: Option<String>,
    headers: HeaderSet,
    json_headers: bool,
    /// The transport was built from `config.transport` and follows it.
    owns_transport: bool,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_uri", &self.base_uri)
            .field("headers", &self.headers)
            .field("json_headers", &self.json_headers)
            .field("config", &self.config)
            .field("logger", &self.logger.is_some())
            .field("owns_transport", &self.owns_transport)
            .finish_non_exhaustive()
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::from_config(Config::default())
    }
}

impl Client {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            logger: None,
            config: Config::default(),
            base_uri: None,
            headers: HeaderSet::new(),
            json_headers: false,
            owns_transport: false,
        }
    }

    /// A client on the default transport, configured from `config`.
    pub fn from_config(config: Config) -> Self {
        let mut client = Self::new(Arc::new(UreqTransport::default()));
        client.owns_transport = true;
        client.set_config(config);
        client
    }

    pub fn with_logger(mut self, logger: Arc<dyn RequestLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn set_logger(&mut self, logger: Option<Arc<dyn RequestLogger>>) -> &mut Self {
        self.logger = logger;
        self
    }

    pub fn logger(&self) -> Option<&dyn RequestLogger> {
        self.logger.as_deref()
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Replace the transport. Later `set_config` calls no longer rebuild it.
    pub fn set_transport(&mut self, transport: Arc<dyn Transport>) -> &mut Self {
        self.transport = transport;
        self.owns_transport = false;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Store `config`, applying its base URI and headers to the client.
    ///
    /// Headers replace the client's current headers and are not kept in the
    /// stored config. Changed transport settings rebuild the default
    /// transport; a transport supplied by the caller is left alone.
    pub fn set_config(&mut self, mut config: Config) -> &mut Self {
        if self.owns_transport && config.transport != self.config.transport {
            self.transport = Arc::new(UreqTransport::new(&config.transport));
        }
        if let Some(base_uri) = &config.base_uri {
            self.base_uri = Some(base_uri.clone());
        }
        if let Some(headers) = config.headers.take() {
            self.headers = headers;
        }
        self.config = config;
        self
    }

    pub fn base_uri(&self) -> Option<&str> {
        self.base_uri.as_deref()
    }

    pub fn set_base_uri(&mut self, base_uri: impl Into<String>) -> &mut Self {
        self.base_uri = Some(base_uri.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.set(name, value);
        self
    }

    pub fn set_headers(&mut self, headers: HeaderSet) -> &mut Self {
        self.headers = headers;
        self
    }

    pub fn add_headers(&mut self, headers: &HeaderSet) -> &mut Self {
        self.headers.merge(headers);
        self
    }

    /// A copy of this client with `headers` merged over its own.
    pub fn with_headers(&self, headers: &HeaderSet) -> Client {
        let mut client = self.clone();
        client.add_headers(headers);
        client
    }

    /// This client with JSON `Content-Type`/`Accept` defaults switched on or
    /// off. Borrows when the flag already matches.
    pub fn using_json(&self, enabled: bool) -> Cow<'_, Client> {
        if self.json_headers == enabled {
            return Cow::Borrowed(self);
        }
        let mut client = self.clone();
        client.json_headers = enabled;
        Cow::Owned(client)
    }

    pub fn is_using_json(&self) -> bool {
        self.json_headers
    }

    /// `uri` resolved against the base URI.
    pub fn url(&self, uri: &str) -> String {
        resolve_uri(self.base_uri.as_deref(), uri)
    }

    pub fn create_request(
        &self,
        method: impl Into<HttpMethod>,
        uri: &str,
        headers: &HeaderSet,
        body: impl Into<Body>,
        options: RequestOptions,
    ) -> Request {
        RequestBuilder::new(&self.headers)
            .base_uri(self.base_uri.as_deref())
            .json_headers(self.json_headers)
            .build(method, uri, headers, body.into(), options)
    }

    /// Run `request` through the transport and apply the status policy.
    pub fn send(&self, request: Request) -> Result<Response> {
        if let Some(logger) = self.logger() {
            logging::log_request(logger, &request, self.config.log_curl());
        }
        let started = Instant::now();
        let outcome = self.transport.send(&request);
        if let Some(logger) = self.logger() {
            logging::log_outcome(logger, &request, &outcome, started.elapsed());
        }

        let http_errors = request
            .options
            .http_errors
            .unwrap_or_else(|| self.config.http_errors());
        match outcome {
            Ok(raw) if http_errors && raw.status >= 400 => Err(server_response(request, raw)),
            Ok(raw) => Ok(Response::from_raw(raw, Some(request))),
            Err(TransportError::Status(raw)) => Err(server_response(request, raw)),
            Err(TransportError::Failed { kind, message }) => Err(Error::TransportFailure {
                request: Some(Box::new(request)),
                kind,
                message,
            }),
        }
    }

    pub fn call(&self, method: impl Into<HttpMethod>, uri: &str) -> Call<'_> {
        Call::new(Cow::Borrowed(self), method.into(), uri)
    }

    pub fn get(&self, uri: &str) -> Call<'_> {
        self.call(HttpMethod::Get, uri)
    }

    pub fn post(&self, uri: &str, body: impl Into<Body>) -> Call<'_> {
        self.call(HttpMethod::Post, uri).body(body)
    }

    pub fn put(&self, uri: &str, body: impl Into<Body>) -> Call<'_> {
        self.call(HttpMethod::Put, uri).body(body)
    }

    pub fn patch(&self, uri: &str, body: impl Into<Body>) -> Call<'_> {
        self.call(HttpMethod::Patch, uri).body(body)
    }

    pub fn delete(&self, uri: &str) -> Call<'_> {
        self.call(HttpMethod::Delete, uri)
    }

    pub fn get_json(&self, uri: &str) -> Call<'_> {
        Call::new(self.using_json(true), HttpMethod::Get, uri)
    }

    pub fn post_json(&self, uri: &str, body: impl Into<Body>) -> Call<'_> {
        Call::new(self.using_json(true), HttpMethod::Post, uri).body(body)
    }

    pub fn put_json(&self, uri: &str, body: impl Into<Body>) -> Call<'_> {
        Call::new(self.using_json(true), HttpMethod::Put, uri).body(body)
    }

    pub fn patch_json(&self, uri: &str, body: impl Into<Body>) -> Call<'_> {
        Call::new(self.using_json(true), HttpMethod::Patch, uri).body(body)
    }

    pub fn delete_json(&self, uri: &str) -> Call<'_> {
        Call::new(self.using_json(true), HttpMethod::Delete, uri)
    }

    /// POST `fields` as `application/x-www-form-urlencoded`, in order.
    pub fn post_form<K, V>(&self, uri: &str, fields: impl IntoIterator<Item = (K, V)>) -> Call<'_>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut call = self.call(HttpMethod::Post, uri).header("Content-Type", FORM_URLENCODED);
        call.options.form_params = Some(
            fields
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        );
        call
    }

    /// POST `parts` as `multipart/form-data`. The transport adds the boundary.
    pub fn post_multipart_form(&self, uri: &str, parts: Vec<Part>) -> Call<'_> {
        let mut call = self.call(HttpMethod::Post, uri).header("Content-Type", MULTIPART_FORM_DATA);
        call.options.multipart = Some(parts);
        call
    }
}

fn server_response(request: Request, raw: RawResponse) -> Error {
    let response = Response::from_raw(raw, Some(request.clone()));
    Error::ServerResponse {
        request: Box::new(request),
        response: Box::new(response),
    }
}

/// A request being assembled. Nothing is sent until `send`.
///
/// Builder steps that can fail (`query`, `json`) keep the first error and
/// report it from `build` or `send`.
#[must_use = "a call does nothing until it is sent"]
#[derive(Debug)]
pub struct Call<'a> {
    client: Cow<'a, Client>,
    method: HttpMethod,
    uri: String,
    headers: HeaderSet,
    body: Body,
    options: RequestOptions,
    error: Option<Error>,
}

impl<'a> Call<'a> {
    fn new(client: Cow<'a, Client>, method: HttpMethod, uri: &str) -> Self {
        Self {
            client,
            method,
            uri: uri.to_string(),
            headers: HeaderSet::new(),
            body: Body::Empty,
            options: RequestOptions::default(),
            error: None,
        }
    }

    /// Encode `query` and append it to the URI.
    pub fn query<T: Serialize + ?Sized>(mut self, query: &T) -> Self {
        if self.error.is_none() {
            match build_query(query) {
                Ok(query) => self.uri = append_query(&self.uri, &query),
                Err(err) => self.error = Some(err),
            }
        }
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    pub fn headers(mut self, headers: &HeaderSet) -> Self {
        self.headers.merge(headers);
        self
    }

    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// Serialize `value` as the JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match Body::json(value) {
            Ok(body) => self.body = body,
            Err(err) => {
                self.error.get_or_insert(err);
            }
        }
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    /// Override the client's status policy for this call only.
    pub fn http_errors(mut self, enabled: bool) -> Self {
        self.options.http_errors = Some(enabled);
        self
    }

    /// Pass a transport-specific option through untouched.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.extra.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Result<Request> {
        self.finish().map(|(_, request)| request)
    }

    pub fn send(self) -> Result<Response> {
        let (client, request) = self.finish()?;
        client.send(request)
    }

    fn finish(self) -> Result<(Cow<'a, Client>, Request)> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let request = self.client.create_request(
            self.method,
            &self.uri,
            &self.headers,
            self.body,
            self.options,
        );
        Ok((self.client, request))
    }
}
