//! A convenience façade over a blocking HTTP transport.
//!
//! # Overview
//! `Client` builds requests from per-call input and instance defaults (base
//! URI, headers, JSON mode), hands them to a `Transport` and wraps the
//! result in a `Response` with a lazily parsed, path-addressable view of
//! JSON bodies. `Facade` profiles such as `Hyper` add shared instances on
//! top.
//!
//! ```no_run
//! use hyperhttp::{Facade, Hyper};
//!
//! let response = Hyper::get("https://example.com/books/1")?;
//! assert!(response.has("name"));
//! # Ok::<(), hyperhttp::Error>(())
//! ```
//!
//! # Design
//! - The crate owns request building, status policy, logging and response
//!   wrapping. Connections, TLS and redirects belong to the transport;
//!   `UreqTransport` is the default.
//! - Request and response values are plain data, so a failure can carry
//!   both and render the request as a `curl` command.
//! - Parsing a JSON body for the structured view never fails: anything
//!   unusable reads as an empty object. `Response::json` is the strict path.

pub mod builder;
pub mod client;
pub mod config;
pub mod curl;
pub mod data;
pub mod error;
pub mod facade;
pub mod http;
pub mod logging;
pub mod request;
pub mod response;
pub mod transport;

pub use builder::RequestBuilder;
pub use client::{Call, Client};
pub use config::{Config, TransportConfig};
pub use curl::CurlFormatter;
pub use data::Data;
pub use error::{Error, Result};
pub use facade::{Facade, Hyper, Registry};
pub use http::{ContentType, HeaderSet, HttpMethod};
pub use logging::{LogCrateLogger, MemoryLogger, RequestLogger};
pub use request::{Body, FormData, Part, Request, RequestOptions};
pub use response::{RawResponse, Response};
pub use transport::{MockTransport, Transport, TransportError, TransportErrorKind, UreqTransport};
