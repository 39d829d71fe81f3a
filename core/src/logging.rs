//! Request/response logging.
//!
//! Each send produces two lines: the request (or its curl rendering) before
//! the transport is called, and a summary once the round trip ends. The
//! summary level follows the status: `Info` below 400, `Warn` for 4xx and
//! `Error` for 5xx or a failed round trip.

use std::fmt::Write as _;
use std::time::Duration;

use log::Level;
use parking_lot::Mutex;

use crate::request::Request;
use crate::response::RawResponse;
use crate::transport::TransportError;

/// Key/value pairs attached to a log line.
pub type LogContext<'a> = &'a [(&'static str, String)];

/// Receives the lines a client logs around each send.
pub trait RequestLogger: Send + Sync {
    fn log(&self, level: Level, message: &str, context: LogContext<'_>);
}

/// Forwards to the `log` crate, rendering context as `key=value` pairs.
#[derive(Debug, Clone)]
pub struct LogCrateLogger {
    target: String,
}

impl LogCrateLogger {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

impl Default for LogCrateLogger {
    fn default() -> Self {
        Self::new("hyperhttp")
    }
}

impl RequestLogger for LogCrateLogger {
    fn log(&self, level: Level, message: &str, context: LogContext<'_>) {
        let mut line = message.to_string();
        for (key, value) in context {
            let _ = write!(line, " {key}={value}");
        }
        log::log!(target: &self.target, level, "{line}");
    }
}

/// One captured log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: Level,
    pub message: String,
    pub context: Vec<(&'static str, String)>,
}

impl LogRecord {
    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value.as_str())
    }
}

/// Keeps every line in memory.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    records: Mutex<Vec<LogRecord>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.records.lock().iter().map(|r| r.message.clone()).collect()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl RequestLogger for MemoryLogger {
    fn log(&self, level: Level, message: &str, context: LogContext<'_>) {
        self.records.lock().push(LogRecord {
            level,
            message: message.to_string(),
            context: context.to_vec(),
        });
    }
}

/// `"METHOD URI HTTP/VERSION"`
pub fn request_line(request: &Request) -> String {
    format!("\"{} {} HTTP/{}\"", request.method, request.uri, request.version)
}

pub fn level_for_status(status: u16) -> Level {
    match status {
        500..=u16::MAX => Level::Error,
        400..=499 => Level::Warn,
        _ => Level::Info,
    }
}

pub(crate) fn log_request(logger: &dyn RequestLogger, request: &Request, log_curl: bool) {
    let message = if log_curl {
        request.to_curl()
    } else {
        request_line(request)
    };
    logger.log(Level::Info, &message, &request_context(request));
}

pub(crate) fn log_outcome(
    logger: &dyn RequestLogger,
    request: &Request,
    outcome: &Result<RawResponse, TransportError>,
    elapsed: Duration,
) {
    let mut context = request_context(request);
    let (level, message) = match outcome {
        Ok(raw) | Err(TransportError::Status(raw)) => {
            context.push(("status", raw.status.to_string()));
            (
                level_for_status(raw.status),
                format!("{} {} {}", request_line(request), raw.status, raw.body.len()),
            )
        }
        Err(TransportError::Failed { kind, message }) => (
            Level::Error,
            format!("{} failed ({kind}): {message}", request_line(request)),
        ),
    };
    context.push(("elapsed_ms", elapsed.as_millis().to_string()));
    logger.log(level, &message, &context);
}

fn request_context(request: &Request) -> Vec<(&'static str, String)> {
    vec![
        ("method", request.method.to_string()),
        ("uri", request.uri.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportErrorKind;

    fn request() -> Request {
        Request::new("POST", "https://example.com/books").with_body("{}")
    }

    #[test]
    fn request_line_format() {
        assert_eq!(request_line(&request()), r#""POST https://example.com/books HTTP/1.1""#);
    }

    #[test]
    fn curl_mode_logs_command() {
        let logger = MemoryLogger::new();
        log_request(&logger, &request(), true);
        log_request(&logger, &request(), false);
        let messages = logger.messages();
        assert!(messages[0].starts_with("curl "));
        assert!(messages[1].starts_with('"'));
    }

    #[test]
    fn outcome_level_follows_status() {
        let logger = MemoryLogger::new();
        for status in [205, 404, 503] {
            let raw = RawResponse::new(status).with_body("abc");
            log_outcome(&logger, &request(), &Ok(raw), Duration::from_millis(7));
        }
        let records = logger.records();
        assert_eq!(
            records.iter().map(|r| r.level).collect::<Vec<_>>(),
            vec![Level::Info, Level::Warn, Level::Error]
        );
        assert_eq!(records[0].message, r#""POST https://example.com/books HTTP/1.1" 205 3"#);
        assert_eq!(records[1].context_value("status"), Some("404"));
        assert_eq!(records[2].context_value("elapsed_ms"), Some("7"));
    }

    #[test]
    fn failures_log_at_error() {
        let logger = MemoryLogger::new();
        let outcome = Err(TransportError::failed(TransportErrorKind::Connect, "refused"));
        log_outcome(&logger, &request(), &outcome, Duration::ZERO);
        let record = &logger.records()[0];
        assert_eq!(record.level, Level::Error);
        assert!(record.message.ends_with("failed (connect): refused"));
        assert_eq!(record.context_value("status"), None);
    }
}
