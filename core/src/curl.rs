//! Render requests as `curl` command lines.
//!
//! The URL comes first, then options sorted by flag name, each rendered
//! as `-<flag> <value>`. Parts that would push a line past the configured
//! width start a continuation line (`\` + newline + two spaces).

use std::collections::BTreeMap;

use crate::builder::encode_pairs;
use crate::http::HttpMethod;
use crate::request::Request;

const DEFAULT_LINE_LENGTH: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurlFormatter {
    line_length: usize,
}

impl Default for CurlFormatter {
    fn default() -> Self {
        Self {
            line_length: DEFAULT_LINE_LENGTH,
        }
    }
}

impl CurlFormatter {
    /// A `line_length` of zero keeps the whole command on one line.
    pub fn new(line_length: usize) -> Self {
        Self { line_length }
    }

    pub fn format(&self, request: &Request) -> String {
        let mut command = CommandLine::new(self.line_length);
        let uri = request.uri.split('#').next().unwrap_or_default();
        command.push(&escape_shell_arg(uri));

        for (flag, values) in collect_options(request) {
            for value in values {
                if value.is_empty() {
                    command.push(&format!("-{flag}"));
                } else {
                    command.push(&format!("-{flag} {value}"));
                }
            }
        }
        command.finish()
    }
}

/// Quote `arg` for a POSIX shell.
pub fn escape_shell_arg(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', r"'\''"))
}

fn collect_options(request: &Request) -> BTreeMap<&'static str, Vec<String>> {
    let mut options: BTreeMap<&'static str, Vec<String>> = BTreeMap::new();
    let mut add = |flag: &'static str, value: String| options.entry(flag).or_default().push(value);

    match &request.method {
        HttpMethod::Get => {}
        HttpMethod::Head => add("-head", String::new()),
        method => add("X", method.to_string()),
    }

    let data = match (&request.body, &request.options.form_params) {
        (Some(body), _) if !body.is_empty() => String::from_utf8_lossy(body).into_owned(),
        (_, Some(fields)) => encode_pairs(fields),
        _ => String::new(),
    };
    if !data.is_empty() {
        add("d", escape_shell_arg(&data));
        if request.method == HttpMethod::Get {
            add("G", String::new());
        }
    }

    let parts = request.options.multipart.as_deref().unwrap_or_default();
    for part in parts {
        let value = match &part.filename {
            Some(filename) => format!("{}=@{filename}", part.name),
            None => format!("{}={}", part.name, String::from_utf8_lossy(&part.contents)),
        };
        add("F", escape_shell_arg(&value));
    }

    for (name, value) in request.headers.iter() {
        if name.eq_ignore_ascii_case("host") {
            continue;
        }
        if name.eq_ignore_ascii_case("cookie") {
            add("b", escape_shell_arg(value));
        } else if !parts.is_empty() && name.eq_ignore_ascii_case("content-type") {
            // curl writes its own multipart boundary.
            continue;
        } else {
            add("H", escape_shell_arg(&format!("{name}: {value}")));
        }
    }

    options
}

struct CommandLine {
    command: String,
    current: usize,
    line_length: usize,
}

impl CommandLine {
    fn new(line_length: usize) -> Self {
        let command = String::from("curl");
        let current = command.len();
        Self {
            command,
            current,
            line_length,
        }
    }

    fn push(&mut self, part: &str) {
        self.command.push(' ');
        if self.line_length > 0 && self.current + part.len() > self.line_length {
            self.current = 0;
            self.command.push_str("\\\n  ");
        }
        self.command.push_str(part);
        self.current += part.len() + 2;
    }

    fn finish(self) -> String {
        self.command
    }
}
