//! Human and JSON renderings of command results
//!
//! Results go to stdout, diagnostics to stderr. In JSON mode every line is a
//! JSON document, so `info` notes are emitted on stderr as
//! `{"level":"info",...}` rather than dropped.

use std::cell::RefCell;
use std::io::{self, Stderr, Stdout, Write};

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Trait for formatting CLI output
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn print_json(&self, value: &serde_json::Value);
}

/// Result and diagnostic writers behind a formatter
pub struct Streams<O: Write, E: Write> {
    out: RefCell<O>,
    err: RefCell<E>,
}

impl Streams<Stdout, Stderr> {
    pub fn std() -> Self {
        Self::new(io::stdout(), io::stderr())
    }
}

impl<O: Write, E: Write> Streams<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self {
            out: RefCell::new(out),
            err: RefCell::new(err),
        }
    }

    // A closed pipe must not abort the command after its work is done
    fn out_line(&self, line: &str) {
        let _ = writeln!(self.out.borrow_mut(), "{line}");
    }

    fn err_line(&self, line: &str) {
        let _ = writeln!(self.err.borrow_mut(), "{line}");
    }

    pub fn into_inner(self) -> (O, E) {
        (self.out.into_inner(), self.err.into_inner())
    }
}

/// Checkmark-prefixed lines; `quiet` silences success and info
pub struct HumanFormatter<O: Write = Stdout, E: Write = Stderr> {
    streams: Streams<O, E>,
    quiet: bool,
}

impl<O: Write, E: Write> HumanFormatter<O, E> {
    pub fn new(streams: Streams<O, E>, quiet: bool) -> Self {
        Self { streams, quiet }
    }

    pub fn into_streams(self) -> Streams<O, E> {
        self.streams
    }
}

impl<O: Write, E: Write> OutputFormatter for HumanFormatter<O, E> {
    fn success(&self, message: &str) {
        if !self.quiet {
            self.streams.out_line(&format!("\u{2713} {message}"));
        }
    }
    fn error(&self, message: &str) {
        self.streams.err_line(&format!("\u{2717} Error: {message}"));
    }
    fn warn(&self, message: &str) {
        self.streams.err_line(&format!("\u{26a0} Warning: {message}"));
    }
    fn info(&self, message: &str) {
        if !self.quiet {
            self.streams.out_line(&format!("  {message}"));
        }
    }
    fn print_json(&self, _value: &serde_json::Value) {}
}

/// One JSON document per call; results on stdout, the rest on stderr
pub struct JsonFormatter<O: Write = Stdout, E: Write = Stderr> {
    streams: Streams<O, E>,
    quiet: bool,
}

impl<O: Write, E: Write> JsonFormatter<O, E> {
    pub fn new(streams: Streams<O, E>, quiet: bool) -> Self {
        Self { streams, quiet }
    }

    pub fn into_streams(self) -> Streams<O, E> {
        self.streams
    }
}

impl<O: Write, E: Write> OutputFormatter for JsonFormatter<O, E> {
    fn success(&self, message: &str) {
        self.streams
            .out_line(&serde_json::json!({"success": true, "message": message}).to_string());
    }
    fn error(&self, message: &str) {
        self.streams
            .err_line(&serde_json::json!({"success": false, "error": message}).to_string());
    }
    fn warn(&self, message: &str) {
        self.streams
            .err_line(&serde_json::json!({"level": "warning", "message": message}).to_string());
    }
    fn info(&self, message: &str) {
        if !self.quiet && !message.is_empty() {
            self.streams
                .err_line(&serde_json::json!({"level": "info", "message": message}).to_string());
        }
    }
    fn print_json(&self, value: &serde_json::Value) {
        self.streams
            .out_line(&serde_json::to_string_pretty(value).unwrap_or_default());
    }
}

/// Picks a formatter over stdout and stderr
pub fn get_formatter(format: OutputFormat, quiet: bool) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Json => Box::new(JsonFormatter::new(Streams::std(), quiet)),
        OutputFormat::Human => Box::new(HumanFormatter::new(Streams::std(), quiet)),
    }
}
