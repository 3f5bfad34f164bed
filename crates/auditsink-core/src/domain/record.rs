//! Audit record domain entity
//!
//! An [`AuditRecord`] is created per event, rendered to exactly one line of
//! text and discarded after the append. Nothing is retained in memory.
//!
//! ## Line format
//!
//! ```text
//! [2024-01-20 12:00:00] INFO: user signed in {"user":"alice"} {"ip":"10.0.0.1"}
//! ```
//!
//! - The timestamp is the source clock's local wall-clock time, second precision.
//! - An empty context or extra map renders as `[]`.
//! - A non-empty map renders as compact JSON with keys in sorted order.
//! - CR, LF and CRLF inside the message are replaced by a single space; map
//!   values are JSON-escaped. A rendered record never spans two lines.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::DomainError;
use super::level::Level;

/// `strftime` pattern for the leading timestamp of every audit line
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Rendering of an empty context or extra map
const EMPTY_MAP: &str = "[]";

/// Request metadata attached to every record written through a sink
///
/// Mirrors the per-request fields a web front end knows about the caller.
/// Missing fields are left out of the rendered `extra` map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub ip: Option<String>,
    pub url: Option<String>,
    pub http_method: Option<String>,
    pub referrer: Option<String>,
}

impl RequestContext {
    /// Returns true if no field is set
    pub fn is_empty(&self) -> bool {
        self.ip.is_none()
            && self.url.is_none()
            && self.http_method.is_none()
            && self.referrer.is_none()
    }

    fn fields(&self) -> [(&'static str, Option<&String>); 4] {
        [
            ("ip", self.ip.as_ref()),
            ("url", self.url.as_ref()),
            ("http_method", self.http_method.as_ref()),
            ("referrer", self.referrer.as_ref()),
        ]
    }
}

/// A single audit event
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    timestamp: NaiveDateTime,
    level: Level,
    message: String,
    context: BTreeMap<String, String>,
    extra: Map<String, Value>,
}

impl AuditRecord {
    /// Creates a record with an empty context and extra map
    ///
    /// # Example
    ///
    /// ```
    /// use auditsink_core::domain::{AuditRecord, Level};
    /// use chrono::NaiveDate;
    ///
    /// let at = NaiveDate::from_ymd_opt(2024, 1, 20).unwrap().and_hms_opt(12, 0, 0).unwrap();
    /// let record = AuditRecord::new(at, Level::Info, "user signed in")
    ///     .with_context("user", "alice");
    /// assert_eq!(
    ///     record.render(),
    ///     "[2024-01-20 12:00:00] INFO: user signed in {\"user\":\"alice\"} []\n"
    /// );
    /// ```
    pub fn new(timestamp: NaiveDateTime, level: Level, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            level,
            message: message.into(),
            context: BTreeMap::new(),
            extra: Map::new(),
        }
    }

    /// Adds a single context entry
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Merges a whole context map, later keys overwriting earlier ones
    pub fn with_context_map(mut self, context: BTreeMap<String, String>) -> Self {
        self.context.extend(context);
        self
    }

    /// Adds a free-form extra entry
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Copies the set fields of a request context into `extra`
    pub fn with_request(mut self, request: &RequestContext) -> Self {
        for (key, value) in request.fields() {
            if let Some(value) = value {
                self.extra.insert(key.to_string(), Value::String(value.clone()));
            }
        }
        self
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> &BTreeMap<String, String> {
        &self.context
    }

    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// Renders the record as one newline-terminated line
    pub fn render(&self) -> String {
        let context: Map<String, Value> = self
            .context
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();

        format!(
            "[{}] {}: {} {} {}\n",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.level.label(),
            single_line(&self.message),
            render_map(&context),
            render_map(&self.extra),
        )
    }
}

/// Parses a `key=value` pair, splitting on the first `=`
pub fn parse_context_pair(pair: &str) -> Result<(String, String), DomainError> {
    match pair.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(DomainError::InvalidContextPair(pair.to_string())),
    }
}

fn single_line(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\r', '\n'], " ")
}

fn render_map(map: &Map<String, Value>) -> String {
    if map.is_empty() {
        EMPTY_MAP.to_string()
    } else {
        Value::Object(map.clone()).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 20)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_render_minimal_record() {
        let record = AuditRecord::new(at(9, 5, 3), Level::Warning, "password changed");
        assert_eq!(
            record.render(),
            "[2024-01-20 09:05:03] WARNING: password changed [] []\n"
        );
    }

    #[test]
    fn test_render_sorts_context_keys() {
        let record = AuditRecord::new(at(12, 0, 0), Level::Info, "login")
            .with_context("user", "alice")
            .with_context("action", "login");
        assert_eq!(
            record.render(),
            "[2024-01-20 12:00:00] INFO: login {\"action\":\"login\",\"user\":\"alice\"} []\n"
        );
    }

    #[test]
    fn test_render_request_context_into_extra() {
        let request = RequestContext {
            ip: Some("10.0.0.1".to_string()),
            url: Some("/admin".to_string()),
            http_method: Some("POST".to_string()),
            referrer: None,
        };
        let record = AuditRecord::new(at(12, 0, 0), Level::Notice, "settings saved")
            .with_request(&request);

        let line = record.render();
        assert!(line.ends_with(
            " [] {\"http_method\":\"POST\",\"ip\":\"10.0.0.1\",\"url\":\"/admin\"}\n"
        ));
        assert!(!line.contains("referrer"));
    }

    #[test]
    fn test_render_never_splits_lines() {
        let record = AuditRecord::new(at(12, 0, 0), Level::Error, "first\nsecond\r\nthird\rfourth")
            .with_context("note", "multi\nline")
            .with_extra("raw", "a\r\nb");

        let line = record.render();
        assert_eq!(line.matches('\n').count(), 1);
        assert!(line.ends_with('\n'));
        assert!(line.contains("ERROR: first second third fourth "));
        assert!(line.contains("\"note\":\"multi\\nline\""));
        assert!(line.contains("\"raw\":\"a\\r\\nb\""));
    }

    #[test]
    fn test_rendered_line_starts_with_datable_prefix() {
        let record = AuditRecord::new(at(0, 0, 0), Level::Debug, "x");
        let line = record.render();
        assert_eq!(
            crate::domain::log_line::parse_line_date(line.as_bytes()),
            NaiveDate::from_ymd_opt(2024, 1, 20)
        );
    }

    #[test]
    fn test_context_map_merge() {
        let mut map = BTreeMap::new();
        map.insert("user".to_string(), "bob".to_string());
        let record = AuditRecord::new(at(12, 0, 0), Level::Info, "m")
            .with_context("user", "alice")
            .with_context_map(map);
        assert_eq!(record.context().get("user").map(String::as_str), Some("bob"));
    }

    #[test]
    fn test_parse_context_pair() {
        assert_eq!(
            parse_context_pair("user=alice").unwrap(),
            ("user".to_string(), "alice".to_string())
        );
        assert_eq!(
            parse_context_pair("query=a=b").unwrap(),
            ("query".to_string(), "a=b".to_string())
        );
        assert_eq!(
            parse_context_pair("empty=").unwrap(),
            ("empty".to_string(), String::new())
        );
        assert!(parse_context_pair("novalue").is_err());
        assert!(parse_context_pair("=value").is_err());
    }

    #[test]
    fn test_request_context_is_empty() {
        assert!(RequestContext::default().is_empty());
        let request = RequestContext {
            referrer: Some("https://example.com".to_string()),
            ..Default::default()
        };
        assert!(!request.is_empty());
    }
}
