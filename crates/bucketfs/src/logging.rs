//! Logging helpers for Bucketfs
//!
//! The library emits `tracing` events; installing a subscriber is left to the
//! application. This module keeps sensitive or hostile data out of those
//! events.
//!
//! # Log Levels
//!
//! - **WARN**: Partially applied batch deletes
//! - **INFO**: Destructive operations (deletes, recursive deletes)
//! - **DEBUG**: Every remote request issued by nodes and the pager
//!
//! # Security
//!
//! - Object keys are arbitrary caller strings and may carry control
//!   characters; [`sanitize_for_log`] escapes them before they reach a log line.
//! - Credentials never appear in logs: [`mask_access_key`] keeps only a key
//!   id's prefix and [`LogConfig::redact_url`] strips userinfo from endpoints.
//!   Secret access keys are never formatted at all.

use std::borrow::Cow;

/// Configuration for log redaction.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Maximum length of logged values before truncation (default: 200)
    pub max_value_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            max_value_length: 200,
        }
    }
}

impl LogConfig {
    /// Create a new log configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove userinfo (user:password) from an endpoint URL before logging.
    pub fn redact_url<'a>(&self, url: &'a str) -> Cow<'a, str> {
        if let Some(scheme_end) = url.find("://") {
            let rest = &url[scheme_end + 3..];
            if let Some(at_pos) = rest.find('@')
                && rest[..at_pos].contains(':')
            {
                let scheme = &url[..scheme_end + 3];
                let host_part = &rest[at_pos + 1..];
                return Cow::Owned(format!("{}[REDACTED]@{}", scheme, host_part));
            }
        }

        self.truncate(url)
    }

    /// Truncate value if it exceeds max length.
    ///
    /// Cuts on a char boundary so multi-byte keys never panic.
    pub fn truncate<'a>(&self, value: &'a str) -> Cow<'a, str> {
        if value.len() <= self.max_value_length {
            Cow::Borrowed(value)
        } else {
            let mut end = self.max_value_length;
            while end > 0 && !value.is_char_boundary(end) {
                end -= 1;
            }
            Cow::Owned(format!(
                "{}...[truncated {} bytes]",
                &value[..end],
                value.len() - end
            ))
        }
    }
}

/// Keep the first four characters of an access key id and mask the rest.
pub fn mask_access_key(access_key_id: &str) -> String {
    let visible: String = access_key_id.chars().take(4).collect();
    if access_key_id.chars().count() <= 4 {
        return "****".to_string();
    }
    format!("{}****", visible)
}

/// Escape characters that could forge log lines.
pub fn sanitize_for_log(input: &str) -> String {
    input
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
        .chars()
        .filter(|c| !c.is_control() || *c == ' ')
        .collect()
}
