//! Secret redaction for exported and shared session data.
//!
//! Patterns run in a fixed order over the same buffer, each one rewriting what
//! the previous ones left behind.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};

/// Marker written in place of every redacted secret.
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// A secret shape and what to write in its place.
struct SecretPattern {
    regex: Regex,
    replacement: &'static str,
}

impl SecretPattern {
    fn new(pattern: &str, replacement: &'static str) -> Self {
        Self {
            regex: Regex::new(pattern).expect("Invalid Regex"),
            replacement,
        }
    }
}

lazy_static! {
    static ref SECRET_PATTERNS: Vec<SecretPattern> = vec![
        // Anthropic before the generic `sk-` shape so the whole key goes.
        SecretPattern::new(r"sk-ant-[A-Za-z0-9_\-]{20,}", REDACTION_MARKER),
        SecretPattern::new(r"sk-(?:proj-)?[A-Za-z0-9]{20,}", REDACTION_MARKER),
        SecretPattern::new(r"AIza[0-9A-Za-z_\-]{35}", REDACTION_MARKER),
        SecretPattern::new(r"gh[pousr]_[A-Za-z0-9]{36,}", REDACTION_MARKER),
        SecretPattern::new(r"github_pat_[A-Za-z0-9_]{22,}", REDACTION_MARKER),
        SecretPattern::new(r"xox[baprs]-[A-Za-z0-9\-]{10,}", REDACTION_MARKER),
        SecretPattern::new(r"(?i)bearer\s+[A-Za-z0-9_\-\.=]{16,}", REDACTION_MARKER),
        // Keeps key and separator: `password = [REDACTED]`.
        SecretPattern::new(
            r#"(?i)(api[_-]?key|secret|token|password|passwd|access[_-]?key)(["']?\s*[:=]\s*["']?)[^\s"',;]{8,}"#,
            "${1}${2}[REDACTED]",
        ),
        SecretPattern::new(r"(?:AKIA|ASIA)[0-9A-Z]{16}", REDACTION_MARKER),
    ];
}

/// Replace every secret-shaped substring of `text` with [`REDACTION_MARKER`].
pub fn redact(text: &str) -> String {
    let mut out = text.to_string();
    for pattern in SECRET_PATTERNS.iter() {
        if pattern.regex.is_match(&out) {
            out = pattern
                .regex
                .replace_all(&out, pattern.replacement)
                .into_owned();
        }
    }
    out
}

/// Returns `true` if any pattern matches `text`.
pub fn contains_secret(text: &str) -> bool {
    SECRET_PATTERNS
        .iter()
        .any(|pattern| pattern.regex.is_match(text))
}

/// Redact every string leaf of a nested key/value map.
///
/// Only nested maps are descended into; arrays and non-string scalars are
/// copied as they are.
pub fn redact_map(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => Value::String(redact(s)),
                Value::Object(inner) => Value::Object(redact_map(inner)),
                other => other.clone(),
            };
            (key.clone(), value)
        })
        .collect()
}
