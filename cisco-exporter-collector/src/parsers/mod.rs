//! Dialect-specific parsers for CLI output.
//!
//! Parsers are pure: they take the raw text of one command and return typed
//! records in the device's native units. Unrecognized lines are skipped; only
//! structurally broken output (a record cut short, a table header whose layout
//! is unknown) is reported as a [`ParseError`].

pub mod bgp;
pub mod environment;
pub mod facts;
pub mod interfaces;
pub mod optics;

use std::str::FromStr;

use regex::{Captures, Regex};

use crate::error::ParseError;

/// A line-matching rule: when `pattern` matches, `apply` updates the state.
pub struct LineRule<S> {
    pattern: Regex,
    apply: fn(&mut S, &Captures<'_>) -> Result<(), ParseError>,
}

impl<S> LineRule<S> {
    /// Build a rule. Panics on an invalid pattern; rules are static tables.
    pub fn new(pattern: &str, apply: fn(&mut S, &Captures<'_>) -> Result<(), ParseError>) -> Self {
        Self {
            pattern: Regex::new(pattern).unwrap(),
            apply,
        }
    }
}

/// Apply the first rule matching `line`. Returns whether any rule matched.
pub fn apply_first<S>(rules: &[LineRule<S>], state: &mut S, line: &str) -> Result<bool, ParseError> {
    for rule in rules {
        if let Some(caps) = rule.pattern.captures(line) {
            (rule.apply)(state, &caps)?;
            return Ok(true);
        }
    }
    Ok(false)
}

/// Parse a numeric field, naming it in the error.
pub fn parse_num<T: FromStr>(field: &'static str, value: &str) -> Result<T, ParseError> {
    value.trim().parse().map_err(|_| ParseError::Value {
        field,
        value: value.to_string(),
    })
}

/// Parse capture group `idx` as a number.
pub fn cap_num<T: FromStr>(caps: &Captures<'_>, idx: usize, field: &'static str) -> Result<T, ParseError> {
    parse_num(field, caps.get(idx).map_or("", |m| m.as_str()))
}

/// Capture group `idx` as an owned string, empty if it did not participate.
pub fn cap_str(caps: &Captures<'_>, idx: usize) -> String {
    caps.get(idx).map_or_else(String::new, |m| m.as_str().trim().to_string())
}

/// Whether a table cell means "no value".
pub fn is_not_available(value: &str) -> bool {
    matches!(value, "N/A" | "NA" | "n/a" | "--" | "-")
}
