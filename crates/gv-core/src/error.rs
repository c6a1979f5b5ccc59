//! Error types and the deduplicated warning channel.

use std::collections::HashSet;
use std::sync::Mutex;
use thiserror::Error;

/// Errors from the graph-definition parser. Line and column are
/// 1-based; `near` holds the two most recent tokens for context.
#[derive(Debug, Error, PartialEq)]
#[error("syntax error at line {line}:{col} near {near}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub col: usize,
    pub near: String,
    pub message: String,
}

impl ParseError {
    pub fn new(
        line: usize,
        col: usize,
        near: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            line,
            col,
            near: near.into(),
            message: message.into(),
        }
    }
}

/// Errors from the HTML-like label parser. One per rejected label; the
/// surrounding graph parse continues.
#[derive(Debug, Error, PartialEq)]
#[error("bad label at line {line}: {message}")]
pub struct LabelError {
    pub line: usize,
    pub message: String,
}

impl LabelError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Warn through the `log` facade, once per distinct message key.
///
/// The set is process-global and survives across jobs, matching the
/// lifetime of the other process-global tables (interner, registries).
pub fn warn_once(key: &str, message: std::fmt::Arguments<'_>) {
    static SEEN: Mutex<Option<HashSet<String>>> = Mutex::new(None);
    let mut guard = SEEN.lock().unwrap_or_else(|e| e.into_inner());
    let seen = guard.get_or_insert_with(HashSet::new);
    if seen.insert(key.to_owned()) {
        log::warn!("{message}");
    }
}

/// `warn_once` with the formatted message as its own key.
#[macro_export]
macro_rules! warn_once {
    ($($arg:tt)*) => {{
        let msg = format!($($arg)*);
        $crate::error::warn_once(&msg, format_args!("{}", msg));
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_formats_position_and_context() {
        let e = ParseError::new(3, 7, "'}' '->'", "unexpected token");
        let s = e.to_string();
        assert!(s.contains("line 3:7"));
        assert!(s.contains("'->'"));
    }
}
