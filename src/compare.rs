//! Line-order-insensitive comparison of multi-line outputs.

use std::fmt;
use thiserror::Error;

/// What a subject call hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    /// Output that is not valid UTF-8
    Bytes(Vec<u8>),
    Nothing,
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Nothing => "nothing",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(s) => Value::Text(s),
            Err(e) => Value::Bytes(e.into_bytes()),
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Nothing
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Argument {
    Expected,
    Actual,
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Expected => f.write_str("expected"),
            Argument::Actual => f.write_str("actual"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompareError {
    #[error("{argument} value is not text (found {found})")]
    TypeKind {
        argument: Argument,
        found: &'static str,
    },

    /// Both sides after trimming and sorting.
    #[error("lines differ\nexpected:\n{expected}\nactual:\n{actual}")]
    Mismatch { expected: String, actual: String },
}

/// Trim every line and, when `sort` is set, sort the lines before joining
/// them back with `\n`.
pub fn normalize(text: &str, sort: bool) -> String {
    let mut lines: Vec<&str> = text.lines().map(str::trim).collect();
    if sort {
        lines.sort_unstable();
    }
    lines.join("\n")
}

pub fn lines_equal(expected: &str, actual: &str) -> bool {
    normalize(expected, true) == normalize(actual, true)
}

/// Succeeds iff both values are text and hold the same multiset of trimmed
/// lines.
pub fn assert_lines_equal(expected: &Value, actual: &Value) -> Result<(), CompareError> {
    let expected = expected.as_text().ok_or(CompareError::TypeKind {
        argument: Argument::Expected,
        found: expected.kind(),
    })?;
    let actual = actual.as_text().ok_or(CompareError::TypeKind {
        argument: Argument::Actual,
        found: actual.kind(),
    })?;

    let expected = normalize(expected, true);
    let actual = normalize(actual, true);
    if expected == actual {
        Ok(())
    } else {
        Err(CompareError::Mismatch { expected, actual })
    }
}
