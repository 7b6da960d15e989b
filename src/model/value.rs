use std::fmt;

/// Text shown for fields that were defaulted rather than read from a tag
pub const UNKNOWN_TEXT: &str = "Unknown";

/// A single field value of a [`TagRecord`](super::TagRecord)
///
/// `Unknown` marks a field that was filled in by sanitizing, so it can be
/// told apart from a tag that literally says "Unknown".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Known(String),
    Unknown,
}

impl Value {
    /// Text of this value; the placeholder reads as "Unknown"
    pub fn as_str(&self) -> &str {
        match self {
            Value::Known(s) => s,
            Value::Unknown => UNKNOWN_TEXT,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown)
    }

    /// Newline separated segments of a multi-valued field
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.as_str().split('\n')
    }

    /// Parse the value as an integer, ignoring surrounding whitespace
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Known(s) => s.trim().parse().ok(),
            Value::Unknown => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Known(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Known(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Known(n.to_string())
    }
}
