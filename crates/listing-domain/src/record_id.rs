//! Record identifiers

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Caller-assigned identifier of a record
///
/// Identifiers are opaque strings. On input both JSON strings and JSON
/// integers are accepted; output is always a string. An empty identifier
/// means the collector never assigned one.
///
/// Ordering is numeric-aware and total: identifiers made only of ASCII
/// digits compare by value (`"9" < "10"`) and sort ahead of every other
/// identifier, which compare lexicographically among themselves.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawRecordId", into = "String")]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when no identifier was assigned
    pub fn is_missing(&self) -> bool {
        self.0.trim().is_empty()
    }

    fn numeric_value(&self) -> Option<u128> {
        if self.0.is_empty() || !self.0.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        self.0.parse().ok()
    }
}

impl Ord for RecordId {
    fn cmp(&self, other: &Self) -> Ordering {
        let (left, right) = (self.numeric_value(), other.numeric_value());
        left.is_none()
            .cmp(&right.is_none())
            .then_with(|| left.cmp(&right))
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for RecordId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<u64> for RecordId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

/// Wire form accepted when deserializing identifiers
#[derive(Deserialize)]
#[serde(untagged)]
enum RawRecordId {
    Number(u64),
    Text(String),
}

impl From<RawRecordId> for RecordId {
    fn from(raw: RawRecordId) -> Self {
        match raw {
            RawRecordId::Number(n) => RecordId::from(n),
            RawRecordId::Text(s) => RecordId(s),
        }
    }
}
