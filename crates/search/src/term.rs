//! Search term parsing and matching
//!
//! Two kinds of term:
//! - `field: value` (contains a colon): the record, or any sub-record of a
//!   joined composite at any depth, has `field` loosely equal to `value`
//! - anything else: case-insensitive substring of the record's serialized
//!   JSON text
//!
//! # Example
//!
//! ```
//! use mircs_search::term::SearchTerm;
//!
//! let term = SearchTerm::parse("Surname: Smith");
//! assert_eq!(term.field(), Some("Surname"));
//! ```

use mircs_core::value::loose_eq;
use mircs_core::Record;
use serde::{Deserialize, Serialize};

/// Separator between field and value in a field-match term
pub const FIELD_SEPARATOR: char = ':';

/// A parsed search term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchTerm {
    /// Exact (non-strict) field match
    Field {
        /// Field name (trimmed)
        field: String,
        /// Expected value text (trimmed)
        value: String,
    },
    /// Case-insensitive substring match
    Text {
        /// The term as typed
        text: String,
        /// Lowercased needle
        needle: String,
    },
}

impl SearchTerm {
    /// Parse a raw term. The first colon splits field from value.
    pub fn parse(raw: &str) -> SearchTerm {
        match raw.split_once(FIELD_SEPARATOR) {
            Some((field, value)) => SearchTerm::Field {
                field: field.trim().to_string(),
                value: value.trim().to_string(),
            },
            None => SearchTerm::Text {
                text: raw.to_string(),
                needle: raw.to_lowercase(),
            },
        }
    }

    /// Parse a list of raw terms, preserving order
    pub fn parse_all<S: AsRef<str>>(raw: &[S]) -> Vec<SearchTerm> {
        raw.iter().map(|s| SearchTerm::parse(s.as_ref())).collect()
    }

    /// Field name of a field-match term
    pub fn field(&self) -> Option<&str> {
        match self {
            SearchTerm::Field { field, .. } => Some(field),
            SearchTerm::Text { .. } => None,
        }
    }

    /// Whether `record` matches.
    ///
    /// Serializes the record for substring terms; use [`matches_text`]
    /// when checking many terms against one record.
    ///
    /// [`matches_text`]: SearchTerm::matches_text
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            SearchTerm::Field { .. } => self.matches_text(record, ""),
            SearchTerm::Text { .. } => self.matches_text(record, &record_text(record)),
        }
    }

    /// Whether `record` matches, given its precomputed [`record_text`].
    pub fn matches_text(&self, record: &Record, lowered_text: &str) -> bool {
        match self {
            SearchTerm::Field { field, value } => field_matches(record, field, value),
            SearchTerm::Text { needle, .. } => lowered_text.contains(needle.as_str()),
        }
    }
}

/// Lowercased serialized JSON text of a record, the haystack for
/// substring terms.
pub fn record_text(record: &Record) -> String {
    serde_json::to_string(&record.to_json())
        .unwrap_or_default()
        .to_lowercase()
}

fn field_matches(record: &Record, field: &str, value: &str) -> bool {
    match record {
        Record::Joined(joined) => joined.iter().any(|sub| field_matches(sub, field, value)),
        Record::Flat(_) | Record::Geo(_) => record.get(field).is_some_and(|v| loose_eq(v, value)),
    }
}
