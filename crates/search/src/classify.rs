//! Record classification
//!
//! Each record lands in the bucket of the first search term it matches,
//! or in the "other" bucket when nothing matches. Bucket counts are never
//! stored separately: they are the lengths of the grouped lists.

use mircs_core::Record;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::term::{record_text, SearchTerm};

/// Where a record was classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    /// Matched the search term at this index (first match wins)
    Found(usize),
    /// Matched no term
    Other,
}

impl Bucket {
    /// Term index for a found record
    pub fn index(&self) -> Option<usize> {
        match self {
            Bucket::Found(i) => Some(*i),
            Bucket::Other => None,
        }
    }
}

/// Index of the first term matching `record`.
pub fn classify(record: &Record, terms: &[SearchTerm]) -> Bucket {
    if terms.is_empty() {
        return Bucket::Other;
    }
    let needs_text = terms.iter().any(|t| matches!(t, SearchTerm::Text { .. }));
    let text = if needs_text {
        record_text(record)
    } else {
        String::new()
    };
    terms
        .iter()
        .position(|t| t.matches_text(record, &text))
        .map(Bucket::Found)
        .unwrap_or(Bucket::Other)
}

/// Records grouped by bucket
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Classified {
    /// One list per search term, in term order
    pub found: Vec<Vec<Record>>,
    /// Records matching no term
    pub other: Vec<Record>,
}

impl Classified {
    /// Empty groups for `terms` terms
    pub fn with_terms(terms: usize) -> Self {
        Classified {
            found: vec![Vec::new(); terms],
            other: Vec::new(),
        }
    }

    /// Add a record to its bucket
    pub fn push(&mut self, bucket: Bucket, record: Record) {
        match bucket {
            Bucket::Found(i) if i < self.found.len() => self.found[i].push(record),
            _ => self.other.push(record),
        }
    }

    /// Record count per found bucket
    pub fn counts(&self) -> Vec<usize> {
        self.found.iter().map(Vec::len).collect()
    }

    /// Total records classified
    pub fn len(&self) -> usize {
        self.other.len() + self.found.iter().map(Vec::len).sum::<usize>()
    }

    /// Whether nothing has been classified
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Classify every record against raw term strings.
pub fn classify_all<'a, I>(records: I, raw_terms: &[String]) -> Classified
where
    I: IntoIterator<Item = &'a Record>,
{
    let terms = SearchTerm::parse_all(raw_terms);
    let mut classified = Classified::with_terms(terms.len());
    for record in records {
        let bucket = classify(record, &terms);
        classified.push(bucket, record.clone());
    }
    debug!(
        target: "mircs::search",
        terms = terms.len(),
        matched = classified.len() - classified.other.len(),
        other = classified.other.len(),
        "Classified records"
    );
    classified
}
