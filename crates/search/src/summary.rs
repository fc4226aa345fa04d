//! Derived views
//!
//! Everything the side panel and filter bar show is recomputed from the
//! current terms and buckets:
//! - value counts and the auto terms for a highlight field
//! - chip labels with bucket counts
//! - the "other" total and pie-chart slices
//! - record cards and popup text for selected records

use mircs_core::value::{is_present, text};
use mircs_core::Record;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::highlight::{highlight_segments, Segment};
use crate::marker::{bucket_colour, OTHER_COLOUR, STYLED_BUCKETS};
use crate::term::SearchTerm;

// ============================================================================
// Highlight field
// ============================================================================

/// Occurrences of one field value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueCount {
    /// Display text of the value
    pub value: String,
    /// Number of records carrying it
    pub count: usize,
}

/// Count distinct non-empty values of `field`, most frequent first.
///
/// Joined records contribute the first entry of each side. Ties keep
/// first-seen order.
pub fn value_counts<'a, I>(records: I, field: &str) -> Vec<ValueCount>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut counts: Vec<ValueCount> = Vec::new();
    let mut index: FxHashMap<String, usize> = FxHashMap::default();

    let mut count = |record: &Record| {
        let Some(value) = record.get(field).filter(|v| is_present(v)) else {
            return;
        };
        let value = text(value);
        match index.get(&value) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(value.clone(), counts.len());
                counts.push(ValueCount { value, count: 1 });
            }
        }
    };

    for record in records {
        match record {
            Record::Joined(joined) => {
                for side in [&joined.left, &joined.right] {
                    if let Some(first) = side.first() {
                        count(first);
                    }
                }
            }
            Record::Flat(_) | Record::Geo(_) => count(record),
        }
    }

    // stable: ties stay in first-seen order
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

/// `field: value` terms for the most frequent values of `field`.
pub fn highlight_terms<'a, I>(records: I, field: &str) -> Vec<String>
where
    I: IntoIterator<Item = &'a Record>,
{
    value_counts(records, field)
        .into_iter()
        .take(STYLED_BUCKETS)
        .map(|vc| format!("{}: {}", field, vc.value))
        .collect()
}

// ============================================================================
// Chips and pie chart
// ============================================================================

/// A search-term chip in the filter bar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chip {
    /// The raw search term
    pub term: String,
    /// `"<term> (<count>)"`
    pub label: String,
    /// Palette colour, `None` for overflow buckets
    pub colour: Option<String>,
}

/// One chip per term, labelled with its bucket count.
pub fn chips(terms: &[String], counts: &[usize]) -> Vec<Chip> {
    terms
        .iter()
        .enumerate()
        .map(|(i, term)| Chip {
            term: term.clone(),
            label: format!("{} ({})", term, counts.get(i).copied().unwrap_or(0)),
            colour: bucket_colour(i).map(str::to_string),
        })
        .collect()
}

/// Records shown as "Other": unmatched plus every overflow bucket.
pub fn other_count(other: usize, counts: &[usize]) -> usize {
    other + counts.iter().skip(STYLED_BUCKETS).sum::<usize>()
}

/// One slice of the highlight-field pie chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieSlice {
    /// Slice label
    pub label: String,
    /// Record count
    pub value: usize,
    /// Fill colour
    pub colour: String,
}

/// Pie slices for the styled buckets plus an "Other" slice.
pub fn pie_slices(terms: &[String], counts: &[usize], other: usize) -> Vec<PieSlice> {
    let mut slices: Vec<PieSlice> = terms
        .iter()
        .zip(counts)
        .take(STYLED_BUCKETS)
        .enumerate()
        .filter_map(|(i, (term, &value))| {
            Some(PieSlice {
                label: term.clone(),
                value,
                colour: bucket_colour(i)?.to_string(),
            })
        })
        .collect();
    slices.push(PieSlice {
        label: "Other".to_string(),
        value: other_count(other, counts),
        colour: OTHER_COLOUR.to_string(),
    });
    slices
}

// ============================================================================
// Record cards
// ============================================================================

/// One `field: value` line of a record card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardLine {
    /// Field name
    pub field: String,
    /// Value split into highlighted runs
    pub segments: Vec<Segment>,
}

impl CardLine {
    /// The value text without highlighting
    pub fn value(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }
}

/// Visible lines of a selected record, highlighted against `terms`.
///
/// Reserved and empty fields are skipped.
pub fn record_card(record: &Record, terms: &[SearchTerm]) -> Vec<CardLine> {
    record
        .visible_fields()
        .filter(|(_, v)| is_present(v))
        .map(|(field, value)| CardLine {
            field: field.clone(),
            segments: highlight_segments(field, &text(value), terms),
        })
        .collect()
}

/// Marker popup text: one `field: value` line per visible field.
///
/// Joined records list each sub-record, separated by a blank line.
pub fn popup_text(record: &Record) -> String {
    match record {
        Record::Joined(joined) => joined
            .iter()
            .map(popup_text)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n"),
        Record::Flat(_) | Record::Geo(_) => record
            .visible_fields()
            .filter(|(_, v)| is_present(v))
            .map(|(field, value)| format!("{}: {}", field, text(value)))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(v: serde_json::Value) -> Record {
        Record::from_json(v).unwrap()
    }

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_value_counts_sorted_with_stable_ties() {
        let records = vec![
            rec(json!({"City": "Truro"})),
            rec(json!({"City": "Halifax"})),
            rec(json!({"City": "Halifax"})),
            rec(json!({"City": "Digby"})),
            rec(json!({"City": ""})),
            rec(json!({"Name": "x"})),
        ];
        let counts = value_counts(&records, "City");
        let values: Vec<_> = counts.iter().map(|c| (c.value.as_str(), c.count)).collect();
        assert_eq!(values, vec![("Halifax", 2), ("Truro", 1), ("Digby", 1)]);
    }

    #[test]
    fn test_value_counts_joined_uses_first_of_each_side() {
        let records = vec![rec(json!({
            "data": [[{"Ward": 1}, {"Ward": 2}], [{"Ward": 1}]]
        }))];
        let counts = value_counts(&records, "Ward");
        assert_eq!(
            counts,
            vec![ValueCount {
                value: "1".to_string(),
                count: 2
            }]
        );
    }

    #[test]
    fn test_highlight_terms_capped_at_styled_buckets() {
        let records: Vec<Record> = (0..10).map(|i| rec(json!({"n": i + 1}))).collect();
        let terms = highlight_terms(&records, "n");
        assert_eq!(terms.len(), STYLED_BUCKETS);
        assert_eq!(terms[0], "n: 1");
    }

    #[test]
    fn test_chip_labels() {
        let c = chips(&strings(&["Smith", "City: Halifax"]), &[3, 0]);
        assert_eq!(c[0].label, "Smith (3)");
        assert_eq!(c[1].label, "City: Halifax (0)");
        assert_eq!(c[0].colour.as_deref(), Some("#885154"));
    }

    #[test]
    fn test_chip_beyond_palette_has_no_colour() {
        let terms: Vec<String> = (0..9).map(|i| format!("t{}", i)).collect();
        let c = chips(&terms, &[0; 9]);
        assert!(c[6].colour.is_some());
        assert!(c[7].colour.is_none());
    }

    #[test]
    fn test_other_count_includes_overflow() {
        assert_eq!(other_count(4, &[1, 1, 1]), 4);
        assert_eq!(other_count(4, &[1, 1, 1, 1, 1, 1, 1, 2, 3]), 9);
    }

    #[test]
    fn test_pie_slices_end_with_other() {
        let slices = pie_slices(&strings(&["a", "b"]), &[2, 1], 5);
        assert_eq!(slices.len(), 3);
        assert_eq!(slices[1].colour, "#EC635F");
        assert_eq!(slices[2].label, "Other");
        assert_eq!(slices[2].value, 5);
        assert_eq!(slices[2].colour, OTHER_COLOUR);
    }

    #[test]
    fn test_record_card_skips_reserved_and_empty() {
        let r = rec(json!({"_id": "a", "Name": "Foo Smith", "Note": "", "Ward": 0, "Age": 40}));
        let card = record_card(&r, &SearchTerm::parse_all(&["smith"]));
        let fields: Vec<_> = card.iter().map(|l| l.field.as_str()).collect();
        assert_eq!(fields, vec!["Name", "Age"]);
        assert_eq!(card[0].value(), "Foo Smith");
        assert_eq!(card[0].segments[1].term, Some(0));
    }

    #[test]
    fn test_popup_text() {
        let r = rec(json!({"_id": "a", "Name": "Foo", "Y": 44.6}));
        assert_eq!(popup_text(&r), "Name: Foo\nY: 44.6");
    }

    #[test]
    fn test_popup_text_lists_joined_sub_records() {
        let r = rec(json!({"data": [[{"Name": "Foo"}], [{"_id": "b", "Code": "A"}]]}));
        assert_eq!(popup_text(&r), "Name: Foo\n\nCode: A");
    }
}
