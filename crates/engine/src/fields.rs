//! Field name collection for filter options and chart labels
//!
//! A single sample record stands in for its dataset: its visible field
//! names are appended to an accumulated list, skipping reserved names and
//! names already present, preserving first-seen order.

use mircs_core::{is_reserved_field, Properties, Record};

/// The property bag that represents a record's fields.
///
/// - Joined: the first left match (first right match if the left side is
///   empty), recursively
/// - Geo: the feature properties
/// - Flat: the record itself
pub fn representative_properties(record: &Record) -> Option<&Properties> {
    match record {
        Record::Joined(joined) => joined
            .left
            .first()
            .or_else(|| joined.right.first())
            .and_then(representative_properties),
        Record::Geo(feature) => Some(&feature.properties),
        Record::Flat(props) => Some(props),
    }
}

/// Append the visible field names of `sample` to `names`.
///
/// Returns the number of names added.
pub fn collect_field_names(sample: &Record, names: &mut Vec<String>) -> usize {
    let Some(props) = representative_properties(sample) else {
        return 0;
    };
    let before = names.len();
    for key in props.keys() {
        if !is_reserved_field(key) && !names.iter().any(|n| n == key) {
            names.push(key.clone());
        }
    }
    names.len() - before
}
