//! Join resolution between related datasets
//!
//! This module provides:
//! - `join_key`: composite key text for one side of a join
//! - `resolve_join`: left-record id -> matched right property sets
//! - `LinkMap`: the resolved join index, merged across relationships
//! - `related_sets`: relationships touching a dataset, oriented so the
//!   current dataset is always the left side
//!
//! # Key rules
//!
//! - Multi-field keys join the field texts with `_` in element order.
//! - A missing or null constituent excludes the record (partial keys never
//!   match).
//! - Duplicate left keys: the later left record wins.
//!
//! Resolution is two hash passes, O(L + R).

use mircs_core::{
    reverse_join_elements, DataSetId, JoinElement, Properties, Record, RecordId, Relationship,
    RelationshipId, Side,
};
use rustc_hash::FxHashMap;
use tracing::debug;

/// Separator between field texts in a composite join key
pub const KEY_SEPARATOR: &str = "_";

// ============================================================================
// LinkMap
// ============================================================================

/// Left-record id -> ordered right-record property sets.
///
/// Rebuilt whenever the active dataset or its related datasets change;
/// never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkMap {
    links: FxHashMap<RecordId, Vec<Properties>>,
}

impl LinkMap {
    /// Create an empty link map
    pub fn new() -> Self {
        Self::default()
    }

    /// Matched property sets for a left record (empty if none)
    pub fn get(&self, id: &RecordId) -> &[Properties] {
        self.links.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of left records with at least one match
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether no left record has a match
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Total matched right records across all left records
    pub fn total_links(&self) -> usize {
        self.links.values().map(Vec::len).sum()
    }

    /// Iterate over `(left id, matches)` in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = (&RecordId, &[Properties])> {
        self.links.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Drop all links
    pub fn clear(&mut self) {
        self.links.clear();
    }

    fn push(&mut self, id: RecordId, properties: Properties) {
        self.links.entry(id).or_default().push(properties);
    }
}

// ============================================================================
// Keys
// ============================================================================

/// Build the composite join key of a record for one side of a join.
///
/// Reads from the feature properties for GeoJSON records and from the
/// field map otherwise. Returns `None` when any constituent field is
/// missing or null, when there are no join elements, or for joined
/// composites (which have no single property bag).
pub fn join_key(record: &Record, elements: &[JoinElement], side: Side) -> Option<String> {
    if elements.is_empty() {
        return None;
    }
    let props = record.properties()?;
    let mut key = String::new();
    for element in elements {
        let text = props
            .get(element.field(side))
            .and_then(mircs_core::value::key_text)?;
        if !key.is_empty() {
            key.push_str(KEY_SEPARATOR);
        }
        key.push_str(&text);
    }
    Some(key)
}

// ============================================================================
// Resolution
// ============================================================================

/// Counters from one join pass, for logging and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinStats {
    /// Left records that produced a key and carry an id
    pub indexed_left: usize,
    /// Left records excluded (partial key or no id)
    pub skipped_left: usize,
    /// Right records appended to some left record
    pub matched_right: usize,
}

/// Resolve a join into a fresh [`LinkMap`].
///
/// `elements` are oriented so `left` holds the values of dataset 0.
pub fn resolve_join(left: &[Record], right: &[Record], elements: &[JoinElement]) -> LinkMap {
    let mut link_map = LinkMap::new();
    resolve_join_into(&mut link_map, left, right, elements);
    link_map
}

/// Resolve a join, appending matches to an existing map.
///
/// Several relationships of the same dataset accumulate into one map.
pub fn resolve_join_into(
    link_map: &mut LinkMap,
    left: &[Record],
    right: &[Record],
    elements: &[JoinElement],
) -> JoinStats {
    let mut stats = JoinStats::default();

    let mut left_ids: FxHashMap<String, RecordId> = FxHashMap::default();
    for record in left {
        match (join_key(record, elements, Side::Left), record.id()) {
            (Some(key), Some(id)) => {
                left_ids.insert(key, id);
                stats.indexed_left += 1;
            }
            _ => stats.skipped_left += 1,
        }
    }

    for record in right {
        let Some(key) = join_key(record, elements, Side::Right) else {
            continue;
        };
        let Some(left_id) = left_ids.get(&key) else {
            continue;
        };
        if let Some(props) = record.properties() {
            link_map.push(left_id.clone(), props.clone());
            stats.matched_right += 1;
        }
    }

    debug!(
        target: "mircs::join",
        left = left.len(),
        right = right.len(),
        indexed = stats.indexed_left,
        skipped = stats.skipped_left,
        matched = stats.matched_right,
        "Resolved join"
    );
    stats
}

// ============================================================================
// Relationship orientation
// ============================================================================

/// A dataset related to the current one, with join elements oriented so
/// index 0 of each pair names a field of the current dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedDataSet {
    /// Relationship this came from
    pub relationship_id: RelationshipId,
    /// The other dataset
    pub data_set_id: DataSetId,
    /// Oriented join elements
    pub join_elements: Vec<JoinElement>,
}

/// Find relationships involving `current`, oriented current-first.
///
/// When the current dataset is `dataSets[1]` the pairs are reversed.
/// Malformed relationships are skipped.
pub fn related_sets(relationships: &[Relationship], current: &DataSetId) -> Vec<RelatedDataSet> {
    let mut related = Vec::new();
    for relationship in relationships {
        if !relationship.involves(current) {
            continue;
        }
        if let Err(e) = relationship.validate() {
            debug!(target: "mircs::join", error = %e, "Skipping relationship");
            continue;
        }
        let Some((first, second)) = relationship.pair() else {
            continue;
        };
        let (data_set_id, join_elements) = if first == current {
            (second.clone(), relationship.join_elements.clone())
        } else {
            (first.clone(), reverse_join_elements(&relationship.join_elements))
        };
        related.push(RelatedDataSet {
            relationship_id: relationship.id.clone(),
            data_set_id,
            join_elements,
        });
    }
    related
}
