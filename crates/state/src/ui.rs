//! Shared UI state
//!
//! [`UiStore`] owns the state every map view reads: search terms and
//! their buckets, field names, the highlight field, mapped points, the
//! selection and the tile layer choice. It is shared by handle (cheap
//! `Clone`) between the map surface, the filter bar and the side panel.
//!
//! ## Invariants
//!
//! - `found_records.len() == search_strings.len()` after every action
//! - `selected.records` is empty when no location is selected
//!
//! All mutation goes through the named actions below. Each action
//! announces the [`Topic`]s it changed once the write lock is released.

use std::sync::Arc;

use mircs_core::Record;
use mircs_engine::{collect_field_names, expand_selection, LatLng, LinkMap};
use mircs_search::{highlight_terms, Bucket, Classified};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::observe::{Subscribers, Subscription};

/// Tile layer used until the user picks another
pub const DEFAULT_TILE_LAYER: &str = "OpenStreetMap";

/// Part of the UI state that changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    /// `tile_layer_name`
    TileLayer,
    /// `search_strings` (buckets are re-synced alongside)
    SearchTerms,
    /// `found_records` / `other_records`
    FoundRecords,
    /// `field_names`
    FieldNames,
    /// `highlight_field`
    HighlightField,
    /// `points`
    Points,
    /// `selected`
    Selection,
}

/// The chosen map location and the records found there
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Selected {
    /// Location, `None` when nothing is selected
    pub point: Option<LatLng>,
    /// Records at the location
    pub records: Vec<Record>,
}

impl Selected {
    /// Whether a location is selected
    pub fn is_empty(&self) -> bool {
        self.point.is_none() && self.records.is_empty()
    }
}

/// Snapshot of the shared UI state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiState {
    /// Active tile layer name
    pub tile_layer_name: String,
    /// Search terms in priority order
    pub search_strings: Vec<String>,
    /// Visible field names, first-seen order
    pub field_names: Vec<String>,
    /// Field whose values drive the auto terms and pie chart
    pub highlight_field: Option<String>,
    /// One bucket per search term
    pub found_records: Vec<Vec<Record>>,
    /// Records matching no term
    pub other_records: Vec<Record>,
    /// Every mapped point
    pub points: Vec<LatLng>,
    /// Current selection
    pub selected: Selected,
}

impl UiState {
    fn new(tile_layer_name: &str) -> Self {
        UiState {
            tile_layer_name: tile_layer_name.to_string(),
            search_strings: Vec::new(),
            field_names: Vec::new(),
            highlight_field: None,
            found_records: Vec::new(),
            other_records: Vec::new(),
            points: Vec::new(),
            selected: Selected::default(),
        }
    }

    /// Record count per bucket
    pub fn bucket_counts(&self) -> Vec<usize> {
        self.found_records.iter().map(Vec::len).collect()
    }

    fn resync_buckets(&mut self) {
        self.found_records = vec![Vec::new(); self.search_strings.len()];
        self.other_records.clear();
    }
}

impl Default for UiState {
    fn default() -> Self {
        UiState::new(DEFAULT_TILE_LAYER)
    }
}

// ============================================================================
// Store
// ============================================================================

/// Handle to the shared UI state
#[derive(Clone)]
pub struct UiStore {
    state: Arc<RwLock<UiState>>,
    subscribers: Arc<Subscribers<Topic>>,
    default_tile_layer: Arc<str>,
}

impl UiStore {
    /// Store with the default tile layer
    pub fn new() -> Self {
        Self::with_tile_layer(DEFAULT_TILE_LAYER)
    }

    /// Store whose default (and reset) tile layer is `name`
    pub fn with_tile_layer(name: &str) -> Self {
        UiStore {
            state: Arc::new(RwLock::new(UiState::new(name))),
            subscribers: Arc::new(Subscribers::new()),
            default_tile_layer: Arc::from(name),
        }
    }

    /// Listen for changes
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Topic) + Send + Sync + 'static,
    {
        self.subscribers.subscribe(listener)
    }

    /// Number of attached listeners
    pub fn listener_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Clone of the current state
    pub fn snapshot(&self) -> UiState {
        self.state.read().clone()
    }

    /// Read the state without cloning it
    pub fn read<R>(&self, f: impl FnOnce(&UiState) -> R) -> R {
        f(&self.state.read())
    }

    /// Current search terms
    pub fn search_strings(&self) -> Vec<String> {
        self.state.read().search_strings.clone()
    }

    /// Current tile layer name
    pub fn tile_layer_name(&self) -> String {
        self.state.read().tile_layer_name.clone()
    }

    fn update(&self, topics: &[Topic], f: impl FnOnce(&mut UiState)) {
        {
            let mut state = self.state.write();
            f(&mut state);
            debug_assert_eq!(state.found_records.len(), state.search_strings.len());
        }
        for topic in topics {
            trace!(target: "mircs::state", ?topic, "State changed");
            self.subscribers.notify(topic);
        }
    }

    // ========================================================================
    // Bulk reset
    // ========================================================================

    /// Restore every field to its default, e.g. when switching datasets.
    pub fn reset(&self) {
        let tile = self.default_tile_layer.clone();
        self.update(
            &[
                Topic::TileLayer,
                Topic::SearchTerms,
                Topic::FoundRecords,
                Topic::FieldNames,
                Topic::HighlightField,
                Topic::Points,
                Topic::Selection,
            ],
            |s| *s = UiState::new(&tile),
        );
        debug!(target: "mircs::state", "UI state reset");
    }

    /// Empty every bucket, one per current search term. Field names and
    /// the selection are kept.
    pub fn reset_found_records(&self) {
        self.update(&[Topic::FoundRecords], UiState::resync_buckets);
    }

    // ========================================================================
    // Search terms
    // ========================================================================

    /// Replace the search terms. Blank and repeated terms are dropped.
    pub fn set_search_terms(&self, terms: Vec<String>) {
        let mut cleaned: Vec<String> = Vec::with_capacity(terms.len());
        for term in terms {
            if !term.trim().is_empty() && !cleaned.contains(&term) {
                cleaned.push(term);
            }
        }
        self.update(&[Topic::SearchTerms, Topic::FoundRecords], |s| {
            s.search_strings = cleaned;
            s.resync_buckets();
        });
    }

    /// Append a term with an empty bucket. Returns false (and changes
    /// nothing) for blank or repeated terms.
    pub fn add_search_term(&self, term: &str) -> bool {
        {
            let mut state = self.state.write();
            if term.trim().is_empty() || state.search_strings.iter().any(|t| t == term) {
                return false;
            }
            state.search_strings.push(term.to_string());
            state.found_records.push(Vec::new());
        }
        self.subscribers.notify(&Topic::SearchTerms);
        self.subscribers.notify(&Topic::FoundRecords);
        true
    }

    /// Remove a term and the bucket at its index. Returns false for an
    /// unknown term.
    pub fn remove_search_term(&self, term: &str) -> bool {
        {
            let mut state = self.state.write();
            let Some(index) = state.search_strings.iter().position(|t| t == term) else {
                return false;
            };
            state.search_strings.remove(index);
            state.found_records.remove(index);
        }
        self.subscribers.notify(&Topic::SearchTerms);
        self.subscribers.notify(&Topic::FoundRecords);
        true
    }

    /// Set the highlight field and replace the terms with its most
    /// frequent values in `records`. `None` clears the field and empties
    /// the buckets, keeping the terms.
    pub fn set_highlight_field(&self, field: Option<&str>, records: &[Record]) {
        match field {
            Some(field) => {
                let terms = highlight_terms(records, field);
                debug!(target: "mircs::state", field, terms = terms.len(), "Highlight field set");
                self.update(
                    &[Topic::HighlightField, Topic::SearchTerms, Topic::FoundRecords],
                    |s| {
                        s.highlight_field = Some(field.to_string());
                        s.search_strings = terms;
                        s.resync_buckets();
                    },
                );
            }
            None => {
                self.update(&[Topic::HighlightField, Topic::FoundRecords], |s| {
                    s.highlight_field = None;
                    s.resync_buckets();
                });
            }
        }
    }

    // ========================================================================
    // Classification results
    // ========================================================================

    /// Replace the buckets with a classification of the current terms.
    ///
    /// Returns false, leaving state unchanged, when `classified` was
    /// computed for a different number of terms.
    pub fn apply_classification(&self, classified: Classified) -> bool {
        {
            let mut state = self.state.write();
            if classified.found.len() != state.search_strings.len() {
                debug!(
                    target: "mircs::state",
                    buckets = classified.found.len(),
                    terms = state.search_strings.len(),
                    "Discarding stale classification"
                );
                return false;
            }
            state.found_records = classified.found;
            state.other_records = classified.other;
        }
        self.subscribers.notify(&Topic::FoundRecords);
        true
    }

    /// Add one classified record to its bucket.
    pub fn push_found_record(&self, bucket: Bucket, record: Record) {
        self.update(&[Topic::FoundRecords], |s| match bucket {
            Bucket::Found(i) if i < s.found_records.len() => s.found_records[i].push(record),
            _ => s.other_records.push(record),
        });
    }

    // ========================================================================
    // Fields, points, selection, tiles
    // ========================================================================

    /// Add the visible field names of a sample record
    pub fn add_field_names(&self, sample: &Record) {
        let mut added = 0;
        self.update(&[], |s| added = collect_field_names(sample, &mut s.field_names));
        if added > 0 {
            self.subscribers.notify(&Topic::FieldNames);
        }
    }

    /// Forget every field name
    pub fn reset_field_names(&self) {
        self.update(&[Topic::FieldNames], |s| s.field_names.clear());
    }

    /// Replace the mapped points
    pub fn set_points(&self, points: Vec<LatLng>) {
        self.update(&[Topic::Points], |s| s.points = points);
    }

    /// Select the location of `record`, surfacing every record there.
    ///
    /// Polygons are selected without a point.
    pub fn select(&self, point: Option<LatLng>, record: &Record, link_map: &LinkMap) {
        self.select_records(point, expand_selection(record, link_map));
    }

    /// Select an already expanded set of records.
    pub fn select_records(&self, point: Option<LatLng>, records: Vec<Record>) {
        debug!(target: "mircs::state", records = records.len(), "Location selected");
        self.update(&[Topic::Selection], |s| s.selected = Selected { point, records });
    }

    /// Clear the selection
    pub fn clear_selection(&self) {
        let was_selected = !self.state.read().selected.is_empty();
        if was_selected {
            self.update(&[Topic::Selection], |s| s.selected = Selected::default());
        }
    }

    /// Switch tile layer by name
    pub fn set_tile_layer(&self, name: &str) {
        let changed = self.state.read().tile_layer_name != name;
        if changed {
            self.update(&[Topic::TileLayer], |s| s.tile_layer_name = name.to_string());
        }
    }
}

impl Default for UiStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for UiStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiStore")
            .field("state", &*self.state.read())
            .field("subscribers", &self.subscribers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    fn rec(v: serde_json::Value) -> Record {
        Record::from_json(v).unwrap()
    }

    fn terms(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn topics(store: &UiStore) -> (Arc<Mutex<Vec<Topic>>>, Subscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sub = {
            let seen = Arc::clone(&seen);
            store.subscribe(move |t| seen.lock().push(*t))
        };
        (seen, sub)
    }

    #[test]
    fn test_add_term_appends_one_bucket() {
        let store = UiStore::new();
        assert!(store.add_search_term("Smith"));
        assert!(store.add_search_term("City: Halifax"));
        let s = store.snapshot();
        assert_eq!(s.search_strings, terms(&["Smith", "City: Halifax"]));
        assert_eq!(s.found_records.len(), 2);
    }

    #[test]
    fn test_add_ignores_blank_and_duplicate() {
        let store = UiStore::new();
        assert!(store.add_search_term("Smith"));
        assert!(!store.add_search_term("Smith"));
        assert!(!store.add_search_term("   "));
        assert_eq!(store.snapshot().found_records.len(), 1);
    }

    #[test]
    fn test_remove_term_removes_its_bucket() {
        let store = UiStore::new();
        store.set_search_terms(terms(&["a", "b", "c"]));
        store.push_found_record(Bucket::Found(1), rec(json!({"n": "b"})));
        store.push_found_record(Bucket::Found(2), rec(json!({"n": "c"})));
        assert!(store.remove_search_term("b"));
        let s = store.snapshot();
        assert_eq!(s.search_strings, terms(&["a", "c"]));
        assert_eq!(s.bucket_counts(), vec![0, 1]);
        assert!(!store.remove_search_term("zzz"));
    }

    #[test]
    fn test_reset_found_records_keeps_fields_and_selection() {
        let store = UiStore::new();
        store.set_search_terms(terms(&["a"]));
        store.add_field_names(&rec(json!({"_id": "1", "Name": "x"})));
        let r = rec(json!({"_id": "1", "Name": "x"}));
        store.select(Some(LatLng::new(1.0, 2.0)), &r, &LinkMap::new());
        store.push_found_record(Bucket::Found(0), r);

        store.reset_found_records();
        let s = store.snapshot();
        assert_eq!(s.bucket_counts(), vec![0]);
        assert_eq!(s.field_names, terms(&["Name"]));
        assert_eq!(s.selected.records.len(), 1);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let store = UiStore::with_tile_layer("Mapbox");
        store.set_search_terms(terms(&["a"]));
        store.set_tile_layer("CamsMap");
        store.add_field_names(&rec(json!({"Name": "x"})));

        store.reset();
        let once = store.snapshot();
        store.reset();
        assert_eq!(store.snapshot(), once);
        assert_eq!(once.tile_layer_name, "Mapbox");
        assert!(once.search_strings.is_empty());
        assert!(once.found_records.is_empty());
        assert!(once.field_names.is_empty());
    }

    #[test]
    fn test_highlight_field_builds_terms() {
        let store = UiStore::new();
        let records = vec![
            rec(json!({"City": "Truro"})),
            rec(json!({"City": "Halifax"})),
            rec(json!({"City": "Halifax"})),
        ];
        store.set_highlight_field(Some("City"), &records);
        let s = store.snapshot();
        assert_eq!(s.highlight_field.as_deref(), Some("City"));
        assert_eq!(s.search_strings, terms(&["City: Halifax", "City: Truro"]));
        assert_eq!(s.found_records.len(), 2);

        store.push_found_record(Bucket::Found(0), records[1].clone());
        store.set_highlight_field(None, &records);
        let s = store.snapshot();
        assert_eq!(s.highlight_field, None);
        assert_eq!(s.search_strings.len(), 2);
        assert_eq!(s.bucket_counts(), vec![0, 0]);
    }

    #[test]
    fn test_stale_classification_is_discarded() {
        let store = UiStore::new();
        store.set_search_terms(terms(&["a", "b"]));
        assert!(!store.apply_classification(Classified::with_terms(1)));
        assert!(store.apply_classification(Classified::with_terms(2)));
    }

    #[test]
    fn test_actions_announce_topics() {
        let store = UiStore::new();
        let (seen, _sub) = topics(&store);
        store.set_tile_layer("Mapbox");
        store.set_tile_layer("Mapbox");
        store.add_search_term("x");
        store.clear_selection();
        assert_eq!(
            *seen.lock(),
            vec![Topic::TileLayer, Topic::SearchTerms, Topic::FoundRecords]
        );
    }

    #[test]
    fn test_field_names_notify_only_when_added() {
        let store = UiStore::new();
        let (seen, _sub) = topics(&store);
        store.add_field_names(&rec(json!({"Name": "x"})));
        store.add_field_names(&rec(json!({"Name": "y", "_id": "1"})));
        assert_eq!(*seen.lock(), vec![Topic::FieldNames]);
    }

    #[test]
    fn test_listener_can_read_store() {
        let store = UiStore::new();
        let observed = Arc::new(Mutex::new(Vec::new()));
        let _sub = {
            let reader = store.clone();
            let observed = Arc::clone(&observed);
            store.subscribe(move |t| {
                if *t == Topic::SearchTerms {
                    observed.lock().push(reader.search_strings());
                }
            })
        };
        store.add_search_term("Smith");
        assert_eq!(*observed.lock(), vec![terms(&["Smith"])]);
    }
}
