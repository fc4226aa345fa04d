//! Records on display
//!
//! [`ViewStore`] holds what the map is drawing: the active dataset's (or
//! relationship's) records and, for a dataset, the records of each related
//! dataset with join elements oriented from the active one. Replacing
//! either list announces a [`ViewChange`]; the map surface rebuilds its
//! layers in response.

use std::sync::Arc;

use mircs_core::{DataSetId, JoinElement, Record, RelationshipId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::observe::{Subscribers, Subscription};

/// What the view is showing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ViewSource {
    /// A dataset's records
    DataSet(DataSetId),
    /// A relationship's server-joined records
    Relationship(RelationshipId),
}

/// Records of one related dataset
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedRecords {
    /// The related dataset
    pub data_set_id: DataSetId,
    /// Join elements, index 0 referring to the active dataset
    pub join_elements: Vec<JoinElement>,
    /// Its records
    pub records: Vec<Record>,
}

/// Which list changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewChange {
    /// Main records replaced (or cleared)
    Records,
    /// Related records replaced
    Related,
}

/// Snapshot of the records on display
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewData {
    /// Source of `records`, `None` before anything is opened
    pub source: Option<ViewSource>,
    /// Records to map
    pub records: Vec<Record>,
    /// Related datasets joined client-side
    pub related: Vec<RelatedRecords>,
}

/// Handle to the records on display
#[derive(Clone, Default)]
pub struct ViewStore {
    data: Arc<RwLock<ViewData>>,
    subscribers: Arc<Subscribers<ViewChange>>,
}

impl ViewStore {
    /// Empty view
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen for changes
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ViewChange) + Send + Sync + 'static,
    {
        self.subscribers.subscribe(listener)
    }

    /// Clone of the current view
    pub fn snapshot(&self) -> ViewData {
        self.data.read().clone()
    }

    /// Read the view without cloning it
    pub fn read<R>(&self, f: impl FnOnce(&ViewData) -> R) -> R {
        f(&self.data.read())
    }

    /// Current source
    pub fn source(&self) -> Option<ViewSource> {
        self.data.read().source.clone()
    }

    /// Show `records` from `source`. Related records from a previous
    /// source are dropped.
    pub fn set_records(&self, source: ViewSource, records: Vec<Record>) {
        debug!(target: "mircs::state", ?source, records = records.len(), "View records replaced");
        {
            let mut data = self.data.write();
            if data.source.as_ref() != Some(&source) {
                data.related.clear();
            }
            data.source = Some(source);
            data.records = records;
        }
        self.subscribers.notify(&ViewChange::Records);
    }

    /// Replace the related records.
    ///
    /// Ignored unless `for_source` is still the active source.
    pub fn set_related(&self, for_source: &ViewSource, related: Vec<RelatedRecords>) -> bool {
        {
            let mut data = self.data.write();
            if data.source.as_ref() != Some(for_source) {
                debug!(target: "mircs::state", ?for_source, "Ignoring related records for inactive view");
                return false;
            }
            data.related = related;
        }
        self.subscribers.notify(&ViewChange::Related);
        true
    }

    /// Show nothing
    pub fn clear(&self) {
        *self.data.write() = ViewData::default();
        self.subscribers.notify(&ViewChange::Records);
    }
}

impl std::fmt::Debug for ViewStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = self.data.read();
        f.debug_struct("ViewStore")
            .field("source", &data.source)
            .field("records", &data.records.len())
            .field("related", &data.related.len())
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

    fn dataset(id: &str) -> ViewSource {
        ViewSource::DataSet(DataSetId::new(id))
    }

    fn related(id: &str) -> RelatedRecords {
        RelatedRecords {
            data_set_id: DataSetId::new(id),
            join_elements: vec![JoinElement::new("_id", "code")],
            records: vec![rec(json!({"code": "1"}))],
        }
    }

    #[test]
    fn test_switching_source_drops_related() {
        let view = ViewStore::new();
        view.set_records(dataset("a"), vec![rec(json!({"_id": "1"}))]);
        assert!(view.set_related(&dataset("a"), vec![related("b")]));
        view.set_records(dataset("a"), vec![]);
        assert_eq!(view.snapshot().related.len(), 1);
        view.set_records(dataset("c"), vec![]);
        assert!(view.snapshot().related.is_empty());
    }

    #[test]
    fn test_related_for_inactive_source_is_ignored() {
        let view = ViewStore::new();
        view.set_records(dataset("a"), vec![]);
        assert!(!view.set_related(&dataset("z"), vec![related("b")]));
        assert!(view.snapshot().related.is_empty());
    }

    #[test]
    fn test_changes_are_announced() {
        let view = ViewStore::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let _sub = {
            let seen = Arc::clone(&seen);
            view.subscribe(move |c| seen.lock().push(*c))
        };
        view.set_records(dataset("a"), vec![]);
        view.set_related(&dataset("a"), vec![]);
        view.clear();
        assert_eq!(
            *seen.lock(),
            vec![ViewChange::Records, ViewChange::Related, ViewChange::Records]
        );
        assert_eq!(view.source(), None);
    }

    #[test]
    fn test_source_serializes_tagged() {
        assert_eq!(
            serde_json::to_value(dataset("a")).unwrap(),
            json!({"kind": "data_set", "id": "a"})
        );
    }
}
