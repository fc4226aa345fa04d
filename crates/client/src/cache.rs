//! Client-side data cache with request sequencing
//!
//! The cache holds the dataset list, the relationship list, record lists
//! per dataset and join results per relationship. Fetches run on worker
//! threads and report back through a channel; the owning thread applies
//! them in [`DataCache::pump`].
//!
//! ## Latest request wins
//!
//! Every fetch slot has its own ticket counter. Issuing a request for a
//! slot makes all earlier tickets for that slot stale, and a response is
//! applied only if it carries the latest ticket. A slow response for a
//! dataset the user has already navigated away from (or re-requested) is
//! discarded instead of overwriting newer data.
//!
//! Failed fetches notify through the [`Notifier`] and leave cached state
//! untouched. Nothing is retried.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

use mircs_core::{
    DataSet, DataSetDraft, DataSetId, Record, Relationship, RelationshipDraft, RelationshipId,
};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::api::PersistenceApi;
use crate::auth::AuthSession;
use crate::error::{ApiError, Result};
use crate::notify::Notifier;

/// Sequence number of one request
pub type Ticket = u64;

/// A cache entry that can be fetched
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Slot {
    /// The dataset list
    DataSets,
    /// The relationship list
    Relationships,
    /// Records of one dataset
    Records(DataSetId),
    /// Join result of one relationship
    Join(RelationshipId),
}

/// How fetches are executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// One worker thread per request
    #[default]
    Threaded,
    /// Run the call before `request` returns; delivery still waits for `pump`
    Inline,
}

/// What `pump` did with one response
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The slot now holds `len` entries
    Updated {
        /// Entries stored
        len: usize,
    },
    /// A newer request was issued; the response was dropped
    Stale,
    /// The fetch failed; the slot is unchanged
    Failed(ApiError),
}

/// One delivered response
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEvent {
    /// Slot the response was for
    pub slot: Slot,
    /// Ticket it carried
    pub ticket: Ticket,
    /// What happened to it
    pub outcome: Outcome,
}

impl CacheEvent {
    /// Whether the cache changed
    pub fn is_update(&self) -> bool {
        matches!(self.outcome, Outcome::Updated { .. })
    }
}

enum Payload {
    DataSets(Vec<DataSet>),
    Relationships(Vec<Relationship>),
    Records(Vec<Record>),
}

impl Payload {
    fn len(&self) -> usize {
        match self {
            Payload::DataSets(v) => v.len(),
            Payload::Relationships(v) => v.len(),
            Payload::Records(v) => v.len(),
        }
    }
}

struct Response {
    slot: Slot,
    ticket: Ticket,
    result: Result<Payload>,
}

fn fetch(api: &dyn PersistenceApi, slot: &Slot) -> Result<Payload> {
    match slot {
        Slot::DataSets => api.list_data_sets().map(Payload::DataSets),
        Slot::Relationships => api.list_relationships().map(Payload::Relationships),
        Slot::Records(id) => api.data_set_records(id).map(Payload::Records),
        Slot::Join(id) => api.relationship_join(id).map(Payload::Records),
    }
}

/// Cached persistence data owned by a single thread
pub struct DataCache {
    api: Arc<dyn PersistenceApi>,
    notifier: Arc<dyn Notifier>,
    mode: FetchMode,

    next_ticket: Ticket,
    latest: FxHashMap<Slot, Ticket>,
    in_flight: usize,
    tx: Sender<Response>,
    rx: Receiver<Response>,

    data_sets: Vec<DataSet>,
    relationships: Vec<Relationship>,
    records: FxHashMap<DataSetId, Vec<Record>>,
    joins: FxHashMap<RelationshipId, Vec<Record>>,
}

impl std::fmt::Debug for DataCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataCache")
            .field("mode", &self.mode)
            .field("in_flight", &self.in_flight)
            .field("data_sets", &self.data_sets.len())
            .field("relationships", &self.relationships.len())
            .field("records", &self.records.len())
            .field("joins", &self.joins.len())
            .finish()
    }
}

impl DataCache {
    /// Empty cache over `api`
    pub fn new(api: Arc<dyn PersistenceApi>, notifier: Arc<dyn Notifier>) -> Self {
        let (tx, rx) = channel();
        DataCache {
            api,
            notifier,
            mode: FetchMode::default(),
            next_ticket: 0,
            latest: FxHashMap::default(),
            in_flight: 0,
            tx,
            rx,
            data_sets: Vec::new(),
            relationships: Vec::new(),
            records: FxHashMap::default(),
            joins: FxHashMap::default(),
        }
    }

    /// Choose how fetches run
    pub fn with_mode(mut self, mode: FetchMode) -> Self {
        self.mode = mode;
        self
    }

    /// The backing API
    pub fn api(&self) -> &Arc<dyn PersistenceApi> {
        &self.api
    }

    // ========================================================================
    // Cached data
    // ========================================================================

    /// Cached dataset list
    pub fn data_sets(&self) -> &[DataSet] {
        &self.data_sets
    }

    /// Cached relationship list
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Cached records of a dataset
    pub fn records(&self, id: &DataSetId) -> Option<&[Record]> {
        self.records.get(id).map(Vec::as_slice)
    }

    /// Cached join result of a relationship
    pub fn join(&self, id: &RelationshipId) -> Option<&[Record]> {
        self.joins.get(id).map(Vec::as_slice)
    }

    /// Look up a cached dataset
    pub fn data_set(&self, id: &DataSetId) -> Option<&DataSet> {
        self.data_sets.iter().find(|d| &d.id == id)
    }

    /// Look up a cached relationship
    pub fn relationship(&self, id: &RelationshipId) -> Option<&Relationship> {
        self.relationships.iter().find(|r| &r.id == id)
    }

    /// Requests issued but not yet delivered
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Latest ticket issued for `slot`
    pub fn latest_ticket(&self, slot: &Slot) -> Option<Ticket> {
        self.latest.get(slot).copied()
    }

    // ========================================================================
    // Fetching
    // ========================================================================

    /// Issue a fetch for `slot`, superseding any outstanding one.
    pub fn request(&mut self, slot: Slot) -> Ticket {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.latest.insert(slot.clone(), ticket);
        self.in_flight += 1;
        debug!(target: "mircs::api", ?slot, ticket, "Fetch issued");

        match self.mode {
            FetchMode::Inline => {
                let result = fetch(self.api.as_ref(), &slot);
                let _ = self.tx.send(Response {
                    slot,
                    ticket,
                    result,
                });
            }
            FetchMode::Threaded => {
                let api = Arc::clone(&self.api);
                let tx = self.tx.clone();
                let worker_slot = slot.clone();
                let spawned = std::thread::Builder::new()
                    .name(format!("mircs-fetch-{}", ticket))
                    .spawn(move || {
                        let result = fetch(api.as_ref(), &worker_slot);
                        let _ = tx.send(Response {
                            slot: worker_slot,
                            ticket,
                            result,
                        });
                    });
                if let Err(e) = spawned {
                    warn!(target: "mircs::api", error = %e, "Fetch worker unavailable, fetching inline");
                    let result = fetch(self.api.as_ref(), &slot);
                    let _ = self.tx.send(Response {
                        slot,
                        ticket,
                        result,
                    });
                }
            }
        }
        ticket
    }

    /// Fetch the dataset list
    pub fn request_data_sets(&mut self) -> Ticket {
        self.request(Slot::DataSets)
    }

    /// Fetch the relationship list
    pub fn request_relationships(&mut self) -> Ticket {
        self.request(Slot::Relationships)
    }

    /// Fetch the records of a dataset
    pub fn request_records(&mut self, id: &DataSetId) -> Ticket {
        self.request(Slot::Records(id.clone()))
    }

    /// Fetch the join result of a relationship
    pub fn request_join(&mut self, id: &RelationshipId) -> Ticket {
        self.request(Slot::Join(id.clone()))
    }

    /// Make every outstanding request stale.
    ///
    /// Responses still arrive but are dropped by `pump`.
    pub fn discard_pending(&mut self) {
        self.latest.clear();
    }

    /// Apply every response that has already arrived.
    pub fn pump(&mut self) -> Vec<CacheEvent> {
        let mut events = Vec::new();
        while let Ok(response) = self.rx.try_recv() {
            events.push(self.apply(response));
        }
        events
    }

    /// Wait for every outstanding request, applying responses as they
    /// arrive. Gives up after `timeout` without a response.
    pub fn settle(&mut self, timeout: Duration) -> Vec<CacheEvent> {
        let mut events = self.pump();
        while self.in_flight > 0 {
            match self.rx.recv_timeout(timeout) {
                Ok(response) => events.push(self.apply(response)),
                Err(_) => {
                    warn!(target: "mircs::api", in_flight = self.in_flight, "Gave up waiting for responses");
                    break;
                }
            }
        }
        events
    }

    fn apply(&mut self, response: Response) -> CacheEvent {
        self.in_flight = self.in_flight.saturating_sub(1);
        let Response {
            slot,
            ticket,
            result,
        } = response;

        if self.latest.get(&slot) != Some(&ticket) {
            debug!(target: "mircs::api", ?slot, ticket, "Dropping stale response");
            return CacheEvent {
                slot,
                ticket,
                outcome: Outcome::Stale,
            };
        }

        let outcome = match result {
            Ok(payload) => {
                let len = payload.len();
                match (&slot, payload) {
                    (Slot::DataSets, Payload::DataSets(v)) => self.data_sets = v,
                    (Slot::Relationships, Payload::Relationships(v)) => self.relationships = v,
                    (Slot::Records(id), Payload::Records(v)) => {
                        self.records.insert(id.clone(), v);
                    }
                    (Slot::Join(id), Payload::Records(v)) => {
                        self.joins.insert(id.clone(), v);
                    }
                    _ => {}
                }
                debug!(target: "mircs::api", ?slot, ticket, records = len, "Applied response");
                Outcome::Updated { len }
            }
            Err(e) => {
                self.notifier.notify(&e.user_notice());
                Outcome::Failed(e)
            }
        };
        CacheEvent {
            slot,
            ticket,
            outcome,
        }
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    fn report<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.notifier.notify(&e.user_notice());
        }
        result
    }

    /// Create a dataset and add it to the cached list
    pub fn create_data_set(&mut self, draft: &DataSetDraft) -> Result<DataSet> {
        let created = self.report(self.api.create_data_set(draft))?;
        self.data_sets.push(created.clone());
        Ok(created)
    }

    /// Update a dataset and the cached copy
    pub fn update_data_set(&mut self, id: &DataSetId, draft: &DataSetDraft) -> Result<DataSet> {
        let updated = self.report(self.api.update_data_set(id, draft))?;
        match self.data_sets.iter_mut().find(|d| &d.id == id) {
            Some(slot) => *slot = updated.clone(),
            None => self.data_sets.push(updated.clone()),
        }
        Ok(updated)
    }

    /// Delete a dataset, dropping its cached records too
    pub fn delete_data_set(&mut self, id: &DataSetId) -> Result<()> {
        self.report(self.api.delete_data_set(id))?;
        self.data_sets.retain(|d| &d.id != id);
        self.records.remove(id);
        self.latest.remove(&Slot::Records(id.clone()));
        Ok(())
    }

    /// Create a relationship and add it to the cached list
    pub fn create_relationship(&mut self, draft: &RelationshipDraft) -> Result<Relationship> {
        let created = self.report(self.api.create_relationship(draft))?;
        self.relationships.push(created.clone());
        Ok(created)
    }

    /// Update a relationship; its cached join is dropped
    pub fn update_relationship(
        &mut self,
        id: &RelationshipId,
        draft: &RelationshipDraft,
    ) -> Result<Relationship> {
        let updated = self.report(self.api.update_relationship(id, draft))?;
        match self.relationships.iter_mut().find(|r| &r.id == id) {
            Some(slot) => *slot = updated.clone(),
            None => self.relationships.push(updated.clone()),
        }
        self.joins.remove(id);
        Ok(updated)
    }

    /// Delete a relationship and its cached join
    pub fn delete_relationship(&mut self, id: &RelationshipId) -> Result<()> {
        self.report(self.api.delete_relationship(id))?;
        self.relationships.retain(|r| &r.id != id);
        self.joins.remove(id);
        self.latest.remove(&Slot::Join(id.clone()));
        Ok(())
    }

    /// Sign in; a failure shows the generic notice
    pub fn sign_in(&mut self, email: &str, password: &str) -> Result<AuthSession> {
        self.report(self.api.sign_in(email, password))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryApi;
    use crate::notify::RecordingNotifier;
    use serde_json::json;

    fn cache() -> (DataCache, Arc<InMemoryApi>, RecordingNotifier) {
        let api = Arc::new(
            InMemoryApi::from_json(
                &json!({
                    "dataSets": [{"_id": "a", "name": "A"}],
                    "records": {"a": [{"_id": 1}, {"_id": 2}]}
                })
                .to_string(),
            )
            .unwrap(),
        );
        let notifier = RecordingNotifier::new();
        let cache = DataCache::new(api.clone(), Arc::new(notifier.clone()))
            .with_mode(FetchMode::Inline);
        (cache, api, notifier)
    }

    #[test]
    fn test_nothing_applies_before_pump() {
        let (mut cache, _, _) = cache();
        cache.request_data_sets();
        assert!(cache.data_sets().is_empty());
        assert_eq!(cache.in_flight(), 1);
        let events = cache.pump();
        assert_eq!(events.len(), 1);
        assert!(events[0].is_update());
        assert_eq!(cache.data_sets().len(), 1);
        assert_eq!(cache.in_flight(), 0);
    }

    #[test]
    fn test_superseded_response_is_stale() {
        let (mut cache, _, _) = cache();
        let first = cache.request_records(&"a".into());
        let second = cache.request_records(&"a".into());
        assert!(second > first);
        let events = cache.pump();
        assert_eq!(events[0].outcome, Outcome::Stale);
        assert_eq!(events[1].outcome, Outcome::Updated { len: 2 });
    }

    #[test]
    fn test_discard_pending_drops_everything_outstanding() {
        let (mut cache, _, _) = cache();
        cache.request_records(&"a".into());
        cache.discard_pending();
        let events = cache.pump();
        assert_eq!(events[0].outcome, Outcome::Stale);
        assert!(cache.records(&"a".into()).is_none());
    }

    #[test]
    fn test_failure_notifies_and_keeps_state() {
        let (mut cache, api, notifier) = cache();
        cache.request_data_sets();
        cache.pump();
        api.fail_with(Some(ApiError::Network("down".to_string())));
        cache.request_data_sets();
        let events = cache.pump();
        assert!(matches!(events[0].outcome, Outcome::Failed(_)));
        assert_eq!(cache.data_sets().len(), 1);
        assert_eq!(notifier.messages(), vec!["network error: down"]);
    }

    #[test]
    fn test_threaded_fetches_settle() {
        let (cache, _, _) = cache();
        let mut cache = cache.with_mode(FetchMode::Threaded);
        cache.request_data_sets();
        cache.request_records(&"a".into());
        let events = cache.settle(Duration::from_secs(5));
        assert_eq!(events.len(), 2);
        assert_eq!(cache.records(&"a".into()).map(<[Record]>::len), Some(2));
    }

    #[test]
    fn test_delete_drops_cached_records() {
        let (mut cache, _, _) = cache();
        cache.request_data_sets();
        cache.request_records(&"a".into());
        cache.pump();
        cache.delete_data_set(&"a".into()).unwrap();
        assert!(cache.data_sets().is_empty());
        assert!(cache.records(&"a".into()).is_none());
    }

    #[test]
    fn test_failed_sign_in_shows_generic_notice() {
        let (mut cache, _, notifier) = cache();
        assert!(cache.sign_in("x@y.z", "pw").is_err());
        assert_eq!(notifier.messages(), vec!["Sign in failed"]);
    }
}
