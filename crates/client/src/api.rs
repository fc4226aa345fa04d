//! The persistence API contract
//!
//! Routes consumed by the explorer:
//! - `GET /api/datasets` returns `{list: DataSet[]}`
//! - `GET /api/datasets/:id/records` returns `{list: Record[]}`
//! - `GET /api/relationships` returns `{list: Relationship[]}`
//! - `GET /api/relationships/:id/join` returns `{records: JoinedRecord[]}`
//! - `POST`/`PUT`/`DELETE` on datasets and relationships
//! - `POST /auth/verify-password`
//!
//! A body missing its list field decodes to an empty list. Entries that do
//! not decode are skipped with a warning.

use mircs_core::{
    DataSet, DataSetDraft, DataSetId, Record, Relationship, RelationshipDraft, RelationshipId,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::auth::AuthSession;
use crate::error::Result;

/// List field of dataset, record and relationship responses
pub const LIST_FIELD: &str = "list";
/// List field of join responses
pub const JOIN_FIELD: &str = "records";

/// Operations the explorer needs from the persistence server.
///
/// Implementations are shared with cache worker threads.
pub trait PersistenceApi: Send + Sync {
    /// All datasets
    fn list_data_sets(&self) -> Result<Vec<DataSet>>;

    /// Records of one dataset
    fn data_set_records(&self, id: &DataSetId) -> Result<Vec<Record>>;

    /// All relationships
    fn list_relationships(&self) -> Result<Vec<Relationship>>;

    /// Server-side join of a relationship
    fn relationship_join(&self, id: &RelationshipId) -> Result<Vec<Record>>;

    /// Create a dataset
    fn create_data_set(&self, draft: &DataSetDraft) -> Result<DataSet>;

    /// Replace a dataset's editable fields
    fn update_data_set(&self, id: &DataSetId, draft: &DataSetDraft) -> Result<DataSet>;

    /// Delete a dataset and its record collection
    fn delete_data_set(&self, id: &DataSetId) -> Result<()>;

    /// Create a relationship
    fn create_relationship(&self, draft: &RelationshipDraft) -> Result<Relationship>;

    /// Replace a relationship's editable fields
    fn update_relationship(
        &self,
        id: &RelationshipId,
        draft: &RelationshipDraft,
    ) -> Result<Relationship>;

    /// Delete a relationship
    fn delete_relationship(&self, id: &RelationshipId) -> Result<()>;

    /// Exchange credentials for a bearer token; later calls carry it
    fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession>;
}

// ============================================================================
// Response decoding
// ============================================================================

/// Decode `body[field]` as a list of `T`.
pub fn decode_list<T: DeserializeOwned>(body: &Value, field: &str) -> Vec<T> {
    let Some(items) = list_items(body, field) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match serde_json::from_value(item.clone()) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(target: "mircs::api", field, error = %e, "Skipping malformed entry");
                None
            }
        })
        .collect()
}

/// Decode `body[field]` as a list of records.
pub fn decode_records(body: &Value, field: &str) -> Vec<Record> {
    let Some(items) = list_items(body, field) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match Record::from_json(item.clone()) {
            Ok(r) => Some(r),
            Err(e) => {
                warn!(target: "mircs::api", field, error = %e, "Skipping malformed record");
                None
            }
        })
        .collect()
}

fn list_items<'a>(body: &'a Value, field: &str) -> Option<&'a Vec<Value>> {
    let items = body.get(field).and_then(Value::as_array);
    if items.is_none() {
        warn!(target: "mircs::api", field, "Response is missing its list field");
    }
    items
}
