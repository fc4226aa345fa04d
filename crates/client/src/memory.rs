//! In-process persistence backend
//!
//! Serves a JSON fixture of the form
//! `{dataSets: [...], relationships: [...], records: {<dataSetId>: [...]}}`
//! with the same semantics as the server: joins are computed from the
//! stored records and deleting a dataset drops its records.
//!
//! Used as the offline backend of the CLI and as a test double.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use mircs_core::{
    DataSet, DataSetDraft, DataSetId, JoinedRecord, Record, Relationship, RelationshipDraft,
    RelationshipId, Side,
};
use mircs_engine::join_key;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::PersistenceApi;
use crate::auth::{validate_credentials, AuthSession, Credentials, TOKEN_LIFETIME_MS};
use crate::error::{ApiError, Result};

/// Contents of a fixture file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    /// Datasets
    #[serde(rename = "dataSets", default)]
    pub data_sets: Vec<DataSet>,
    /// Relationships
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    /// Records keyed by dataset id
    #[serde(default)]
    pub records: BTreeMap<String, Vec<Record>>,
    /// Accounts accepted by `sign_in`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<Credentials>,
}

/// [`PersistenceApi`] backed by an in-memory [`Fixture`]
#[derive(Debug, Default)]
pub struct InMemoryApi {
    fixture: RwLock<Fixture>,
    next_id: AtomicU64,
    fail_with: RwLock<Option<ApiError>>,
}

impl InMemoryApi {
    /// Serve `fixture`
    pub fn new(fixture: Fixture) -> Self {
        InMemoryApi {
            fixture: RwLock::new(fixture),
            next_id: AtomicU64::new(1),
            fail_with: RwLock::new(None),
        }
    }

    /// Parse a fixture from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        let fixture: Fixture = serde_json::from_str(text)
            .map_err(|e| ApiError::Parse(format!("invalid fixture: {}", e)))?;
        Ok(Self::new(fixture))
    }

    /// Load a fixture file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ApiError::Parse(format!("failed to read fixture {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> Fixture {
        self.fixture.read().clone()
    }

    /// Make every call fail with `error` until cleared with `None`
    pub fn fail_with(&self, error: Option<ApiError>) {
        *self.fail_with.write() = error;
    }

    fn check(&self) -> Result<()> {
        match &*self.fail_with.read() {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn fresh_id(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

fn not_found(kind: &'static str, id: &impl ToString) -> ApiError {
    ApiError::NotFound {
        kind,
        id: id.to_string(),
    }
}

/// Inner join of two record lists: one composite per left record with at
/// least one match, right matches in their original order.
fn join_records(
    left: &[Record],
    right: &[Record],
    relationship: &Relationship,
) -> Vec<Record> {
    let elements = &relationship.join_elements;
    let right_keys: Vec<Option<String>> = right
        .iter()
        .map(|r| join_key(r, elements, Side::Right))
        .collect();

    left.iter()
        .filter_map(|l| {
            let key = join_key(l, elements, Side::Left)?;
            let matches: Vec<Record> = right
                .iter()
                .zip(&right_keys)
                .filter(|(_, k)| k.as_deref() == Some(key.as_str()))
                .map(|(r, _)| r.clone())
                .collect();
            if matches.is_empty() {
                return None;
            }
            Some(Record::Joined(JoinedRecord {
                left: vec![l.clone()],
                right: matches,
            }))
        })
        .collect()
}

impl PersistenceApi for InMemoryApi {
    fn list_data_sets(&self) -> Result<Vec<DataSet>> {
        self.check()?;
        Ok(self.fixture.read().data_sets.clone())
    }

    fn data_set_records(&self, id: &DataSetId) -> Result<Vec<Record>> {
        self.check()?;
        let fixture = self.fixture.read();
        if !fixture.data_sets.iter().any(|d| &d.id == id) {
            return Err(not_found("dataset", id));
        }
        Ok(fixture.records.get(id.as_str()).cloned().unwrap_or_default())
    }

    fn list_relationships(&self) -> Result<Vec<Relationship>> {
        self.check()?;
        Ok(self.fixture.read().relationships.clone())
    }

    fn relationship_join(&self, id: &RelationshipId) -> Result<Vec<Record>> {
        self.check()?;
        let fixture = self.fixture.read();
        let relationship = fixture
            .relationships
            .iter()
            .find(|r| &r.id == id)
            .ok_or_else(|| not_found("relationship", id))?;
        let Some((left, right)) = relationship.pair() else {
            return Ok(Vec::new());
        };
        let empty = Vec::new();
        let left = fixture.records.get(left.as_str()).unwrap_or(&empty);
        let right = fixture.records.get(right.as_str()).unwrap_or(&empty);
        let joined = join_records(left, right, relationship);
        debug!(target: "mircs::api", relationship = %id, records = joined.len(), "Joined in memory");
        Ok(joined)
    }

    fn create_data_set(&self, draft: &DataSetDraft) -> Result<DataSet> {
        self.check()?;
        let id = self.fresh_id("ds");
        let data_set = DataSet {
            id: DataSetId::new(id.clone()),
            name: draft.name.clone(),
            description: draft.description.clone(),
            collection_name: Some(format!("dataset_{}", id)),
            stats: None,
        };
        let mut fixture = self.fixture.write();
        fixture.data_sets.push(data_set.clone());
        fixture.records.insert(id, Vec::new());
        Ok(data_set)
    }

    fn update_data_set(&self, id: &DataSetId, draft: &DataSetDraft) -> Result<DataSet> {
        self.check()?;
        let mut fixture = self.fixture.write();
        let data_set = fixture
            .data_sets
            .iter_mut()
            .find(|d| &d.id == id)
            .ok_or_else(|| not_found("dataset", id))?;
        data_set.name = draft.name.clone();
        data_set.description = draft.description.clone();
        Ok(data_set.clone())
    }

    fn delete_data_set(&self, id: &DataSetId) -> Result<()> {
        self.check()?;
        let mut fixture = self.fixture.write();
        let before = fixture.data_sets.len();
        fixture.data_sets.retain(|d| &d.id != id);
        if fixture.data_sets.len() == before {
            return Err(not_found("dataset", id));
        }
        fixture.records.remove(id.as_str());
        Ok(())
    }

    fn create_relationship(&self, draft: &RelationshipDraft) -> Result<Relationship> {
        self.check()?;
        let relationship = Relationship {
            id: RelationshipId::new(self.fresh_id("rel")),
            name: draft.name.clone(),
            description: draft.description.clone(),
            data_sets: draft.data_sets.clone(),
            join_elements: draft.join_elements.clone(),
        };
        self.fixture.write().relationships.push(relationship.clone());
        Ok(relationship)
    }

    fn update_relationship(
        &self,
        id: &RelationshipId,
        draft: &RelationshipDraft,
    ) -> Result<Relationship> {
        self.check()?;
        let mut fixture = self.fixture.write();
        let relationship = fixture
            .relationships
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| not_found("relationship", id))?;
        relationship.name = draft.name.clone();
        relationship.description = draft.description.clone();
        relationship.data_sets = draft.data_sets.clone();
        relationship.join_elements = draft.join_elements.clone();
        Ok(relationship.clone())
    }

    fn delete_relationship(&self, id: &RelationshipId) -> Result<()> {
        self.check()?;
        let mut fixture = self.fixture.write();
        let before = fixture.relationships.len();
        fixture.relationships.retain(|r| &r.id != id);
        if fixture.relationships.len() == before {
            return Err(not_found("relationship", id));
        }
        Ok(())
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        self.check()?;
        validate_credentials(email, password)?;
        let fixture = self.fixture.read();
        let user = fixture
            .users
            .iter()
            .find(|u| u.email == email)
            .ok_or_else(|| ApiError::UnknownEmail {
                email: email.to_string(),
            })?;
        if user.password != password {
            return Err(ApiError::WrongPassword);
        }
        Ok(AuthSession {
            created_at: None,
            user_id: None,
            email: email.to_string(),
            id_token: self.fresh_id("offline-token-"),
            expires_in_ms: TOKEN_LIFETIME_MS,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mircs_core::{JoinElement, RecordId};
    use serde_json::json;

    fn api() -> InMemoryApi {
        InMemoryApi::from_json(
            &json!({
                "dataSets": [{"_id": "a", "name": "A"}, {"_id": "b", "name": "B"}],
                "relationships": [{
                    "_id": "r", "name": "A-B",
                    "dataSets": ["a", "b"],
                    "joinElements": [["_id", "code"]]
                }],
                "records": {
                    "a": [{"_id": 1, "Name": "Foo"}, {"_id": 5, "Name": "Bar"}],
                    "b": [{"_id": 2, "code": 1}, {"_id": 3, "code": 1}, {"_id": 4, "code": 9}]
                },
                "users": [{"email": "a@b.c", "password": "pw"}]
            })
            .to_string(),
        )
        .unwrap()
    }

    #[test]
    fn test_join_groups_matches_per_left_record() {
        let joined = api().relationship_join(&"r".into()).unwrap();
        assert_eq!(joined.len(), 1);
        let Record::Joined(j) = &joined[0] else {
            panic!("expected joined record");
        };
        assert_eq!(j.left.len(), 1);
        let ids: Vec<_> = j.right.iter().filter_map(|r| r.id()).collect();
        assert_eq!(ids, vec![RecordId::new("2"), RecordId::new("3")]);
    }

    #[test]
    fn test_unknown_ids_are_not_found() {
        let api = api();
        assert!(matches!(
            api.data_set_records(&"zzz".into()),
            Err(ApiError::NotFound { kind: "dataset", .. })
        ));
        assert!(matches!(
            api.relationship_join(&"zzz".into()),
            Err(ApiError::NotFound { kind: "relationship", .. })
        ));
    }

    #[test]
    fn test_delete_data_set_drops_records() {
        let api = api();
        api.delete_data_set(&"a".into()).unwrap();
        assert!(!api.snapshot().records.contains_key("a"));
        assert!(api.data_set_records(&"a".into()).is_err());
    }

    #[test]
    fn test_create_and_update() {
        let api = api();
        let created = api
            .create_data_set(&DataSetDraft {
                name: "C".to_string(),
                description: String::new(),
            })
            .unwrap();
        assert!(api.data_set_records(&created.id).unwrap().is_empty());

        let rel = api
            .create_relationship(&RelationshipDraft {
                name: "A-C".to_string(),
                description: String::new(),
                data_sets: vec!["a".into(), created.id.clone()],
                join_elements: vec![JoinElement::new("Name", "Name")],
            })
            .unwrap();
        assert_ne!(rel.id.as_str(), "r");
        assert_eq!(api.list_relationships().unwrap().len(), 2);

        let renamed = api
            .update_data_set(
                &created.id,
                &DataSetDraft {
                    name: "C2".to_string(),
                    description: "x".to_string(),
                },
            )
            .unwrap();
        assert_eq!(renamed.name, "C2");
    }

    #[test]
    fn test_sign_in_distinguishes_failures() {
        let api = api();
        assert!(api.sign_in("a@b.c", "pw").is_ok());
        assert_eq!(api.sign_in("a@b.c", "nope"), Err(ApiError::WrongPassword));
        assert!(matches!(
            api.sign_in("x@y.z", "pw"),
            Err(ApiError::UnknownEmail { .. })
        ));
    }

    #[test]
    fn test_injected_failure() {
        let api = api();
        api.fail_with(Some(ApiError::Network("down".to_string())));
        assert!(api.list_data_sets().is_err());
        api.fail_with(None);
        assert_eq!(api.list_data_sets().unwrap().len(), 2);
    }
}
