//! HTTP backend for the persistence API
//!
//! A blocking `ureq` agent with a global timeout. Non-success statuses are
//! read rather than raised by the agent so the server's message survives
//! into [`ApiError::Status`]. The bearer token from a successful sign-in is
//! attached to every later request.

use std::time::Duration;

use mircs_core::{
    DataSet, DataSetDraft, DataSetId, Record, Relationship, RelationshipDraft, RelationshipId,
};
use parking_lot::RwLock;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::api::{decode_list, decode_records, PersistenceApi, JOIN_FIELD, LIST_FIELD};
use crate::auth::{rejection, validate_credentials, AuthSession};
use crate::error::{ApiError, Result};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy)]
enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// Persistence API over HTTP
pub struct HttpApi {
    base_url: String,
    agent: ureq::Agent,
    token: RwLock<Option<String>>,
}

impl std::fmt::Debug for HttpApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpApi")
            .field("base_url", &self.base_url)
            .field("signed_in", &self.token.read().is_some())
            .finish()
    }
}

impl HttpApi {
    /// Client for the server at `base_url` (e.g. `http://localhost:3001`)
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        HttpApi {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            agent: ureq::Agent::new_with_config(config),
            token: RwLock::new(None),
        }
    }

    /// Start with an existing bearer token
    pub fn with_token(self, token: Option<String>) -> Self {
        self.set_token(token);
        self
    }

    /// Replace the bearer token
    pub fn set_token(&self, token: Option<String>) {
        *self.token.write() = token.filter(|t| !t.is_empty());
    }

    /// Current bearer token
    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    /// Server base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let url = self.url(path);
        debug!(target: "mircs::api", method = method.as_str(), %url, "Request");

        let auth = self.token.read().as_ref().map(|t| format!("Bearer {}", t));
        let sent = match method {
            Method::Get | Method::Delete => {
                let mut request = match method {
                    Method::Get => self.agent.get(&url),
                    _ => self.agent.delete(&url),
                };
                if let Some(auth) = &auth {
                    request = request.header("Authorization", auth);
                }
                request.call()
            }
            Method::Post | Method::Put => {
                let bytes = match body {
                    Some(b) => serde_json::to_vec(b).map_err(|e| {
                        ApiError::Parse(format!("failed to serialize request: {}", e))
                    })?,
                    None => b"{}".to_vec(),
                };
                let mut request = match method {
                    Method::Post => self.agent.post(&url),
                    _ => self.agent.put(&url),
                };
                request = request.header("Content-Type", "application/json");
                if let Some(auth) = &auth {
                    request = request.header("Authorization", auth);
                }
                request.send(&bytes[..])
            }
        };

        let mut response = sent.map_err(|e| ApiError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ApiError::Network(format!("failed to read response: {}", e)))?;

        if !(200..300).contains(&status) {
            return Err(ApiError::Status {
                code: status,
                message: error_message(&text),
            });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| ApiError::Parse(format!("invalid JSON response: {}", e)))
    }
}

/// Pull a readable message out of an error body.
///
/// Servers answer `{error}` or `{message}`; anything else is shown raw.
fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["message", "error"] {
            if let Some(msg) = value.get(key).and_then(Value::as_str) {
                return msg.to_string();
            }
        }
    }
    body.chars().take(200).collect()
}

fn entity_or<T: serde::de::DeserializeOwned>(body: Value, fallback: impl FnOnce() -> T) -> T {
    serde_json::from_value(body).unwrap_or_else(|_| fallback())
}

impl PersistenceApi for HttpApi {
    fn list_data_sets(&self) -> Result<Vec<DataSet>> {
        let body = self.request(Method::Get, "/api/datasets", None)?;
        Ok(decode_list(&body, LIST_FIELD))
    }

    fn data_set_records(&self, id: &DataSetId) -> Result<Vec<Record>> {
        let body = self.request(Method::Get, &format!("/api/datasets/{}/records", id), None)?;
        Ok(decode_records(&body, LIST_FIELD))
    }

    fn list_relationships(&self) -> Result<Vec<Relationship>> {
        let body = self.request(Method::Get, "/api/relationships", None)?;
        Ok(decode_list(&body, LIST_FIELD))
    }

    fn relationship_join(&self, id: &RelationshipId) -> Result<Vec<Record>> {
        let body = self.request(
            Method::Get,
            &format!("/api/relationships/{}/join", id),
            None,
        )?;
        Ok(decode_records(&body, JOIN_FIELD))
    }

    fn create_data_set(&self, draft: &DataSetDraft) -> Result<DataSet> {
        let body = self.request(Method::Post, "/api/datasets", Some(&json!(draft)))?;
        Ok(serde_json::from_value(body)?)
    }

    fn update_data_set(&self, id: &DataSetId, draft: &DataSetDraft) -> Result<DataSet> {
        let body = self.request(
            Method::Put,
            &format!("/api/datasets/{}", id),
            Some(&json!(draft)),
        )?;
        Ok(entity_or(body, || DataSet {
            id: id.clone(),
            name: draft.name.clone(),
            description: draft.description.clone(),
            collection_name: None,
            stats: None,
        }))
    }

    fn delete_data_set(&self, id: &DataSetId) -> Result<()> {
        self.request(Method::Delete, &format!("/api/datasets/{}", id), None)?;
        Ok(())
    }

    fn create_relationship(&self, draft: &RelationshipDraft) -> Result<Relationship> {
        let body = self.request(Method::Post, "/api/relationships", Some(&json!(draft)))?;
        Ok(serde_json::from_value(body)?)
    }

    fn update_relationship(
        &self,
        id: &RelationshipId,
        draft: &RelationshipDraft,
    ) -> Result<Relationship> {
        let body = self.request(
            Method::Put,
            &format!("/api/relationships/{}", id),
            Some(&json!(draft)),
        )?;
        Ok(entity_or(body, || Relationship {
            id: id.clone(),
            name: draft.name.clone(),
            description: draft.description.clone(),
            data_sets: draft.data_sets.clone(),
            join_elements: draft.join_elements.clone(),
        }))
    }

    fn delete_relationship(&self, id: &RelationshipId) -> Result<()> {
        self.request(Method::Delete, &format!("/api/relationships/{}", id), None)?;
        Ok(())
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        validate_credentials(email, password)?;
        let body = json!({ "email": email, "password": password });
        let response = self
            .request(Method::Post, "/auth/verify-password", Some(&body))
            .map_err(|e| match e {
                ApiError::Status { code: 401, message } => rejection(email, &message),
                other => other,
            })?;
        let session: AuthSession = serde_json::from_value(response)?;
        self.set_token(Some(session.id_token.clone()));
        info!(target: "mircs::api", email, "Signed in");
        Ok(session)
    }
}
