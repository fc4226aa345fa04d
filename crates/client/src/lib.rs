//! Persistence client for MIRCS
//!
//! This crate talks to the dataset server and caches what it returns:
//! - api: the `PersistenceApi` trait and response decoding
//! - http: `HttpApi`, the `ureq` backend with bearer auth
//! - memory: `InMemoryApi`, a fixture-backed backend for offline use and tests
//! - auth: sign-in sessions and rejection mapping
//! - cache: `DataCache`, request-sequenced cached lists
//! - notify: transient user notifications
//! - error: `ApiError`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod auth;
pub mod cache;
pub mod error;
pub mod http;
pub mod memory;
pub mod notify;

pub use api::{decode_list, decode_records, PersistenceApi, JOIN_FIELD, LIST_FIELD};
pub use auth::{AuthSession, Credentials, TOKEN_LIFETIME_MS};
pub use cache::{CacheEvent, DataCache, FetchMode, Outcome, Slot, Ticket};
pub use error::{ApiError, Result, SIGN_IN_FAILED};
pub use http::{HttpApi, DEFAULT_TIMEOUT};
pub use memory::{Fixture, InMemoryApi};
pub use notify::{LogNotifier, Notifier, RecordingNotifier};
