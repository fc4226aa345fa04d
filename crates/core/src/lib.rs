//! Core types for MIRCS
//!
//! This crate defines the foundational types used throughout the system:
//! - Record: tagged record shape (Flat, Geo, Joined)
//! - DataSet / Relationship / JoinElement: persistence entities
//! - DataSetId / RelationshipId / RecordId: identifier newtypes
//! - value: join-key text and loose equality for field values
//! - Error: Error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod record;
pub mod types;
pub mod value;

pub use error::{Error, Result};
pub use record::{
    is_reserved_field, GeoFeature, JoinedRecord, Properties, Record, ID_FIELD, RESERVED_PREFIX,
};
pub use types::{
    reverse_join_elements, DataSet, DataSetDraft, DataSetId, JoinElement, RecordId, Relationship,
    RelationshipDraft, RelationshipId, Side,
};

/// Re-exported so downstream crates name geometry types consistently
pub use geojson::Geometry;
/// Field values are plain JSON values
pub use serde_json::Value as JsonValue;
