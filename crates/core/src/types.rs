//! Dataset and relationship types
//!
//! This module defines the entities owned by the persistence layer:
//! - DataSetId / RelationshipId / RecordId: identifier newtypes
//! - DataSet: an uploaded tabular dataset
//! - Relationship: a join definition between two datasets
//! - JoinElement: one `[leftField, rightField]` pair of a relationship
//!
//! The server stores identifiers as `_id`; the client-side names (`id`,
//! `collectionName`) are accepted as aliases when decoding.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create an identifier from any string-like value
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the identifier text
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Identifier of a dataset (the server's `_id`)
    DataSetId
);
string_id!(
    /// Identifier of a relationship (the server's `_id`)
    RelationshipId
);
string_id!(
    /// Identifier of a record inside a dataset collection (`_id`)
    RecordId
);

/// An uploaded tabular dataset.
///
/// The client holds a read-only cached copy; the record rows live in the
/// backing collection named by `collection_name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSet {
    /// Server identifier
    #[serde(rename = "_id", alias = "id")]
    pub id: DataSetId,
    /// Display name
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Name of the backing record collection
    #[serde(
        rename = "_collectionName",
        alias = "collectionName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub collection_name: Option<String>,
    /// Optional server-computed statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<serde_json::Value>,
}

/// Body for creating or updating a dataset (server-managed fields omitted)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSetDraft {
    /// Display name
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
}

impl From<&DataSet> for DataSetDraft {
    fn from(ds: &DataSet) -> Self {
        DataSetDraft {
            name: ds.name.clone(),
            description: ds.description.clone(),
        }
    }
}

/// Which dataset of a relationship pair a field belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// `dataSets[0]`
    Left,
    /// `dataSets[1]`
    Right,
}

/// One field pair of a join: `[leftField, rightField]` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct JoinElement {
    /// Field read from the left dataset
    pub left: String,
    /// Field read from the right dataset
    pub right: String,
}

impl JoinElement {
    /// Create a join element
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        JoinElement {
            left: left.into(),
            right: right.into(),
        }
    }

    /// Field name for the given side
    pub fn field(&self, side: Side) -> &str {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// The same pair with sides swapped
    pub fn reversed(&self) -> JoinElement {
        JoinElement {
            left: self.right.clone(),
            right: self.left.clone(),
        }
    }
}

impl From<(String, String)> for JoinElement {
    fn from((left, right): (String, String)) -> Self {
        JoinElement { left, right }
    }
}

impl From<JoinElement> for (String, String) {
    fn from(e: JoinElement) -> Self {
        (e.left, e.right)
    }
}

/// Swap every pair of a join definition
pub fn reverse_join_elements(elements: &[JoinElement]) -> Vec<JoinElement> {
    elements.iter().map(JoinElement::reversed).collect()
}

/// A join definition between two datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Server identifier
    #[serde(rename = "_id", alias = "id")]
    pub id: RelationshipId,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// `[leftDataSetId, rightDataSetId]`
    #[serde(rename = "dataSets", default)]
    pub data_sets: Vec<DataSetId>,
    /// Ordered field pairs forming the composite join key
    #[serde(rename = "joinElements", default)]
    pub join_elements: Vec<JoinElement>,
}

impl Relationship {
    /// The two related datasets, if the pair is well formed
    pub fn pair(&self) -> Option<(&DataSetId, &DataSetId)> {
        match self.data_sets.as_slice() {
            [left, right] => Some((left, right)),
            _ => None,
        }
    }

    /// Whether this relationship involves the given dataset
    pub fn involves(&self, data_set: &DataSetId) -> bool {
        self.data_sets.iter().any(|d| d == data_set)
    }

    /// Check the shape invariants: exactly two distinct datasets and at
    /// least one join element.
    pub fn validate(&self) -> Result<()> {
        let (left, right) = self.pair().ok_or_else(|| Error::InvalidRelationship {
            id: self.id.to_string(),
            reason: format!("expected 2 data sets, found {}", self.data_sets.len()),
        })?;
        if left == right {
            return Err(Error::InvalidRelationship {
                id: self.id.to_string(),
                reason: "data sets must be distinct".to_string(),
            });
        }
        if self.join_elements.is_empty() {
            return Err(Error::InvalidRelationship {
                id: self.id.to_string(),
                reason: "no join elements".to_string(),
            });
        }
        Ok(())
    }
}

/// Body for creating or updating a relationship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipDraft {
    /// Display name
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// `[leftDataSetId, rightDataSetId]`
    #[serde(rename = "dataSets")]
    pub data_sets: Vec<DataSetId>,
    /// Ordered field pairs
    #[serde(rename = "joinElements")]
    pub join_elements: Vec<JoinElement>,
}

impl From<&Relationship> for RelationshipDraft {
    fn from(r: &Relationship) -> Self {
        RelationshipDraft {
            name: r.name.clone(),
            description: r.description.clone(),
            data_sets: r.data_sets.clone(),
            join_elements: r.join_elements.clone(),
        }
    }
}
