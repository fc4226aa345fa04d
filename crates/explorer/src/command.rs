//! Command enum defining all explorer operations.
//!
//! Commands are the instruction set of the explorer. Every user action the
//! map page, the dataset pages and the sign-in form can perform is one
//! variant. Commands are:
//! - **Self-contained**: all parameters are in the variant
//! - **Serializable**: they can be read from JSON
//! - **Pure data**: no closures

use mircs_core::{DataSetDraft, DataSetId, RelationshipDraft, RelationshipId};
use mircs_map::LayerId;
use serde::{Deserialize, Serialize};

/// A self-contained, serializable explorer operation.
///
/// # Command Categories
///
/// | Category | Count | Description |
/// |----------|-------|-------------|
/// | Navigation | 4 | List and open datasets and relationships |
/// | Search | 4 | Edit search terms and the highlight field |
/// | Map | 6 | Tile layer, clicks, reset, refresh, view snapshot |
/// | Data sets | 3 | Create, update, delete datasets |
/// | Relationships | 3 | Create, update, delete relationships |
/// | Auth | 1 | Sign in |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub enum Command {
    // ==================== Navigation (4) ====================
    /// Fetch the dataset list.
    /// Returns: `Output::DataSets`
    ListDataSets,

    /// Fetch the relationship list.
    /// Returns: `Output::Relationships`
    ListRelationships,

    /// Reset the map and show a dataset with its related records.
    /// Returns: `Output::Opened`
    OpenDataSet {
        /// Dataset to show
        id: DataSetId,
    },

    /// Reset the map and show the server-side join of a relationship.
    /// Returns: `Output::Opened`
    OpenRelationship {
        /// Relationship to show
        id: RelationshipId,
    },

    // ==================== Search (4) ====================
    /// Append a search term.
    /// Returns: `Output::Bool` (false if blank or already present)
    AddSearchTerm {
        /// Raw term, `text` or `field: value`
        term: String,
    },

    /// Remove a search term.
    /// Returns: `Output::Bool` (false if absent)
    RemoveSearchTerm {
        /// Raw term
        term: String,
    },

    /// Replace every search term.
    /// Returns: `Output::Unit`
    SetSearchTerms {
        /// New terms in priority order
        terms: Vec<String>,
    },

    /// Set or clear the highlight field; setting it replaces the terms
    /// with the field's most frequent values.
    /// Returns: `Output::Unit`
    SetHighlightField {
        /// Field name, `None` to clear
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field: Option<String>,
    },

    // ==================== Map (6) ====================
    /// Switch the tile layer.
    /// Returns: `Output::Unit`
    SetTileLayer {
        /// Provider name; unknown names fall back to OpenStreetMap
        name: String,
    },

    /// Click a marker or feature.
    /// Returns: `Output::Bool` (false for an unknown layer)
    ClickMarker {
        /// Layer that was clicked
        layer: LayerId,
    },

    /// Click the map background.
    /// Returns: `Output::Bool` (whether the selection was cleared)
    ClickBackground,

    /// Restore the initial UI state and drop pending fetches.
    /// Returns: `Output::Unit`
    Reset,

    /// Rebuild every map layer.
    /// Returns: `Output::Refreshed`
    Refresh,

    /// Describe what the map and panels currently show.
    /// Returns: `Output::View`
    View,

    // ==================== Data sets (3) ====================
    /// Create a dataset.
    /// Returns: `Output::DataSet`
    CreateDataSet {
        /// Editable fields
        draft: DataSetDraft,
    },

    /// Update a dataset.
    /// Returns: `Output::DataSet`
    UpdateDataSet {
        /// Dataset to change
        id: DataSetId,
        /// New editable fields
        draft: DataSetDraft,
    },

    /// Delete a dataset and its records.
    /// Returns: `Output::Unit`
    DeleteDataSet {
        /// Dataset to delete
        id: DataSetId,
    },

    // ==================== Relationships (3) ====================
    /// Create a relationship.
    /// Returns: `Output::Relationship`
    CreateRelationship {
        /// Editable fields
        draft: RelationshipDraft,
    },

    /// Update a relationship.
    /// Returns: `Output::Relationship`
    UpdateRelationship {
        /// Relationship to change
        id: RelationshipId,
        /// New editable fields
        draft: RelationshipDraft,
    },

    /// Delete a relationship.
    /// Returns: `Output::Unit`
    DeleteRelationship {
        /// Relationship to delete
        id: RelationshipId,
    },

    // ==================== Auth (1) ====================
    /// Sign in; later requests carry the issued token.
    /// Returns: `Output::SignedIn`
    SignIn {
        /// Account email
        email: String,
        /// Password
        password: String,
    },
}

impl Command {
    /// Whether the command changes server-side data
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Command::CreateDataSet { .. }
                | Command::UpdateDataSet { .. }
                | Command::DeleteDataSet { .. }
                | Command::CreateRelationship { .. }
                | Command::UpdateRelationship { .. }
                | Command::DeleteRelationship { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_commands_read_from_json() {
        let cmd: Command = serde_json::from_value(json!({"OpenDataSet": {"id": "d1"}})).unwrap();
        assert_eq!(cmd, Command::OpenDataSet { id: "d1".into() });

        let cmd: Command = serde_json::from_value(json!("ClickBackground")).unwrap();
        assert_eq!(cmd, Command::ClickBackground);

        let cmd: Command =
            serde_json::from_value(json!({"ClickMarker": {"layer": 3}})).unwrap();
        assert_eq!(cmd, Command::ClickMarker { layer: LayerId(3) });
    }

    #[test]
    fn test_highlight_field_defaults_to_clear() {
        let cmd: Command = serde_json::from_value(json!({"SetHighlightField": {}})).unwrap();
        assert_eq!(cmd, Command::SetHighlightField { field: None });
    }

    #[test]
    fn test_is_write() {
        assert!(Command::DeleteDataSet { id: "d".into() }.is_write());
        assert!(!Command::View.is_write());
    }
}
