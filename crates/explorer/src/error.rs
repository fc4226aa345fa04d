//! Error types for explorer commands.
//!
//! All command failures are represented by the [`Error`] enum. Errors are:
//! - **Structured**: each variant carries typed fields
//! - **Serializable**: they can be printed as JSON by the CLI

use mircs_client::ApiError;
use mircs_map::MapError;
use serde::{Deserialize, Serialize};

/// Result type for explorer commands
pub type Result<T> = std::result::Result<T, Error>;

/// Command execution errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum Error {
    // ==================== Not Found ====================
    /// Dataset not found
    #[error("dataset not found: {id}")]
    DataSetNotFound {
        /// Requested dataset
        id: String,
    },

    /// Relationship not found
    #[error("relationship not found: {id}")]
    RelationshipNotFound {
        /// Requested relationship
        id: String,
    },

    // ==================== State ====================
    /// A map command was issued without a mounted map
    #[error("map is not mounted")]
    NotMounted,

    // ==================== Validation ====================
    /// Invalid command input
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// What is wrong
        reason: String,
    },

    /// Configuration could not be loaded or saved
    #[error("config error: {reason}")]
    Config {
        /// What went wrong
        reason: String,
    },

    // ==================== System ====================
    /// The persistence API failed
    #[error("api error: {message}")]
    Api {
        /// Underlying message
        message: String,
    },
}

impl From<ApiError> for Error {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::NotFound {
                kind: "dataset",
                id,
            } => Error::DataSetNotFound { id },
            ApiError::NotFound {
                kind: "relationship",
                id,
            } => Error::RelationshipNotFound { id },
            other => Error::Api {
                message: other.user_notice(),
            },
        }
    }
}

impl From<MapError> for Error {
    fn from(e: MapError) -> Self {
        match e {
            MapError::NotMounted | MapError::Unmounted => Error::NotMounted,
            MapError::AlreadyMounted => Error::InvalidInput {
                reason: e.to_string(),
            },
        }
    }
}
