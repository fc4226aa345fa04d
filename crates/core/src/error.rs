//! Error types for MIRCS core types
//!
//! This module defines the errors raised while decoding records, datasets
//! and relationships. We use `thiserror` for automatic `Display` and `Error`
//! trait implementations.
//!
//! Note that the join and extraction paths never produce errors: missing
//! fields and absent coordinates are skips, not failures.

use thiserror::Error;

/// Result type alias for MIRCS core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for MIRCS core
#[derive(Debug, Error)]
pub enum Error {
    /// A JSON value could not be interpreted as a record
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// A relationship violates its shape invariants
    #[error("Invalid relationship {id}: {reason}")]
    InvalidRelationship {
        /// Relationship identifier
        id: String,
        /// What is wrong with it
        reason: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::SerializationError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_record() {
        let err = Error::InvalidRecord("expected object".to_string());
        let msg = err.to_string();
        assert!(msg.contains("Invalid record"));
        assert!(msg.contains("expected object"));
    }

    #[test]
    fn test_error_display_invalid_relationship() {
        let err = Error::InvalidRelationship {
            id: "r1".to_string(),
            reason: "no join elements".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("r1"));
        assert!(msg.contains("no join elements"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{nope");
        let err: Error = parse.unwrap_err().into();
        assert!(matches!(err, Error::SerializationError(_)));
    }
}
