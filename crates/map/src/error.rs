//! Map surface errors

use thiserror::Error;

/// Result type for surface lifecycle operations
pub type Result<T> = std::result::Result<T, MapError>;

/// Lifecycle violations of the map surface
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    /// `mount` called on a mounted surface
    #[error("map surface is already mounted")]
    AlreadyMounted,

    /// The surface was unmounted; it cannot be used again
    #[error("map surface has been unmounted")]
    Unmounted,

    /// The operation needs a mounted surface
    #[error("map surface is not mounted")]
    NotMounted,
}
