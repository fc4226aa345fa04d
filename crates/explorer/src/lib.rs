//! MIRCS explorer
//!
//! Ties the persistence cache, the shared UI state and the map surface
//! together behind a serializable command set:
//! - config: `ExplorerConfig` loaded from `mircs.toml`
//! - command / output: the `Command` instruction set and its `Output`
//! - explorer: `Explorer`, which executes commands
//! - error: serializable command errors

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod command;
pub mod config;
pub mod error;
pub mod explorer;
pub mod output;

pub use command::Command;
pub use config::{ExplorerConfig, MapConfig, TilesConfig, CONFIG_FILE_NAME};
pub use error::{Error, Result};
pub use explorer::Explorer;
pub use output::{ExplorerView, MarkerView, OpenSummary, Output};

// Types callers need to build commands and canvases
pub use mircs_client::{
    ApiError, FetchMode, HttpApi, InMemoryApi, LogNotifier, Notifier, PersistenceApi,
    RecordingNotifier,
};
pub use mircs_core::{
    DataSet, DataSetDraft, DataSetId, JoinElement, Record, Relationship, RelationshipDraft,
    RelationshipId,
};
pub use mircs_engine::LatLng;
pub use mircs_map::{Bounds, LayerId, MapCanvas, RecordingCanvas, TileProvider};
pub use mircs_state::ViewSource;
