//! Output enum for command results.
//!
//! Each [`Command`](crate::Command) variant maps to exactly one `Output`
//! variant.

use mircs_core::{DataSet, DataSetId, Relationship};
use mircs_engine::LatLng;
use mircs_map::{Bounds, FilterBar, LayerId, RefreshSummary, SidePanel};
use mircs_search::Bucket;
use mircs_state::ViewSource;
use serde::Serialize;

/// What opening a dataset or relationship put on the map
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct OpenSummary {
    /// Records shown
    pub records: usize,
    /// Related datasets whose records were linked, with their record counts
    pub related: Vec<(DataSetId, usize)>,
    /// Markers and features drawn
    pub mapped: usize,
    /// Bounds the viewport was fitted to
    pub fitted: Option<Bounds>,
}

/// One drawn marker or feature
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerView {
    /// Layer handle, usable with `ClickMarker`
    pub layer: LayerId,
    /// Search bucket
    pub bucket: Bucket,
    /// Marker position; `None` for polygon features
    pub point: Option<LatLng>,
    /// Popup text
    pub popup: String,
}

/// Everything the explorer currently shows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplorerView {
    /// What is open
    pub source: Option<ViewSource>,
    /// Active tile layer name
    pub tile_layer: String,
    /// Search chips and the "other" count
    pub filter_bar: FilterBar,
    /// Pie chart and selected record cards
    pub side_panel: SidePanel,
    /// Drawn layers
    pub markers: Vec<MarkerView>,
    /// Bounds the viewport was last fitted to
    pub bounds: Option<Bounds>,
}

/// Successful command results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Output {
    /// No return value
    Unit,

    /// Boolean result
    Bool(bool),

    /// Dataset list
    DataSets(Vec<DataSet>),

    /// Relationship list
    Relationships(Vec<Relationship>),

    /// A single dataset
    DataSet(DataSet),

    /// A single relationship
    Relationship(Relationship),

    /// Result of opening a dataset or relationship
    Opened(OpenSummary),

    /// Result of a layer rebuild
    Refreshed(RefreshSummary),

    /// Current view
    View(Box<ExplorerView>),

    /// Successful sign-in
    SignedIn {
        /// Account email
        email: String,
        /// Bearer token for later requests
        id_token: String,
        /// Token lifetime
        expires_in_ms: u64,
    },
}
