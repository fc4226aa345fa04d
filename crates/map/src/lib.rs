//! Map view for MIRCS
//!
//! - canvas: drawing backend trait and the headless recording canvas
//! - tiles: tile provider registry
//! - bounds: viewport bounding boxes
//! - surface: the mount/refresh/unmount state machine and click routing
//! - panel: side panel and filter bar projections
//! - error: lifecycle errors

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bounds;
pub mod canvas;
pub mod error;
pub mod panel;
pub mod surface;
pub mod tiles;

pub use bounds::Bounds;
pub use canvas::{CanvasOp, ControlPosition, Layer, LayerId, MapCanvas, RecordingCanvas};
pub use error::{MapError, Result};
pub use panel::{FilterBar, PieChart, SidePanel};
pub use surface::{MapOptions, MapSurface, PlacedLayer, RefreshSummary, SurfaceState};
pub use tiles::{TileLayer, TileProvider, TileRegistry};
