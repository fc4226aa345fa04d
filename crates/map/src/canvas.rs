//! Map canvas abstraction
//!
//! [`MapCanvas`] is the drawing backend the surface owns: a slippy map
//! that accepts tile, marker and feature layers. [`RecordingCanvas`] is a
//! headless implementation that keeps every layer and operation for
//! inspection; it backs the CLI and the tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use mircs_core::Geometry;
use mircs_engine::LatLng;
use mircs_search::{MarkerStyle, PolygonStyle};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::bounds::Bounds;
use crate::tiles::TileLayer;

/// Handle to a layer on a canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub u64);

/// Corner for map controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlPosition {
    /// Top left
    TopLeft,
    /// Top right
    TopRight,
    /// Bottom left
    BottomLeft,
    /// Bottom right
    BottomRight,
}

/// Something drawn on the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Layer {
    /// Background imagery
    Tile(TileLayer),
    /// A point marker
    Marker {
        /// Marker position
        point: LatLng,
        /// Icon style
        style: MarkerStyle,
        /// Popup text
        popup: String,
    },
    /// A GeoJSON geometry
    Feature {
        /// The geometry
        geometry: Geometry,
        /// Stroke style
        style: PolygonStyle,
    },
}

/// Drawing backend for the map surface
pub trait MapCanvas: Send {
    /// Centre the view
    fn set_view(&mut self, center: LatLng, zoom: u8);

    /// Show a distance scale
    fn add_scale_control(&mut self, position: ControlPosition);

    /// Draw a layer
    fn add_layer(&mut self, layer: Layer) -> LayerId;

    /// Remove a layer; unknown ids are ignored
    fn remove_layer(&mut self, id: LayerId);

    /// Fit the viewport to `bounds`
    fn fit_bounds(&mut self, bounds: Bounds);

    /// Tear the canvas down
    fn remove(&mut self);
}

/// Operation applied to a [`RecordingCanvas`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CanvasOp {
    /// `set_view`
    SetView {
        /// Centre
        center: LatLng,
        /// Zoom level
        zoom: u8,
    },
    /// `add_scale_control`
    ScaleControl {
        /// Corner
        position: ControlPosition,
    },
    /// `add_layer`
    Add {
        /// Assigned id
        id: LayerId,
    },
    /// `remove_layer`
    Remove {
        /// Removed id
        id: LayerId,
    },
    /// `fit_bounds`
    Fit {
        /// Fitted box
        bounds: Bounds,
    },
    /// `remove`
    Destroy,
}

#[derive(Debug, Default)]
struct Recorded {
    next_id: u64,
    layers: BTreeMap<LayerId, Layer>,
    ops: Vec<CanvasOp>,
    destroyed: bool,
}

/// Headless canvas recording every layer and operation.
///
/// Clones share the same recording, so a test can keep one handle while
/// the surface owns another.
#[derive(Debug, Clone, Default)]
pub struct RecordingCanvas {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingCanvas {
    /// Empty canvas
    pub fn new() -> Self {
        Self::default()
    }

    /// Every operation so far, in order
    pub fn ops(&self) -> Vec<CanvasOp> {
        self.inner.lock().ops.clone()
    }

    /// Layers currently drawn
    pub fn layers(&self) -> Vec<(LayerId, Layer)> {
        self.inner
            .lock()
            .layers
            .iter()
            .map(|(id, layer)| (*id, layer.clone()))
            .collect()
    }

    /// Marker layers currently drawn
    pub fn markers(&self) -> Vec<(LayerId, LatLng, MarkerStyle)> {
        self.inner
            .lock()
            .layers
            .iter()
            .filter_map(|(id, layer)| match layer {
                Layer::Marker { point, style, .. } => Some((*id, *point, style.clone())),
                _ => None,
            })
            .collect()
    }

    /// Feature layers currently drawn
    pub fn features(&self) -> Vec<(LayerId, PolygonStyle)> {
        self.inner
            .lock()
            .layers
            .iter()
            .filter_map(|(id, layer)| match layer {
                Layer::Feature { style, .. } => Some((*id, style.clone())),
                _ => None,
            })
            .collect()
    }

    /// Tile layers currently drawn
    pub fn tile_layers(&self) -> Vec<TileLayer> {
        self.inner
            .lock()
            .layers
            .values()
            .filter_map(|layer| match layer {
                Layer::Tile(tile) => Some(tile.clone()),
                _ => None,
            })
            .collect()
    }

    /// Most recent fitted bounds
    pub fn last_fit(&self) -> Option<Bounds> {
        self.inner.lock().ops.iter().rev().find_map(|op| match op {
            CanvasOp::Fit { bounds } => Some(*bounds),
            _ => None,
        })
    }

    /// Whether `remove` was called
    pub fn is_destroyed(&self) -> bool {
        self.inner.lock().destroyed
    }
}

impl MapCanvas for RecordingCanvas {
    fn set_view(&mut self, center: LatLng, zoom: u8) {
        self.inner.lock().ops.push(CanvasOp::SetView { center, zoom });
    }

    fn add_scale_control(&mut self, position: ControlPosition) {
        self.inner.lock().ops.push(CanvasOp::ScaleControl { position });
    }

    fn add_layer(&mut self, layer: Layer) -> LayerId {
        let mut inner = self.inner.lock();
        let id = LayerId(inner.next_id);
        inner.next_id += 1;
        inner.layers.insert(id, layer);
        inner.ops.push(CanvasOp::Add { id });
        id
    }

    fn remove_layer(&mut self, id: LayerId) {
        let mut inner = self.inner.lock();
        if inner.layers.remove(&id).is_some() {
            inner.ops.push(CanvasOp::Remove { id });
        }
    }

    fn fit_bounds(&mut self, bounds: Bounds) {
        self.inner.lock().ops.push(CanvasOp::Fit { bounds });
    }

    fn remove(&mut self) {
        let mut inner = self.inner.lock();
        inner.layers.clear();
        inner.destroyed = true;
        inner.ops.push(CanvasOp::Destroy);
    }
}
