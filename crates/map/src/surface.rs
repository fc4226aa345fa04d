//! Map rendering surface
//!
//! [`MapSurface`] owns the map canvas and its tile layer. Nothing else
//! draws on the canvas.
//!
//! ## Lifecycle
//!
//! ```text
//! Uninitialized --mount--> Mounted --unmount--> Unmounted (terminal)
//! ```
//!
//! While mounted the surface listens to:
//! - tile layer changes: swap the tile layer
//! - search term and highlight field changes: rebuild the layers
//! - view record changes: rebuild the layers
//!
//! Unmounting removes the canvas and drops every subscription.
//!
//! ## Clicks
//!
//! A click on a layer selects that layer's location and sets a one-shot
//! flag; the map's own click handler, which fires next, consumes the flag
//! instead of clearing the selection.

use std::sync::Arc;

use mircs_core::Record;
use mircs_engine::{
    expand_selection, resolve_join_into, to_geometry_or_point, LatLng, LinkMap, MapFeature,
};
use mircs_search::{classify, popup_text, Bucket, Classified, MarkerStyle, PolygonStyle, SearchTerm};
use mircs_state::{Subscription, Topic, UiStore, ViewStore};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::bounds::Bounds;
use crate::canvas::{ControlPosition, Layer, LayerId, MapCanvas};
use crate::error::{MapError, Result};
use crate::tiles::TileRegistry;

/// Initial view of a freshly mounted map
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapOptions {
    /// Initial centre
    pub center: LatLng,
    /// Initial zoom level
    pub zoom: u8,
}

impl Default for MapOptions {
    fn default() -> Self {
        MapOptions {
            center: LatLng::new(45.25, -63.0),
            zoom: 8,
        }
    }
}

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceState {
    /// Not yet mounted
    Uninitialized,
    /// Canvas live, listening for changes
    Mounted,
    /// Torn down for good
    Unmounted,
}

/// A record drawn on the map
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedLayer {
    /// Canvas layer
    pub id: LayerId,
    /// Classification bucket
    pub bucket: Bucket,
    /// Marker position, `None` for features
    pub point: Option<LatLng>,
    /// The record drawn
    pub record: Record,
}

/// Outcome of one layer rebuild
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RefreshSummary {
    /// Records drawn as markers or features
    pub mapped: usize,
    /// Records without a location
    pub skipped: usize,
    /// Drawn records matching a search term
    pub matched: usize,
    /// Left records with related matches
    pub linked: usize,
    /// Bounds the viewport was fitted to
    pub fitted: Option<Bounds>,
}

struct SurfaceInner {
    state: SurfaceState,
    canvas: Option<Box<dyn MapCanvas>>,
    tile_layer: Option<LayerId>,
    placed: Vec<PlacedLayer>,
    link_map: LinkMap,
    suppress_background_click: bool,
    last_fit: Option<Bounds>,
}

struct Shared {
    inner: Mutex<SurfaceInner>,
    ui: UiStore,
    view: ViewStore,
    tiles: TileRegistry,
    options: MapOptions,
}

/// The map view: canvas owner and click router
pub struct MapSurface {
    shared: Arc<Shared>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl MapSurface {
    /// Unmounted surface drawing `view` and reading/writing `ui`
    pub fn new(ui: UiStore, view: ViewStore, tiles: TileRegistry, options: MapOptions) -> Self {
        MapSurface {
            shared: Arc::new(Shared {
                inner: Mutex::new(SurfaceInner {
                    state: SurfaceState::Uninitialized,
                    canvas: None,
                    tile_layer: None,
                    placed: Vec::new(),
                    link_map: LinkMap::new(),
                    suppress_background_click: false,
                    last_fit: None,
                }),
                ui,
                view,
                tiles,
                options,
            }),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SurfaceState {
        self.shared.inner.lock().state
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Bind `canvas`, install the scale control and tile layer, start
    /// listening, and draw the current records.
    pub fn mount(&self, mut canvas: Box<dyn MapCanvas>) -> Result<()> {
        let tile_name = self.shared.ui.tile_layer_name();
        {
            let mut inner = self.shared.inner.lock();
            match inner.state {
                SurfaceState::Mounted => return Err(MapError::AlreadyMounted),
                SurfaceState::Unmounted => return Err(MapError::Unmounted),
                SurfaceState::Uninitialized => {}
            }
            canvas.set_view(self.shared.options.center, self.shared.options.zoom);
            canvas.add_scale_control(ControlPosition::BottomLeft);
            inner.canvas = Some(canvas);
            inner.state = SurfaceState::Mounted;
            install_tile_layer(&mut inner, &self.shared.tiles, &tile_name);
        }

        let weak = Arc::downgrade(&self.shared);
        let ui_subscription = self.shared.ui.subscribe(move |topic| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            match topic {
                Topic::TileLayer => swap_tile_layer(&shared),
                Topic::SearchTerms | Topic::HighlightField => {
                    map_points(&shared);
                }
                _ => {}
            }
        });
        let weak = Arc::downgrade(&self.shared);
        let view_subscription = self.shared.view.subscribe(move |_| {
            if let Some(shared) = weak.upgrade() {
                map_points(&shared);
            }
        });
        self.subscriptions
            .lock()
            .extend([ui_subscription, view_subscription]);

        info!(target: "mircs::map", tile_layer = %tile_name, "Map surface mounted");

        if self.shared.view.read(|v| !v.records.is_empty()) {
            map_points(&self.shared);
        }
        Ok(())
    }

    /// Remove the canvas and detach every listener. The surface cannot be
    /// mounted again.
    pub fn unmount(&self) {
        let subscriptions: Vec<Subscription> = std::mem::take(&mut *self.subscriptions.lock());
        drop(subscriptions);

        let mut inner = self.shared.inner.lock();
        if let Some(mut canvas) = inner.canvas.take() {
            canvas.remove();
        }
        inner.placed.clear();
        inner.tile_layer = None;
        inner.link_map.clear();
        inner.state = SurfaceState::Unmounted;
        info!(target: "mircs::map", "Map surface unmounted");
    }

    // ========================================================================
    // Layers
    // ========================================================================

    /// Rebuild every layer from the current view and search terms.
    pub fn refresh(&self) -> Result<RefreshSummary> {
        self.ensure_mounted()?;
        map_points(&self.shared).ok_or(MapError::NotMounted)
    }

    /// Records currently drawn
    pub fn placed(&self) -> Vec<PlacedLayer> {
        self.shared.inner.lock().placed.clone()
    }

    /// The join index of the last rebuild
    pub fn link_map(&self) -> LinkMap {
        self.shared.inner.lock().link_map.clone()
    }

    /// Bounds the viewport was last fitted to
    pub fn last_fit(&self) -> Option<Bounds> {
        self.shared.inner.lock().last_fit
    }

    // ========================================================================
    // Clicks
    // ========================================================================

    /// Click on a drawn layer: select its location and swallow the
    /// following background click. Returns false for an unknown layer.
    pub fn click_layer(&self, id: LayerId) -> Result<bool> {
        let (point, records) = {
            let mut inner = self.shared.inner.lock();
            if inner.state != SurfaceState::Mounted {
                return Err(MapError::NotMounted);
            }
            let Some(placed) = inner.placed.iter().find(|p| p.id == id) else {
                return Ok(false);
            };
            let point = placed.point;
            let records = expand_selection(&placed.record, &inner.link_map);
            inner.suppress_background_click = true;
            (point, records)
        };
        self.shared.ui.select_records(point, records);
        Ok(true)
    }

    /// Click on the map itself: clears the selection unless a layer click
    /// just happened. Returns whether the selection was cleared.
    pub fn click_map(&self) -> Result<bool> {
        {
            let mut inner = self.shared.inner.lock();
            if inner.state != SurfaceState::Mounted {
                return Err(MapError::NotMounted);
            }
            if inner.suppress_background_click {
                inner.suppress_background_click = false;
                return Ok(false);
            }
        }
        self.shared.ui.clear_selection();
        Ok(true)
    }

    /// A full click: the layer handler (if any) then the map handler.
    pub fn click(&self, target: Option<LayerId>) -> Result<()> {
        if let Some(id) = target {
            self.click_layer(id)?;
        }
        self.click_map()?;
        Ok(())
    }

    fn ensure_mounted(&self) -> Result<()> {
        match self.state() {
            SurfaceState::Mounted => Ok(()),
            SurfaceState::Unmounted => Err(MapError::Unmounted),
            SurfaceState::Uninitialized => Err(MapError::NotMounted),
        }
    }
}

impl std::fmt::Debug for MapSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("MapSurface")
            .field("state", &inner.state)
            .field("placed", &inner.placed.len())
            .field("subscriptions", &self.subscriptions.lock().len())
            .finish()
    }
}

// ============================================================================
// Listener bodies
// ============================================================================

fn install_tile_layer(inner: &mut SurfaceInner, tiles: &TileRegistry, name: &str) {
    let Some(canvas) = inner.canvas.as_mut() else {
        return;
    };
    if let Some(id) = inner.tile_layer.take() {
        canvas.remove_layer(id);
    }
    let layer = tiles.resolve(name);
    inner.tile_layer = Some(canvas.add_layer(Layer::Tile(layer)));
}

fn swap_tile_layer(shared: &Shared) {
    let name = shared.ui.tile_layer_name();
    let mut inner = shared.inner.lock();
    if inner.state == SurfaceState::Mounted {
        debug!(target: "mircs::map", name = %name, "Swapping tile layer");
        install_tile_layer(&mut inner, &shared.tiles, &name);
    }
}

/// Rebuild every layer. Returns `None` when not mounted.
///
/// Canvas work happens under the surface lock; store updates happen
/// after it is released so their listeners may call back in.
fn map_points(shared: &Shared) -> Option<RefreshSummary> {
    let view = shared.view.snapshot();
    let raw_terms = shared.ui.search_strings();
    let terms = SearchTerm::parse_all(&raw_terms);

    let mut summary = RefreshSummary::default();
    let mut classified = Classified::with_terms(terms.len());
    let mut points = Vec::new();
    let mut found_points = Vec::new();

    {
        let mut guard = shared.inner.lock();
        let inner = &mut *guard;
        if inner.state != SurfaceState::Mounted {
            return None;
        }
        let canvas = inner.canvas.as_mut()?;

        for placed in inner.placed.drain(..) {
            canvas.remove_layer(placed.id);
        }

        inner.link_map.clear();
        for related in &view.related {
            resolve_join_into(
                &mut inner.link_map,
                &view.records,
                &related.records,
                &related.join_elements,
            );
        }
        summary.linked = inner.link_map.len();

        for record in &view.records {
            let Some(feature) = to_geometry_or_point(record) else {
                summary.skipped += 1;
                continue;
            };
            let bucket = classify(record, &terms);
            let (layer, point) = match feature {
                MapFeature::Polygon(geo) => (
                    Layer::Feature {
                        geometry: geo.geometry.clone(),
                        style: PolygonStyle::for_bucket(bucket),
                    },
                    None,
                ),
                MapFeature::Point(point) => {
                    points.push(point);
                    if bucket != Bucket::Other {
                        found_points.push(point);
                    }
                    (
                        Layer::Marker {
                            point,
                            style: MarkerStyle::for_bucket(bucket),
                            popup: popup_text(record),
                        },
                        Some(point),
                    )
                }
            };
            let id = canvas.add_layer(layer);
            inner.placed.push(PlacedLayer {
                id,
                bucket,
                point,
                record: record.clone(),
            });
            classified.push(bucket, record.clone());
            summary.mapped += 1;
            if bucket != Bucket::Other {
                summary.matched += 1;
            }
        }

        let focus = if found_points.is_empty() {
            &points
        } else {
            &found_points
        };
        summary.fitted = Bounds::of_points(focus);
        if let Some(bounds) = summary.fitted {
            canvas.fit_bounds(bounds);
            inner.last_fit = Some(bounds);
        }
    }

    shared.ui.apply_classification(classified);
    for related in &view.related {
        if let Some(sample) = related.records.first() {
            shared.ui.add_field_names(sample);
        }
    }
    if let Some(sample) = view.records.first() {
        shared.ui.add_field_names(sample);
    }
    shared.ui.set_points(points);

    debug!(
        target: "mircs::map",
        mapped = summary.mapped,
        skipped = summary.skipped,
        matched = summary.matched,
        linked = summary.linked,
        "Map layers rebuilt"
    );
    Some(summary)
}
