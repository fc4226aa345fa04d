//! Map surface lifecycle, layer rebuilds and click routing

use mircs_core::{DataSetId, JoinElement, Record};
use mircs_engine::LatLng;
use mircs_map::{
    CanvasOp, ControlPosition, Layer, MapError, MapOptions, MapSurface, RecordingCanvas,
    SurfaceState, TileProvider, TileRegistry,
};
use mircs_search::Bucket;
use mircs_state::{RelatedRecords, UiStore, ViewSource, ViewStore};
use serde_json::{json, Value};

// ============================================================================
// Test Helpers
// ============================================================================

fn rec(v: Value) -> Record {
    Record::from_json(v).unwrap()
}

struct Fixture {
    ui: UiStore,
    view: ViewStore,
    canvas: RecordingCanvas,
    surface: MapSurface,
}

fn fixture() -> Fixture {
    let ui = UiStore::new();
    let view = ViewStore::new();
    let surface = MapSurface::new(
        ui.clone(),
        view.clone(),
        TileRegistry::new(Some("pk.test".to_string())),
        MapOptions::default(),
    );
    Fixture {
        ui,
        view,
        canvas: RecordingCanvas::new(),
        surface,
    }
}

fn mounted() -> Fixture {
    let f = fixture();
    f.surface.mount(Box::new(f.canvas.clone())).unwrap();
    f
}

fn residents() -> Vec<Record> {
    vec![
        rec(json!({"_id": "1", "Surname": "Smith", "Y": 44.6, "X": -63.5})),
        rec(json!({"_id": "2", "Surname": "Jones", "Y": 45.3, "X": -63.2})),
        rec(json!({"_id": "3", "Surname": "Brown"})),
    ]
}

fn open(f: &Fixture, records: Vec<Record>) {
    f.view
        .set_records(ViewSource::DataSet(DataSetId::new("people")), records);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn mount_installs_view_scale_and_tiles() {
    let f = mounted();
    assert_eq!(f.surface.state(), SurfaceState::Mounted);
    let ops = f.canvas.ops();
    assert_eq!(
        ops[0],
        CanvasOp::SetView {
            center: LatLng::new(45.25, -63.0),
            zoom: 8
        }
    );
    assert_eq!(
        ops[1],
        CanvasOp::ScaleControl {
            position: ControlPosition::BottomLeft
        }
    );
    let tiles = f.canvas.tile_layers();
    assert_eq!(tiles.len(), 1);
    assert_eq!(tiles[0].provider, TileProvider::OpenStreetMap);
}

#[test]
fn mount_twice_and_after_unmount_fail() {
    let f = mounted();
    assert_eq!(
        f.surface.mount(Box::new(RecordingCanvas::new())),
        Err(MapError::AlreadyMounted)
    );
    f.surface.unmount();
    assert_eq!(
        f.surface.mount(Box::new(RecordingCanvas::new())),
        Err(MapError::Unmounted)
    );
}

#[test]
fn unmount_removes_canvas_and_listeners() {
    let f = mounted();
    assert_eq!(f.ui.listener_count(), 1);
    f.surface.unmount();
    assert_eq!(f.surface.state(), SurfaceState::Unmounted);
    assert!(f.canvas.is_destroyed());
    assert_eq!(f.ui.listener_count(), 0);

    // later changes no longer reach the canvas
    let ops = f.canvas.ops().len();
    open(&f, residents());
    f.ui.set_tile_layer("Mapbox");
    assert_eq!(f.canvas.ops().len(), ops);
}

#[test]
fn dropping_surface_detaches_listeners() {
    let f = mounted();
    let ui = f.ui.clone();
    drop(f);
    assert_eq!(ui.listener_count(), 0);
}

// ============================================================================
// Tile layers
// ============================================================================

#[test]
fn tile_layer_swap_replaces_the_layer() {
    let f = mounted();
    f.ui.set_tile_layer("Mapbox");
    let tiles = f.canvas.tile_layers();
    assert_eq!(tiles.len(), 1);
    assert_eq!(tiles[0].provider, TileProvider::Mapbox);

    f.ui.set_tile_layer("NoSuchLayer");
    let tiles = f.canvas.tile_layers();
    assert_eq!(tiles.len(), 1);
    assert_eq!(tiles[0].provider, TileProvider::OpenStreetMap);
}

// ============================================================================
// Layer rebuilds
// ============================================================================

#[test]
fn opening_records_draws_one_marker_per_point() {
    let f = mounted();
    open(&f, residents());
    assert_eq!(f.canvas.markers().len(), 2);
    let state = f.ui.snapshot();
    assert_eq!(state.points.len(), 2);
    assert_eq!(state.field_names, vec!["Surname", "Y", "X"]);
    let fit = f.surface.last_fit().unwrap();
    assert_eq!(fit.south_west, LatLng::new(44.6, -63.5));
    assert_eq!(fit.north_east, LatLng::new(45.3, -63.2));
}

#[test]
fn mount_draws_records_already_in_view() {
    let f = fixture();
    open(&f, residents());
    f.surface.mount(Box::new(f.canvas.clone())).unwrap();
    assert_eq!(f.canvas.markers().len(), 2);
}

#[test]
fn search_term_rebuild_styles_and_fits_matches() {
    let f = mounted();
    open(&f, residents());
    f.ui.add_search_term("jones");

    let markers = f.canvas.markers();
    assert_eq!(markers.len(), 2);
    let classes: Vec<&str> = markers.iter().map(|(_, _, s)| s.class_name.as_str()).collect();
    assert!(classes.contains(&"searchIcon0"));
    assert!(classes.contains(&"searchIconX"));

    let fit = f.surface.last_fit().unwrap();
    assert!(fit.is_degenerate());
    assert_eq!(fit.center(), LatLng::new(45.3, -63.2));

    let state = f.ui.snapshot();
    assert_eq!(state.bucket_counts(), vec![1]);
    assert_eq!(state.other_records.len(), 1);
}

#[test]
fn empty_point_set_does_not_fit() {
    let f = mounted();
    open(&f, vec![rec(json!({"_id": "1", "Name": "nowhere"}))]);
    assert!(f.canvas.last_fit().is_none());
    assert!(f.canvas.markers().is_empty());
}

#[test]
fn features_draw_as_geometry_layers() {
    let f = mounted();
    open(
        &f,
        vec![rec(json!({
            "_id": "p1",
            "type": "Feature",
            "geometry": {"type": "Polygon", "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]},
            "properties": {"Parish": "St. Paul"}
        }))],
    );
    let features = f.canvas.features();
    assert_eq!(features.len(), 1);
    assert_eq!(features[0].1.color, "#ff7800");

    f.ui.add_search_term("Parish: St. Paul");
    let features = f.canvas.features();
    assert_eq!(features.len(), 1);
    assert_eq!(features[0].1.color, "#885154");
}

#[test]
fn related_records_are_linked_and_selectable() {
    let f = mounted();
    let source = ViewSource::DataSet(DataSetId::new("people"));
    f.view.set_records(source.clone(), residents());
    f.view.set_related(
        &source,
        vec![RelatedRecords {
            data_set_id: DataSetId::new("pets"),
            join_elements: vec![JoinElement::new("_id", "owner")],
            records: vec![
                rec(json!({"_id": "a", "owner": "1", "Pet": "Rex"})),
                rec(json!({"_id": "b", "owner": "9", "Pet": "Tom"})),
            ],
        }],
    );
    assert_eq!(f.surface.link_map().total_links(), 1);
    assert!(f.ui.snapshot().field_names.contains(&"Pet".to_string()));

    let smith = f
        .surface
        .placed()
        .into_iter()
        .find(|p| p.record.get("Surname") == Some(&json!("Smith")))
        .unwrap();
    f.surface.click(Some(smith.id)).unwrap();
    let selected = f.ui.snapshot().selected;
    assert_eq!(selected.point, Some(LatLng::new(44.6, -63.5)));
    assert_eq!(selected.records.len(), 2);
    assert_eq!(selected.records[1].get("Pet"), Some(&json!("Rex")));
}

// ============================================================================
// Clicks
// ============================================================================

#[test]
fn background_click_after_marker_click_is_swallowed_once() {
    let f = mounted();
    open(&f, residents());
    let id = f.surface.placed()[0].id;

    f.surface.click(Some(id)).unwrap();
    assert!(!f.ui.snapshot().selected.records.is_empty());

    f.surface.click(None).unwrap();
    assert!(f.ui.snapshot().selected.is_empty());
}

#[test]
fn clicks_need_a_mounted_surface() {
    let f = fixture();
    assert_eq!(f.surface.click_map(), Err(MapError::NotMounted));
    assert_eq!(f.surface.refresh(), Err(MapError::NotMounted));
}

#[test]
fn unknown_layer_click_selects_nothing() {
    let f = mounted();
    open(&f, residents());
    assert_eq!(f.surface.click_layer(mircs_map::LayerId(999)), Ok(false));
    assert!(f.ui.snapshot().selected.is_empty());
}

#[test]
fn placed_layers_carry_buckets() {
    let f = mounted();
    open(&f, residents());
    f.ui.set_search_terms(vec!["Surname: Smith".to_string()]);
    let buckets: Vec<Bucket> = f.surface.placed().iter().map(|p| p.bucket).collect();
    assert_eq!(buckets, vec![Bucket::Found(0), Bucket::Other]);
    assert!(matches!(
        f.canvas.layers().iter().find(|(id, _)| *id == f.surface.placed()[0].id),
        Some((_, Layer::Marker { .. }))
    ));
}
