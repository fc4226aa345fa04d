//! Geometry and point extraction
//!
//! Decides how a record appears on the map:
//! - GeoJSON features render their geometry directly
//! - joined composites resolve through the first left match, then the
//!   first right match (either side of a join may hold the coordinates)
//! - flat records yield a point from their coordinate fields
//!
//! Records with no extractable location are skipped, not errors.

use mircs_core::{GeoFeature, Properties, Record};
use serde::{Deserialize, Serialize};

/// Latitude field names, in lookup order
pub const LATITUDE_FIELDS: [&str; 3] = ["Y", "y", "latitude"];
/// Longitude field names, in lookup order
pub const LONGITUDE_FIELDS: [&str; 3] = ["X", "x", "longitude"];

/// A map coordinate. Serialized as `[lat, lng]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LatLng {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lng: f64,
}

impl LatLng {
    /// Create a coordinate
    pub fn new(lat: f64, lng: f64) -> Self {
        LatLng { lat, lng }
    }
}

impl From<[f64; 2]> for LatLng {
    fn from([lat, lng]: [f64; 2]) -> Self {
        LatLng { lat, lng }
    }
}

impl From<LatLng> for [f64; 2] {
    fn from(p: LatLng) -> Self {
        [p.lat, p.lng]
    }
}

/// How a record is drawn
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapFeature<'a> {
    /// Render the feature geometry as-is
    Polygon(&'a GeoFeature),
    /// Place a marker at a coordinate
    Point(LatLng),
}

impl MapFeature<'_> {
    /// The marker coordinate, if this is a point
    pub fn point(&self) -> Option<LatLng> {
        match self {
            MapFeature::Point(p) => Some(*p),
            MapFeature::Polygon(_) => None,
        }
    }
}

/// Resolve a record to a polygon or a point.
pub fn to_geometry_or_point(record: &Record) -> Option<MapFeature<'_>> {
    match record {
        Record::Geo(feature) => Some(MapFeature::Polygon(feature)),
        Record::Joined(joined) => joined
            .left
            .first()
            .and_then(to_geometry_or_point)
            .or_else(|| joined.right.first().and_then(to_geometry_or_point)),
        Record::Flat(props) => point_from_fields(props).map(MapFeature::Point),
    }
}

/// Resolve a record to a point only; polygons yield `None`.
pub fn to_point(record: &Record) -> Option<LatLng> {
    to_geometry_or_point(record).and_then(|f| f.point())
}

/// Read a coordinate from the conventional field names.
///
/// The first field of each list holding a number (or numeric text) wins.
pub fn point_from_fields(props: &Properties) -> Option<LatLng> {
    let lat = first_number(props, &LATITUDE_FIELDS)?;
    let lng = first_number(props, &LONGITUDE_FIELDS)?;
    Some(LatLng::new(lat, lng))
}

fn first_number(props: &Properties, names: &[&str]) -> Option<f64> {
    names
        .iter()
        .find_map(|name| props.get(*name).and_then(mircs_core::value::as_number))
}
