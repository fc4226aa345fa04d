//! Record engine for MIRCS
//!
//! This crate holds the pure, in-memory logic shared by every map view:
//! - join: composite join keys, `LinkMap` resolution, relationship
//!   orientation
//! - fields: visible field-name collection
//! - geometry: polygon/point extraction with joined-record fallback
//! - selection: records surfaced by selecting a map location
//!
//! Nothing here performs I/O or fails: missing data is skipped.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod fields;
pub mod geometry;
pub mod join;
pub mod selection;

pub use fields::{collect_field_names, representative_properties};
pub use geometry::{point_from_fields, to_geometry_or_point, to_point, LatLng, MapFeature};
pub use join::{
    join_key, related_sets, resolve_join, resolve_join_into, JoinStats, LinkMap, RelatedDataSet,
    KEY_SEPARATOR,
};
pub use selection::expand_selection;
