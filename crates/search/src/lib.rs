//! Search and highlighting for MIRCS
//!
//! This crate decides how each record is drawn relative to the active
//! search terms:
//! - term: `field: value` and substring term parsing and matching
//! - classify: first-match bucket assignment
//! - marker: per-bucket icon and polygon styles
//! - highlight: highlighted segments of displayed values
//! - summary: value counts, chips, pie slices, record cards
//!
//! # Example
//!
//! ```
//! use mircs_core::Record;
//! use mircs_search::{classify, Bucket, SearchTerm};
//! use serde_json::json;
//!
//! let record = Record::from_json(json!({"Surname": "Smith", "City": "Halifax"})).unwrap();
//! let terms = SearchTerm::parse_all(&["Smith", "City: Halifax"]);
//! assert_eq!(classify(&record, &terms), Bucket::Found(0));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod classify;
pub mod highlight;
pub mod marker;
pub mod summary;
pub mod term;

pub use classify::{classify, classify_all, Bucket, Classified};
pub use highlight::{highlight_segments, Segment};
pub use marker::{
    bucket_colour, icon_svg, MarkerStyle, PolygonStyle, OTHER_COLOUR, PALETTE, POLYGON_COLOUR,
    STYLED_BUCKETS,
};
pub use summary::{
    chips, highlight_terms, other_count, pie_slices, popup_text, record_card, value_counts,
    CardLine, Chip, PieSlice, ValueCount,
};
pub use term::{record_text, SearchTerm, FIELD_SEPARATOR};
