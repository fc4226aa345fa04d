//! Viewport bounds
//!
//! The viewport is recentred on a bounding box of points. An empty point
//! set has no bounding box, and fitting it is a no-op.

use geo::{BoundingRect, MultiPoint, Point};
use mircs_engine::LatLng;
use serde::{Deserialize, Serialize};

/// A lat/lng rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Minimum latitude and longitude
    pub south_west: LatLng,
    /// Maximum latitude and longitude
    pub north_east: LatLng,
}

impl Bounds {
    /// Smallest box holding every point, `None` for no points
    pub fn of_points(points: &[LatLng]) -> Option<Bounds> {
        let multi: MultiPoint<f64> = points.iter().map(|p| Point::new(p.lng, p.lat)).collect();
        let rect = multi.bounding_rect()?;
        Some(Bounds {
            south_west: LatLng::new(rect.min().y, rect.min().x),
            north_east: LatLng::new(rect.max().y, rect.max().x),
        })
    }

    /// Centre of the box
    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south_west.lat + self.north_east.lat) / 2.0,
            (self.south_west.lng + self.north_east.lng) / 2.0,
        )
    }

    /// Whether `point` lies inside or on the edge
    pub fn contains(&self, point: LatLng) -> bool {
        (self.south_west.lat..=self.north_east.lat).contains(&point.lat)
            && (self.south_west.lng..=self.north_east.lng).contains(&point.lng)
    }

    /// Whether the box is a single point
    pub fn is_degenerate(&self) -> bool {
        self.south_west == self.north_east
    }
}
