//! Marker and polygon styling
//!
//! The first [`STYLED_BUCKETS`] buckets each get their own icon, shrinking
//! and fading with priority. Later buckets share an overflow style and
//! unmatched records get a small neutral marker.

use serde::{Deserialize, Serialize};

use crate::classify::Bucket;

/// Number of buckets with a distinct icon and colour
pub const STYLED_BUCKETS: usize = 7;

/// Bucket colours, in priority order
pub const PALETTE: [&str; STYLED_BUCKETS] = [
    "#885154", "#EC635F", "#76AAA1", "#e88735", "#91AF94", "#8C8C8C", "#465955",
];

/// Colour of the "Other" pie slice
pub const OTHER_COLOUR: &str = "#E8DDD4";

/// Stroke colour of unmatched polygons
pub const POLYGON_COLOUR: &str = "#ff7800";

const SIZES: [u32; STYLED_BUCKETS] = [34, 30, 26, 22, 22, 22, 22];
const OPACITIES: [f64; STYLED_BUCKETS] = [1.0, 1.0, 0.9, 0.85, 0.8, 0.75, 0.7];
const OVERFLOW_SIZE: u32 = 22;
const OVERFLOW_OPACITY: f64 = 0.65;
const NEUTRAL_SIZE: u32 = 18;
const NEUTRAL_OPACITY: f64 = 0.4;

/// Palette colour of a bucket index, if it has one
pub fn bucket_colour(index: usize) -> Option<&'static str> {
    PALETTE.get(index).copied()
}

/// Icon style for a point marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerStyle {
    /// CSS class of the icon
    pub class_name: String,
    /// Icon edge length in pixels
    pub size: u32,
    /// Fill opacity
    pub opacity: f64,
    /// Icon anchor, the icon centre
    pub anchor: [u32; 2],
    /// Draw-order offset; matched markers sit above unmatched ones
    pub z_index_offset: i32,
}

impl MarkerStyle {
    /// Style for a classified record
    pub fn for_bucket(bucket: Bucket) -> MarkerStyle {
        match bucket {
            Bucket::Found(i) if i < STYLED_BUCKETS => {
                MarkerStyle::new(format!("searchIcon{}", i), SIZES[i], OPACITIES[i], i)
            }
            Bucket::Found(i) => {
                MarkerStyle::new("searchIconN".to_string(), OVERFLOW_SIZE, OVERFLOW_OPACITY, i)
            }
            Bucket::Other => MarkerStyle {
                class_name: "searchIconX".to_string(),
                size: NEUTRAL_SIZE,
                opacity: NEUTRAL_OPACITY,
                anchor: [NEUTRAL_SIZE / 2, NEUTRAL_SIZE / 2],
                z_index_offset: 0,
            },
        }
    }

    fn new(class_name: String, size: u32, opacity: f64, index: usize) -> MarkerStyle {
        let z = i32::try_from(index).unwrap_or(i32::MAX / 100 - 5);
        MarkerStyle {
            class_name,
            size,
            opacity,
            anchor: [size / 2, size / 2],
            z_index_offset: z.saturating_mul(100).saturating_add(500),
        }
    }

    /// SVG house glyph at this style's size and opacity
    pub fn icon_svg(&self) -> String {
        icon_svg(self.size, self.opacity)
    }
}

/// SVG house glyph
pub fn icon_svg(size: u32, opacity: f64) -> String {
    format!(
        "<svg width=\"{size}px\" height=\"{size}px\" viewBox=\"0 0 1024 1024\">\
         <polygon points=\"512,9 0,521 128,521 128,905 448,905 448,649 576,649 576,905 896,905 896,521 1024,521 \" \
         fill-opacity=\"{opacity}\"/></svg>"
    )
}

/// Stroke style for a GeoJSON feature layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonStyle {
    /// Stroke and fill colour
    pub color: String,
    /// Stroke weight in pixels
    pub weight: u32,
    /// Stroke opacity
    pub opacity: f64,
}

impl PolygonStyle {
    /// Style for a classified feature: the bucket colour when matched
    pub fn for_bucket(bucket: Bucket) -> PolygonStyle {
        let color = bucket
            .index()
            .and_then(bucket_colour)
            .unwrap_or(POLYGON_COLOUR);
        PolygonStyle {
            color: color.to_string(),
            weight: 1,
            opacity: 0.65,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_bucket_is_largest() {
        let s = MarkerStyle::for_bucket(Bucket::Found(0));
        assert_eq!(s.class_name, "searchIcon0");
        assert_eq!(s.size, 34);
        assert_eq!(s.anchor, [17, 17]);
        assert_eq!(s.z_index_offset, 500);
    }

    #[test]
    fn test_sizes_never_grow_with_index() {
        let sizes: Vec<u32> = (0..10)
            .map(|i| MarkerStyle::for_bucket(Bucket::Found(i)).size)
            .collect();
        assert!(sizes.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_overflow_buckets_share_a_style() {
        let a = MarkerStyle::for_bucket(Bucket::Found(7));
        let b = MarkerStyle::for_bucket(Bucket::Found(12));
        assert_eq!(a.class_name, "searchIconN");
        assert_eq!(a.class_name, b.class_name);
        assert_eq!(a.opacity, 0.65);
        assert_eq!(b.z_index_offset, 1700);
    }

    #[test]
    fn test_unmatched_is_neutral() {
        let s = MarkerStyle::for_bucket(Bucket::Other);
        assert_eq!(s.class_name, "searchIconX");
        assert_eq!(s.size, 18);
        assert_eq!(s.anchor, [9, 9]);
        assert_eq!(s.z_index_offset, 0);
    }

    #[test]
    fn test_icon_svg_carries_size_and_opacity() {
        let svg = MarkerStyle::for_bucket(Bucket::Found(2)).icon_svg();
        assert!(svg.starts_with("<svg width=\"26px\" height=\"26px\""));
        assert!(svg.contains("fill-opacity=\"0.9\""));
    }

    #[test]
    fn test_polygon_colour() {
        assert_eq!(PolygonStyle::for_bucket(Bucket::Other).color, POLYGON_COLOUR);
        assert_eq!(PolygonStyle::for_bucket(Bucket::Found(1)).color, "#EC635F");
        assert_eq!(PolygonStyle::for_bucket(Bucket::Found(9)).color, POLYGON_COLOUR);
    }
}
