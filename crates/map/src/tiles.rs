//! Tile layer registry
//!
//! A small closed set of imagery providers, looked up by name. Unknown
//! names fall back to OpenStreetMap. Mapbox-backed layers need an access
//! token; without one they still resolve, with an empty token.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

const OSM_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
const OSM_ATTRIBUTION: &str = "&copy; <a href=\"https://osm.org/copyright\">OpenStreetMap</a> contributors";
const MAPBOX_URL: &str = "https://api.tiles.mapbox.com/v4/mapbox.streets/{z}/{x}/{y}.png?access_token=";
const MAPBOX_ATTRIBUTION: &str = "Map data &copy; <a href=\"https://openstreetmap.org\">OpenStreetMap</a> contributors, \
     <a href=\"https://creativecommons.org/licenses/by-sa/2.0/\">CC-BY-SA</a>, Imagery &copy; <a href=\"https://mapbox.com\">Mapbox</a>";
const CAMS_MAP_URL: &str =
    "https://api.mapbox.com/styles/v1/shaunjohansen/cjhichsvu67fe2rnt7z72id2e/tiles/256/{z}/{x}/{y}?access_token=";

/// Imagery provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TileProvider {
    /// OpenStreetMap standard tiles
    #[default]
    OpenStreetMap,
    /// Mapbox streets
    Mapbox,
    /// Custom Mapbox style
    CamsMap,
}

impl TileProvider {
    /// Every provider, default first
    pub const ALL: [TileProvider; 3] = [
        TileProvider::OpenStreetMap,
        TileProvider::Mapbox,
        TileProvider::CamsMap,
    ];

    /// Provider with exactly this name
    pub fn from_name(name: &str) -> Option<TileProvider> {
        TileProvider::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Provider for `name`, OpenStreetMap when unknown
    pub fn resolve(name: &str) -> TileProvider {
        TileProvider::from_name(name).unwrap_or_default()
    }

    /// Display name, also the configuration value
    pub fn name(&self) -> &'static str {
        match self {
            TileProvider::OpenStreetMap => "OpenStreetMap",
            TileProvider::Mapbox => "Mapbox",
            TileProvider::CamsMap => "CamsMap",
        }
    }

    /// Whether the provider needs an access token
    pub fn requires_token(&self) -> bool {
        !matches!(self, TileProvider::OpenStreetMap)
    }
}

impl fmt::Display for TileProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An installable tile layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileLayer {
    /// Provider
    pub provider: TileProvider,
    /// URL template with `{z}/{x}/{y}` placeholders
    pub url_template: String,
    /// Attribution HTML
    pub attribution: String,
}

/// Resolves provider names to tile layers
#[derive(Debug, Clone, Default)]
pub struct TileRegistry {
    mapbox_token: Option<String>,
}

impl TileRegistry {
    /// Registry with an optional Mapbox access token
    pub fn new(mapbox_token: Option<String>) -> Self {
        TileRegistry {
            mapbox_token: mapbox_token.filter(|t| !t.is_empty()),
        }
    }

    /// Tile layer for `name`; unknown names give OpenStreetMap.
    pub fn resolve(&self, name: &str) -> TileLayer {
        let provider = TileProvider::resolve(name);
        if provider.name() != name {
            warn!(target: "mircs::map", name, "Unknown tile layer, using OpenStreetMap");
        }
        self.layer(provider)
    }

    /// Tile layer for a known provider
    pub fn layer(&self, provider: TileProvider) -> TileLayer {
        if provider.requires_token() && self.mapbox_token.is_none() {
            warn!(target: "mircs::map", %provider, "No Mapbox token configured");
        }
        let token = self.mapbox_token.as_deref().unwrap_or_default();
        let (url_template, attribution) = match provider {
            TileProvider::OpenStreetMap => (OSM_URL.to_string(), OSM_ATTRIBUTION),
            TileProvider::Mapbox => (format!("{}{}", MAPBOX_URL, token), MAPBOX_ATTRIBUTION),
            TileProvider::CamsMap => (format!("{}{}", CAMS_MAP_URL, token), MAPBOX_ATTRIBUTION),
        };
        TileLayer {
            provider,
            url_template,
            attribution: attribution.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_name_falls_back() {
        let registry = TileRegistry::default();
        assert_eq!(registry.resolve("Stamen").provider, TileProvider::OpenStreetMap);
        assert_eq!(registry.resolve("").provider, TileProvider::OpenStreetMap);
    }

    #[test]
    fn test_names_round_trip() {
        for provider in TileProvider::ALL {
            assert_eq!(TileProvider::from_name(provider.name()), Some(provider));
        }
        assert_eq!(TileProvider::from_name("mapbox"), None);
    }

    #[test]
    fn test_token_is_appended() {
        let registry = TileRegistry::new(Some("pk.test".to_string()));
        let layer = registry.resolve("Mapbox");
        assert!(layer.url_template.ends_with("access_token=pk.test"));
        assert!(registry.resolve("CamsMap").url_template.contains("/styles/v1/"));
    }

    #[test]
    fn test_missing_token_still_resolves() {
        let layer = TileRegistry::new(Some(String::new())).resolve("Mapbox");
        assert_eq!(layer.provider, TileProvider::Mapbox);
        assert!(layer.url_template.ends_with("access_token="));
    }

    #[test]
    fn test_osm_needs_no_token() {
        let layer = TileRegistry::default().resolve("OpenStreetMap");
        assert!(!layer.provider.requires_token());
        assert!(layer.url_template.contains("openstreetmap.org"));
    }
}
