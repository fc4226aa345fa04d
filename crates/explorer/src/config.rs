//! Explorer configuration via `mircs.toml`
//!
//! A commented default file is written on first use; edit it to point at
//! another server, add a Mapbox token or move the initial view. Command
//! line flags override what the file says.

use std::path::Path;
use std::time::Duration;

use mircs_engine::LatLng;
use mircs_map::{MapOptions, TileProvider};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Config file name
pub const CONFIG_FILE_NAME: &str = "mircs.toml";

/// Tile provider settings, the `[tiles]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TilesConfig {
    /// Access token for the Mapbox-hosted layers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapbox_token: Option<String>,
}

/// Initial map view, the `[map]` section
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    /// `[lat, lng]` of the initial centre
    #[serde(default = "default_center")]
    pub center: [f64; 2],
    /// Initial zoom level
    #[serde(default = "default_zoom")]
    pub zoom: u8,
}

fn default_center() -> [f64; 2] {
    [45.25, -63.0]
}

fn default_zoom() -> u8 {
    8
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            center: default_center(),
            zoom: default_zoom(),
        }
    }
}

impl MapConfig {
    /// Map surface options for this view
    pub fn options(&self) -> MapOptions {
        MapOptions {
            center: LatLng::new(self.center[0], self.center[1]),
            zoom: self.zoom,
        }
    }
}

/// Explorer configuration loaded from `mircs.toml`.
///
/// # Example
///
/// ```toml
/// api_url = "http://localhost:3001"
/// timeout_ms = 10000
/// tile_layer = "OpenStreetMap"
///
/// [tiles]
/// mapbox_token = "pk.xxx"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorerConfig {
    /// Base URL of the persistence server
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Tile layer selected on start and after a reset
    #[serde(default = "default_tile_layer")]
    pub tile_layer: String,
    /// Bearer token sent with every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    /// Tile provider settings
    #[serde(default)]
    pub tiles: TilesConfig,
    /// Initial map view
    #[serde(default)]
    pub map: MapConfig,
}

fn default_api_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_tile_layer() -> String {
    TileProvider::default().name().to_string()
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_ms: default_timeout_ms(),
            tile_layer: default_tile_layer(),
            api_token: None,
            tiles: TilesConfig::default(),
            map: MapConfig::default(),
        }
    }
}

impl ExplorerConfig {
    /// Request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Reject values that cannot work.
    pub fn validate(&self) -> Result<()> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(Error::Config {
                reason: format!(
                    "api_url '{}' must start with http:// or https://",
                    self.api_url
                ),
            });
        }
        if self.timeout_ms == 0 {
            return Err(Error::Config {
                reason: "timeout_ms must be greater than zero".to_string(),
            });
        }
        let [lat, lng] = self.map.center;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(Error::Config {
                reason: format!("map center [{}, {}] is out of range", lat, lng),
            });
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# MIRCS explorer configuration
#
# Persistence server base URL
api_url = "http://localhost:3001"

# Request timeout in milliseconds
timeout_ms = 10000

# Tile layer on start and after reset: "OpenStreetMap", "Mapbox" or "CamsMap"
tile_layer = "OpenStreetMap"

# Bearer token from `mircs login` (optional)
# api_token = "..."

# The Mapbox-hosted layers need an access token.
# [tiles]
# mapbox_token = "pk.your-token"

# Initial map view
[map]
center = [45.25, -63.0]
zoom = 8
"#
    }

    /// Read, parse and validate config from a file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        let config: ExplorerConfig = toml::from_str(&content).map_err(|e| Error::Config {
            reason: format!("failed to parse config file '{}': {}", path.display(), e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| Error::Config {
                reason: format!(
                    "failed to write default config file '{}': {}",
                    path.display(),
                    e
                ),
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config {
            reason: format!("failed to serialize config: {}", e),
        })?;
        std::fs::write(path, content).map_err(|e| Error::Config {
            reason: format!("failed to write config file '{}': {}", path.display(), e),
        })
    }
}
