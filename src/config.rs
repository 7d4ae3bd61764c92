//! Runtime settings.
//!
//! Everything except the LLM API key has a working default, so the YAML
//! file is optional. Any key may be omitted from the file:
//!
//! ```yaml
//! fetch:
//!   timeout_secs: 10
//! llm:
//!   model: gemini-1.5-flash
//!   max_article_chars: 24000
//! geocoder:
//!   base_url: https://nominatim.openstreetmap.org
//!   user_agent: newsmap
//! map:
//!   default_center: { latitude: 20.0, longitude: 0.0 }
//!   default_zoom: 2
//! ```

use serde::Deserialize;
use std::time::Duration;
use tokio::fs;
use tracing::{info, instrument};

use crate::error::{NewsMapError, Result};
use crate::models::Coordinate;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub fetch: FetchSettings,
    pub llm: LlmSettings,
    pub geocoder: GeocoderSettings,
    pub map: MapSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Timeout for downloading the article page.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: concat!("newsmap/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl FetchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    /// Article text beyond this many characters is not sent to the model.
    pub max_article_chars: usize,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-flash".to_string(),
            max_article_chars: 24_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeocoderSettings {
    pub base_url: String,
    /// Nominatim's usage policy requires an identifying User-Agent.
    pub user_agent: String,
}

impl Default for GeocoderSettings {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: "newsmap".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MapSettings {
    pub tile_url: String,
    pub tile_attribution: String,
    pub tile_subdomains: String,
    pub max_zoom: u8,
    /// Where an empty map is centered.
    pub default_center: Coordinate,
    pub default_zoom: u8,
    /// Zoom used when exactly one location is shown.
    pub single_zoom: u8,
    /// Height of the embedded map in pixels.
    pub height_px: u32,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            tile_url: "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png".to_string(),
            tile_attribution: "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors &copy; <a href=\"https://carto.com/\">CARTO</a>".to_string(),
            tile_subdomains: "abcd".to_string(),
            max_zoom: 20,
            default_center: Coordinate {
                latitude: 20.0,
                longitude: 0.0,
            },
            default_zoom: 2,
            single_zoom: 7,
            height_px: 500,
        }
    }
}

impl Settings {
    /// Load settings from a YAML file, or the defaults when no path is given.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&str>) -> Result<Self> {
        let Some(path) = path else {
            info!("No settings file given; using defaults");
            return Ok(Self::default());
        };

        let yaml = fs::read_to_string(path)
            .await
            .map_err(|e| NewsMapError::Config(format!("{path}: {e}")))?;
        let settings = Self::from_yaml(&yaml)
            .map_err(|e| NewsMapError::Config(format!("{path}: {e}")))?;
        info!(%path, model = %settings.llm.model, "Loaded settings file");
        Ok(settings)
    }

    pub fn from_yaml(yaml: &str) -> std::result::Result<Self, serde_yaml::Error> {
        // An empty file deserializes to unit, not to an empty mapping.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml)
    }
}
