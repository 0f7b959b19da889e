// On-disk configuration (~/.config/obramap/config.json)

use crate::engine::{DEFAULT_CENTER, DEFAULT_ZOOM, MapView};
use crate::error::{Error, Result};
use crate::map::SettleDelays;
use crate::model::LatLng;
use obramap_source::{DEFAULT_ORDER, DEFAULT_PAGE_SIZE, DEFAULT_VIEW};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_CONFIG_DIR: &str = "~/.config/obramap/";
pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub map: MapConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub url: Option<Url>,
    pub api_key: Option<String>,
    pub view: String,
    pub page_size: Option<usize>,
    /// PostgREST `order` used while paging; empty disables ordering.
    pub order: String,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            view: DEFAULT_VIEW.to_string(),
            page_size: Some(DEFAULT_PAGE_SIZE),
            order: DEFAULT_ORDER.to_string(),
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// `[latitude, longitude]`
    pub center: [f64; 2],
    pub zoom: f64,
    pub settle_init_ms: u64,
    pub settle_markers_ms: u64,
    pub resize_debounce_ms: u64,
    /// Optional GeoJSON outline drawn under the markers.
    pub basemap: Option<PathBuf>,
}

impl Default for MapConfig {
    fn default() -> Self {
        let delays = SettleDelays::default();
        Self {
            center: [DEFAULT_CENTER.lat, DEFAULT_CENTER.lng],
            zoom: DEFAULT_ZOOM,
            settle_init_ms: delays.init.as_millis() as u64,
            settle_markers_ms: delays.markers.as_millis() as u64,
            resize_debounce_ms: delays.resize_debounce.as_millis() as u64,
            basemap: None,
        }
    }
}

impl MapConfig {
    pub fn view(&self) -> MapView {
        MapView::new(LatLng::from(self.center), self.zoom)
    }

    pub fn settle_delays(&self) -> SettleDelays {
        SettleDelays {
            init: Duration::from_millis(self.settle_init_ms),
            markers: Duration::from_millis(self.settle_markers_ms),
            resize_debounce: Duration::from_millis(self.resize_debounce_ms),
        }
    }
}

/// Expand `~` in a user-supplied path.
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

impl Config {
    pub fn default_dir() -> PathBuf {
        expand_path(DEFAULT_CONFIG_DIR)
    }

    pub fn default_path() -> PathBuf {
        Self::default_dir().join(CONFIG_FILE_NAME)
    }

    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| Error::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults when the file does not exist; any other failure is reported.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if Self::exists(path) {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let io_error = |source| Error::ConfigIo {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, content).map_err(io_error)
    }
}
