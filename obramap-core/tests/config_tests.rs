// Tests for the on-disk configuration

use obramap_core::config::{BackendConfig, Config, MapConfig};
use obramap_core::engine::{DEFAULT_CENTER, DEFAULT_ZOOM};
use obramap_core::error::Error;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;
use url::Url;

#[test]
fn test_defaults() {
    let config = Config::default();

    assert!(config.backend.url.is_none());
    assert!(config.backend.api_key.is_none());
    assert_eq!(config.backend.view, "constructions_view");
    assert_eq!(config.backend.order, "id.asc");
    assert_eq!(config.map.view().center, DEFAULT_CENTER);
    assert_eq!(config.map.view().zoom, DEFAULT_ZOOM);

    let delays = config.map.settle_delays();
    assert_eq!(delays.init, Duration::from_millis(200));
    assert_eq!(delays.markers, Duration::from_millis(100));
    assert_eq!(delays.resize_debounce, Duration::from_millis(100));
}

#[test]
fn test_save_and_load_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let path = dir.path().join("nested").join("config.json");

    let config = Config {
        backend: BackendConfig {
            url: Some(Url::parse("https://abc.supabase.co")?),
            api_key: Some("anon-key".to_string()),
            ..Default::default()
        },
        map: MapConfig {
            center: [-26.3, -48.8],
            zoom: 11.0,
            settle_init_ms: 50,
            ..Default::default()
        },
    };
    config.save(&path)?;

    let loaded = Config::load(&path)?;
    assert_eq!(loaded, config);
    assert_eq!(loaded.map.settle_delays().init, Duration::from_millis(50));

    Ok(())
}

#[test]
fn test_missing_file_yields_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let config = Config::load_or_default(&dir.path().join("absent.json"))?;
    assert_eq!(config, Config::default());
    Ok(())
}

#[test]
fn test_partial_file_fills_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{"map": {"zoom": 12}}"#)?;

    let config = Config::load(&path)?;
    assert_eq!(config.map.zoom, 12.0);
    assert_eq!(config.map.settle_markers_ms, 100);
    assert_eq!(config.backend, BackendConfig::default());
    Ok(())
}

#[test]
fn test_invalid_file_is_reported() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let path = dir.path().join("config.json");
    fs::write(&path, "{ not json")?;

    let err = Config::load_or_default(&path).unwrap_err();
    assert!(matches!(err, Error::ConfigParse { .. }));
    assert!(err.to_string().contains("config.json"));
    Ok(())
}

#[test]
fn test_default_path_is_under_config_dir() {
    let path = Config::default_path();
    assert!(path.ends_with(".config/obramap/config.json"));
}
