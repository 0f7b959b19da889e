//! The seam between the map controller and whatever actually draws the map.
//!
//! A [`MapProvider`] stands for the mapping library itself: it may need to
//! fetch assets before it can be used, and it builds [`MapInstance`]s bound to
//! a host container. The controller never reaches for a global library handle;
//! the provider is handed to it once.

use crate::model::LatLng;
use crate::status::MarkerColor;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Regional centroid used when the host does not pick a center.
pub const DEFAULT_CENTER: LatLng = LatLng::new(-27.2423, -49.6401);
pub const DEFAULT_ZOOM: f64 = 9.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapView {
    pub center: LatLng,
    pub zoom: f64,
}

impl MapView {
    pub fn new(center: LatLng, zoom: f64) -> Self {
        Self { center, zoom }
    }
}

impl Default for MapView {
    fn default() -> Self {
        Self::new(DEFAULT_CENTER, DEFAULT_ZOOM)
    }
}

/// Handle the engine hands back for every marker it places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(pub u64);

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "marker#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    pub title: String,
    pub lines: Vec<String>,
}

impl Popup {
    pub fn to_text(&self) -> String {
        let mut text = self.title.clone();
        for line in &self.lines {
            text.push('\n');
            text.push_str(line);
        }
        text
    }
}

/// Everything an engine needs to draw one pin.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub position: LatLng,
    pub label: String,
    pub color: MarkerColor,
    pub popup: Popup,
    /// Whether clicks on this marker should be reported back.
    pub clickable: bool,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("map library failed to load: {0}")]
    Load(String),

    #[error("map construction failed: {0}")]
    Construction(String),

    #[error("marker construction failed: {0}")]
    Marker(String),
}

pub type LoadFuture = BoxFuture<'static, Result<(), ProviderError>>;

pub trait MapProvider {
    /// Whatever the host mounts the map into.
    type Container;
    type Map: MapInstance;

    /// True once the library can build maps without loading anything.
    fn is_available(&self) -> bool;

    /// Start fetching the library's assets. The controller calls this at most
    /// once and waits for the future on a background task.
    fn load(&self) -> LoadFuture;

    fn create_map(
        &self,
        container: &Self::Container,
        view: &MapView,
    ) -> Result<Self::Map, ProviderError>;
}

pub trait MapInstance {
    fn add_marker(&mut self, marker: &MarkerSpec) -> Result<MarkerId, ProviderError>;

    fn remove_marker(&mut self, id: MarkerId);

    /// Re-measure the container and redraw at the new size.
    fn invalidate_size(&mut self);

    fn set_view(&mut self, view: &MapView);

    /// Tear the map down. Markers are removed by the caller beforehand.
    fn destroy(self);
}
