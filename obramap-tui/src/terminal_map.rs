//! A map engine that draws into a terminal.
//!
//! The container is a [`SharedSurface`]: the dashboard records the area it
//! gives the map on every frame, and the engine only picks that size up when
//! asked to re-measure. The optional basemap (a GeoJSON outline file) is the
//! asset that has to be loaded before maps can be built.

use futures::FutureExt;
use obramap_core::engine::{
    LoadFuture, MapInstance, MapProvider, MapView, MarkerId, MarkerSpec, ProviderError,
};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    symbols,
    text::Span,
    widgets::{
        Block,
        canvas::{Canvas, Line as CanvasLine, Map, MapResolution},
    },
};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

/// Polylines in `(longitude, latitude)` order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Basemap {
    pub lines: Vec<Vec<(f64, f64)>>,
}

impl Basemap {
    pub fn from_geojson(text: &str) -> Result<Self, ProviderError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| ProviderError::Load(format!("invalid GeoJSON: {}", e)))?;
        let mut basemap = Basemap::default();
        collect_geometry(&value, &mut basemap.lines);
        if basemap.lines.is_empty() {
            return Err(ProviderError::Load("GeoJSON contains no line or polygon geometry".to_string()));
        }
        Ok(basemap)
    }

    pub async fn load(path: &Path) -> Result<Self, ProviderError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ProviderError::Load(format!("{}: {}", path.display(), e)))?;
        Self::from_geojson(&text)
    }
}

fn collect_geometry(value: &Value, out: &mut Vec<Vec<(f64, f64)>>) {
    match value.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => {
            for feature in value.get("features").and_then(Value::as_array).into_iter().flatten() {
                collect_geometry(feature, out);
            }
        }
        Some("Feature") => {
            if let Some(geometry) = value.get("geometry") {
                collect_geometry(geometry, out);
            }
        }
        Some("GeometryCollection") => {
            for geometry in value.get("geometries").and_then(Value::as_array).into_iter().flatten() {
                collect_geometry(geometry, out);
            }
        }
        Some("LineString") => push_ring(value.get("coordinates"), out),
        Some("MultiLineString") | Some("Polygon") => {
            for ring in value.get("coordinates").and_then(Value::as_array).into_iter().flatten() {
                push_ring(Some(ring), out);
            }
        }
        Some("MultiPolygon") => {
            for polygon in value.get("coordinates").and_then(Value::as_array).into_iter().flatten() {
                for ring in polygon.as_array().into_iter().flatten() {
                    push_ring(Some(ring), out);
                }
            }
        }
        _ => {}
    }
}

fn push_ring(coordinates: Option<&Value>, out: &mut Vec<Vec<(f64, f64)>>) {
    let points: Vec<(f64, f64)> = coordinates
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|point| {
            let pair = point.as_array()?;
            Some((pair.first()?.as_f64()?, pair.get(1)?.as_f64()?))
        })
        .collect();
    if points.len() >= 2 {
        out.push(points);
    }
}

/// Everything the terminal engine draws, shared between the dashboard (which
/// owns the screen) and the map instance (which owns the content).
#[derive(Debug, Default)]
pub struct MapSurface {
    viewport: Rect,
    measured: Option<Rect>,
    hosted: bool,
    view: MapView,
    markers: BTreeMap<MarkerId, MarkerSpec>,
    focused: Option<MarkerId>,
    basemap: Option<Arc<Basemap>>,
}

pub type SharedSurface = Rc<RefCell<MapSurface>>;

impl MapSurface {
    pub fn shared() -> SharedSurface {
        Rc::new(RefCell::new(MapSurface::default()))
    }

    /// Area the host laid the map out in on the last frame.
    pub fn set_viewport(&mut self, area: Rect) {
        self.viewport = area;
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    /// Size the map was last measured at, if ever.
    pub fn measured(&self) -> Option<Rect> {
        self.measured
    }

    pub fn is_hosted(&self) -> bool {
        self.hosted
    }

    pub fn view(&self) -> MapView {
        self.view
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn markers(&self) -> impl Iterator<Item = (&MarkerId, &MarkerSpec)> {
        self.markers.iter()
    }

    pub fn focused(&self) -> Option<(MarkerId, &MarkerSpec)> {
        let id = self.focused?;
        self.markers.get(&id).map(|spec| (id, spec))
    }

    pub fn clear_focus(&mut self) {
        self.focused = None;
    }

    pub fn focus_next(&mut self) -> Option<MarkerId> {
        self.focused = match self.focused {
            Some(current) => self
                .markers
                .range(MarkerId(current.0 + 1)..)
                .next()
                .or_else(|| self.markers.iter().next())
                .map(|(id, _)| *id),
            None => self.markers.keys().next().copied(),
        };
        self.focused
    }

    pub fn focus_prev(&mut self) -> Option<MarkerId> {
        self.focused = match self.focused {
            Some(current) => self
                .markers
                .range(..current)
                .next_back()
                .or_else(|| self.markers.iter().next_back())
                .map(|(id, _)| *id),
            None => self.markers.keys().next_back().copied(),
        };
        self.focused
    }

    /// `(x_bounds, y_bounds)` for the current view at the measured size.
    pub fn bounds(&self) -> ([f64; 2], [f64; 2]) {
        let size = self.measured.unwrap_or(self.viewport);
        let per_column = degrees_per_column(self.view.zoom);
        // Terminal cells are roughly twice as tall as they are wide.
        let half_width = f64::from(size.width.max(1)) * per_column / 2.0;
        let half_height = f64::from(size.height.max(1)) * per_column;
        let center = self.view.center;

        (
            [center.lng - half_width, center.lng + half_width],
            [center.lat - half_height, center.lat + half_height],
        )
    }
}

pub fn degrees_per_column(zoom: f64) -> f64 {
    16.0 / 2f64.powf(zoom)
}

/// The terminal "library". Without a basemap file it is available immediately.
pub struct TerminalProvider {
    basemap_path: Option<PathBuf>,
    basemap: Arc<OnceLock<Arc<Basemap>>>,
}

impl TerminalProvider {
    pub fn new(basemap_path: Option<PathBuf>) -> Self {
        Self {
            basemap_path,
            basemap: Arc::new(OnceLock::new()),
        }
    }
}

impl MapProvider for TerminalProvider {
    type Container = SharedSurface;
    type Map = TerminalMap;

    fn is_available(&self) -> bool {
        self.basemap_path.is_none() || self.basemap.get().is_some()
    }

    fn load(&self) -> LoadFuture {
        let Some(path) = self.basemap_path.clone() else {
            return futures::future::ready(Ok(())).boxed();
        };
        let cell = Arc::clone(&self.basemap);

        async move {
            let basemap = Basemap::load(&path).await?;
            info!("Loaded basemap {} ({} lines)", path.display(), basemap.lines.len());
            let _ = cell.set(Arc::new(basemap));
            Ok(())
        }
        .boxed()
    }

    fn create_map(&self, container: &SharedSurface, view: &MapView) -> Result<TerminalMap, ProviderError> {
        let mut surface = container
            .try_borrow_mut()
            .map_err(|_| ProviderError::Construction("map surface is busy".to_string()))?;
        if surface.hosted {
            return Err(ProviderError::Construction(
                "map surface already hosts a map".to_string(),
            ));
        }

        surface.hosted = true;
        surface.view = *view;
        surface.measured = None;
        surface.markers.clear();
        surface.focused = None;
        surface.basemap = self.basemap.get().cloned();
        debug!("Terminal map created at {:?}", view);

        Ok(TerminalMap {
            surface: Rc::clone(container),
            next_id: 1,
        })
    }
}

pub struct TerminalMap {
    surface: SharedSurface,
    next_id: u64,
}

impl MapInstance for TerminalMap {
    fn add_marker(&mut self, marker: &MarkerSpec) -> Result<MarkerId, ProviderError> {
        let on_globe = (-90.0..=90.0).contains(&marker.position.lat)
            && (-180.0..=180.0).contains(&marker.position.lng);
        if !on_globe {
            return Err(ProviderError::Marker(format!(
                "position {}, {} is off the globe",
                marker.position.lat, marker.position.lng
            )));
        }

        let id = MarkerId(self.next_id);
        self.next_id += 1;
        self.surface.borrow_mut().markers.insert(id, marker.clone());
        Ok(id)
    }

    fn remove_marker(&mut self, id: MarkerId) {
        let mut surface = self.surface.borrow_mut();
        surface.markers.remove(&id);
        if surface.focused == Some(id) {
            surface.focused = None;
        }
    }

    fn invalidate_size(&mut self) {
        let mut surface = self.surface.borrow_mut();
        surface.measured = Some(surface.viewport);
    }

    fn set_view(&mut self, view: &MapView) {
        self.surface.borrow_mut().view = *view;
    }

    fn destroy(self) {
        let mut surface = self.surface.borrow_mut();
        surface.hosted = false;
        surface.markers.clear();
        surface.focused = None;
        surface.measured = None;
        debug!("Terminal map destroyed");
    }
}

/// Draw the hosted map into `area`.
pub fn render_map(f: &mut Frame, area: Rect, surface: &MapSurface, block: Block) {
    let (x_bounds, y_bounds) = surface.bounds();

    let canvas = Canvas::default()
        .block(block)
        .marker(symbols::Marker::Braille)
        .x_bounds(x_bounds)
        .y_bounds(y_bounds)
        .paint(|ctx| {
            ctx.draw(&Map {
                color: Color::DarkGray,
                resolution: MapResolution::High,
            });
            if let Some(ref basemap) = surface.basemap {
                for line in &basemap.lines {
                    for pair in line.windows(2) {
                        ctx.draw(&CanvasLine {
                            x1: pair[0].0,
                            y1: pair[0].1,
                            x2: pair[1].0,
                            y2: pair[1].1,
                            color: Color::Gray,
                        });
                    }
                }
            }
            ctx.layer();

            for (id, spec) in &surface.markers {
                let (r, g, b) = spec.color.rgb();
                let focused = surface.focused == Some(*id);
                let (symbol, style) = if focused {
                    ("◉", Style::default().fg(Color::White).add_modifier(Modifier::BOLD))
                } else {
                    ("●", Style::default().fg(Color::Rgb(r, g, b)))
                };
                ctx.print(spec.position.lng, spec.position.lat, Span::styled(symbol, style));
            }
        });

    f.render_widget(canvas, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use obramap_core::engine::Popup;
    use obramap_core::model::LatLng;
    use obramap_core::status::MarkerColor;

    fn spec(lat: f64, lng: f64) -> MarkerSpec {
        MarkerSpec {
            position: LatLng::new(lat, lng),
            label: "1".to_string(),
            color: MarkerColor::APPROVED,
            popup: Popup {
                title: "Obra".to_string(),
                lines: vec![],
            },
            clickable: true,
        }
    }

    #[test]
    fn test_geojson_geometries() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[-49.0, -27.0], [-48.5, -26.5]]}},
                {"type": "Feature", "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}},
                {"type": "Feature", "geometry": {"type": "Point", "coordinates": [5, 5]}}
            ]
        }"#;

        let basemap = Basemap::from_geojson(text).unwrap();
        assert_eq!(basemap.lines.len(), 2);
        assert_eq!(basemap.lines[0], vec![(-49.0, -27.0), (-48.5, -26.5)]);
    }

    #[test]
    fn test_geojson_without_lines_is_an_error() {
        assert!(Basemap::from_geojson(r#"{"type": "Point", "coordinates": [1, 2]}"#).is_err());
        assert!(Basemap::from_geojson("not json").is_err());
    }

    #[tokio::test]
    async fn test_missing_basemap_file_fails_to_load() {
        let provider = TerminalProvider::new(Some(PathBuf::from("/nonexistent/basemap.geojson")));
        assert!(!provider.is_available());
        assert!(matches!(provider.load().await, Err(ProviderError::Load(_))));
        assert!(!provider.is_available());
    }

    #[tokio::test]
    async fn test_basemap_load_makes_provider_available() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sc.geojson");
        std::fs::write(&path, r#"{"type": "LineString", "coordinates": [[0, 0], [1, 1]]}"#).unwrap();

        let provider = TerminalProvider::new(Some(path));
        provider.load().await.unwrap();
        assert!(provider.is_available());

        let surface = MapSurface::shared();
        let _map = provider.create_map(&surface, &MapView::default()).unwrap();
        assert!(surface.borrow().basemap.is_some());
    }

    #[test]
    fn test_one_map_per_surface() {
        let provider = TerminalProvider::new(None);
        let surface = MapSurface::shared();

        let map = provider.create_map(&surface, &MapView::default()).unwrap();
        assert!(surface.borrow().is_hosted());
        assert!(matches!(
            provider.create_map(&surface, &MapView::default()),
            Err(ProviderError::Construction(_))
        ));

        map.destroy();
        assert!(!surface.borrow().is_hosted());
        assert!(provider.create_map(&surface, &MapView::default()).is_ok());
    }

    #[test]
    fn test_markers_and_focus() {
        let provider = TerminalProvider::new(None);
        let surface = MapSurface::shared();
        let mut map = provider.create_map(&surface, &MapView::default()).unwrap();

        let a = map.add_marker(&spec(-27.0, -49.0)).unwrap();
        let b = map.add_marker(&spec(-26.0, -48.0)).unwrap();
        assert!(matches!(map.add_marker(&spec(95.0, 0.0)), Err(ProviderError::Marker(_))));

        let mut s = surface.borrow_mut();
        assert_eq!(s.marker_count(), 2);
        assert_eq!(s.focus_next(), Some(a));
        assert_eq!(s.focus_next(), Some(b));
        assert_eq!(s.focus_next(), Some(a));
        assert_eq!(s.focus_prev(), Some(b));
        drop(s);

        map.remove_marker(b);
        assert!(surface.borrow().focused().is_none());
        assert_eq!(surface.borrow().marker_count(), 1);
    }

    #[test]
    fn test_invalidate_size_picks_up_viewport() {
        let provider = TerminalProvider::new(None);
        let surface = MapSurface::shared();
        let mut map = provider.create_map(&surface, &MapView::default()).unwrap();

        surface.borrow_mut().set_viewport(Rect::new(0, 0, 80, 20));
        assert_eq!(surface.borrow().measured(), None);

        map.invalidate_size();
        assert_eq!(surface.borrow().measured(), Some(Rect::new(0, 0, 80, 20)));

        surface.borrow_mut().set_viewport(Rect::new(0, 0, 120, 40));
        assert_eq!(surface.borrow().measured(), Some(Rect::new(0, 0, 80, 20)));
    }

    #[test]
    fn test_bounds_centered_on_view() {
        let surface = MapSurface::shared();
        let mut s = surface.borrow_mut();
        s.view = MapView::new(LatLng::new(-27.0, -49.0), 9.0);
        s.set_viewport(Rect::new(0, 0, 100, 30));

        let ([x0, x1], [y0, y1]) = s.bounds();
        assert!(((x0 + x1) / 2.0 + 49.0).abs() < 1e-9);
        assert!(((y0 + y1) / 2.0 + 27.0).abs() < 1e-9);
        assert!((x1 - x0 - 100.0 * 16.0 / 512.0).abs() < 1e-9);

        s.view.zoom = 10.0;
        let ([x0_zoomed, x1_zoomed], _) = s.bounds();
        assert!((x1_zoomed - x0_zoomed) < (x1 - x0));
    }
}
