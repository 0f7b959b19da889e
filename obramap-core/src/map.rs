//! Map lifecycle and marker synchronization.
//!
//! [`MapController`] owns one map instance for the lifetime of a mounted
//! container. It waits for the engine library, builds the map once, lets the
//! layout settle before reporting itself loaded, and keeps the marker set in
//! step with the record list it is given.
//!
//! Everything runs on the task that owns the controller. Library loads and
//! settle/debounce timers are spawned on the Tokio runtime and report back as
//! [`ControllerEvent`]s through the controller's own channel; the host drains
//! it with [`MapController::process_pending`] or awaits it with
//! [`MapController::step`]. The controller must therefore be driven from
//! inside a Tokio runtime.

use crate::engine::{MapInstance, MapProvider, MapView, MarkerId};
use crate::marker::marker_for;
use crate::model::Construction;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub const LIBRARY_LOAD_ERROR: &str = "Failed to load the map library.";
pub const MAP_INIT_ERROR: &str = "Failed to initialize the map. Showing the list view instead.";

/// Invoked with the exact record behind a clicked marker.
pub type MarkerClickCallback = Arc<dyn Fn(&Construction) + Send + Sync>;

/// Invoked once the map has settled and is reported as loaded.
pub type ReadyCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unloaded,
    LibraryReady,
    Initializing,
    Loaded,
    Error,
    Disposed,
}

/// What the controller exposes to its host.
#[derive(Debug, Clone, PartialEq)]
pub struct MapStatus {
    pub phase: Phase,
    pub loaded: bool,
    pub error: Option<String>,
}

/// Pauses before forcing the engine to re-measure its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleDelays {
    /// After construction, before the map is reported loaded.
    pub init: Duration,
    /// After a marker pass.
    pub markers: Duration,
    /// Quiet period required after the last resize notification.
    pub resize_debounce: Duration,
}

impl Default for SettleDelays {
    fn default() -> Self {
        Self {
            init: Duration::from_millis(200),
            markers: Duration::from_millis(100),
            resize_debounce: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    InitSettle,
    MarkerSettle,
    ResizeDebounce,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    LibraryLoaded,
    LibraryFailed(String),
    TimerElapsed { timer: TimerKind, token: u64 },
    Resized,
    MarkerClicked(MarkerId),
}

struct PlacedMarker {
    id: MarkerId,
    record: Construction,
    bound: bool,
}

struct PendingTimer {
    token: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Timers {
    init_settle: Option<PendingTimer>,
    marker_settle: Option<PendingTimer>,
    resize: Option<PendingTimer>,
}

impl Timers {
    fn slot(&mut self, kind: TimerKind) -> &mut Option<PendingTimer> {
        match kind {
            TimerKind::InitSettle => &mut self.init_settle,
            TimerKind::MarkerSettle => &mut self.marker_settle,
            TimerKind::ResizeDebounce => &mut self.resize,
        }
    }

    fn cancel(&mut self, kind: TimerKind) {
        if let Some(timer) = self.slot(kind).take() {
            timer.handle.abort();
        }
    }

    fn cancel_all(&mut self) {
        self.cancel(TimerKind::InitSettle);
        self.cancel(TimerKind::MarkerSettle);
        self.cancel(TimerKind::ResizeDebounce);
    }

    /// Clears the slot when `token` is the live one; stale tokens are refused.
    fn take_if_current(&mut self, kind: TimerKind, token: u64) -> bool {
        let slot = self.slot(kind);
        if slot.as_ref().is_some_and(|timer| timer.token == token) {
            *slot = None;
            true
        } else {
            false
        }
    }

    fn pending(&self) -> usize {
        [&self.init_settle, &self.marker_settle, &self.resize]
            .iter()
            .filter(|slot| slot.is_some())
            .count()
    }
}

pub struct MapController<P: MapProvider> {
    provider: P,
    view: MapView,
    delays: SettleDelays,
    container: Option<P::Container>,
    map: Option<P::Map>,
    markers: Vec<PlacedMarker>,
    constructions: Arc<Vec<Construction>>,
    on_marker_click: Option<MarkerClickCallback>,
    on_ready: Option<ReadyCallback>,
    phase: Phase,
    error: Option<String>,
    mounted: bool,
    library_ready: bool,
    library_failure: Option<String>,
    load_requested: bool,
    initialized: bool,
    loaded: bool,
    timers: Timers,
    next_token: u64,
    events_tx: mpsc::UnboundedSender<ControllerEvent>,
    events_rx: mpsc::UnboundedReceiver<ControllerEvent>,
}

impl<P: MapProvider> MapController<P> {
    pub fn new(provider: P) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            provider,
            view: MapView::default(),
            delays: SettleDelays::default(),
            container: None,
            map: None,
            markers: Vec::new(),
            constructions: Arc::new(Vec::new()),
            on_marker_click: None,
            on_ready: None,
            phase: Phase::Unloaded,
            error: None,
            mounted: false,
            library_ready: false,
            library_failure: None,
            load_requested: false,
            initialized: false,
            loaded: false,
            timers: Timers::default(),
            next_token: 0,
            events_tx,
            events_rx,
        }
    }

    pub fn with_view(mut self, view: MapView) -> Self {
        self.view = view;
        self
    }

    pub fn with_settle_delays(mut self, delays: SettleDelays) -> Self {
        self.delays = delays;
        self
    }

    pub fn with_marker_click(mut self, callback: MarkerClickCallback) -> Self {
        self.on_marker_click = Some(callback);
        self
    }

    pub fn with_ready_callback(mut self, callback: ReadyCallback) -> Self {
        self.on_ready = Some(callback);
        self
    }

    pub fn status(&self) -> MapStatus {
        MapStatus {
            phase: self.phase,
            loaded: self.loaded,
            error: self.error.clone(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn container(&self) -> Option<&P::Container> {
        self.container.as_ref()
    }

    pub fn view(&self) -> MapView {
        self.view
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.pending()
    }

    /// Sender for engine-side notifications (resizes, marker clicks).
    pub fn event_sender(&self) -> mpsc::UnboundedSender<ControllerEvent> {
        self.events_tx.clone()
    }

    /// Attach the container. Mounting again while mounted is a no-op.
    pub fn mount(&mut self, container: P::Container) {
        if self.mounted {
            debug!("Map container already mounted, ignoring");
            return;
        }

        self.mounted = true;
        self.container = Some(container);
        if self.phase == Phase::Disposed {
            self.phase = if self.library_ready {
                Phase::LibraryReady
            } else {
                Phase::Unloaded
            };
        }

        self.acquire_library();
        if self.library_failure.is_some() {
            self.show_library_failure();
        }
        self.try_initialize();
    }

    /// Tear down in order: markers, then the map, then every ref, so a later
    /// [`mount`](Self::mount) starts from scratch.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        self.timers.cancel_all();

        if let Some(mut map) = self.map.take() {
            info!("Cleaning up map instance");
            for marker in self.markers.drain(..) {
                map.remove_marker(marker.id);
            }
            map.destroy();
        }

        self.markers.clear();
        self.container = None;
        self.initialized = false;
        self.loaded = false;
        self.phase = Phase::Disposed;
    }

    /// Replace the record list. Lists are compared by identity, not content.
    pub fn set_constructions(&mut self, constructions: Arc<Vec<Construction>>) {
        if Arc::ptr_eq(&self.constructions, &constructions) {
            return;
        }
        self.constructions = constructions;
        self.sync_markers();
    }

    /// Replace the click handler. Markers are rebound when its identity changes.
    pub fn set_on_marker_click(&mut self, callback: Option<MarkerClickCallback>) {
        let unchanged = match (&self.on_marker_click, &callback) {
            (Some(current), Some(new)) => Arc::ptr_eq(current, new),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return;
        }
        self.on_marker_click = callback;
        self.sync_markers();
    }

    /// Move the camera. A live map is panned/zoomed in place, never rebuilt.
    pub fn set_view(&mut self, view: MapView) {
        if self.view == view {
            return;
        }
        self.view = view;
        if let Some(map) = self.map.as_mut() {
            debug!("Panning map to {:?} at zoom {}", view.center, view.zoom);
            map.set_view(&view);
        }
    }

    /// Window resize notification. Only honoured while loaded; debounced.
    pub fn notify_resize(&mut self) {
        if !self.loaded || !self.mounted {
            return;
        }
        self.schedule(TimerKind::ResizeDebounce, self.delays.resize_debounce);
    }

    /// Forward a marker click to the handler bound when the marker was placed.
    pub fn click_marker(&self, id: MarkerId) -> bool {
        let Some(marker) = self.markers.iter().find(|m| m.id == id) else {
            debug!("Click on unknown {}", id);
            return false;
        };
        match (&self.on_marker_click, marker.bound) {
            (Some(callback), true) => {
                callback(&marker.record);
                true
            }
            _ => false,
        }
    }

    /// Handle every event already queued, without waiting.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Wait for the next event and handle it.
    pub async fn step(&mut self) -> Option<ControllerEvent> {
        let event = self.events_rx.recv().await?;
        self.handle_event(event.clone());
        Some(event)
    }

    /// The library outcome is recorded even while unmounted; everything else
    /// is dropped until the next mount.
    pub fn handle_event(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::LibraryLoaded => {
                info!("Map library loaded");
                self.mark_library_ready();
                self.try_initialize();
            }
            ControllerEvent::LibraryFailed(reason) => self.record_library_failure(reason),
            event if !self.mounted => debug!("Ignoring {:?} while unmounted", event),
            ControllerEvent::TimerElapsed { timer, token } => {
                if !self.timers.take_if_current(timer, token) {
                    debug!("Dropping stale {:?} timer", timer);
                    return;
                }
                match timer {
                    TimerKind::InitSettle => self.finish_initialization(),
                    TimerKind::MarkerSettle | TimerKind::ResizeDebounce => {
                        if let Some(map) = self.map.as_mut() {
                            map.invalidate_size();
                            debug!("Map size recalculated after {:?}", timer);
                        }
                    }
                }
            }
            ControllerEvent::Resized => self.notify_resize(),
            ControllerEvent::MarkerClicked(id) => {
                self.click_marker(id);
            }
        }
    }

    fn acquire_library(&mut self) {
        if self.library_ready || self.library_failure.is_some() {
            return;
        }
        if self.provider.is_available() {
            self.mark_library_ready();
            return;
        }
        if self.load_requested {
            return;
        }

        self.load_requested = true;
        info!("Loading map library");
        let load = self.provider.load();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let event = match load.await {
                Ok(()) => ControllerEvent::LibraryLoaded,
                Err(e) => ControllerEvent::LibraryFailed(e.to_string()),
            };
            let _ = tx.send(event);
        });
    }

    fn record_library_failure(&mut self, reason: String) {
        if self.library_ready {
            debug!("Ignoring library failure after a successful load: {}", reason);
            return;
        }
        error!("Error loading map library: {}", reason);
        self.library_failure = Some(reason);
        if self.mounted {
            self.show_library_failure();
        }
    }

    fn show_library_failure(&mut self) {
        self.error = Some(LIBRARY_LOAD_ERROR.to_string());
        self.phase = Phase::Error;
    }

    fn mark_library_ready(&mut self) {
        self.library_ready = true;
        if self.phase == Phase::Unloaded {
            self.phase = Phase::LibraryReady;
        }
    }

    fn try_initialize(&mut self) {
        if !self.library_ready || !self.mounted || self.initialized {
            return;
        }
        let Some(container) = self.container.as_ref() else {
            return;
        };

        self.initialized = true;
        self.phase = Phase::Initializing;
        info!("Initializing map");

        match self.provider.create_map(container, &self.view) {
            Ok(map) => {
                self.map = Some(map);
                self.schedule(TimerKind::InitSettle, self.delays.init);
            }
            Err(e) => {
                error!("Error initializing map: {}", e);
                self.error = Some(MAP_INIT_ERROR.to_string());
                self.phase = Phase::Error;
                self.initialized = false;
            }
        }
    }

    fn finish_initialization(&mut self) {
        let Some(map) = self.map.as_mut() else {
            return;
        };
        map.invalidate_size();

        self.loaded = true;
        self.error = None;
        self.phase = Phase::Loaded;
        info!("Map loaded");

        if let Some(ref callback) = self.on_ready {
            callback();
        }
        self.sync_markers();
    }

    fn sync_markers(&mut self) {
        if !self.loaded || !self.library_ready || !self.mounted {
            return;
        }
        let Some(map) = self.map.as_mut() else {
            return;
        };

        for marker in self.markers.drain(..) {
            map.remove_marker(marker.id);
        }

        let bound = self.on_marker_click.is_some();
        let constructions = Arc::clone(&self.constructions);
        let mut skipped = 0usize;

        for record in constructions.iter() {
            let Some(spec) = marker_for(record, bound) else {
                skipped += 1;
                continue;
            };
            match map.add_marker(&spec) {
                Ok(id) => self.markers.push(PlacedMarker {
                    id,
                    record: record.clone(),
                    bound,
                }),
                Err(e) => warn!("Error adding marker for construction {}: {}", record.id, e),
            }
        }

        debug!(
            "Synchronized {} markers ({} records without coordinates)",
            self.markers.len(),
            skipped
        );
        self.schedule(TimerKind::MarkerSettle, self.delays.markers);
    }

    fn schedule(&mut self, kind: TimerKind, delay: Duration) {
        self.timers.cancel(kind);
        self.next_token += 1;
        let token = self.next_token;
        let tx = self.events_tx.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(ControllerEvent::TimerElapsed { timer: kind, token });
        });
        *self.timers.slot(kind) = Some(PendingTimer { token, handle });
    }
}

impl<P: MapProvider> Drop for MapController<P> {
    fn drop(&mut self) {
        self.unmount();
    }
}
