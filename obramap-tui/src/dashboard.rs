use crate::terminal_map::{MapSurface, SharedSurface, TerminalProvider, degrees_per_column, render_map};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use obramap_core::config::{BackendConfig, Config, expand_path};
use obramap_core::data::{fetch_constructions, source_from_config};
use obramap_core::engine::MapView;
use obramap_core::filter::{Category, ConstructionFilter, categories, cities};
use obramap_core::map::{ControllerEvent, MapController, MarkerClickCallback, ReadyCallback};
use obramap_core::model::{Construction, LatLng};
use obramap_core::status::marker_color;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

const MIN_ZOOM: f64 = 1.0;
const MAX_ZOOM: f64 = 18.0;
const MAX_LOG_LINES: usize = 500;

/// Messages from background work (the fetch task, map callbacks) to the UI.
#[derive(Debug, Clone)]
pub enum ShellMessage {
    Loaded(Vec<Construction>),
    LoadFailed(String),
    MarkerClicked(Box<Construction>),
    MapReady,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Loading,
    Ready,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputMode {
    Normal,
    Search,
}

pub struct Dashboard {
    controller: MapController<TerminalProvider>,
    surface: SharedSurface,
    records: Vec<Construction>,
    visible: Arc<Vec<Construction>>,
    filter: ConstructionFilter,
    categories: Vec<Category>,
    cities: Vec<String>,
    selected: Option<usize>,
    details: Option<Construction>,
    load_state: LoadState,
    input_mode: InputMode,
    logs: Vec<(LogLevel, String)>,
    should_quit: bool,
    tx: mpsc::UnboundedSender<ShellMessage>,
    rx: mpsc::UnboundedReceiver<ShellMessage>,
}

impl Dashboard {
    pub fn new(config: &Config) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        let click_tx = tx.clone();
        let on_click: MarkerClickCallback = Arc::new(move |record: &Construction| {
            let _ = click_tx.send(ShellMessage::MarkerClicked(Box::new(record.clone())));
        });
        let ready_tx = tx.clone();
        let on_ready: ReadyCallback = Arc::new(move || {
            let _ = ready_tx.send(ShellMessage::MapReady);
        });

        let basemap = config.map.basemap.as_ref().map(|p| expand_path(&p.to_string_lossy()));
        let provider = TerminalProvider::new(basemap);
        let controller = MapController::new(provider)
            .with_view(config.map.view())
            .with_settle_delays(config.map.settle_delays())
            .with_marker_click(on_click)
            .with_ready_callback(on_ready);

        Self {
            controller,
            surface: MapSurface::shared(),
            records: Vec::new(),
            visible: Arc::new(Vec::new()),
            filter: ConstructionFilter::default(),
            categories: Vec::new(),
            cities: Vec::new(),
            selected: None,
            details: None,
            load_state: LoadState::Loading,
            input_mode: InputMode::Normal,
            logs: Vec::new(),
            should_quit: false,
            tx,
            rx,
        }
    }

    pub fn mount(&mut self) {
        self.controller.mount(SharedSurface::clone(&self.surface));
    }

    pub fn unmount(&mut self) {
        self.controller.unmount();
    }

    /// Kick off the one-shot fetch. The result arrives as a [`ShellMessage`].
    pub fn start_fetch(&mut self, backend: &BackendConfig) {
        let source = match source_from_config(backend) {
            Ok(source) => source,
            Err(e) => {
                self.fail_load(e.to_string());
                return;
            }
        };

        self.log(LogLevel::Info, format!("Fetching constructions from {}", source.endpoint()));
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let message = match fetch_constructions(&source).await {
                Ok(records) => ShellMessage::Loaded(records),
                Err(e) => ShellMessage::LoadFailed(e.to_string()),
            };
            let _ = tx.send(message);
        });
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<ShellMessage> {
        self.tx.clone()
    }

    pub fn controller(&self) -> &MapController<TerminalProvider> {
        &self.controller
    }

    pub fn surface(&self) -> &SharedSurface {
        &self.surface
    }

    pub fn visible(&self) -> &Arc<Vec<Construction>> {
        &self.visible
    }

    pub fn filter(&self) -> &ConstructionFilter {
        &self.filter
    }

    pub fn details(&self) -> Option<&Construction> {
        self.details.as_ref()
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn input_mode(&self) -> InputMode {
        self.input_mode
    }

    pub fn logs(&self) -> &[(LogLevel, String)] {
        &self.logs
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Drain background messages, then let the map controller catch up.
    pub fn tick(&mut self) {
        self.process_messages();
        self.controller.process_pending();
    }

    fn process_messages(&mut self) {
        while let Ok(msg) = self.rx.try_recv() {
            match msg {
                ShellMessage::Loaded(records) => {
                    self.log(LogLevel::Info, format!("Loaded {} constructions", records.len()));
                    if !records.is_empty() && !records.iter().any(Construction::has_coordinates) {
                        self.log(LogLevel::Warn, "No construction has coordinates to map".to_string());
                    }
                    self.records = records;
                    self.categories = categories(&self.records);
                    self.cities = cities(&self.records);
                    self.load_state = LoadState::Ready;
                    self.apply_filter();
                }
                ShellMessage::LoadFailed(message) => self.fail_load(message),
                ShellMessage::MarkerClicked(record) => {
                    self.log(LogLevel::Info, format!("Selected construction {}", record.id));
                    self.selected = self.visible.iter().position(|r| r.id == record.id);
                    self.details = Some(*record);
                }
                ShellMessage::MapReady => self.log(LogLevel::Info, "Map loaded successfully".to_string()),
            }
        }
    }

    fn fail_load(&mut self, message: String) {
        error!("Failed to load constructions: {}", message);
        self.log(LogLevel::Error, format!("Failed to load constructions: {}", message));
        self.records.clear();
        self.categories.clear();
        self.cities.clear();
        self.load_state = LoadState::Failed(message);
        self.apply_filter();
    }

    fn log(&mut self, level: LogLevel, message: String) {
        match level {
            LogLevel::Info => info!("{}", message),
            LogLevel::Warn => warn!("{}", message),
            LogLevel::Error => {}
        }
        self.logs.push((level, message));
        if self.logs.len() > MAX_LOG_LINES {
            self.logs.drain(0..self.logs.len() - MAX_LOG_LINES);
        }
    }

    /// Recompute the visible list and hand it to the map as a new list.
    fn apply_filter(&mut self) {
        self.visible = Arc::new(self.filter.apply(&self.records));
        self.selected = match self.selected {
            _ if self.visible.is_empty() => None,
            Some(i) => Some(i.min(self.visible.len() - 1)),
            None => None,
        };
        self.controller.set_constructions(Arc::clone(&self.visible));
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
            Event::Resize(_, _) => self.controller.notify_resize(),
            _ => {}
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match self.input_mode {
            InputMode::Search => match key.code {
                KeyCode::Char(c) => {
                    self.filter.search.push(c);
                    self.apply_filter();
                }
                KeyCode::Backspace => {
                    self.filter.search.pop();
                    self.apply_filter();
                }
                KeyCode::Enter | KeyCode::Esc => self.input_mode = InputMode::Normal,
                _ => {}
            },
            InputMode::Normal => self.handle_normal_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc => {
                let had_focus = self.surface.borrow().focused().is_some();
                if had_focus {
                    self.surface.borrow_mut().clear_focus();
                } else if self.details.is_some() {
                    self.details = None;
                } else {
                    self.should_quit = true;
                }
            }
            KeyCode::Char('/') => self.input_mode = InputMode::Search,
            KeyCode::Char('s') => {
                let statuses: Vec<String> = self.categories.iter().map(|c| c.status.clone()).collect();
                self.filter.status = cycle(&statuses, self.filter.status.as_deref());
                self.apply_filter();
            }
            KeyCode::Char('c') => {
                self.filter.city = cycle(&self.cities, self.filter.city.as_deref());
                self.apply_filter();
            }
            KeyCode::Char('x') => {
                self.filter = ConstructionFilter::default();
                self.apply_filter();
            }
            KeyCode::Up => self.move_selection(-1),
            KeyCode::Down => self.move_selection(1),
            KeyCode::PageUp => self.move_selection(-10),
            KeyCode::PageDown => self.move_selection(10),
            KeyCode::Home => self.selected = (!self.visible.is_empty()).then_some(0),
            KeyCode::End => self.selected = self.visible.len().checked_sub(1),
            KeyCode::Tab => {
                self.surface.borrow_mut().focus_next();
            }
            KeyCode::BackTab => {
                self.surface.borrow_mut().focus_prev();
            }
            KeyCode::Enter => self.activate(),
            KeyCode::Char('+') | KeyCode::Char('=') => self.zoom_by(1.0),
            KeyCode::Char('-') => self.zoom_by(-1.0),
            KeyCode::Char('h') => self.pan_by(0.0, -1.0),
            KeyCode::Char('l') => self.pan_by(0.0, 1.0),
            KeyCode::Char('k') => self.pan_by(1.0, 0.0),
            KeyCode::Char('j') => self.pan_by(-1.0, 0.0),
            _ => {}
        }
    }

    fn move_selection(&mut self, delta: isize) {
        if self.visible.is_empty() {
            return;
        }
        let last = self.visible.len() - 1;
        let next = match self.selected {
            Some(current) => current.saturating_add_signed(delta).min(last),
            None if delta < 0 => last,
            None => 0,
        };
        self.selected = Some(next);
    }

    /// Enter: click the focused marker, or open the selected list entry.
    fn activate(&mut self) {
        let focused = self
            .surface
            .borrow()
            .focused()
            .filter(|(_, spec)| spec.clickable)
            .map(|(id, _)| id);
        if let Some(id) = focused {
            let _ = self.controller.event_sender().send(ControllerEvent::MarkerClicked(id));
            return;
        }

        let Some(record) = self.selected.and_then(|i| self.visible.get(i)).cloned() else {
            return;
        };
        if let Some(position) = record.position() {
            let zoom = self.controller.view().zoom;
            self.controller.set_view(MapView::new(position, zoom));
        }
        self.details = Some(record);
    }

    fn zoom_by(&mut self, delta: f64) {
        let view = self.controller.view();
        let zoom = (view.zoom + delta).clamp(MIN_ZOOM, MAX_ZOOM);
        self.controller.set_view(MapView::new(view.center, zoom));
    }

    /// Pan by a fixed number of terminal columns at the current zoom.
    fn pan_by(&mut self, lat_steps: f64, lng_steps: f64) {
        let view = self.controller.view();
        let step = degrees_per_column(view.zoom) * 8.0;
        let center = LatLng::new(
            (view.center.lat + lat_steps * step).clamp(-85.0, 85.0),
            (view.center.lng + lng_steps * step).clamp(-180.0, 180.0),
        );
        self.controller.set_view(MapView::new(center, view.zoom));
    }

    pub fn render(&self, f: &mut Frame) {
        let vertical_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Filter bar
                Constraint::Length(3), // Categories
                Constraint::Min(10),   // Main area
                Constraint::Length(1), // Hints bar
            ])
            .split(f.area());

        let main_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(vertical_chunks[2]);

        let right_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(6),     // List
                Constraint::Length(12), // Details
                Constraint::Length(7),  // Logs
            ])
            .split(main_chunks[1]);

        self.render_filter_bar(f, vertical_chunks[0]);
        self.render_categories(f, vertical_chunks[1]);
        self.render_map_panel(f, main_chunks[0]);
        self.render_list(f, right_chunks[0]);
        self.render_details(f, right_chunks[1]);
        self.render_logs(f, right_chunks[2]);
        self.render_hints(f, vertical_chunks[3]);
    }

    fn render_filter_bar(&self, f: &mut Frame, area: Rect) {
        let searching = self.input_mode == InputMode::Search;
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Filters ")
            .border_style(Style::default().fg(if searching { Color::Yellow } else { Color::Cyan }));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let label = Style::default().fg(Color::DarkGray);
        let value = Style::default().fg(Color::White).add_modifier(Modifier::BOLD);
        let prompt = "Search: ";
        let line = Line::from(vec![
            Span::styled(prompt, label),
            Span::styled(self.filter.search.clone(), value),
            Span::raw("   "),
            Span::styled("Status: ", label),
            Span::styled(self.filter.status.clone().unwrap_or_else(|| "all".to_string()), value),
            Span::raw("   "),
            Span::styled("City: ", label),
            Span::styled(self.filter.city.clone().unwrap_or_else(|| "all".to_string()), value),
        ]);
        f.render_widget(Paragraph::new(line), inner);

        if searching {
            f.set_cursor_position((
                inner.x + (prompt.len() + self.filter.search.chars().count()) as u16,
                inner.y,
            ));
        }
    }

    fn render_categories(&self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Categories ")
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(area);
        f.render_widget(block, area);

        if self.categories.is_empty() {
            f.render_widget(
                Paragraph::new("No categories").style(Style::default().fg(Color::DarkGray)),
                inner,
            );
            return;
        }

        let mut spans = Vec::new();
        for category in &self.categories {
            let (r, g, b) = category.color.rgb();
            let active = self
                .filter
                .status
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case(&category.status));
            let mut style = Style::default().fg(Color::White);
            if active {
                style = style.bg(Color::DarkGray).add_modifier(Modifier::BOLD);
            }
            spans.push(Span::styled("● ", Style::default().fg(Color::Rgb(r, g, b))));
            spans.push(Span::styled(format!("{} {}", category.status, category.count), style));
            spans.push(Span::raw("  "));
        }
        f.render_widget(Paragraph::new(Line::from(spans)), inner);
    }

    fn render_map_panel(&self, f: &mut Frame, area: Rect) {
        let view = self.controller.view();
        let title = format!(
            " Map ({} markers, zoom {}) ",
            self.controller.marker_count(),
            view.zoom
        );
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(area);
        self.surface.borrow_mut().set_viewport(inner);

        if let Some(message) = self.controller.error() {
            let paragraph = Paragraph::new(message.to_string())
                .block(block)
                .style(Style::default().fg(Color::Red))
                .wrap(Wrap { trim: true });
            f.render_widget(paragraph, area);
            return;
        }

        if !self.controller.is_loaded() {
            let paragraph = Paragraph::new("Loading map...")
                .block(block)
                .style(Style::default().fg(Color::DarkGray));
            f.render_widget(paragraph, area);
            return;
        }

        let surface = self.surface.borrow();
        render_map(f, area, &surface, block);

        if let Some((_, spec)) = surface.focused() {
            let height = (spec.popup.lines.len() as u16 + 2).min(inner.height);
            let width = inner.width.min(48);
            let popup_area = Rect {
                x: inner.x,
                y: inner.y + inner.height.saturating_sub(height),
                width,
                height,
            };
            let lines: Vec<Line> = spec.popup.lines.iter().map(|l| Line::from(l.clone())).collect();
            let popup = Paragraph::new(lines)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(format!(" {} ", spec.popup.title))
                        .border_style(Style::default().fg(Color::Yellow)),
                )
                .wrap(Wrap { trim: true });
            f.render_widget(Clear, popup_area);
            f.render_widget(popup, popup_area);
        }
    }

    fn render_list(&self, f: &mut Frame, area: Rect) {
        let title = format!(" Constructions ({}/{}) ", self.visible.len(), self.records.len());
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let height = inner.height as usize;
        let total_items = self.visible.len();

        if total_items == 0 {
            let (message, color) = match self.load_state {
                LoadState::Loading => ("Loading constructions...".to_string(), Color::DarkGray),
                LoadState::Failed(ref e) => (format!("No constructions to show. {}", e), Color::Red),
                LoadState::Ready => ("No constructions match the filters".to_string(), Color::DarkGray),
            };
            let empty_msg = Paragraph::new(message)
                .style(Style::default().fg(color))
                .wrap(Wrap { trim: true });
            f.render_widget(empty_msg, inner);
            return;
        }

        // Keep the selection inside the viewport.
        let scroll_offset = match self.selected {
            Some(selected) if selected >= height => selected + 1 - height,
            _ => 0,
        };

        let items: Vec<ListItem> = self
            .visible
            .iter()
            .enumerate()
            .skip(scroll_offset)
            .take(height)
            .map(|(idx, record)| {
                let (r, g, b) = marker_color(Some(record.status.as_str())).rgb();
                let name = record.display_name().unwrap_or(record.id.as_str());
                let pin = if record.has_coordinates() { "●" } else { "○" };
                let mut style = Style::default().fg(Color::White);
                if Some(idx) == self.selected {
                    style = style.bg(Color::DarkGray).add_modifier(Modifier::BOLD);
                }
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{} ", pin), Style::default().fg(Color::Rgb(r, g, b))),
                    Span::styled(format!("{} ", name), style),
                    Span::styled(record.city.clone(), Style::default().fg(Color::DarkGray)),
                ]))
            })
            .collect();

        f.render_widget(List::new(items), inner);

        if total_items > height {
            render_scrollbar(f, area, total_items, height, scroll_offset);
        }
    }

    fn render_details(&self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Details ")
            .border_style(Style::default().fg(Color::Green));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let Some(ref record) = self.details else {
            f.render_widget(
                Paragraph::new("Select a construction (Enter) or a marker (Tab, Enter)")
                    .style(Style::default().fg(Color::DarkGray))
                    .wrap(Wrap { trim: true }),
                inner,
            );
            return;
        };

        let field = |label: &'static str, value: String| {
            Line::from(vec![
                Span::styled(format!("{:<12}", label), Style::default().fg(Color::DarkGray)),
                Span::raw(if value.trim().is_empty() { "N/A".to_string() } else { value }),
            ])
        };
        let (r, g, b) = marker_color(Some(record.status.as_str())).rgb();
        let text = vec![
            Line::from(Span::styled(
                record
                    .display_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Construction {}", record.id)),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            )),
            Line::from(vec![
                Span::styled(format!("{:<12}", "Status"), Style::default().fg(Color::DarkGray)),
                Span::styled(record.status.clone(), Style::default().fg(Color::Rgb(r, g, b))),
            ]),
            field("License", record.license_type.clone()),
            field("CNPJ", record.cnpj.clone()),
            field("Address", record.address.clone()),
            field("City", record.city.clone()),
            field("Date", record.date.clone()),
            field("Built area", format!("{} m²", record.built_area)),
            field("Land area", format!("{} m²", record.land_area)),
            field(
                "Location",
                record
                    .position()
                    .map(|p| format!("{:.5}, {:.5}", p.lat, p.lng))
                    .unwrap_or_default(),
            ),
        ];
        f.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }), inner);
    }

    fn render_logs(&self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Logs ")
            .border_style(Style::default().fg(Color::Magenta));

        let inner = block.inner(area);
        f.render_widget(block, area);

        let height = inner.height as usize;
        let scroll_offset = self.logs.len().saturating_sub(height);

        let items: Vec<ListItem> = self
            .logs
            .iter()
            .skip(scroll_offset)
            .take(height)
            .map(|(level, message)| {
                let (prefix, style) = match level {
                    LogLevel::Info => ("INFO ", Style::default().fg(Color::Blue)),
                    LogLevel::Warn => ("WARN ", Style::default().fg(Color::Yellow)),
                    LogLevel::Error => ("ERROR", Style::default().fg(Color::Red)),
                };
                ListItem::new(format!("[{}] {}", prefix, message)).style(style)
            })
            .collect();

        f.render_widget(List::new(items), inner);
    }

    fn render_hints(&self, f: &mut Frame, area: Rect) {
        let key = Style::default().fg(Color::Black).bg(Color::Gray);
        let hints = match self.input_mode {
            InputMode::Search => Line::from(vec![
                Span::styled(" Enter/ESC ", key),
                Span::raw(" Done  "),
                Span::styled(" Backspace ", key),
                Span::raw(" Delete"),
            ]),
            InputMode::Normal => Line::from(vec![
                Span::styled(" q ", key),
                Span::raw(" Quit  "),
                Span::styled(" / ", key),
                Span::raw(" Search  "),
                Span::styled(" s/c ", key),
                Span::raw(" Status/City  "),
                Span::styled(" x ", key),
                Span::raw(" Clear  "),
                Span::styled(" ↑/↓ ", key),
                Span::raw(" Select  "),
                Span::styled(" Tab ", key),
                Span::raw(" Markers  "),
                Span::styled(" Enter ", key),
                Span::raw(" Open  "),
                Span::styled(" +/- hjkl ", key),
                Span::raw(" Zoom/Pan"),
            ]),
        };

        let paragraph = Paragraph::new(hints).style(Style::default().bg(Color::Black).fg(Color::Gray));
        f.render_widget(paragraph, area);
    }
}

/// Next option after `current`, wrapping back to "no filter" after the last.
fn cycle(options: &[String], current: Option<&str>) -> Option<String> {
    let next = match current {
        None => 0,
        Some(current) => match options.iter().position(|o| o.eq_ignore_ascii_case(current)) {
            Some(i) => i + 1,
            None => 0,
        },
    };
    options.get(next).cloned()
}

fn render_scrollbar(f: &mut Frame, area: Rect, total_items: usize, visible_items: usize, scroll_offset: usize) {
    let scrollbar_height = area.height.saturating_sub(2) as usize;
    if scrollbar_height == 0 || total_items <= visible_items {
        return;
    }

    let thumb_size = ((visible_items as f32 / total_items as f32) * scrollbar_height as f32)
        .max(1.0)
        .floor() as usize;
    let scroll_ratio = scroll_offset as f32 / (total_items - visible_items) as f32;
    let thumb_position = (scroll_ratio * scrollbar_height.saturating_sub(thumb_size) as f32).floor() as usize;

    let scrollbar_x = area.x + area.width - 1;
    let scrollbar_start_y = area.y + 1;

    for i in 0..scrollbar_height {
        let in_thumb = i >= thumb_position && i < thumb_position + thumb_size;
        let (symbol, style) = if in_thumb {
            ("█", Style::default().fg(Color::Cyan))
        } else {
            ("│", Style::default().fg(Color::DarkGray))
        };
        f.render_widget(
            Paragraph::new(symbol).style(style),
            Rect {
                x: scrollbar_x,
                y: scrollbar_start_y + i as u16,
                width: 1,
                height: 1,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;
    use ratatui::{Terminal, backend::TestBackend};
    use std::time::Duration;

    fn record(id: &str, company: &str, city: &str, status: &str, lat: f64, lng: f64) -> Construction {
        Construction {
            id: id.to_string(),
            company_name: company.to_string(),
            city: city.to_string(),
            status: status.to_string(),
            latitude: lat,
            longitude: lng,
            ..Default::default()
        }
    }

    fn sample() -> Vec<Construction> {
        vec![
            record("1", "Construtora Vale", "Blumenau", "aprovada", -26.91, -49.07),
            record("2", "Itajaí Engenharia", "Itajaí", "consulta", -26.90, -48.66),
            record("3", "Sem Local", "Blumenau", "aprovada", 0.0, 0.0),
        ]
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    async fn settle(dashboard: &mut Dashboard) {
        for _ in 0..6 {
            tokio::time::sleep(Duration::from_millis(250)).await;
            dashboard.tick();
        }
    }

    async fn loaded_dashboard() -> Dashboard {
        let mut dashboard = Dashboard::new(&Config::default());
        dashboard.mount();
        dashboard.sender().send(ShellMessage::Loaded(sample())).unwrap();
        settle(&mut dashboard).await;
        dashboard
    }

    #[test]
    fn test_cycle_wraps_to_none() {
        let options = vec!["a".to_string(), "b".to_string()];
        assert_eq!(cycle(&options, None), Some("a".to_string()));
        assert_eq!(cycle(&options, Some("A")), Some("b".to_string()));
        assert_eq!(cycle(&options, Some("b")), None);
        assert_eq!(cycle(&[], None), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loaded_records_become_markers() {
        let dashboard = loaded_dashboard().await;

        assert_eq!(dashboard.load_state(), &LoadState::Ready);
        assert_eq!(dashboard.visible().len(), 3);
        assert!(dashboard.controller().is_loaded());
        assert_eq!(dashboard.controller().marker_count(), 2);
        assert_eq!(dashboard.surface().borrow().marker_count(), 2);
        assert!(dashboard.surface().borrow().measured().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_and_status_filters_drive_markers() {
        let mut dashboard = loaded_dashboard().await;

        dashboard.handle_key(press(KeyCode::Char('/')));
        assert_eq!(dashboard.input_mode(), InputMode::Search);
        for c in "vale".chars() {
            dashboard.handle_key(press(KeyCode::Char(c)));
        }
        dashboard.handle_key(press(KeyCode::Enter));

        assert_eq!(dashboard.filter().search, "vale");
        assert_eq!(dashboard.visible().len(), 1);
        assert_eq!(dashboard.controller().marker_count(), 1);

        dashboard.handle_key(press(KeyCode::Char('x')));
        dashboard.handle_key(press(KeyCode::Char('s')));
        assert_eq!(dashboard.filter().status.as_deref(), Some("aprovada"));
        assert_eq!(dashboard.visible().len(), 2);
        assert_eq!(dashboard.controller().marker_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_marker_click_opens_details() {
        let mut dashboard = loaded_dashboard().await;

        dashboard.handle_key(press(KeyCode::Tab));
        assert!(dashboard.surface().borrow().focused().is_some());
        dashboard.handle_key(press(KeyCode::Enter));
        dashboard.tick();
        dashboard.tick();

        assert_eq!(dashboard.details().map(|r| r.id.as_str()), Some("1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_enter_centers_map_on_record() {
        let mut dashboard = loaded_dashboard().await;

        dashboard.handle_key(press(KeyCode::Down));
        dashboard.handle_key(press(KeyCode::Down));
        dashboard.handle_key(press(KeyCode::Enter));

        assert_eq!(dashboard.details().map(|r| r.id.as_str()), Some("2"));
        assert_eq!(dashboard.controller().view().center, LatLng::new(-26.90, -48.66));
        assert_eq!(dashboard.surface().borrow().view().center, LatLng::new(-26.90, -48.66));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zoom_keys_are_clamped() {
        let mut dashboard = loaded_dashboard().await;
        for _ in 0..20 {
            dashboard.handle_key(press(KeyCode::Char('+')));
        }
        assert_eq!(dashboard.controller().view().zoom, MAX_ZOOM);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_shows_empty_list() {
        let mut dashboard = Dashboard::new(&Config::default());
        dashboard.mount();
        dashboard
            .sender()
            .send(ShellMessage::LoadFailed("Backend returned 401: Invalid API key".to_string()))
            .unwrap();
        settle(&mut dashboard).await;

        assert!(matches!(dashboard.load_state(), LoadState::Failed(_)));
        assert!(dashboard.visible().is_empty());
        assert!(dashboard.controller().is_loaded());
        assert_eq!(dashboard.controller().marker_count(), 0);
        assert!(dashboard.logs().iter().any(|(level, _)| *level == LogLevel::Error));
    }

    #[tokio::test]
    async fn test_unreadable_basemap_is_reported_after_remount() {
        let mut config = Config::default();
        config.map.basemap = Some(std::path::PathBuf::from("/nonexistent/obramap/basemap.geojson"));
        let mut dashboard = Dashboard::new(&config);

        dashboard.mount();
        dashboard.unmount();
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            dashboard.tick();
        }
        dashboard.mount();

        assert_eq!(
            dashboard.controller().error(),
            Some(obramap_core::map::LIBRARY_LOAD_ERROR)
        );
        assert!(!dashboard.controller().is_loaded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_backend_config_fails_immediately() {
        let mut dashboard = Dashboard::new(&Config::default());
        dashboard.start_fetch(&BackendConfig::default());
        assert!(matches!(dashboard.load_state(), LoadState::Failed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_panels() {
        let mut dashboard = loaded_dashboard().await;
        dashboard.handle_key(press(KeyCode::Tab));

        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| dashboard.render(f)).unwrap();

        let buffer = terminal.backend().buffer().clone();
        let text: String = buffer.content().iter().map(|cell| cell.symbol()).collect();
        assert!(text.contains("Constructions (3/3)"));
        assert!(text.contains("Categories"));
        assert!(text.contains("Status: aprovada"));
        assert_eq!(dashboard.surface().borrow().viewport().width, 70);
    }

    #[tokio::test(start_paused = true)]
    async fn test_escape_quits_when_nothing_is_open() {
        let mut dashboard = loaded_dashboard().await;
        dashboard.handle_key(press(KeyCode::Tab));

        dashboard.handle_key(press(KeyCode::Esc));
        assert!(!dashboard.should_quit());
        dashboard.handle_key(press(KeyCode::Esc));
        assert!(dashboard.should_quit());
    }
}
