pub mod dashboard;
pub mod terminal_map;

pub use dashboard::{Dashboard, LoadState, ShellMessage};
pub use terminal_map::{Basemap, MapSurface, SharedSurface, TerminalMap, TerminalProvider, render_map};

use anyhow::Result;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use obramap_core::config::Config;
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

const TICK: Duration = Duration::from_millis(50);
const INPUT_POLL: Duration = Duration::from_millis(100);

/// Run the dashboard until the user quits.
pub async fn run(config: Config) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_dashboard(&mut terminal, &config).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_dashboard<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, config: &Config) -> Result<()> {
    let mut dashboard = Dashboard::new(config);
    dashboard.mount();
    dashboard.start_fetch(&config.backend);

    let should_exit = Arc::new(AtomicBool::new(false));
    let (input_tx, mut input_rx) = mpsc::unbounded_channel();
    let reader = spawn_input_reader(input_tx, Arc::clone(&should_exit));
    let mut ticker = tokio::time::interval(TICK);

    let result = loop {
        dashboard.tick();
        if let Err(e) = terminal.draw(|f| dashboard.render(f)) {
            break Err(e.into());
        }
        if dashboard.should_quit() {
            break Ok(());
        }

        tokio::select! {
            Some(event) = input_rx.recv() => dashboard.handle_event(event),
            _ = ticker.tick() => {}
        }
    };

    should_exit.store(true, Ordering::Relaxed);
    dashboard.unmount();
    if reader.join().is_err() {
        warn!("Input reader thread panicked");
    }

    result
}

/// Terminal input is blocking, so it is read on its own thread and forwarded.
fn spawn_input_reader(tx: mpsc::UnboundedSender<Event>, should_exit: Arc<AtomicBool>) -> JoinHandle<()> {
    thread::spawn(move || {
        while !should_exit.load(Ordering::Relaxed) {
            match event::poll(INPUT_POLL) {
                Ok(false) => continue,
                Ok(true) => {}
                Err(e) => {
                    warn!("Failed to poll terminal input: {}", e);
                    break;
                }
            }
            match event::read() {
                Ok(event) => {
                    if tx.send(event).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to read terminal input: {}", e);
                    break;
                }
            }
        }
        debug!("Input reader stopped");
    })
}
