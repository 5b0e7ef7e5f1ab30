// Binary includes library modules - some public API items are only for library consumers
#![allow(unused)]

use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    Terminal,
};
use tracing_subscriber::EnvFilter;

mod api;
mod app;
mod config;
mod data;
mod events;
mod relay;
mod source;
mod subscribe;
mod ui;

use api::ApiClient;
use app::{App, View};
use crate::config::Settings;
use data::{FileBackend, MemoryBackend, StorageBackend, VitalsStore};
use relay::{AlertSink, NotifyRelay};
use source::{ChannelSource, SimulatorConfig, SimulatorHandle};

#[derive(Parser, Debug)]
#[command(name = "esante-monitor")]
#[command(about = "Remote patient-monitoring TUI over MQTT vitals telemetry")]
struct Args {
    /// MQTT broker URL
    #[arg(short, long)]
    broker: Option<String>,

    /// Backend REST base URL (e.g. http://localhost:8084)
    #[arg(long)]
    api: Option<String>,

    /// Notification relay base URL
    #[arg(long)]
    relay: Option<String>,

    /// Bearer token for backend requests
    #[arg(long)]
    token: Option<String>,

    /// Initial patient id (used when the directory is unavailable)
    #[arg(short, long)]
    patient: Option<String>,

    /// Run the built-in gateway simulator instead of connecting to a broker
    #[arg(short, long, conflicts_with = "broker")]
    simulate: bool,

    /// Path to a settings file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for persisted local state
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Seconds between dashboard summary refreshes
    #[arg(short, long, default_value = "30")]
    refresh: u64,

    /// Per-patient sample history cap
    #[arg(long)]
    sample_cap: Option<usize>,

    /// Per-patient alert buffer cap
    #[arg(long)]
    alert_cap: Option<usize>,
}

impl Args {
    /// CLI flags win over the file/environment layers.
    fn apply_to(&self, settings: &mut Settings) {
        if let Some(broker) = &self.broker {
            settings.broker_url = broker.clone();
        }
        if let Some(api) = &self.api {
            settings.api_url = Some(api.clone());
        }
        if let Some(relay) = &self.relay {
            settings.relay_url = Some(relay.clone());
        }
        if let Some(token) = &self.token {
            settings.token = Some(token.clone());
        }
        if let Some(patient) = &self.patient {
            settings.patient = Some(patient.clone());
        }
        if let Some(data_dir) = &self.data_dir {
            settings.data_dir = Some(data_dir.clone());
        }
        if let Some(cap) = self.sample_cap {
            settings.sample_cap = cap;
        }
        if let Some(cap) = self.alert_cap {
            settings.alert_cap = cap;
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // The TUI owns stdout; logs go to stderr (redirect with 2>monitor.log)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let mut settings = Settings::load(args.config.as_deref())?;
    args.apply_to(&mut settings);

    let backend: Box<dyn StorageBackend> = match &settings.data_dir {
        Some(dir) => Box::new(FileBackend::new(dir)),
        None => Box::new(MemoryBackend::new()),
    };
    let store = VitalsStore::with_capacities(backend, settings.sample_cap, settings.alert_cap);

    let sink = AlertSink::new(settings.relay_url.as_deref().map(NotifyRelay::new));
    let api = settings
        .api_url
        .as_deref()
        .map(|url| ApiClient::new(url).with_token(settings.token.clone()));

    // Multi-thread runtime drives background tasks while the TUI loop stays
    // synchronous; the enter guard lets the loop spawn onto it.
    let rt = tokio::runtime::Runtime::new()?;
    let _guard = rt.enter();

    let source_label = if args.simulate {
        "simulator".to_string()
    } else {
        settings.broker_url.clone()
    };
    let (sample_tx, source) = ChannelSource::create(&source_label);

    let mut app = App::new(
        settings.clone(),
        Box::new(source),
        sample_tx.clone(),
        store,
        sink,
        api,
    );

    if args.simulate {
        let patient_id = settings.patient.clone().unwrap_or_else(|| "1".to_string());
        let simulator = SimulatorHandle::spawn(SimulatorConfig::new(&patient_id), sample_tx);
        app.set_simulator(simulator);
    } else {
        app.toggle_connection();
    }
    app.refresh_patients();
    app.request_summary();

    run_tui(&mut app, Duration::from_secs(args.refresh.max(1)))
}

/// Run the TUI with the prepared application state
fn run_tui(app: &mut App, refresh_interval: Duration) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic);
    }));

    // Run the main loop
    let result = run_app(&mut terminal, app, refresh_interval);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    refresh_interval: Duration,
) -> Result<()> {
    let mut last_refresh = Instant::now();

    // Minimum terminal size for usable display
    const MIN_WIDTH: u16 = 60;
    const MIN_HEIGHT: u16 = 16;

    while app.running {
        // Draw UI
        terminal.draw(|frame| {
            let area = frame.area();

            // Check for minimum terminal size
            if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
                let msg = format!(
                    "Terminal too small: {}x{}\nMinimum: {}x{}\n\nResize to continue",
                    area.width, area.height, MIN_WIDTH, MIN_HEIGHT
                );
                let paragraph = ratatui::widgets::Paragraph::new(msg)
                    .alignment(ratatui::layout::Alignment::Center)
                    .style(ratatui::style::Style::default().fg(ratatui::style::Color::Yellow));
                let centered = ratatui::layout::Rect::new(0, area.height / 2 - 2, area.width, 5);
                frame.render_widget(paragraph, centered);
                return;
            }

            let chunks = Layout::vertical([
                Constraint::Length(1), // Header bar
                Constraint::Length(1), // Tabs
                Constraint::Min(12),   // Content
                Constraint::Length(1), // Status bar
            ])
            .split(area);

            // Render header with the link state and current patient
            ui::common::render_header(frame, app, chunks[0]);

            // Render tabs
            ui::common::render_tabs(frame, app, chunks[1]);

            // Render current view
            match app.view {
                View::Vitals => ui::vitals::render(frame, app, chunks[2]),
                View::Alerts => ui::alerts::render(frame, app, chunks[2]),
            }

            // Render status bar
            ui::common::render_status_bar(frame, app, chunks[3]);

            // Render help overlay if active
            if app.show_help {
                ui::common::render_help(frame, app, area);
            }
        })?;

        // Poll for events with a short timeout
        if let Some(event) = events::poll_event(Duration::from_millis(100))? {
            match event {
                Event::Key(key) => events::handle_key_event(app, key),
                Event::Mouse(mouse) => events::handle_mouse_event(app, mouse),
                Event::Resize(_, _) => {
                    // Terminal will redraw on next iteration
                }
                _ => {}
            }
        }

        // Drain inbound samples and fetch results
        app.pump();

        // Periodic dashboard summary refresh
        if last_refresh.elapsed() >= refresh_interval {
            app.request_summary();
            last_refresh = Instant::now();
        }
    }

    Ok(())
}
