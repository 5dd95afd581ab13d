use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use quill_core::{Config, FileStorage, HttpTransport, MemoryStorage, SessionManager};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;

#[derive(Parser)]
#[command(name = "quill")]
#[command(about = "Terminal chat and document assistant", version)]
struct Cli {
    /// Backend base URL (overrides config and QUILL_ENDPOINT)
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Log level or filter directive, e.g. "debug" or "quill_core=trace"
    #[arg(long)]
    log_level: Option<String>,

    /// File that stores the session id
    #[arg(long)]
    storage: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Ignoring unreadable config: {e:#}");
        Config::new()
    });

    if let Err(e) = init_logging(cli.log_level.as_deref().or(config.log_level.as_deref())) {
        eprintln!("Logging disabled: {e:#}");
    }

    let endpoint = cli.endpoint.unwrap_or_else(|| config.resolved_endpoint());
    let session_manager = match cli.storage.or_else(|| config.resolved_storage_path()) {
        Some(path) => SessionManager::new(FileStorage::new(path)),
        None => {
            warn!("No storage location available; session id will not persist");
            SessionManager::new(MemoryStorage::new())
        }
    };
    let session_id = session_manager.get_or_create_session_id();
    info!(%endpoint, %session_id, "Starting quill");

    let transport = HttpTransport::new(&endpoint);
    match transport.health().await {
        Ok(true) => info!("Backend is healthy"),
        Ok(false) => warn!("Backend reported an unhealthy status"),
        Err(e) => warn!(error = %e, "Backend health check failed"),
    }

    let mut app = App::new(Arc::new(transport), Some(session_id), endpoint);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app).await;
    tui::restore()?;

    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = tui::EventHandler::new(tui::TICK_RATE);

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await,
            None => break,
        }
    }

    info!("Shutting down");
    Ok(())
}

/// Log to `<config dir>/quill/quill.log`; the terminal belongs to the UI.
fn init_logging(level: Option<&str>) -> Result<()> {
    let dir = Config::config_dir()?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join("quill.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    let filter = match level {
        Some(level) if level.contains('=') => EnvFilter::try_new(level)?,
        Some(level) => EnvFilter::try_new(format!("quill={level},quill_core={level}"))?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "quill=info,quill_core=info".into()),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .init();

    Ok(())
}
