use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use alter_ego_core::{Config, HttpTransport};
use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "alter-ego")]
#[command(about = "Terminal chat client for the Alter Ego personal assistant")]
#[command(version)]
struct Cli {
    /// Backend base URL (overrides ALTER_EGO_API_BASE_URL and the config file)
    #[arg(long)]
    api_url: Option<String>,
    /// Path to a JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Directory for log files
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = logging::init(cli.log_dir)?;

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load config, using defaults");
            Config::default()
        }),
    };

    let api_base_url = config.api_base_url(cli.api_url.as_deref());
    let transport = HttpTransport::new(&api_base_url, config.request_timeout())?;
    tracing::info!(endpoint = transport.endpoint(), "starting alter-ego");

    let mut events = EventHandler::new();
    let mut app = App::new(config.limits(), Arc::new(transport), events.sender(), api_base_url);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = run(&mut terminal, &mut app, &mut events).await;

    app.abandon_exchange();
    tui::restore()?;

    if let Err(ref e) = result {
        tracing::error!(error = %e, "exited with error");
    }
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }
    }
    Ok(())
}
