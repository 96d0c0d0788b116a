use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod ai;
mod app;
mod blocks;
mod config;
mod error;
mod handler;
mod persona;
mod reference;
mod reply;
mod state;
mod tui;
mod ui;

use ai::{ChatSession, GeminiClient};
use app::App;
use config::Config;

#[derive(Parser)]
#[command(name = "cecilia")]
#[command(version, about = "Chat with CECILIA, your AI project guide, beside a four-stage workflow reference")]
struct Cli {
    /// Gemini model to use (overrides the config file)
    #[arg(short, long)]
    model: Option<String>,

    /// Path to the config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write logs here instead of the cache directory
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    /// Store the --model choice in the config file
    #[arg(long, requires = "model")]
    save_model: bool,
}

fn default_log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("cecilia").join("cecilia.log"))
}

/// Logs go to a file; the terminal belongs to the UI.
fn init_logging(cli: &Cli) -> Result<Option<PathBuf>> {
    let Some(path) = cli.log_file.clone().or_else(default_log_path) else {
        return Ok(None);
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }
    let file = File::options()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    let default_filter = if cli.verbose { "cecilia=debug" } else { "cecilia=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(Some(path))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_path = init_logging(&cli)?;

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_path()?,
    };
    let mut config = Config::load_from(&config_path)?;

    if let Some(model) = &cli.model {
        config.model = Some(model.clone());
        if cli.save_model {
            config.save_to(&config_path)?;
            info!(model = %model, path = %config_path.display(), "saved model choice");
        }
    }

    // A missing key is fatal before the terminal is touched
    let settings = config.resolve(&config_path)?;
    info!(
        model = %settings.model,
        config = %config_path.display(),
        key_source = %settings.key_source,
        log = ?log_path,
        "starting"
    );

    let client = GeminiClient::new(
        &settings.api_key,
        &settings.model,
        &settings.base_url,
        settings.connect_timeout,
    )?;
    let session = ChatSession::new(Arc::new(client), &settings.system_instruction);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();
    let mut app = App::new(session, &settings, events.reply_sender());

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    if let Err(e) = &result {
        error!(error = %e, "event loop failed");
    }
    info!(
        messages = app.conversation.len(),
        turns = app.session.history().await.len(),
        "exiting"
    );
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App, events: &mut tui::EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }
    }
    Ok(())
}
