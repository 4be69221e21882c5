use clap::{Parser, Subcommand};
use colored::*;
use anyhow::{Result, anyhow, bail};
use std::path::PathBuf;

mod app;
mod client;
mod config;
mod conversation;
mod handler;
mod logging;
mod markdown;
mod requests;
mod session;
mod tui;
mod ui;

use app::App;
use client::{ChatClient, ChatMode};
use config::Config;
use session::SessionStore;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "chatline")]
#[command(about = "Terminal chat client for a remote chat/search API")]
struct Cli {
    /// Backend base URL
    #[arg(long, env = "CHATLINE_API_BASE_URL", global = true)]
    api_base: Option<String>,

    /// Directory holding the session id (one session per directory)
    #[arg(long, env = "CHATLINE_STORAGE_DIR", global = true)]
    storage_dir: Option<PathBuf>,

    /// Start in chat or search mode
    #[arg(long, global = true)]
    mode: Option<ChatMode>,

    /// Log file (defaults to the user data directory)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive terminal UI (default)
    Tui,
    /// Send one message and print the reply
    Send {
        /// Message text
        text: String,
    },
    /// Clear the backend history for this session
    Clear,
    /// Print the session id, creating it if needed
    Session,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = match cli.log_file.clone() {
        Some(path) => Ok(path),
        None => logging::default_log_path(),
    };
    if let Err(e) = log_path.and_then(|path| logging::init(&path)) {
        eprintln!("{}: {}", "Logging disabled".yellow(), e);
    }

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Could not read config file, using defaults");
        Config::new()
    });
    let api_base = config.resolve_api_base(cli.api_base.as_deref());
    let mode = config.resolve_mode(cli.mode);
    let client = ChatClient::new(&api_base);

    let store = match &cli.storage_dir {
        Some(dir) => Ok(SessionStore::new(dir)),
        None => SessionStore::default_scope(),
    };
    let session = store.and_then(|store| store.get_or_create_session_id());

    tracing::info!(api_base = %api_base, mode = mode.as_str(), "Starting chatline");

    match cli.command.unwrap_or(Commands::Tui) {
        Commands::Tui => {
            let session_id = match session {
                Ok(id) => Some(id),
                Err(e) => {
                    tracing::error!(error = %e, "Session unavailable, sending is disabled");
                    None
                }
            };
            run_tui(client, session_id, mode).await?
        }
        Commands::Send { text } => send_once(&client, &session?, mode, &text).await?,
        Commands::Clear => clear_once(&client, &session?).await?,
        Commands::Session => println!("{}", session?),
    }

    Ok(())
}

async fn run_tui(client: ChatClient, session_id: Option<String>, mode: ChatMode) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let mut app = App::new(client, session_id, mode, events.sender());
    app.config_path = Config::default_path().ok();

    let result = run_loop(&mut terminal, &mut app, &mut events).await;

    app.cancel_pending();
    tui::restore()?;
    result
}

async fn run_loop(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }
    }
    Ok(())
}

async fn send_once(client: &ChatClient, session_id: &str, mode: ChatMode, text: &str) -> Result<()> {
    if text.trim().is_empty() {
        bail!("Nothing to send");
    }

    println!("{} {}", "You:".bold().cyan(), text);

    match client.send(session_id, mode, text).await {
        Ok(reply) => {
            println!("{} {}", "AI:".bold().yellow(), reply);
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "Send failed");
            Err(anyhow!(e).context(format!("No reply from {}", client.base_url())))
        }
    }
}

async fn clear_once(client: &ChatClient, session_id: &str) -> Result<()> {
    client.clear_history(session_id).await?;
    println!("{}", "History cleared".green());
    Ok(())
}
