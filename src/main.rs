use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

mod app;
mod backend;
mod chat;
mod config;
mod evidence;
mod handler;
mod logging;
mod message;
mod tui;
mod ui;

#[cfg(test)]
mod test_utils;

use app::App;
use backend::BackendClient;
use chat::ERROR_NOTICE;
use config::{Config, SERVER_URL_ENV};

#[derive(Parser)]
#[command(name = "docchat", version)]
#[command(about = "Chat with a visual document QA server from the terminal")]
struct Cli {
    /// Base URL of the document QA server
    #[arg(long, global = true, env = SERVER_URL_ENV)]
    server: Option<String>,
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log file for the interactive UI
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat (default)
    Chat,
    /// Ask one question and print the answer
    Ask {
        /// Your question
        query: String,
        /// Write the evidence image here, if the answer has one
        #[arg(long)]
        save_image: Option<PathBuf>,
    },
    /// Show the config file path, writing a default one if none exists
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::get_config_path()?,
    };
    let config = Config::load_from(&config_path)?;
    let server_url = config.resolve_server_url(cli.server.as_deref());
    let backend = BackendClient::new(&server_url, config.chat_path());

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let log_file = cli.log_file.unwrap_or_else(|| config.log_file());
            logging::init_file(&log_file)?;
            tracing::info!(endpoint = backend.endpoint(), "starting chat");

            let mut app = App::new(backend, config.evidence_dir());
            run_tui(&mut app).await
        }
        Commands::Ask { query, save_image } => {
            logging::init_stderr()?;
            ask_once(&backend, &query, save_image.as_deref()).await
        }
        Commands::Config => {
            if !config_path.exists() {
                config.save_to(&config_path)?;
                println!("Wrote default config to {}", config_path.display());
            } else {
                println!("{}", config_path.display());
            }
            println!("server: {}", backend.endpoint());
            println!("evidence images: {}", config.evidence_dir().display());
            println!("log file: {}", config.log_file().display());
            Ok(())
        }
    }
}

async fn run_tui(app: &mut App) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();
    let tx = events.sender();

    let result = async {
        loop {
            terminal.draw(|frame| ui::render(app, frame))?;

            let Some(event) = events.next().await else {
                break;
            };
            handler::handle_event(app, event, &tx);

            if app.should_quit {
                break;
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    result
}

async fn ask_once(backend: &BackendClient, query: &str, save_image: Option<&Path>) -> Result<()> {
    let query = query.trim();
    if query.is_empty() {
        bail!("query is empty");
    }

    let answer = match backend.ask(query).await {
        Ok(answer) => answer,
        Err(e) => {
            tracing::error!(error = %e, endpoint = backend.endpoint(), "chat request failed");
            bail!(ERROR_NOTICE);
        }
    };

    println!("{}", ui::sanitize(&answer.text));

    if let Some(evidence) = &answer.evidence {
        println!();
        println!("{}", evidence.caption());
        println!("{}", evidence.summary());

        if let Some(path) = save_image {
            fs::write(path, &evidence.image)
                .with_context(|| format!("writing evidence image to {}", path.display()))?;
            println!("Saved evidence image to {}", path.display());
        }
    } else if save_image.is_some() {
        tracing::warn!("answer has no evidence image, nothing saved");
    }

    Ok(())
}
