mod agent;
mod ai_sdk;
mod config;
mod error;
mod session;
#[cfg(test)]
mod test_support;
mod tools;
mod ui;

use agent::Agent;
use clap::Parser;
use config::{Cli, Config};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tools::SearchClient;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();

    let config = Config::from_cli(Cli::parse())?;
    init_logging(&config.log_file)?;

    if config.search.api_key.is_none() {
        tracing::warn!("BRAVE_API_KEY is not set; search requests will be sent without a key");
    }
    tracing::info!(host = %config.chat.host, model = %config.chat.model, "Starting chat");

    let agent = Agent::new(&config.chat)?;
    let search = SearchClient::new(&config.search)?;

    ui::run_tui(agent, search)
}

// Logs go to a file; the terminal belongs to the UI.
fn init_logging(path: &Path) -> error::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}
