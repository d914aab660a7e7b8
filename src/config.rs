use crate::error::{ChatError, Result};
use clap::Parser;
use reqwest::Url;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(
    name = "agentic-chat",
    about = "Chat with a local Ollama model, with /search and /image commands"
)]
pub struct Cli {
    /// Base URL of the Ollama server.
    #[arg(long, env = "OLLAMA_HOST", default_value = "http://localhost:11434")]
    pub host: String,

    /// Model name passed to /api/chat.
    #[arg(long, env = "OLLAMA_MODEL", default_value = "gpt-oss:20b")]
    pub model: String,

    /// Brave Search subscription token.
    #[arg(long, env = "BRAVE_API_KEY", hide_env_values = true)]
    pub brave_api_key: Option<String>,

    #[arg(
        long,
        env = "BRAVE_SEARCH_URL",
        default_value = "https://api.search.brave.com/res/v1"
    )]
    pub search_url: String,

    /// Timeout for search requests, in seconds.
    #[arg(long, env = "SEARCH_TIMEOUT_SECS", default_value_t = 10)]
    pub search_timeout: u64,

    /// Timeout for chat requests, in seconds.
    #[arg(long, env = "CHAT_TIMEOUT_SECS", default_value_t = 60)]
    pub chat_timeout: u64,

    /// Where to write logs. Defaults to ~/.agentic-chat/chat.log.
    #[arg(long, env = "AGENTIC_CHAT_LOG")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub host: String,
    pub model: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub chat: ChatConfig,
    pub search: SearchConfig,
    pub log_file: PathBuf,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let host = normalize_base_url(&cli.host)?;
        let base_url = normalize_base_url(&cli.search_url)?;

        Ok(Self {
            chat: ChatConfig {
                host,
                model: cli.model,
                timeout: Duration::from_secs(cli.chat_timeout),
            },
            search: SearchConfig {
                base_url,
                api_key: cli.brave_api_key.filter(|key| !key.trim().is_empty()),
                timeout: Duration::from_secs(cli.search_timeout),
            },
            log_file: cli.log_file.unwrap_or_else(default_log_path),
        })
    }
}

fn normalize_base_url(value: &str) -> Result<String> {
    let trimmed = value.trim().trim_end_matches('/');
    let url = Url::parse(trimmed)
        .map_err(|e| ChatError::Config(format!("Invalid URL {trimmed:?}: {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        other => Err(ChatError::Config(format!(
            "Unsupported scheme {other:?} in {trimmed:?}"
        ))),
    }
}

fn default_log_path() -> PathBuf {
    if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
        return PathBuf::from(home).join(".agentic-chat").join("chat.log");
    }

    PathBuf::from("agentic-chat.log")
}
