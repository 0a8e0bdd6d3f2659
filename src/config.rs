use anyhow::{Context, Result};
use serde::Deserialize;

/// Production Telegram Bot API origin. Tests point the notifier elsewhere.
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(skip)]
    pub telegram: TelegramConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_probe_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_probe_timeout_secs() -> u64 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_probe_timeout_secs(),
        }
    }
}

/// Telegram credentials. Either field may be empty; the service still runs,
/// it just cannot deliver alerts until both are set.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub token: String,
    pub chat_id: String,
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            chat_id: String::new(),
            api_base: TELEGRAM_API_BASE.to_string(),
        }
    }
}

impl TelegramConfig {
    pub fn from_env() -> Self {
        Self {
            token: std::env::var("TELEGRAM_BOT_TOKEN").unwrap_or_default(),
            chat_id: std::env::var("TELEGRAM_CHAT_ID").unwrap_or_default(),
            api_base: TELEGRAM_API_BASE.to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.token.is_empty() && !self.chat_id.is_empty()
    }
}

impl Config {
    /// Tunables come from an optional config.toml; credentials come from the
    /// environment (or .env) only.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = match std::fs::read_to_string("config.toml") {
            Ok(content) => {
                toml::from_str(&content).context("Failed to parse config.toml")?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(e) => return Err(e).context("Failed to read config.toml"),
        };
        config.telegram = TelegramConfig::from_env();
        Ok(config)
    }
}
