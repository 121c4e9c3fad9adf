//! Configuration management for agentseek
//!
//! Loads and saves the JSON configuration file. Every field has a default so a
//! missing or partial file still yields a usable configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod paths;

pub use paths::{config_path, data_dir, memory_dir, prompts_dir, work_dir};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config not found: {0}")]
    NotFound(PathBuf),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Language model provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.7
}

/// Agent loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_name")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<String>,
    /// Ask before irreversible financial actions
    #[serde(default = "default_true")]
    pub safety: bool,
    /// Provider calls allowed per `process` before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub memory_compression: bool,
    #[serde(default)]
    pub recover_last_session: bool,
    #[serde(default)]
    pub save_session: bool,
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            work_dir: None,
            safety: true,
            max_attempts: default_max_attempts(),
            memory_compression: false,
            recover_last_session: false,
            save_session: false,
            max_messages: default_max_messages(),
        }
    }
}

fn default_agent_name() -> String {
    "Friday".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    5
}

fn default_max_messages() -> usize {
    100
}

/// Trading venue settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    #[serde(default = "default_trading_base_url")]
    pub base_url: String,
    /// Send orders to the live endpoint instead of `/order/test`
    #[serde(default)]
    pub live_orders: bool,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_secret: String::new(),
            base_url: default_trading_base_url(),
            live_orders: false,
        }
    }
}

fn default_trading_base_url() -> String {
    "https://api.binance.com".to_string()
}

/// Web search settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SearchConfig {
    #[serde(default)]
    pub searxng_url: String,
}

/// Flight lookup settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FlightConfig {
    #[serde(default)]
    pub api_key: String,
}

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub flight: FlightConfig,
}

/// Non-empty config value, else the environment variable
fn value_or_env(value: &str, env: &str) -> Option<String> {
    if !value.is_empty() {
        return Some(value.to_string());
    }
    std::env::var(env).ok().filter(|v| !v.is_empty())
}

impl Config {
    /// Load from the default location
    pub async fn load() -> Result<Self> {
        let path = config_path();
        Self::load_from(&path).await
    }

    /// Load from a specific location, falling back to defaults if absent
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("◆ no config at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        debug!("◆ loading config from {:?}", path);
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save to the default location
    pub async fn save(&self) -> Result<()> {
        let path = config_path();
        self.save_to(&path).await
    }

    /// Save to a specific location
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        debug!("◆ saving config to {:?}", path);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Directory tools operate in (`agent.work_dir`, `$WORK_DIR`, else the data dir)
    pub fn work_dir(&self) -> PathBuf {
        match self.agent.work_dir.as_deref().filter(|d| !d.is_empty()) {
            Some(dir) => paths::expand_home(dir),
            None => match std::env::var("WORK_DIR") {
                Ok(dir) if !dir.is_empty() => paths::expand_home(&dir),
                _ => work_dir(),
            },
        }
    }

    /// Provider API key (`provider.api_key`, else `$OPENAI_API_KEY`)
    pub fn api_key(&self) -> Option<String> {
        value_or_env(&self.provider.api_key, "OPENAI_API_KEY")
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }

    /// Trading credentials; each half falls back to its env variable
    pub fn trading_credentials(&self) -> (Option<String>, Option<String>) {
        (
            value_or_env(&self.trading.api_key, "BINANCE_API_KEY"),
            value_or_env(&self.trading.api_secret, "BINANCE_API_SECRET"),
        )
    }

    /// SearxNG base URL
    pub fn searxng_url(&self) -> Option<String> {
        value_or_env(&self.search.searxng_url, "SEARXNG_BASE_URL")
    }

    /// AviationStack API key
    pub fn flight_api_key(&self) -> Option<String> {
        value_or_env(&self.flight.api_key, "AVIATIONSTACK_API_KEY")
    }
}

/// Write the default config (if none exists) and create the work directory
pub async fn init() -> Result<Config> {
    let config_path = config_path();

    if config_path.exists() {
        warn!("◆ config already present at {:?}", config_path);
    } else {
        let config = Config::default();
        config.save().await?;
        info!("◆ default config written to {:?}", config_path);
    }

    let config = Config::load().await?;
    let work = config.work_dir();
    tokio::fs::create_dir_all(&work).await?;
    info!("◆ work directory ready at {:?}", work);

    Ok(config)
}
