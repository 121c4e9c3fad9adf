//! Filesystem locations used by agentseek

use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory
pub const HOME_ENV: &str = "AGENTSEEK_HOME";

/// Data directory (`$AGENTSEEK_HOME`, else `~/.agentseek`)
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(HOME_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::home_dir()
        .map(|home| home.join(".agentseek"))
        .unwrap_or_else(|| PathBuf::from(".agentseek"))
}

/// Configuration file location
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

/// Default work directory handed to tools
pub fn work_dir() -> PathBuf {
    data_dir().join("work")
}

/// Saved conversation transcripts
pub fn memory_dir() -> PathBuf {
    data_dir().join("conversations")
}

/// Optional `<role>.md` files replacing the built-in role instructions
pub fn prompts_dir() -> PathBuf {
    data_dir().join("prompts")
}

/// Ensure directory exists
pub async fn ensure_dir(path: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(path).await
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}
