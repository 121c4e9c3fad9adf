//! Conversation memory for a single agent
//!
//! [`Memory`] is the ordered transcript an agent sends to its provider: a
//! fixed system prompt followed by user and assistant turns. [`MemoryStore`]
//! persists transcripts as JSON files so a session can be recovered.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use agentseek_provider::Message;

/// Default maximum number of turns kept in memory
pub const DEFAULT_MAX_MESSAGES: usize = 100;

/// Turns at the end of the transcript that compression never touches
const KEEP_RECENT: usize = 4;

/// Turns longer than this are shortened by `compress`
const COMPRESS_THRESHOLD: usize = 1024;

/// Characters kept from a compressed turn
const COMPRESS_KEEP: usize = 512;

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("memory io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("memory serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MemoryError>;

/// A turn in the transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Role: user, assistant
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Local>,
}

/// Ordered transcript owned by one agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    /// Store key, usually the agent name
    pub key: String,
    system_prompt: String,
    turns: Vec<Turn>,
    #[serde(default = "default_max_messages")]
    max_messages: usize,
    #[serde(default)]
    compression: bool,
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,
}

fn default_max_messages() -> usize {
    DEFAULT_MAX_MESSAGES
}

impl Memory {
    pub fn new(key: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        let now = Local::now();
        Self {
            key: key.into(),
            system_prompt: system_prompt.into(),
            turns: Vec::new(),
            max_messages: DEFAULT_MAX_MESSAGES,
            compression: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_max_messages(mut self, max_messages: usize) -> Self {
        self.max_messages = max_messages.max(1);
        self.enforce_max_messages();
        self
    }

    /// Compress older turns automatically before each push
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compression = enabled;
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.system_prompt = prompt.into();
    }

    /// Append a turn, returning its index
    pub fn push(&mut self, role: impl Into<String>, content: impl Into<String>) -> usize {
        if self.compression {
            self.compress();
        }
        self.turns.push(Turn {
            role: role.into(),
            content: content.into(),
            timestamp: Local::now(),
        });
        self.updated_at = Local::now();
        self.enforce_max_messages();
        self.turns.len() - 1
    }

    /// Drop the oldest turns beyond `max_messages`
    fn enforce_max_messages(&mut self) {
        if self.turns.len() > self.max_messages {
            let to_remove = self.turns.len() - self.max_messages;
            self.turns.drain(0..to_remove);
            debug!(
                "Memory {} truncated to {} turns",
                self.key,
                self.turns.len()
            );
        }
    }

    /// Full provider context: system prompt followed by every turn
    pub fn get_context(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.turns.len() + 1);
        messages.push(Message::system(self.system_prompt.clone()));
        messages.extend(
            self.turns
                .iter()
                .map(|t| Message::new(t.role.clone(), t.content.clone())),
        );
        messages
    }

    /// Shorten long turns, leaving the most recent ones intact.
    ///
    /// Returns the number of turns that were shortened.
    pub fn compress(&mut self) -> usize {
        let cutoff = self.turns.len().saturating_sub(KEEP_RECENT);
        let mut compressed = 0;
        for turn in &mut self.turns[..cutoff] {
            let chars = turn.content.chars().count();
            if chars <= COMPRESS_THRESHOLD {
                continue;
            }
            let head: String = turn.content.chars().take(COMPRESS_KEEP).collect();
            turn.content = format!(
                "{}\n[... {} characters compressed ...]",
                head,
                chars - COMPRESS_KEEP
            );
            compressed += 1;
        }
        if compressed > 0 {
            debug!("Memory {} compressed {} turns", self.key, compressed);
        }
        compressed
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
        self.updated_at = Local::now();
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }
}

/// JSON file store for transcripts, one file per key
pub struct MemoryStore {
    dir: PathBuf,
}

impl MemoryStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn save(&self, memory: &Memory) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(&memory.key);
        let content = serde_json::to_string_pretty(memory)?;
        tokio::fs::write(path, content).await?;
        debug!("Saved memory: {}", memory.key);
        Ok(())
    }

    /// Load a saved transcript; unreadable files are logged and skipped
    pub async fn load(&self, key: &str) -> Option<Memory> {
        let path = self.path_for(key);
        if !path.exists() {
            return None;
        }

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str::<Memory>(&content) {
                Ok(memory) => {
                    debug!("Loaded memory: {}", key);
                    Some(memory)
                }
                Err(e) => {
                    warn!("Failed to parse memory {}: {}", key, e);
                    None
                }
            },
            Err(e) => {
                warn!("Failed to read memory {}: {}", key, e);
                None
            }
        }
    }

    /// Replace `memory`'s turns with the saved ones for the same key.
    ///
    /// The live system prompt is kept. Returns whether anything was restored.
    pub async fn recover(&self, memory: &mut Memory) -> bool {
        match self.load(&memory.key).await {
            Some(saved) => {
                memory.turns = saved.turns;
                memory.enforce_max_messages();
                memory.updated_at = Local::now();
                true
            }
            None => false,
        }
    }

    pub async fn delete(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key);
        if path.exists() {
            tokio::fs::remove_file(path).await?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Keys of all saved transcripts
    pub async fn list(&self) -> Vec<String> {
        let mut keys = Vec::new();

        if let Ok(mut entries) = tokio::fs::read_dir(&self.dir).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                if let Some(name) = entry.file_name().to_str() {
                    if let Some(stripped) = name.strip_suffix(".json") {
                        keys.push(stripped.to_string());
                    }
                }
            }
        }

        keys.sort();
        keys
    }

    /// The most recently updated saved transcript
    pub async fn latest(&self) -> Option<Memory> {
        let mut latest: Option<Memory> = None;
        for key in self.list().await {
            if let Some(memory) = self.load(&key).await {
                let newer = latest
                    .as_ref()
                    .map_or(true, |current| memory.updated_at > current.updated_at);
                if newer {
                    latest = Some(memory);
                }
            }
        }
        latest
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe_key: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", safe_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_starts_with_system_prompt() {
        let mut memory = Memory::new("coder", "You write code.");
        memory.push("user", "hello");
        let context = memory.get_context();
        assert_eq!(context.len(), 2);
        assert_eq!(context[0], Message::system("You write code."));
        assert_eq!(context[1], Message::user("hello"));
    }

    #[test]
    fn test_push_returns_index() {
        let mut memory = Memory::new("a", "p");
        assert_eq!(memory.push("user", "one"), 0);
        assert_eq!(memory.push("assistant", "two"), 1);
    }

    #[test]
    fn test_max_messages_truncates_oldest() {
        let mut memory = Memory::new("a", "p").with_max_messages(2);
        memory.push("user", "1");
        memory.push("assistant", "2");
        memory.push("user", "3");
        assert_eq!(memory.len(), 2);
        assert_eq!(memory.turns()[0].content, "2");
    }

    #[test]
    fn test_compress_keeps_recent_turns() {
        let mut memory = Memory::new("a", "p");
        let long = "x".repeat(2000);
        for _ in 0..6 {
            memory.push("user", long.clone());
        }
        let compressed = memory.compress();
        assert_eq!(compressed, 2);
        assert!(memory.turns()[0].content.contains("1488 characters compressed"));
        assert_eq!(memory.turns()[5].content.len(), 2000);
    }

    #[test]
    fn test_compress_leaves_short_turns() {
        let mut memory = Memory::new("a", "p");
        for i in 0..10 {
            memory.push("user", format!("short {}", i));
        }
        assert_eq!(memory.compress(), 0);
    }

    #[test]
    fn test_clear() {
        let mut memory = Memory::new("a", "p");
        memory.push("user", "x");
        memory.clear();
        assert!(memory.is_empty());
        assert_eq!(memory.get_context().len(), 1);
    }
}
