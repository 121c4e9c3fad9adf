//! Tool capabilities dispatched from fenced blocks
//!
//! Every tool reports through plain strings. A result that starts with
//! [`ERROR_MARKER`] is a failure; the agent loop relies on
//! [`Tool::execution_failure_check`] alone to decide whether to re-prompt.

pub mod code;
pub mod file_finder;
pub mod finance;
pub mod report;
pub mod shell;
pub mod web;

pub use code::CodeInterpreter;
pub use file_finder::FileFinder;
pub use finance::{BinanceTrader, FinePayment, PaymentGateway, SimulatedGateway};
pub use report::ReportGenerator;
pub use shell::BashInterpreter;
pub use web::{FlightSearch, WebSearch};

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::blocks::Block;
use crate::trading::TradingError;
use crate::AgentError;

/// Prefix of every failed tool result
pub const ERROR_MARKER: &str = "Error";

/// Suffix of a failure caused by missing configuration
pub const NOT_CONFIGURED: &str = "not configured.";

/// Failures raised inside tools before they are rendered to strings
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("{} parameter(s) required.", .0.join(", "))]
    MissingParams(Vec<String>),

    #[error("{0}")]
    InvalidParam(String),

    #[error("{0} not configured.")]
    NotConfigured(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{0}")]
    Trading(#[from] TradingError),

    #[error("{0}")]
    Gateway(String),
}

impl ToolError {
    /// Error-marked result string
    pub fn render(&self) -> String {
        format!("{}: {}", ERROR_MARKER, self)
    }
}

/// Values of the required parameters, in order, or every missing name
pub fn require_params<'a>(block: &'a Block, names: &[&str]) -> Result<Vec<&'a str>, ToolError> {
    let mut values = Vec::with_capacity(names.len());
    let mut missing = Vec::new();
    for name in names {
        match block.param(name) {
            Some(value) => values.push(value),
            None => missing.push(name.to_string()),
        }
    }
    if missing.is_empty() {
        Ok(values)
    } else {
        Err(ToolError::MissingParams(missing))
    }
}

/// Resolve a relative path inside `work_dir`, refusing absolute paths and `..`
pub fn resolve_in_work_dir(work_dir: &Path, relative: &str) -> Result<PathBuf, ToolError> {
    let path = Path::new(relative);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(ToolError::InvalidParam(format!(
            "{} is outside the work directory",
            relative
        )));
    }
    Ok(work_dir.join(path))
}

/// Cut `text` to at most `max` bytes on a char boundary, noting what was dropped
pub fn truncate_output(text: String, max: usize) -> String {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!(
        "{}\n[output truncated: {} bytes remaining]",
        &text[..end],
        text.len() - end
    )
}

/// A capability the model can invoke through a fenced block
#[async_trait]
pub trait Tool: Send + Sync {
    /// Block tag matched against model output
    fn tag(&self) -> &str;
    fn name(&self) -> &str;
    fn description(&self) -> &str;

    /// Example block shown to the model
    fn usage(&self) -> String {
        format!("```{}\n...\n```", self.tag())
    }

    /// Run the blocks. Never panics on bad input; failures come back as
    /// strings starting with [`ERROR_MARKER`].
    async fn execute(&self, blocks: &[Block], safety: bool) -> String;

    fn execution_failure_check(&self, output: &str) -> bool {
        output.starts_with(ERROR_MARKER)
    }

    /// Failure the model cannot repair by retrying: the first line reads
    /// `Error: ... not configured.`
    fn configuration_failure_check(&self, output: &str) -> bool {
        self.execution_failure_check(output)
            && output
                .lines()
                .next()
                .map_or(false, |line| line.trim_end().ends_with(NOT_CONFIGURED))
    }

    /// Message pushed back into the conversation after execution.
    /// Failures pass through unchanged.
    fn interpreter_feedback(&self, output: &str) -> String {
        if self.execution_failure_check(output) {
            output.to_string()
        } else {
            format!("{} succeeded:\n{}", self.name(), output)
        }
    }
}

/// Tag → tool dispatch table
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool; tags must be unique
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> crate::Result<()> {
        self.register_arc(Arc::new(tool))
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> crate::Result<()> {
        let tag = tool.tag().to_string();
        if self.tools.contains_key(&tag) {
            return Err(AgentError::DuplicateTool(tag));
        }
        self.tools.insert(tag, tool);
        Ok(())
    }

    pub fn get(&self, tag: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(tag)
    }

    pub fn has(&self, tag: &str) -> bool {
        self.tools.contains_key(tag)
    }

    /// Registered tags, sorted
    pub fn tags(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.values()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
