//! Agent core: tool blocks, the execute-feedback loop, planning and sessions
//!
//! An [`Agent`] asks its provider for a completion, pulls fenced tool blocks
//! out of the reply, runs them through the registered [`tools::Tool`]s and
//! feeds the results back until every block succeeds or the retry budget is
//! spent. [`PlannerAgent`] chains several agents; [`Interaction`] routes user
//! queries to one of them and guards against concurrent queries.

use thiserror::Error;

pub mod agent;
pub mod agents;
pub mod blocks;
pub mod confirm;
pub mod context;
pub mod interaction;
pub mod planner;
pub mod tools;
pub mod trading;
pub mod trading_agent;

pub use agent::{Agent, AgentRole, AgentSettings, ExecutionResult, Specialist};
pub use agents::AgentFactory;
pub use blocks::Block;
pub use confirm::{AutoConfirm, AutoDeny, Confirmer, StdinConfirmer};
pub use context::ContextBuilder;
pub use interaction::{
    AgentRouter, FixedRouter, Interaction, KeywordRouter, QueryAnswer, QueryOutcome, SessionStatus,
};
pub use planner::{PlanStep, PlannerAgent};
pub use tools::{Tool, ToolRegistry};
pub use trading_agent::TradingAgent;

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("provider error: {0}")]
    Provider(#[from] agentseek_provider::ProviderError),

    #[error("gave up after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// A tool lacks credentials or an endpoint; holds e.g. `Binance client not configured.`
    #[error("{0}")]
    NotConfigured(String),

    #[error("duplicate tool tag: {0}")]
    DuplicateTool(String),

    #[error("plan step {step} ({role}) failed: {error}")]
    PlanStepFailed {
        step: usize,
        role: String,
        error: String,
    },

    #[error("no agents registered")]
    NoAgents,

    #[error("memory error: {0}")]
    Memory(#[from] agentseek_memory::MemoryError),
}

pub type Result<T> = std::result::Result<T, AgentError>;
