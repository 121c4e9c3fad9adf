//! The execute-feedback loop shared by every tool-using agent

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use agentseek_config::Config;
use agentseek_memory::Memory;
use agentseek_provider::{ChatParams, Provider};

use crate::blocks::{extract_blocks, strip_blocks};
use crate::context::ContextBuilder;
use crate::tools::{ToolRegistry, ERROR_MARKER};
use crate::{AgentError, Result};

/// Answer used when the model and the tools both produced nothing to show
const EMPTY_ANSWER: &str = "Task completed.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Casual,
    Coder,
    File,
    Web,
    Finance,
    Trading,
    Planner,
}

impl AgentRole {
    pub const ALL: [AgentRole; 7] = [
        AgentRole::Casual,
        AgentRole::Coder,
        AgentRole::File,
        AgentRole::Web,
        AgentRole::Finance,
        AgentRole::Trading,
        AgentRole::Planner,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Casual => "casual",
            AgentRole::Coder => "coder",
            AgentRole::File => "file",
            AgentRole::Web => "web",
            AgentRole::Finance => "finance",
            AgentRole::Trading => "trading",
            AgentRole::Planner => "planner",
        }
    }

    pub fn type_tag(&self) -> &'static str {
        match self {
            AgentRole::Casual => "casual_agent",
            AgentRole::Coder => "code_agent",
            AgentRole::File => "file_agent",
            AgentRole::Web => "browser_agent",
            AgentRole::Finance => "finance_agent",
            AgentRole::Trading => "trading_agent",
            AgentRole::Planner => "planner_agent",
        }
    }

    /// Words that suggest a query belongs to this role
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            AgentRole::Casual => &["hello", "hi", "thanks", "chat", "joke", "how are you"],
            AgentRole::Coder => &[
                "code", "program", "script", "python", "golang", "compile", "function", "bug",
                "debug", "implement",
            ],
            AgentRole::File => &["file", "folder", "directory", "find", "locate", "rename", "move"],
            AgentRole::Web => &["search", "web", "internet", "browse", "news", "flight", "look up"],
            AgentRole::Finance => &["pay", "fine", "payment", "order", "buy", "sell", "account"],
            AgentRole::Trading => &["price", "signal", "trade", "btc", "usdt", "crypto", "binance"],
            AgentRole::Planner => &["plan", "steps", "then", "and then", "project", "organize"],
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        AgentRole::ALL
            .iter()
            .copied()
            .find(|role| role.as_str() == normalized || role.type_tag() == normalized)
            .or(match normalized.as_str() {
                "code" => Some(AgentRole::Coder),
                "browser" => Some(AgentRole::Web),
                "files" => Some(AgentRole::File),
                _ => None,
            })
            .ok_or_else(|| format!("unknown agent role '{}'", s))
    }
}

/// Per-agent knobs taken from config
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub safety: bool,
    pub max_attempts: u32,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_tokens: 4096,
            temperature: 0.7,
            safety: true,
            max_attempts: 5,
        }
    }
}

impl AgentSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.provider.model.clone(),
            max_tokens: config.provider.max_tokens,
            temperature: config.provider.temperature,
            safety: config.agent.safety,
            max_attempts: config.agent.max_attempts.max(1),
        }
    }
}

/// Outcome of running one block
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub tag: String,
    pub body: String,
    pub output: String,
    pub feedback: String,
    pub failed: bool,
    /// Failed for want of configuration; never retried
    pub not_configured: bool,
}

/// Anything the session controller can hand a query to
#[async_trait]
pub trait Specialist: Send {
    fn name(&self) -> &str;
    fn role(&self) -> AgentRole;

    /// Handle one instruction, returning the answer and optional reasoning
    async fn process(&mut self, prompt: &str) -> Result<(String, Option<String>)>;

    fn last_answer(&self) -> &str;
    fn success(&self) -> bool;
    fn status_message(&self) -> &str;
    fn blocks_result(&self) -> &[ExecutionResult];
    fn memory(&self) -> &Memory;
    fn memory_mut(&mut self) -> &mut Memory;
}

/// A role-bound agent with its own tools and memory
pub struct Agent {
    name: String,
    role: AgentRole,
    provider: Arc<dyn Provider>,
    tools: ToolRegistry,
    memory: Memory,
    settings: AgentSettings,
    work_dir: PathBuf,
    last_answer: String,
    last_reasoning: Option<String>,
    success: bool,
    status_message: String,
    blocks_result: Vec<ExecutionResult>,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        role: AgentRole,
        provider: Arc<dyn Provider>,
        tools: ToolRegistry,
        work_dir: impl AsRef<Path>,
        settings: AgentSettings,
    ) -> Self {
        let name = name.into();
        let work_dir = work_dir.as_ref().to_path_buf();
        let prompt = ContextBuilder::new(&work_dir).build_system_prompt(&name, role, &tools);
        let memory = Memory::new(role.type_tag(), prompt);

        Self {
            name,
            role,
            provider,
            tools,
            memory,
            settings,
            work_dir,
            last_answer: String::new(),
            last_reasoning: None,
            success: false,
            status_message: "Ready".to_string(),
            blocks_result: Vec::new(),
        }
    }

    /// Replace the memory, keeping its settings but this agent's system prompt
    pub fn with_memory(mut self, mut memory: Memory) -> Self {
        memory.set_system_prompt(self.memory.system_prompt().to_string());
        self.memory = memory;
        self
    }

    /// Rebuild the system prompt through a customized builder
    pub fn with_context(mut self, context: &ContextBuilder) -> Self {
        let prompt = context.build_system_prompt(&self.name, self.role, &self.tools);
        self.memory.set_system_prompt(prompt);
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn last_reasoning(&self) -> Option<&str> {
        self.last_reasoning.as_deref()
    }

    /// Ask the provider for the next completion and record it as an
    /// assistant turn
    pub async fn llm_request(&mut self) -> Result<(String, Option<String>)> {
        let params = ChatParams {
            model: self.settings.model.clone(),
            messages: self.memory.get_context(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };
        let response = self.provider.chat(params).await?;
        let content = response.answer().to_string();
        self.memory.push("assistant", content.clone());
        Ok((content, response.reasoning))
    }

    /// Run every registered block in `answer`, in order, pushing each
    /// feedback as a user turn.
    ///
    /// Stops at the first failure. Returns whether all blocks succeeded and
    /// the last feedback pushed.
    pub async fn execute_modules(&mut self, answer: &str) -> (bool, Option<String>) {
        let tags: Vec<String> = self.tools.tags().into_iter().map(String::from).collect();
        let tag_refs: Vec<&str> = tags.iter().map(String::as_str).collect();
        let blocks = extract_blocks(answer, &tag_refs);

        let mut last_feedback = None;
        for block in blocks {
            let Some(tool) = self.tools.get(&block.tag).cloned() else {
                continue;
            };
            self.status_message = format!("Executing {}", block.tag);
            info!("◆ {} executing {} block", self.name, block.tag);

            let output = tool
                .execute(std::slice::from_ref(&block), self.settings.safety)
                .await;
            let failed = tool.execution_failure_check(&output);
            let not_configured = failed && tool.configuration_failure_check(&output);
            let feedback = tool.interpreter_feedback(&output);
            if failed {
                warn!("◆ {} block failed: {}", block.tag, first_line(&output));
            } else {
                debug!("◆ {} block succeeded", block.tag);
            }

            self.memory.push("user", feedback.clone());
            self.blocks_result.push(ExecutionResult {
                tag: block.tag.clone(),
                body: block.body.clone(),
                output,
                feedback: feedback.clone(),
                failed,
                not_configured,
            });
            last_feedback = Some(feedback);

            if failed {
                return (false, last_feedback);
            }
        }
        (true, last_feedback)
    }

    fn fail(&mut self, error: &AgentError) {
        self.success = false;
        self.last_answer = format!("Error: {}", error);
        self.status_message = "Error".to_string();
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}

#[async_trait]
impl Specialist for Agent {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> AgentRole {
        self.role
    }

    async fn process(&mut self, prompt: &str) -> Result<(String, Option<String>)> {
        self.blocks_result.clear();
        self.success = false;
        self.status_message = "Thinking...".to_string();
        self.memory.push(
            "user",
            format!("{}\nWorking directory: {}", prompt, self.work_dir.display()),
        );

        let tags: Vec<String> = self.tools.tags().into_iter().map(String::from).collect();
        let tag_refs: Vec<&str> = tags.iter().map(String::as_str).collect();
        let max_attempts = self.settings.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            debug!("◆ {} attempt {}/{}", self.name, attempt, max_attempts);
            self.status_message = "Thinking...".to_string();

            let (raw, reasoning) = match self.llm_request().await {
                Ok(reply) => reply,
                Err(e) => {
                    self.fail(&e);
                    return Err(e);
                }
            };
            self.last_reasoning = reasoning.clone();

            let (all_ok, last_feedback) = self.execute_modules(&raw).await;
            let answer = strip_blocks(&raw, &tag_refs);

            if all_ok {
                let answer = if answer.is_empty() {
                    last_feedback.unwrap_or_else(|| EMPTY_ANSWER.to_string())
                } else {
                    answer
                };
                self.success = true;
                self.status_message = "Ready".to_string();
                self.last_answer = answer.clone();
                info!("◆ {} done after {} attempt(s)", self.name, attempt);
                return Ok((answer, reasoning));
            }

            if let Some(missing) = self.blocks_result.last().filter(|r| r.not_configured) {
                let error = AgentError::NotConfigured(
                    missing
                        .output
                        .trim_start_matches(ERROR_MARKER)
                        .trim_start_matches(':')
                        .trim()
                        .to_string(),
                );
                self.fail(&error);
                return Err(error);
            }

            last_error = last_feedback.unwrap_or_default();
        }

        let error = AgentError::RetriesExhausted {
            attempts: max_attempts,
            last_error,
        };
        self.fail(&error);
        Err(error)
    }

    fn last_answer(&self) -> &str {
        &self.last_answer
    }

    fn success(&self) -> bool {
        self.success
    }

    fn status_message(&self) -> &str {
        &self.status_message
    }

    fn blocks_result(&self) -> &[ExecutionResult] {
        &self.blocks_result
    }

    fn memory(&self) -> &Memory {
        &self.memory
    }

    fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip_names() {
        for role in AgentRole::ALL {
            assert_eq!(role.as_str().parse::<AgentRole>().unwrap(), role);
            assert_eq!(role.type_tag().parse::<AgentRole>().unwrap(), role);
        }
        assert_eq!("Code".parse::<AgentRole>().unwrap(), AgentRole::Coder);
        assert!("pilot".parse::<AgentRole>().is_err());
    }

    #[test]
    fn test_settings_clamp_attempts() {
        let mut config = Config::default();
        config.agent.max_attempts = 0;
        assert_eq!(AgentSettings::from_config(&config).max_attempts, 1);
    }
}
