//! Plan decomposition and sequential sub-agent execution
//!
//! The planner asks its model for a json block of the form
//! `{"plan": [{"agent": "coder", "task": "...", "need": []}]}` and runs each
//! step on the named sub-agent in order. A step's task may contain
//! `{{previous}}`, which is replaced by the previous step's answer.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use agentseek_memory::Memory;

use crate::agent::{Agent, AgentRole, ExecutionResult, Specialist};
use crate::blocks::extract_blocks;
use crate::{AgentError, Result};

pub const PREVIOUS_PLACEHOLDER: &str = "{{previous}}";

/// One delegated unit of work
#[derive(Debug, Clone, PartialEq)]
pub struct PlanStep {
    /// Sub-agent role name as written by the model
    pub role: String,
    pub instruction: String,
    pub depends_on_previous: bool,
}

impl PlanStep {
    /// Instruction with the previous answer substituted or appended
    pub fn resolve_instruction(&self, previous: Option<&str>) -> String {
        if self.instruction.contains(PREVIOUS_PLACEHOLDER) {
            return self
                .instruction
                .replace(PREVIOUS_PLACEHOLDER, previous.unwrap_or_default());
        }
        match previous {
            Some(prev) if self.depends_on_previous => {
                format!("{}\n\nPrevious result:\n{}", self.instruction, prev)
            }
            _ => self.instruction.clone(),
        }
    }
}

#[derive(Deserialize)]
struct PlanDocument {
    #[serde(default)]
    plan: Vec<RawStep>,
}

#[derive(Deserialize)]
struct RawStep {
    agent: String,
    task: String,
    #[serde(default)]
    need: Vec<Value>,
}

/// Parse the plan out of a planner completion.
///
/// Reads the first json block, or the whole text when there is none.
/// Returns `None` when nothing parses or the plan is empty.
pub fn parse_plan(text: &str) -> Option<Vec<PlanStep>> {
    let json = extract_blocks(text, &["json"])
        .into_iter()
        .next()
        .map(|b| b.body)
        .unwrap_or_else(|| text.trim().to_string());

    let document: PlanDocument = match serde_json::from_str(&json) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("◆ could not parse plan: {}", e);
            return None;
        }
    };

    let steps: Vec<PlanStep> = document
        .plan
        .into_iter()
        .filter(|s| !s.task.trim().is_empty())
        .map(|s| PlanStep {
            role: s.agent.trim().to_ascii_lowercase(),
            instruction: s.task.trim().to_string(),
            depends_on_previous: !s.need.is_empty(),
        })
        .collect();

    if steps.is_empty() {
        None
    } else {
        Some(steps)
    }
}

/// Orchestrates sub-agents through a model-written plan
pub struct PlannerAgent {
    name: String,
    planner: Agent,
    agents: Vec<Box<dyn Specialist>>,
    plan: Vec<PlanStep>,
    last_answer: String,
    success: bool,
    status_message: String,
    blocks_result: Vec<ExecutionResult>,
}

impl PlannerAgent {
    /// `planner` should carry no tools; its completions are read as plans
    pub fn new(name: impl Into<String>, planner: Agent, agents: Vec<Box<dyn Specialist>>) -> Self {
        Self {
            name: name.into(),
            planner,
            agents,
            plan: Vec::new(),
            last_answer: String::new(),
            success: false,
            status_message: "Ready".to_string(),
            blocks_result: Vec::new(),
        }
    }

    /// Steps of the most recent plan
    pub fn plan(&self) -> &[PlanStep] {
        &self.plan
    }

    pub fn agents(&self) -> &[Box<dyn Specialist>] {
        &self.agents
    }

    /// Index of the general-purpose sub-agent: `casual`, else the first
    fn fallback_index(&self) -> usize {
        self.agents
            .iter()
            .position(|a| a.role() == AgentRole::Casual)
            .unwrap_or(0)
    }

    fn agent_index(&self, role: &str) -> usize {
        let wanted = role.parse::<AgentRole>().ok();
        let found = wanted.and_then(|r| self.agents.iter().position(|a| a.role() == r));
        match found {
            Some(index) => index,
            None => {
                let fallback = self.fallback_index();
                warn!(
                    "◆ no sub-agent for role '{}', using {}",
                    role,
                    self.agents[fallback].name()
                );
                fallback
            }
        }
    }

    async fn make_plan(&mut self, prompt: &str) -> Result<Vec<PlanStep>> {
        let (answer, _) = self.planner.process(prompt).await?;
        match parse_plan(&answer) {
            Some(steps) => Ok(steps),
            None => {
                let fallback = &self.agents[self.fallback_index()];
                info!("◆ no usable plan, delegating to {}", fallback.name());
                Ok(vec![PlanStep {
                    role: fallback.role().to_string(),
                    instruction: prompt.to_string(),
                    depends_on_previous: false,
                }])
            }
        }
    }

    async fn run_plan(&mut self, steps: &[PlanStep]) -> Result<String> {
        let mut previous: Option<String> = None;
        let mut summaries = Vec::with_capacity(steps.len());

        for (i, step) in steps.iter().enumerate() {
            let number = i + 1;
            let index = self.agent_index(&step.role);
            let instruction = step.resolve_instruction(previous.as_deref());
            self.status_message = format!("Step {}/{}: {}", number, steps.len(), step.role);

            let agent = &mut self.agents[index];
            let role = agent.role().to_string();
            info!("◆ plan step {} -> {}", number, agent.name());

            let outcome = agent.process(&instruction).await;
            self.blocks_result.extend_from_slice(agent.blocks_result());

            let answer = match outcome {
                Ok((answer, _)) if agent.success() => answer,
                Ok((answer, _)) => {
                    return Err(AgentError::PlanStepFailed {
                        step: number,
                        role,
                        error: answer,
                    })
                }
                Err(e) => {
                    return Err(AgentError::PlanStepFailed {
                        step: number,
                        role,
                        error: e.to_string(),
                    })
                }
            };

            summaries.push(format!("Step {} ({}): {}", number, role, answer));
            previous = Some(answer);
        }

        Ok(summaries.join("\n\n"))
    }
}

#[async_trait]
impl Specialist for PlannerAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> AgentRole {
        AgentRole::Planner
    }

    async fn process(&mut self, prompt: &str) -> Result<(String, Option<String>)> {
        self.blocks_result.clear();
        self.success = false;
        if self.agents.is_empty() {
            return Err(AgentError::NoAgents);
        }

        self.status_message = "Planning...".to_string();
        let outcome = match self.make_plan(prompt).await {
            Ok(steps) => {
                self.plan = steps.clone();
                self.run_plan(&steps).await
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(answer) => {
                self.success = true;
                self.status_message = "Ready".to_string();
                self.last_answer = answer.clone();
                Ok((answer, self.planner.last_reasoning().map(String::from)))
            }
            Err(e) => {
                self.status_message = "Error".to_string();
                self.last_answer = format!("Error: {}", e);
                Err(e)
            }
        }
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
        self.planner.memory()
    }

    fn memory_mut(&mut self) -> &mut Memory {
        self.planner.memory_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plan_from_json_block() {
        let text = "Here is the plan:\n```json\n{\"plan\": [\n  {\"agent\": \"Web\", \"task\": \"find the docs\", \"need\": []},\n  {\"agent\": \"coder\", \"task\": \"use {{previous}}\", \"need\": [\"1\"]}\n]}\n```";
        let steps = parse_plan(text).unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].role, "web");
        assert!(!steps[0].depends_on_previous);
        assert!(steps[1].depends_on_previous);
    }

    #[test]
    fn test_parse_plan_rejects_garbage_and_empty() {
        assert!(parse_plan("I will just do it.").is_none());
        assert!(parse_plan("```json\n{\"plan\": []}\n```").is_none());
    }

    #[test]
    fn test_resolve_instruction() {
        let placeholder = PlanStep {
            role: "coder".into(),
            instruction: "summarize {{previous}} briefly".into(),
            depends_on_previous: false,
        };
        assert_eq!(
            placeholder.resolve_instruction(Some("the data")),
            "summarize the data briefly"
        );

        let appended = PlanStep {
            role: "coder".into(),
            instruction: "write it down".into(),
            depends_on_previous: true,
        };
        assert_eq!(
            appended.resolve_instruction(Some("42")),
            "write it down\n\nPrevious result:\n42"
        );
        assert_eq!(appended.resolve_instruction(None), "write it down");
    }
}
