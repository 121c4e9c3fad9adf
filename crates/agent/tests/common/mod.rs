//! Shared fixtures: a scripted provider and a probe tool

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use agentseek_agent::{Agent, AgentRole, AgentSettings, Block, Tool, ToolRegistry};
use agentseek_provider::{ChatParams, ChatResponse, Message, Provider, ProviderError};

type Reply = Result<ChatResponse, ProviderError>;

/// Replays canned replies in order and records every request
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Reply>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<&str>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(ChatResponse::text(r))).collect()),
            ..Default::default()
        })
    }

    pub fn with_replies(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Messages sent with the n-th request
    pub fn request(&self, n: usize) -> Vec<Message> {
        self.requests.lock().unwrap()[n].clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(params.messages);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ChatResponse::text("out of script")))
    }

    fn default_model(&self) -> String {
        "scripted".to_string()
    }

    fn is_configured(&self) -> bool {
        true
    }
}

/// `probe` blocks: a body of `fail` fails, anything else echoes back
pub struct ProbeTool;

#[async_trait]
impl Tool for ProbeTool {
    fn tag(&self) -> &str {
        "probe"
    }

    fn name(&self) -> &str {
        "Probe"
    }

    fn description(&self) -> &str {
        "Test tool"
    }

    async fn execute(&self, blocks: &[Block], _safety: bool) -> String {
        let body = blocks.iter().map(|b| b.body.trim()).collect::<Vec<_>>().join(",");
        if body == "fail" {
            "Error: probe failed".to_string()
        } else {
            format!("probed {}", body)
        }
    }
}

pub fn probe_agent(provider: Arc<ScriptedProvider>, role: AgentRole, max_attempts: u32) -> Agent {
    let mut tools = ToolRegistry::new();
    tools.register(ProbeTool).unwrap();
    let settings = AgentSettings {
        max_attempts,
        ..Default::default()
    };
    Agent::new(role.as_str(), role, provider, tools, "/tmp/agentseek-test", settings)
}
