//! Session controller tests

mod common;

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Notify;

use agentseek_agent::{
    Agent, AgentRole, AgentSettings, FixedRouter, Interaction, QueryOutcome, Specialist,
    ToolRegistry,
};
use agentseek_memory::MemoryStore;
use agentseek_provider::{ChatParams, ChatResponse, Provider, ProviderError};
use common::{probe_agent, ScriptedProvider};

/// Holds every request until the gate opens
struct GatedProvider {
    gate: Arc<Notify>,
}

#[async_trait]
impl Provider for GatedProvider {
    async fn chat(&self, _params: ChatParams) -> Result<ChatResponse, ProviderError> {
        self.gate.notified().await;
        Ok(ChatResponse::text("finally done"))
    }

    fn default_model(&self) -> String {
        "gated".to_string()
    }

    fn is_configured(&self) -> bool {
        true
    }
}

fn single(agent: Agent) -> Vec<Box<dyn Specialist>> {
    vec![Box::new(agent)]
}

#[tokio::test]
async fn test_second_query_while_busy() {
    let gate = Arc::new(Notify::new());
    let agent = Agent::new(
        "Friday",
        AgentRole::Casual,
        Arc::new(GatedProvider { gate: gate.clone() }),
        ToolRegistry::new(),
        "/tmp/agentseek-test",
        AgentSettings::default(),
    );
    let interaction = Arc::new(Interaction::new(single(agent)).unwrap());

    let first = {
        let interaction = interaction.clone();
        tokio::spawn(async move { interaction.think("first question").await })
    };
    while !interaction.is_busy() {
        tokio::task::yield_now().await;
    }

    let before = interaction.status().await;
    assert!(matches!(
        interaction.think("second question").await,
        QueryOutcome::Busy
    ));
    let after = interaction.status().await;
    assert_eq!(after.last_answer, before.last_answer);
    assert_eq!(after.last_query, None);

    gate.notify_one();
    match first.await.unwrap() {
        QueryOutcome::Answered(answer) => {
            assert_eq!(answer.answer, "finally done");
            assert!(answer.success);
        }
        QueryOutcome::Busy => panic!("first query should run"),
    }

    let status = interaction.status().await;
    assert_eq!(status.last_query.as_deref(), Some("first question"));
    assert_eq!(status.last_answer, "finally done");
    assert!(status.last_success);
    assert!(!status.is_active);
    assert_eq!(status.active_agent.as_deref(), Some("Friday"));
}

#[tokio::test]
async fn test_agent_error_becomes_failed_answer() {
    let provider = ScriptedProvider::with_replies(vec![Err(ProviderError::NoApiKey)]);
    let interaction =
        Interaction::new(single(probe_agent(provider, AgentRole::Casual, 3))).unwrap();

    let QueryOutcome::Answered(answer) = interaction.think("hello").await else {
        panic!("expected an answer");
    };
    assert!(!answer.success);
    assert_eq!(answer.answer, "Error: provider error: no api key configured");
    assert!(!interaction.status().await.last_success);
}

#[tokio::test]
async fn test_routing_by_keywords_and_fixed_router() {
    let casual = ScriptedProvider::new(vec!["hi!", "chatting"]);
    let coder = ScriptedProvider::new(vec!["code written"]);
    let agents: Vec<Box<dyn Specialist>> = vec![
        Box::new(probe_agent(casual.clone(), AgentRole::Casual, 3)),
        Box::new(probe_agent(coder.clone(), AgentRole::Coder, 3)),
    ];
    let interaction = Interaction::new(agents).unwrap();

    let QueryOutcome::Answered(answer) = interaction.think("write a python script").await else {
        panic!("expected an answer");
    };
    assert_eq!(answer.agent, "coder");
    assert_eq!(coder.calls(), 1);

    let QueryOutcome::Answered(answer) = interaction.think("good morning").await else {
        panic!("expected an answer");
    };
    assert_eq!(answer.agent, "casual");

    let agents: Vec<Box<dyn Specialist>> = vec![
        Box::new(probe_agent(ScriptedProvider::new(vec![]), AgentRole::Casual, 3)),
        Box::new(probe_agent(
            ScriptedProvider::new(vec!["forced"]),
            AgentRole::Coder,
            3,
        )),
    ];
    let fixed = Interaction::new(agents)
        .unwrap()
        .with_router(FixedRouter(AgentRole::Coder));
    let QueryOutcome::Answered(answer) = fixed.think("good morning").await else {
        panic!("expected an answer");
    };
    assert_eq!(answer.answer, "forced");
}

#[tokio::test]
async fn test_answer_carries_block_results() {
    let provider = ScriptedProvider::new(vec!["```probe\nx\n```\nDone."]);
    let interaction =
        Interaction::new(single(probe_agent(provider, AgentRole::Casual, 3))).unwrap();

    let QueryOutcome::Answered(answer) = interaction.think("probe it").await else {
        panic!("expected an answer");
    };
    assert_eq!(answer.blocks.len(), 1);
    assert_eq!(answer.blocks[0].tag, "probe");
    assert_eq!(answer.blocks[0].output, "probed x");
}

#[tokio::test]
async fn test_save_and_recover_sessions() {
    let dir = tempfile::tempdir().unwrap();

    let provider = ScriptedProvider::new(vec!["remembered"]);
    let interaction = Interaction::new(single(probe_agent(provider, AgentRole::Casual, 3)))
        .unwrap()
        .with_store(MemoryStore::new(dir.path()), true);
    interaction.think("remember this").await;

    let store = MemoryStore::new(dir.path());
    assert_eq!(store.list().await, vec!["casual_agent".to_string()]);

    let fresh = Interaction::new(single(probe_agent(
        ScriptedProvider::new(vec![]),
        AgentRole::Casual,
        3,
    )))
    .unwrap()
    .with_store(MemoryStore::new(dir.path()), false);
    assert_eq!(fresh.recover_sessions().await, 1);
}

#[test]
fn test_empty_roster_rejected() {
    assert!(Interaction::new(Vec::new()).is_err());
}
