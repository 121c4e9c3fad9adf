//! Session controller: routes queries to agents one at a time
//!
//! The roster sits behind a `tokio::sync::Mutex`. A query that arrives while
//! another is being processed is refused with [`QueryOutcome::Busy`] instead
//! of waiting, and the recorded status is left alone.

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use agentseek_memory::MemoryStore;

use crate::agent::{AgentRole, ExecutionResult, Specialist};
use crate::{AgentError, Result};

/// Picks the agent for a query
pub trait AgentRouter: Send + Sync {
    /// Index into `roles`, or `None` to use the first agent
    fn route(&self, query: &str, roles: &[AgentRole]) -> Option<usize>;
}

/// Scores each role by keyword hits; no hits routes to `casual`
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordRouter;

impl KeywordRouter {
    fn score(query: &str, role: AgentRole) -> usize {
        role.keywords()
            .iter()
            .filter(|keyword| contains_word(query, keyword))
            .count()
    }
}

/// Whole-word (or whole-phrase) match on a lowercased query
fn contains_word(query: &str, phrase: &str) -> bool {
    let is_boundary = |c: Option<char>| c.map_or(true, |c| !c.is_alphanumeric());
    query.match_indices(phrase).any(|(start, _)| {
        let before = query[..start].chars().next_back();
        let after = query[start + phrase.len()..].chars().next();
        is_boundary(before) && is_boundary(after)
    })
}

impl AgentRouter for KeywordRouter {
    fn route(&self, query: &str, roles: &[AgentRole]) -> Option<usize> {
        let query = query.to_lowercase();
        let mut best: Option<(usize, usize)> = None;
        for (index, role) in roles.iter().enumerate() {
            let score = Self::score(&query, *role);
            if score > 0 && best.map_or(true, |(_, top)| score > top) {
                best = Some((index, score));
            }
        }
        best.map(|(index, _)| index)
            .or_else(|| roles.iter().position(|r| *r == AgentRole::Casual))
    }
}

/// Always routes to one role
#[derive(Debug, Clone, Copy)]
pub struct FixedRouter(pub AgentRole);

impl AgentRouter for FixedRouter {
    fn route(&self, _query: &str, roles: &[AgentRole]) -> Option<usize> {
        roles.iter().position(|r| *r == self.0)
    }
}

/// Snapshot of the session that callers poll
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionStatus {
    pub active_agent: Option<String>,
    pub last_query: Option<String>,
    pub last_answer: String,
    pub last_reasoning: Option<String>,
    pub last_success: bool,
    pub is_active: bool,
    pub status_message: String,
}

/// Result of a processed query
#[derive(Debug, Clone, Serialize)]
pub struct QueryAnswer {
    pub agent: String,
    pub answer: String,
    pub reasoning: Option<String>,
    pub success: bool,
    pub blocks: Vec<ExecutionResult>,
}

#[derive(Debug, Clone)]
pub enum QueryOutcome {
    /// Another query is still being processed
    Busy,
    Answered(QueryAnswer),
}

pub struct Interaction {
    agents: Mutex<Vec<Box<dyn Specialist>>>,
    roles: Vec<AgentRole>,
    names: Vec<String>,
    status: RwLock<SessionStatus>,
    router: Box<dyn AgentRouter>,
    store: Option<MemoryStore>,
    save_session: bool,
}

impl Interaction {
    pub fn new(agents: Vec<Box<dyn Specialist>>) -> Result<Self> {
        if agents.is_empty() {
            return Err(AgentError::NoAgents);
        }
        let roles = agents.iter().map(|a| a.role()).collect();
        let names = agents.iter().map(|a| a.name().to_string()).collect();
        Ok(Self {
            agents: Mutex::new(agents),
            roles,
            names,
            status: RwLock::new(SessionStatus {
                status_message: "Ready".to_string(),
                ..Default::default()
            }),
            router: Box::new(KeywordRouter),
            store: None,
            save_session: false,
        })
    }

    pub fn with_router(mut self, router: impl AgentRouter + 'static) -> Self {
        self.router = Box::new(router);
        self
    }

    /// Store used by [`recover_sessions`](Self::recover_sessions) and, when
    /// `save_session` is set, after every query
    pub fn with_store(mut self, store: MemoryStore, save_session: bool) -> Self {
        self.store = Some(store);
        self.save_session = save_session;
        self
    }

    pub fn roles(&self) -> &[AgentRole] {
        &self.roles
    }

    pub fn agent_names(&self) -> &[String] {
        &self.names
    }

    /// Whether a query is being processed right now
    pub fn is_busy(&self) -> bool {
        self.agents.try_lock().is_err()
    }

    pub async fn status(&self) -> SessionStatus {
        self.status.read().await.clone()
    }

    /// Index of the agent `query` would be routed to
    pub fn route(&self, query: &str) -> usize {
        self.router
            .route(query, &self.roles)
            .filter(|&index| index < self.roles.len())
            .unwrap_or(0)
    }

    /// Process one query on the routed agent
    pub async fn think(&self, query: &str) -> QueryOutcome {
        let Ok(mut agents) = self.agents.try_lock() else {
            debug!("◆ query refused, session busy");
            return QueryOutcome::Busy;
        };

        let index = self.route(query);
        let agent = &mut agents[index];
        let agent_name = agent.name().to_string();
        info!("◆ routing to {} ({})", agent_name, agent.role());

        {
            let mut status = self.status.write().await;
            status.is_active = true;
            status.active_agent = Some(agent_name.clone());
            status.status_message = "Thinking...".to_string();
        }

        let (answer, reasoning, success) = match agent.process(query).await {
            Ok((answer, reasoning)) => (answer, reasoning, agent.success()),
            Err(e) => {
                warn!("◆ {} failed: {}", agent_name, e);
                (format!("Error: {}", e), None, false)
            }
        };
        let blocks = agent.blocks_result().to_vec();

        if self.save_session {
            if let Some(store) = &self.store {
                if let Err(e) = store.save(agent.memory()).await {
                    warn!("◆ could not save memory for {}: {}", agent_name, e);
                }
            }
        }

        {
            let mut status = self.status.write().await;
            status.last_query = Some(query.to_string());
            status.last_answer = answer.clone();
            status.last_reasoning = reasoning.clone();
            status.last_success = success;
            status.is_active = false;
            status.status_message = agent.status_message().to_string();
        }

        QueryOutcome::Answered(QueryAnswer {
            agent: agent_name,
            answer,
            reasoning,
            success,
            blocks,
        })
    }

    /// Restore each agent's saved transcript; returns how many were restored
    pub async fn recover_sessions(&self) -> usize {
        let Some(store) = &self.store else {
            return 0;
        };
        let mut agents = self.agents.lock().await;
        let mut restored = 0;
        for agent in agents.iter_mut() {
            if store.recover(agent.memory_mut()).await {
                info!("◆ recovered session for {}", agent.name());
                restored += 1;
            }
        }
        restored
    }

    /// Save every agent's transcript
    pub async fn save_sessions(&self) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let agents = self.agents.lock().await;
        for agent in agents.iter() {
            store.save(agent.memory()).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLES: [AgentRole; 4] = [
        AgentRole::Casual,
        AgentRole::Coder,
        AgentRole::Web,
        AgentRole::Trading,
    ];

    #[test]
    fn test_keyword_router() {
        let router = KeywordRouter;
        assert_eq!(router.route("Write a python script to debug this", &ROLES), Some(1));
        assert_eq!(router.route("search the web for news", &ROLES), Some(2));
        assert_eq!(router.route("what is the BTC price", &ROLES), Some(3));
        assert_eq!(router.route("tell me about your day", &ROLES), Some(0));
    }

    #[test]
    fn test_keyword_router_whole_words() {
        // "this" must not match "hi"
        assert_eq!(KeywordRouter::score("this is it", AgentRole::Casual), 0);
        assert_eq!(KeywordRouter::score("hi there", AgentRole::Casual), 1);
    }

    #[test]
    fn test_fixed_router() {
        assert_eq!(FixedRouter(AgentRole::Web).route("anything", &ROLES), Some(2));
        assert_eq!(FixedRouter(AgentRole::Planner).route("anything", &ROLES), None);
    }
}
