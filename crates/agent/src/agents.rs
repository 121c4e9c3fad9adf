//! Construction of the standard agent roster from config

use std::path::PathBuf;
use std::sync::Arc;

use agentseek_config::Config;
use agentseek_memory::Memory;
use agentseek_provider::Provider;

use crate::agent::{Agent, AgentRole, AgentSettings, Specialist};
use crate::confirm::Confirmer;
use crate::context::ContextBuilder;
use crate::planner::PlannerAgent;
use crate::tools::{
    BashInterpreter, BinanceTrader, CodeInterpreter, FileFinder, FinePayment, FlightSearch,
    PaymentGateway, ReportGenerator, SimulatedGateway, ToolRegistry, WebSearch,
};
use crate::trading::MarketClient;
use crate::trading_agent::TradingAgent;
use crate::Result;

/// Builds agents that share one provider, confirmer and market client
pub struct AgentFactory {
    provider: Arc<dyn Provider>,
    config: Config,
    confirmer: Arc<dyn Confirmer>,
    payment: Arc<dyn PaymentGateway>,
    market: Arc<MarketClient>,
    work_dir: PathBuf,
    prompt_dir: Option<PathBuf>,
}

impl AgentFactory {
    pub fn new(provider: Arc<dyn Provider>, config: Config, confirmer: Arc<dyn Confirmer>) -> Self {
        let market = Arc::new(MarketClient::from_config(&config));
        let work_dir = config.work_dir();
        Self {
            provider,
            config,
            confirmer,
            payment: Arc::new(SimulatedGateway),
            market,
            work_dir,
            prompt_dir: None,
        }
    }

    pub fn with_payment_gateway(mut self, payment: Arc<dyn PaymentGateway>) -> Self {
        self.payment = payment;
        self
    }

    pub fn with_market_client(mut self, market: Arc<MarketClient>) -> Self {
        self.market = market;
        self
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    /// Directory of `<role>.md` prompt overrides
    pub fn with_prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn settings(&self) -> AgentSettings {
        AgentSettings::from_config(&self.config)
    }

    fn build(&self, name: &str, role: AgentRole, tools: ToolRegistry) -> Agent {
        let memory = Memory::new(role.type_tag(), "")
            .with_max_messages(self.config.agent.max_messages)
            .with_compression(self.config.agent.memory_compression);
        let agent = Agent::new(
            name,
            role,
            self.provider.clone(),
            tools,
            &self.work_dir,
            self.settings(),
        );
        let agent = match &self.prompt_dir {
            Some(dir) => agent.with_context(&ContextBuilder::new(&self.work_dir).with_prompt_dir(dir)),
            None => agent,
        };
        agent.with_memory(memory)
    }

    pub fn casual(&self) -> Result<Agent> {
        let mut tools = ToolRegistry::new();
        tools.register(BashInterpreter::new(self.work_dir.clone()))?;
        Ok(self.build(&self.config.agent.name, AgentRole::Casual, tools))
    }

    pub fn coder(&self) -> Result<Agent> {
        let mut tools = ToolRegistry::new();
        tools.register(BashInterpreter::new(self.work_dir.clone()))?;
        tools.register(CodeInterpreter::python(self.work_dir.clone()))?;
        tools.register(CodeInterpreter::go(self.work_dir.clone()))?;
        tools.register(CodeInterpreter::c(self.work_dir.clone()))?;
        Ok(self.build("Coder", AgentRole::Coder, tools))
    }

    pub fn file(&self) -> Result<Agent> {
        let mut tools = ToolRegistry::new();
        tools.register(FileFinder::new(self.work_dir.clone()))?;
        tools.register(BashInterpreter::new(self.work_dir.clone()))?;
        Ok(self.build("File Agent", AgentRole::File, tools))
    }

    pub fn web(&self) -> Result<Agent> {
        let mut tools = ToolRegistry::new();
        tools.register(WebSearch::new(self.config.searxng_url()))?;
        tools.register(FlightSearch::new(self.config.flight_api_key()))?;
        Ok(self.build("Browser", AgentRole::Web, tools))
    }

    pub fn finance(&self) -> Result<Agent> {
        let mut tools = ToolRegistry::new();
        tools.register(FileFinder::new(self.work_dir.clone()))?;
        tools.register(BashInterpreter::new(self.work_dir.clone()))?;
        tools.register(BinanceTrader::new(
            self.market.clone(),
            self.confirmer.clone(),
        ))?;
        tools.register(FinePayment::new(
            self.payment.clone(),
            self.confirmer.clone(),
        ))?;
        tools.register(ReportGenerator::new(self.work_dir.clone()))?;
        Ok(self.build("Finance", AgentRole::Finance, tools))
    }

    pub fn trading(&self) -> TradingAgent {
        TradingAgent::new(
            "Trader",
            self.market.clone(),
            self.confirmer.clone(),
            self.config.agent.safety,
        )
    }

    /// Planner over its own copy of every other agent
    pub fn planner(&self) -> Result<PlannerAgent> {
        let decomposer = self.build("Planner", AgentRole::Planner, ToolRegistry::new());
        Ok(PlannerAgent::new("Planner", decomposer, self.workers()?))
    }

    fn workers(&self) -> Result<Vec<Box<dyn Specialist>>> {
        let mut agents: Vec<Box<dyn Specialist>> = Vec::with_capacity(7);
        agents.push(Box::new(self.casual()?));
        agents.push(Box::new(self.coder()?));
        agents.push(Box::new(self.file()?));
        agents.push(Box::new(self.web()?));
        agents.push(Box::new(self.finance()?));
        agents.push(Box::new(self.trading()));
        Ok(agents)
    }

    /// Every agent an interactive session routes between
    pub fn roster(&self) -> Result<Vec<Box<dyn Specialist>>> {
        let mut agents = self.workers()?;
        agents.push(Box::new(self.planner()?));
        Ok(agents)
    }
}
