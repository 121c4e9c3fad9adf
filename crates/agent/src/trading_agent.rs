//! Command-driven trading agent
//!
//! Answers without a model round-trip:
//!
//! - `test SYMBOL` reports the moving-average signal
//! - `trade SYMBOL QTY` places a BUY market order
//! - `SYMBOL` reports the latest price

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use agentseek_memory::Memory;

use crate::agent::{AgentRole, ExecutionResult, Specialist};
use crate::confirm::Confirmer;
use crate::tools::finance::ORDER_CANCELLED;
use crate::trading::{MarketClient, OrderRequest, TradingError};
use crate::Result;

const SYSTEM_PROMPT: &str =
    "Commands: `test SYMBOL` for a signal, `trade SYMBOL QTY` to buy, `SYMBOL` for the price.";

pub struct TradingAgent {
    name: String,
    client: Arc<MarketClient>,
    confirmer: Arc<dyn Confirmer>,
    safety: bool,
    memory: Memory,
    last_answer: String,
    success: bool,
    status_message: String,
}

impl TradingAgent {
    pub fn new(
        name: impl Into<String>,
        client: Arc<MarketClient>,
        confirmer: Arc<dyn Confirmer>,
        safety: bool,
    ) -> Self {
        Self {
            name: name.into(),
            client,
            confirmer,
            safety,
            memory: Memory::new(AgentRole::Trading.type_tag(), SYSTEM_PROMPT),
            last_answer: String::new(),
            success: false,
            status_message: "Ready".to_string(),
        }
    }

    /// Run one command, returning the answer and whether it succeeded
    pub async fn run_command(&self, command: &str) -> (String, bool) {
        let parts: Vec<&str> = command.split_whitespace().collect();
        let Some(first) = parts.first() else {
            return ("No command".to_string(), false);
        };

        match (first.to_ascii_lowercase().as_str(), parts.len()) {
            ("test", n) if n >= 2 => self.test_signal(parts[1]).await,
            ("trade", n) if n >= 3 => self.trade(parts[1], parts[2]).await,
            _ => self.price(first).await,
        }
    }

    async fn test_signal(&self, symbol: &str) -> (String, bool) {
        let symbol = symbol.to_uppercase();
        match self.client.determine_trade_signal(&symbol).await {
            Ok(signal) => (format!("Test signal for {}: {}", symbol, signal), true),
            Err(e) => {
                warn!("◆ signal for {} failed: {}", symbol, e);
                (format!("Error computing signal for {}: {}", symbol, e), false)
            }
        }
    }

    async fn trade(&self, symbol: &str, qty: &str) -> (String, bool) {
        let quantity: f64 = match qty.parse() {
            Ok(q) if q > 0.0 => q,
            _ => return (format!("Trade error: invalid quantity '{}'", qty), false),
        };
        if !self.client.has_credentials() {
            return (format!("Trade error: {}", TradingError::MissingCredentials), false);
        }
        let order = OrderRequest::market(symbol, "BUY", quantity);

        if self.safety {
            let question = format!("Execute {} {} {}?", order.side, qty, order.symbol);
            if !self.confirmer.confirm(&question) {
                return (ORDER_CANCELLED.to_string(), true);
            }
        }

        match self.client.place_order(&order).await {
            Ok(_) => {
                info!("◆ order placed for {} {}", quantity, order.symbol);
                ("Order placed".to_string(), true)
            }
            Err(e) => (format!("Trade error: {}", e), false),
        }
    }

    async fn price(&self, symbol: &str) -> (String, bool) {
        let symbol = symbol.to_uppercase();
        match self.client.fetch_price(&symbol).await {
            Ok(price) => (format!("Current price of {} is {} USDT.", symbol, price), true),
            Err(e) => (format!("Error fetching price for {}: {}", symbol, e), false),
        }
    }
}

#[async_trait]
impl Specialist for TradingAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> AgentRole {
        AgentRole::Trading
    }

    async fn process(&mut self, prompt: &str) -> Result<(String, Option<String>)> {
        self.status_message = "Thinking...".to_string();
        self.memory.push("user", prompt);

        let (answer, success) = self.run_command(prompt).await;

        self.memory.push("assistant", answer.clone());
        self.last_answer = answer.clone();
        self.success = success;
        self.status_message = "Ready".to_string();
        Ok((answer, None))
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
        &[]
    }

    fn memory(&self) -> &Memory {
        &self.memory
    }

    fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }
}
