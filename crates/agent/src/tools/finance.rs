//! Money-moving tools: exchange orders and fine payments
//!
//! Both validate their parameters before touching the confirmer or any
//! backend, and ask for confirmation when safety mode is on.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use super::{require_params, Tool, ToolError, ERROR_MARKER};
use crate::blocks::Block;
use crate::confirm::Confirmer;
use crate::trading::{MarketClient, OrderRequest};

pub const ORDER_CANCELLED: &str = "Order cancelled by user.";
pub const PAYMENT_CANCELLED: &str = "Payment cancelled.";

/// `binance_trade` blocks: `symbol`, `qty`, `side`, optional `type`
pub struct BinanceTrader {
    client: Arc<MarketClient>,
    confirmer: Arc<dyn Confirmer>,
}

impl BinanceTrader {
    pub fn new(client: Arc<MarketClient>, confirmer: Arc<dyn Confirmer>) -> Self {
        Self { client, confirmer }
    }

    fn parse_order(block: &Block) -> Result<OrderRequest, ToolError> {
        let values = require_params(block, &["symbol", "qty", "side"])?;
        let (symbol, qty, side) = (values[0], values[1], values[2]);

        let quantity: f64 = qty
            .parse()
            .map_err(|_| ToolError::InvalidParam(format!("invalid quantity '{}'", qty)))?;
        if quantity <= 0.0 {
            return Err(ToolError::InvalidParam(format!(
                "quantity must be positive, got {}",
                qty
            )));
        }
        let side = side.to_uppercase();
        if side != "BUY" && side != "SELL" {
            return Err(ToolError::InvalidParam(format!(
                "side must be BUY or SELL, got {}",
                side
            )));
        }

        let mut order = OrderRequest::market(symbol, &side, quantity);
        if let Some(order_type) = block.param("type") {
            order.order_type = order_type.to_uppercase();
        }
        Ok(order)
    }

    async fn trade(&self, block: &Block, safety: bool) -> Result<String, ToolError> {
        let order = Self::parse_order(block)?;
        if !self.client.has_credentials() {
            return Err(ToolError::NotConfigured("Binance client".to_string()));
        }

        if safety {
            let question = format!(
                "Execute {} {} {}?",
                order.side,
                block.param("qty").unwrap_or_default(),
                order.symbol
            );
            if !self.confirmer.confirm(&question) {
                info!("◆ order for {} declined", order.symbol);
                return Ok(ORDER_CANCELLED.to_string());
            }
        }

        match self.client.place_order(&order).await {
            Ok(body) => Ok(format!(
                "Order placed: {} {} {}\n{}",
                order.side, order.quantity, order.symbol, body
            )),
            Err(e) => {
                warn!("◆ order failed: {}", e);
                Ok(format!("{} placing order: {}", ERROR_MARKER, e))
            }
        }
    }
}

#[async_trait]
impl Tool for BinanceTrader {
    fn tag(&self) -> &str {
        "binance_trade"
    }

    fn name(&self) -> &str {
        "Binance Trader"
    }

    fn description(&self) -> &str {
        "Place a spot order on Binance. Requires symbol, qty and side (BUY or SELL)."
    }

    fn usage(&self) -> String {
        "```binance_trade\nsymbol=BTCUSDT\nqty=0.001\nside=BUY\ntype=MARKET\n```".to_string()
    }

    async fn execute(&self, blocks: &[Block], safety: bool) -> String {
        let mut outputs = Vec::new();
        for block in blocks {
            let output = self
                .trade(block, safety)
                .await
                .unwrap_or_else(|e| e.render());
            if self.execution_failure_check(&output) {
                return output;
            }
            outputs.push(output);
        }
        outputs.join("\n")
    }

    fn interpreter_feedback(&self, output: &str) -> String {
        if self.execution_failure_check(output) || output.starts_with(ORDER_CANCELLED) {
            output.to_string()
        } else {
            format!("Trade executed: {}", output)
        }
    }
}

/// Backend that actually moves the money for `pay_fine`
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn pay(&self, account: &str, amount: &str) -> Result<String, ToolError>;
}

/// Gateway that only reports what it would have paid
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedGateway;

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn pay(&self, account: &str, amount: &str) -> Result<String, ToolError> {
        Ok(format!("Paid {} from {}", amount, account))
    }
}

/// `pay_fine` blocks: `account`, `amount`
pub struct FinePayment {
    gateway: Arc<dyn PaymentGateway>,
    confirmer: Arc<dyn Confirmer>,
}

impl FinePayment {
    pub fn new(gateway: Arc<dyn PaymentGateway>, confirmer: Arc<dyn Confirmer>) -> Self {
        Self { gateway, confirmer }
    }

    async fn pay(&self, block: &Block, safety: bool) -> Result<String, ToolError> {
        let values = require_params(block, &["account", "amount"])?;
        let (account, amount) = (values[0], values[1]);

        if safety && !self.confirmer.confirm(&format!("Pay {} from {}?", amount, account)) {
            info!("◆ payment from {} declined", account);
            return Ok(PAYMENT_CANCELLED.to_string());
        }

        self.gateway.pay(account, amount).await
    }
}

#[async_trait]
impl Tool for FinePayment {
    fn tag(&self) -> &str {
        "pay_fine"
    }

    fn name(&self) -> &str {
        "Fine Payment"
    }

    fn description(&self) -> &str {
        "Pay a fine from an account. Requires account and amount."
    }

    fn usage(&self) -> String {
        "```pay_fine\naccount=A1\namount=50\n```".to_string()
    }

    async fn execute(&self, blocks: &[Block], safety: bool) -> String {
        let mut outputs = Vec::new();
        for block in blocks {
            let output = self
                .pay(block, safety)
                .await
                .unwrap_or_else(|e| e.render());
            if self.execution_failure_check(&output) {
                return output;
            }
            outputs.push(output);
        }
        outputs.join("\n")
    }

    fn interpreter_feedback(&self, output: &str) -> String {
        if self.execution_failure_check(output) || output.starts_with(PAYMENT_CANCELLED) {
            output.to_string()
        } else {
            format!("Payment result: {}", output)
        }
    }
}
