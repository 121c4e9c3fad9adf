//! Binance spot market access and the moving-average trade signal
//!
//! Public endpoints (`/ticker/price`, `/klines`) need no credentials. Order
//! placement signs the sorted query string with HMAC-SHA256 and fails with
//! [`TradingError::MissingCredentials`] before any request when no key pair
//! is configured.

use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use agentseek_config::Config;

/// Candles used for the moving average
pub const DEFAULT_KLINE_LIMIT: u32 = 24;
pub const DEFAULT_KLINE_INTERVAL: &str = "1h";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum TradingError {
    #[error("Missing Binance API credentials")]
    MissingCredentials,

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("exchange returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, TradingError>;

/// API key pair, read once at construction
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"***")
            .field("api_secret", &"***")
            .finish()
    }
}

/// One candle: open time and close price
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kline {
    pub open_time: f64,
    pub close: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Buy,
    Sell,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Buy => "buy",
            Signal::Sell => "sell",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mean close price; `0.0` for no candles
pub fn moving_average(klines: &[Kline]) -> f64 {
    if klines.is_empty() {
        return 0.0;
    }
    klines.iter().map(|k| k.close).sum::<f64>() / klines.len() as f64
}

/// Buy only when the price is strictly above the average
pub fn signal_for(price: f64, average: f64) -> Signal {
    if price > average {
        Signal::Buy
    } else {
        Signal::Sell
    }
}

/// Hex HMAC-SHA256 of `query` keyed with `secret`
pub fn sign(query: &str, secret: &str) -> String {
    // HMAC accepts keys of any length
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(query.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Sorted `k=v&...` query with `timestamp` and a trailing `signature`
pub fn signed_query(params: &BTreeMap<String, String>, timestamp_ms: i64, secret: &str) -> String {
    let mut params = params.clone();
    params.insert("timestamp".to_string(), timestamp_ms.to_string());
    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");
    let signature = sign(&query, secret);
    format!("{}&signature={}", query, signature)
}

/// Market order request
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: String,
    pub order_type: String,
    pub quantity: f64,
}

impl OrderRequest {
    pub fn market(symbol: &str, side: &str, quantity: f64) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            side: side.to_uppercase(),
            order_type: "MARKET".to_string(),
            quantity,
        }
    }

    fn params(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("symbol".to_string(), self.symbol.to_uppercase()),
            ("side".to_string(), self.side.to_uppercase()),
            ("type".to_string(), self.order_type.to_uppercase()),
            ("quantity".to_string(), self.quantity.to_string()),
        ])
    }
}

/// Inputs and outcome of one signal computation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalReport {
    pub price: f64,
    pub average: f64,
    pub signal: Signal,
}

/// REST client for the trading venue
pub struct MarketClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Option<Credentials>,
    live_orders: bool,
}

impl MarketClient {
    pub fn new(base_url: impl Into<String>, credentials: Option<Credentials>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            live_orders: false,
        }
    }

    /// Build from config; credentials are kept only when both halves exist
    pub fn from_config(config: &Config) -> Self {
        let credentials = match config.trading_credentials() {
            (Some(api_key), Some(api_secret)) => Some(Credentials {
                api_key,
                api_secret,
            }),
            _ => None,
        };
        Self::new(config.trading.base_url.clone(), credentials)
            .with_live_orders(config.trading.live_orders)
    }

    /// Send orders to `/order` instead of `/order/test`
    pub fn with_live_orders(mut self, live: bool) -> Self {
        self.live_orders = live;
        self
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TradingError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }

    /// Latest price as reported by the venue
    pub async fn fetch_price(&self, symbol: &str) -> Result<String> {
        let symbol = symbol.to_uppercase();
        debug!("◆ fetching price for {}", symbol);
        let json = self
            .get_json("/api/v3/ticker/price", &[("symbol", symbol.clone())])
            .await?;
        match &json["price"] {
            Value::String(price) => Ok(price.clone()),
            Value::Number(price) => Ok(price.to_string()),
            _ => Err(TradingError::InvalidResponse(format!(
                "no price for {}",
                symbol
            ))),
        }
    }

    /// Recent candles, oldest first
    pub async fn fetch_klines(&self, symbol: &str, interval: &str, limit: u32) -> Result<Vec<Kline>> {
        let json = self
            .get_json(
                "/api/v3/klines",
                &[
                    ("symbol", symbol.to_uppercase()),
                    ("interval", interval.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        let rows = json
            .as_array()
            .ok_or_else(|| TradingError::InvalidResponse("klines is not an array".into()))?;
        rows.iter().map(parse_kline).collect()
    }

    /// Price, candle average and the signal they give, from one fetch of each
    pub async fn analyze(&self, symbol: &str) -> Result<SignalReport> {
        let klines = self
            .fetch_klines(symbol, DEFAULT_KLINE_INTERVAL, DEFAULT_KLINE_LIMIT)
            .await?;
        let price = self.fetch_price(symbol).await?;
        let price: f64 = price
            .parse()
            .map_err(|_| TradingError::InvalidResponse(format!("bad price '{}'", price)))?;
        let average = moving_average(&klines);
        let signal = signal_for(price, average);
        info!(
            "◆ {} price {} vs {}-candle average {}: {}",
            symbol.to_uppercase(),
            price,
            klines.len(),
            average,
            signal
        );
        Ok(SignalReport {
            price,
            average,
            signal,
        })
    }

    pub async fn determine_trade_signal(&self, symbol: &str) -> Result<Signal> {
        Ok(self.analyze(symbol).await?.signal)
    }

    /// Place a signed order and return the venue's reply body
    pub async fn place_order(&self, order: &OrderRequest) -> Result<String> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(TradingError::MissingCredentials)?;

        let path = if self.live_orders {
            "/api/v3/order"
        } else {
            "/api/v3/order/test"
        };
        let timestamp = chrono::Utc::now().timestamp_millis();
        let query = signed_query(&order.params(), timestamp, &credentials.api_secret);
        let url = format!("{}{}?{}", self.base_url, path, query);

        info!(
            "◆ placing {} {} {} order for {}",
            order.side, order.order_type, order.symbol, order.quantity
        );
        let response = self
            .client
            .post(&url)
            .header("X-MBX-APIKEY", &credentials.api_key)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(TradingError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(body)
    }
}

fn parse_kline(row: &Value) -> Result<Kline> {
    let number = |v: &Value| -> Option<f64> {
        match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    };
    let open_time = row.get(0).and_then(number);
    let close = row.get(4).and_then(number);
    match (open_time, close) {
        (Some(open_time), Some(close)) => Ok(Kline { open_time, close }),
        _ => Err(TradingError::InvalidResponse(format!("bad kline {}", row))),
    }
}
