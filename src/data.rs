//! Data models for orders, book views, and client configuration

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of the book an order rests on
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum OrderSide {
    Bid,
    Ask,
}

impl OrderSide {
    /// Parse a side from the wire. ACX uses "bid"/"ask" on the stream and
    /// "buy"/"sell" on REST order rows.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "bid" | "buy" => Some(OrderSide::Bid),
            "ask" | "sell" => Some(OrderSide::Ask),
            _ => None,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Bid => write!(f, "bid"),
            OrderSide::Ask => write!(f, "ask"),
        }
    }
}

/// A single resting order in the replicated book.
///
/// Orders are immutable once constructed; updates replace the whole order
/// rather than patching fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: i64,
    pub side: OrderSide,
    pub ord_type: Option<String>,
    pub price: Decimal,
    pub market: String,
    pub remaining_volume: Decimal,
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Order[{}:{}]: {} {} @ {}",
            self.market, self.id, self.side, self.remaining_volume, self.price
        )
    }
}

/// Incremental book event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookAction {
    Add,
    Update,
    Remove,
}

impl BookAction {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "add" => Some(BookAction::Add),
            "update" => Some(BookAction::Update),
            "remove" => Some(BookAction::Remove),
            _ => None,
        }
    }
}

/// A single incremental order-book event from the stream
#[derive(Debug, Clone, PartialEq)]
pub struct BookEvent {
    pub action: BookAction,
    pub order: Order,
}

/// Aggregated price level, derived from raw orders on demand
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceLevel {
    pub price: Decimal,
    pub volume: Decimal,
}

impl fmt::Display for PriceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.volume, self.price)
    }
}

/// Depth-limited, aggregated view of one market's book
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookView {
    pub market: String,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}

impl fmt::Display for BookView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Book[{}]: {} bids, {} asks",
            self.market,
            self.bids.len(),
            self.asks.len()
        )
    }
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub rest_endpoint: String,
    pub ws_endpoint: String,
    pub reconnect_config: ReconnectConfig,
    pub timeout: std::time::Duration,
}

impl ClientConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.rest_endpoint.is_empty() {
            return Err("REST endpoint cannot be empty".to_string());
        }

        if !self.ws_endpoint.starts_with("ws://") && !self.ws_endpoint.starts_with("wss://") {
            return Err("Stream endpoint must be a valid WebSocket URL".to_string());
        }

        if self.timeout.as_secs() == 0 {
            return Err("Timeout must be greater than 0".to_string());
        }

        self.reconnect_config.validate()?;

        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rest_endpoint: "https://acx.io:443".to_string(),
            ws_endpoint: "wss://acx.io:8080".to_string(),
            reconnect_config: ReconnectConfig::default(),
            timeout: std::time::Duration::from_secs(30),
        }
    }
}

/// Reconnection configuration.
///
/// The reconnect loop never gives up; these parameters only shape the delay
/// between attempts.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    pub initial_delay: std::time::Duration,
    pub max_delay: std::time::Duration,
    pub backoff_multiplier: f64,
    /// Fraction of the delay randomized away to avoid thundering-herd
    /// reconnection (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl ReconnectConfig {
    /// Validate reconnection configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.initial_delay.as_millis() == 0 {
            return Err("Initial delay must be greater than 0".to_string());
        }

        if self.max_delay < self.initial_delay {
            return Err("Max delay must be greater than or equal to initial delay".to_string());
        }

        if self.backoff_multiplier <= 1.0 {
            return Err("Backoff multiplier must be greater than 1.0".to_string());
        }

        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err("Jitter factor must be between 0.0 and 1.0".to_string());
        }

        Ok(())
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: std::time::Duration::from_millis(250),
            max_delay: std::time::Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter_factor: 0.25,
        }
    }
}

/// Connection state machine.
///
/// The cycle is Disconnected -> Connecting -> Authenticating -> Streaming and
/// back to Disconnected on any transport fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Authenticating,
    Streaming,
}
