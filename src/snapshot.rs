//! Full book snapshots
//!
//! Fetches an authoritative order book from the REST collaborator and loads
//! it into a [`BookStore`], replacing all incremental state. Retry policy
//! belongs to the caller; errors propagate unchanged.

use crate::{
    data::{Order, OrderSide},
    error::{ParseError, SdkError},
    orderbook::BookStore,
    parser::{decimal_from_value, FrameParser},
};
use async_trait::async_trait;
use serde_json::Value;

/// Full book for one market, as raw orders partitioned by side
#[derive(Debug, Clone, Default)]
pub struct OrderBookSnapshot {
    pub bids: Vec<Order>,
    pub asks: Vec<Order>,
}

/// Source of full book snapshots.
///
/// Implemented by the REST client; tests substitute a mock.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch up to `asks_limit`/`bids_limit` orders per side for a market
    async fn fetch_order_book(
        &self,
        market: &str,
        asks_limit: usize,
        bids_limit: usize,
    ) -> Result<OrderBookSnapshot, SdkError>;
}

/// Load a fresh snapshot into a store, replacing prior state
pub async fn load_snapshot(
    store: &mut BookStore,
    source: &dyn SnapshotSource,
    depth_limit: usize,
) -> Result<(), SdkError> {
    let market = store.market().to_string();
    let snapshot = source
        .fetch_order_book(&market, depth_limit, depth_limit)
        .await?;

    tracing::debug!(
        "Loaded snapshot for {}: {} bids, {} asks",
        market,
        snapshot.bids.len(),
        snapshot.asks.len()
    );
    store.replace(snapshot.bids, snapshot.asks);
    Ok(())
}

/// Map an `order_book` REST response body into a snapshot.
///
/// The endpoint normally returns raw order rows (objects with an `id`). If a
/// side instead arrives pre-aggregated as `[price, volume]` pairs, each pair
/// is loaded as one synthetic order with a loader-assigned negative id so
/// later stream events cannot collide with it.
pub fn parse_snapshot(market: &str, body: &Value) -> Result<OrderBookSnapshot, SdkError> {
    let bids = parse_side(market, body, "bids", OrderSide::Bid)?;
    let asks = parse_side(market, body, "asks", OrderSide::Ask)?;
    Ok(OrderBookSnapshot { bids, asks })
}

fn parse_side(
    market: &str,
    body: &Value,
    field: &str,
    side: OrderSide,
) -> Result<Vec<Order>, SdkError> {
    let rows = body
        .get(field)
        .and_then(|v| v.as_array())
        .ok_or_else(|| SdkError::Parse(ParseError::MissingField(field.to_string())))?;

    let parser = FrameParser::new();
    let mut orders = Vec::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        let order = match row {
            Value::Object(_) => {
                let mut order = parser.parse_order(row).map_err(SdkError::Parse)?;
                // rows carry the side implicitly when the endpoint omits it
                order.side = side;
                order
            }
            Value::Array(pair) if pair.len() >= 2 => Order {
                id: -(idx as i64 + 1),
                side,
                ord_type: None,
                price: extract_level_entry(&pair[0], field)?,
                market: market.to_lowercase(),
                remaining_volume: extract_level_entry(&pair[1], field)?,
            },
            other => {
                return Err(SdkError::Parse(ParseError::MalformedMessage(format!(
                    "Unexpected {} row: {}",
                    field, other
                ))))
            }
        };
        orders.push(order);
    }

    Ok(orders)
}

fn extract_level_entry(value: &Value, field: &str) -> Result<rust_decimal::Decimal, SdkError> {
    decimal_from_value(value).map_err(|e| {
        SdkError::Parse(ParseError::InvalidDataType(format!(
            "Bad {} level: {}",
            field, e
        )))
    })
}
