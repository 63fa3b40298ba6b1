//! REST API client for ACX
//!
//! Provides the signed request/response surface around the replication core:
//! account and balance queries, order management, deposits, market metadata,
//! historical trades and candles, and the order-book snapshot endpoint the
//! snapshot loader consumes.

use crate::auth::Credentials;
use crate::data::OrderSide;
use crate::error::{ParseError, SdkError};
use crate::parser::extract_decimal;
use crate::snapshot::{parse_snapshot, OrderBookSnapshot, SnapshotSource};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;

const API_PREFIX: &str = "/api/v2";

/// REST API client for ACX
pub struct AcxRestClient {
    credentials: Credentials,
    endpoint: String,
    http_client: reqwest::Client,
}

impl AcxRestClient {
    /// Create a new REST client with credentials
    pub fn new(credentials: Credentials, endpoint: &str) -> Self {
        Self {
            credentials,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http_client: reqwest::Client::new(),
        }
    }

    /// Create from environment variables, using the production endpoint
    pub fn from_env() -> Result<Self, SdkError> {
        let credentials = Credentials::from_env()?;
        Ok(Self::new(credentials, "https://acx.io:443"))
    }

    // ========== Account Endpoints ==========

    /// Get account balances for the authenticated member
    pub async fn get_my_account(&self) -> Result<Vec<AccountBalance>, SdkError> {
        let response = self.signed_get("/members/me.json", Vec::new()).await?;

        let accounts = response
            .get("accounts")
            .and_then(|v| v.as_array())
            .ok_or_else(|| SdkError::Parse(ParseError::MissingField("accounts".to_string())))?;

        accounts.iter().map(parse_account_balance).collect()
    }

    /// Get the authenticated member's executed trades for a market
    pub async fn get_my_trades(&self, market: &str) -> Result<Vec<TradeInfo>, SdkError> {
        let params = vec![
            ("market".to_string(), market.to_lowercase()),
            ("order_by".to_string(), "desc".to_string()),
        ];
        let response = self.signed_get("/trades/my.json", params).await?;
        parse_trade_list(&response)
    }

    /// Get deposit history, optionally filtered by currency
    pub async fn get_deposits(&self, currency: Option<&str>) -> Result<Value, SdkError> {
        let mut params = Vec::new();
        if let Some(currency) = currency {
            params.push(("currency".to_string(), currency.to_lowercase()));
        }
        self.signed_get("/deposits.json", params).await
    }

    // ========== Order Endpoints ==========

    /// Get the member's orders on a market, newest first
    pub async fn get_orders(&self, market: &str) -> Result<Vec<OrderInfo>, SdkError> {
        let params = vec![
            ("market".to_string(), market.to_lowercase()),
            ("order_by".to_string(), "desc".to_string()),
        ];
        let response = self.signed_get("/orders.json", params).await?;
        parse_order_list(&response)
    }

    /// Get a single order by id
    pub async fn get_order(&self, id: i64) -> Result<OrderInfo, SdkError> {
        let params = vec![("id".to_string(), id.to_string())];
        let response = self.signed_get("/order.json", params).await?;
        parse_order_info(&response)
    }

    /// Get open orders resting at an exact price on one side
    pub async fn get_orders_by_price(
        &self,
        market: &str,
        side: OrderSide,
        price: Decimal,
    ) -> Result<Vec<OrderInfo>, SdkError> {
        let params = vec![
            ("market".to_string(), market.to_lowercase()),
            ("state".to_string(), "wait".to_string()),
        ];
        let response = self.signed_get("/orders.json", params).await?;

        let orders = parse_order_list(&response)?;
        Ok(orders
            .into_iter()
            .filter(|o| o.side == side && o.price == price)
            .collect())
    }

    /// Place a single order
    pub async fn place_order(&self, market: &str, order: NewOrder) -> Result<OrderInfo, SdkError> {
        let params = vec![
            ("market".to_string(), market.to_lowercase()),
            ("side".to_string(), wire_side(order.side).to_string()),
            ("price".to_string(), order.price.to_string()),
            ("volume".to_string(), order.volume.to_string()),
        ];
        let response = self.signed_post("/orders.json", params).await?;
        let info = parse_order_info(&response)?;
        tracing::info!("Placed {} order {} on {}", info.side, info.id, market);
        Ok(info)
    }

    /// Cancel an order by id
    pub async fn delete_order(&self, id: i64) -> Result<OrderInfo, SdkError> {
        let params = vec![("id".to_string(), id.to_string())];
        let response = self.signed_post("/order/delete.json", params).await?;
        let info = parse_order_info(&response)?;
        tracing::info!("Cancelled order {}", id);
        Ok(info)
    }

    /// Cancel all of the member's open orders, optionally one side only
    pub async fn clear_orders(&self, side: Option<OrderSide>) -> Result<Vec<OrderInfo>, SdkError> {
        let mut params = Vec::new();
        if let Some(side) = side {
            params.push(("side".to_string(), wire_side(side).to_string()));
        }
        let response = self.signed_post("/orders/clear.json", params).await?;
        parse_order_list(&response)
    }

    /// Place several orders on one market in a single request.
    ///
    /// The multi endpoint signs the concatenated form body as-is, with the
    /// repeated `orders[][...]` fields in submission order, rather than the
    /// sorted-query payload used everywhere else.
    pub async fn place_orders(
        &self,
        market: &str,
        orders: &[NewOrder],
    ) -> Result<Vec<OrderInfo>, SdkError> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let market = market.to_lowercase();
        let tonce = Credentials::generate_tonce();

        let mut form: Vec<(String, String)> = vec![
            (
                "access_key".to_string(),
                self.credentials.access_key().to_string(),
            ),
            ("market".to_string(), market.clone()),
            ("tonce".to_string(), tonce.to_string()),
        ];
        for order in orders {
            form.push(("orders[][price]".to_string(), order.price.to_string()));
            form.push(("orders[][side]".to_string(), wire_side(order.side).to_string()));
            form.push(("orders[][volume]".to_string(), order.volume.to_string()));
        }

        let payload = multi_order_payload(self.credentials.access_key(), &market, orders, tonce);
        form.push((
            "signature".to_string(),
            self.credentials.sign_payload(&payload),
        ));

        let url = format!("{}{}{}", self.endpoint, API_PREFIX, "/orders/multi");
        let request = self.http_client.post(&url).form(&form);
        let response = self.execute(request, "/orders/multi").await?;
        let placed = parse_order_list(&response)?;
        tracing::info!("Placed {} orders on {}", placed.len(), market);
        Ok(placed)
    }

    /// Cancel-then-replace an order by id
    pub async fn update_order_by_id(
        &self,
        id: i64,
        market: &str,
        replacement: NewOrder,
    ) -> Result<OrderInfo, SdkError> {
        self.delete_order(id).await?;
        self.place_order(market, replacement).await
    }

    /// Converge the member's resting orders at one price to a single order
    /// of the given volume.
    ///
    /// Keeps the first resting order that already matches the volume,
    /// cancels every other order at that price, and places a fresh order
    /// when none matched. Returns the newly placed order, if any.
    pub async fn update_orders_by_price(
        &self,
        market: &str,
        side: OrderSide,
        price: Decimal,
        volume: Decimal,
    ) -> Result<Option<OrderInfo>, SdkError> {
        let resting = self.get_orders_by_price(market, side, price).await?;
        let (cancel, kept) = plan_price_level_update(&resting, volume);

        for id in cancel {
            self.delete_order(id).await?;
        }

        if kept {
            Ok(None)
        } else {
            self.place_order(market, NewOrder { side, price, volume })
                .await
                .map(Some)
        }
    }

    // ========== Public Market Data ==========

    /// Get metadata for all markets
    pub async fn get_markets(&self) -> Result<Vec<MarketInfo>, SdkError> {
        let response = self.public_get("/markets.json", Vec::new()).await?;

        let rows = response
            .as_array()
            .ok_or_else(|| SdkError::Parse(ParseError::InvalidDataType("Expected array".to_string())))?;

        rows.iter()
            .map(|row| {
                Ok(MarketInfo {
                    id: extract_string(row, "id")?,
                    name: extract_string(row, "name")?,
                })
            })
            .collect()
    }

    /// Get recent public trades for a market
    pub async fn get_trades(&self, market: &str) -> Result<Vec<TradeInfo>, SdkError> {
        let params = vec![("market".to_string(), market.to_lowercase())];
        let response = self.public_get("/trades.json", params).await?;
        parse_trade_list(&response)
    }

    /// Get OHLC candles for a market. `period` is in minutes.
    pub async fn get_candles(
        &self,
        market: &str,
        period: u32,
        limit: u32,
    ) -> Result<Vec<Candle>, SdkError> {
        let params = vec![
            ("market".to_string(), market.to_lowercase()),
            ("period".to_string(), period.to_string()),
            ("limit".to_string(), limit.to_string()),
        ];
        let response = self.public_get("/k.json", params).await?;

        let rows = response
            .as_array()
            .ok_or_else(|| SdkError::Parse(ParseError::InvalidDataType("Expected array".to_string())))?;

        rows.iter().map(parse_candle).collect()
    }

    // ========== Internal Methods ==========

    async fn signed_get(
        &self,
        path: &str,
        params: Vec<(String, String)>,
    ) -> Result<Value, SdkError> {
        self.signed_request(reqwest::Method::GET, path, params).await
    }

    async fn signed_post(
        &self,
        path: &str,
        params: Vec<(String, String)>,
    ) -> Result<Value, SdkError> {
        self.signed_request(reqwest::Method::POST, path, params).await
    }

    /// Make a signed request: merge in tonce, access_key, and signature
    async fn signed_request(
        &self,
        method: reqwest::Method,
        path: &str,
        mut params: Vec<(String, String)>,
    ) -> Result<Value, SdkError> {
        let full_path = format!("{}{}", API_PREFIX, path);
        let tonce = Credentials::generate_tonce();
        params.push(("tonce".to_string(), tonce.to_string()));

        let signature = self
            .credentials
            .sign_request(method.as_str(), &full_path, &params);
        params.push((
            "access_key".to_string(),
            self.credentials.access_key().to_string(),
        ));
        params.push(("signature".to_string(), signature));

        let url = format!("{}{}", self.endpoint, full_path);
        let request = if method == reqwest::Method::GET {
            self.http_client.get(&url).query(&params)
        } else {
            self.http_client.post(&url).form(&params)
        };

        self.execute(request, path).await
    }

    /// Make an unsigned public request
    async fn public_get(
        &self,
        path: &str,
        params: Vec<(String, String)>,
    ) -> Result<Value, SdkError> {
        let url = format!("{}{}{}", self.endpoint, API_PREFIX, path);
        let request = self.http_client.get(&url).query(&params);
        self.execute(request, path).await
    }

    async fn execute(&self, request: reqwest::RequestBuilder, path: &str) -> Result<Value, SdkError> {
        let response = request
            .send()
            .await
            .map_err(|e| SdkError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SdkError::Network(e.to_string()))?;

        tracing::debug!("ACX API response [{}]: {}", path, log_preview(&body));

        let json: Value = serde_json::from_str(&body)
            .map_err(|e| SdkError::Parse(ParseError::InvalidJson(e.to_string())))?;

        // ACX error shape: {"error": {"code": ..., "message": ...}}
        if let Some(error) = json.get("error") {
            let message = error
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown exchange error");
            return Err(SdkError::Exchange(message.to_string()));
        }

        if !status.is_success() {
            return Err(SdkError::Network(format!("HTTP {}: {}", status, body)));
        }

        Ok(json)
    }
}

#[async_trait]
impl SnapshotSource for AcxRestClient {
    async fn fetch_order_book(
        &self,
        market: &str,
        asks_limit: usize,
        bids_limit: usize,
    ) -> Result<OrderBookSnapshot, SdkError> {
        let params = vec![
            ("market".to_string(), market.to_lowercase()),
            ("asks_limit".to_string(), asks_limit.to_string()),
            ("bids_limit".to_string(), bids_limit.to_string()),
        ];
        let response = self.public_get("/order_book.json", params).await?;
        parse_snapshot(market, &response)
    }
}

// ========== Response Types ==========

/// Balance of one currency account
#[derive(Debug, Clone, PartialEq)]
pub struct AccountBalance {
    pub currency: String,
    pub balance: Decimal,
    pub locked: Decimal,
}

/// One order as reported by the REST API
#[derive(Debug, Clone, PartialEq)]
pub struct OrderInfo {
    pub id: i64,
    pub side: OrderSide,
    pub ord_type: Option<String>,
    pub price: Decimal,
    pub avg_price: Decimal,
    pub state: String,
    pub market: String,
    pub volume: Decimal,
    pub remaining_volume: Decimal,
    pub executed_volume: Decimal,
}

/// One executed trade
#[derive(Debug, Clone, PartialEq)]
pub struct TradeInfo {
    pub id: i64,
    pub price: Decimal,
    pub volume: Decimal,
    pub funds: Decimal,
    pub market: String,
    pub created_at: Option<String>,
}

/// Market metadata
#[derive(Debug, Clone, PartialEq)]
pub struct MarketInfo {
    pub id: String,
    pub name: String,
}

/// One OHLC candle, as returned by the k-line endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub timestamp: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// Parameters for a new order
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub side: OrderSide,
    pub price: Decimal,
    pub volume: Decimal,
}

/// Side vocabulary used by REST order rows
fn wire_side(side: OrderSide) -> &'static str {
    match side {
        OrderSide::Bid => "buy",
        OrderSide::Ask => "sell",
    }
}

/// Signing payload for the multi-order endpoint: the raw form body with
/// fields in submission order, not the sorted query used by other endpoints
fn multi_order_payload(access_key: &str, market: &str, orders: &[NewOrder], tonce: i64) -> String {
    let mut payload = format!(
        "POST|{}/orders/multi|access_key={}&market={}",
        API_PREFIX, access_key, market
    );
    for order in orders {
        payload.push_str(&format!(
            "&orders[][price]={}&orders[][side]={}&orders[][volume]={}",
            order.price,
            wire_side(order.side),
            order.volume
        ));
    }
    payload.push_str(&format!("&tonce={}", tonce));
    payload
}

/// Decide which resting orders at a price to cancel so that at most one
/// order of the target volume remains. Returns the ids to cancel and
/// whether a matching order was kept.
fn plan_price_level_update(resting: &[OrderInfo], volume: Decimal) -> (Vec<i64>, bool) {
    let mut kept = false;
    let mut cancel = Vec::new();
    for order in resting {
        if !kept && order.volume == volume {
            kept = true;
        } else {
            cancel.push(order.id);
        }
    }
    (cancel, kept)
}

/// Truncate a response body for debug logging without splitting a UTF-8
/// character
fn log_preview(body: &str) -> &str {
    if body.len() <= 200 {
        return body;
    }
    let mut end = 200;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

// ========== Parsing Helpers ==========

fn extract_string(obj: &Value, field: &str) -> Result<String, SdkError> {
    obj.get(field)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| SdkError::Parse(ParseError::MissingField(field.to_string())))
}

fn parse_account_balance(obj: &Value) -> Result<AccountBalance, SdkError> {
    Ok(AccountBalance {
        currency: extract_string(obj, "currency")?,
        balance: extract_decimal(obj, "balance").map_err(SdkError::Parse)?,
        locked: extract_decimal(obj, "locked").map_err(SdkError::Parse)?,
    })
}

fn parse_order_info(obj: &Value) -> Result<OrderInfo, SdkError> {
    let side_str = extract_string(obj, "side")?;
    let side = OrderSide::parse(&side_str).ok_or_else(|| {
        SdkError::Parse(ParseError::InvalidDataType(format!(
            "Invalid order side: {}",
            side_str
        )))
    })?;

    Ok(OrderInfo {
        id: obj
            .get("id")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| SdkError::Parse(ParseError::MissingField("id".to_string())))?,
        side,
        ord_type: obj
            .get("ord_type")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        price: extract_decimal(obj, "price").map_err(SdkError::Parse)?,
        avg_price: extract_decimal(obj, "avg_price").unwrap_or(Decimal::ZERO),
        state: extract_string(obj, "state").unwrap_or_else(|_| "wait".to_string()),
        market: extract_string(obj, "market")?.to_lowercase(),
        volume: extract_decimal(obj, "volume").map_err(SdkError::Parse)?,
        remaining_volume: extract_decimal(obj, "remaining_volume").unwrap_or(Decimal::ZERO),
        executed_volume: extract_decimal(obj, "executed_volume").unwrap_or(Decimal::ZERO),
    })
}

fn parse_order_list(response: &Value) -> Result<Vec<OrderInfo>, SdkError> {
    let rows = response
        .as_array()
        .ok_or_else(|| SdkError::Parse(ParseError::InvalidDataType("Expected array".to_string())))?;
    rows.iter().map(parse_order_info).collect()
}

fn parse_trade_list(response: &Value) -> Result<Vec<TradeInfo>, SdkError> {
    let rows = response
        .as_array()
        .ok_or_else(|| SdkError::Parse(ParseError::InvalidDataType("Expected array".to_string())))?;

    rows.iter()
        .map(|row| {
            Ok(TradeInfo {
                id: row
                    .get("id")
                    .and_then(|v| v.as_i64())
                    .ok_or_else(|| SdkError::Parse(ParseError::MissingField("id".to_string())))?,
                price: extract_decimal(row, "price").map_err(SdkError::Parse)?,
                volume: extract_decimal(row, "volume").map_err(SdkError::Parse)?,
                funds: extract_decimal(row, "funds").unwrap_or(Decimal::ZERO),
                market: extract_string(row, "market")?.to_lowercase(),
                created_at: row
                    .get("created_at")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string()),
            })
        })
        .collect()
}

fn parse_candle(row: &Value) -> Result<Candle, SdkError> {
    let entries = row
        .as_array()
        .filter(|a| a.len() >= 6)
        .ok_or_else(|| SdkError::Parse(ParseError::MalformedMessage("Bad candle row".to_string())))?;

    let decimal_at = |idx: usize| -> Result<Decimal, SdkError> {
        crate::parser::decimal_from_value(&entries[idx]).map_err(|e| {
            SdkError::Parse(ParseError::InvalidDataType(format!("Bad candle entry: {}", e)))
        })
    };

    Ok(Candle {
        timestamp: entries[0]
            .as_i64()
            .ok_or_else(|| SdkError::Parse(ParseError::InvalidDataType("Bad candle timestamp".to_string())))?,
        open: decimal_at(1)?,
        high: decimal_at(2)?,
        low: decimal_at(3)?,
        close: decimal_at(4)?,
        volume: decimal_at(5)?,
    })
}

impl std::fmt::Debug for AcxRestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcxRestClient")
            .field("endpoint", &self.endpoint)
            .field("credentials", &self.credentials)
            .finish()
    }
}
