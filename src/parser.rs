//! Stream frame parsing
//!
//! The ACX stream multiplexes three frame shapes over one text channel:
//! a one-time `{"challenge": ...}` on connect, `{"orderbook": {...}}`
//! incremental events, and `{"trade": {...}}` executions. Anything else is
//! surfaced as [`StreamFrame::Unknown`] so the coordinator can log and drop
//! it.

use crate::{
    data::{BookAction, BookEvent, Order, OrderSide},
    error::ParseError,
};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// One decoded frame from the streaming connection
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame {
    /// Server authentication challenge, answered once per connection
    Challenge(String),
    /// Incremental order-book event
    Book(BookEvent),
    /// Trade execution, passed through opaquely
    Trade(Value),
    /// Anything the protocol does not cover
    Unknown(Value),
}

/// Parser for ACX stream frames
#[derive(Debug, Default)]
pub struct FrameParser;

impl FrameParser {
    pub fn new() -> Self {
        Self
    }

    /// Decode one whole text frame
    pub fn parse_frame(&self, data: &str) -> Result<StreamFrame, ParseError> {
        let json: Value = serde_json::from_str(data)
            .map_err(|e| ParseError::InvalidJson(format!("Frame is not JSON: {}", e)))?;

        if let Some(challenge) = json.get("challenge").and_then(|v| v.as_str()) {
            return Ok(StreamFrame::Challenge(challenge.to_string()));
        }

        if let Some(book) = json.get("orderbook") {
            return self.parse_book_event(book).map(StreamFrame::Book);
        }

        if let Some(trade) = json.get("trade") {
            return Ok(StreamFrame::Trade(trade.clone()));
        }

        Ok(StreamFrame::Unknown(json))
    }

    /// Parse an `{"action": ..., "order": {...}}` payload
    fn parse_book_event(&self, payload: &Value) -> Result<BookEvent, ParseError> {
        let action_str = payload
            .get("action")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ParseError::MissingField("action".to_string()))?;

        let action = BookAction::parse(action_str).ok_or_else(|| {
            ParseError::InvalidDataType(format!("Unknown book action: {}", action_str))
        })?;

        let order = payload
            .get("order")
            .ok_or_else(|| ParseError::MissingField("order".to_string()))?;

        Ok(BookEvent {
            action,
            order: self.parse_order(order)?,
        })
    }

    /// Parse a raw order object as carried on stream frames and REST
    /// order_book rows
    pub fn parse_order(&self, obj: &Value) -> Result<Order, ParseError> {
        let id = obj
            .get("id")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| ParseError::MissingField("id".to_string()))?;

        // Stream frames say "type": "ask"/"bid", REST rows say
        // "side": "sell"/"buy"
        let side_str = obj
            .get("type")
            .or_else(|| obj.get("side"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| ParseError::MissingField("type".to_string()))?;
        let side = OrderSide::parse(side_str).ok_or_else(|| {
            ParseError::InvalidDataType(format!("Invalid order side: {}", side_str))
        })?;

        let market = obj
            .get("market")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ParseError::MissingField("market".to_string()))?
            .to_lowercase();

        let price = extract_decimal(obj, "price")?;
        // Remove events can omit volume; a missing volume on a remove is
        // harmless since only the id matters
        let remaining_volume = extract_decimal(obj, "remaining_volume")
            .or_else(|_| extract_decimal(obj, "volume"))
            .unwrap_or(Decimal::ZERO);

        Ok(Order {
            id,
            side,
            ord_type: obj
                .get("ord_type")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            price,
            market,
            remaining_volume,
        })
    }
}

/// Extract a decimal field that may arrive as a JSON string or number
pub(crate) fn extract_decimal(obj: &Value, field: &str) -> Result<Decimal, ParseError> {
    let value = obj
        .get(field)
        .ok_or_else(|| ParseError::MissingField(field.to_string()))?;

    decimal_from_value(value)
        .map_err(|e| ParseError::InvalidDataType(format!("Invalid decimal for {}: {}", field, e)))
}

/// Parse a bare JSON value (string or number) as a decimal
pub(crate) fn decimal_from_value(value: &Value) -> Result<Decimal, String> {
    match value {
        Value::String(s) => Decimal::from_str(s).map_err(|e| e.to_string()),
        Value::Number(n) => Decimal::from_str(&n.to_string()).map_err(|e| e.to_string()),
        _ => Err("neither string nor number".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_challenge_frame() {
        let parser = FrameParser::new();

        let frame = parser
            .parse_frame(r#"{"challenge": "abc123"}"#)
            .unwrap();

        assert_eq!(frame, StreamFrame::Challenge("abc123".to_string()));
    }

    #[test]
    fn test_parse_book_add_frame() {
        let parser = FrameParser::new();
        let raw = r#"{"orderbook": {"action": "add", "order":
            {"id": 1, "type": "ask", "ord_type": "limit",
             "price": "101.0", "volume": "3.0", "market": "btcusd"}}}"#;

        let frame = parser.parse_frame(raw).unwrap();

        match frame {
            StreamFrame::Book(event) => {
                assert_eq!(event.action, BookAction::Add);
                assert_eq!(event.order.id, 1);
                assert_eq!(event.order.side, OrderSide::Ask);
                assert_eq!(event.order.price, dec!(101.0));
                assert_eq!(event.order.remaining_volume, dec!(3.0));
                assert_eq!(event.order.market, "btcusd");
            }
            other => panic!("Expected book frame, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_trade_frame_is_opaque() {
        let parser = FrameParser::new();
        let raw = r#"{"trade": {"tid": 42, "price": "100.0", "amount": "0.5"}}"#;

        let frame = parser.parse_frame(raw).unwrap();

        match frame {
            StreamFrame::Trade(payload) => assert_eq!(payload["tid"], 42),
            other => panic!("Expected trade frame, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_market_is_parse_error() {
        let parser = FrameParser::new();
        let raw = r#"{"orderbook": {"action": "add", "order":
            {"id": 1, "type": "ask", "price": "101.0", "volume": "3.0"}}}"#;

        assert!(matches!(
            parser.parse_frame(raw),
            Err(ParseError::MissingField(_))
        ));
    }

    #[test]
    fn test_unknown_action_is_parse_error() {
        let parser = FrameParser::new();
        let raw = r#"{"orderbook": {"action": "merge", "order":
            {"id": 1, "type": "ask", "price": "1", "volume": "1", "market": "btcusd"}}}"#;

        assert!(parser.parse_frame(raw).is_err());
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let parser = FrameParser::new();
        assert!(matches!(
            parser.parse_frame("not json"),
            Err(ParseError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_unrecognized_frame_is_unknown() {
        let parser = FrameParser::new();

        let frame = parser.parse_frame(r#"{"pong": 1}"#).unwrap();

        assert!(matches!(frame, StreamFrame::Unknown(_)));
    }

    #[test]
    fn test_numeric_price_accepted() {
        let parser = FrameParser::new();
        let raw = r#"{"orderbook": {"action": "remove", "order":
            {"id": 7, "type": "bid", "price": 99.5, "market": "btcusd"}}}"#;

        let frame = parser.parse_frame(raw).unwrap();

        match frame {
            StreamFrame::Book(event) => {
                assert_eq!(event.action, BookAction::Remove);
                assert_eq!(event.order.price, dec!(99.5));
                assert_eq!(event.order.remaining_volume, Decimal::ZERO);
            }
            other => panic!("Expected book frame, got {:?}", other),
        }
    }
}
