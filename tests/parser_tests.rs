//! Tests for stream frame decoding

use acx_ws_sdk::data::{BookAction, OrderSide};
use acx_ws_sdk::parser::{FrameParser, StreamFrame};
use rust_decimal_macros::dec;

fn parse(raw: &str) -> StreamFrame {
    FrameParser::new().parse_frame(raw).expect("frame should parse")
}

#[test]
fn test_challenge_frame() {
    match parse(r#"{"challenge": "e2b4c0..."}"#) {
        StreamFrame::Challenge(c) => assert_eq!(c, "e2b4c0..."),
        other => panic!("Expected challenge, got {:?}", other),
    }
}

#[test]
fn test_add_event_full_order() {
    let raw = r#"{"orderbook": {"action": "add", "order": {
        "id": 53, "timestamp": 1518093609, "type": "ask",
        "volume": "3.0", "price": "101.0", "market": "btcusd",
        "ord_type": "limit"}}}"#;

    match parse(raw) {
        StreamFrame::Book(event) => {
            assert_eq!(event.action, BookAction::Add);
            assert_eq!(event.order.id, 53);
            assert_eq!(event.order.side, OrderSide::Ask);
            assert_eq!(event.order.remaining_volume, dec!(3.0));
            assert_eq!(event.order.ord_type.as_deref(), Some("limit"));
        }
        other => panic!("Expected book event, got {:?}", other),
    }
}

#[test]
fn test_update_event() {
    let raw = r#"{"orderbook": {"action": "update", "order": {
        "id": 53, "type": "bid", "volume": "1.5", "price": "99.0",
        "market": "btcusd"}}}"#;

    match parse(raw) {
        StreamFrame::Book(event) => {
            assert_eq!(event.action, BookAction::Update);
            assert_eq!(event.order.side, OrderSide::Bid);
        }
        other => panic!("Expected book event, got {:?}", other),
    }
}

#[test]
fn test_remove_event_without_volume() {
    let raw = r#"{"orderbook": {"action": "remove", "order": {
        "id": 7, "type": "bid", "price": "99.0", "market": "btcusd"}}}"#;

    match parse(raw) {
        StreamFrame::Book(event) => {
            assert_eq!(event.action, BookAction::Remove);
            assert_eq!(event.order.id, 7);
        }
        other => panic!("Expected book event, got {:?}", other),
    }
}

#[test]
fn test_rest_vocabulary_side_field() {
    // REST order rows spell the side as "side": "sell"/"buy"
    let raw = r#"{"orderbook": {"action": "add", "order": {
        "id": 9, "side": "sell", "remaining_volume": "0.5",
        "price": "100.0", "market": "ethusd"}}}"#;

    match parse(raw) {
        StreamFrame::Book(event) => {
            assert_eq!(event.order.side, OrderSide::Ask);
            assert_eq!(event.order.market, "ethusd");
            assert_eq!(event.order.remaining_volume, dec!(0.5));
        }
        other => panic!("Expected book event, got {:?}", other),
    }
}

#[test]
fn test_market_is_lowercased() {
    let raw = r#"{"orderbook": {"action": "add", "order": {
        "id": 9, "type": "ask", "volume": "1", "price": "100",
        "market": "BTCUSD"}}}"#;

    match parse(raw) {
        StreamFrame::Book(event) => assert_eq!(event.order.market, "btcusd"),
        other => panic!("Expected book event, got {:?}", other),
    }
}

#[test]
fn test_trade_frame_payload_untouched() {
    let raw = r#"{"trade": {"tid": 7, "date": 1518093609,
        "price": "100.0", "amount": "0.1", "market": "btcusd"}}"#;

    match parse(raw) {
        StreamFrame::Trade(payload) => {
            assert_eq!(payload["tid"], 7);
            assert_eq!(payload["amount"], "0.1");
        }
        other => panic!("Expected trade frame, got {:?}", other),
    }
}

#[test]
fn test_unknown_frame_shapes() {
    assert!(matches!(parse(r#"{"success": true}"#), StreamFrame::Unknown(_)));
    assert!(matches!(parse("[1, 2, 3]"), StreamFrame::Unknown(_)));
    assert!(matches!(parse(r#""hello""#), StreamFrame::Unknown(_)));
}

#[test]
fn test_malformed_frames_error() {
    let parser = FrameParser::new();

    // Not JSON at all
    assert!(parser.parse_frame("garbage").is_err());
    // Missing order payload
    assert!(parser.parse_frame(r#"{"orderbook": {"action": "add"}}"#).is_err());
    // Missing action
    assert!(parser
        .parse_frame(r#"{"orderbook": {"order": {"id": 1}}}"#)
        .is_err());
    // Unknown side
    assert!(parser
        .parse_frame(
            r#"{"orderbook": {"action": "add", "order":
                {"id": 1, "type": "short", "price": "1", "volume": "1", "market": "btcusd"}}}"#
        )
        .is_err());
    // Unparseable decimal
    assert!(parser
        .parse_frame(
            r#"{"orderbook": {"action": "add", "order":
                {"id": 1, "type": "ask", "price": "abc", "volume": "1", "market": "btcusd"}}}"#
        )
        .is_err());
}
