//! Unit tests for individual modules

use acx_ws_sdk::{
    data::*,
    depth::{aggregate, PriceOrdering},
    orderbook::BookStore,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn order(id: i64, side: OrderSide, price: Decimal, volume: Decimal) -> Order {
    Order {
        id,
        side,
        ord_type: Some("limit".to_string()),
        price,
        market: "btcusd".to_string(),
        remaining_volume: volume,
    }
}

// Configuration validation

#[test]
fn test_default_config_is_valid() {
    assert!(ClientConfig::default().validate().is_ok());
}

#[test]
fn test_config_rejects_non_websocket_stream_endpoint() {
    let config = ClientConfig {
        ws_endpoint: "https://acx.io:8080".to_string(),
        ..ClientConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_config_rejects_zero_timeout() {
    let config = ClientConfig {
        timeout: std::time::Duration::from_secs(0),
        ..ClientConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_reconnect_config_rejects_max_below_initial() {
    let config = ReconnectConfig {
        initial_delay: std::time::Duration::from_secs(5),
        max_delay: std::time::Duration::from_secs(1),
        ..ReconnectConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_reconnect_config_rejects_shrinking_backoff() {
    let config = ReconnectConfig {
        backoff_multiplier: 0.5,
        ..ReconnectConfig::default()
    };
    assert!(config.validate().is_err());
}

// Data model

#[test]
fn test_order_side_parses_both_wire_vocabularies() {
    assert_eq!(OrderSide::parse("bid"), Some(OrderSide::Bid));
    assert_eq!(OrderSide::parse("buy"), Some(OrderSide::Bid));
    assert_eq!(OrderSide::parse("ask"), Some(OrderSide::Ask));
    assert_eq!(OrderSide::parse("SELL"), Some(OrderSide::Ask));
    assert_eq!(OrderSide::parse("hold"), None);
}

#[test]
fn test_book_action_parse() {
    assert_eq!(BookAction::parse("add"), Some(BookAction::Add));
    assert_eq!(BookAction::parse("update"), Some(BookAction::Update));
    assert_eq!(BookAction::parse("remove"), Some(BookAction::Remove));
    assert_eq!(BookAction::parse("upsert"), None);
}

#[test]
fn test_price_level_display() {
    let level = PriceLevel {
        price: dec!(100.5),
        volume: dec!(2),
    };
    assert_eq!(level.to_string(), "2@100.5");
}

// Book store / aggregation interplay

#[test]
fn test_view_limits_each_side_independently() {
    let mut store = BookStore::new("btcusd");
    store.replace(
        (1..=5)
            .map(|i| order(i, OrderSide::Bid, Decimal::from(90 + i), dec!(1)))
            .collect(),
        (6..=7)
            .map(|i| order(i, OrderSide::Ask, Decimal::from(100 + i), dec!(1)))
            .collect(),
    );

    let view = store.view(3);

    assert_eq!(view.bids.len(), 3);
    assert_eq!(view.asks.len(), 2);
    // Best bid first, best ask first
    assert_eq!(view.bids[0].price, dec!(95));
    assert_eq!(view.asks[0].price, dec!(106));
}

#[test]
fn test_mixed_event_sequence_keeps_ids_unique() {
    let mut store = BookStore::new("btcusd");

    let events = vec![
        BookEvent { action: BookAction::Add, order: order(1, OrderSide::Ask, dec!(100), dec!(1)) },
        BookEvent { action: BookAction::Add, order: order(1, OrderSide::Ask, dec!(101), dec!(2)) },
        BookEvent { action: BookAction::Update, order: order(1, OrderSide::Ask, dec!(102), dec!(3)) },
        BookEvent { action: BookAction::Update, order: order(2, OrderSide::Ask, dec!(103), dec!(1)) },
        BookEvent { action: BookAction::Remove, order: order(3, OrderSide::Ask, dec!(104), dec!(1)) },
    ];
    for event in &events {
        store.apply(event);
    }

    assert_eq!(store.len(), (0, 2));
    // id 1 kept only its latest write
    let view = store.view(10);
    assert_eq!(view.asks[0].price, dec!(102));
    assert_eq!(view.asks[0].volume, dec!(3));
}

#[test]
fn test_sides_are_isolated() {
    let mut store = BookStore::new("btcusd");
    store.apply(&BookEvent {
        action: BookAction::Add,
        order: order(1, OrderSide::Bid, dec!(99), dec!(1)),
    });

    // A remove with the same id on the other side must not touch the bid
    store.apply(&BookEvent {
        action: BookAction::Remove,
        order: order(1, OrderSide::Ask, dec!(99), dec!(1)),
    });

    assert_eq!(store.len(), (1, 0));
}

#[test]
fn test_aggregate_directly() {
    let orders = vec![
        order(1, OrderSide::Ask, dec!(10), dec!(1)),
        order(2, OrderSide::Ask, dec!(10), dec!(2)),
        order(3, OrderSide::Ask, dec!(9), dec!(5)),
    ];

    let levels = aggregate(&orders, 10, PriceOrdering::Ascending);

    assert_eq!(levels.len(), 2);
    assert_eq!(levels[0].price, dec!(9));
    assert_eq!(levels[1].volume, dec!(3));
}
