//! Order book replica state
//!
//! One `BookStore` per tracked market, holding the raw per-side order lists.
//! Incremental events mutate the raw lists; aggregated views are recomputed
//! on demand via [`crate::depth`].

use crate::{
    data::{BookAction, BookEvent, BookView, Order, OrderSide},
    depth::{aggregate, PriceOrdering},
};

/// Mutable replica of one market's book
#[derive(Debug, Clone)]
pub struct BookStore {
    market: String,
    bids: Vec<Order>,
    asks: Vec<Order>,
}

impl BookStore {
    /// Create an empty store for a market. Market ids are canonically
    /// lowercase.
    pub fn new(market: &str) -> Self {
        Self {
            market: market.to_lowercase(),
            bids: Vec::new(),
            asks: Vec::new(),
        }
    }

    pub fn market(&self) -> &str {
        &self.market
    }

    /// Discard all raw state and replace it with a full snapshot.
    ///
    /// This is the only entry point used by the snapshot loader; a replace
    /// supersedes whatever incremental events were applied before it.
    pub fn replace(&mut self, bids: Vec<Order>, asks: Vec<Order>) {
        self.bids = bids;
        self.asks = asks;
        tracing::debug!(
            "Replaced book for {}: {} bids, {} asks",
            self.market,
            self.bids.len(),
            self.asks.len()
        );
    }

    /// Apply one incremental event. Returns true if the store changed.
    ///
    /// Duplicate adds are last-write-wins, updates for unknown ids behave as
    /// adds, removes for unknown ids are no-ops. The exchange may emit events
    /// for orders this replica never saw (e.g., it joined mid-stream).
    pub fn apply(&mut self, event: &BookEvent) -> bool {
        if event.order.market.to_lowercase() != self.market {
            tracing::warn!(
                "Dropping event for market {} routed to book {}",
                event.order.market,
                self.market
            );
            return false;
        }

        let order = event.order.clone();
        let side = match order.side {
            OrderSide::Bid => &mut self.bids,
            OrderSide::Ask => &mut self.asks,
        };

        match event.action {
            // add and update share the same replace-or-append semantics once
            // out-of-order duplicates are tolerated
            BookAction::Add | BookAction::Update => {
                match side.iter_mut().find(|o| o.id == order.id) {
                    Some(existing) => *existing = order,
                    None => side.push(order),
                }
                true
            }
            BookAction::Remove => {
                let before = side.len();
                side.retain(|o| o.id != order.id);
                before != side.len()
            }
        }
    }

    /// Aggregated, depth-limited view of both sides. Pure with respect to
    /// store state.
    pub fn view(&self, depth_limit: usize) -> BookView {
        BookView {
            market: self.market.clone(),
            bids: aggregate(&self.bids, depth_limit, PriceOrdering::Descending),
            asks: aggregate(&self.asks, depth_limit, PriceOrdering::Ascending),
        }
    }

    /// Raw resting bids, unordered
    pub fn bids(&self) -> &[Order] {
        &self.bids
    }

    /// Raw resting asks, unordered
    pub fn asks(&self) -> &[Order] {
        &self.asks
    }

    /// Raw order counts per side (bids, asks)
    pub fn len(&self) -> (usize, usize) {
        (self.bids.len(), self.asks.len())
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}
