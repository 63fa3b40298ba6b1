//! Replication coordinator
//!
//! Owns the tracked-market set and every [`BookStore`] in it. Frames are
//! consumed strictly in arrival order by a single task, so book mutation is
//! single-writer by construction; snapshot reloads triggered by `remove`
//! events are awaited inline and therefore act as barriers against any
//! events queued behind them.

use crate::{
    connection::ConnectionEvent,
    data::{BookAction, BookEvent, BookView},
    error::SdkError,
    orderbook::BookStore,
    parser::StreamFrame,
    snapshot::{load_snapshot, SnapshotSource},
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Callback invoked once per frame batch with every changed, aggregated book
pub type BooksChangedCallback = Arc<dyn Fn(Vec<BookView>) + Send + Sync>;

/// Callback invoked with each trade payload, passed through opaquely
pub type TradeCallback = Arc<dyn Fn(serde_json::Value) + Send + Sync>;

/// Coordinator for one set of tracked markets
pub struct ReplicationCoordinator {
    books: HashMap<String, BookStore>,
    depth_limit: usize,
    source: Arc<dyn SnapshotSource>,
    on_books_changed: BooksChangedCallback,
    on_trade: TradeCallback,
}

impl ReplicationCoordinator {
    /// Create a coordinator and perform the initial snapshot load for every
    /// market.
    ///
    /// Validation is synchronous: an empty market set or a zero depth limit
    /// fails immediately. Any initial load failure fails the whole call.
    pub async fn track(
        markets: &[String],
        depth_limit: usize,
        source: Arc<dyn SnapshotSource>,
        on_books_changed: BooksChangedCallback,
        on_trade: TradeCallback,
    ) -> Result<Self, SdkError> {
        if markets.is_empty() {
            return Err(SdkError::Configuration(
                "At least one market must be tracked".to_string(),
            ));
        }
        if depth_limit == 0 {
            return Err(SdkError::Configuration(
                "Depth limit must be at least 1".to_string(),
            ));
        }

        let mut books = HashMap::new();
        for market in markets {
            let store = BookStore::new(market);
            books.insert(store.market().to_string(), store);
        }

        let mut coordinator = Self {
            books,
            depth_limit,
            source,
            on_books_changed,
            on_trade,
        };

        // Initial loads run concurrently across markets; replace stays on
        // this task
        let failures = coordinator.reload_all().await;
        if let Some((market, error)) = failures.into_iter().next() {
            return Err(SdkError::Exchange(format!(
                "Initial snapshot load failed for {}: {}",
                market, error
            )));
        }

        tracing::info!(
            "Tracking {} markets at depth {}",
            coordinator.books.len(),
            depth_limit
        );
        Ok(coordinator)
    }

    /// Markets tracked by this coordinator
    pub fn markets(&self) -> Vec<String> {
        self.books.keys().cloned().collect()
    }

    /// Current aggregated view of one market, if tracked
    pub fn view(&self, market: &str) -> Option<BookView> {
        self.books
            .get(&market.to_lowercase())
            .map(|store| store.view(self.depth_limit))
    }

    /// Consume connection events until the channel closes
    pub async fn run(mut self, mut rx: mpsc::Receiver<ConnectionEvent>) {
        while let Some(event) = rx.recv().await {
            // Drain whatever else is already queued so one callback covers
            // the whole batch
            let mut batch = vec![event];
            while let Ok(next) = rx.try_recv() {
                batch.push(next);
            }
            self.process_batch(batch).await;
        }
        tracing::info!("Replication coordinator stopped");
    }

    /// Process one batch of connection events, invoking the books-changed
    /// callback at most once
    pub async fn process_batch(&mut self, batch: Vec<ConnectionEvent>) {
        let mut changed: HashSet<String> = HashSet::new();

        for event in batch {
            match event {
                ConnectionEvent::Frame(frame) => self.handle_frame(frame, &mut changed).await,
                ConnectionEvent::Reconnected => {
                    // A fresh connection carries no replay guarantee, so raw
                    // incremental state is invalid until resynced
                    let failures = self.reload_all().await;
                    let failed: HashSet<String> =
                        failures.iter().map(|(market, _)| market.clone()).collect();
                    for (market, error) in &failures {
                        tracing::warn!("Resync failed for {}: {}", market, error);
                    }
                    changed.extend(
                        self.books
                            .keys()
                            .filter(|market| !failed.contains(*market))
                            .cloned(),
                    );
                }
            }
        }

        if !changed.is_empty() {
            let views: Vec<BookView> = changed
                .iter()
                .filter_map(|market| self.view(market))
                .collect();
            if !views.is_empty() {
                (self.on_books_changed)(views);
            }
        }
    }

    async fn handle_frame(&mut self, frame: StreamFrame, changed: &mut HashSet<String>) {
        match frame {
            StreamFrame::Book(event) => {
                if self.apply_book_event(&event).await {
                    changed.insert(event.order.market.to_lowercase());
                }
            }
            StreamFrame::Trade(payload) => {
                (self.on_trade)(payload);
            }
            StreamFrame::Unknown(payload) => {
                tracing::debug!("Ignoring unrecognized frame: {}", payload);
            }
            StreamFrame::Challenge(_) => {
                // Handshake frames never leave the connection manager
                tracing::warn!("Unexpected challenge frame reached the coordinator");
            }
        }
    }

    /// Apply one book event. Returns true if the market's book changed.
    async fn apply_book_event(&mut self, event: &BookEvent) -> bool {
        let market = event.order.market.to_lowercase();
        let store = match self.books.get_mut(&market) {
            Some(store) => store,
            None => {
                tracing::warn!("Dropping event for untracked market {}", market);
                return false;
            }
        };

        let mut store_changed = store.apply(event);

        if event.action == BookAction::Remove {
            // Removals can race in-flight stream events, so every remove
            // forces a reload from the snapshot source
            match load_snapshot(store, self.source.as_ref(), self.depth_limit).await {
                Ok(()) => store_changed = true,
                Err(e) => {
                    // Keep the stale book; the next remove retries the reload
                    tracing::warn!("Reload after remove failed for {}: {}", market, e);
                }
            }
        }

        store_changed
    }

    /// Reload every tracked market from the snapshot source. Fetches run
    /// concurrently; replaces happen on this task. Returns per-market
    /// failures.
    async fn reload_all(&mut self) -> Vec<(String, SdkError)> {
        let depth_limit = self.depth_limit;
        let source = Arc::clone(&self.source);

        let fetches = self.books.keys().cloned().map(|market| {
            let source = Arc::clone(&source);
            async move {
                let result = source
                    .fetch_order_book(&market, depth_limit, depth_limit)
                    .await;
                (market, result)
            }
        });

        let mut failures = Vec::new();
        for (market, result) in futures_util::future::join_all(fetches).await {
            match result {
                Ok(snapshot) => {
                    if let Some(store) = self.books.get_mut(&market) {
                        store.replace(snapshot.bids, snapshot.asks);
                    }
                }
                Err(e) => failures.push((market, e)),
            }
        }
        failures
    }
}
