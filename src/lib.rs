//! # ACX WebSocket SDK
//!
//! Client for the ACX exchange: a live, locally-held replica of the limit
//! order book for one or more markets, kept current over the streaming
//! endpoint with automatic reconnection and snapshot resynchronization, plus
//! the signed REST API surface (orders, balances, trades, deposits, market
//! data).
//!
//! ## Quick Start
//! ```rust,ignore
//! use acx_ws_sdk::prelude::*;
//!
//! let client = AcxClient::builder()
//!     .credentials("access-key", "secret-key")?
//!     .build()?;
//!
//! let handle = client
//!     .track(
//!         &["btcusd"],
//!         10,
//!         |books| {
//!             for book in books {
//!                 println!("{}: {} bid levels", book.market, book.bids.len());
//!             }
//!         },
//!         |trade| println!("trade: {}", trade),
//!     )
//!     .await?;
//!
//! // ... later
//! handle.shutdown().await;
//! ```

pub mod auth;
pub mod client;
pub mod connection;
pub mod data;
pub mod depth;
pub mod error;
pub mod orderbook;
pub mod parser;
pub mod replication;
pub mod rest_client;
pub mod snapshot;

pub use auth::Credentials;
pub use client::{AcxClient, AcxClientBuilder, ReplicationHandle};
pub use data::*;
pub use error::*;
pub use orderbook::BookStore;
pub use rest_client::{AcxRestClient, NewOrder};

/// Prelude - minimal public API surface
///
/// Import with: `use acx_ws_sdk::prelude::*;`
pub mod prelude {
    /// Main entry point
    pub use crate::client::{AcxClient, AcxClientBuilder, ReplicationHandle};

    /// Credentials
    pub use crate::auth::Credentials;

    /// Core data types
    pub use crate::data::{BookView, Order, OrderSide, PriceLevel};

    /// Errors
    pub use crate::error::SdkError;

    /// Connection state
    pub use crate::data::ConnectionState;

    /// REST types
    pub use crate::rest_client::{AcxRestClient, NewOrder};
}

/// Initialize logging for the SDK
pub fn init_logging() {
    tracing_subscriber::fmt::init();
}
