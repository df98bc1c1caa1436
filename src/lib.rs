//! Market Feed Server
//!
//! Real-time market event feed: clients subscribe over WebSocket to one of a
//! fixed set of channels, and background monitors poll a market data source,
//! diff it against their last snapshot and broadcast what changed.
//!
//! # Modules
//!
//! - `api`: WebSocket transport, connection manager, REST endpoints
//! - `monitors`: pricing and option-expiry pollers
//! - `source`: market data source trait and in-memory implementation
//! - `config`: environment-driven configuration
//! - `server`: wiring and lifecycle
//! - `utils`: timestamp helpers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use market_feed::{FeedConfig, FeedServer, InMemoryMarketData};
//!
//! #[tokio::main]
//! async fn main() -> market_feed::FeedResult<()> {
//!     let config = FeedConfig::from_env()?;
//!     let source = Arc::new(InMemoryMarketData::new());
//!     FeedServer::new(config, source).run().await
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod monitors;
pub mod server;
pub mod source;
pub mod utils;

// Re-export commonly used items at crate root
pub use api::websocket::{
    BroadcastReport, Channel, ConnectionHandle, ConnectionManager, MarketEvent, RegistryStats,
    StampedEvent,
};
pub use config::FeedConfig;
pub use error::{ConfigError, FeedError, FeedResult, SourceError};
pub use monitors::{Monitor, Monitors, OptionExpiryMonitor, PricingMonitor};
pub use server::FeedServer;
pub use source::{InMemoryMarketData, MarketDataSource, OptionContractRecord, PricingRecord};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
