//! WebSocket module for real-time market updates
//!
//! Provides WebSocket endpoints at `/ws/:channel` and `/ws?channel=` for
//! pushing market events to subscribed clients.
//!
//! ## Features
//! - Fixed channel set (pricing, options, bids, orders, all)
//! - Concurrent fan-out with per-send timeout and eviction on failure
//! - Welcome on connect, `ping` -> `pong`, server heartbeat pings

pub mod channel;
pub mod events;
pub mod handler;
pub mod manager;
pub mod registry;
pub mod state;

// Re-export commonly used items
pub use channel::Channel;
pub use events::{MarketEvent, StampedEvent};
pub use manager::{BroadcastReport, ConnectionHandle, ConnectionManager};
pub use registry::RegistryStats;
