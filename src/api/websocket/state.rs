//! WebSocket application state

use std::sync::Arc;
use std::time::Duration;

use super::manager::ConnectionManager;
use crate::config::FeedConfig;

/// Shared application state for WebSocket and REST handlers
pub struct AppState {
    /// Registry owner; also held by the monitors
    pub manager: Arc<ConnectionManager>,

    /// Interval between server ping frames on each connection
    pub heartbeat_interval: Duration,

    /// Outbound queue capacity per connection
    pub send_buffer: usize,
}

impl AppState {
    /// Create state around an existing manager
    pub fn new(manager: Arc<ConnectionManager>, config: &FeedConfig) -> Self {
        Self {
            manager,
            heartbeat_interval: config.heartbeat_interval,
            send_buffer: config.send_buffer,
        }
    }
}
