//! State monitors: long-running pollers that diff market data and broadcast
//!
//! Each monitor polls its source once per interval, starting immediately.
//! Missed ticks are not replayed. A failed poll is logged and the loop carries
//! on with the next tick. Loops end only when their cancellation token fires;
//! a tick still in flight at that point is dropped.

mod option_expiry;
mod pricing;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::api::websocket::manager::ConnectionManager;
use crate::config::FeedConfig;
use crate::error::SourceError;
use crate::source::MarketDataSource;

pub use option_expiry::OptionExpiryMonitor;
pub use pricing::PricingMonitor;

/// A periodic poll-diff-broadcast loop body
#[async_trait]
pub trait Monitor: Send {
    /// Name used in log lines
    fn name(&self) -> &'static str;

    /// Time between polls
    fn interval(&self) -> Duration;

    /// Poll once; returns the number of events broadcast
    async fn tick(&mut self) -> Result<usize, SourceError>;
}

/// Drive `monitor` until `cancel` fires
pub async fn run_monitor<M: Monitor>(mut monitor: M, cancel: CancellationToken) {
    let name = monitor.name();
    let mut ticker = interval(monitor.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::info!(monitor = name, interval = ?monitor.interval(), "Monitor started");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    outcome = monitor.tick() => outcome,
                };
                match outcome {
                    Ok(0) => {}
                    Ok(emitted) => tracing::debug!(monitor = name, emitted, "Monitor tick"),
                    Err(e) => tracing::error!(monitor = name, error = %e, "Monitor poll failed"),
                }
            }
        }
    }

    tracing::info!(monitor = name, "Monitor stopped");
}

/// The running pricing and option-expiry monitors
pub struct Monitors {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl Monitors {
    /// Spawn both monitors on the current runtime
    pub fn spawn(
        source: Arc<dyn MarketDataSource>,
        manager: Arc<ConnectionManager>,
        config: &FeedConfig,
    ) -> Self {
        let cancel = CancellationToken::new();

        let pricing = PricingMonitor::new(
            Arc::clone(&source),
            Arc::clone(&manager),
            config.pricing_interval,
        );
        let expiry = OptionExpiryMonitor::new(
            source,
            manager,
            config.option_expiry_interval,
            config.option_alert_window_days,
        );

        let handles = vec![
            tokio::spawn(run_monitor(pricing, cancel.child_token())),
            tokio::spawn(run_monitor(expiry, cancel.child_token())),
        ];

        Self { cancel, handles }
    }

    /// Token that stops every monitor when cancelled
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel all monitors and wait for their loops to exit
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Monitor task ended abnormally");
            }
        }
    }
}
