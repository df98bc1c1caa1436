//! Connection manager: owns the channel registry and performs fan-out
//!
//! The registry lock is a `parking_lot::RwLock` and is never held across an
//! `.await`. Broadcasts snapshot their targets, drop the lock, then deliver to
//! every target concurrently with a bounded per-send timeout. A connection whose
//! send fails or times out is evicted from every channel exactly once.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future::join_all;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::mpsc::error::SendTimeoutError;

use super::channel::Channel;
use super::events::{MarketEvent, Severity};
use super::registry::{ChannelRegistry, ConnectionId, ConnectionSender, RegistryStats};
use crate::config::FeedConfig;

/// Default upper bound for enqueueing one event on a connection
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Reference to a registered connection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionHandle {
    id: ConnectionId,
    channel: Channel,
}

impl ConnectionHandle {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Channel the connection was registered on (after fallback to `all`)
    pub fn channel(&self) -> Channel {
        self.channel
    }
}

/// Outcome of one broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    pub event_type: &'static str,
    pub channel: Channel,
    /// Connections the event was addressed to
    pub targeted: usize,
    /// Connections that accepted the event
    pub delivered: usize,
    /// Connections removed because delivery failed
    pub evicted: usize,
}

/// Registry owner; shared as `Arc<ConnectionManager>` by the transport,
/// REST handlers and monitors
pub struct ConnectionManager {
    registry: RwLock<ChannelRegistry>,
    next_id: AtomicU64,
    send_timeout: Duration,
}

impl ConnectionManager {
    /// Create a manager with the given per-send timeout
    pub fn new(send_timeout: Duration) -> Self {
        Self {
            registry: RwLock::new(ChannelRegistry::new()),
            next_id: AtomicU64::new(1),
            send_timeout,
        }
    }

    pub fn from_config(config: &FeedConfig) -> Self {
        Self::new(config.send_timeout)
    }

    /// Register a connection on `channel` and send it the welcome event
    pub async fn connect(&self, sender: ConnectionSender, channel: Channel) -> ConnectionHandle {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let handle = ConnectionHandle { id, channel };

        let total = {
            let mut registry = self.registry.write();
            registry.insert(id, channel, sender);
            registry.len()
        };
        tracing::info!(connection = id, %channel, total, "WebSocket connection registered");

        self.send_to(&handle, MarketEvent::welcome(channel)).await;
        handle
    }

    /// Register using a raw channel name; unknown names subscribe to `all`
    pub async fn connect_named(&self, sender: ConnectionSender, channel: &str) -> ConnectionHandle {
        let resolved = Channel::parse_or_all(channel);
        if resolved.as_str() != channel {
            tracing::debug!(requested = channel, "Unknown channel, subscribing to all");
        }
        self.connect(sender, resolved).await
    }

    /// Remove a connection from every channel
    ///
    /// Idempotent: returns `true` only for the call that actually removed it.
    pub fn disconnect(&self, handle: &ConnectionHandle) -> bool {
        self.evict(handle.id)
    }

    /// Deliver one event to one connection
    ///
    /// Failures (closed queue, timeout, serialization) disconnect the
    /// connection and are not surfaced; returns whether the event was accepted.
    pub async fn send_to(&self, handle: &ConnectionHandle, event: MarketEvent) -> bool {
        let sender = match self.registry.read().get(handle.id) {
            Some(entry) => entry.sender.clone(),
            None => return false,
        };

        let text = match serde_json::to_string(&event.stamp()) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(connection = handle.id, error = %e, "Failed to serialize event");
                self.evict(handle.id);
                return false;
            }
        };

        if self.deliver(handle.id, &sender, text).await {
            true
        } else {
            self.evict(handle.id);
            false
        }
    }

    /// Fan an event out to `channel` subscribers plus `all` subscribers
    pub async fn broadcast(&self, event: MarketEvent, channel: Channel) -> BroadcastReport {
        let event_type = event.event_type();
        let targets = self.registry.read().targets(channel);
        let mut report = BroadcastReport {
            event_type,
            channel,
            targeted: targets.len(),
            delivered: 0,
            evicted: 0,
        };

        if targets.is_empty() {
            return report;
        }

        let text = match serde_json::to_string(&event.stamp()) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(event_type, error = %e, "Failed to serialize broadcast event");
                return report;
            }
        };

        let sends = targets.into_iter().map(|(id, sender)| {
            let text = text.clone();
            async move {
                let ok = self.deliver(id, &sender, text).await;
                (id, ok)
            }
        });

        for (id, ok) in join_all(sends).await {
            if ok {
                report.delivered += 1;
            } else if self.evict(id) {
                report.evicted += 1;
            }
        }

        tracing::debug!(
            event_type,
            %channel,
            targeted = report.targeted,
            delivered = report.delivered,
            evicted = report.evicted,
            "Broadcast complete"
        );
        report
    }

    /// Broadcast on the event's natural channel
    pub async fn publish(&self, event: MarketEvent) -> BroadcastReport {
        let channel = event.default_channel();
        self.broadcast(event, channel).await
    }

    pub async fn broadcast_pricing_update(
        &self,
        material_id: i64,
        material_name: &str,
        supplier_id: i64,
        supplier_name: &str,
        old_price: f64,
        new_price: f64,
    ) -> BroadcastReport {
        let event = MarketEvent::pricing_update(
            material_id,
            material_name,
            supplier_id,
            supplier_name,
            old_price,
            new_price,
        );
        let report = self.broadcast(event, Channel::Pricing).await;
        tracing::info!(material = material_name, new_price, "Price update broadcast");
        report
    }

    pub async fn broadcast_option_expiry(
        &self,
        contract_number: &str,
        county_name: &str,
        material_name: &str,
        quantity: f64,
        days_until_expiry: i64,
    ) -> BroadcastReport {
        let event = MarketEvent::option_expiry(
            contract_number,
            county_name,
            material_name,
            quantity,
            days_until_expiry,
        );
        let report = self.broadcast(event, Channel::Options).await;
        tracing::info!(
            contract = contract_number,
            days_until_expiry,
            "Option expiry broadcast"
        );
        report
    }

    pub async fn broadcast_new_bid(
        &self,
        requirement_number: &str,
        county_name: &str,
        material_name: &str,
        quantity: f64,
        bid_count: u32,
    ) -> BroadcastReport {
        let event = MarketEvent::NewBid {
            requirement_number: requirement_number.to_string(),
            county_name: county_name.to_string(),
            material_name: material_name.to_string(),
            quantity,
            bid_count,
        };
        let report = self.broadcast(event, Channel::Bids).await;
        tracing::info!(requirement = requirement_number, bid_count, "New bid broadcast");
        report
    }

    pub async fn broadcast_order_status(
        &self,
        order_number: &str,
        status: &str,
        county_name: &str,
        supplier_name: &str,
        material_name: &str,
        quantity: f64,
    ) -> BroadcastReport {
        let event = MarketEvent::OrderStatus {
            order_number: order_number.to_string(),
            status: status.to_string(),
            county_name: county_name.to_string(),
            supplier_name: supplier_name.to_string(),
            material_name: material_name.to_string(),
            quantity,
        };
        let report = self.broadcast(event, Channel::Orders).await;
        tracing::info!(order = order_number, status, "Order status broadcast");
        report
    }

    pub async fn broadcast_market_alert(
        &self,
        alert_type: &str,
        message: &str,
        severity: Severity,
    ) -> BroadcastReport {
        let event = MarketEvent::MarketAlert {
            alert_type: alert_type.to_string(),
            message: message.to_string(),
            severity,
        };
        let report = self.broadcast(event, Channel::All).await;
        tracing::info!(alert_type, ?severity, "Market alert broadcast");
        report
    }

    /// Total registered connections
    pub fn connection_count(&self) -> usize {
        self.registry.read().len()
    }

    /// Connections explicitly subscribed to `channel`
    pub fn channel_count(&self, channel: Channel) -> usize {
        self.registry.read().channel_len(channel)
    }

    pub fn is_connected(&self, handle: &ConnectionHandle) -> bool {
        self.registry.read().contains(handle.id)
    }

    pub fn stats(&self) -> RegistryStats {
        self.registry.read().stats()
    }

    /// Drop every connection (shutdown); writer tasks see their queue close
    pub fn close_all(&self) -> usize {
        let closed = self.registry.write().drain();
        if !closed.is_empty() {
            tracing::info!(count = closed.len(), "Closed all WebSocket connections");
        }
        closed.len()
    }

    async fn deliver(&self, id: ConnectionId, sender: &ConnectionSender, text: String) -> bool {
        match sender.send_timeout(text, self.send_timeout).await {
            Ok(()) => true,
            Err(SendTimeoutError::Timeout(_)) => {
                tracing::warn!(connection = id, timeout = ?self.send_timeout, "Send timed out");
                false
            }
            Err(SendTimeoutError::Closed(_)) => {
                tracing::debug!(connection = id, "Send to closed connection");
                false
            }
        }
    }

    fn evict(&self, id: ConnectionId) -> bool {
        let (removed, total) = {
            let mut registry = self.registry.write();
            let removed = registry.remove(id).is_some();
            (removed, registry.len())
        };
        if removed {
            tracing::info!(connection = id, total, "WebSocket connection removed");
        }
        removed
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new(DEFAULT_SEND_TIMEOUT)
    }
}
