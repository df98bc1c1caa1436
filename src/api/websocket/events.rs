//! WebSocket event types for real-time market updates

use serde::{Deserialize, Serialize};

use super::channel::Channel;
use crate::utils::time::current_timestamp;

/// Direction of a price move
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

/// Urgency tier derived from days remaining until an option contract expires
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    High,
    Medium,
    Low,
}

impl Urgency {
    /// `High` at 3 days or fewer, `Medium` at 7 or fewer, `Low` otherwise
    pub fn from_days(days_until_expiry: i64) -> Self {
        if days_until_expiry <= 3 {
            Urgency::High
        } else if days_until_expiry <= 7 {
            Urgency::Medium
        } else {
            Urgency::Low
        }
    }
}

/// Severity of a market-wide alert
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Critical,
}

/// Market events that can be broadcast to WebSocket clients
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketEvent {
    /// A supplier's spot price for a material changed
    PricingUpdate {
        material_id: i64,
        material_name: String,
        supplier_id: i64,
        supplier_name: String,
        old_price: f64,
        new_price: f64,
        change_percent: f64,
        direction: Direction,
    },

    /// An active option contract is inside the expiry alert window
    OptionExpiry {
        contract_number: String,
        county_name: String,
        material_name: String,
        quantity: f64,
        days_until_expiry: i64,
        urgency: Urgency,
    },

    /// A bid was submitted against a county requirement
    NewBid {
        requirement_number: String,
        county_name: String,
        material_name: String,
        quantity: f64,
        bid_count: u32,
    },

    /// An order changed status
    OrderStatus {
        order_number: String,
        status: String,
        county_name: String,
        supplier_name: String,
        material_name: String,
        quantity: f64,
    },

    /// General alert for every subscriber
    MarketAlert {
        alert_type: String,
        message: String,
        #[serde(default)]
        severity: Severity,
    },

    /// Welcome sent to a freshly registered connection
    Connection { message: String },

    /// Reply to a client `ping`
    Pong,
}

impl MarketEvent {
    /// Build a pricing update, deriving percent change and direction
    pub fn pricing_update(
        material_id: i64,
        material_name: impl Into<String>,
        supplier_id: i64,
        supplier_name: impl Into<String>,
        old_price: f64,
        new_price: f64,
    ) -> Self {
        MarketEvent::PricingUpdate {
            material_id,
            material_name: material_name.into(),
            supplier_id,
            supplier_name: supplier_name.into(),
            old_price,
            new_price,
            change_percent: change_percent(old_price, new_price),
            direction: if new_price > old_price {
                Direction::Up
            } else {
                Direction::Down
            },
        }
    }

    /// Build an option expiry alert, deriving the urgency tier
    pub fn option_expiry(
        contract_number: impl Into<String>,
        county_name: impl Into<String>,
        material_name: impl Into<String>,
        quantity: f64,
        days_until_expiry: i64,
    ) -> Self {
        MarketEvent::OptionExpiry {
            contract_number: contract_number.into(),
            county_name: county_name.into(),
            material_name: material_name.into(),
            quantity,
            days_until_expiry,
            urgency: Urgency::from_days(days_until_expiry),
        }
    }

    /// Welcome message naming the subscribed channel
    pub fn welcome(channel: Channel) -> Self {
        MarketEvent::Connection {
            message: format!("Connected to {} channel", channel),
        }
    }

    /// Wire `type` tag of this event
    pub fn event_type(&self) -> &'static str {
        match self {
            MarketEvent::PricingUpdate { .. } => "pricing_update",
            MarketEvent::OptionExpiry { .. } => "option_expiry",
            MarketEvent::NewBid { .. } => "new_bid",
            MarketEvent::OrderStatus { .. } => "order_status",
            MarketEvent::MarketAlert { .. } => "market_alert",
            MarketEvent::Connection { .. } => "connection",
            MarketEvent::Pong => "pong",
        }
    }

    /// Channel this kind of event is normally published on
    pub fn default_channel(&self) -> Channel {
        match self {
            MarketEvent::PricingUpdate { .. } => Channel::Pricing,
            MarketEvent::OptionExpiry { .. } => Channel::Options,
            MarketEvent::NewBid { .. } => Channel::Bids,
            MarketEvent::OrderStatus { .. } => Channel::Orders,
            MarketEvent::MarketAlert { .. }
            | MarketEvent::Connection { .. }
            | MarketEvent::Pong => Channel::All,
        }
    }

    /// Attach the send-time timestamp
    pub fn stamp(self) -> StampedEvent {
        StampedEvent {
            event: self,
            timestamp: current_timestamp(),
        }
    }
}

/// Percent change from `old_price` to `new_price`, rounded to two decimals.
/// A zero old price has no meaningful ratio and yields `0.0`.
pub fn change_percent(old_price: f64, new_price: f64) -> f64 {
    if old_price == 0.0 {
        return 0.0;
    }
    let raw = (new_price - old_price) / old_price * 100.0;
    (raw * 100.0).round() / 100.0
}

/// WebSocket message: an event plus the time it was sent
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StampedEvent {
    /// The market event
    #[serde(flatten)]
    pub event: MarketEvent,

    /// ISO-8601 UTC time the event was stamped for delivery
    pub timestamp: String,
}

/// Inbound client messages
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientMessage {
    /// Literal `ping` heartbeat
    Ping,

    /// Anything else; reserved for client-initiated subscription changes
    Ignored,
}

impl ClientMessage {
    /// Only the exact text `ping` is a heartbeat
    pub fn from_text(text: &str) -> Self {
        if text == "ping" {
            ClientMessage::Ping
        } else {
            ClientMessage::Ignored
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_pricing_update_derives_change() {
        let event = MarketEvent::pricing_update(7, "Caliche", 3, "Acme Aggregates", 10.0, 12.0);
        match event {
            MarketEvent::PricingUpdate {
                change_percent,
                direction,
                ..
            } => {
                assert_eq!(change_percent, 20.0);
                assert_eq!(direction, Direction::Up);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_price_drop_rounds_to_two_decimals() {
        assert_eq!(change_percent(30.0, 20.0), -33.33);
        let event = MarketEvent::pricing_update(1, "Gravel", 1, "S", 30.0, 20.0);
        assert!(matches!(
            event,
            MarketEvent::PricingUpdate { direction: Direction::Down, .. }
        ));
    }

    #[test]
    fn test_zero_old_price_has_no_ratio() {
        assert_eq!(change_percent(0.0, 5.0), 0.0);
    }

    #[test]
    fn test_urgency_tiers() {
        assert_eq!(Urgency::from_days(0), Urgency::High);
        assert_eq!(Urgency::from_days(3), Urgency::High);
        assert_eq!(Urgency::from_days(4), Urgency::Medium);
        assert_eq!(Urgency::from_days(7), Urgency::Medium);
        assert_eq!(Urgency::from_days(8), Urgency::Low);
    }

    #[test]
    fn test_stamped_event_wire_shape() {
        let stamped = MarketEvent::option_expiry("OPT-100", "Bosque", "Caliche", 300.0, 2).stamp();
        let json: Value = serde_json::to_value(&stamped).unwrap();

        assert_eq!(json["type"], "option_expiry");
        assert_eq!(json["contract_number"], "OPT-100");
        assert_eq!(json["county_name"], "Bosque");
        assert_eq!(json["material_name"], "Caliche");
        assert_eq!(json["quantity"].as_f64(), Some(300.0));
        assert_eq!(json["days_until_expiry"], 2);
        assert_eq!(json["urgency"], "high");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_pong_is_type_only() {
        let json: Value = serde_json::to_value(MarketEvent::Pong).unwrap();
        assert_eq!(json, serde_json::json!({"type": "pong"}));
    }

    #[test]
    fn test_market_alert_severity_defaults_to_info() {
        let json = r#"{"type":"market_alert","alert_type":"supply","message":"Quarry closed"}"#;
        let event: MarketEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(
            event,
            MarketEvent::MarketAlert { severity: Severity::Info, .. }
        ));
        assert_eq!(event.default_channel(), Channel::All);
    }

    #[test]
    fn test_default_channels() {
        let bid = MarketEvent::NewBid {
            requirement_number: "REQ-1".to_string(),
            county_name: "Bosque".to_string(),
            material_name: "Base".to_string(),
            quantity: 50.0,
            bid_count: 2,
        };
        assert_eq!(bid.default_channel(), Channel::Bids);
        assert_eq!(bid.event_type(), "new_bid");
    }

    #[test]
    fn test_client_message_parsing() {
        assert_eq!(ClientMessage::from_text("ping"), ClientMessage::Ping);
        assert_eq!(ClientMessage::from_text(" ping\n"), ClientMessage::Ignored);
        assert_eq!(ClientMessage::from_text("PING"), ClientMessage::Ignored);
        assert_eq!(ClientMessage::from_text("{\"subscribe\":\"bids\"}"), ClientMessage::Ignored);
    }
}
