//! Broadcast channels (topics) clients can subscribe to

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Named broadcast topic
///
/// Every connection subscribes to exactly one channel and implicitly
/// receives everything broadcast on [`Channel::All`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Pricing,
    Options,
    Bids,
    Orders,
    #[default]
    All,
}

impl Channel {
    /// All channels, in registry order
    pub const ALL: [Channel; 5] = [
        Channel::Pricing,
        Channel::Options,
        Channel::Bids,
        Channel::Orders,
        Channel::All,
    ];

    /// Wire name of the channel
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Pricing => "pricing",
            Channel::Options => "options",
            Channel::Bids => "bids",
            Channel::Orders => "orders",
            Channel::All => "all",
        }
    }

    /// Parse a channel name, falling back to `All` for anything unrecognized
    ///
    /// Names are matched exactly: `Pricing` or ` pricing` is not `pricing`.
    pub fn parse_or_all(name: &str) -> Self {
        name.parse().unwrap_or(Channel::All)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for channel names outside the fixed set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown channel: {0}")]
pub struct UnknownChannel(pub String);

impl FromStr for Channel {
    type Err = UnknownChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pricing" => Ok(Channel::Pricing),
            "options" => Ok(Channel::Options),
            "bids" => Ok(Channel::Bids),
            "orders" => Ok(Channel::Orders),
            "all" => Ok(Channel::All),
            _ => Err(UnknownChannel(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_channels() {
        for channel in Channel::ALL {
            assert_eq!(channel.as_str().parse::<Channel>().unwrap(), channel);
        }
    }

    #[test]
    fn test_names_match_exactly() {
        assert_eq!(
            "Pricing".parse::<Channel>(),
            Err(UnknownChannel("Pricing".to_string()))
        );
        assert_eq!(Channel::parse_or_all("Pricing"), Channel::All);
        assert_eq!(Channel::parse_or_all(" OPTIONS "), Channel::All);
        assert_eq!(Channel::parse_or_all("bids "), Channel::All);
    }

    #[test]
    fn test_unknown_channel_message() {
        let err = "weather".parse::<Channel>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown channel: weather");
    }

    #[test]
    fn test_unknown_falls_back_to_all() {
        assert_eq!(Channel::parse_or_all("weather"), Channel::All);
        assert_eq!(Channel::parse_or_all(""), Channel::All);
        assert_eq!(Channel::parse_or_all("bids"), Channel::Bids);
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&Channel::Options).unwrap();
        assert_eq!(json, "\"options\"");
    }
}
