//! Channel registry: which connections are subscribed to which channel

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tokio::sync::mpsc;

use super::channel::Channel;

/// Connection ID (unique per WebSocket connection)
pub type ConnectionId = u64;

/// Per-connection outbound queue (bounded), drained by the socket writer task
pub type ConnectionSender = mpsc::Sender<String>;

/// A registered connection
#[derive(Debug, Clone)]
pub struct ConnectionEntry {
    pub channel: Channel,
    pub sender: ConnectionSender,
}

/// Membership counts reported by `GET /api/stats`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub total: usize,
    pub pricing: usize,
    pub options: usize,
    pub bids: usize,
    pub orders: usize,
    pub all: usize,
}

/// Connection set keyed by id plus per-channel membership
///
/// Not synchronized; the connection manager guards it with a lock.
#[derive(Debug)]
pub struct ChannelRegistry {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    channels: HashMap<Channel, HashSet<ConnectionId>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        let channels = Channel::ALL
            .iter()
            .map(|channel| (*channel, HashSet::new()))
            .collect();

        Self {
            connections: HashMap::new(),
            channels,
        }
    }

    /// Register a connection under exactly one channel
    pub fn insert(&mut self, id: ConnectionId, channel: Channel, sender: ConnectionSender) {
        // Re-registering an id moves it rather than duplicating membership
        self.remove(id);
        self.connections
            .insert(id, ConnectionEntry { channel, sender });
        self.channels.entry(channel).or_default().insert(id);
    }

    /// Remove a connection from every channel; `None` if it was not registered
    pub fn remove(&mut self, id: ConnectionId) -> Option<ConnectionEntry> {
        let entry = self.connections.remove(&id)?;
        for members in self.channels.values_mut() {
            members.remove(&id);
        }
        Some(entry)
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    pub fn get(&self, id: ConnectionId) -> Option<&ConnectionEntry> {
        self.connections.get(&id)
    }

    /// Fan-out targets for a broadcast on `channel`
    ///
    /// Members of `channel` plus members of `all`, each id at most once.
    /// Broadcasting on `all` targets only the `all` members.
    pub fn targets(&self, channel: Channel) -> Vec<(ConnectionId, ConnectionSender)> {
        let mut ids: HashSet<ConnectionId> = self.members(Channel::All).copied().collect();
        if channel != Channel::All {
            ids.extend(self.members(channel).copied());
        }

        ids.into_iter()
            .filter_map(|id| {
                self.connections
                    .get(&id)
                    .map(|entry| (id, entry.sender.clone()))
            })
            .collect()
    }

    /// Total registered connections
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Members explicitly subscribed to `channel`
    pub fn channel_len(&self, channel: Channel) -> usize {
        self.members(channel).count()
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            total: self.len(),
            pricing: self.channel_len(Channel::Pricing),
            options: self.channel_len(Channel::Options),
            bids: self.channel_len(Channel::Bids),
            orders: self.channel_len(Channel::Orders),
            all: self.channel_len(Channel::All),
        }
    }

    /// Remove every connection, returning their ids
    pub fn drain(&mut self) -> Vec<ConnectionId> {
        for members in self.channels.values_mut() {
            members.clear();
        }
        self.connections.drain().map(|(id, _)| id).collect()
    }

    fn members(&self, channel: Channel) -> impl Iterator<Item = &ConnectionId> {
        self.channels.get(&channel).into_iter().flatten()
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender() -> ConnectionSender {
        mpsc::channel(1).0
    }

    #[test]
    fn test_insert_and_remove() {
        let mut registry = ChannelRegistry::new();
        registry.insert(1, Channel::Pricing, sender());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.channel_len(Channel::Pricing), 1);

        assert!(registry.remove(1).is_some());
        assert!(registry.remove(1).is_none());
        assert!(registry.is_empty());
        assert_eq!(registry.channel_len(Channel::Pricing), 0);
    }

    #[test]
    fn test_reinsert_moves_channel() {
        let mut registry = ChannelRegistry::new();
        registry.insert(1, Channel::Pricing, sender());
        registry.insert(1, Channel::Bids, sender());

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.channel_len(Channel::Pricing), 0);
        assert_eq!(registry.channel_len(Channel::Bids), 1);
        assert_eq!(registry.get(1).map(|e| e.channel), Some(Channel::Bids));
    }

    #[test]
    fn test_targets_include_all_subscribers() {
        let mut registry = ChannelRegistry::new();
        registry.insert(1, Channel::Pricing, sender());
        registry.insert(2, Channel::Bids, sender());
        registry.insert(3, Channel::All, sender());

        let mut ids: Vec<ConnectionId> = registry
            .targets(Channel::Pricing)
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 3]);

        let all: Vec<ConnectionId> = registry
            .targets(Channel::All)
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(all, vec![3]);
    }

    #[test]
    fn test_stats_and_drain() {
        let mut registry = ChannelRegistry::new();
        registry.insert(1, Channel::Options, sender());
        registry.insert(2, Channel::Options, sender());
        registry.insert(3, Channel::All, sender());

        let stats = registry.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.options, 2);
        assert_eq!(stats.all, 1);

        let mut drained = registry.drain();
        drained.sort_unstable();
        assert_eq!(drained, vec![1, 2, 3]);
        assert_eq!(registry.stats(), RegistryStats::default());
    }
}
