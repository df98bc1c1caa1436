//! Pricing monitor: broadcasts `pricing_update` when a supplier price changes

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::Monitor;
use crate::api::websocket::manager::ConnectionManager;
use crate::error::SourceError;
use crate::source::{MarketDataSource, PriceKey};

/// Snapshot-diffing monitor over active pricing rows
///
/// The first poll only fills the cache. Later polls broadcast one event per
/// key whose price differs from the cached one; only the net change between
/// two polls is observed.
pub struct PricingMonitor {
    source: Arc<dyn MarketDataSource>,
    manager: Arc<ConnectionManager>,
    interval: Duration,
    cache: HashMap<PriceKey, f64>,
}

impl PricingMonitor {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        manager: Arc<ConnectionManager>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            manager,
            interval,
            cache: HashMap::new(),
        }
    }

    /// Last observed price for a supplier/material pair
    pub fn cached_price(&self, key: &PriceKey) -> Option<f64> {
        self.cache.get(key).copied()
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

#[async_trait]
impl Monitor for PricingMonitor {
    fn name(&self) -> &'static str {
        "pricing"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn tick(&mut self) -> Result<usize, SourceError> {
        let records = self.source.active_pricing().await?;

        // Rebuilt from scratch so keys that left the source are forgotten
        let mut next = HashMap::with_capacity(records.len());
        let mut emitted = 0;

        for record in records {
            let key = record.key();
            if let Some(old_price) = self.cache.get(&key).copied() {
                if old_price != record.price {
                    self.manager
                        .broadcast_pricing_update(
                            record.material_id,
                            &record.material_name,
                            record.supplier_id,
                            &record.supplier_name,
                            old_price,
                            record.price,
                        )
                        .await;
                    emitted += 1;
                }
            }
            next.insert(key, record.price);
        }

        self.cache = next;
        Ok(emitted)
    }
}
