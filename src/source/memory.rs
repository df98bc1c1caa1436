//! In-memory market data source

use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::{MarketDataSource, OptionContractRecord, PricingRecord};
use crate::error::SourceError;

/// Full set of rows served by [`InMemoryMarketData`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    #[serde(default)]
    pub pricing: Vec<PricingRecord>,
    #[serde(default)]
    pub options: Vec<OptionContractRecord>,
}

/// Thread-safe mutable snapshot; producers update it, monitors poll it
#[derive(Debug, Default)]
pub struct InMemoryMarketData {
    snapshot: RwLock<MarketSnapshot>,
}

impl InMemoryMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: MarketSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
        }
    }

    /// Load a JSON snapshot (`{"pricing": [...], "options": [...]}`) from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let snapshot: MarketSnapshot = serde_json::from_str(&content)?;
        if let Some(bad) = snapshot.pricing.iter().find(|r| r.price < 0.0) {
            return Err(SourceError::InvalidData(format!(
                "negative price for supplier {} material {}",
                bad.supplier_id, bad.material_id
            )));
        }
        Ok(Self::with_snapshot(snapshot))
    }

    /// Replace every pricing row
    pub fn set_pricing(&self, pricing: Vec<PricingRecord>) {
        self.snapshot.write().pricing = pricing;
    }

    /// Insert or update one supplier/material price
    pub fn upsert_price(&self, record: PricingRecord) {
        let mut snapshot = self.snapshot.write();
        let key = record.key();
        match snapshot.pricing.iter_mut().find(|r| r.key() == key) {
            Some(existing) => *existing = record,
            None => snapshot.pricing.push(record),
        }
    }

    /// Replace every option contract row
    pub fn set_options(&self, options: Vec<OptionContractRecord>) {
        self.snapshot.write().options = options;
    }

    pub fn snapshot(&self) -> MarketSnapshot {
        self.snapshot.read().clone()
    }
}

#[async_trait]
impl MarketDataSource for InMemoryMarketData {
    async fn active_pricing(&self) -> Result<Vec<PricingRecord>, SourceError> {
        Ok(self.snapshot.read().pricing.clone())
    }

    async fn expiring_options(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<OptionContractRecord>, SourceError> {
        Ok(self
            .snapshot
            .read()
            .options
            .iter()
            .filter(|o| o.expiration_date >= from && o.expiration_date <= to)
            .cloned()
            .collect())
    }
}
