//! Market data source polled by the state monitors
//!
//! The feed never writes to the source; it reads full snapshots on every
//! poll and diffs them itself.

mod memory;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::SourceError;

pub use memory::{InMemoryMarketData, MarketSnapshot};

/// One active supplier price for a material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingRecord {
    pub supplier_id: i64,
    pub supplier_name: String,
    pub material_id: i64,
    pub material_name: String,
    pub price: f64,
}

/// Cache key identifying one supplier/material price series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PriceKey {
    pub supplier_id: i64,
    pub material_id: i64,
}

impl PricingRecord {
    pub fn key(&self) -> PriceKey {
        PriceKey {
            supplier_id: self.supplier_id,
            material_id: self.material_id,
        }
    }
}

/// One active option contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionContractRecord {
    pub contract_number: String,
    pub county_name: String,
    pub material_name: String,
    pub quantity: f64,
    pub expiration_date: NaiveDate,
}

/// Read-only polling interface over the system of record
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Every currently active pricing row
    async fn active_pricing(&self) -> Result<Vec<PricingRecord>, SourceError>;

    /// Active option contracts expiring between `from` and `to`, inclusive
    async fn expiring_options(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<OptionContractRecord>, SourceError>;
}
