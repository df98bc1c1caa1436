//! Option-expiry monitor: alerts on contracts close to expiration

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Days, NaiveDate};

use super::Monitor;
use crate::api::websocket::manager::ConnectionManager;
use crate::error::SourceError;
use crate::source::MarketDataSource;
use crate::utils::time::{days_until, today};

/// Broadcasts `option_expiry` for every active contract expiring within the
/// alert window. Contracts are re-announced on every poll while they remain
/// inside the window.
pub struct OptionExpiryMonitor {
    source: Arc<dyn MarketDataSource>,
    manager: Arc<ConnectionManager>,
    interval: Duration,
    window_days: u32,
}

impl OptionExpiryMonitor {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        manager: Arc<ConnectionManager>,
        interval: Duration,
        window_days: u32,
    ) -> Self {
        Self {
            source,
            manager,
            interval,
            window_days,
        }
    }

    /// Poll as of a given date
    pub async fn tick_at(&self, today: NaiveDate) -> Result<usize, SourceError> {
        let until = today
            .checked_add_days(Days::new(u64::from(self.window_days)))
            .unwrap_or(NaiveDate::MAX);
        let contracts = self.source.expiring_options(today, until).await?;

        let mut emitted = 0;
        for contract in contracts {
            let days = days_until(today, contract.expiration_date);
            if days < 0 || days > i64::from(self.window_days) {
                tracing::debug!(
                    contract = %contract.contract_number,
                    days,
                    "Skipping contract outside alert window"
                );
                continue;
            }

            self.manager
                .broadcast_option_expiry(
                    &contract.contract_number,
                    &contract.county_name,
                    &contract.material_name,
                    contract.quantity,
                    days,
                )
                .await;
            emitted += 1;
        }

        Ok(emitted)
    }
}

#[async_trait]
impl Monitor for OptionExpiryMonitor {
    fn name(&self) -> &'static str {
        "option_expiry"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn tick(&mut self) -> Result<usize, SourceError> {
        self.tick_at(today()).await
    }
}
