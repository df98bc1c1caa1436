//! Market Feed Server - Binary Entry Point
//!
//! This is the main entry point for the feed-server binary.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use market_feed::{FeedConfig, FeedResult, FeedServer, InMemoryMarketData};

#[tokio::main]
async fn main() -> FeedResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("market_feed=info,tower_http=info")),
        )
        .init();

    let config = FeedConfig::from_env()?;

    let source = match &config.market_data_file {
        Some(path) => {
            let source = InMemoryMarketData::load(path)?;
            tracing::info!(path = %path.display(), "Loaded market data snapshot");
            source
        }
        None => InMemoryMarketData::new(),
    };

    tracing::info!(version = market_feed::VERSION, "Starting market feed");
    FeedServer::new(config, Arc::new(source)).run().await
}
