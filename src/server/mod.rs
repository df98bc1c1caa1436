//! Feed server: wires the source, connection manager, monitors and router
//!
//! Shutdown order: stop the monitors, close every connection, then let axum
//! drain the remaining HTTP requests.

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use crate::api::http::create_router;
use crate::api::websocket::manager::ConnectionManager;
use crate::api::websocket::state::AppState;
use crate::config::FeedConfig;
use crate::error::FeedResult;
use crate::monitors::Monitors;
use crate::source::MarketDataSource;

/// HTTP/WebSocket server with its background monitors
pub struct FeedServer {
    config: FeedConfig,
    source: Arc<dyn MarketDataSource>,
    manager: Arc<ConnectionManager>,
}

impl FeedServer {
    /// Create a server polling `source`
    pub fn new(config: FeedConfig, source: Arc<dyn MarketDataSource>) -> Self {
        let manager = Arc::new(ConnectionManager::from_config(&config));
        Self {
            config,
            source,
            manager,
        }
    }

    /// Shared connection manager, for producers running alongside the server
    pub fn manager(&self) -> Arc<ConnectionManager> {
        Arc::clone(&self.manager)
    }

    /// Router serving the feed endpoints
    pub fn router(&self) -> Router {
        let state = Arc::new(AppState::new(Arc::clone(&self.manager), &self.config));
        create_router(state)
    }

    /// Bind the configured address and serve until Ctrl+C / SIGTERM
    pub async fn run(self) -> FeedResult<()> {
        let addr = self.config.bind_addr()?;
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already-bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> FeedResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let monitors = Monitors::spawn(
            Arc::clone(&self.source),
            Arc::clone(&self.manager),
            &self.config,
        );
        let cancel = monitors.cancel_token();
        let manager = Arc::clone(&self.manager);

        tracing::info!(addr = %listener.local_addr()?, "Market feed listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("Shutdown requested");
                cancel.cancel();
                manager.close_all();
            })
            .await?;

        monitors.shutdown().await;
        tracing::info!("Market feed stopped");
        Ok(())
    }
}

/// Resolves on Ctrl+C, or SIGTERM on unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
