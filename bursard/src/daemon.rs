//! Daemon: Main runtime orchestrator.
//!
//! The Daemon ties together all components:
//! - Treasury Manager (ledger, engine, snapshots, balances)
//! - Advisory Cycle (automated decisions)
//! - API Server (HTTP endpoints)
//!
//! # Lifecycle
//!
//! 1. Load configuration, resolve the treasury context
//! 2. Initialize components (stub or HTTP connectors)
//! 3. Start API server
//! 4. Main loop (advisory ticks, shutdown signal)
//! 5. Graceful shutdown on SIGINT/SIGTERM

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{error, info};

use bursar_connectors::{AdvisoryServiceClient, HolderServiceClient, WalletServiceClient};
use bursar_exec::{
    Advisor, FixedInterval, HolderDirectory, LedgerGateway, NoPacing, Pacer, StubAdvisor,
    StubGateway, StubHolderDirectory,
};
use bursar_store::{MemoryStore, OperationFilter, Store};

use crate::api::{create_router, ApiState};
use crate::config::Config;
use crate::cycle;
use crate::error::{DaemonError, DaemonResult};
use crate::treasury::TreasuryManager;

// =============================================================================
// Daemon
// =============================================================================

/// The main Bursar daemon.
pub struct Daemon<G, D, S>
where
    G: LedgerGateway + 'static,
    D: HolderDirectory + 'static,
    S: Store + 'static,
{
    /// Configuration
    config: Config,
    /// Treasury manager
    manager: Arc<TreasuryManager<G, D, S>>,
    /// Advisory service, if automation is wired to one
    advisor: Option<Arc<dyn Advisor>>,
}

impl Daemon<StubGateway, StubHolderDirectory, MemoryStore> {
    /// Create a daemon with stub components (for testing/development).
    pub fn new_stub(config: Config) -> DaemonResult<Self> {
        let gateway = Arc::new(StubGateway::new());
        let directory = Arc::new(StubHolderDirectory::new());
        let store = Arc::new(MemoryStore::new());
        let advisor: Arc<dyn Advisor> = Arc::new(StubAdvisor::new());

        Self::assemble(config, gateway, directory, store, Some(advisor))
    }
}

impl Daemon<WalletServiceClient, HolderServiceClient, MemoryStore> {
    /// Create a daemon wired to the configured HTTP services.
    pub fn new_http(config: Config) -> DaemonResult<Self> {
        let connectors = config.connectors.clone().ok_or_else(|| {
            DaemonError::Config("connector URLs are not configured".to_string())
        })?;

        let gateway = Arc::new(WalletServiceClient::new(connectors.wallet_service_url));
        let directory = Arc::new(HolderServiceClient::new(connectors.holder_service_url));
        let advisor = connectors
            .advisory_service_url
            .map(|url| Arc::new(AdvisoryServiceClient::new(url)) as Arc<dyn Advisor>);
        let store = Arc::new(MemoryStore::new());

        Self::assemble(config, gateway, directory, store, advisor)
    }
}

impl<G, D, S> Daemon<G, D, S>
where
    G: LedgerGateway + 'static,
    D: HolderDirectory + 'static,
    S: Store + 'static,
{
    /// Create a daemon from already-wired components.
    pub fn new(
        config: Config,
        manager: Arc<TreasuryManager<G, D, S>>,
        advisor: Option<Arc<dyn Advisor>>,
    ) -> Self {
        Self {
            config,
            manager,
            advisor,
        }
    }

    fn assemble(
        config: Config,
        gateway: Arc<G>,
        directory: Arc<D>,
        store: Arc<S>,
        advisor: Option<Arc<dyn Advisor>>,
    ) -> DaemonResult<Self> {
        let context = config.context()?;

        let pacer: Arc<dyn Pacer> = if config.treasury.recipient_delay_ms == 0 {
            Arc::new(NoPacing)
        } else {
            Arc::new(FixedInterval::from_millis(config.treasury.recipient_delay_ms))
        };
        let call_timeout = Duration::from_secs(config.treasury.gateway_timeout_secs);

        let manager = Arc::new(TreasuryManager::new(
            context,
            gateway,
            directory,
            store,
            pacer,
            call_timeout,
            config.treasury.plan_scale,
        ));

        Ok(Self::new(config, manager, advisor))
    }

    /// The treasury manager (for tests and embedding).
    pub fn manager(&self) -> &Arc<TreasuryManager<G, D, S>> {
        &self.manager
    }

    /// Run the daemon.
    ///
    /// This method blocks until shutdown is requested (SIGINT/SIGTERM).
    pub async fn run(self) -> DaemonResult<()> {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            environment = %self.config.environment,
            "Starting bursar daemon"
        );

        // 1. Start API server
        let api_addr = self.start_api_server().await?;
        info!(%api_addr, "API server started");

        // 2. Advisory cycle ticker
        let mut advisory_interval =
            if self.config.advisory_interval_secs > 0 && self.advisor.is_some() {
                let mut interval = tokio::time::interval(Duration::from_secs(
                    self.config.advisory_interval_secs,
                ));
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                // The first tick completes immediately; consume it so the
                // first cycle runs one full period after startup.
                interval.tick().await;
                Some(interval)
            } else {
                info!("Advisory cycle disabled");
                None
            };

        // 3. Main loop
        info!("Entering main loop");
        loop {
            tokio::select! {
                _ = async {
                    match advisory_interval.as_mut() {
                        Some(interval) => { interval.tick().await; }
                        None => std::future::pending::<()>().await,
                    }
                } => {
                    self.run_cycle_once().await;
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        // 4. Graceful shutdown
        self.shutdown().await
    }

    /// Start the API server on the configured address.
    ///
    /// Spawns the serve task and returns the bound address (OS-assigned
    /// port when the configured port is 0, as in tests).
    pub async fn start_api_server(&self) -> DaemonResult<SocketAddr> {
        let state = Arc::new(ApiState {
            manager: self.manager.clone(),
        });

        let router = create_router(state);
        let addr = format!("{}:{}", self.config.api.host, self.config.api.port);

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| DaemonError::Config(format!("Failed to bind to {}: {}", addr, e)))?;

        let local_addr = listener
            .local_addr()
            .map_err(|e| DaemonError::Config(format!("Failed to get local address: {}", e)))?;

        // Spawn the server task
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                error!(error = %e, "API server error");
            }
        });

        Ok(local_addr)
    }

    /// Run one advisory cycle tick, logging failures without stopping the
    /// daemon.
    async fn run_cycle_once(&self) {
        if let Some(advisor) = &self.advisor {
            if let Err(e) = cycle::run_once(self.manager.as_ref(), advisor.as_ref()).await {
                error!(error = %e, "Advisory cycle failed");
            }
        }
    }

    /// Graceful shutdown.
    async fn shutdown(&self) -> DaemonResult<()> {
        info!("Initiating graceful shutdown");

        // Distributions run to completion before close, so by the time the
        // select loop exits there is no in-flight batch to drain here.
        let recorded = self
            .manager
            .count_operations(&OperationFilter::default())
            .await?;
        info!(recorded_operations = recorded, "Shutdown complete");

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_daemon_stub_creation() {
        let config = Config::test();
        let daemon = Daemon::new_stub(config).unwrap();

        let count = daemon
            .manager()
            .count_operations(&OperationFilter::default())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_daemon_api_server_start() {
        let config = Config::test();
        let daemon = Daemon::new_stub(config).unwrap();

        let addr = daemon.start_api_server().await.unwrap();

        // Server should be running on an OS-assigned port
        assert!(addr.port() > 0);

        // Can make a health check request
        let client = reqwest::Client::new();
        let response = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .unwrap();

        assert!(response.status().is_success());
    }

    #[tokio::test]
    async fn test_daemon_http_requires_connector_config() {
        let config = Config::test();
        let result = Daemon::new_http(config);
        assert!(matches!(result, Err(DaemonError::Config(_))));
    }
}
