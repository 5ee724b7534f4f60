//! Bursar Daemon
//!
//! Runtime orchestrator for the treasury ledger, distribution engine, and
//! API server.
//!
//! # Usage
//!
//! ```bash
//! # Start with stub collaborators (no external services)
//! cargo run -p bursard
//!
//! # Start against real services
//! BURSAR_WALLET_SERVICE_URL=http://wallet:9100 \
//! BURSAR_HOLDER_SERVICE_URL=http://holders:9200 \
//! cargo run -p bursard
//! ```
//!
//! # Environment Variables
//!
//! - `BURSAR_ENV`: Environment (test, development, production)
//! - `BURSAR_API_HOST`: API host (default: 0.0.0.0)
//! - `BURSAR_API_PORT`: API port (default: 8080)
//! - `BURSAR_WALLET_KEY`: Treasury signing-key reference
//! - `BURSAR_WALLET_ADDRESS`: Treasury account address
//! - `BURSAR_ASSET_ID`: Managed asset id, if already deployed
//! - `BURSAR_RECIPIENT_DELAY_MS`: Delay between distribution recipients (default: 500)
//! - `BURSAR_GATEWAY_TIMEOUT_SECS`: Bounded wait per gateway call (default: 30)
//! - `BURSAR_PLAN_SCALE`: Decimal places for planned allocations (default: 9)
//! - `BURSAR_ADVISORY_INTERVAL_SECS`: Advisory cycle period, 0 disables (default: 0)
//! - `BURSAR_WALLET_SERVICE_URL` / `BURSAR_HOLDER_SERVICE_URL` /
//!   `BURSAR_ADVISORY_SERVICE_URL`: external service endpoints; stubs are
//!   used when unset

use bursard::{Config, Daemon};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("bursard=info".parse()?))
        .init();

    // Load configuration
    let config = Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        api_host = %config.api.host,
        api_port = config.api.port,
        "Bursar daemon"
    );

    // Create and run daemon
    if config.connectors.is_some() {
        Daemon::new_http(config)?.run().await?;
    } else {
        Daemon::new_stub(config)?.run().await?;
    }

    Ok(())
}
