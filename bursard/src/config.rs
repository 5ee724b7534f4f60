//! Daemon configuration.
//!
//! Loads configuration from environment variables with sensible defaults.
//! The treasury wallet and managed asset are resolved here once and passed
//! down as an explicit context; no component reads them ambiently.

use crate::error::{DaemonError, DaemonResult};
use bursar_domain::{Address, AssetId, TreasuryContext, WalletKey};
use std::env;

// =============================================================================
// Configuration
// =============================================================================

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Treasury wallet and execution policy
    pub treasury: TreasuryConfig,

    /// External service endpoints; absent in stub mode
    pub connectors: Option<ConnectorConfig>,

    /// Seconds between advisory cycle ticks (0 = disabled)
    pub advisory_interval_secs: u64,

    /// Environment (test, development, production)
    pub environment: Environment,
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
}

/// Treasury wallet and execution policy configuration.
#[derive(Debug, Clone)]
pub struct TreasuryConfig {
    /// Signing-key reference forwarded to the gateway
    pub wallet_key: String,
    /// The treasury's own account address
    pub wallet_address: String,
    /// Managed asset id, if already deployed
    pub asset_id: Option<String>,
    /// Delay between consecutive distribution recipients, in milliseconds
    pub recipient_delay_ms: u64,
    /// Bounded wait for each individual gateway call, in seconds
    pub gateway_timeout_secs: u64,
    /// Decimal places distribution allocations are planned at
    pub plan_scale: u32,
}

/// External service endpoints.
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    /// Wallet service (remote operation gateway) base URL
    pub wallet_service_url: String,
    /// Holder directory service base URL
    pub holder_service_url: String,
    /// Advisory service base URL, if advisory automation is wired to one
    pub advisory_service_url: Option<String>,
}

/// Environment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Test environment (uses stubs)
    Test,
    /// Development environment
    Development,
    /// Production environment
    Production,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> DaemonResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        let environment = Self::load_environment()?;
        let api = Self::load_api_config()?;
        let treasury = Self::load_treasury_config()?;
        let connectors = Self::load_connector_config();
        let advisory_interval_secs = Self::load_u64_env("BURSAR_ADVISORY_INTERVAL_SECS", 0)?;

        Ok(Self {
            api,
            treasury,
            connectors,
            advisory_interval_secs,
            environment,
        })
    }

    /// Create test configuration.
    pub fn test() -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
            },
            treasury: TreasuryConfig {
                wallet_key: "test-wallet-key".to_string(),
                wallet_address: "TREASURY1".to_string(),
                asset_id: None,
                recipient_delay_ms: 0,
                gateway_timeout_secs: 5,
                plan_scale: 9,
            },
            connectors: None,
            advisory_interval_secs: 0,
            environment: Environment::Test,
        }
    }

    /// Resolve the per-request treasury context from configuration.
    pub fn context(&self) -> DaemonResult<TreasuryContext> {
        let wallet = WalletKey::new(self.treasury.wallet_key.clone())
            .map_err(|e| DaemonError::Config(format!("Invalid BURSAR_WALLET_KEY: {}", e)))?;
        let address = Address::new(self.treasury.wallet_address.clone())
            .map_err(|e| DaemonError::Config(format!("Invalid BURSAR_WALLET_ADDRESS: {}", e)))?;

        let mut context = TreasuryContext::new(wallet, address);
        if let Some(asset_id) = &self.treasury.asset_id {
            let asset = AssetId::new(asset_id.clone())
                .map_err(|e| DaemonError::Config(format!("Invalid BURSAR_ASSET_ID: {}", e)))?;
            context = context.with_asset(asset);
        }
        Ok(context)
    }

    fn load_environment() -> DaemonResult<Environment> {
        let env_str = env::var("BURSAR_ENV").unwrap_or_else(|_| "development".to_string());

        match env_str.to_lowercase().as_str() {
            "test" => Ok(Environment::Test),
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(DaemonError::Config(format!(
                "Invalid BURSAR_ENV: {}. Expected: test, development, production",
                other
            ))),
        }
    }

    fn load_api_config() -> DaemonResult<ApiConfig> {
        let host = env::var("BURSAR_API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port_str = env::var("BURSAR_API_PORT").unwrap_or_else(|_| "8080".to_string());

        let port = port_str
            .parse::<u16>()
            .map_err(|_| DaemonError::Config(format!("Invalid BURSAR_API_PORT: {}", port_str)))?;

        Ok(ApiConfig { host, port })
    }

    fn load_treasury_config() -> DaemonResult<TreasuryConfig> {
        let wallet_key =
            env::var("BURSAR_WALLET_KEY").unwrap_or_else(|_| "stub-wallet-key".to_string());
        let wallet_address =
            env::var("BURSAR_WALLET_ADDRESS").unwrap_or_else(|_| "TREASURY1".to_string());
        let asset_id = env::var("BURSAR_ASSET_ID").ok();

        let recipient_delay_ms = Self::load_u64_env("BURSAR_RECIPIENT_DELAY_MS", 500)?;
        let gateway_timeout_secs = Self::load_u64_env("BURSAR_GATEWAY_TIMEOUT_SECS", 30)?;
        let plan_scale = Self::load_u64_env("BURSAR_PLAN_SCALE", 9)? as u32;

        Ok(TreasuryConfig {
            wallet_key,
            wallet_address,
            asset_id,
            recipient_delay_ms,
            gateway_timeout_secs,
            plan_scale,
        })
    }

    fn load_connector_config() -> Option<ConnectorConfig> {
        let wallet_service_url = env::var("BURSAR_WALLET_SERVICE_URL").ok()?;
        let holder_service_url = env::var("BURSAR_HOLDER_SERVICE_URL").ok()?;
        let advisory_service_url = env::var("BURSAR_ADVISORY_SERVICE_URL").ok();

        Some(ConnectorConfig {
            wallet_service_url,
            holder_service_url,
            advisory_service_url,
        })
    }

    fn load_u64_env(key: &str, default: u64) -> DaemonResult<u64> {
        match env::var(key) {
            Ok(val) => val
                .parse::<u64>()
                .map_err(|_| DaemonError::Config(format!("Invalid {} value: {}", key, val))),
            Err(_) => Ok(default),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            treasury: TreasuryConfig {
                wallet_key: "stub-wallet-key".to_string(),
                wallet_address: "TREASURY1".to_string(),
                asset_id: None,
                recipient_delay_ms: 500,
                gateway_timeout_secs: 30,
                plan_scale: 9,
            },
            connectors: None,
            advisory_interval_secs: 0,
            environment: Environment::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Test => write!(f, "test"),
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
