//! Bursar Daemon
//!
//! Runtime orchestrator for the treasury: operation ledger, batch
//! distribution engine, snapshot service, automated advisory cycle, and
//! the HTTP API server.

#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod cycle;
pub mod daemon;
pub mod error;
pub mod treasury;

pub use config::{Config, Environment};
pub use daemon::Daemon;
pub use error::{DaemonError, DaemonResult};
pub use treasury::TreasuryManager;
