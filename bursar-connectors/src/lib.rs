//! Bursar Connectors
//!
//! JSON/HTTP adapters for the external collaborator ports: the wallet
//! service (remote operation gateway), the holder directory, and the
//! decision-advisory service. Each adapter is a thin reqwest client with a
//! bounded wait per call; the wire formats are the boundary shapes only —
//! nothing here holds treasury state.

#![warn(clippy::all)]

pub mod advisory_rest;
pub mod holders_rest;
pub mod wallet_rest;

pub use advisory_rest::AdvisoryServiceClient;
pub use holders_rest::HolderServiceClient;
pub use wallet_rest::WalletServiceClient;
