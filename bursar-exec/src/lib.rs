//! Bursar Execution Layer
//!
//! Owns the operation lifecycle and the batch distribution engine:
//!
//! - Ports for the external collaborators (remote operation gateway,
//!   holder directory, decision advisor) and stub adapters for tests.
//! - The Operation Ledger: opens, tracks, and closes operation records and
//!   their paired audit entries, enforcing the status machine.
//! - The Batch Distribution Engine: executes a one-to-many distribution as
//!   an ordered sequence of independent transfers and derives the single
//!   aggregate status.
//! - Proportional distribution planning from holder snapshots.

#![warn(clippy::all)]

pub mod distribution;
pub mod error;
pub mod ledger;
pub mod operations;
pub mod pacing;
pub mod planning;
pub mod ports;
pub mod snapshot;
pub mod stub;

pub use distribution::{DistributionEngine, DistributionKind, DistributionResult};
pub use error::{ExecError, ExecResult};
pub use ledger::{OperationLedger, OperationOutcome};
pub use operations::{OperationReport, TreasuryOps};
pub use pacing::{FixedInterval, NoPacing, Pacer};
pub use planning::{plan_proportional, Recipient, DEFAULT_PLAN_SCALE};
pub use ports::{
    AdvisedAction, Advisor, AssetProfile, Deployment, GatewayError, HolderDirectory,
    LedgerGateway, Recommendation,
};
pub use snapshot::SnapshotService;
pub use stub::{StubAdvisor, StubGateway, StubHolderDirectory};
