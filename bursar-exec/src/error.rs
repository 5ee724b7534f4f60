//! Execution layer error types.

use thiserror::Error;

/// Errors that can occur during treasury execution.
///
/// Propagation policy: whole-request validation failures
/// (`InvalidRequest`, `EmptySnapshot`) abort before any ledger write;
/// per-recipient gateway failures are recovered locally as recipient
/// outcomes and never surface here; storage faults are fatal;
/// `InternalConsistency` indicates a caller bug and is never swallowed.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Malformed or missing input, caught before any record is opened
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Gateway or snapshot service unreachable
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Treasury balance insufficient for the requested operation
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    /// An already-terminal record received a second close, or a record
    /// vanished mid-operation. Must never occur; indicates a caller bug.
    #[error("Internal consistency violation: {0}")]
    InternalConsistency(String),

    /// Snapshot has no holders with a positive balance
    #[error("Empty snapshot: no holders with a positive balance for asset {0}")]
    EmptySnapshot(String),

    /// Store error (fatal: no operation proceeds without an audit trail)
    #[error("Store error: {0}")]
    Store(#[from] bursar_store::StoreError),

    /// Domain error
    #[error("Domain error: {0}")]
    Domain(#[from] bursar_domain::DomainError),
}

/// Result type for execution operations.
pub type ExecResult<T> = Result<T, ExecError>;
