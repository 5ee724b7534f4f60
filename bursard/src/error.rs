//! Daemon error types.

use bursar_domain::DomainError;
use bursar_exec::ExecError;
use bursar_store::StoreError;
use thiserror::Error;
use uuid::Uuid;

/// Daemon-level errors.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Domain error (request validation)
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Execution error
    #[error("Execution error: {0}")]
    Exec(#[from] ExecError),

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Operation record not found
    #[error("Operation not found: {0}")]
    OperationNotFound(Uuid),

    /// Holder snapshot not found
    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(Uuid),

    /// Advisory cycle error
    #[error("Advisory error: {0}")]
    Advisory(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Shutdown requested
    #[error("Shutdown requested")]
    Shutdown,
}

/// Result type for daemon operations.
pub type DaemonResult<T> = Result<T, DaemonError>;
