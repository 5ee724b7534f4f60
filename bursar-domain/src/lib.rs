//! Bursar Domain Layer
//!
//! Pure domain logic with zero I/O dependencies.
//! Contains treasury records, value objects, and lifecycle rules.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Public modules
pub mod context;
pub mod records;
pub mod value_objects;

// Re-export commonly used types
pub use context::TreasuryContext;
pub use records::{
    aggregate_status, AuditEntry, AuditId, DistributionDetails, HolderBalance, HolderSnapshot,
    OperationId, OperationKind, OperationRecord, OperationStatus, RecipientOutcome, SnapshotId,
    TreasuryBalances,
};
pub use value_objects::{Address, Amount, AssetId, DomainError, WalletKey};
