//! Treasury Records for the Bursar Domain
//!
//! Core records with lifecycle management: financial operations, their
//! paired audit entries, holder snapshots, and the treasury balance cache.
//! Status transitions are enforced here, not by callers.

use crate::value_objects::{Address, AssetId, DomainError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Identifiers
// =============================================================================

/// Unique identifier for an OperationRecord
pub type OperationId = Uuid;

/// Unique identifier for an AuditEntry
pub type AuditId = Uuid;

/// Unique identifier for a HolderSnapshot
pub type SnapshotId = Uuid;

// =============================================================================
// Operation Kind
// =============================================================================

/// The closed set of financial operation kinds.
///
/// Every operation the treasury performs is one of these; there are no
/// string-tagged kinds, so status derivation and persistence can match
/// exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Deploy the managed asset on the settlement ledger
    Deployment,
    /// Burn (destroy) managed asset supply held by the treasury
    Burn,
    /// Buy back managed asset supply with the native asset
    Buyback,
    /// Claim accrued issuer rewards for the managed asset
    RewardClaim,
    /// Distribute holdings to many recipients (airdrop)
    Distribution,
}

impl OperationKind {
    /// Human-readable action name, used for the paired audit entry.
    pub fn action_name(&self) -> &'static str {
        match self {
            OperationKind::Deployment => "deploy asset",
            OperationKind::Burn => "burn supply",
            OperationKind::Buyback => "buy back supply",
            OperationKind::RewardClaim => "claim issuer rewards",
            OperationKind::Distribution => "distribute holdings",
        }
    }

    /// The initial (non-terminal) status a record of this kind opens in.
    pub fn initial_status(&self) -> OperationStatus {
        match self {
            OperationKind::Distribution => OperationStatus::Processing,
            _ => OperationStatus::Pending,
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OperationKind::Deployment => "deployment",
            OperationKind::Burn => "burn",
            OperationKind::Buyback => "buyback",
            OperationKind::RewardClaim => "reward_claim",
            OperationKind::Distribution => "distribution",
        };
        write!(f, "{}", s)
    }
}

// =============================================================================
// Operation Status
// =============================================================================

/// Operation status machine.
///
/// `Pending` and `Processing` are the only non-terminal states.
/// Single-call operations run `Pending -> {Success, Failed}`; distributions
/// run `Processing -> {Completed, Partial, Failed}`. Once terminal, a record
/// never transitions again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    /// Single-call operation opened, not yet resolved
    Pending,
    /// Distribution opened, recipients being attempted
    Processing,
    /// Single-call operation succeeded
    Success,
    /// Operation failed (for distributions: zero recipients succeeded)
    Failed,
    /// Distribution: every recipient succeeded
    Completed,
    /// Distribution: at least one recipient succeeded and at least one failed
    Partial,
}

impl OperationStatus {
    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OperationStatus::Success
                | OperationStatus::Failed
                | OperationStatus::Completed
                | OperationStatus::Partial
        )
    }

    /// Whether the machine permits a transition from `self` to `next`.
    pub fn can_transition_to(&self, next: OperationStatus) -> bool {
        match self {
            OperationStatus::Pending => {
                matches!(next, OperationStatus::Success | OperationStatus::Failed)
            }
            OperationStatus::Processing => matches!(
                next,
                OperationStatus::Completed | OperationStatus::Partial | OperationStatus::Failed
            ),
            // Terminal states transition nowhere.
            _ => false,
        }
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OperationStatus::Pending => "pending",
            OperationStatus::Processing => "processing",
            OperationStatus::Success => "success",
            OperationStatus::Failed => "failed",
            OperationStatus::Completed => "completed",
            OperationStatus::Partial => "partial",
        };
        write!(f, "{}", s)
    }
}

// =============================================================================
// Recipient Outcome & Aggregate Status
// =============================================================================

/// The result of one transfer attempt within a distribution.
///
/// Outcomes are ordered by the original request order, not completion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipientOutcome {
    /// Recipient account
    pub recipient: Address,
    /// Amount requested for this recipient
    pub requested_amount: Decimal,
    /// Settlement signature, present on success
    pub signature: Option<String>,
    /// Whether the transfer settled
    pub success: bool,
    /// Gateway error string, present on failure
    pub error: Option<String>,
}

impl RecipientOutcome {
    /// A settled transfer with its settlement signature.
    pub fn succeeded(
        recipient: Address,
        requested_amount: Decimal,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            recipient,
            requested_amount,
            signature: Some(signature.into()),
            success: true,
            error: None,
        }
    }

    /// A failed transfer carrying the gateway's error string.
    pub fn failed(recipient: Address, requested_amount: Decimal, error: impl Into<String>) -> Self {
        Self {
            recipient,
            requested_amount,
            signature: None,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Derive the single terminal status summarizing all recipient outcomes.
///
/// This is the one canonical rule; no other code compares success counts:
/// - zero successes (including zero recipients attempted) => `Failed`
/// - every recipient succeeded => `Completed`
/// - mixed => `Partial`
pub fn aggregate_status(outcomes: &[RecipientOutcome]) -> OperationStatus {
    let succeeded = outcomes.iter().filter(|o| o.success).count();
    if succeeded == 0 {
        OperationStatus::Failed
    } else if succeeded == outcomes.len() {
        OperationStatus::Completed
    } else {
        OperationStatus::Partial
    }
}

// =============================================================================
// Operation Record
// =============================================================================

/// Distribution-specific attributes of an OperationRecord.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionDetails {
    /// Number of recipients planned at open time
    pub recipient_count: usize,
    /// Total quantity requested, computed from the recipient list at open
    pub total_requested: Decimal,
    /// Per-recipient outcomes, empty until the record closes
    pub outcomes: Vec<RecipientOutcome>,
}

impl DistributionDetails {
    /// Number of recipients whose transfer settled.
    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    /// Number of recipients whose transfer failed.
    pub fn fail_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.success).count()
    }
}

/// A financial operation through its pending -> terminal lifecycle.
///
/// Created and exclusively mutated by the operation ledger; read by API
/// callers. Status is monotonic: the transition methods reject any change
/// once a terminal status is reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    /// Opaque identifier (time-ordered)
    pub id: OperationId,
    /// Operation kind
    pub kind: OperationKind,
    /// Managed asset this operation concerns, absent for native-asset-only
    /// operations (e.g. a native distribution)
    pub asset_id: Option<AssetId>,
    /// Operation quantity; for distributions, the total requested
    pub quantity: Decimal,
    /// Settlement signature, present once a single-call operation succeeds
    pub signature: Option<String>,
    /// Free-text reason supplied by the caller or the advisory cycle
    pub reason: Option<String>,
    /// Error string, present once a single-call operation fails
    pub error: Option<String>,
    /// Current status
    pub status: OperationStatus,
    /// Distribution attributes, present only for `Distribution` records
    pub distribution: Option<DistributionDetails>,
    /// When the record was opened
    pub created_at: DateTime<Utc>,
    /// When the record reached a terminal status
    pub completed_at: Option<DateTime<Utc>>,
}

impl OperationRecord {
    /// Open a single-call operation record in `Pending` status.
    pub fn open(
        kind: OperationKind,
        asset_id: Option<AssetId>,
        quantity: Decimal,
        reason: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            kind,
            asset_id,
            quantity,
            signature: None,
            reason,
            error: None,
            status: OperationStatus::Pending,
            distribution: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Open a distribution record in `Processing` status with an empty
    /// outcome sequence. `total_requested` must be computed from the
    /// recipient list, never supplied independently of it.
    pub fn open_distribution(
        asset_id: Option<AssetId>,
        recipient_count: usize,
        total_requested: Decimal,
        reason: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            kind: OperationKind::Distribution,
            asset_id,
            quantity: total_requested,
            signature: None,
            reason,
            error: None,
            status: OperationStatus::Processing,
            distribution: Some(DistributionDetails {
                recipient_count,
                total_requested,
                outcomes: Vec::new(),
            }),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Whether the record has reached a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Close a single-call operation as succeeded, attaching the
    /// settlement signature.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidStateTransition` if the record is not
    /// in `Pending` status.
    pub fn complete_success(&mut self, signature: impl Into<String>) -> Result<(), DomainError> {
        self.transition(OperationStatus::Success)?;
        self.signature = Some(signature.into());
        Ok(())
    }

    /// Close a single-call operation as failed, attaching the error string.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidStateTransition` if the record is not
    /// in `Pending` status.
    pub fn complete_failed(&mut self, error: impl Into<String>) -> Result<(), DomainError> {
        self.transition(OperationStatus::Failed)?;
        self.error = Some(error.into());
        Ok(())
    }

    /// Close a distribution by attaching the full outcome sequence in one
    /// mutation and deriving the aggregate status.
    ///
    /// # Errors
    /// - `DomainError::DistributionMismatch` if the record carries no
    ///   distribution details, if outcomes were already attached, or if the
    ///   outcome count or amount sum disagrees with what was planned at open.
    /// - `DomainError::InvalidStateTransition` if the record is already
    ///   terminal.
    pub fn complete_distribution(
        &mut self,
        outcomes: Vec<RecipientOutcome>,
    ) -> Result<OperationStatus, DomainError> {
        {
            let details = self.distribution.as_ref().ok_or_else(|| {
                DomainError::DistributionMismatch(
                    "record carries no distribution details".to_string(),
                )
            })?;

            if !details.outcomes.is_empty() {
                return Err(DomainError::DistributionMismatch(
                    "outcome sequence already attached".to_string(),
                ));
            }
            if outcomes.len() != details.recipient_count {
                return Err(DomainError::DistributionMismatch(format!(
                    "expected {} outcomes, got {}",
                    details.recipient_count,
                    outcomes.len()
                )));
            }
            let attempted: Decimal = outcomes.iter().map(|o| o.requested_amount).sum();
            if attempted != details.total_requested {
                return Err(DomainError::DistributionMismatch(format!(
                    "outcome amounts sum to {}, total requested was {}",
                    attempted, details.total_requested
                )));
            }
        }

        let status = aggregate_status(&outcomes);
        self.transition(status)?;
        if let Some(details) = self.distribution.as_mut() {
            details.outcomes = outcomes;
        }
        Ok(status)
    }

    /// Apply a status transition, stamping the completion time on entry to
    /// a terminal status.
    fn transition(&mut self, next: OperationStatus) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition(format!(
                "{} -> {}",
                self.status, next
            )));
        }
        self.status = next;
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }
}

// =============================================================================
// Audit Entry
// =============================================================================

/// A free-form record of *why* an operation happened.
///
/// Logically paired 1:1 with an OperationRecord via an `operation_id` key
/// inside `metadata`, but stored independently: rationale may exist without
/// a financial operation (pure decision commentary).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Opaque identifier (time-ordered)
    pub id: AuditId,
    /// Human-readable action name
    pub action: String,
    /// Free-text rationale
    pub rationale: Option<String>,
    /// Structured metadata (asset id, operation id, advisory inputs)
    pub metadata: serde_json::Value,
    /// Current status; mirrors the paired operation's status at close
    pub status: OperationStatus,
    /// When the entry was opened
    pub created_at: DateTime<Utc>,
    /// When the entry reached a terminal status
    pub completed_at: Option<DateTime<Utc>>,
}

impl AuditEntry {
    /// Open an audit entry paired with an operation; `initial` is the
    /// operation's opening status (`Pending` or `Processing`).
    pub fn open(
        action: impl Into<String>,
        rationale: Option<String>,
        metadata: serde_json::Value,
        initial: OperationStatus,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            action: action.into(),
            rationale,
            metadata,
            status: initial,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Record standalone commentary with no financial operation attached.
    /// The entry is created already terminal.
    pub fn note(
        action: impl Into<String>,
        rationale: Option<String>,
        metadata: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            action: action.into(),
            rationale,
            metadata,
            status: OperationStatus::Success,
            created_at: now,
            completed_at: Some(now),
        }
    }

    /// Complete the entry with the paired operation's terminal status.
    ///
    /// Audit entries are free-form, so only monotonicity is enforced here:
    /// the entry must not already be terminal and `status` must be terminal.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidStateTransition` otherwise.
    pub fn complete(&mut self, status: OperationStatus) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::InvalidStateTransition(format!(
                "audit entry already terminal ({})",
                self.status
            )));
        }
        if !status.is_terminal() {
            return Err(DomainError::InvalidStateTransition(format!(
                "audit entry must complete to a terminal status, got {}",
                status
            )));
        }
        self.status = status;
        self.completed_at = Some(Utc::now());
        Ok(())
    }
}

// =============================================================================
// Holder Snapshot
// =============================================================================

/// One holder's balance and share within a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolderBalance {
    /// Holder account
    pub address: Address,
    /// Balance at capture time
    pub balance: Decimal,
    /// Share of the captured supply, in percent, rounded to 4 decimal places
    pub percentage: Decimal,
}

/// A point-in-time capture of asset holders and balances.
///
/// Immutable once created; used only as an input to distribution planning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolderSnapshot {
    /// Opaque identifier (time-ordered)
    pub id: SnapshotId,
    /// Asset the snapshot was captured for
    pub asset_id: AssetId,
    /// Holders with a positive balance at capture time
    pub holders: Vec<HolderBalance>,
    /// Number of holders captured
    pub holder_count: usize,
    /// Total quantity held across captured holders
    pub total_held: Decimal,
    /// When the snapshot was captured
    pub captured_at: DateTime<Utc>,
}

impl HolderSnapshot {
    /// Build a snapshot from raw `(address, balance)` pairs.
    ///
    /// Zero and negative balances are excluded. Each holder's percentage is
    /// computed as `balance / total * 100`, rounded to 4 decimal places.
    pub fn from_balances(asset_id: AssetId, balances: Vec<(Address, Decimal)>) -> Self {
        let positive: Vec<(Address, Decimal)> = balances
            .into_iter()
            .filter(|(_, balance)| *balance > Decimal::ZERO)
            .collect();

        let total_held: Decimal = positive.iter().map(|(_, balance)| *balance).sum();

        let holders: Vec<HolderBalance> = positive
            .into_iter()
            .map(|(address, balance)| {
                let percentage = if total_held > Decimal::ZERO {
                    (balance / total_held * Decimal::ONE_HUNDRED).round_dp(4)
                } else {
                    Decimal::ZERO
                };
                HolderBalance {
                    address,
                    balance,
                    percentage,
                }
            })
            .collect();

        Self {
            id: Uuid::now_v7(),
            asset_id,
            holder_count: holders.len(),
            total_held,
            holders,
            captured_at: Utc::now(),
        }
    }
}

// =============================================================================
// Treasury Balance Cache
// =============================================================================

/// Cached treasury balances: the native settlement asset and the managed
/// asset. A cache only — the gateway's live read is always authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreasuryBalances {
    /// Native settlement asset balance
    pub native: Decimal,
    /// Managed asset balance
    pub asset: Decimal,
    /// When the balances were last read from the ledger network
    pub refreshed_at: DateTime<Utc>,
}

impl TreasuryBalances {
    /// Record freshly read balances.
    pub fn new(native: Decimal, asset: Decimal) -> Self {
        Self {
            native,
            asset,
            refreshed_at: Utc::now(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
