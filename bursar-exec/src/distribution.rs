//! Batch Distribution Engine.
//!
//! Executes a one-to-many distribution as an ordered sequence of
//! independent transfers and produces exactly one distribution record
//! summarizing it.
//!
//! Recipients are processed sequentially and independently: they share the
//! source wallet's transaction-ordering constraints on the ledger network,
//! so parallel submission risks conflicting or dropped transactions.
//! Sequential processing trades latency for correctness simplicity; the
//! injected [`Pacer`] protects the shared gateway from rate limits. An
//! individual recipient failure never aborts the batch, and there is no
//! automatic retry — retrying a failed subset is a new distribution request.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{info, warn};

use bursar_domain::{
    AssetId, OperationId, OperationStatus, RecipientOutcome, TreasuryContext,
};
use bursar_store::Store;

use crate::error::{ExecError, ExecResult};
use crate::ledger::{OperationLedger, OperationOutcome};
use crate::pacing::Pacer;
use crate::planning::Recipient;
use crate::ports::LedgerGateway;

// =============================================================================
// Distribution Kind & Result
// =============================================================================

/// Which asset a distribution moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionKind {
    /// Distribute the native settlement asset
    Native,
    /// Distribute the managed asset (requires an asset id)
    Asset,
}

/// Summary of a finished distribution.
#[derive(Debug, Clone)]
pub struct DistributionResult {
    /// The distribution record's id
    pub id: OperationId,
    /// Aggregate terminal status
    pub status: OperationStatus,
    /// Recipients whose transfer settled
    pub success_count: usize,
    /// Recipients whose transfer failed
    pub fail_count: usize,
    /// Total quantity requested, computed from the recipient list
    pub total_requested: Decimal,
    /// Per-recipient outcomes in request order
    pub outcomes: Vec<RecipientOutcome>,
}

// =============================================================================
// Distribution Engine
// =============================================================================

/// Executes distributions against the remote operation gateway and records
/// them through the operation ledger.
pub struct DistributionEngine<G: LedgerGateway, S: Store> {
    gateway: Arc<G>,
    ledger: OperationLedger<S>,
    pacer: Arc<dyn Pacer>,
    call_timeout: Duration,
}

impl<G: LedgerGateway, S: Store> DistributionEngine<G, S> {
    /// Create an engine.
    ///
    /// `call_timeout` bounds each individual gateway call so a single stuck
    /// recipient cannot stall the batch; a timed-out call is a failed
    /// outcome for that recipient, not a hang for the whole batch.
    pub fn new(
        gateway: Arc<G>,
        ledger: OperationLedger<S>,
        pacer: Arc<dyn Pacer>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            gateway,
            ledger,
            pacer,
            call_timeout,
        }
    }

    /// Execute a distribution.
    ///
    /// Validation happens before any record is opened, so an invalid
    /// request leaves no partial state. Once opened, the distribution runs
    /// to completion — every recipient is attempted regardless of prior
    /// failures — and the record is closed exactly once with the full
    /// outcome sequence. The treasury balance cache is deliberately not
    /// refreshed here; that is the caller's follow-up, so a failed refresh
    /// cannot contaminate the distribution's own result.
    ///
    /// # Errors
    /// - `ExecError::InvalidRequest` for an empty recipient list, or a
    ///   managed-asset distribution without an asset id.
    /// - Store faults, which are fatal.
    pub async fn distribute(
        &self,
        ctx: &TreasuryContext,
        kind: DistributionKind,
        asset_id: Option<AssetId>,
        recipients: Vec<Recipient>,
        reason: Option<String>,
    ) -> ExecResult<DistributionResult> {
        if recipients.is_empty() {
            return Err(ExecError::InvalidRequest(
                "recipient list must be non-empty".to_string(),
            ));
        }

        let asset = match kind {
            DistributionKind::Asset => Some(asset_id.ok_or_else(|| {
                ExecError::InvalidRequest(
                    "managed-asset distribution requires an asset id".to_string(),
                )
            })?),
            DistributionKind::Native => None,
        };

        // Computed here, never caller-supplied, so the total can never
        // disagree with the recipient list.
        let total: Decimal = recipients.iter().map(|r| r.amount.as_decimal()).sum();

        let id = self
            .ledger
            .open_distribution(asset.clone(), recipients.len(), total, reason)
            .await?;

        info!(
            operation_id = %id,
            ?kind,
            recipients = recipients.len(),
            total = %total,
            "Distribution started"
        );

        let mut outcomes: Vec<RecipientOutcome> = Vec::with_capacity(recipients.len());
        for (index, recipient) in recipients.iter().enumerate() {
            if index > 0 {
                self.pacer.pace().await;
            }

            let attempt = timeout(
                self.call_timeout,
                self.gateway.transfer(
                    &ctx.wallet,
                    &recipient.address,
                    asset.as_ref(),
                    recipient.amount,
                ),
            )
            .await;

            let outcome = match attempt {
                Ok(Ok(signature)) => RecipientOutcome::succeeded(
                    recipient.address.clone(),
                    recipient.amount.as_decimal(),
                    signature,
                ),
                Ok(Err(e)) => {
                    warn!(
                        operation_id = %id,
                        recipient = %recipient.address,
                        error = %e,
                        "Recipient transfer failed"
                    );
                    RecipientOutcome::failed(
                        recipient.address.clone(),
                        recipient.amount.as_decimal(),
                        e.to_string(),
                    )
                }
                Err(_) => {
                    warn!(
                        operation_id = %id,
                        recipient = %recipient.address,
                        "Recipient transfer timed out"
                    );
                    RecipientOutcome::failed(
                        recipient.address.clone(),
                        recipient.amount.as_decimal(),
                        format!("transfer timed out after {:?}", self.call_timeout),
                    )
                }
            };
            outcomes.push(outcome);
        }

        let record = self
            .ledger
            .close(id, OperationOutcome::Distribution { outcomes })
            .await?;
        let details = record.distribution.as_ref().ok_or_else(|| {
            ExecError::InternalConsistency(format!(
                "distribution record {} lost its details",
                record.id
            ))
        })?;

        let result = DistributionResult {
            id: record.id,
            status: record.status,
            success_count: details.success_count(),
            fail_count: details.fail_count(),
            total_requested: details.total_requested,
            outcomes: details.outcomes.clone(),
        };

        info!(
            operation_id = %id,
            status = %record.status,
            succeeded = result.success_count,
            failed = result.fail_count,
            "Distribution closed"
        );
        Ok(result)
    }
}

// =============================================================================
// Tests
// =============================================================================
