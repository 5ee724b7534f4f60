//! HTTP API for the Bursar daemon.
//!
//! Provides REST endpoints for:
//! - Health check
//! - Treasury balances (cached, with optional refresh)
//! - Single-call operations (deploy, burn, buyback, claim)
//! - Distributions (explicit recipients or snapshot-planned)
//! - Operation listing and lookup
//! - Holder snapshots
//!
//! Wire DTOs use camelCase field names; quantities travel as strings.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use bursar_domain::{
    Address, Amount, AssetId, HolderSnapshot, OperationKind, OperationRecord, OperationStatus,
};
use bursar_exec::{
    AssetProfile, DistributionKind, DistributionResult, ExecError, HolderDirectory, LedgerGateway,
    OperationReport, Recipient,
};
use bursar_store::{OperationFilter, Store};

use crate::error::DaemonError;
use crate::treasury::TreasuryManager;

/// Default page size for operation listing. A convenience only, not a
/// correctness constraint; callers may page past it freely.
const DEFAULT_PAGE_SIZE: usize = 50;

// =============================================================================
// API State
// =============================================================================

/// Shared state for API handlers.
pub struct ApiState<G, D, S>
where
    G: LedgerGateway + 'static,
    D: HolderDirectory + 'static,
    S: Store + 'static,
{
    /// Treasury orchestration
    pub manager: Arc<TreasuryManager<G, D, S>>,
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Cached treasury balances.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalancesResponse {
    pub native: Decimal,
    pub asset: Decimal,
    pub refreshed_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct BalancesQuery {
    pub refresh: Option<bool>,
}

/// Request to deploy the managed asset.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRequest {
    pub name: String,
    pub symbol: String,
    pub metadata_uri: Option<String>,
    pub initial_buy: Option<Decimal>,
    pub reason: Option<String>,
}

/// Request to burn supply.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnRequest {
    pub asset_id: String,
    pub amount: Decimal,
    pub reason: Option<String>,
}

/// Request to buy back supply.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuybackRequest {
    pub asset_id: String,
    pub native_amount: Decimal,
    pub reason: Option<String>,
}

/// Request to claim issuer rewards.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    pub asset_id: String,
    pub reason: Option<String>,
}

/// Response for single-call operations.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse {
    pub success: bool,
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settlement_signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One recipient of an explicit distribution request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientRequest {
    pub address: String,
    pub amount: Decimal,
}

/// Request to distribute holdings.
///
/// Either `recipients` is supplied explicitly, or `useSnapshot`/`snapshotId`
/// selects snapshot-planned proportional allocation of `totalAmount`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributeRequest {
    pub kind: DistributionKind,
    pub asset_id: Option<String>,
    #[serde(default)]
    pub recipients: Vec<RecipientRequest>,
    #[serde(default)]
    pub use_snapshot: bool,
    pub snapshot_id: Option<Uuid>,
    pub total_amount: Option<Decimal>,
    pub reason: Option<String>,
}

/// One recipient outcome on the wire.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeResponse {
    pub recipient_address: String,
    pub requested_amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settlement_signature: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response for distributions.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributeResponse {
    pub id: Uuid,
    pub status: OperationStatus,
    pub success_count: usize,
    pub fail_count: usize,
    pub total_requested: Decimal,
    pub outcomes: Vec<OutcomeResponse>,
}

/// Query parameters for operation listing.
#[derive(Debug, Deserialize)]
pub struct OperationsQuery {
    pub kind: Option<OperationKind>,
    pub asset: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Distribution attributes of a listed operation.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionSummary {
    pub recipient_count: usize,
    pub total_requested: Decimal,
    pub success_count: usize,
    pub fail_count: usize,
    pub outcomes: Vec<OutcomeResponse>,
}

/// Summary of an operation record.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationSummary {
    pub id: Uuid,
    pub kind: OperationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    pub quantity: Decimal,
    pub status: OperationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settlement_signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution: Option<DistributionSummary>,
}

/// Operation listing response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationsResponse {
    pub operations: Vec<OperationSummary>,
    pub total: usize,
}

/// Request to capture a holder snapshot.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRequest {
    pub asset_id: Option<String>,
}

/// One holder on the wire.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HolderResponse {
    pub address: String,
    pub balance: Decimal,
    pub percentage: Decimal,
}

/// Holder snapshot response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotResponse {
    pub id: Uuid,
    pub asset_id: String,
    pub holder_count: usize,
    pub total_held: Decimal,
    pub captured_at: DateTime<Utc>,
    pub holders: Vec<HolderResponse>,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// =============================================================================
// Router
// =============================================================================

/// Create the API router.
pub fn create_router<G, D, S>(state: Arc<ApiState<G, D, S>>) -> Router
where
    G: LedgerGateway + 'static,
    D: HolderDirectory + 'static,
    S: Store + 'static,
{
    Router::new()
        .route("/health", get(health_handler))
        .route("/treasury/balances", get(balances_handler))
        .route("/operation/deploy", post(deploy_handler))
        .route("/operation/burn", post(burn_handler))
        .route("/operation/buyback", post(buyback_handler))
        .route("/operation/claim", post(claim_handler))
        .route("/operation/distribute", post(distribute_handler))
        .route("/operations", get(operations_handler))
        .route("/operations/:id", get(operation_handler))
        .route("/snapshots", post(snapshot_handler))
        .route("/snapshots/:id", get(get_snapshot_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

type ApiError = (StatusCode, Json<ErrorResponse>);

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint.
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Cached treasury balances, optionally refreshed from the gateway.
async fn balances_handler<G, D, S>(
    State(state): State<Arc<ApiState<G, D, S>>>,
    Query(query): Query<BalancesQuery>,
) -> Result<Json<BalancesResponse>, ApiError>
where
    G: LedgerGateway + 'static,
    D: HolderDirectory + 'static,
    S: Store + 'static,
{
    let balances = state
        .manager
        .balances(query.refresh.unwrap_or(false))
        .await
        .map_err(to_error_response)?;

    Ok(Json(BalancesResponse {
        native: balances.native,
        asset: balances.asset,
        refreshed_at: balances.refreshed_at,
    }))
}

/// Deploy the managed asset.
async fn deploy_handler<G, D, S>(
    State(state): State<Arc<ApiState<G, D, S>>>,
    Json(req): Json<DeployRequest>,
) -> Result<Json<OperationResponse>, ApiError>
where
    G: LedgerGateway + 'static,
    D: HolderDirectory + 'static,
    S: Store + 'static,
{
    let initial_buy = req
        .initial_buy
        .map(|v| parse_amount(v, "initialBuy"))
        .transpose()?;

    if req.name.is_empty() || req.symbol.is_empty() {
        return Err(to_error_response(DaemonError::Exec(
            ExecError::InvalidRequest("name and symbol must be non-empty".to_string()),
        )));
    }

    let profile = AssetProfile {
        name: req.name,
        symbol: req.symbol,
        metadata_uri: req.metadata_uri,
        initial_buy,
    };

    let report = state
        .manager
        .deploy(profile, req.reason)
        .await
        .map_err(to_error_response)?;
    Ok(Json(report_to_response(report)))
}

/// Burn supply.
async fn burn_handler<G, D, S>(
    State(state): State<Arc<ApiState<G, D, S>>>,
    Json(req): Json<BurnRequest>,
) -> Result<Json<OperationResponse>, ApiError>
where
    G: LedgerGateway + 'static,
    D: HolderDirectory + 'static,
    S: Store + 'static,
{
    let asset = parse_asset(&req.asset_id)?;
    let amount = parse_amount(req.amount, "amount")?;

    let report = state
        .manager
        .burn(asset, amount, req.reason)
        .await
        .map_err(to_error_response)?;
    Ok(Json(report_to_response(report)))
}

/// Buy back supply.
async fn buyback_handler<G, D, S>(
    State(state): State<Arc<ApiState<G, D, S>>>,
    Json(req): Json<BuybackRequest>,
) -> Result<Json<OperationResponse>, ApiError>
where
    G: LedgerGateway + 'static,
    D: HolderDirectory + 'static,
    S: Store + 'static,
{
    let asset = parse_asset(&req.asset_id)?;
    let native_amount = parse_amount(req.native_amount, "nativeAmount")?;

    let report = state
        .manager
        .buyback(asset, native_amount, req.reason)
        .await
        .map_err(to_error_response)?;
    Ok(Json(report_to_response(report)))
}

/// Claim issuer rewards.
async fn claim_handler<G, D, S>(
    State(state): State<Arc<ApiState<G, D, S>>>,
    Json(req): Json<ClaimRequest>,
) -> Result<Json<OperationResponse>, ApiError>
where
    G: LedgerGateway + 'static,
    D: HolderDirectory + 'static,
    S: Store + 'static,
{
    let asset = parse_asset(&req.asset_id)?;

    let report = state
        .manager
        .claim(asset, req.reason)
        .await
        .map_err(to_error_response)?;
    Ok(Json(report_to_response(report)))
}

/// Distribute holdings (explicit recipients or snapshot-planned).
async fn distribute_handler<G, D, S>(
    State(state): State<Arc<ApiState<G, D, S>>>,
    Json(req): Json<DistributeRequest>,
) -> Result<Json<DistributeResponse>, ApiError>
where
    G: LedgerGateway + 'static,
    D: HolderDirectory + 'static,
    S: Store + 'static,
{
    let result = if req.use_snapshot || req.snapshot_id.is_some() {
        let total = req.total_amount.ok_or_else(|| {
            to_error_response(DaemonError::Exec(ExecError::InvalidRequest(
                "totalAmount is required for snapshot distributions".to_string(),
            )))
        })?;
        let total = parse_amount(total, "totalAmount")?;

        state
            .manager
            .distribute_from_snapshot(req.kind, req.snapshot_id, total, req.reason)
            .await
            .map_err(to_error_response)?
    } else {
        let asset = req.asset_id.as_deref().map(parse_asset).transpose()?;
        let mut recipients = Vec::with_capacity(req.recipients.len());
        for recipient in &req.recipients {
            recipients.push(Recipient {
                address: parse_address(&recipient.address)?,
                amount: parse_amount(recipient.amount, "recipient amount")?,
            });
        }

        state
            .manager
            .distribute(req.kind, asset, recipients, req.reason)
            .await
            .map_err(to_error_response)?
    };

    Ok(Json(distribution_to_response(result)))
}

/// List operations newest-first.
async fn operations_handler<G, D, S>(
    State(state): State<Arc<ApiState<G, D, S>>>,
    Query(query): Query<OperationsQuery>,
) -> Result<Json<OperationsResponse>, ApiError>
where
    G: LedgerGateway + 'static,
    D: HolderDirectory + 'static,
    S: Store + 'static,
{
    let asset_id = query.asset.as_deref().map(parse_asset).transpose()?;
    let filter = OperationFilter {
        kind: query.kind,
        asset_id,
    };

    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0);

    let records = state
        .manager
        .list_operations(&filter, limit, offset)
        .await
        .map_err(to_error_response)?;
    let total = state
        .manager
        .count_operations(&filter)
        .await
        .map_err(to_error_response)?;

    Ok(Json(OperationsResponse {
        operations: records.iter().map(record_to_summary).collect(),
        total,
    }))
}

/// Get a single operation.
async fn operation_handler<G, D, S>(
    State(state): State<Arc<ApiState<G, D, S>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<OperationSummary>, ApiError>
where
    G: LedgerGateway + 'static,
    D: HolderDirectory + 'static,
    S: Store + 'static,
{
    let record = state
        .manager
        .get_operation(id)
        .await
        .map_err(to_error_response)?;
    Ok(Json(record_to_summary(&record)))
}

/// Capture a holder snapshot.
async fn snapshot_handler<G, D, S>(
    State(state): State<Arc<ApiState<G, D, S>>>,
    Json(req): Json<SnapshotRequest>,
) -> Result<(StatusCode, Json<SnapshotResponse>), ApiError>
where
    G: LedgerGateway + 'static,
    D: HolderDirectory + 'static,
    S: Store + 'static,
{
    let asset = req.asset_id.as_deref().map(parse_asset).transpose()?;

    let snapshot = state
        .manager
        .capture_snapshot(asset)
        .await
        .map_err(to_error_response)?;
    Ok((StatusCode::CREATED, Json(snapshot_to_response(&snapshot))))
}

/// Get a snapshot by id.
async fn get_snapshot_handler<G, D, S>(
    State(state): State<Arc<ApiState<G, D, S>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SnapshotResponse>, ApiError>
where
    G: LedgerGateway + 'static,
    D: HolderDirectory + 'static,
    S: Store + 'static,
{
    let snapshot = state
        .manager
        .get_snapshot(id)
        .await
        .map_err(to_error_response)?;
    Ok(Json(snapshot_to_response(&snapshot)))
}

// =============================================================================
// Helpers
// =============================================================================

fn parse_asset(value: &str) -> Result<AssetId, ApiError> {
    AssetId::new(value).map_err(|e| to_error_response(DaemonError::Domain(e)))
}

fn parse_address(value: &str) -> Result<Address, ApiError> {
    Address::new(value).map_err(|e| to_error_response(DaemonError::Domain(e)))
}

fn parse_amount(value: Decimal, field: &str) -> Result<Amount, ApiError> {
    Amount::new(value).map_err(|e| {
        to_error_response(DaemonError::Exec(ExecError::InvalidRequest(format!(
            "{}: {}",
            field, e
        ))))
    })
}

fn to_error_response(error: DaemonError) -> ApiError {
    let status = match &error {
        DaemonError::Domain(_) | DaemonError::Advisory(_) => StatusCode::BAD_REQUEST,
        DaemonError::Exec(e) => match e {
            ExecError::InvalidRequest(_) | ExecError::EmptySnapshot(_) | ExecError::Domain(_) => {
                StatusCode::BAD_REQUEST
            }
            ExecError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            ExecError::InsufficientFunds(_) => StatusCode::CONFLICT,
            ExecError::InternalConsistency(_) | ExecError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        },
        DaemonError::OperationNotFound(_) | DaemonError::SnapshotNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        DaemonError::Store(_) | DaemonError::Config(_) | DaemonError::Shutdown => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

fn report_to_response(report: OperationReport) -> OperationResponse {
    OperationResponse {
        success: report.is_success(),
        id: report.id,
        asset_id: report.asset_id.map(|a| a.to_string()),
        settlement_signature: report.signature,
        error: report.error,
    }
}

fn distribution_to_response(result: DistributionResult) -> DistributeResponse {
    DistributeResponse {
        id: result.id,
        status: result.status,
        success_count: result.success_count,
        fail_count: result.fail_count,
        total_requested: result.total_requested,
        outcomes: result
            .outcomes
            .into_iter()
            .map(|o| OutcomeResponse {
                recipient_address: o.recipient.to_string(),
                requested_amount: o.requested_amount,
                settlement_signature: o.signature,
                success: o.success,
                error: o.error,
            })
            .collect(),
    }
}

fn record_to_summary(record: &OperationRecord) -> OperationSummary {
    OperationSummary {
        id: record.id,
        kind: record.kind,
        asset_id: record.asset_id.as_ref().map(|a| a.to_string()),
        quantity: record.quantity,
        status: record.status,
        settlement_signature: record.signature.clone(),
        error: record.error.clone(),
        reason: record.reason.clone(),
        created_at: record.created_at,
        completed_at: record.completed_at,
        distribution: record.distribution.as_ref().map(|d| DistributionSummary {
            recipient_count: d.recipient_count,
            total_requested: d.total_requested,
            success_count: d.success_count(),
            fail_count: d.fail_count(),
            outcomes: d
                .outcomes
                .iter()
                .map(|o| OutcomeResponse {
                    recipient_address: o.recipient.to_string(),
                    requested_amount: o.requested_amount,
                    settlement_signature: o.signature.clone(),
                    success: o.success,
                    error: o.error.clone(),
                })
                .collect(),
        }),
    }
}

fn snapshot_to_response(snapshot: &HolderSnapshot) -> SnapshotResponse {
    SnapshotResponse {
        id: snapshot.id,
        asset_id: snapshot.asset_id.to_string(),
        holder_count: snapshot.holder_count,
        total_held: snapshot.total_held,
        captured_at: snapshot.captured_at,
        holders: snapshot
            .holders
            .iter()
            .map(|h| HolderResponse {
                address: h.address.to_string(),
                balance: h.balance,
                percentage: h.percentage,
            })
            .collect(),
    }
}

// =============================================================================
// Tests
// =============================================================================
