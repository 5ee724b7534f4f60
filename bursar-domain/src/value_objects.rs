//! Value Objects for the Bursar Domain
//!
//! Immutable, validated domain primitives.
//! All value objects enforce invariants at construction time.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length for on-ledger identifiers (asset ids, account addresses).
const MAX_IDENTIFIER_LEN: usize = 64;

/// Domain errors for value object validation and record lifecycle rules
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Amount must be strictly positive
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Asset identifier must be a valid on-ledger identifier
    #[error("Invalid asset id: {0}")]
    InvalidAssetId(String),

    /// Address must be a valid on-ledger account identifier
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Wallet key reference must be non-empty
    #[error("Invalid wallet key: {0}")]
    InvalidWalletKey(String),

    /// Invalid status transition (terminal records never transition again)
    #[error("Invalid status transition: {0}")]
    InvalidStateTransition(String),

    /// Distribution accounting violation (count or total mismatch)
    #[error("Distribution mismatch: {0}")]
    DistributionMismatch(String),
}

// =============================================================================
// Amount
// =============================================================================

/// Amount represents a strictly positive decimal quantity.
///
/// All treasury quantities (burn amounts, buyback spend, per-recipient
/// allocations) flow through this type. The inner [`Decimal`] serializes as a
/// string, so no precision is lost on the wire or in storage.
///
/// # Invariants
/// - Must be > 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    /// Create a new Amount with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidAmount` if value <= 0
    pub fn new(value: Decimal) -> Result<Self, DomainError> {
        if value <= Decimal::ZERO {
            return Err(DomainError::InvalidAmount(
                "Amount must be strictly positive".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// Get the underlying Decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// AssetId
// =============================================================================

/// AssetId identifies the managed fungible asset on the settlement ledger.
///
/// # Invariants
/// - Non-empty, ascii-alphanumeric, at most 64 characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetId(String);

impl AssetId {
    /// Create a new AssetId with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidAssetId` if the identifier is empty,
    /// too long, or contains non-alphanumeric characters.
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        validate_identifier(&value).map_err(DomainError::InvalidAssetId)?;
        Ok(Self(value))
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Address
// =============================================================================

/// Address identifies an account on the settlement ledger
/// (a distribution recipient or the treasury itself).
///
/// # Invariants
/// - Non-empty, ascii-alphanumeric, at most 64 characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    /// Create a new Address with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidAddress` if the identifier is empty,
    /// too long, or contains non-alphanumeric characters.
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        validate_identifier(&value).map_err(DomainError::InvalidAddress)?;
        Ok(Self(value))
    }

    /// Get the address as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn validate_identifier(value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err("identifier must be non-empty".to_string());
    }
    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(format!(
            "identifier exceeds {} characters",
            MAX_IDENTIFIER_LEN
        ));
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(format!("identifier contains invalid characters: {}", value));
    }
    Ok(())
}

// =============================================================================
// WalletKey
// =============================================================================

/// WalletKey is an opaque reference to the treasury signing key.
///
/// Custody and key generation live outside this system; the key material is
/// only ever forwarded to the remote operation gateway. The value is kept out
/// of `Debug` output and is deliberately not serializable.
#[derive(Clone, PartialEq, Eq)]
pub struct WalletKey(String);

impl WalletKey {
    /// Create a new WalletKey with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidWalletKey` if the reference is empty.
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.is_empty() {
            return Err(DomainError::InvalidWalletKey(
                "wallet key reference must be non-empty".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// Expose the key reference for the gateway call
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for WalletKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WalletKey(***)")
    }
}

// =============================================================================
// Tests
// =============================================================================
