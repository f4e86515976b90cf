//! # Engine Error Types
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  CoreError (registra-core)        ── business rule violations       │
//! │  RepoError (repository traits)    ── persistence failures           │
//! │  GatewayError / InventoryError    ── collaborator failures          │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  EngineError (this module)  ← one surface for callers               │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! State violations arrive as `CoreError`; the engine adds the failure
//! classes only it can see (a gateway decline, a repo timeout, a line
//! that failed to deduct).

use thiserror::Error;

use crate::gateway::GatewayError;
use crate::inventory::InventoryError;

// =============================================================================
// Repository Error
// =============================================================================

/// Failures of the repository contracts.
///
/// Adapters (registra-db, the in-memory doubles) map their native
/// errors into these variants; the engine never sees sqlx directly.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation (duplicate receipt number, second
    /// non-closed session for a location).
    #[error("Conflict on {field}: '{value}' already exists")]
    Conflict { field: String, value: String },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl RepoError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        RepoError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

/// Result type for repository operations.
pub type RepoResult<T> = Result<T, RepoError>;

// =============================================================================
// Engine Error
// =============================================================================

/// Errors surfaced by the engine services.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Business rule or state machine violation.
    #[error(transparent)]
    Core(#[from] registra_core::CoreError),

    /// Persistence failure.
    #[error(transparent)]
    Repo(#[from] RepoError),

    /// Card gateway refused or failed the charge.
    #[error("Card gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Stock deduction failed for a line.
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    /// A refund could not be completed; nothing was deleted.
    #[error("Refund failed for payment {payment_id}: {reason}")]
    RefundFailed { payment_id: String, reason: String },

    /// A partial payment would exceed the remaining balance.
    #[error("Payment of {amount} exceeds remaining balance {remaining} on transaction {transaction_id}")]
    Overpayment {
        transaction_id: String,
        amount: i64,
        remaining: i64,
    },

    /// Cash handed over is short of the remaining balance.
    #[error("Received {received} is less than the remaining balance {remaining} on transaction {transaction_id}")]
    InsufficientCash {
        transaction_id: String,
        received: i64,
        remaining: i64,
    },

    /// Report delivery failed after the retry budget was spent.
    #[error("Report delivery failed after {attempts} attempts: {reason}")]
    DeliveryFailed { attempts: u32, reason: String },
}

impl From<registra_core::ValidationError> for EngineError {
    fn from(err: registra_core::ValidationError) -> Self {
        EngineError::Core(err.into())
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overpayment_message() {
        let err = EngineError::Overpayment {
            transaction_id: "txn-1".to_string(),
            amount: 20000,
            remaining: 12700,
        };
        assert_eq!(
            err.to_string(),
            "Payment of 20000 exceeds remaining balance 12700 on transaction txn-1"
        );
    }

    #[test]
    fn test_core_error_is_transparent() {
        let core = registra_core::CoreError::EmptyCart;
        let engine: EngineError = core.into();
        assert_eq!(engine.to_string(), "Cart is empty, nothing to commit");
    }
}
