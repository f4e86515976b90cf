//! # Error Types
//!
//! Domain-specific error types for registra-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  registra-core errors (this file)                                   │
//! │  ├── CoreError        - Business rule / state violations            │
//! │  └── ValidationError  - Input validation failures                   │
//! │                                                                     │
//! │  registra-engine errors (separate crate)                            │
//! │  ├── EngineError      - Orchestration + collaborator failures       │
//! │  └── RepoError        - Repository contract failures                │
//! │                                                                     │
//! │  registra-db errors (separate crate)                                │
//! │  └── DbError          - SQLite operation failures                   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (session number, line id, field)
//! 3. Errors are enum variants, never String

use thiserror::Error;

use crate::types::{PaymentStatus, SessionStatus, TransactionStatus};

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations and illegal state transitions.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A cart line id that does not exist in the cart.
    #[error("Cart line not found: {0}")]
    LineNotFound(String),

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// Committing an empty cart into a transaction.
    #[error("Cart is empty, nothing to commit")]
    EmptyCart,

    /// Session is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Suspending a session that is not OPEN
    /// - Closing an already-closed session
    /// - Approving a variance with no pending close
    #[error("Session {session_number} is {current:?}, cannot {attempted}")]
    InvalidSessionState {
        session_number: String,
        current: SessionStatus,
        attempted: String,
    },

    /// A location already has a session that is not CLOSED.
    #[error("Location {location_id} already has an open session ({session_number})")]
    LocationOccupied {
        location_id: String,
        session_number: String,
    },

    /// Close was attempted with an unexplained cash difference.
    ///
    /// The caller must re-invoke `close_session` with a variance note;
    /// a register is never silently closed over a discrepancy.
    #[error("Session {session_number} has a variance of {variance} and no variance note")]
    VarianceNoteRequired {
        session_number: String,
        variance: i64,
    },

    /// Transaction is not in a state that allows the requested operation.
    #[error("Transaction {transaction_id} is {current:?}, cannot {attempted}")]
    InvalidTransactionState {
        transaction_id: String,
        current: TransactionStatus,
        attempted: String,
    },

    /// Payment state forbids the requested operation.
    #[error("Transaction {transaction_id} payment status is {current:?}, cannot {attempted}")]
    InvalidPaymentState {
        transaction_id: String,
        current: PaymentStatus,
        attempted: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when input does not meet requirements and are raised
/// before any state change.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in the allowed set (e.g., VAT rate outside {0,5,18,27}).
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_error_messages() {
        let err = CoreError::InvalidSessionState {
            session_number: "KASSZA-2026-0001".to_string(),
            current: SessionStatus::Closed,
            attempted: "suspend".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Session KASSZA-2026-0001 is Closed, cannot suspend"
        );
    }

    #[test]
    fn test_variance_note_required_message() {
        let err = CoreError::VarianceNoteRequired {
            session_number: "KASSZA-2026-0002".to_string(),
            variance: 2000,
        };
        assert_eq!(
            err.to_string(),
            "Session KASSZA-2026-0002 has a variance of 2000 and no variance note"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
