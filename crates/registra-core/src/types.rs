//! # Domain Types
//!
//! Entity structs and status enums shared across the workspace.
//!
//! ## Entity Relationships
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │  Session (one per register location while not CLOSED)               │
//! │     │                                                               │
//! │     │ 1:N                                                          │
//! │     ▼                                                               │
//! │  Transaction ──── 1:N ────▶ TransactionLine (snapshot of cart line) │
//! │     │                                                               │
//! │     │ 1:N                                                          │
//! │     ▼                                                               │
//! │  Payment (one row per tender; metadata fields vary by method)       │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lines are SNAPSHOTS: code, name, price and tax are copied from the
//! cart at commit time, so later catalog edits never rewrite history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::Money;
use crate::vat::VatRate;

// =============================================================================
// Status Enums
// =============================================================================

/// Transaction lifecycle status.
///
/// ```text
/// InProgress ──▶ PendingPayment ──▶ Completed
///                      │                │
///                      └────▶ Voided ◀──┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    InProgress,
    PendingPayment,
    Completed,
    Voided,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionStatus::InProgress => "in_progress",
            TransactionStatus::PendingPayment => "pending_payment",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Voided => "voided",
        };
        write!(f, "{s}")
    }
}

impl FromStr for TransactionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(TransactionStatus::InProgress),
            "pending_payment" => Ok(TransactionStatus::PendingPayment),
            "completed" => Ok(TransactionStatus::Completed),
            "voided" => Ok(TransactionStatus::Voided),
            other => Err(ValidationError::InvalidFormat {
                field: "transaction_status".to_string(),
                reason: format!("unknown status '{other}'"),
            }),
        }
    }
}

/// How much of the transaction total has been settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
    Refunded,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        };
        write!(f, "{s}")
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "partial" => Ok(PaymentStatus::Partial),
            "paid" => Ok(PaymentStatus::Paid),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(ValidationError::InvalidFormat {
                field: "payment_status".to_string(),
                reason: format!("unknown status '{other}'"),
            }),
        }
    }
}

/// Tender type of a single payment row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
    Voucher,
    Credit,
}

impl PaymentMethod {
    /// All methods, in Z-report display order.
    pub const ALL: [PaymentMethod; 5] = [
        PaymentMethod::Cash,
        PaymentMethod::Card,
        PaymentMethod::Transfer,
        PaymentMethod::Voucher,
        PaymentMethod::Credit,
    ];
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Voucher => "voucher",
            PaymentMethod::Credit => "credit",
        };
        write!(f, "{s}")
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "transfer" => Ok(PaymentMethod::Transfer),
            "voucher" => Ok(PaymentMethod::Voucher),
            "credit" => Ok(PaymentMethod::Credit),
            other => Err(ValidationError::InvalidFormat {
                field: "payment_method".to_string(),
                reason: format!("unknown method '{other}'"),
            }),
        }
    }
}

/// Cash-register session lifecycle status.
///
/// ```text
/// Open ◀──────▶ Suspended
///   │
///   ▼ (close, nonzero variance)
/// PendingApproval ── approve ──▶ Closed
///   │
///   └── reject ──▶ Open (recount)
/// ```
/// A close with zero variance goes straight to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Open,
    Suspended,
    PendingApproval,
    Closed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Open => "open",
            SessionStatus::Suspended => "suspended",
            SessionStatus::PendingApproval => "pending_approval",
            SessionStatus::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

impl FromStr for SessionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(SessionStatus::Open),
            "suspended" => Ok(SessionStatus::Suspended),
            "pending_approval" => Ok(SessionStatus::PendingApproval),
            "closed" => Ok(SessionStatus::Closed),
            other => Err(ValidationError::InvalidFormat {
                field: "session_status".to_string(),
                reason: format!("unknown status '{other}'"),
            }),
        }
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A committed sale.
///
/// Monetary fields are frozen copies of the cart totals at commit time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub tenant_id: String,
    pub session_id: String,
    pub receipt_number: String,
    pub status: TransactionStatus,
    pub payment_status: PaymentStatus,
    pub subtotal: Money,
    pub tax_total: Money,
    pub discount_total: Money,
    pub total: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub voided_at: Option<DateTime<Utc>>,
}

/// Snapshot of one cart line inside a committed transaction.
///
/// `inventory_deducted` marks whether the stock deduction for this line
/// has already run; completion retries skip lines with the flag set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionLine {
    pub id: String,
    pub transaction_id: String,
    pub product_id: String,
    pub product_code: String,
    pub product_name: String,
    pub warehouse_id: String,
    pub quantity: Decimal,
    pub unit_price: Money,
    pub vat_rate: VatRate,
    pub discount_percent: u8,
    pub line_subtotal: Money,
    pub line_tax: Money,
    pub line_total: Money,
    pub inventory_deducted: bool,
}

// =============================================================================
// Payment
// =============================================================================

/// One tender applied to a transaction.
///
/// Metadata fields are per-method: cash fills tendered/change, card fills
/// the gateway trio, transfer fills reference, voucher fills voucher_code.
/// Fields that do not apply stay `None` rather than holding sentinels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub transaction_id: String,
    pub session_id: String,
    pub method: PaymentMethod,
    pub amount: Money,

    // Cash
    pub tendered: Option<Money>,
    pub change_given: Option<Money>,

    // Card
    pub gateway_txn_id: Option<String>,
    pub card_last_four: Option<String>,
    pub card_brand: Option<String>,

    // Transfer
    pub reference: Option<String>,

    // Voucher
    pub voucher_code: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// A payment row with all metadata fields empty.
    pub fn new(
        transaction_id: impl Into<String>,
        session_id: impl Into<String>,
        method: PaymentMethod,
        amount: Money,
        now: DateTime<Utc>,
    ) -> Self {
        Payment {
            id: uuid::Uuid::new_v4().to_string(),
            transaction_id: transaction_id.into(),
            session_id: session_id.into(),
            method,
            amount,
            tendered: None,
            change_given: None,
            gateway_txn_id: None,
            card_last_four: None,
            card_brand: None,
            reference: None,
            voucher_code: None,
            created_at: now,
        }
    }
}

// =============================================================================
// Session
// =============================================================================

/// A cash-register session at one location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub tenant_id: String,
    pub location_id: String,
    /// Human-readable number, `KASSZA-YYYY-NNNN`.
    pub session_number: String,
    pub status: SessionStatus,
    pub opening_balance: Money,
    pub closing_balance: Option<Money>,
    pub expected_balance: Option<Money>,
    pub variance: Option<Money>,
    pub variance_note: Option<String>,
    pub opened_by: String,
    pub opened_at: DateTime<Utc>,
    pub closed_by: Option<String>,
    pub closed_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text_round_trips() {
        for status in [
            TransactionStatus::InProgress,
            TransactionStatus::PendingPayment,
            TransactionStatus::Completed,
            TransactionStatus::Voided,
        ] {
            assert_eq!(status.to_string().parse::<TransactionStatus>().unwrap(), status);
        }
        for status in [
            SessionStatus::Open,
            SessionStatus::Suspended,
            SessionStatus::PendingApproval,
            SessionStatus::Closed,
        ] {
            assert_eq!(status.to_string().parse::<SessionStatus>().unwrap(), status);
        }
        for method in PaymentMethod::ALL {
            assert_eq!(method.to_string().parse::<PaymentMethod>().unwrap(), method);
        }
    }

    #[test]
    fn test_unknown_status_text_rejected() {
        assert!("finished".parse::<TransactionStatus>().is_err());
        assert!("reopened".parse::<SessionStatus>().is_err());
        assert!("cheque".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_payment_new_leaves_metadata_empty() {
        let p = Payment::new("txn-1", "sess-1", PaymentMethod::Card, Money::from_minor(500), Utc::now());
        assert!(p.tendered.is_none());
        assert!(p.gateway_txn_id.is_none());
        assert!(p.voucher_code.is_none());
        assert_eq!(p.amount.minor(), 500);
    }
}
