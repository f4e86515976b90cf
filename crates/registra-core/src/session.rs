//! # Session Rules
//!
//! Pure rules for the cash-register session state machine. The engine's
//! `SessionManager` enforces these before touching any repository, and
//! the Z-report reuses the same expected-balance formula, so the two
//! can never disagree about drawer math.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │          ┌── suspend ──▶ Suspended ── resume ──┐                    │
//! │          │                                     │                    │
//! │   ┌──────┴─────┐ ◀──────────────────────────────┘                   │
//! │   │    Open    │                                                    │
//! │   └──────┬─────┘ ◀───────────── reject (recount) ──┐                │
//! │          │ close                                   │                │
//! │          ├── variance == 0 ──────────▶ Closed      │                │
//! │          └── variance != 0 ──▶ PendingApproval ────┤                │
//! │                                        │           │                │
//! │                                        └ approve ─▶ Closed          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Session, SessionStatus};

// =============================================================================
// Session Numbers
// =============================================================================

/// Formats a human-readable session number, `KASSZA-YYYY-NNNN`.
///
/// The sequence restarts at 1 each year per tenant; the repository
/// hands out the next sequence value.
pub fn format_session_number(year: i32, sequence: u32) -> String {
    format!("KASSZA-{year}-{sequence:04}")
}

// =============================================================================
// Transition Guards
// =============================================================================

/// Suspend is only legal from Open.
pub fn ensure_can_suspend(session: &Session) -> CoreResult<()> {
    ensure_status(session, SessionStatus::Open, "suspend")
}

/// Resume is only legal from Suspended.
pub fn ensure_can_resume(session: &Session) -> CoreResult<()> {
    ensure_status(session, SessionStatus::Suspended, "resume")
}

/// Close is only legal from Open (a suspended register is resumed first).
pub fn ensure_can_close(session: &Session) -> CoreResult<()> {
    ensure_status(session, SessionStatus::Open, "close")
}

/// Variance review (approve or reject) requires a pending close.
pub fn ensure_can_review(session: &Session, attempted: &str) -> CoreResult<()> {
    ensure_status(session, SessionStatus::PendingApproval, attempted)
}

fn ensure_status(session: &Session, required: SessionStatus, attempted: &str) -> CoreResult<()> {
    if session.status != required {
        return Err(CoreError::InvalidSessionState {
            session_number: session.session_number.clone(),
            current: session.status,
            attempted: attempted.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Close Math
// =============================================================================

/// What a drawer should hold at close time.
///
/// Card, transfer and voucher tenders never enter the drawer; only the
/// opening float and cash tenders do.
pub fn expected_balance(opening_balance: Money, cash_payments_total: Money) -> Money {
    opening_balance + cash_payments_total
}

/// Result of the pure close computation.
#[derive(Debug, Clone, Serialize)]
pub struct CloseOutcome {
    pub expected_balance: Money,
    pub variance: Money,
    /// `Closed` on an exact count, `PendingApproval` otherwise.
    pub next_status: SessionStatus,
}

/// Computes the close outcome for a counted drawer.
///
/// `variance = closing_balance − expected_balance`. A nonzero variance
/// without a (non-blank) note is rejected; with a note the session
/// parks in PendingApproval for manager review.
pub fn compute_close(
    session: &Session,
    cash_payments_total: Money,
    closing_balance: Money,
    variance_note: Option<&str>,
) -> CoreResult<CloseOutcome> {
    ensure_can_close(session)?;

    let expected = expected_balance(session.opening_balance, cash_payments_total);
    let variance = closing_balance - expected;

    let has_note = variance_note.is_some_and(|n| !n.trim().is_empty());
    if !variance.is_zero() && !has_note {
        return Err(CoreError::VarianceNoteRequired {
            session_number: session.session_number.clone(),
            variance: variance.minor(),
        });
    }

    let next_status = if variance.is_zero() {
        SessionStatus::Closed
    } else {
        SessionStatus::PendingApproval
    };

    Ok(CloseOutcome {
        expected_balance: expected,
        variance,
        next_status,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
