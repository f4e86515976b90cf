//! # Z-Report
//!
//! Pure aggregation of a session's transactions and payments into a
//! reconciliation report, plus a deterministic plain-text rendering.
//!
//! The report is DERIVED, never persisted: regenerating it from the
//! same rows always yields the same value, whether the session is
//! still open (live preview) or already closed.

use serde::Serialize;

use crate::money::Money;
use crate::session::expected_balance;
use crate::types::{
    Payment, PaymentMethod, Session, SessionStatus, Transaction, TransactionStatus,
};

// =============================================================================
// Report Types
// =============================================================================

/// Per-payment-method totals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodBreakdown {
    pub method: PaymentMethod,
    pub count: usize,
    pub amount: Money,
}

/// Drawer reconciliation block.
///
/// `closing_balance` and `variance` stay `None` on a live preview of a
/// session that has not been counted yet.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    pub opening_balance: Money,
    pub cash_total: Money,
    pub expected_balance: Money,
    pub closing_balance: Option<Money>,
    pub variance: Option<Money>,
    pub variance_note: Option<String>,
}

/// The end-of-session reconciliation report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZReport {
    pub session_id: String,
    pub session_number: String,
    pub location_id: String,
    pub session_status: SessionStatus,

    /// Sum of completed, fully paid transaction totals.
    pub gross_sales: Money,
    pub tax_total: Money,
    /// Gross minus tax.
    pub net_sales: Money,
    pub discount_total: Money,
    /// Sum of voided transaction totals.
    pub refund_total: Money,

    pub transactions_completed: usize,
    pub transactions_voided: usize,

    /// One entry per method that saw at least one payment, in fixed
    /// display order.
    pub payment_breakdown: Vec<MethodBreakdown>,
    pub reconciliation: Reconciliation,
}

/// Header block for rendered reports.
#[derive(Debug, Clone, Serialize)]
pub struct CompanyInfo {
    pub name: String,
    pub tax_number: String,
    pub address: String,
}

// =============================================================================
// Aggregation
// =============================================================================

/// Builds the Z-report from a session and its raw rows.
///
/// Only Completed transactions with payment status Paid count toward
/// sales; Voided transactions count toward the refund total. Payments
/// of voided transactions have already been deleted by the refund
/// path, so every payment row given here is live tender.
pub fn build_z_report(
    session: &Session,
    transactions: &[Transaction],
    payments: &[Payment],
) -> ZReport {
    let mut gross_sales = Money::zero();
    let mut tax_total = Money::zero();
    let mut discount_total = Money::zero();
    let mut refund_total = Money::zero();
    let mut completed = 0usize;
    let mut voided = 0usize;

    for txn in transactions {
        match txn.status {
            TransactionStatus::Completed
                if txn.payment_status == crate::types::PaymentStatus::Paid =>
            {
                gross_sales += txn.total;
                tax_total += txn.tax_total;
                discount_total += txn.discount_total;
                completed += 1;
            }
            TransactionStatus::Voided => {
                refund_total += txn.total;
                voided += 1;
            }
            _ => {}
        }
    }

    let payment_breakdown: Vec<MethodBreakdown> = PaymentMethod::ALL
        .iter()
        .filter_map(|&method| {
            let rows: Vec<&Payment> = payments.iter().filter(|p| p.method == method).collect();
            if rows.is_empty() {
                return None;
            }
            Some(MethodBreakdown {
                method,
                count: rows.len(),
                amount: rows.iter().map(|p| p.amount).sum(),
            })
        })
        .collect();

    let cash_total = payments
        .iter()
        .filter(|p| p.method == PaymentMethod::Cash)
        .map(|p| p.amount)
        .sum();

    ZReport {
        session_id: session.id.clone(),
        session_number: session.session_number.clone(),
        location_id: session.location_id.clone(),
        session_status: session.status,
        gross_sales,
        tax_total,
        net_sales: gross_sales - tax_total,
        discount_total,
        refund_total,
        transactions_completed: completed,
        transactions_voided: voided,
        payment_breakdown,
        reconciliation: Reconciliation {
            opening_balance: session.opening_balance,
            cash_total,
            expected_balance: expected_balance(session.opening_balance, cash_total),
            closing_balance: session.closing_balance,
            variance: session.variance,
            variance_note: session.variance_note.clone(),
        },
    }
}

// =============================================================================
// Text Rendering
// =============================================================================

const LINE_WIDTH: usize = 42;

/// Renders the report as fixed-width plain text.
///
/// Used for receipt-printer output and as the export fallback when no
/// PDF renderer is configured. Same report in, same string out.
pub fn render_text(report: &ZReport, company: &CompanyInfo) -> String {
    let mut out = String::new();
    let rule = "=".repeat(LINE_WIDTH);
    let thin = "-".repeat(LINE_WIDTH);

    out.push_str(&format!("{:^LINE_WIDTH$}\n", company.name));
    out.push_str(&format!("{:^LINE_WIDTH$}\n", company.address));
    out.push_str(&format!(
        "{:^LINE_WIDTH$}\n",
        format!("Tax no: {}", company.tax_number)
    ));
    out.push_str(&rule);
    out.push_str(&format!("\n{:^LINE_WIDTH$}\n", "Z-REPORT"));
    out.push_str(&format!(
        "{:^LINE_WIDTH$}\n",
        format!("Session {}", report.session_number)
    ));
    out.push_str(&format!(
        "{:^LINE_WIDTH$}\n",
        format!("Location {} ({})", report.location_id, report.session_status)
    ));
    out.push_str(&rule);
    out.push('\n');

    push_row(&mut out, "Gross sales", report.gross_sales);
    push_row(&mut out, "Tax total", report.tax_total);
    push_row(&mut out, "Net sales", report.net_sales);
    push_row(&mut out, "Discounts", report.discount_total);
    push_row(&mut out, "Refunds (voided)", report.refund_total);
    out.push_str(&format!(
        "{:<30}{:>12}\n",
        "Completed txns", report.transactions_completed
    ));
    out.push_str(&format!(
        "{:<30}{:>12}\n",
        "Voided txns", report.transactions_voided
    ));

    out.push_str(&thin);
    out.push_str(&format!("\n{:^LINE_WIDTH$}\n", "PAYMENTS"));
    if report.payment_breakdown.is_empty() {
        out.push_str(&format!("{:^LINE_WIDTH$}\n", "(none)"));
    }
    for entry in &report.payment_breakdown {
        out.push_str(&format!(
            "{:<20}{:>10}{:>12}\n",
            entry.method.to_string(),
            entry.count,
            entry.amount
        ));
    }

    out.push_str(&thin);
    out.push_str(&format!("\n{:^LINE_WIDTH$}\n", "DRAWER"));
    push_row(&mut out, "Opening balance", report.reconciliation.opening_balance);
    push_row(&mut out, "Cash received", report.reconciliation.cash_total);
    push_row(&mut out, "Expected", report.reconciliation.expected_balance);
    match report.reconciliation.closing_balance {
        Some(closing) => push_row(&mut out, "Counted", closing),
        None => out.push_str(&format!("{:<30}{:>12}\n", "Counted", "-")),
    }
    match report.reconciliation.variance {
        Some(variance) => push_row(&mut out, "Variance", variance),
        None => out.push_str(&format!("{:<30}{:>12}\n", "Variance", "-")),
    }
    if let Some(note) = &report.reconciliation.variance_note {
        out.push_str(&format!("Note: {note}\n"));
    }
    out.push_str(&rule);
    out.push('\n');
    out
}

fn push_row(out: &mut String, label: &str, amount: Money) {
    out.push_str(&format!("{label:<30}{:>12}\n", amount.minor()));
}

// =============================================================================
// Unit Tests
// =============================================================================
