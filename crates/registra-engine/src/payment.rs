//! # Payment Processor
//!
//! Settlement of committed transactions.
//!
//! ## Settlement Paths
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  CASH   received >= remaining, payment row records the remaining    │
//! │         amount only; change goes back to the customer, never into   │
//! │         the books as a liability.                                   │
//! │                                                                     │
//! │  CARD   full remaining amount to the gateway; NO row is written on  │
//! │         a declined/failed charge.                                   │
//! │                                                                     │
//! │  MIXED  add_partial_payment per tender, overpayment rejected; the   │
//! │         tender that reaches the total triggers completion.          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Completion runs the inventory-deduction saga: best effort per line,
//! a failed line never rolls the payment back, and lines carry an
//! `inventory_deducted` flag so a retry only touches what is missing.
//!
//! All payment operations on one transaction run under that
//! transaction's lock; two cashiers cannot both spend the same
//! remaining balance. Every payment also checks the owning session:
//! once its drawer is closed (or pending approval) no money can land
//! in it, otherwise the reconciled cash totals would drift after the
//! fact.

use std::sync::Arc;

use chrono::Utc;
use registra_core::{
    CoreError, Money, Payment, PaymentMethod, PaymentStatus, SessionStatus, Transaction,
    TransactionStatus, ValidationError, validation,
};
use serde_json::json;
use tracing::{info, warn};

use crate::audit::{self, AuditEntry, AuditLog};
use crate::error::{EngineError, EngineResult, RepoError};
use crate::gateway::CardGateway;
use crate::inventory::{DeductionReport, InventoryService, LineDeductionOutcome};
use crate::locks::LockRegistry;
use crate::repository::{PaymentRepository, SessionRepository, TransactionRepository};

// =============================================================================
// Outcomes
// =============================================================================

/// Result of a settling payment (cash or card).
#[derive(Debug)]
pub struct SettlementOutcome {
    pub transaction: Transaction,
    pub payment: Payment,
    /// Change due back to the customer; zero for card.
    pub change: Money,
    pub deductions: DeductionReport,
}

/// Result of a partial tender.
#[derive(Debug)]
pub struct PartialOutcome {
    pub transaction: Transaction,
    pub payment: Payment,
    /// Balance still owed after this tender.
    pub remaining: Money,
    /// Present when this tender settled the transaction.
    pub deductions: Option<DeductionReport>,
}

/// One tender of a mixed payment.
#[derive(Debug, Clone)]
pub struct TenderInput {
    pub method: PaymentMethod,
    pub amount: Money,
    /// Transfer reference, when method is Transfer.
    pub reference: Option<String>,
    /// Voucher code, when method is Voucher.
    pub voucher_code: Option<String>,
}

// =============================================================================
// Processor
// =============================================================================

pub struct PaymentProcessor {
    sessions: Arc<dyn SessionRepository>,
    transactions: Arc<dyn TransactionRepository>,
    payments: Arc<dyn PaymentRepository>,
    gateway: Arc<dyn CardGateway>,
    inventory: Arc<dyn InventoryService>,
    audit: Arc<dyn AuditLog>,
    locks: Arc<LockRegistry>,
    currency: String,
}

impl PaymentProcessor {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        transactions: Arc<dyn TransactionRepository>,
        payments: Arc<dyn PaymentRepository>,
        gateway: Arc<dyn CardGateway>,
        inventory: Arc<dyn InventoryService>,
        audit: Arc<dyn AuditLog>,
        locks: Arc<LockRegistry>,
        currency: impl Into<String>,
    ) -> Self {
        PaymentProcessor {
            sessions,
            transactions,
            payments,
            gateway,
            inventory,
            audit,
            locks,
            currency: currency.into(),
        }
    }

    /// Settles the full remaining balance with cash.
    ///
    /// The payment row records the remaining amount; `tendered` and
    /// `change_given` keep what actually crossed the counter.
    pub async fn process_cash_payment(
        &self,
        transaction_id: &str,
        received: Money,
        actor: &str,
    ) -> EngineResult<SettlementOutcome> {
        validation::validate_received_amount(received)?;
        let _guard = self.locks.acquire(transaction_id).await;

        let transaction = self.fetch(transaction_id).await?;
        self.ensure_payable(&transaction).await?;

        let remaining = self.remaining(&transaction).await?;
        if received < remaining {
            return Err(EngineError::InsufficientCash {
                transaction_id: transaction_id.to_string(),
                received: received.minor(),
                remaining: remaining.minor(),
            });
        }
        let change = received - remaining;

        let mut payment = Payment::new(
            transaction_id,
            &transaction.session_id,
            PaymentMethod::Cash,
            remaining,
            Utc::now(),
        );
        payment.tendered = Some(received);
        payment.change_given = Some(change);
        self.payments.insert(&payment).await?;

        info!(
            transaction_id = %transaction_id,
            amount = remaining.minor(),
            tendered = received.minor(),
            change = change.minor(),
            "Cash payment recorded"
        );
        self.record(&transaction, "payment.cash", actor, json!({
            "amount": remaining.minor(),
            "tendered": received.minor(),
            "change": change.minor(),
        }))
        .await;

        let (transaction, deductions) = self.finish(transaction, actor).await?;
        Ok(SettlementOutcome {
            transaction,
            payment,
            change,
            deductions,
        })
    }

    /// Settles the full remaining balance through the card gateway.
    ///
    /// A gateway failure surfaces as-is and leaves no payment row; the
    /// transaction stays payable.
    pub async fn process_card_payment(
        &self,
        transaction_id: &str,
        actor: &str,
    ) -> EngineResult<SettlementOutcome> {
        let _guard = self.locks.acquire(transaction_id).await;

        let transaction = self.fetch(transaction_id).await?;
        self.ensure_payable(&transaction).await?;
        let remaining = self.remaining(&transaction).await?;

        let charge = self
            .gateway
            .charge(remaining, &self.currency, &transaction.receipt_number)
            .await?;

        let mut payment = Payment::new(
            transaction_id,
            &transaction.session_id,
            PaymentMethod::Card,
            remaining,
            Utc::now(),
        );
        payment.gateway_txn_id = Some(charge.gateway_txn_id.clone());
        payment.card_last_four = Some(charge.card_last_four);
        payment.card_brand = Some(charge.card_brand);
        self.payments.insert(&payment).await?;

        info!(
            transaction_id = %transaction_id,
            amount = remaining.minor(),
            gateway_txn_id = %charge.gateway_txn_id,
            "Card payment recorded"
        );
        self.record(&transaction, "payment.card", actor, json!({
            "amount": remaining.minor(),
            "gateway_txn_id": charge.gateway_txn_id,
        }))
        .await;

        let (transaction, deductions) = self.finish(transaction, actor).await?;
        Ok(SettlementOutcome {
            transaction,
            payment,
            change: Money::zero(),
            deductions,
        })
    }

    /// Records one tender of a mixed payment.
    ///
    /// The tender must not exceed the remaining balance; the tender
    /// that brings the balance to exactly zero settles the transaction.
    /// Card tenders are rejected here: a card row without a gateway
    /// charge could never be refunded, so cards always go through
    /// [`process_card_payment`](Self::process_card_payment).
    pub async fn add_partial_payment(
        &self,
        transaction_id: &str,
        tender: TenderInput,
        actor: &str,
    ) -> EngineResult<PartialOutcome> {
        validation::validate_received_amount(tender.amount)?;
        if tender.method == PaymentMethod::Card {
            return Err(ValidationError::NotAllowed {
                field: "method".to_string(),
                allowed: vec![
                    "cash".to_string(),
                    "transfer".to_string(),
                    "voucher".to_string(),
                    "credit".to_string(),
                ],
            }
            .into());
        }
        let _guard = self.locks.acquire(transaction_id).await;

        let mut transaction = self.fetch(transaction_id).await?;
        self.ensure_payable(&transaction).await?;

        let remaining = self.remaining(&transaction).await?;
        if tender.amount > remaining {
            return Err(EngineError::Overpayment {
                transaction_id: transaction_id.to_string(),
                amount: tender.amount.minor(),
                remaining: remaining.minor(),
            });
        }

        let mut payment = Payment::new(
            transaction_id,
            &transaction.session_id,
            tender.method,
            tender.amount,
            Utc::now(),
        );
        match tender.method {
            PaymentMethod::Cash => {
                payment.tendered = Some(tender.amount);
                payment.change_given = Some(Money::zero());
            }
            PaymentMethod::Transfer => payment.reference = tender.reference,
            PaymentMethod::Voucher => payment.voucher_code = tender.voucher_code,
            PaymentMethod::Card | PaymentMethod::Credit => {}
        }
        self.payments.insert(&payment).await?;

        let still_owed = remaining - tender.amount;
        info!(
            transaction_id = %transaction_id,
            method = %tender.method,
            amount = tender.amount.minor(),
            remaining = still_owed.minor(),
            "Partial payment recorded"
        );
        self.record(&transaction, "payment.partial", actor, json!({
            "method": tender.method.to_string(),
            "amount": tender.amount.minor(),
            "remaining": still_owed.minor(),
        }))
        .await;

        if still_owed.is_zero() {
            let (settled, deductions) = self.finish(transaction, actor).await?;
            return Ok(PartialOutcome {
                transaction: settled,
                payment,
                remaining: Money::zero(),
                deductions: Some(deductions),
            });
        }

        transaction.payment_status = PaymentStatus::Partial;
        transaction.updated_at = Utc::now();
        self.transactions.update(&transaction).await?;
        Ok(PartialOutcome {
            transaction,
            payment,
            remaining: still_owed,
            deductions: None,
        })
    }

    /// Marks a fully paid transaction completed and runs the stock
    /// deduction pass.
    ///
    /// Safe to retry: an already completed transaction only re-runs
    /// the pass, and the pass skips lines whose flag is already set.
    pub async fn complete_payment(
        &self,
        transaction_id: &str,
        actor: &str,
    ) -> EngineResult<(Transaction, DeductionReport)> {
        let _guard = self.locks.acquire(transaction_id).await;
        let transaction = self.fetch(transaction_id).await?;

        if transaction.status == TransactionStatus::Completed {
            let deductions = self.deduct_lines(&transaction).await?;
            return Ok((transaction, deductions));
        }

        self.ensure_payable(&transaction).await?;
        let remaining = self.remaining(&transaction).await?;
        if !remaining.is_zero() {
            return Err(CoreError::InvalidPaymentState {
                transaction_id: transaction_id.to_string(),
                current: transaction.payment_status,
                attempted: format!("complete with {} outstanding", remaining.minor()),
            }
            .into());
        }
        self.finish(transaction, actor).await
    }

    /// Voids a transaction and refunds its payments.
    ///
    /// Legal from PendingPayment (abandoned sale) or Completed (return
    /// at the counter). If a refund fails the transaction stays Voided
    /// and `refund_payments` can be retried on its own.
    pub async fn void_transaction(
        &self,
        transaction_id: &str,
        actor: &str,
    ) -> EngineResult<Transaction> {
        let _guard = self.locks.acquire(transaction_id).await;

        let mut transaction = self.fetch(transaction_id).await?;
        if !matches!(
            transaction.status,
            TransactionStatus::PendingPayment | TransactionStatus::Completed
        ) {
            return Err(CoreError::InvalidTransactionState {
                transaction_id: transaction_id.to_string(),
                current: transaction.status,
                attempted: "void".to_string(),
            }
            .into());
        }

        let before = transaction.status;
        transaction.status = TransactionStatus::Voided;
        transaction.voided_at = Some(Utc::now());
        transaction.updated_at = Utc::now();
        self.transactions.update(&transaction).await?;

        info!(
            transaction_id = %transaction_id,
            before = %before,
            "Transaction voided"
        );
        self.record(&transaction, "transaction.void", actor, json!({
            "before": before.to_string(),
        }))
        .await;

        self.refund_locked(transaction, actor).await
    }

    /// Refunds and deletes all payments of a voided transaction.
    ///
    /// All-or-nothing: gateway refunds run first and a failure aborts
    /// before any row is deleted, naming the payment that failed.
    pub async fn refund_payments(
        &self,
        transaction_id: &str,
        actor: &str,
    ) -> EngineResult<Transaction> {
        let _guard = self.locks.acquire(transaction_id).await;
        let transaction = self.fetch(transaction_id).await?;
        self.refund_locked(transaction, actor).await
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    async fn fetch(&self, transaction_id: &str) -> EngineResult<Transaction> {
        self.transactions
            .find_by_id(transaction_id)
            .await?
            .ok_or_else(|| RepoError::not_found("Transaction", transaction_id).into())
    }

    /// The transaction must await payment and its session's drawer
    /// must still be taking money (Open or Suspended).
    async fn ensure_payable(&self, transaction: &Transaction) -> EngineResult<()> {
        if transaction.status != TransactionStatus::PendingPayment {
            return Err(CoreError::InvalidTransactionState {
                transaction_id: transaction.id.clone(),
                current: transaction.status,
                attempted: "accept payment".to_string(),
            }
            .into());
        }

        let session = self
            .sessions
            .find_by_id(&transaction.session_id)
            .await?
            .ok_or_else(|| RepoError::not_found("Session", &transaction.session_id))?;
        if !matches!(
            session.status,
            SessionStatus::Open | SessionStatus::Suspended
        ) {
            return Err(CoreError::InvalidSessionState {
                session_number: session.session_number,
                current: session.status,
                attempted: "accept payment".to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn remaining(&self, transaction: &Transaction) -> EngineResult<Money> {
        let paid = self.payments.sum_by_transaction(&transaction.id).await?;
        Ok(transaction.total - paid)
    }

    /// Marks the transaction paid and completed, then runs deductions.
    async fn finish(
        &self,
        mut transaction: Transaction,
        actor: &str,
    ) -> EngineResult<(Transaction, DeductionReport)> {
        let now = Utc::now();
        transaction.status = TransactionStatus::Completed;
        transaction.payment_status = PaymentStatus::Paid;
        transaction.completed_at = Some(now);
        transaction.updated_at = now;
        self.transactions.update(&transaction).await?;

        info!(
            transaction_id = %transaction.id,
            receipt_number = %transaction.receipt_number,
            total = transaction.total.minor(),
            "Transaction completed"
        );
        self.record(&transaction, "transaction.complete", actor, json!({
            "total": transaction.total.minor(),
        }))
        .await;

        let deductions = self.deduct_lines(&transaction).await?;
        Ok((transaction, deductions))
    }

    /// Best-effort stock deduction pass over undeducted lines.
    async fn deduct_lines(&self, transaction: &Transaction) -> EngineResult<DeductionReport> {
        let lines = self.transactions.find_lines(&transaction.id).await?;
        let mut outcomes = Vec::with_capacity(lines.len());
        let mut all_ok = true;

        for line in &lines {
            if line.inventory_deducted {
                outcomes.push(LineDeductionOutcome {
                    line_id: line.id.clone(),
                    product_id: line.product_id.clone(),
                    deducted: true,
                    error: None,
                });
                continue;
            }

            match self
                .inventory
                .deduct_stock(
                    &line.product_id,
                    &line.warehouse_id,
                    line.quantity,
                    &transaction.id,
                    &transaction.tenant_id,
                )
                .await
            {
                Ok(_) => {
                    self.transactions.mark_line_deducted(&line.id).await?;
                    outcomes.push(LineDeductionOutcome {
                        line_id: line.id.clone(),
                        product_id: line.product_id.clone(),
                        deducted: true,
                        error: None,
                    });
                }
                Err(err) => {
                    warn!(
                        transaction_id = %transaction.id,
                        line_id = %line.id,
                        product_id = %line.product_id,
                        error = %err,
                        "Stock deduction failed, will retry on next completion"
                    );
                    all_ok = false;
                    outcomes.push(LineDeductionOutcome {
                        line_id: line.id.clone(),
                        product_id: line.product_id.clone(),
                        deducted: false,
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        Ok(DeductionReport {
            outcomes,
            all_deductions_successful: all_ok,
        })
    }

    /// Refund body, caller holds the transaction lock.
    async fn refund_locked(
        &self,
        mut transaction: Transaction,
        actor: &str,
    ) -> EngineResult<Transaction> {
        if transaction.status != TransactionStatus::Voided {
            return Err(CoreError::InvalidTransactionState {
                transaction_id: transaction.id.clone(),
                current: transaction.status,
                attempted: "refund".to_string(),
            }
            .into());
        }

        let payments = self.payments.find_by_transaction(&transaction.id).await?;

        // Gateway reversals first; nothing is deleted until all pass.
        for payment in &payments {
            if payment.method == PaymentMethod::Card {
                let gateway_txn_id = payment.gateway_txn_id.as_deref().ok_or_else(|| {
                    EngineError::RefundFailed {
                        payment_id: payment.id.clone(),
                        reason: "card payment has no gateway transaction id".to_string(),
                    }
                })?;
                self.gateway.refund(gateway_txn_id).await.map_err(|err| {
                    EngineError::RefundFailed {
                        payment_id: payment.id.clone(),
                        reason: err.to_string(),
                    }
                })?;
            }
        }

        self.payments.delete_by_transaction(&transaction.id).await?;
        transaction.payment_status = PaymentStatus::Refunded;
        transaction.updated_at = Utc::now();
        self.transactions.update(&transaction).await?;

        info!(
            transaction_id = %transaction.id,
            refunded_payments = payments.len(),
            "Payments refunded"
        );
        self.record(&transaction, "payment.refund", actor, json!({
            "refunded_payments": payments.len(),
        }))
        .await;
        Ok(transaction)
    }

    async fn record(
        &self,
        transaction: &Transaction,
        action: &str,
        actor: &str,
        metadata: serde_json::Value,
    ) {
        let entry = AuditEntry::new(
            action,
            "transaction",
            transaction.id.clone(),
            actor,
            transaction.tenant_id.clone(),
            metadata,
        );
        audit::record(self.audit.as_ref(), entry).await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
