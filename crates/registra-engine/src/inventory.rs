//! # Inventory Service
//!
//! Seam to the stock-keeping system. Deductions run AFTER payment is
//! settled, per line, best effort: a failed line never rolls back the
//! completed payment, it is reported back to the caller and retried on
//! the next completion attempt (lines carry an `inventory_deducted`
//! flag for idempotency).

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

/// Result of a single stock deduction.
#[derive(Debug, Clone)]
pub struct StockDeduction {
    /// Quantity remaining in the warehouse after the deduction.
    pub new_quantity: Decimal,
}

/// Inventory collaborator failures.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("Product {product_id} not stocked in warehouse {warehouse_id}")]
    NotStocked {
        product_id: String,
        warehouse_id: String,
    },

    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: String,
        requested: Decimal,
        available: Decimal,
    },

    #[error("Inventory service unavailable: {0}")]
    Unavailable(String),
}

/// Stock-keeping system.
#[async_trait]
pub trait InventoryService: Send + Sync {
    /// Deducts stock for one sold line.
    ///
    /// `reference` is the transaction id, so the stock ledger can link
    /// the movement back to the sale.
    async fn deduct_stock(
        &self,
        product_id: &str,
        warehouse_id: &str,
        quantity: Decimal,
        reference: &str,
        tenant_id: &str,
    ) -> Result<StockDeduction, InventoryError>;
}

/// Per-line outcome of the deduction pass, returned to the caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineDeductionOutcome {
    pub line_id: String,
    pub product_id: String,
    pub deducted: bool,
    /// Failure message for lines that did not deduct.
    pub error: Option<String>,
}

/// Summary of a completion's deduction pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeductionReport {
    pub outcomes: Vec<LineDeductionOutcome>,
    pub all_deductions_successful: bool,
}
