//! # Cart
//!
//! Priced line items with derived money fields, recomputed on every
//! mutation.
//!
//! ## Derivation Rules (each field rounded independently)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  gross         = round(quantity × unit_price)                       │
//! │  line_subtotal = round(quantity × unit_price × (1 − discount/100))  │
//! │  line_tax      = line_subtotal.apply_vat(rate)                      │
//! │  line_total    = line_subtotal + line_tax                           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//! Quantity math runs in `Decimal` and rounds half away from zero to
//! integer minor units. Tax is then pure integer math on the already
//! rounded subtotal. Deriving tax from the unrounded product instead
//! would drift from the receipt by a minor unit on some inputs.
//!
//! The cart itself is a plain caller-owned struct. Nothing here is
//! shared or locked; concurrency lives in registra-engine.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{
    PaymentStatus, Transaction, TransactionLine, TransactionStatus,
};
use crate::validation;
use crate::vat::VatRate;
use crate::MAX_CART_LINES;

// =============================================================================
// Line Items
// =============================================================================

/// Input for adding a line to the cart.
#[derive(Debug, Clone, Deserialize)]
pub struct NewLineItem {
    pub product_id: String,
    pub product_code: String,
    pub product_name: String,
    pub quantity: Decimal,
    pub unit_price: Money,
    pub vat_rate: VatRate,
    #[serde(default)]
    pub discount_percent: u8,
}

/// A cart line with its derived money fields.
///
/// The derived fields are never set directly; every mutation goes
/// through [`Cart`], which recomputes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLineItem {
    pub id: String,
    pub product_id: String,
    pub product_code: String,
    pub product_name: String,
    pub quantity: Decimal,
    pub unit_price: Money,
    pub vat_rate: VatRate,
    pub discount_percent: u8,
    pub line_subtotal: Money,
    pub line_tax: Money,
    pub line_total: Money,
}

impl CartLineItem {
    /// Gross line value before discount, rounded to minor units.
    pub fn gross(&self) -> Money {
        round_to_money(self.quantity * Decimal::from(self.unit_price.minor()))
    }

    /// Discount amount actually granted on this line.
    pub fn discount_amount(&self) -> Money {
        self.gross() - self.line_subtotal
    }

    fn recompute(&mut self) {
        let gross = self.quantity * Decimal::from(self.unit_price.minor());
        let keep = Decimal::ONE - Decimal::from(self.discount_percent) / Decimal::from(100);
        self.line_subtotal = round_to_money(gross * keep);
        self.line_tax = self.line_subtotal.apply_vat(self.vat_rate);
        self.line_total = self.line_subtotal + self.line_tax;
    }
}

/// Rounds a decimal minor-unit amount half away from zero.
///
/// Inputs are bounded by validation (quantity and unit price caps), so
/// the rounded value always fits i64.
fn round_to_money(amount: Decimal) -> Money {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    Money::from_minor(rounded.to_i64().unwrap_or(i64::MAX))
}

// =============================================================================
// Cart Totals
// =============================================================================

/// Sums of the per-line derived fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub discount_amount: Money,
    pub total: Money,
}

// =============================================================================
// Cart
// =============================================================================

/// A mutable cart of priced lines.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Cart {
    items: Vec<CartLineItem>,
}

impl Cart {
    pub fn new() -> Self {
        Cart { items: Vec::new() }
    }

    /// Adds a line, validating every priced field first.
    ///
    /// The same product may appear on several lines (e.g. with
    /// different discounts); lines are identified by their own id.
    pub fn add_item(&mut self, item: NewLineItem) -> CoreResult<&CartLineItem> {
        validation::validate_cart_size(self.items.len())?;
        validation::validate_quantity(item.quantity)?;
        validation::validate_unit_price(item.unit_price)?;
        validation::validate_discount_percent(item.discount_percent)?;

        let mut line = CartLineItem {
            id: uuid::Uuid::new_v4().to_string(),
            product_id: item.product_id,
            product_code: item.product_code,
            product_name: item.product_name,
            quantity: item.quantity,
            unit_price: item.unit_price,
            vat_rate: item.vat_rate,
            discount_percent: item.discount_percent,
            line_subtotal: Money::zero(),
            line_tax: Money::zero(),
            line_total: Money::zero(),
        };
        line.recompute();
        self.items.push(line);
        // Just pushed, so last() is always present.
        Ok(&self.items[self.items.len() - 1])
    }

    /// Replaces a line's quantity and recomputes its derived fields.
    pub fn update_quantity(&mut self, line_id: &str, quantity: Decimal) -> CoreResult<&CartLineItem> {
        validation::validate_quantity(quantity)?;
        let line = self.find_mut(line_id)?;
        line.quantity = quantity;
        line.recompute();
        Ok(line)
    }

    /// Replaces a line's discount percent and recomputes its derived fields.
    pub fn update_discount(&mut self, line_id: &str, discount_percent: u8) -> CoreResult<&CartLineItem> {
        validation::validate_discount_percent(discount_percent)?;
        let line = self.find_mut(line_id)?;
        line.discount_percent = discount_percent;
        line.recompute();
        Ok(line)
    }

    /// Removes a line; unknown ids are an error, not a no-op.
    pub fn remove_item(&mut self, line_id: &str) -> CoreResult<()> {
        let pos = self
            .items
            .iter()
            .position(|l| l.id == line_id)
            .ok_or_else(|| CoreError::LineNotFound(line_id.to_string()))?;
        self.items.remove(pos);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Cart totals as sums of the per-line derived fields.
    ///
    /// An empty cart yields all zeros.
    pub fn totals(&self) -> CartTotals {
        let mut totals = CartTotals::default();
        for line in &self.items {
            totals.subtotal += line.line_subtotal;
            totals.tax += line.line_tax;
            totals.discount_amount += line.discount_amount();
            totals.total += line.line_total;
        }
        totals
    }

    /// Freezes the cart into a transaction plus line snapshots.
    ///
    /// The transaction starts in PendingPayment with payment Pending;
    /// line snapshots carry the warehouse for later stock deduction.
    pub fn commit(
        &self,
        tenant_id: impl Into<String>,
        session_id: impl Into<String>,
        receipt_number: impl Into<String>,
        warehouse_id: &str,
        now: chrono::DateTime<chrono::Utc>,
    ) -> CoreResult<(Transaction, Vec<TransactionLine>)> {
        if self.items.is_empty() {
            return Err(CoreError::EmptyCart);
        }

        let totals = self.totals();
        let transaction = Transaction {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: tenant_id.into(),
            session_id: session_id.into(),
            receipt_number: receipt_number.into(),
            status: TransactionStatus::PendingPayment,
            payment_status: PaymentStatus::Pending,
            subtotal: totals.subtotal,
            tax_total: totals.tax,
            discount_total: totals.discount_amount,
            total: totals.total,
            created_at: now,
            updated_at: now,
            completed_at: None,
            voided_at: None,
        };

        let lines = self
            .items
            .iter()
            .map(|l| TransactionLine {
                id: uuid::Uuid::new_v4().to_string(),
                transaction_id: transaction.id.clone(),
                product_id: l.product_id.clone(),
                product_code: l.product_code.clone(),
                product_name: l.product_name.clone(),
                warehouse_id: warehouse_id.to_string(),
                quantity: l.quantity,
                unit_price: l.unit_price,
                vat_rate: l.vat_rate,
                discount_percent: l.discount_percent,
                line_subtotal: l.line_subtotal,
                line_tax: l.line_tax,
                line_total: l.line_total,
                inventory_deducted: false,
            })
            .collect();

        Ok((transaction, lines))
    }

    fn find_mut(&mut self, line_id: &str) -> CoreResult<&mut CartLineItem> {
        self.items
            .iter_mut()
            .find(|l| l.id == line_id)
            .ok_or_else(|| CoreError::LineNotFound(line_id.to_string()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn line(qty: Decimal, price: i64, vat: VatRate, discount: u8) -> NewLineItem {
        NewLineItem {
            product_id: "prod-1".to_string(),
            product_code: "SKU-001".to_string(),
            product_name: "Espresso beans 1kg".to_string(),
            quantity: qty,
            unit_price: Money::from_minor(price),
            vat_rate: vat,
            discount_percent: discount,
        }
    }

    #[test]
    fn test_standard_rate_line() {
        // qty 2 × 10000 at 27%, no discount
        let mut cart = Cart::new();
        let added = cart
            .add_item(line(dec("2"), 10000, VatRate::Standard27, 0))
            .unwrap();

        assert_eq!(added.line_subtotal.minor(), 20000);
        assert_eq!(added.line_tax.minor(), 5400);
        assert_eq!(added.line_total.minor(), 25400);

        let totals = cart.totals();
        assert_eq!(totals.subtotal.minor(), 20000);
        assert_eq!(totals.tax.minor(), 5400);
        assert_eq!(totals.discount_amount.minor(), 0);
        assert_eq!(totals.total.minor(), 25400);
    }

    #[test]
    fn test_empty_cart_totals_are_zero() {
        let totals = Cart::new().totals();
        assert_eq!(totals.subtotal.minor(), 0);
        assert_eq!(totals.tax.minor(), 0);
        assert_eq!(totals.discount_amount.minor(), 0);
        assert_eq!(totals.total.minor(), 0);
    }

    #[test]
    fn test_fractional_quantity_rounds_half_away_from_zero() {
        // 0.5 × 333 = 166.5 → 167
        let mut cart = Cart::new();
        let added = cart
            .add_item(line(dec("0.5"), 333, VatRate::Zero, 0))
            .unwrap();
        assert_eq!(added.line_subtotal.minor(), 167);
    }

    #[test]
    fn test_discount_applied_before_tax() {
        // 1 × 10000 at 10% discount, 27% VAT:
        // subtotal 9000, tax 2430, total 11430
        let mut cart = Cart::new();
        let added = cart
            .add_item(line(dec("1"), 10000, VatRate::Standard27, 10))
            .unwrap();
        assert_eq!(added.line_subtotal.minor(), 9000);
        assert_eq!(added.line_tax.minor(), 2430);
        assert_eq!(added.line_total.minor(), 11430);
        assert_eq!(cart.totals().discount_amount.minor(), 1000);
    }

    #[test]
    fn test_update_quantity_recomputes() {
        let mut cart = Cart::new();
        let id = cart
            .add_item(line(dec("1"), 10000, VatRate::Standard27, 0))
            .unwrap()
            .id
            .clone();

        let updated = cart.update_quantity(&id, dec("3")).unwrap();
        assert_eq!(updated.line_subtotal.minor(), 30000);
        assert_eq!(updated.line_total.minor(), 38100);
    }

    #[test]
    fn test_unknown_line_id_errors() {
        let mut cart = Cart::new();
        assert!(matches!(
            cart.update_quantity("nope", dec("1")),
            Err(CoreError::LineNotFound(_))
        ));
        assert!(matches!(
            cart.update_discount("nope", 5),
            Err(CoreError::LineNotFound(_))
        ));
        assert!(matches!(
            cart.remove_item("nope"),
            Err(CoreError::LineNotFound(_))
        ));
    }

    #[test]
    fn test_remove_item() {
        let mut cart = Cart::new();
        let id = cart
            .add_item(line(dec("1"), 500, VatRate::Reduced5, 0))
            .unwrap()
            .id
            .clone();
        cart.remove_item(&id).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_rejects_nonpositive_quantity_and_negative_price() {
        let mut cart = Cart::new();
        assert!(cart.add_item(line(dec("0"), 100, VatRate::Zero, 0)).is_err());
        assert!(cart.add_item(line(dec("-1"), 100, VatRate::Zero, 0)).is_err());
        assert!(cart.add_item(line(dec("1"), -100, VatRate::Zero, 0)).is_err());
    }

    #[test]
    fn test_cart_size_limit() {
        let mut cart = Cart::new();
        for _ in 0..MAX_CART_LINES {
            cart.add_item(line(dec("1"), 100, VatRate::Zero, 0)).unwrap();
        }
        assert!(matches!(
            cart.add_item(line(dec("1"), 100, VatRate::Zero, 0)),
            Err(CoreError::CartTooLarge { .. })
        ));
    }

    #[test]
    fn test_commit_freezes_cart() {
        let mut cart = Cart::new();
        cart.add_item(line(dec("2"), 10000, VatRate::Standard27, 0))
            .unwrap();

        let (txn, lines) = cart
            .commit("tenant-1", "sess-1", "RCPT-0001", "wh-main", Utc::now())
            .unwrap();

        assert_eq!(txn.status, TransactionStatus::PendingPayment);
        assert_eq!(txn.payment_status, PaymentStatus::Pending);
        assert_eq!(txn.total.minor(), 25400);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].transaction_id, txn.id);
        assert_eq!(lines[0].warehouse_id, "wh-main");
        assert!(!lines[0].inventory_deducted);
    }

    #[test]
    fn test_commit_empty_cart_fails() {
        let cart = Cart::new();
        assert!(matches!(
            cart.commit("t", "s", "r", "w", Utc::now()),
            Err(CoreError::EmptyCart)
        ));
    }

    proptest! {
        #[test]
        fn prop_line_total_is_subtotal_plus_tax(
            qty in 1i64..=1000,
            price in 0i64..=1_000_000,
            vat in prop::sample::select(VatRate::ALL.to_vec()),
            discount in 0u8..=100,
        ) {
            let mut cart = Cart::new();
            let added = cart
                .add_item(line(Decimal::from(qty), price, vat, discount))
                .unwrap();
            prop_assert_eq!(added.line_total, added.line_subtotal + added.line_tax);
        }

        #[test]
        fn prop_totals_are_sums_of_lines(
            prices in prop::collection::vec(1i64..=100_000, 1..10),
        ) {
            let mut cart = Cart::new();
            for price in &prices {
                cart.add_item(line(Decimal::ONE, *price, VatRate::Standard27, 0))
                    .unwrap();
            }
            let totals = cart.totals();
            let subtotal: Money = cart.items().iter().map(|l| l.line_subtotal).sum();
            let tax: Money = cart.items().iter().map(|l| l.line_tax).sum();
            prop_assert_eq!(totals.subtotal, subtotal);
            prop_assert_eq!(totals.tax, tax);
            prop_assert_eq!(totals.total, subtotal + tax);
        }
    }
}
