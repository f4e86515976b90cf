//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  In floating point: 0.1 + 0.2 = 0.30000000000000004   ❌ WRONG!     │
//! │                                                                     │
//! │  OUR SOLUTION: integer minor currency units (i64)                   │
//! │    10000 / 3 = 3333 (×3 = 9999) — we KNOW we lost one unit and      │
//! │    handle it explicitly at the rounding sites.                      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every monetary value in Registra flows through this type: cart line
//! math, payment settlement, drawer reconciliation. Only quantities use
//! decimals; money never does.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use crate::vat::VatRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: negative values are legal (variance, refunds)
/// - **Single-field tuple struct**: zero-cost abstraction over i64
/// - **`#[serde(transparent)]`**: serializes as a bare number
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor currency units.
    #[inline]
    pub const fn from_minor(units: i64) -> Self {
        Money(units)
    }

    /// Returns the value in minor currency units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is strictly positive.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is strictly negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Calculates VAT on this amount, rounded to the nearest minor unit.
    ///
    /// ## Implementation
    /// Integer math in i128 to prevent overflow:
    /// `(amount * percent + 50) / 100` — the `+50` rounds half up.
    ///
    /// The tax is rounded independently of the net amount it was derived
    /// from; callers must never round a combined product instead.
    ///
    /// ## Example
    /// ```rust
    /// use registra_core::money::Money;
    /// use registra_core::vat::VatRate;
    ///
    /// let net = Money::from_minor(20000);
    /// let tax = net.apply_vat(VatRate::Standard27);
    /// assert_eq!(tax.minor(), 5400);
    /// ```
    pub fn apply_vat(&self, rate: VatRate) -> Money {
        let tax = (self.0 as i128 * rate.percent() as i128 + 50) / 100;
        Money(tax as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-friendly display of the raw minor-unit amount.
///
/// Locale-aware currency formatting is explicitly out of scope for the
/// engine; consumers format for display themselves.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

/// Multiplication by an integer count (whole-unit quantities).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
