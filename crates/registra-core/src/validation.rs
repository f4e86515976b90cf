//! # Input Validation
//!
//! Field validators for everything callers hand the engine. Each
//! validator names the offending field in its error, so API layers can
//! surface the message verbatim.
//!
//! Validation runs BEFORE any state change; a failed validator leaves
//! carts, sessions and transactions untouched.

use rust_decimal::Decimal;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::{MAX_CART_LINES, MAX_LINE_QUANTITY, MAX_UNIT_PRICE_MINOR};

/// Line quantity: strictly positive, capped.
///
/// The cap also bounds cart line math so rounded amounts always fit i64.
pub fn validate_quantity(quantity: Decimal) -> Result<(), ValidationError> {
    if quantity <= Decimal::ZERO {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    if quantity > Decimal::from(MAX_LINE_QUANTITY) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }
    Ok(())
}

/// Unit price: non-negative (zero-priced promo lines are legal), capped.
pub fn validate_unit_price(price: Money) -> Result<(), ValidationError> {
    if price.is_negative() || price.minor() > MAX_UNIT_PRICE_MINOR {
        return Err(ValidationError::OutOfRange {
            field: "unit_price".to_string(),
            min: 0,
            max: MAX_UNIT_PRICE_MINOR,
        });
    }
    Ok(())
}

/// Discount percent: whole percents, 0 to 100 inclusive.
pub fn validate_discount_percent(percent: u8) -> Result<(), ValidationError> {
    if percent > 100 {
        return Err(ValidationError::OutOfRange {
            field: "discount_percent".to_string(),
            min: 0,
            max: 100,
        });
    }
    Ok(())
}

/// Opening drawer balance: non-negative.
pub fn validate_opening_balance(balance: Money) -> Result<(), ValidationError> {
    if balance.is_negative() {
        return Err(ValidationError::MustBePositive {
            field: "opening_balance".to_string(),
        });
    }
    Ok(())
}

/// Amount handed over by the customer: strictly positive.
pub fn validate_received_amount(amount: Money) -> Result<(), ValidationError> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "received_amount".to_string(),
        });
    }
    Ok(())
}

/// Guard against unbounded carts.
pub fn validate_cart_size(current_lines: usize) -> CoreResult<()> {
    if current_lines >= MAX_CART_LINES {
        return Err(CoreError::CartTooLarge {
            max: MAX_CART_LINES,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_quantity_bounds() {
        assert!(validate_quantity(Decimal::ONE).is_ok());
        assert!(validate_quantity("0.001".parse().unwrap()).is_ok());
        assert!(validate_quantity(Decimal::ZERO).is_err());
        assert!(validate_quantity(Decimal::from(-3)).is_err());
        assert!(validate_quantity(Decimal::from(MAX_LINE_QUANTITY + 1)).is_err());
    }

    #[test]
    fn test_unit_price_bounds() {
        assert!(validate_unit_price(Money::zero()).is_ok());
        assert!(validate_unit_price(Money::from_minor(MAX_UNIT_PRICE_MINOR)).is_ok());
        assert!(validate_unit_price(Money::from_minor(-1)).is_err());
        assert!(validate_unit_price(Money::from_minor(MAX_UNIT_PRICE_MINOR + 1)).is_err());
    }

    #[test]
    fn test_discount_percent_bounds() {
        assert!(validate_discount_percent(0).is_ok());
        assert!(validate_discount_percent(100).is_ok());
        assert!(validate_discount_percent(101).is_err());
    }

    #[test]
    fn test_received_amount_must_be_positive() {
        assert!(validate_received_amount(Money::from_minor(1)).is_ok());
        assert!(validate_received_amount(Money::zero()).is_err());
        assert!(validate_received_amount(Money::from_minor(-500)).is_err());
    }

    proptest! {
        #[test]
        fn prop_valid_discounts_always_accepted(percent in 0u8..=100) {
            prop_assert!(validate_discount_percent(percent).is_ok());
        }

        #[test]
        fn prop_positive_quantities_in_range_accepted(qty in 1i64..=MAX_LINE_QUANTITY) {
            prop_assert!(validate_quantity(Decimal::from(qty)).is_ok());
        }
    }
}
