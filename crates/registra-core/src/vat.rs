//! # VAT Rates
//!
//! The engine supports exactly four VAT rates: 0%, 5%, 18% and 27%.
//! The set is closed, so the rate is an enum rather than an open
//! percentage field; an out-of-set rate cannot be constructed at all.
//!
//! Serde and `FromStr` both speak plain percent numbers so the rate
//! round-trips through JSON payloads and database TEXT columns.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

// =============================================================================
// VatRate
// =============================================================================

/// One of the four supported VAT rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum VatRate {
    /// 0% — VAT-exempt goods.
    Zero,
    /// 5% — reduced rate.
    Reduced5,
    /// 18% — intermediate rate.
    Intermediate18,
    /// 27% — standard rate.
    Standard27,
}

impl VatRate {
    /// All supported rates, in ascending order.
    pub const ALL: [VatRate; 4] = [
        VatRate::Zero,
        VatRate::Reduced5,
        VatRate::Intermediate18,
        VatRate::Standard27,
    ];

    /// Parses a percent value, rejecting anything outside the fixed set.
    pub fn from_percent(percent: u32) -> Result<VatRate, ValidationError> {
        match percent {
            0 => Ok(VatRate::Zero),
            5 => Ok(VatRate::Reduced5),
            18 => Ok(VatRate::Intermediate18),
            27 => Ok(VatRate::Standard27),
            _ => Err(ValidationError::NotAllowed {
                field: "tax_rate".to_string(),
                allowed: vec![
                    "0".to_string(),
                    "5".to_string(),
                    "18".to_string(),
                    "27".to_string(),
                ],
            }),
        }
    }

    /// The rate as a whole percent.
    pub const fn percent(&self) -> u32 {
        match self {
            VatRate::Zero => 0,
            VatRate::Reduced5 => 5,
            VatRate::Intermediate18 => 18,
            VatRate::Standard27 => 27,
        }
    }
}

impl From<VatRate> for u32 {
    fn from(rate: VatRate) -> u32 {
        rate.percent()
    }
}

impl TryFrom<u32> for VatRate {
    type Error = ValidationError;

    fn try_from(percent: u32) -> Result<Self, Self::Error> {
        VatRate::from_percent(percent)
    }
}

impl fmt::Display for VatRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.percent())
    }
}

impl FromStr for VatRate {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let percent: u32 = s.parse().map_err(|_| ValidationError::InvalidFormat {
            field: "tax_rate".to_string(),
            reason: format!("'{s}' is not a number"),
        })?;
        VatRate::from_percent(percent)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_percent_accepts_fixed_set() {
        assert_eq!(VatRate::from_percent(0).unwrap(), VatRate::Zero);
        assert_eq!(VatRate::from_percent(5).unwrap(), VatRate::Reduced5);
        assert_eq!(VatRate::from_percent(18).unwrap(), VatRate::Intermediate18);
        assert_eq!(VatRate::from_percent(27).unwrap(), VatRate::Standard27);
    }

    #[test]
    fn test_from_percent_rejects_everything_else() {
        for bad in [1, 4, 10, 19, 20, 25, 26, 28, 100] {
            let err = VatRate::from_percent(bad).unwrap_err();
            assert!(matches!(err, ValidationError::NotAllowed { .. }));
        }
    }

    #[test]
    fn test_text_round_trip() {
        for rate in VatRate::ALL {
            let text = rate.to_string();
            assert_eq!(text.parse::<VatRate>().unwrap(), rate);
        }
    }

    #[test]
    fn test_serde_as_number() {
        let json = serde_json::to_string(&VatRate::Standard27).unwrap();
        assert_eq!(json, "27");
        let back: VatRate = serde_json::from_str("18").unwrap();
        assert_eq!(back, VatRate::Intermediate18);
        assert!(serde_json::from_str::<VatRate>("19").is_err());
    }
}
