//! Fixed-point arithmetic over big unsigned integers.
//!
//! Every monetary quantity in the ledger is an [`Amount`]: a non-negative
//! integer interpreted against the ledger scale (1.0 = scale). Products of
//! two scaled values exceed 128 bits quickly (1000·10^18 × 1.5·10^18), so the
//! representation is an arbitrary-precision `BigUint`. Division truncates
//! toward zero and subtraction never wraps: it returns [`Error::Underflow`].

use num_bigint::BigUint;
use num_traits::{CheckedSub, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

use crate::error::{Error, Result};
use crate::utils::constants::BPS_DIVISOR;

// ═══════════════════════════════════════════════════════════════════════════════
// AMOUNT TYPE
// ═══════════════════════════════════════════════════════════════════════════════

/// Non-negative fixed-point quantity (raw integer, interpreted against a scale)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Amount(BigUint);

impl Amount {
    /// Zero value
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    /// Create from a raw u64 value (no scaling)
    pub fn from_u64(value: u64) -> Self {
        Self(BigUint::from(value))
    }

    /// Create from a raw u128 value (no scaling)
    pub fn from_u128(value: u128) -> Self {
        Self(BigUint::from(value))
    }

    /// Wrap an existing big integer
    pub fn from_biguint(value: BigUint) -> Self {
        Self(value)
    }

    /// Whole units scaled up: `units × scale`
    pub fn from_units(units: u64, scale: &Amount) -> Self {
        Self(BigUint::from(units) * &scale.0)
    }

    /// Basis points of the scale: `scale × bps / 10000`
    pub fn from_bps(bps: u64, scale: &Amount) -> Self {
        Self(&scale.0 * BigUint::from(bps) / BigUint::from(BPS_DIVISOR))
    }

    /// Parse a raw integer string
    pub fn from_raw_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<BigUint>()
            .map(Self)
            .map_err(|e| Error::InvalidParameter {
                name: "amount".into(),
                reason: format!("'{}': {}", s, e),
            })
    }

    /// Borrow the underlying integer
    pub fn inner(&self) -> &BigUint {
        &self.0
    }

    /// Check if value is zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Convert to u128 if it fits
    pub fn to_u128(&self) -> Option<u128> {
        self.0.to_u128()
    }

    /// Checked subtraction; `operation` names the cell for the error
    pub fn checked_sub(&self, other: &Amount, operation: &str) -> Result<Amount> {
        self.0
            .checked_sub(&other.0)
            .map(Self)
            .ok_or_else(|| Error::Underflow {
                operation: format!("{}: {} - {}", operation, self, other),
            })
    }

    /// Saturating subtraction
    pub fn saturating_sub(&self, other: &Amount) -> Amount {
        self.0
            .checked_sub(&other.0)
            .map(Self)
            .unwrap_or_else(Amount::zero)
    }

    /// Floor of `self × mul / div`
    pub fn mul_div(&self, mul: &Amount, div: &Amount, operation: &str) -> Result<Amount> {
        if div.is_zero() {
            return Err(Error::DivisionByZero {
                operation: operation.to_string(),
            });
        }
        Ok(Self(&self.0 * &mul.0 / &div.0))
    }

    /// Floor of `self / div`
    pub fn div_floor(&self, div: &Amount, operation: &str) -> Result<Amount> {
        if div.is_zero() {
            return Err(Error::DivisionByZero {
                operation: operation.to_string(),
            });
        }
        Ok(Self(&self.0 / &div.0))
    }

    /// Floor of `self / divisor` for a small constant divisor
    pub fn div_u64(&self, divisor: u64, operation: &str) -> Result<Amount> {
        self.div_floor(&Amount::from_u64(divisor), operation)
    }

    /// Format against a power-of-ten scale, e.g. `995.5`
    pub fn to_decimal_string(&self, scale: &Amount) -> String {
        let digits = match decimal_digits(scale) {
            Some(d) => d,
            None => return self.0.to_string(),
        };
        let whole = &self.0 / &scale.0;
        let frac = &self.0 % &scale.0;
        if frac.is_zero() {
            return whole.to_string();
        }
        let frac = format!("{:0>width$}", frac.to_string(), width = digits);
        format!("{}.{}", whole, frac.trim_end_matches('0'))
    }

    /// Parse a decimal string such as `1000.25` against a power-of-ten scale
    pub fn parse_decimal(s: &str, scale: &Amount) -> Result<Amount> {
        let invalid = |reason: String| Error::InvalidParameter {
            name: "amount".into(),
            reason,
        };
        let digits = decimal_digits(scale)
            .ok_or_else(|| invalid(format!("scale {} is not a power of ten", scale)))?;

        let s = s.trim();
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if frac.len() > digits {
            return Err(invalid(format!("'{}' has more than {} decimals", s, digits)));
        }
        let whole = if whole.is_empty() { "0" } else { whole };
        let whole: BigUint = whole
            .parse()
            .map_err(|e| invalid(format!("'{}': {}", s, e)))?;
        let frac_padded = format!("{:0<width$}", frac, width = digits);
        let frac: BigUint = if digits == 0 {
            BigUint::zero()
        } else {
            frac_padded
                .parse()
                .map_err(|e| invalid(format!("'{}': {}", s, e)))?
        };
        Ok(Self(whole * &scale.0 + frac))
    }
}

/// Number of decimals when `scale` is an exact power of ten
fn decimal_digits(scale: &Amount) -> Option<usize> {
    if scale.is_zero() {
        return None;
    }
    let repr = scale.0.to_string();
    let is_power = repr.starts_with('1') && repr[1..].bytes().all(|b| b == b'0');
    if is_power {
        Some(repr.len() - 1)
    } else {
        None
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0 + rhs.0)
    }
}

impl<'a> Add<&'a Amount> for &'a Amount {
    type Output = Amount;

    fn add(self, rhs: &'a Amount) -> Amount {
        Amount(&self.0 + &rhs.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Self::from_u128(value)
    }
}
