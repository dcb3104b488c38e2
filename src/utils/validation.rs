//! Input validation shared by ledger operations.
//!
//! Every check returns the typed error its abort category demands, so the
//! operations themselves stay a flat list of `?` guards.

use crate::error::{Error, Result};
use crate::utils::crypto::PublicKey;
use crate::utils::math::Amount;

// ═══════════════════════════════════════════════════════════════════════════════
// AMOUNT VALIDATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Validate that an amount is strictly positive
pub fn validate_positive(amount: &Amount, name: &'static str) -> Result<()> {
    if amount.is_zero() {
        return Err(Error::ZeroAmount { name });
    }
    Ok(())
}

/// Validate that at least one of a pair of amounts is positive
pub fn validate_any_positive(first: &Amount, second: &Amount, name: &'static str) -> Result<()> {
    if first.is_zero() && second.is_zero() {
        return Err(Error::ZeroAmount { name });
    }
    Ok(())
}

/// Validate that `available` covers `required`
pub fn validate_sufficient(
    available: &Amount,
    required: &Amount,
    asset: &'static str,
) -> Result<()> {
    if available < required {
        return Err(Error::InsufficientBalance {
            asset,
            required: required.to_string(),
            available: available.to_string(),
        });
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// IDENTITY VALIDATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Validate that an identity is not the empty key
pub fn validate_identity(identity: &PublicKey, name: &'static str) -> Result<()> {
    if identity.is_empty() {
        return Err(Error::EmptyIdentity { name });
    }
    Ok(())
}

/// Validate that the caller is the governance identity
pub fn validate_governance(caller: &PublicKey, governance: &PublicKey, action: &str) -> Result<()> {
    if caller != governance {
        return Err(Error::Unauthorized(format!(
            "{} may only be called by governance, caller {}",
            action,
            caller.short()
        )));
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARAMETER VALIDATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Validate a basis-point value is within 0..=max
pub fn validate_bps(value: u64, max: u64, name: &str) -> Result<()> {
    if value > max {
        return Err(Error::InvalidParameter {
            name: name.into(),
            reason: format!("{} bps exceeds maximum {} bps", value, max),
        });
    }
    Ok(())
}

/// Validate that values are strictly increasing
pub fn validate_ascending(values: &[u64], name: &str) -> Result<()> {
    if values.windows(2).any(|w| w[0] >= w[1]) {
        return Err(Error::InvalidParameter {
            name: name.into(),
            reason: format!("values {:?} must be strictly increasing", values),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::utils::crypto::KeyPair;

    #[test]
    fn test_validate_positive() {
        assert!(validate_positive(&Amount::from_u64(1), "amount").is_ok());
        let err = validate_positive(&Amount::zero(), "amount").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_validate_any_positive() {
        assert!(validate_any_positive(&Amount::zero(), &Amount::from_u64(1), "liquidity").is_ok());
        assert!(validate_any_positive(&Amount::zero(), &Amount::zero(), "liquidity").is_err());
    }

    #[test]
    fn test_validate_sufficient() {
        let five = Amount::from_u64(5);
        assert!(validate_sufficient(&five, &five, "stable").is_ok());
        let err = validate_sufficient(&five, &Amount::from_u64(6), "stable").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    }

    #[test]
    fn test_validate_identity() {
        assert!(validate_identity(KeyPair::generate().public_key(), "dao").is_ok());
        assert!(matches!(
            validate_identity(&PublicKey::empty(), "dao"),
            Err(Error::EmptyIdentity { name: "dao" })
        ));
    }

    #[test]
    fn test_validate_governance() {
        let dao = *KeyPair::generate().public_key();
        let other = *KeyPair::generate().public_key();
        assert!(validate_governance(&dao, &dao, "update_price").is_ok());
        let err = validate_governance(&other, &dao, "update_price").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionViolation);
    }

    #[test]
    fn test_validate_ascending() {
        assert!(validate_ascending(&[1, 2, 3], "bands").is_ok());
        assert!(validate_ascending(&[1, 1, 3], "bands").is_err());
        assert!(validate_bps(10_000, 10_000, "share").is_ok());
        assert!(validate_bps(10_001, 10_000, "share").is_err());
    }
}
