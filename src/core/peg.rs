//! Peg controller.
//!
//! A two-state automaton (`Unlocked` / `Locked`) driven by the synthetic
//! price of the stable asset:
//!
//! ```text
//! P = (CollateralSupply × CollateralPrice / scale) × scale / StableSupply
//! ```
//!
//! with `P = 1.0` when nothing is in circulation. Under the default
//! [`PegBasis::CollateralRatio`] the controller measures `P × scale / ratio`,
//! which reads 1.0 exactly when the system is backed at its target ratio.
//!
//! Transitions, re-evaluated before every gated operation:
//! - `P ≤ lock_low` or `P ≥ lock_high` → `Locked`
//! - `Locked` and `unlock_low ≤ P ≤ unlock_high` → `Unlocked`
//! - otherwise unchanged

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::core::ledger::Ledger;
use crate::error::{Error, Result};
use crate::utils::constants::*;
use crate::utils::math::Amount;

// ═══════════════════════════════════════════════════════════════════════════════
// LOCK STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Whether mint, burn and transfer are currently allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LockState {
    /// Gated operations proceed
    #[default]
    Unlocked,
    /// Gated operations abort
    Locked,
}

impl LockState {
    /// True when locked
    pub fn is_locked(&self) -> bool {
        matches!(self, LockState::Locked)
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockState::Unlocked => write!(f, "UNLOCKED"),
            LockState::Locked => write!(f, "LOCKED"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PEG BASIS
// ═══════════════════════════════════════════════════════════════════════════════

/// Reference the synthetic price is measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PegBasis {
    /// `P × scale / CollateralRatio`: 1.0 means backed exactly at target ratio
    #[default]
    CollateralRatio,
    /// Raw collateral value per stable unit
    Absolute,
}

impl FromStr for PegBasis {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "collateral_ratio" | "ratio" => Ok(PegBasis::CollateralRatio),
            "absolute" => Ok(PegBasis::Absolute),
            other => Err(Error::InvalidParameter {
                name: "peg_basis".into(),
                reason: format!("unknown basis '{}'", other),
            }),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PEG BANDS
// ═══════════════════════════════════════════════════════════════════════════════

/// Peg thresholds in basis points of the scale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PegBands {
    /// Lock (and stabilize) at or below this price
    pub lock_low_bps: u64,
    /// Lock (and stabilize) at or above this price
    pub lock_high_bps: u64,
    /// Lower edge of the unlock band
    pub unlock_low_bps: u64,
    /// Upper edge of the unlock band
    pub unlock_high_bps: u64,
    /// Emergency reserves are used below this price after stabilization
    pub emergency_low_bps: u64,
    /// Emergency reserves are used above this price after stabilization
    pub emergency_high_bps: u64,
}

impl Default for PegBands {
    fn default() -> Self {
        Self {
            lock_low_bps: LOCK_LOW_BPS,
            lock_high_bps: LOCK_HIGH_BPS,
            unlock_low_bps: UNLOCK_LOW_BPS,
            unlock_high_bps: UNLOCK_HIGH_BPS,
            emergency_low_bps: EMERGENCY_LOW_BPS,
            emergency_high_bps: EMERGENCY_HIGH_BPS,
        }
    }
}

impl PegBands {
    /// Resolve the bands against a fixed-point scale
    pub fn scaled(&self, scale: &Amount) -> PegThresholds {
        PegThresholds {
            peg: scale.clone(),
            lock_low: Amount::from_bps(self.lock_low_bps, scale),
            lock_high: Amount::from_bps(self.lock_high_bps, scale),
            unlock_low: Amount::from_bps(self.unlock_low_bps, scale),
            unlock_high: Amount::from_bps(self.unlock_high_bps, scale),
            emergency_low: Amount::from_bps(self.emergency_low_bps, scale),
            emergency_high: Amount::from_bps(self.emergency_high_bps, scale),
        }
    }
}

/// Peg thresholds as fixed-point prices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PegThresholds {
    /// The peg itself (1.0)
    pub peg: Amount,
    /// Lock at or below
    pub lock_low: Amount,
    /// Lock at or above
    pub lock_high: Amount,
    /// Unlock band lower edge
    pub unlock_low: Amount,
    /// Unlock band upper edge
    pub unlock_high: Amount,
    /// Emergency band lower edge
    pub emergency_low: Amount,
    /// Emergency band upper edge
    pub emergency_high: Amount,
}

impl PegThresholds {
    /// Deviation of at least the lock distance
    pub fn should_lock(&self, price: &Amount) -> bool {
        price <= &self.lock_low || price >= &self.lock_high
    }

    /// Inside the unlock band (inclusive)
    pub fn within_unlock_band(&self, price: &Amount) -> bool {
        price >= &self.unlock_low && price <= &self.unlock_high
    }

    /// Strictly below the low stabilization trigger
    pub fn below_stabilize(&self, price: &Amount) -> bool {
        price < &self.lock_low
    }

    /// Strictly above the high stabilization trigger
    pub fn above_stabilize(&self, price: &Amount) -> bool {
        price > &self.lock_high
    }

    /// Outside the (inclusive) emergency band
    pub fn outside_emergency_band(&self, price: &Amount) -> bool {
        price < &self.emergency_low || price > &self.emergency_high
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SYNTHETIC PRICE
// ═══════════════════════════════════════════════════════════════════════════════

/// `(collateral × price / scale) × scale / stable`, or `scale` when nothing circulates
pub fn synthetic_price(
    collateral_supply: &Amount,
    collateral_price: &Amount,
    stable_supply: &Amount,
    scale: &Amount,
) -> Result<Amount> {
    if stable_supply.is_zero() {
        return Ok(scale.clone());
    }
    let collateral_value = collateral_supply.mul_div(collateral_price, scale, "collateral_value")?;
    collateral_value.mul_div(scale, stable_supply, "synthetic_price")
}

/// Synthetic price expressed against `basis`
pub fn peg_price(
    raw_price: &Amount,
    basis: PegBasis,
    ratio: &Amount,
    scale: &Amount,
) -> Result<Amount> {
    match basis {
        PegBasis::Absolute => Ok(raw_price.clone()),
        PegBasis::CollateralRatio => raw_price.mul_div(scale, ratio, "peg_price"),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONTROLLER
// ═══════════════════════════════════════════════════════════════════════════════

/// Outcome of one controller evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PegReading {
    /// Measured price (already on the configured basis)
    pub price: Amount,
    /// State before the evaluation
    pub previous: LockState,
    /// State after the evaluation
    pub state: LockState,
}

impl PegReading {
    /// True when the evaluation changed the lock state
    pub fn changed(&self) -> bool {
        self.previous != self.state
    }
}

/// The lock/unlock automaton
pub struct PegController;

impl PegController {
    /// Pure transition function
    pub fn transition(current: LockState, price: &Amount, thresholds: &PegThresholds) -> LockState {
        if thresholds.should_lock(price) {
            LockState::Locked
        } else if current.is_locked() && thresholds.within_unlock_band(price) {
            LockState::Unlocked
        } else {
            current
        }
    }

    /// Measure the ledger's price on its configured basis
    pub fn measure(ledger: &Ledger) -> Result<Amount> {
        let scale = ledger.scale()?;
        let ratio = ledger.collateral_ratio()?;
        // Nothing circulates: on peg under either basis
        if ledger.stable_supply().is_zero() {
            return Ok(scale.clone());
        }
        let raw = synthetic_price(
            ledger.collateral_supply(),
            ledger.collateral_price(),
            ledger.stable_supply(),
            scale,
        )?;
        peg_price(&raw, ledger.params().peg_basis, ratio, scale)
    }

    /// Recompute the price and store the resulting lock state
    pub fn evaluate(ledger: &mut Ledger) -> Result<PegReading> {
        let price = Self::measure(ledger)?;
        let thresholds = ledger.thresholds()?;
        let previous = ledger.lock_state();
        let state = Self::transition(previous, &price, &thresholds);

        debug!(price = %price, state = %state, "Peg evaluated");
        if previous != state {
            info!(from = %previous, to = %state, price = %price, "Lock state changed");
            ledger.set_lock_state(state);
        }

        Ok(PegReading {
            price,
            previous,
            state,
        })
    }

    /// Evaluate and fail with `SystemLocked` unless the result is unlocked
    pub fn ensure_unlocked(ledger: &mut Ledger) -> Result<PegReading> {
        let reading = Self::evaluate(ledger)?;
        if reading.state.is_locked() {
            warn!(price = %reading.price, "Gated operation rejected: system locked");
            return Err(Error::SystemLocked {
                price: reading.price.to_string(),
            });
        }
        Ok(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scale() -> Amount {
        Amount::from_u64(DEFAULT_SCALE)
    }

    fn bps(value: u64) -> Amount {
        Amount::from_bps(value, &scale())
    }

    fn thresholds() -> PegThresholds {
        PegBands::default().scaled(&scale())
    }

    #[test]
    fn test_synthetic_price_empty_supply() {
        let s = scale();
        let price = synthetic_price(&Amount::zero(), &Amount::zero(), &Amount::zero(), &s).unwrap();
        assert_eq!(price, s);
    }

    #[test]
    fn test_synthetic_price_formula() {
        let s = scale();
        // 1500 collateral at 1.0 backing 995 stable
        let p = synthetic_price(
            &Amount::from_units(1500, &s),
            &Amount::from_units(1, &s),
            &Amount::from_units(995, &s),
            &s,
        )
        .unwrap();
        let expected = Amount::from_units(1500, &s)
            .mul_div(&s, &Amount::from_units(995, &s), "t")
            .unwrap();
        assert_eq!(p, expected);

        // Ratio basis divides out the 1.5 target
        let on_basis = peg_price(&p, PegBasis::CollateralRatio, &bps(15_000), &s).unwrap();
        assert!(on_basis > s && on_basis < bps(10_100));
        assert_eq!(peg_price(&p, PegBasis::Absolute, &bps(15_000), &s).unwrap(), p);
    }

    #[test]
    fn test_lock_at_boundaries() {
        let t = thresholds();
        assert_eq!(PegController::transition(LockState::Unlocked, &bps(9_500), &t), LockState::Locked);
        assert_eq!(PegController::transition(LockState::Unlocked, &bps(10_500), &t), LockState::Locked);
        assert_eq!(PegController::transition(LockState::Unlocked, &bps(9_501), &t), LockState::Unlocked);
        assert_eq!(PegController::transition(LockState::Unlocked, &bps(10_499), &t), LockState::Unlocked);
    }

    #[test]
    fn test_lock_idempotent() {
        let t = thresholds();
        assert_eq!(PegController::transition(LockState::Locked, &bps(9_000), &t), LockState::Locked);
    }

    #[test]
    fn test_unlock_band() {
        let t = thresholds();
        assert_eq!(PegController::transition(LockState::Locked, &bps(9_900), &t), LockState::Unlocked);
        assert_eq!(PegController::transition(LockState::Locked, &bps(10_100), &t), LockState::Unlocked);
        assert_eq!(PegController::transition(LockState::Locked, &bps(10_000), &t), LockState::Unlocked);
    }

    #[test]
    fn test_hysteresis() {
        // Between the unlock and lock bands nothing changes
        let t = thresholds();
        assert_eq!(PegController::transition(LockState::Locked, &bps(9_700), &t), LockState::Locked);
        assert_eq!(PegController::transition(LockState::Locked, &bps(10_300), &t), LockState::Locked);
        assert_eq!(PegController::transition(LockState::Unlocked, &bps(9_700), &t), LockState::Unlocked);
    }

    #[test]
    fn test_threshold_predicates() {
        let t = thresholds();
        assert!(t.below_stabilize(&bps(9_499)));
        assert!(!t.below_stabilize(&bps(9_500)));
        assert!(t.above_stabilize(&bps(10_501)));
        assert!(!t.above_stabilize(&bps(10_500)));
        assert!(t.outside_emergency_band(&bps(9_799)));
        assert!(!t.outside_emergency_band(&bps(9_800)));
        assert!(!t.outside_emergency_band(&bps(10_200)));
        assert!(t.outside_emergency_band(&bps(10_201)));
    }

    #[test]
    fn test_peg_basis_parse() {
        assert_eq!("ratio".parse::<PegBasis>().unwrap(), PegBasis::CollateralRatio);
        assert_eq!("Absolute".parse::<PegBasis>().unwrap(), PegBasis::Absolute);
        assert!("spot".parse::<PegBasis>().is_err());
    }
}
