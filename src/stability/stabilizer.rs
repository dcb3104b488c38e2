//! Stabilization engine.
//!
//! Corrects a depegged synthetic price using the stability pool:
//! - below the low trigger: burn pool stable (at most `supply / divisor`)
//! - above the high trigger: mint against pool collateral (same cap)
//!
//! Both branches credit the reward pool at `BaseRewardRate × (1 + deviation)`.
//! If the price is still outside the emergency band after a branch ran, the
//! emergency reserves are spent; if even that fails, the system is locked.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::ledger::Ledger;
use crate::core::peg::{LockState, PegController};
use crate::error::Result;
use crate::utils::math::Amount;

// ═══════════════════════════════════════════════════════════════════════════════
// REPORT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// Pool-backed correction that ran
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StabilizationAction {
    /// Price within the stabilization band
    None,
    /// Pool stable burned to lift the price; `amount` is zero when the pool
    /// is empty, and the emergency check still follows
    BurnedLow {
        /// Stable burned
        amount: Amount,
        /// Reward credited
        reward: Amount,
    },
    /// Stable minted into the pool to lower the price
    MintedHigh {
        /// Stable minted
        amount: Amount,
        /// Reward credited
        reward: Amount,
    },
}

/// Emergency reserve usage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmergencyAction {
    /// Supply burned against the emergency collateral reserve
    Low {
        /// Stable burned from supply
        burned: Amount,
        /// Emergency collateral consumed
        collateral_used: Amount,
    },
    /// Emergency stable reserve released into supply and pool
    High {
        /// Stable added
        minted: Amount,
    },
}

/// Outcome of one `stabilize` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StabilizationReport {
    /// Peg price before any correction
    pub price_before: Amount,
    /// Pool-backed correction
    pub action: StabilizationAction,
    /// Emergency reserve usage, if any
    pub emergency: Option<EmergencyAction>,
    /// Peg price after all corrections
    pub price_after: Amount,
    /// True if the engine forced the system into `Locked`
    pub forced_lock: bool,
}

impl StabilizationReport {
    /// True when nothing was changed
    pub fn is_noop(&self) -> bool {
        self.action == StabilizationAction::None && self.emergency.is_none() && !self.forced_lock
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENGINE
// ═══════════════════════════════════════════════════════════════════════════════

/// Peg defense against the stability pool and emergency reserves
pub struct StabilizationEngine;

impl StabilizationEngine {
    /// Run one stabilization pass; allowed in either lock state
    pub fn stabilize(ledger: &mut Ledger) -> Result<StabilizationReport> {
        let thresholds = ledger.thresholds()?;
        let price_before = PegController::measure(ledger)?;

        let action = if thresholds.below_stabilize(&price_before) {
            Self::stabilize_low(ledger, &price_before)?
        } else if thresholds.above_stabilize(&price_before) {
            Self::stabilize_high(ledger, &price_before)?
        } else {
            StabilizationAction::None
        };

        let mut emergency = None;
        let mut forced_lock = false;
        let mut price_after = price_before.clone();

        if action != StabilizationAction::None {
            price_after = PegController::measure(ledger)?;
            if thresholds.outside_emergency_band(&price_after) {
                let low = price_after < thresholds.emergency_low;
                emergency = Some(Self::use_emergency_funds(ledger, low)?);
                price_after = PegController::measure(ledger)?;

                if thresholds.outside_emergency_band(&price_after) {
                    warn!(price = %price_after, "Peg not restored by emergency funds, locking");
                    ledger.set_lock_state(LockState::Locked);
                    forced_lock = true;
                }
            }
        }

        Ok(StabilizationReport {
            price_before,
            action,
            emergency,
            price_after,
            forced_lock,
        })
    }

    /// `min(StabilityPoolStable, StableSupply / divisor)` is burned
    fn stabilize_low(ledger: &mut Ledger, price: &Amount) -> Result<StabilizationAction> {
        let cap = ledger
            .stable_supply
            .div_u64(ledger.params.stabilize_supply_divisor, "stabilize_cap")?;
        let amount = ledger.pool_stable.clone().min(cap);

        ledger.stable_supply = ledger.stable_supply.checked_sub(&amount, "stable_supply")?;
        ledger.pool_stable = ledger.pool_stable.checked_sub(&amount, "pool_stable")?;

        let scale = ledger.scale()?.clone();
        let deviation = scale.saturating_sub(price);
        let reward = Self::credit_reward(ledger, &amount, &deviation, &scale)?;

        info!(burned = %amount, reward = %reward, price = %price, "Stabilized low price");
        Ok(StabilizationAction::BurnedLow { amount, reward })
    }

    /// `min(PoolCollateral × price / ratio, StableSupply / divisor)` is minted into the pool
    fn stabilize_high(ledger: &mut Ledger, price: &Amount) -> Result<StabilizationAction> {
        let max_by_collateral = ledger.pool_collateral.mul_div(
            &ledger.collateral_price,
            ledger.collateral_ratio()?,
            "max_mint_by_collateral",
        )?;
        let cap = ledger
            .stable_supply
            .div_u64(ledger.params.stabilize_supply_divisor, "stabilize_cap")?;
        let amount = max_by_collateral.min(cap);

        ledger.stable_supply = &ledger.stable_supply + &amount;
        ledger.pool_stable = &ledger.pool_stable + &amount;

        let scale = ledger.scale()?.clone();
        let deviation = price.saturating_sub(&scale);
        let reward = Self::credit_reward(ledger, &amount, &deviation, &scale)?;

        info!(minted = %amount, reward = %reward, price = %price, "Stabilized high price");
        Ok(StabilizationAction::MintedHigh { amount, reward })
    }

    /// `RewardPool += amount × BaseRewardRate × (1 + deviation)`
    fn credit_reward(
        ledger: &mut Ledger,
        amount: &Amount,
        deviation: &Amount,
        scale: &Amount,
    ) -> Result<Amount> {
        let multiplier = scale + deviation;
        let dynamic_rate = ledger
            .base_reward_rate
            .mul_div(&multiplier, scale, "dynamic_reward_rate")?;
        let reward = amount.mul_div(&dynamic_rate, scale, "stabilization_reward")?;
        debug!(dynamic_rate = %dynamic_rate, reward = %reward, "Reward credited");

        ledger.reward_pool = &ledger.reward_pool + &reward;
        Ok(reward)
    }

    /// Spend the emergency reserve on the side the price deviates to
    fn use_emergency_funds(ledger: &mut Ledger, low: bool) -> Result<EmergencyAction> {
        if low {
            let collateral_used = ledger.emergency_collateral.clone();
            let value = collateral_used.mul_div(
                &ledger.collateral_price,
                ledger.scale()?,
                "emergency_collateral_value",
            )?;
            // Only unallocated supply may go; account and pool stable stay backed
            let burned = value.min(ledger.unallocated_stable());

            ledger.stable_supply = ledger.stable_supply.checked_sub(&burned, "stable_supply")?;
            ledger.emergency_collateral = Amount::zero();

            warn!(burned = %burned, collateral = %collateral_used, "Emergency collateral used");
            Ok(EmergencyAction::Low {
                burned,
                collateral_used,
            })
        } else {
            let minted = std::mem::take(&mut ledger.emergency_stable);
            ledger.stable_supply = &ledger.stable_supply + &minted;
            ledger.pool_stable = &ledger.pool_stable + &minted;

            warn!(minted = %minted, "Emergency stable released");
            Ok(EmergencyAction::High { minted })
        }
    }
}
