//! Fee distribution.
//!
//! Mint, burn and transfer accumulate fees in two transient buckets. The
//! distributor drains both into the permanent reserves: the treasury share
//! (5% by default) goes to treasury, the remainder to the emergency reserve
//! that the stabilizer may later consume. Supplies are never touched.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::ledger::Ledger;
use crate::error::Result;
use crate::utils::constants::BPS_DIVISOR;
use crate::utils::math::Amount;

/// Amounts moved by one distribution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeDistribution {
    /// Stable fees sent to treasury
    pub treasury_stable: Amount,
    /// Stable fees sent to the emergency reserve
    pub emergency_stable: Amount,
    /// Collateral fees sent to treasury
    pub treasury_collateral: Amount,
    /// Collateral fees sent to the emergency reserve
    pub emergency_collateral: Amount,
}

impl FeeDistribution {
    /// True when nothing was moved
    pub fn is_empty(&self) -> bool {
        self.treasury_stable.is_zero()
            && self.emergency_stable.is_zero()
            && self.treasury_collateral.is_zero()
            && self.emergency_collateral.is_zero()
    }
}

/// Drains fee buckets into treasury and emergency reserves
pub struct FeeDistributor;

impl FeeDistributor {
    /// Split `bucket` into (treasury, emergency)
    pub fn split(bucket: &Amount, treasury_share_bps: u64) -> Result<(Amount, Amount)> {
        let treasury = bucket.mul_div(
            &Amount::from_u64(treasury_share_bps),
            &Amount::from_u64(BPS_DIVISOR),
            "treasury_share",
        )?;
        let emergency = bucket.checked_sub(&treasury, "emergency_share")?;
        Ok((treasury, emergency))
    }

    /// Drain both buckets
    pub fn distribute(ledger: &mut Ledger) -> Result<FeeDistribution> {
        let share = ledger.params().treasury_share_bps;
        let (treasury_stable, emergency_stable) = Self::split(&ledger.stable_fee_collected, share)?;
        let (treasury_collateral, emergency_collateral) =
            Self::split(&ledger.collateral_fee_collected, share)?;

        ledger.treasury_stable = &ledger.treasury_stable + &treasury_stable;
        ledger.emergency_stable = &ledger.emergency_stable + &emergency_stable;
        ledger.treasury_collateral = &ledger.treasury_collateral + &treasury_collateral;
        ledger.emergency_collateral = &ledger.emergency_collateral + &emergency_collateral;
        ledger.stable_fee_collected = Amount::zero();
        ledger.collateral_fee_collected = Amount::zero();

        let distribution = FeeDistribution {
            treasury_stable,
            emergency_stable,
            treasury_collateral,
            emergency_collateral,
        };
        if !distribution.is_empty() {
            info!(
                treasury_stable = %distribution.treasury_stable,
                emergency_stable = %distribution.emergency_stable,
                treasury_collateral = %distribution.treasury_collateral,
                emergency_collateral = %distribution.emergency_collateral,
                "Fees distributed"
            );
        }
        Ok(distribution)
    }
}
