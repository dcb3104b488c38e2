//! Stability pool contributions.
//!
//! Liquidity providers move collateral and stable into the pool voluntarily.
//! Collateral enters as a ledger-only credit (its transfer is settled by the
//! host); stable is taken from the provider's regular balance. Every provision
//! triggers a stabilization pass. Withdrawals are bounded by the provider's
//! own contribution and by what the pool aggregate still holds.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::ledger::Ledger;
use crate::error::Result;
use crate::stability::stabilizer::{StabilizationEngine, StabilizationReport};
use crate::utils::crypto::PublicKey;
use crate::utils::math::Amount;
use crate::utils::validation::{validate_any_positive, validate_sufficient};

/// Result of a withdrawal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawOutcome {
    /// Collateral released from the pool (ledger-only)
    pub collateral: Amount,
    /// Stable credited back to the provider's balance
    pub stable: Amount,
}

/// Provide / withdraw liquidity
pub struct StabilityPool;

impl StabilityPool {
    /// Add liquidity, then run a stabilization pass
    pub fn provide_liquidity(
        ledger: &mut Ledger,
        caller: &PublicKey,
        collateral_amount: &Amount,
        stable_amount: &Amount,
    ) -> Result<StabilizationReport> {
        validate_any_positive(collateral_amount, stable_amount, "liquidity")?;

        if !collateral_amount.is_zero() {
            ledger.credit_pool_collateral(caller, collateral_amount);
            ledger.pool_collateral = &ledger.pool_collateral + collateral_amount;
        }
        if !stable_amount.is_zero() {
            ledger.debit_stable(caller, stable_amount)?;
            ledger.credit_pool_stable(caller, stable_amount);
            ledger.pool_stable = &ledger.pool_stable + stable_amount;
        }

        info!(
            provider = %caller.short(),
            collateral = %collateral_amount,
            stable = %stable_amount,
            "Liquidity provided"
        );
        StabilizationEngine::stabilize(ledger)
    }

    /// Withdraw previously contributed liquidity
    pub fn withdraw_liquidity(
        ledger: &mut Ledger,
        caller: &PublicKey,
        collateral_amount: &Amount,
        stable_amount: &Amount,
    ) -> Result<WithdrawOutcome> {
        validate_any_positive(collateral_amount, stable_amount, "liquidity")?;
        validate_sufficient(
            &ledger.pool_collateral_balance(caller),
            collateral_amount,
            "pool collateral contribution",
        )?;
        validate_sufficient(
            &ledger.pool_stable_balance(caller),
            stable_amount,
            "pool stable contribution",
        )?;

        if !collateral_amount.is_zero() {
            ledger.debit_pool_collateral(caller, collateral_amount)?;
            ledger.pool_collateral = ledger
                .pool_collateral
                .checked_sub(collateral_amount, "pool_collateral")?;
        }
        if !stable_amount.is_zero() {
            ledger.debit_pool_stable(caller, stable_amount)?;
            ledger.pool_stable = ledger.pool_stable.checked_sub(stable_amount, "pool_stable")?;
            ledger.credit_stable(caller, stable_amount);
        }

        info!(
            provider = %caller.short(),
            collateral = %collateral_amount,
            stable = %stable_amount,
            "Liquidity withdrawn"
        );
        Ok(WithdrawOutcome {
            collateral: collateral_amount.clone(),
            stable: stable_amount.clone(),
        })
    }
}
