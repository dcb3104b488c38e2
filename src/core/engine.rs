//! Mint / burn / transfer engine.
//!
//! Every gated operation first asks the [`PegController`] to re-evaluate the
//! lock state and aborts with [`Error::SystemLocked`] if the result is locked.
//! Fees are `amount × FeeRate / scale` and land in the transient stable fee
//! bucket; burns additionally hold back the collateral share that exceeds the
//! burned value and route it to the collateral fee bucket.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::ledger::Ledger;
use crate::core::peg::PegController;
use crate::error::{Error, Result};
use crate::utils::crypto::PublicKey;
use crate::utils::math::Amount;
use crate::utils::validation::{validate_identity, validate_positive, validate_sufficient};

// ═══════════════════════════════════════════════════════════════════════════════
// OUTCOMES
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of a mint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintOutcome {
    /// Stable credited to the caller
    pub minted: Amount,
    /// Fee retained in the stable fee bucket
    pub fee: Amount,
    /// Collateral locked (the provided surplus is not taken)
    pub collateral_locked: Amount,
}

/// Collateral split of a burn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Releasable {
    /// Collateral returned to the burner
    pub to_release: Amount,
    /// Collateral moved to the collateral fee bucket
    pub to_hold_back: Amount,
}

impl Releasable {
    /// Full share of collateral supply the burn retires
    pub fn total(&self) -> Amount {
        &self.to_release + &self.to_hold_back
    }
}

/// Result of a burn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnOutcome {
    /// Stable debited from the caller
    pub burned: Amount,
    /// Fee retained in the stable fee bucket
    pub fee: Amount,
    /// Collateral split
    pub collateral: Releasable,
}

/// Result of a transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOutcome {
    /// Stable credited to the recipient
    pub received: Amount,
    /// Fee retained in the stable fee bucket
    pub fee: Amount,
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENGINE
// ═══════════════════════════════════════════════════════════════════════════════

/// Mint, burn and transfer against a ledger
pub struct MintBurnEngine;

impl MintBurnEngine {
    /// `amount × FeeRate / scale`
    pub fn fee_for(ledger: &Ledger, amount: &Amount) -> Result<Amount> {
        amount.mul_div(ledger.fee_rate()?, ledger.scale()?, "fee")
    }

    /// `amount × CollateralRatio / CollateralPrice`
    pub fn required_collateral(ledger: &Ledger, amount: &Amount) -> Result<Amount> {
        let price = Self::nonzero_price(ledger)?;
        amount.mul_div(ledger.collateral_ratio()?, price, "required_collateral")
    }

    /// Collateral split for burning `amount` with `fee` against the current supplies
    pub fn releasable_collateral(ledger: &Ledger, amount: &Amount, fee: &Amount) -> Result<Releasable> {
        let scale = ledger.scale()?;
        let price = Self::nonzero_price(ledger)?;

        let burned = amount.checked_sub(fee, "burned_amount")?;
        let release_ratio = burned.mul_div(scale, ledger.stable_supply(), "release_ratio")?;
        let total = ledger
            .collateral_supply()
            .mul_div(&release_ratio, scale, "total_releasable")?;
        let to_release = burned.mul_div(scale, price, "collateral_to_release")?;
        let to_hold_back = total.checked_sub(&to_release, "collateral_to_hold_back")?;

        Ok(Releasable {
            to_release,
            to_hold_back,
        })
    }

    /// Mint `stable_amount` against `provided_collateral`
    pub fn mint(
        ledger: &mut Ledger,
        caller: &PublicKey,
        height: u64,
        stable_amount: &Amount,
        provided_collateral: &Amount,
    ) -> Result<MintOutcome> {
        PegController::ensure_unlocked(ledger)?;
        validate_positive(stable_amount, "stable_amount")?;
        validate_positive(provided_collateral, "provided_collateral")?;

        let required = Self::required_collateral(ledger, stable_amount)?;
        debug!(required = %required, provided = %provided_collateral, "Mint collateral check");
        if provided_collateral < &required {
            return Err(Error::InsufficientCollateral {
                required: required.to_string(),
                provided: provided_collateral.to_string(),
            });
        }

        let fee = Self::fee_for(ledger, stable_amount)?;
        let minted = stable_amount.checked_sub(&fee, "minted_amount")?;

        ledger.credit_stable(caller, &minted);
        ledger.credit_collateral(caller, &required);
        ledger.stable_supply = &ledger.stable_supply + &minted;
        ledger.collateral_supply = &ledger.collateral_supply + &required;
        ledger.stable_fee_collected = &ledger.stable_fee_collected + &fee;
        ledger.record_mint(caller, height);

        info!(
            caller = %caller.short(),
            minted = %minted,
            fee = %fee,
            collateral = %required,
            height,
            "Minted"
        );
        Ok(MintOutcome {
            minted,
            fee,
            collateral_locked: required,
        })
    }

    /// Burn `stable_amount` and release the matching collateral
    pub fn burn(
        ledger: &mut Ledger,
        caller: &PublicKey,
        height: u64,
        stable_amount: &Amount,
    ) -> Result<BurnOutcome> {
        PegController::ensure_unlocked(ledger)?;
        validate_positive(stable_amount, "stable_amount")?;
        validate_sufficient(&ledger.stable_balance(caller), stable_amount, "stable balance")?;
        Self::check_holding_period(ledger, caller, height)?;

        let fee = Self::fee_for(ledger, stable_amount)?;
        let collateral = Self::releasable_collateral(ledger, stable_amount, &fee)?;
        let burned = stable_amount.checked_sub(&fee, "burned_amount")?;
        debug!(
            fee = %fee,
            to_release = %collateral.to_release,
            to_hold_back = %collateral.to_hold_back,
            "Burn collateral split"
        );

        ledger.debit_stable(caller, stable_amount)?;
        ledger.stable_supply = ledger.stable_supply.checked_sub(&burned, "stable_supply")?;
        ledger.stable_fee_collected = &ledger.stable_fee_collected + &fee;

        let retired = collateral.total();
        ledger.debit_collateral(caller, &retired)?;
        ledger.collateral_supply = ledger
            .collateral_supply
            .checked_sub(&retired, "collateral_supply")?;
        ledger.collateral_fee_collected =
            &ledger.collateral_fee_collected + &collateral.to_hold_back;

        info!(
            caller = %caller.short(),
            burned = %stable_amount,
            fee = %fee,
            released = %collateral.to_release,
            held_back = %collateral.to_hold_back,
            "Burned"
        );
        Ok(BurnOutcome {
            burned: stable_amount.clone(),
            fee,
            collateral,
        })
    }

    /// Move `amount` from `caller` to `to`, less the fee
    pub fn transfer(
        ledger: &mut Ledger,
        caller: &PublicKey,
        to: &PublicKey,
        amount: &Amount,
    ) -> Result<TransferOutcome> {
        PegController::ensure_unlocked(ledger)?;
        validate_positive(amount, "amount")?;
        validate_identity(to, "recipient")?;
        validate_sufficient(&ledger.stable_balance(caller), amount, "stable balance")?;

        let fee = Self::fee_for(ledger, amount)?;
        let received = amount.checked_sub(&fee, "transfer_amount")?;

        ledger.debit_stable(caller, amount)?;
        ledger.credit_stable(to, &received);
        ledger.stable_fee_collected = &ledger.stable_fee_collected + &fee;

        info!(
            from = %caller.short(),
            to = %to.short(),
            amount = %amount,
            fee = %fee,
            "Transferred"
        );
        Ok(TransferOutcome { received, fee })
    }

    /// Burns require `height − LastMintedAtBlock > holding period`
    fn check_holding_period(ledger: &Ledger, caller: &PublicKey, height: u64) -> Result<()> {
        let Some(minted_at) = ledger.last_minted_at(caller) else {
            return Ok(());
        };
        let holding = ledger.params().holding_period_blocks;
        if height.saturating_sub(minted_at) <= holding {
            return Err(Error::TimelockNotElapsed {
                minted_at,
                unlocks_after: minted_at.saturating_add(holding),
            });
        }
        Ok(())
    }

    fn nonzero_price(ledger: &Ledger) -> Result<&Amount> {
        let price = ledger.collateral_price();
        if price.is_zero() {
            return Err(Error::PriceNotSet);
        }
        Ok(price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineParams;
    use crate::error::ErrorKind;
    use crate::governance::{Governance, InitParams};
    use crate::utils::constants::DEFAULT_SCALE;
    use crate::utils::crypto::KeyPair;

    const HOLDING: u64 = 10;

    fn s() -> Amount {
        Amount::from_u64(DEFAULT_SCALE)
    }

    fn units(n: u64) -> Amount {
        Amount::from_units(n, &s())
    }

    fn setup() -> (Ledger, PublicKey) {
        let dao = *KeyPair::generate().public_key();
        let mut ledger = Ledger::new(EngineParams::default().with_holding_period(HOLDING));
        Governance::init(
            &mut ledger,
            &InitParams {
                governance: dao,
                collateral_ratio: Amount::from_bps(15_000, &s()),
                fee_rate: Amount::from_bps(50, &s()),
                decimals: s(),
            },
        )
        .unwrap();
        Governance::update_collateral_price(&mut ledger, &dao, units(1)).unwrap();
        (ledger, dao)
    }

    #[test]
    fn test_mint() {
        let (mut ledger, a) = setup();
        let out = MintBurnEngine::mint(&mut ledger, &a, 1, &units(1000), &units(1600)).unwrap();

        assert_eq!(out.collateral_locked, units(1500));
        assert_eq!(out.fee, units(5));
        assert_eq!(out.minted, units(995));
        assert_eq!(ledger.stable_balance(&a), units(995));
        assert_eq!(ledger.collateral_balance(&a), units(1500));
        assert_eq!(ledger.stable_supply(), &units(995));
        assert_eq!(ledger.collateral_supply(), &units(1500));
        assert_eq!(ledger.stable_fee_collected(), &units(5));
        assert_eq!(ledger.last_minted_at(&a), Some(1));
    }

    #[test]
    fn test_mint_insufficient_collateral() {
        let (mut ledger, a) = setup();
        let just_short = units(1500).saturating_sub(&Amount::from_u64(1));
        let err = MintBurnEngine::mint(&mut ledger, &a, 1, &units(1000), &just_short).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
        assert!(ledger.stable_supply().is_zero());
    }

    #[test]
    fn test_mint_zero_amounts() {
        let (mut ledger, a) = setup();
        assert!(matches!(
            MintBurnEngine::mint(&mut ledger, &a, 1, &Amount::zero(), &units(1)),
            Err(Error::ZeroAmount { .. })
        ));
        assert!(matches!(
            MintBurnEngine::mint(&mut ledger, &a, 1, &units(1), &Amount::zero()),
            Err(Error::ZeroAmount { .. })
        ));
    }

    #[test]
    fn test_mint_without_price() {
        let (mut ledger, a) = setup();
        ledger.collateral_price = Amount::zero();
        let err = MintBurnEngine::mint(&mut ledger, &a, 1, &units(1), &units(2)).unwrap_err();
        assert_eq!(err, Error::PriceNotSet);
    }

    #[test]
    fn test_burn_timelock() {
        let (mut ledger, a) = setup();
        MintBurnEngine::mint(&mut ledger, &a, 5, &units(1000), &units(1600)).unwrap();

        for height in [5, 5 + HOLDING] {
            let err = MintBurnEngine::burn(&mut ledger, &a, height, &units(500)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::TimelockNotElapsed);
        }
        assert!(MintBurnEngine::burn(&mut ledger, &a, 6 + HOLDING, &units(500)).is_ok());
    }

    #[test]
    fn test_burn_releases_collateral() {
        let (mut ledger, a) = setup();
        MintBurnEngine::mint(&mut ledger, &a, 1, &units(1000), &units(1600)).unwrap();
        let out = MintBurnEngine::burn(&mut ledger, &a, 2 + HOLDING, &units(500)).unwrap();

        let half = Amount::from_bps(5_000, &s());
        let released = &units(497) + &half;
        let held = &units(252) + &half;
        assert_eq!(out.fee, &units(2) + &half);
        assert_eq!(out.collateral.to_release, released);
        assert_eq!(out.collateral.to_hold_back, held);

        assert_eq!(ledger.stable_balance(&a), units(495));
        assert_eq!(ledger.stable_supply(), &released);
        assert_eq!(ledger.collateral_balance(&a), units(750));
        assert_eq!(ledger.collateral_supply(), &units(750));
        assert_eq!(ledger.collateral_fee_collected(), &held);
        assert_eq!(ledger.stable_fee_collected(), &(&units(7) + &half));
        ledger.check_invariants().unwrap();
    }

    #[test]
    fn test_burn_more_than_balance() {
        let (mut ledger, a) = setup();
        MintBurnEngine::mint(&mut ledger, &a, 1, &units(100), &units(150)).unwrap();
        let err = MintBurnEngine::burn(&mut ledger, &a, 2 + HOLDING, &units(100)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    }

    #[test]
    fn test_transfer() {
        let (mut ledger, a) = setup();
        let b = *KeyPair::generate().public_key();
        MintBurnEngine::mint(&mut ledger, &a, 1, &units(1000), &units(1500)).unwrap();

        let out = MintBurnEngine::transfer(&mut ledger, &a, &b, &units(200)).unwrap();
        assert_eq!(out.fee, units(1));
        assert_eq!(ledger.stable_balance(&a), units(795));
        assert_eq!(ledger.stable_balance(&b), units(199));
        assert_eq!(ledger.stable_supply(), &units(995));
        assert_eq!(ledger.stable_fee_collected(), &units(6));

        assert!(MintBurnEngine::transfer(&mut ledger, &a, &PublicKey::empty(), &units(1)).is_err());
        assert!(MintBurnEngine::transfer(&mut ledger, &b, &a, &units(200)).is_err());
    }

    #[test]
    fn test_gated_operations_abort_when_locked() {
        let (mut ledger, a) = setup();
        let dao = *ledger.governance().unwrap();
        MintBurnEngine::mint(&mut ledger, &a, 1, &units(1000), &units(1500)).unwrap();

        // Collateral value halves: far below peg
        Governance::update_collateral_price(&mut ledger, &dao, Amount::from_bps(5_000, &s())).unwrap();
        let err = MintBurnEngine::transfer(&mut ledger, &a, &dao, &units(1)).unwrap_err();
        assert!(matches!(err, Error::SystemLocked { .. }));
        assert!(ledger.is_locked());
    }
}
