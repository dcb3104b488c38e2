//! Governance binding.
//!
//! One-time initialization of the configuration cells and the privileged
//! identity, plus the two governance-gated updates (collateral price and
//! collateral ratio). Authentication of the caller happens upstream; here the
//! only check is identity equality against `GovernanceIdentity`.

use tracing::info;

use crate::core::ledger::{
    Ledger, CELL_COLLATERAL_RATIO, CELL_DECIMALS, CELL_FEE_RATE, CELL_GOVERNANCE,
};
use crate::core::peg::LockState;
use crate::error::{Error, Result};
use crate::utils::crypto::PublicKey;
use crate::utils::math::Amount;
use crate::utils::validation::{validate_governance, validate_identity, validate_positive};

// ═══════════════════════════════════════════════════════════════════════════════
// INIT PARAMETERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Arguments of `init`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitParams {
    /// Governance identity
    pub governance: PublicKey,
    /// Collateral ratio (scaled, 1.5 = 1.5 × decimals)
    pub collateral_ratio: Amount,
    /// Fee rate (scaled, 0.5% = 0.005 × decimals)
    pub fee_rate: Amount,
    /// Fixed-point scale
    pub decimals: Amount,
}

// ═══════════════════════════════════════════════════════════════════════════════
// GOVERNANCE
// ═══════════════════════════════════════════════════════════════════════════════

/// Configuration and privileged updates
pub struct Governance;

impl Governance {
    /// Bind every configuration cell and zero the aggregates
    pub fn init(ledger: &mut Ledger, params: &InitParams) -> Result<()> {
        let cells = [
            (ledger.collateral_ratio.is_set(), CELL_COLLATERAL_RATIO),
            (ledger.governance.is_set(), CELL_GOVERNANCE),
            (ledger.decimals.is_set(), CELL_DECIMALS),
            (ledger.fee_rate.is_set(), CELL_FEE_RATE),
        ];
        if let Some((_, cell)) = cells.iter().find(|(set, _)| *set) {
            return Err(Error::AlreadyInitialized { cell });
        }

        validate_identity(&params.governance, "governance")?;
        validate_positive(&params.collateral_ratio, "collateral_ratio")?;
        validate_positive(&params.fee_rate, "fee_rate")?;
        validate_positive(&params.decimals, "decimals")?;

        ledger
            .collateral_ratio
            .initialize(params.collateral_ratio.clone(), CELL_COLLATERAL_RATIO)?;
        ledger.governance.initialize(params.governance, CELL_GOVERNANCE)?;
        ledger.decimals.initialize(params.decimals.clone(), CELL_DECIMALS)?;
        ledger.fee_rate.initialize(params.fee_rate.clone(), CELL_FEE_RATE)?;

        ledger.stable_supply = Amount::zero();
        ledger.collateral_supply = Amount::zero();
        ledger.lock_state = LockState::Unlocked;
        ledger.base_reward_rate =
            Amount::from_bps(ledger.params.base_reward_rate_bps, &params.decimals);

        info!(
            governance = %params.governance.short(),
            ratio = %params.collateral_ratio,
            fee_rate = %params.fee_rate,
            decimals = %params.decimals,
            "Ledger initialized"
        );
        Ok(())
    }

    /// Bind the governance identity when `init` has not done so
    pub fn set_dao(ledger: &mut Ledger, identity: PublicKey) -> Result<()> {
        if ledger.governance.is_set() {
            return Err(Error::AlreadyInitialized {
                cell: CELL_GOVERNANCE,
            });
        }
        validate_identity(&identity, "governance")?;
        ledger.governance.initialize(identity, CELL_GOVERNANCE)?;
        info!(governance = %identity.short(), "Governance identity set");
        Ok(())
    }

    /// Replace the collateral ratio, returning the previous one
    pub fn update_collateral_ratio(
        ledger: &mut Ledger,
        caller: &PublicKey,
        ratio: Amount,
    ) -> Result<Amount> {
        if !ledger.collateral_ratio.is_set() {
            return Err(Error::NotInitialized {
                cell: CELL_COLLATERAL_RATIO,
            });
        }
        validate_governance(caller, ledger.governance()?, "update_collateral_ratio")?;
        validate_positive(&ratio, "collateral_ratio")?;

        let previous = ledger.collateral_ratio()?.clone();
        ledger.collateral_ratio.update(ratio.clone(), CELL_COLLATERAL_RATIO)?;
        info!(from = %previous, to = %ratio, "Collateral ratio updated");
        Ok(previous)
    }

    /// Publish a new collateral price, returning the previous one
    pub fn update_collateral_price(
        ledger: &mut Ledger,
        caller: &PublicKey,
        price: Amount,
    ) -> Result<Amount> {
        validate_governance(caller, ledger.governance()?, "update_collateral_price")?;
        info!(from = %ledger.collateral_price, to = %price, "Collateral price updated");
        Ok(std::mem::replace(&mut ledger.collateral_price, price))
    }
}
