//! The ledger: every persistent cell of the engine.
//!
//! One explicitly constructed [`Ledger`] owns all numeric state: per-identity
//! balances, global supplies, fee and reserve buckets, the stability pool, the
//! lock flag and the set-once configuration cells. Lookups for identities that
//! were never touched return zero. The engine components borrow the ledger
//! mutably for the duration of one operation; the state machine stages each
//! operation on a clone so a failure never leaves partial writes behind.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::config::{ConfigCell, EngineParams};
use crate::core::peg::{self, LockState, PegController, PegThresholds};
use crate::error::{Error, Result};
use crate::utils::crypto::{Hash, PublicKey};
use crate::utils::math::Amount;

// ═══════════════════════════════════════════════════════════════════════════════
// CELL NAMES
// ═══════════════════════════════════════════════════════════════════════════════

/// Collateral ratio cell
pub const CELL_COLLATERAL_RATIO: &str = "CollateralRatio";
/// Governance identity cell
pub const CELL_GOVERNANCE: &str = "GovernanceIdentity";
/// Fixed-point scale cell
pub const CELL_DECIMALS: &str = "Decimals";
/// Fee rate cell
pub const CELL_FEE_RATE: &str = "FeeRate";

// ═══════════════════════════════════════════════════════════════════════════════
// LEDGER
// ═══════════════════════════════════════════════════════════════════════════════

/// All engine state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    pub(crate) params: EngineParams,

    // Set-once configuration
    pub(crate) collateral_ratio: ConfigCell<Amount>,
    pub(crate) governance: ConfigCell<PublicKey>,
    pub(crate) decimals: ConfigCell<Amount>,
    pub(crate) fee_rate: ConfigCell<Amount>,

    pub(crate) collateral_price: Amount,
    pub(crate) base_reward_rate: Amount,
    pub(crate) lock_state: LockState,

    // Supplies
    pub(crate) stable_supply: Amount,
    pub(crate) collateral_supply: Amount,

    // Transient fee buckets
    pub(crate) stable_fee_collected: Amount,
    pub(crate) collateral_fee_collected: Amount,

    // Permanent reserves
    pub(crate) treasury_stable: Amount,
    pub(crate) treasury_collateral: Amount,
    pub(crate) emergency_stable: Amount,
    pub(crate) emergency_collateral: Amount,

    // Stability pool aggregates
    pub(crate) pool_stable: Amount,
    pub(crate) pool_collateral: Amount,
    pub(crate) reward_pool: Amount,

    // Identity-keyed maps
    pub(crate) stable_balances: BTreeMap<PublicKey, Amount>,
    pub(crate) collateral_balances: BTreeMap<PublicKey, Amount>,
    pub(crate) pool_stable_balances: BTreeMap<PublicKey, Amount>,
    pub(crate) pool_collateral_balances: BTreeMap<PublicKey, Amount>,
    pub(crate) last_minted_at: BTreeMap<PublicKey, u64>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(EngineParams::default())
    }
}

impl Ledger {
    /// Create an uninitialized ledger
    pub fn new(params: EngineParams) -> Self {
        Self {
            params,
            collateral_ratio: ConfigCell::Unset,
            governance: ConfigCell::Unset,
            decimals: ConfigCell::Unset,
            fee_rate: ConfigCell::Unset,
            collateral_price: Amount::zero(),
            base_reward_rate: Amount::zero(),
            lock_state: LockState::Unlocked,
            stable_supply: Amount::zero(),
            collateral_supply: Amount::zero(),
            stable_fee_collected: Amount::zero(),
            collateral_fee_collected: Amount::zero(),
            treasury_stable: Amount::zero(),
            treasury_collateral: Amount::zero(),
            emergency_stable: Amount::zero(),
            emergency_collateral: Amount::zero(),
            pool_stable: Amount::zero(),
            pool_collateral: Amount::zero(),
            reward_pool: Amount::zero(),
            stable_balances: BTreeMap::new(),
            collateral_balances: BTreeMap::new(),
            pool_stable_balances: BTreeMap::new(),
            pool_collateral_balances: BTreeMap::new(),
            last_minted_at: BTreeMap::new(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIGURATION ACCESSORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Engine tunables
    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    /// True once `init` has bound the configuration cells
    pub fn is_initialized(&self) -> bool {
        self.decimals.is_set()
    }

    /// Fixed-point scale (the `Decimals` cell)
    pub fn scale(&self) -> Result<&Amount> {
        self.decimals.get(CELL_DECIMALS)
    }

    /// Required overcollateralization ratio
    pub fn collateral_ratio(&self) -> Result<&Amount> {
        self.collateral_ratio.get(CELL_COLLATERAL_RATIO)
    }

    /// Fee rate applied to mint, burn and transfer
    pub fn fee_rate(&self) -> Result<&Amount> {
        self.fee_rate.get(CELL_FEE_RATE)
    }

    /// Governance identity
    pub fn governance(&self) -> Result<&PublicKey> {
        self.governance.get(CELL_GOVERNANCE)
    }

    /// Collateral price in USD (scaled)
    pub fn collateral_price(&self) -> &Amount {
        &self.collateral_price
    }

    /// Stabilization reward rate (scaled)
    pub fn base_reward_rate(&self) -> &Amount {
        &self.base_reward_rate
    }

    /// Current lock state
    pub fn lock_state(&self) -> LockState {
        self.lock_state
    }

    /// True when gated operations are blocked
    pub fn is_locked(&self) -> bool {
        self.lock_state.is_locked()
    }

    /// Peg thresholds resolved against the scale
    pub fn thresholds(&self) -> Result<PegThresholds> {
        Ok(self.params.peg_bands.scaled(self.scale()?))
    }

    pub(crate) fn set_lock_state(&mut self, state: LockState) {
        self.lock_state = state;
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // AGGREGATE ACCESSORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Stable asset in circulation
    pub fn stable_supply(&self) -> &Amount {
        &self.stable_supply
    }

    /// Collateral backing the supply
    pub fn collateral_supply(&self) -> &Amount {
        &self.collateral_supply
    }

    /// Stable fees awaiting distribution
    pub fn stable_fee_collected(&self) -> &Amount {
        &self.stable_fee_collected
    }

    /// Collateral fees awaiting distribution
    pub fn collateral_fee_collected(&self) -> &Amount {
        &self.collateral_fee_collected
    }

    /// Treasury stable reserve
    pub fn treasury_stable(&self) -> &Amount {
        &self.treasury_stable
    }

    /// Treasury collateral reserve
    pub fn treasury_collateral(&self) -> &Amount {
        &self.treasury_collateral
    }

    /// Emergency stable reserve
    pub fn emergency_stable(&self) -> &Amount {
        &self.emergency_stable
    }

    /// Emergency collateral reserve
    pub fn emergency_collateral(&self) -> &Amount {
        &self.emergency_collateral
    }

    /// Stable held by the stability pool
    pub fn pool_stable(&self) -> &Amount {
        &self.pool_stable
    }

    /// Collateral held by the stability pool
    pub fn pool_collateral(&self) -> &Amount {
        &self.pool_collateral
    }

    /// Accumulated stabilization rewards
    pub fn reward_pool(&self) -> &Amount {
        &self.reward_pool
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // IDENTITY ACCESSORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Stable balance of `identity` (zero when absent)
    pub fn stable_balance(&self, identity: &PublicKey) -> Amount {
        lookup(&self.stable_balances, identity)
    }

    /// Collateral balance of `identity` (zero when absent)
    pub fn collateral_balance(&self, identity: &PublicKey) -> Amount {
        lookup(&self.collateral_balances, identity)
    }

    /// Collateral deposited by `identity` through minting
    pub fn collateral_deposited(&self, identity: &PublicKey) -> Amount {
        self.collateral_balance(identity)
    }

    /// Stable contributed to the stability pool by `identity`
    pub fn pool_stable_balance(&self, identity: &PublicKey) -> Amount {
        lookup(&self.pool_stable_balances, identity)
    }

    /// Collateral contributed to the stability pool by `identity`
    pub fn pool_collateral_balance(&self, identity: &PublicKey) -> Amount {
        lookup(&self.pool_collateral_balances, identity)
    }

    /// Block of the last mint by `identity`
    pub fn last_minted_at(&self, identity: &PublicKey) -> Option<u64> {
        self.last_minted_at.get(identity).copied()
    }

    /// Sum of all stable balances
    pub fn total_stable_balances(&self) -> Amount {
        self.stable_balances
            .values()
            .fold(Amount::zero(), |acc, v| acc + v.clone())
    }

    /// Sum of all collateral balances
    pub fn total_collateral_balances(&self) -> Amount {
        self.collateral_balances
            .values()
            .fold(Amount::zero(), |acc, v| acc + v.clone())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // DERIVED VALUES
    // ═══════════════════════════════════════════════════════════════════════════

    /// USD value of all collateral: `CollateralSupply × price / scale`
    pub fn total_collateral_value_usd(&self) -> Result<Amount> {
        self.collateral_supply
            .mul_div(&self.collateral_price, self.scale()?, "total_collateral_value")
    }

    /// Raw synthetic price (collateral value per stable unit)
    pub fn synthetic_price(&self) -> Result<Amount> {
        peg::synthetic_price(
            &self.collateral_supply,
            &self.collateral_price,
            &self.stable_supply,
            self.scale()?,
        )
    }

    /// Synthetic price on the configured peg basis, as the controller sees it
    pub fn peg_price(&self) -> Result<Amount> {
        PegController::measure(self)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // BALANCE MUTATION
    // ═══════════════════════════════════════════════════════════════════════════

    pub(crate) fn credit_stable(&mut self, identity: &PublicKey, amount: &Amount) {
        credit(&mut self.stable_balances, identity, amount);
    }

    pub(crate) fn debit_stable(&mut self, identity: &PublicKey, amount: &Amount) -> Result<()> {
        debit(&mut self.stable_balances, identity, amount, "stable balance")
    }

    pub(crate) fn credit_collateral(&mut self, identity: &PublicKey, amount: &Amount) {
        credit(&mut self.collateral_balances, identity, amount);
    }

    pub(crate) fn debit_collateral(&mut self, identity: &PublicKey, amount: &Amount) -> Result<()> {
        debit(&mut self.collateral_balances, identity, amount, "collateral balance")
    }

    pub(crate) fn credit_pool_stable(&mut self, identity: &PublicKey, amount: &Amount) {
        credit(&mut self.pool_stable_balances, identity, amount);
    }

    pub(crate) fn debit_pool_stable(&mut self, identity: &PublicKey, amount: &Amount) -> Result<()> {
        debit(&mut self.pool_stable_balances, identity, amount, "pool stable contribution")
    }

    pub(crate) fn credit_pool_collateral(&mut self, identity: &PublicKey, amount: &Amount) {
        credit(&mut self.pool_collateral_balances, identity, amount);
    }

    pub(crate) fn debit_pool_collateral(
        &mut self,
        identity: &PublicKey,
        amount: &Amount,
    ) -> Result<()> {
        debit(
            &mut self.pool_collateral_balances,
            identity,
            amount,
            "pool collateral contribution",
        )
    }

    pub(crate) fn record_mint(&mut self, identity: &PublicKey, height: u64) {
        self.last_minted_at.insert(*identity, height);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INTEGRITY
    // ═══════════════════════════════════════════════════════════════════════════

    /// Supply held by neither an account nor the pool: circulating fees and
    /// treasury / emergency stable
    pub fn unallocated_stable(&self) -> Amount {
        let allocated = &self.total_stable_balances() + &self.pool_stable;
        self.stable_supply.saturating_sub(&allocated)
    }

    /// Verify that no balance total exceeds its backing supply
    pub fn check_invariants(&self) -> Result<()> {
        let stable = self.total_stable_balances();
        if stable > self.stable_supply {
            return Err(Error::InvariantViolation(format!(
                "stable balances {} exceed supply {}",
                stable, self.stable_supply
            )));
        }
        if &stable + &self.pool_stable > self.stable_supply {
            return Err(Error::InvariantViolation(format!(
                "stable balances {} plus pool {} exceed supply {}",
                stable, self.pool_stable, self.stable_supply
            )));
        }
        let collateral = self.total_collateral_balances();
        if collateral > self.collateral_supply {
            return Err(Error::InvariantViolation(format!(
                "collateral balances {} exceed supply {}",
                collateral, self.collateral_supply
            )));
        }
        Ok(())
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Hash of the full ledger contents
    pub fn state_hash(&self) -> Result<Hash> {
        Ok(Hash::sha256(&self.to_bytes()?))
    }

    /// Snapshot of the aggregates for reporting
    pub fn summary(&self) -> LedgerSummary {
        LedgerSummary {
            initialized: self.is_initialized(),
            lock_state: self.lock_state,
            collateral_price: self.collateral_price.clone(),
            stable_supply: self.stable_supply.clone(),
            collateral_supply: self.collateral_supply.clone(),
            stable_fee_collected: self.stable_fee_collected.clone(),
            collateral_fee_collected: self.collateral_fee_collected.clone(),
            treasury_stable: self.treasury_stable.clone(),
            treasury_collateral: self.treasury_collateral.clone(),
            emergency_stable: self.emergency_stable.clone(),
            emergency_collateral: self.emergency_collateral.clone(),
            pool_stable: self.pool_stable.clone(),
            pool_collateral: self.pool_collateral.clone(),
            reward_pool: self.reward_pool.clone(),
            account_count: self.stable_balances.len(),
        }
    }
}

/// Aggregate view of the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSummary {
    /// Whether `init` has run
    pub initialized: bool,
    /// Lock state
    pub lock_state: LockState,
    /// Collateral price
    pub collateral_price: Amount,
    /// Stable supply
    pub stable_supply: Amount,
    /// Collateral supply
    pub collateral_supply: Amount,
    /// Stable fee bucket
    pub stable_fee_collected: Amount,
    /// Collateral fee bucket
    pub collateral_fee_collected: Amount,
    /// Treasury stable reserve
    pub treasury_stable: Amount,
    /// Treasury collateral reserve
    pub treasury_collateral: Amount,
    /// Emergency stable reserve
    pub emergency_stable: Amount,
    /// Emergency collateral reserve
    pub emergency_collateral: Amount,
    /// Pool stable aggregate
    pub pool_stable: Amount,
    /// Pool collateral aggregate
    pub pool_collateral: Amount,
    /// Reward pool
    pub reward_pool: Amount,
    /// Identities holding a stable balance entry
    pub account_count: usize,
}

fn lookup(map: &BTreeMap<PublicKey, Amount>, identity: &PublicKey) -> Amount {
    map.get(identity).cloned().unwrap_or_default()
}

fn credit(map: &mut BTreeMap<PublicKey, Amount>, identity: &PublicKey, amount: &Amount) {
    let entry = map.entry(*identity).or_default();
    *entry = &*entry + amount;
}

fn debit(
    map: &mut BTreeMap<PublicKey, Amount>,
    identity: &PublicKey,
    amount: &Amount,
    asset: &'static str,
) -> Result<()> {
    let current = lookup(map, identity);
    if &current < amount {
        return Err(Error::InsufficientBalance {
            asset,
            required: amount.to_string(),
            available: current.to_string(),
        });
    }
    map.insert(*identity, current.saturating_sub(amount));
    Ok(())
}
