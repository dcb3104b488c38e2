//! Protocol operations.
//!
//! One struct per external operation. The caller identity is the one the host
//! authenticated; signatures and replay protection belong to the host.

use serde::{Deserialize, Serialize};

use crate::utils::crypto::PublicKey;
use crate::utils::math::Amount;

// ═══════════════════════════════════════════════════════════════════════════════
// OPERATION TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Common surface of every operation
pub trait Operation {
    /// Operation type name
    fn operation_type(&self) -> &'static str;

    /// Identity that submitted the operation
    fn caller(&self) -> &PublicKey;

    /// True for operations refused while the system is locked
    fn is_gated(&self) -> bool {
        false
    }
}

macro_rules! impl_operation {
    ($ty:ty, $name:literal) => {
        impl_operation!($ty, $name, false);
    };
    ($ty:ty, $name:literal, $gated:literal) => {
        impl Operation for $ty {
            fn operation_type(&self) -> &'static str {
                $name
            }

            fn caller(&self) -> &PublicKey {
                &self.caller
            }

            fn is_gated(&self) -> bool {
                $gated
            }
        }
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIGURATION OPERATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Bind every configuration cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitOp {
    /// Submitter
    pub caller: PublicKey,
    /// Governance identity to bind
    pub governance: PublicKey,
    /// Collateral ratio (scaled)
    pub collateral_ratio: Amount,
    /// Fee rate (scaled)
    pub fee_rate: Amount,
    /// Fixed-point scale
    pub decimals: Amount,
}

/// Bind the governance identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetDaoOp {
    /// Submitter
    pub caller: PublicKey,
    /// Governance identity to bind
    pub governance: PublicKey,
}

/// Replace the collateral ratio (governance only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCollateralRatioOp {
    /// Submitter
    pub caller: PublicKey,
    /// New ratio
    pub ratio: Amount,
}

/// Publish a collateral price (governance only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCollateralPriceOp {
    /// Submitter
    pub caller: PublicKey,
    /// New price
    pub price: Amount,
}

/// Publish the floor average of up to 20 prices (governance only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCollateralPriceAggregatedOp {
    /// Submitter
    pub caller: PublicKey,
    /// Submitted prices
    pub prices: Vec<Amount>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// TOKEN OPERATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Mint stable against collateral
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintOp {
    /// Minter
    pub caller: PublicKey,
    /// Gross stable amount (fee included)
    pub stable_amount: Amount,
    /// Collateral offered
    pub provided_collateral: Amount,
}

/// Burn stable for collateral
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnOp {
    /// Burner
    pub caller: PublicKey,
    /// Stable amount debited
    pub stable_amount: Amount,
}

/// Transfer stable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOp {
    /// Sender
    pub caller: PublicKey,
    /// Recipient
    pub to: PublicKey,
    /// Amount debited from the sender
    pub amount: Amount,
}

/// Drain the fee buckets into treasury and emergency reserves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributeFeeOp {
    /// Submitter
    pub caller: PublicKey,
}

// ═══════════════════════════════════════════════════════════════════════════════
// STABILITY OPERATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Add pool liquidity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvideLiquidityOp {
    /// Provider
    pub caller: PublicKey,
    /// Collateral amount
    pub collateral_amount: Amount,
    /// Stable amount
    pub stable_amount: Amount,
}

/// Withdraw pool liquidity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawLiquidityOp {
    /// Provider
    pub caller: PublicKey,
    /// Collateral amount
    pub collateral_amount: Amount,
    /// Stable amount
    pub stable_amount: Amount,
}

/// Run a stabilization pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StabilizeOp {
    /// Submitter
    pub caller: PublicKey,
}

/// Re-evaluate the lock state and commit it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckPegOp {
    /// Submitter
    pub caller: PublicKey,
}

impl_operation!(InitOp, "Init");
impl_operation!(SetDaoOp, "SetDao");
impl_operation!(UpdateCollateralRatioOp, "UpdateCollateralRatio");
impl_operation!(UpdateCollateralPriceOp, "UpdateCollateralPrice");
impl_operation!(UpdateCollateralPriceAggregatedOp, "UpdateCollateralPriceAggregated");
impl_operation!(MintOp, "Mint", true);
impl_operation!(BurnOp, "Burn", true);
impl_operation!(TransferOp, "Transfer", true);
impl_operation!(DistributeFeeOp, "DistributeFee");
impl_operation!(ProvideLiquidityOp, "ProvideLiquidity");
impl_operation!(WithdrawLiquidityOp, "WithdrawLiquidity");
impl_operation!(StabilizeOp, "Stabilize");
impl_operation!(CheckPegOp, "CheckPeg");

// ═══════════════════════════════════════════════════════════════════════════════
// OPERATION ENUM
// ═══════════════════════════════════════════════════════════════════════════════

/// All possible protocol operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolOperation {
    /// `init`
    Init(InitOp),
    /// `setDAO`
    SetDao(SetDaoOp),
    /// `updateCollateralRatio`
    UpdateCollateralRatio(UpdateCollateralRatioOp),
    /// `updateCollateralPrice`
    UpdateCollateralPrice(UpdateCollateralPriceOp),
    /// Aggregated price update
    UpdateCollateralPriceAggregated(UpdateCollateralPriceAggregatedOp),
    /// `mint`
    Mint(MintOp),
    /// `burn`
    Burn(BurnOp),
    /// `transfer`
    Transfer(TransferOp),
    /// `distributeFee`
    DistributeFee(DistributeFeeOp),
    /// `provideLiquidity`
    ProvideLiquidity(ProvideLiquidityOp),
    /// `withdrawLiquidity`
    WithdrawLiquidity(WithdrawLiquidityOp),
    /// `stabilize`
    Stabilize(StabilizeOp),
    /// Explicit peg check
    CheckPeg(CheckPegOp),
}

impl ProtocolOperation {
    fn inner(&self) -> &dyn Operation {
        match self {
            Self::Init(op) => op,
            Self::SetDao(op) => op,
            Self::UpdateCollateralRatio(op) => op,
            Self::UpdateCollateralPrice(op) => op,
            Self::UpdateCollateralPriceAggregated(op) => op,
            Self::Mint(op) => op,
            Self::Burn(op) => op,
            Self::Transfer(op) => op,
            Self::DistributeFee(op) => op,
            Self::ProvideLiquidity(op) => op,
            Self::WithdrawLiquidity(op) => op,
            Self::Stabilize(op) => op,
            Self::CheckPeg(op) => op,
        }
    }

    /// Operation type name
    pub fn operation_type(&self) -> &'static str {
        self.inner().operation_type()
    }

    /// Submitter
    pub fn caller(&self) -> &PublicKey {
        self.inner().caller()
    }

    /// True for mint, burn and transfer
    pub fn is_gated(&self) -> bool {
        self.inner().is_gated()
    }
}
