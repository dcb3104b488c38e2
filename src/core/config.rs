//! Engine configuration.
//!
//! Configuration comes in two flavours:
//! - Set-once cells (`CollateralRatio`, `GovernanceIdentity`, `Decimals`,
//!   `FeeRate`) bound at `init` and held in [`ConfigCell`]
//! - Engine tunables ([`EngineParams`]) fixed when the ledger is created,
//!   loadable from JSON and `PEGVAULT_*` environment variables

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::peg::{PegBands, PegBasis};
use crate::error::{Error, Result};
use crate::utils::constants::*;
use crate::utils::validation::{validate_ascending, validate_bps};

// ═══════════════════════════════════════════════════════════════════════════════
// SET-ONCE CELLS
// ═══════════════════════════════════════════════════════════════════════════════

/// A configuration value with an explicit initialized tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigCell<T> {
    /// Not yet bound by `init`
    Unset,
    /// Bound value
    Set(T),
}

impl<T> Default for ConfigCell<T> {
    fn default() -> Self {
        ConfigCell::Unset
    }
}

impl<T: Clone + PartialEq> ConfigCell<T> {
    /// Check whether the cell holds a value
    pub fn is_set(&self) -> bool {
        matches!(self, ConfigCell::Set(_))
    }

    /// Current value, if any
    pub fn value(&self) -> Option<&T> {
        match self {
            ConfigCell::Set(v) => Some(v),
            ConfigCell::Unset => None,
        }
    }

    /// Current value, or `NotInitialized` naming `cell`
    pub fn get(&self, cell: &'static str) -> Result<&T> {
        self.value().ok_or(Error::NotInitialized { cell })
    }

    /// Bind the cell; fails if it is already set
    pub fn initialize(&mut self, value: T, cell: &'static str) -> Result<()> {
        if self.is_set() {
            return Err(Error::AlreadyInitialized { cell });
        }
        *self = ConfigCell::Set(value);
        Ok(())
    }

    /// Replace a bound value; the cell must be set and the value must change
    pub fn update(&mut self, value: T, cell: &'static str) -> Result<()> {
        match self {
            ConfigCell::Unset => Err(Error::NotInitialized { cell }),
            ConfigCell::Set(current) if *current == value => Err(Error::NoOpUpdate { cell }),
            ConfigCell::Set(current) => {
                *current = value;
                Ok(())
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENGINE PARAMETERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Environment variable prefix for parameter overrides
pub const ENV_PREFIX: &str = "PEGVAULT_";

/// Tunables fixed at ledger creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineParams {
    /// Share of distributed fees sent to treasury (basis points)
    pub treasury_share_bps: u64,

    /// Blocks that must pass after a mint before the minter may burn
    pub holding_period_blocks: u64,

    /// Lock, unlock and emergency thresholds
    pub peg_bands: PegBands,

    /// What the synthetic price is measured against
    pub peg_basis: PegBasis,

    /// Stabilization moves at most `supply / divisor` per call
    pub stabilize_supply_divisor: u64,

    /// Base reward rate for stabilization (basis points of the scale)
    pub base_reward_rate_bps: u64,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            treasury_share_bps: TREASURY_SHARE_BPS,
            holding_period_blocks: HOLDING_PERIOD_BLOCKS,
            peg_bands: PegBands::default(),
            peg_basis: PegBasis::default(),
            stabilize_supply_divisor: STABILIZE_SUPPLY_DIVISOR,
            base_reward_rate_bps: BASE_REWARD_RATE_BPS,
        }
    }
}

impl EngineParams {
    /// Builder: custom holding period (tests, short-lived networks)
    pub fn with_holding_period(mut self, blocks: u64) -> Self {
        self.holding_period_blocks = blocks;
        self
    }

    /// Builder: custom peg basis
    pub fn with_peg_basis(mut self, basis: PegBasis) -> Self {
        self.peg_basis = basis;
        self
    }

    /// Validate parameters are consistent
    pub fn validate(&self) -> Result<()> {
        validate_bps(self.treasury_share_bps, BPS_DIVISOR, "treasury_share_bps")?;

        let bands = &self.peg_bands;
        validate_ascending(
            &[
                bands.lock_low_bps,
                bands.emergency_low_bps,
                bands.unlock_low_bps,
                BPS_DIVISOR,
                bands.unlock_high_bps,
                bands.emergency_high_bps,
                bands.lock_high_bps,
            ],
            "peg_bands",
        )?;

        if self.stabilize_supply_divisor == 0 {
            return Err(Error::InvalidParameter {
                name: "stabilize_supply_divisor".into(),
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }

    /// Load parameters from a JSON file; missing fields take defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Storage(format!("read {}: {}", path.display(), e)))?;
        let params: Self = serde_json::from_str(&content)
            .map_err(|e| Error::Deserialization(format!("{}: {}", path.display(), e)))?;
        params.validate()?;
        Ok(params)
    }

    /// Save parameters as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content =
            serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))?;
        std::fs::write(path, content)
            .map_err(|e| Error::Storage(format!("write {}: {}", path.display(), e)))
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Apply `PEGVAULT_*` environment overrides on top of `self`
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(v) = env_u64("TREASURY_SHARE_BPS")? {
            self.treasury_share_bps = v;
        }
        if let Some(v) = env_u64("HOLDING_PERIOD_BLOCKS")? {
            self.holding_period_blocks = v;
        }
        if let Some(v) = env_u64("STABILIZE_SUPPLY_DIVISOR")? {
            self.stabilize_supply_divisor = v;
        }
        if let Some(v) = env_u64("BASE_REWARD_RATE_BPS")? {
            self.base_reward_rate_bps = v;
        }
        if let Ok(basis) = std::env::var(format!("{}PEG_BASIS", ENV_PREFIX)) {
            self.peg_basis = basis.parse()?;
        }
        self.validate()?;
        Ok(self)
    }
}

fn env_u64(name: &str) -> Result<Option<u64>> {
    let key = format!("{}{}", ENV_PREFIX, name);
    match std::env::var(&key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::InvalidParameter {
                name: key,
                reason: format!("'{}': {}", raw, e),
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_cell_initialize_once() {
        let mut cell: ConfigCell<u64> = ConfigCell::default();
        assert!(!cell.is_set());
        assert!(matches!(cell.get("fee_rate"), Err(Error::NotInitialized { cell: "fee_rate" })));

        cell.initialize(5, "fee_rate").unwrap();
        assert_eq!(cell.get("fee_rate").unwrap(), &5);

        let err = cell.initialize(6, "fee_rate").unwrap_err();
        assert!(matches!(err, Error::AlreadyInitialized { cell: "fee_rate" }));
        assert_eq!(cell.value(), Some(&5));
    }

    #[test]
    fn test_config_cell_update() {
        let mut cell: ConfigCell<u64> = ConfigCell::Unset;
        assert!(matches!(cell.update(1, "ratio"), Err(Error::NotInitialized { .. })));

        cell.initialize(150, "ratio").unwrap();
        assert!(matches!(cell.update(150, "ratio"), Err(Error::NoOpUpdate { .. })));

        cell.update(200, "ratio").unwrap();
        assert_eq!(cell.value(), Some(&200));
    }

    #[test]
    fn test_engine_params_default() {
        let params = EngineParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.treasury_share_bps, TREASURY_SHARE_BPS);
        assert_eq!(params.holding_period_blocks, HOLDING_PERIOD_BLOCKS);
        assert_eq!(params.peg_basis, PegBasis::CollateralRatio);
    }

    #[test]
    fn test_engine_params_validation() {
        let mut params = EngineParams::default();
        params.peg_bands.unlock_low_bps = params.peg_bands.lock_low_bps;
        assert!(params.validate().is_err());

        let mut params = EngineParams::default();
        params.stabilize_supply_divisor = 0;
        assert!(params.validate().is_err());

        let mut params = EngineParams::default();
        params.treasury_share_bps = BPS_DIVISOR + 1;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_engine_params_file_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("params.json");

        let params = EngineParams::default()
            .with_holding_period(10)
            .with_peg_basis(PegBasis::Absolute);
        params.save(&path).unwrap();

        assert_eq!(EngineParams::load(&path).unwrap(), params);
    }

    #[test]
    fn test_engine_params_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(&path, r#"{ "holding_period_blocks": 3 }"#).unwrap();

        let params = EngineParams::load(&path).unwrap();
        assert_eq!(params.holding_period_blocks, 3);
        assert_eq!(params.treasury_share_bps, TREASURY_SHARE_BPS);
    }

    #[test]
    fn test_engine_params_missing_file() {
        let err = EngineParams::load("/nonexistent/params.json").unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }
}
