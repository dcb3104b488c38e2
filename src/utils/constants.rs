//! Engine constants and default parameters.
//!
//! All engine-wide constants are defined here for easy auditing. Ratios are
//! given in basis points and turned into fixed-point values against the
//! ledger's configured scale at the point of use.

// ═══════════════════════════════════════════════════════════════════════════════
// FIXED-POINT CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default fixed-point scale (1.0 = 10^18)
pub const DEFAULT_SCALE: u64 = 1_000_000_000_000_000_000;

/// Basis points divisor (10000 = 100%)
pub const BPS_DIVISOR: u64 = 10_000;

// ═══════════════════════════════════════════════════════════════════════════════
// PEG CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Lock when the synthetic price is at or below 0.95
pub const LOCK_LOW_BPS: u64 = 9_500;

/// Lock when the synthetic price is at or above 1.05
pub const LOCK_HIGH_BPS: u64 = 10_500;

/// Unlock band lower edge (0.99)
pub const UNLOCK_LOW_BPS: u64 = 9_900;

/// Unlock band upper edge (1.01)
pub const UNLOCK_HIGH_BPS: u64 = 10_100;

/// Emergency reserves are used below 0.98 after stabilization
pub const EMERGENCY_LOW_BPS: u64 = 9_800;

/// Emergency reserves are used above 1.02 after stabilization
pub const EMERGENCY_HIGH_BPS: u64 = 10_200;

// ═══════════════════════════════════════════════════════════════════════════════
// FEE CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Share of collected fees routed to the treasury - 5%
/// The remainder feeds the emergency reserve
pub const TREASURY_SHARE_BPS: u64 = 500;

// ═══════════════════════════════════════════════════════════════════════════════
// STABILIZATION CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// A single stabilization burns or mints at most supply / 10
pub const STABILIZE_SUPPLY_DIVISOR: u64 = 10;

/// Base reward rate credited per unit stabilized - 1%
pub const BASE_REWARD_RATE_BPS: u64 = 100;

// ═══════════════════════════════════════════════════════════════════════════════
// TIME CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Expected block interval in seconds
pub const BLOCK_TIME_SECS: u64 = 15;

/// Holding period between a mint and a burn - ~15 days
pub const HOLDING_PERIOD_BLOCKS: u64 = 15 * 24 * 3600 / BLOCK_TIME_SECS;

// ═══════════════════════════════════════════════════════════════════════════════
// ORACLE CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Maximum number of price submissions averaged into one update
pub const PRICE_AGGREGATION_SLOTS: usize = 20;

// ═══════════════════════════════════════════════════════════════════════════════
// CRYPTOGRAPHIC CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Length of a public key in bytes (compressed secp256k1)
pub const PUBKEY_LENGTH: usize = 33;

/// Length of a hash in bytes (SHA256)
pub const HASH_LENGTH: usize = 32;
