//! Stability pool and peg defense.
//!
//! - `pool`: voluntary liquidity provision and withdrawal
//! - `stabilizer`: low / high / emergency corrections against the pool

pub mod pool;
pub mod stabilizer;

pub use pool::*;
pub use stabilizer::*;
