//! Utility modules for the pegvault engine.
//!
//! This module contains shared utilities used across the engine:
//! - Fixed-point arithmetic
//! - Identity keys and hashing
//! - Validation helpers
//! - Constants

pub mod constants;
pub mod crypto;
pub mod math;
pub mod validation;

pub use constants::*;
pub use crypto::*;
pub use math::*;
pub use validation::*;
