//! Oracle price aggregation.
//!
//! The engine consumes a price that governance has already authenticated.
//! This module only reduces a batch of submissions to the value governance
//! publishes.

pub mod aggregator;

pub use aggregator::*;
