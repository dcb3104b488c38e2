//! Price aggregation.
//!
//! Collects up to [`PRICE_AGGREGATION_SLOTS`] price submissions and reduces
//! them to their floor average. Empty slots are ignored, so the divisor is the
//! number of prices actually submitted. The aggregated value is published by
//! governance like any other price update.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::utils::constants::PRICE_AGGREGATION_SLOTS;
use crate::utils::crypto::Hash;
use crate::utils::math::Amount;
use crate::utils::validation::validate_positive;

// ═══════════════════════════════════════════════════════════════════════════════
// AGGREGATION RESULT
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of price aggregation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationResult {
    /// Floor average of the submitted prices
    pub price: Amount,
    /// Number of prices averaged
    pub source_count: usize,
    /// Hash of the submitted prices, in submission order
    pub sources_hash: Hash,
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRICE AGGREGATOR
// ═══════════════════════════════════════════════════════════════════════════════

/// Fixed-capacity price collector
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceAggregator {
    prices: Vec<Amount>,
}

impl PriceAggregator {
    /// Create an empty aggregator
    pub fn new() -> Self {
        Self {
            prices: Vec::with_capacity(PRICE_AGGREGATION_SLOTS),
        }
    }

    /// Build from a batch of prices
    pub fn from_prices(prices: &[Amount]) -> Result<Self> {
        let mut aggregator = Self::new();
        for price in prices {
            aggregator.submit(price.clone())?;
        }
        Ok(aggregator)
    }

    /// Add one price; zero prices and a full aggregator are rejected
    pub fn submit(&mut self, price: Amount) -> Result<()> {
        validate_positive(&price, "price")?;
        if self.is_full() {
            return Err(Error::InvalidParameter {
                name: "prices".into(),
                reason: format!("at most {} prices per aggregation", PRICE_AGGREGATION_SLOTS),
            });
        }
        self.prices.push(price);
        Ok(())
    }

    /// Number of submitted prices
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// True when nothing was submitted
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// True when every slot is taken
    pub fn is_full(&self) -> bool {
        self.prices.len() >= PRICE_AGGREGATION_SLOTS
    }

    /// Floor average of the submitted prices
    pub fn aggregate(&self) -> Result<AggregationResult> {
        if self.prices.is_empty() {
            return Err(Error::InvalidParameter {
                name: "prices".into(),
                reason: "no prices submitted".into(),
            });
        }

        let sum = self
            .prices
            .iter()
            .fold(Amount::zero(), |acc, p| acc + p.clone());
        let price = sum.div_u64(self.prices.len() as u64, "price_average")?;

        let encoded =
            bincode::serialize(&self.prices).map_err(|e| Error::Serialization(e.to_string()))?;
        let result = AggregationResult {
            price,
            source_count: self.prices.len(),
            sources_hash: Hash::sha256(&encoded),
        };
        debug!(price = %result.price, sources = result.source_count, "Prices aggregated");
        Ok(result)
    }

    /// Aggregate and clear for the next round
    pub fn finalize(&mut self) -> Result<AggregationResult> {
        let result = self.aggregate()?;
        self.prices.clear();
        Ok(result)
    }
}
