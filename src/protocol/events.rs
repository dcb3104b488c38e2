//! Protocol events.
//!
//! Every committed operation appends one or more events to the current
//! block's [`EventLog`]. Aborted operations emit nothing.

use serde::{Deserialize, Serialize};

use crate::core::fees::FeeDistribution;
use crate::core::peg::LockState;
use crate::stability::stabilizer::StabilizationReport;
use crate::utils::crypto::{Hash, PublicKey};
use crate::utils::math::Amount;

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// All protocol event types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolEvent {
    // Configuration
    /// Configuration cells bound
    Initialized(InitializedEvent),
    /// Governance identity bound by `setDAO`
    DaoSet(DaoSetEvent),
    /// Collateral ratio replaced
    CollateralRatioUpdated(CollateralRatioUpdatedEvent),
    /// Collateral price published
    PriceUpdated(PriceUpdatedEvent),

    // Stable token
    /// Stable minted against collateral
    Minted(MintedEvent),
    /// Stable burned for collateral
    Burned(BurnedEvent),
    /// Stable moved between identities
    Transferred(TransferredEvent),
    /// Fee buckets drained
    FeesDistributed(FeesDistributedEvent),

    // Stability pool
    /// Liquidity added to the pool
    LiquidityProvided(LiquidityEvent),
    /// Liquidity taken out of the pool
    LiquidityWithdrawn(LiquidityEvent),
    /// A stabilization pass changed state
    Stabilized(StabilizedEvent),

    // Peg
    /// The lock automaton moved
    LockStateChanged(LockStateChangedEvent),
}

impl ProtocolEvent {
    /// Event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Initialized(_) => "Initialized",
            Self::DaoSet(_) => "DaoSet",
            Self::CollateralRatioUpdated(_) => "CollateralRatioUpdated",
            Self::PriceUpdated(_) => "PriceUpdated",
            Self::Minted(_) => "Minted",
            Self::Burned(_) => "Burned",
            Self::Transferred(_) => "Transferred",
            Self::FeesDistributed(_) => "FeesDistributed",
            Self::LiquidityProvided(_) => "LiquidityProvided",
            Self::LiquidityWithdrawn(_) => "LiquidityWithdrawn",
            Self::Stabilized(_) => "Stabilized",
            Self::LockStateChanged(_) => "LockStateChanged",
        }
    }

    /// Block the event was committed in
    pub fn block_height(&self) -> u64 {
        match self {
            Self::Initialized(e) => e.block_height,
            Self::DaoSet(e) => e.block_height,
            Self::CollateralRatioUpdated(e) => e.block_height,
            Self::PriceUpdated(e) => e.block_height,
            Self::Minted(e) => e.block_height,
            Self::Burned(e) => e.block_height,
            Self::Transferred(e) => e.block_height,
            Self::FeesDistributed(e) => e.block_height,
            Self::LiquidityProvided(e) => e.block_height,
            Self::LiquidityWithdrawn(e) => e.block_height,
            Self::Stabilized(e) => e.block_height,
            Self::LockStateChanged(e) => e.block_height,
        }
    }

    /// sha256 of the bincode encoding
    pub fn hash(&self) -> Hash {
        let data = bincode::serialize(self).unwrap_or_default();
        Hash::sha256(&data)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT PAYLOADS
// ═══════════════════════════════════════════════════════════════════════════════

/// `init` committed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializedEvent {
    /// Governance identity
    pub governance: PublicKey,
    /// Collateral ratio
    pub collateral_ratio: Amount,
    /// Fee rate
    pub fee_rate: Amount,
    /// Fixed-point scale
    pub decimals: Amount,
    /// Block height
    pub block_height: u64,
}

/// `setDAO` committed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaoSetEvent {
    /// Governance identity
    pub governance: PublicKey,
    /// Block height
    pub block_height: u64,
}

/// Collateral ratio replaced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralRatioUpdatedEvent {
    /// Previous ratio
    pub previous: Amount,
    /// New ratio
    pub ratio: Amount,
    /// Block height
    pub block_height: u64,
}

/// Collateral price published
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceUpdatedEvent {
    /// Previous price
    pub previous: Amount,
    /// New price
    pub price: Amount,
    /// Number of submissions averaged (1 for a direct update)
    pub source_count: usize,
    /// Block height
    pub block_height: u64,
}

/// Stable minted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintedEvent {
    /// Minter
    pub caller: PublicKey,
    /// Stable credited (after fee)
    pub minted: Amount,
    /// Fee retained
    pub fee: Amount,
    /// Collateral locked
    pub collateral_locked: Amount,
    /// Block height
    pub block_height: u64,
}

/// Stable burned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnedEvent {
    /// Burner
    pub caller: PublicKey,
    /// Stable debited
    pub burned: Amount,
    /// Fee retained
    pub fee: Amount,
    /// Collateral returned to the burner
    pub collateral_released: Amount,
    /// Collateral moved to the collateral fee bucket
    pub collateral_held_back: Amount,
    /// Block height
    pub block_height: u64,
}

/// Stable transferred
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferredEvent {
    /// Sender
    pub from: PublicKey,
    /// Recipient
    pub to: PublicKey,
    /// Amount debited from the sender
    pub amount: Amount,
    /// Fee retained
    pub fee: Amount,
    /// Block height
    pub block_height: u64,
}

/// Fee buckets drained
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeesDistributedEvent {
    /// Amounts moved
    pub distribution: FeeDistribution,
    /// Block height
    pub block_height: u64,
}

/// Pool liquidity moved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityEvent {
    /// Liquidity provider
    pub provider: PublicKey,
    /// Collateral amount
    pub collateral: Amount,
    /// Stable amount
    pub stable: Amount,
    /// Block height
    pub block_height: u64,
}

/// Stabilization pass with an effect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StabilizedEvent {
    /// What the pass did
    pub report: StabilizationReport,
    /// Block height
    pub block_height: u64,
}

/// Lock automaton transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockStateChangedEvent {
    /// State before
    pub from: LockState,
    /// State after
    pub to: LockState,
    /// Peg price that caused the transition
    pub price: Amount,
    /// Block height
    pub block_height: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT LOG
// ═══════════════════════════════════════════════════════════════════════════════

/// Ordered events of one block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<ProtocolEvent>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Add an event to the log
    pub fn push(&mut self, event: ProtocolEvent) {
        self.events.push(event);
    }

    /// All events, in commit order
    pub fn events(&self) -> &[ProtocolEvent] {
        &self.events
    }

    /// Events of a specific type
    pub fn filter_by_type(&self, event_type: &str) -> Vec<&ProtocolEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Append another log
    pub fn merge(&mut self, other: EventLog) {
        self.events.extend(other.events);
    }

    /// Drop all events
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Hash chaining every event hash in order; the empty log digests to zero
    pub fn digest(&self) -> Hash {
        if self.events.is_empty() {
            return Hash::default();
        }
        let mut data = Vec::with_capacity(self.events.len() * 32);
        for event in &self.events {
            data.extend_from_slice(event.hash().as_bytes());
        }
        Hash::sha256(&data)
    }
}

impl IntoIterator for EventLog {
    type Item = ProtocolEvent;
    type IntoIter = std::vec::IntoIter<ProtocolEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}
