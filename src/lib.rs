//! # pegvault
//!
//! The economic engine of an overcollateralized synthetic dollar: account
//! balances, collateral accounting, a peg lock automaton driven by a
//! governance-published price, fee reserves and a stability pool that
//! defends the peg.
//!
//! ## Architecture
//!
//! - **Core**: fixed-point ledger, configuration cells, peg controller,
//!   mint / burn / transfer engine, fee distributor
//! - **Stability**: liquidity pool and the stabilization engine
//! - **Governance**: initialisation and privileged updates
//! - **Oracle**: aggregation of governance price submissions
//! - **Protocol**: atomic operation execution, events, block processing
//! - **Storage**: ledger snapshots over in-memory or file backends
//!
//! ## Example
//!
//! ```rust,ignore
//! use pegvault::prelude::*;
//! use pegvault::storage::InMemoryStore;
//!
//! let mut machine = ProtocolStateMachine::new(InMemoryStore::new())?;
//! machine.begin_block(1)?;
//! machine.execute(ProtocolOperation::Mint(MintOp {
//!     caller,
//!     stable_amount,
//!     provided_collateral,
//! }))?;
//! let events = machine.end_block()?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    unused_lifetimes,
    unused_qualifications
)]

pub mod cli;
pub mod core;
pub mod error;
pub mod governance;
pub mod oracle;
pub mod protocol;
pub mod stability;
pub mod storage;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        config::{ConfigCell, EngineParams},
        engine::{BurnOutcome, MintBurnEngine, MintOutcome, Releasable, TransferOutcome},
        fees::{FeeDistribution, FeeDistributor},
        ledger::{Ledger, LedgerSummary},
        peg::{LockState, PegBands, PegBasis, PegController},
    };
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::governance::{Governance, InitParams};
    pub use crate::oracle::aggregator::PriceAggregator;
    pub use crate::protocol::{
        events::{EventLog, ProtocolEvent},
        operations::*,
        state_machine::{OperationResult, ProtocolStateMachine},
    };
    pub use crate::stability::{
        pool::{StabilityPool, WithdrawOutcome},
        stabilizer::{
            EmergencyAction, StabilizationAction, StabilizationEngine, StabilizationReport,
        },
    };
    pub use crate::utils::{
        crypto::{Hash, PublicKey},
        math::Amount,
    };
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = "pegvault";
