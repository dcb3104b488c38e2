//! Protocol orchestration.
//!
//! Operations enter through [`ProtocolStateMachine::execute`], which applies
//! them atomically, records their events and persists the ledger per block.

pub mod events;
pub mod operations;
pub mod state_machine;

pub use events::*;
pub use operations::*;
pub use state_machine::*;
