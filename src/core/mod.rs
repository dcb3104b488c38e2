//! Core modules for the pegvault engine.
//!
//! This module contains the fundamental building blocks:
//! - Configuration cells and engine parameters
//! - The ledger holding every persistent cell
//! - The peg lock automaton
//! - Mint / burn / transfer engine
//! - Fee distribution

pub mod config;
pub mod engine;
pub mod fees;
pub mod ledger;
pub mod peg;

pub use config::*;
pub use engine::*;
pub use fees::*;
pub use ledger::*;
pub use peg::*;
