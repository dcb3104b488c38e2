//! Persistence for the ledger.
//!
//! ## Backends
//!
//! - **InMemoryStore**: ephemeral storage for tests
//! - **FileStore**: JSON document in a data directory, used by the CLI
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pegvault::storage::{FileStore, StateManager};
//!
//! let manager = StateManager::new(FileStore::new("./data")?);
//! if let Some((ledger, height)) = manager.load()? {
//!     println!("restored ledger at height {}", height);
//! }
//! ```

pub mod backend;
pub mod state;

pub use backend::*;
pub use state::*;
