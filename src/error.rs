//! Error types for the pegvault engine.
//!
//! Every operation either commits completely or returns one of these errors.
//! [`Error::kind`] folds the variants into the five abort categories callers
//! branch on; the variants themselves carry the context for logs and UIs.

use thiserror::Error;

/// Result type alias for pegvault operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse abort category of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Operation is not allowed in the current ledger state
    PreconditionViolation,
    /// Arguments are malformed (zero amounts, empty identity, ...)
    InvalidInput,
    /// A balance, contribution or collateral amount is short
    InsufficientFunds,
    /// A subtraction would go negative or a divisor is zero
    ArithmeticUnderflow,
    /// Burn attempted before the holding period elapsed
    TimelockNotElapsed,
    /// Storage, serialization or other host-side failure
    Internal,
}

/// Main error type for the pegvault engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ═══════════════════════════════════════════════════════════════════
    // Configuration / Governance Errors
    // ═══════════════════════════════════════════════════════════════════

    /// A set-once configuration cell already holds a value
    #[error("Configuration cell {cell} is already initialized")]
    AlreadyInitialized {
        /// Cell name
        cell: &'static str,
    },

    /// A configuration cell was read or updated before being initialized
    #[error("Configuration cell {cell} is not initialized")]
    NotInitialized {
        /// Cell name
        cell: &'static str,
    },

    /// Update would leave the cell unchanged
    #[error("Update of {cell} must change its value")]
    NoOpUpdate {
        /// Cell name
        cell: &'static str,
    },

    /// Caller is not the governance identity
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    // ═══════════════════════════════════════════════════════════════════
    // Peg Errors
    // ═══════════════════════════════════════════════════════════════════

    /// System is locked by the peg controller
    #[error("System is locked: synthetic price {price} outside peg band")]
    SystemLocked {
        /// Synthetic price (scaled) that produced the lock
        price: String,
    },

    /// Collateral price is zero
    #[error("Collateral price has not been set")]
    PriceNotSet,

    // ═══════════════════════════════════════════════════════════════════
    // Validation Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Amount is zero where a positive amount is required
    #[error("Amount {name} must be greater than zero")]
    ZeroAmount {
        /// Argument name
        name: &'static str,
    },

    /// Identity is the empty key
    #[error("Identity {name} must not be empty")]
    EmptyIdentity {
        /// Argument name
        name: &'static str,
    },

    /// Invalid input parameter
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Reason for invalidity
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Funds Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Provided collateral is below the requirement
    #[error("Insufficient collateral: required {required}, provided {provided}")]
    InsufficientCollateral {
        /// Required collateral (scaled)
        required: String,
        /// Provided collateral (scaled)
        provided: String,
    },

    /// Balance or pool contribution is below the requested amount
    #[error("Insufficient {asset}: required {required}, available {available}")]
    InsufficientBalance {
        /// Which ledger entry is short
        asset: &'static str,
        /// Requested amount (scaled)
        required: String,
        /// Available amount (scaled)
        available: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Arithmetic Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Underflow in calculation
    #[error("Arithmetic underflow in {operation}")]
    Underflow {
        /// Operation that underflowed
        operation: String,
    },

    /// Division by zero
    #[error("Division by zero in {operation}")]
    DivisionByZero {
        /// Operation that divided
        operation: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Timelock Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Burn attempted inside the holding period
    #[error("Holding period not elapsed: minted at block {minted_at}, burnable after block {unlocks_after}")]
    TimelockNotElapsed {
        /// Block of the caller's last mint
        minted_at: u64,
        /// Last block still inside the holding period
        unlocks_after: u64,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Host Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Cryptographic operation failed
    #[error("Crypto error in {operation}: {details}")]
    CryptoError {
        /// Operation that failed
        operation: String,
        /// Error details
        details: String,
    },

    /// Invariant violation detected
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Abort category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::AlreadyInitialized { .. }
            | Error::NotInitialized { .. }
            | Error::NoOpUpdate { .. }
            | Error::Unauthorized(_)
            | Error::SystemLocked { .. }
            | Error::PriceNotSet => ErrorKind::PreconditionViolation,

            Error::ZeroAmount { .. }
            | Error::EmptyIdentity { .. }
            | Error::InvalidParameter { .. } => ErrorKind::InvalidInput,

            Error::InsufficientCollateral { .. } | Error::InsufficientBalance { .. } => {
                ErrorKind::InsufficientFunds
            }

            Error::Underflow { .. } | Error::DivisionByZero { .. } => {
                ErrorKind::ArithmeticUnderflow
            }

            Error::TimelockNotElapsed { .. } => ErrorKind::TimelockNotElapsed,

            Error::Serialization(_)
            | Error::Deserialization(_)
            | Error::Storage(_)
            | Error::CryptoError { .. }
            | Error::InvariantViolation(_)
            | Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns true if resubmitting later may succeed without changing arguments
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::SystemLocked { .. } | Error::TimelockNotElapsed { .. } | Error::PriceNotSet
        )
    }

    /// Returns true if this error points at a broken ledger rather than a bad request
    pub fn is_critical(&self) -> bool {
        matches!(self, Error::InvariantViolation(_) | Error::Internal(_))
    }

    /// Returns the error code for external systems
    pub fn code(&self) -> u32 {
        match self {
            // Precondition errors: 1xxx
            Error::AlreadyInitialized { .. } => 1001,
            Error::NotInitialized { .. } => 1002,
            Error::NoOpUpdate { .. } => 1003,
            Error::Unauthorized(_) => 1004,
            Error::SystemLocked { .. } => 1005,
            Error::PriceNotSet => 1006,

            // Input errors: 2xxx
            Error::ZeroAmount { .. } => 2001,
            Error::EmptyIdentity { .. } => 2002,
            Error::InvalidParameter { .. } => 2003,

            // Funds errors: 3xxx
            Error::InsufficientCollateral { .. } => 3001,
            Error::InsufficientBalance { .. } => 3002,

            // Arithmetic errors: 4xxx
            Error::Underflow { .. } => 4001,
            Error::DivisionByZero { .. } => 4002,

            // Timelock errors: 5xxx
            Error::TimelockNotElapsed { .. } => 5001,

            // Host errors: 9xxx
            Error::Serialization(_) => 9001,
            Error::Deserialization(_) => 9002,
            Error::Storage(_) => 9003,
            Error::CryptoError { .. } => 9004,
            Error::InvariantViolation(_) => 9005,
            Error::Internal(_) => 9006,
        }
    }
}
