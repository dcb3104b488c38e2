//! pegvault command line support.
//!
//! Configuration, output formatting and the argument parsers the binary
//! shares: decimal amounts on the ledger scale and hex identities.

pub mod config;
pub mod output;

pub use config::*;
pub use output::*;

use crate::error::Error;
use crate::utils::crypto::PublicKey;
use crate::utils::math::Amount;

// ═══════════════════════════════════════════════════════════════════════════════
// CLI ERROR
// ═══════════════════════════════════════════════════════════════════════════════

/// CLI error types
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Engine or storage error
    #[error("[{}] {}", .0.code(), .0)]
    Engine(#[from] Error),
    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// CLI result type
pub type CliResult<T> = std::result::Result<T, CliError>;

// ═══════════════════════════════════════════════════════════════════════════════
// ARGUMENT PARSING
// ═══════════════════════════════════════════════════════════════════════════════

/// Parse a decimal amount such as `"1.5"` onto `scale`
pub fn parse_amount(input: &str, scale: &Amount) -> CliResult<Amount> {
    Amount::parse_decimal(input.trim(), scale)
        .map_err(|e| CliError::InvalidArgument(format!("amount '{}': {}", input, e)))
}

/// Parse several comma separated amounts
pub fn parse_amount_list(input: &str, scale: &Amount) -> CliResult<Vec<Amount>> {
    input
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| parse_amount(part, scale))
        .collect()
}

/// Format an amount as a decimal on `scale`
pub fn format_amount(amount: &Amount, scale: &Amount) -> String {
    amount.to_decimal_string(scale)
}

/// Parse a hex-encoded compressed public key
pub fn parse_identity(input: &str) -> CliResult<PublicKey> {
    let key = PublicKey::from_hex(input.trim())
        .map_err(|e| CliError::InvalidArgument(format!("identity '{}': {}", input, e)))?;
    if !key.is_valid() {
        return Err(CliError::InvalidArgument(format!(
            "identity '{}' is not a valid public key",
            input
        )));
    }
    Ok(key)
}
