//! Error type shared by the session and ERC-20 components.
//!
//! Every failure the external wallet, signer or provider can produce is
//! folded into [`StarknetError`]. Callers choose between seeing these errors
//! and the legacy log-and-continue behavior through
//! [`ErrorMode`](crate::config::ErrorMode).

use starkd_provider::ProviderError;
use thiserror::Error;

/// The main error type for Starkd operations.
#[derive(Error, Debug)]
pub enum StarknetError {
    // ============ Session Errors ============
    /// The session has no wallet attached
    #[error("Wallet session is not connected")]
    NotConnected,

    /// The wallet answered `enable` but reported itself as disconnected
    #[error("Wallet reported it is not connected")]
    WalletNotConnected,

    /// `enable` failed or the user rejected the request
    #[error("Wallet connection failed: {0}")]
    ConnectionFailed(String),

    /// The wallet returned no account after enabling
    #[error("Wallet returned no accounts")]
    NoAccount,

    // ============ Encoding Errors ============
    /// Value could not be parsed as a field element
    #[error("Invalid felt '{value}': {reason}")]
    InvalidFelt {
        /// The offending input
        value: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Entry point name cannot be turned into a selector
    #[error("Invalid entry point '{0}'")]
    InvalidEntryPoint(String),

    /// Token amount is not a plain decimal within the token's precision
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Amount overflow while scaling to base units
    #[error("Amount overflow: {0}")]
    AmountOverflow(String),

    // ============ Call Errors ============
    /// Submission was answered with a status other than received
    #[error("Unexpected transaction status: {code}")]
    UnexpectedStatus {
        /// Status code reported by the signer
        code: String,
    },

    /// The response carried no element to read
    #[error("Empty result from '{0}'")]
    EmptyResult(String),

    /// Signing the transaction failed
    #[error("Failed to sign transaction: {0}")]
    SigningError(String),

    /// The wallet or provider rejected a call
    #[error("Contract call failed: {0}")]
    ContractError(String),

    /// Transport-level failure
    #[error(transparent)]
    Provider(#[from] ProviderError),

    // ============ Configuration Errors ============
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// File IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parse error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Convenient Result type using StarknetError
pub type Result<T> = std::result::Result<T, StarknetError>;

impl StarknetError {
    pub(crate) fn invalid_felt(value: impl Into<String>, reason: impl ToString) -> Self {
        StarknetError::InvalidFelt {
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}
