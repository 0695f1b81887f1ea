//! Error types for studycake-entitlements.

use crate::types::Lamports;
use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the entitlement core and its collaborators.
///
/// The verification entry points never surface these to callers; they log
/// and degrade to `false`. The checkout flow and the collaborators do.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The RPC node returned a JSON-RPC error object.
    #[error("rpc error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// Error message from the node.
        message: String,
    },

    /// Transport-level failure talking to the RPC node.
    #[error("network error: {0}")]
    Network(String),

    /// A bounded operation did not settle in time.
    #[error("{0} timed out")]
    Timeout(String),

    /// The key-value store failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Text that should be a base58 account address was not.
    #[error("invalid address {address}: {reason}")]
    InvalidAddress {
        /// The offending input.
        address: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A price or amount could not be represented in lamports.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The payer cannot cover price plus processing fee.
    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        /// Price plus processing fee.
        required: Lamports,
        /// Current account balance.
        available: Lamports,
    },

    /// The wallet refused or failed to submit the transfer.
    #[error("transaction submission failed: {0}")]
    Submission(String),

    /// The transaction landed but carried an execution error, or expired.
    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}
