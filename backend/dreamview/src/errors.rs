//! Application-wide error types.

use thiserror::Error;

use crate::source::Action;

#[derive(Debug, Error)]
pub enum DreamError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// A field read came back malformed (bad hex, wrong ABI shape, overflow).
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("{0} decimals do not fit in a uint256 scale")]
    UnsupportedDecimals(u8),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("{0} is not permitted for this caller")]
    NotPermitted(Action),

    #[error("A request is already in flight")]
    Busy,

    #[error("No caller identity is connected")]
    NoCaller,

    #[error("Dream card task has stopped")]
    CardClosed,
}

impl DreamError {
    /// JSON-RPC codes that will not succeed on a second attempt: malformed
    /// requests, unknown methods, bad params and execution reverts.
    pub fn is_hard_rpc_error(code: i64) -> bool {
        matches!(code, -32600 | -32601 | -32602 | -32000 | 3)
    }
}

pub type Result<T> = std::result::Result<T, DreamError>;
