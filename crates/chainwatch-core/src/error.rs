//! Error types for the chainwatch pipeline.
//!
//! None of these ever abort a poll cycle. They are caught at the stage that
//! produced them, logged, and turned into an empty result or a dropped item.

use thiserror::Error;

/// Errors raised by the engine and its collaborators.
#[derive(Debug, Error)]
pub enum WatcherError {
    /// Chain query (head height or `eth_getLogs`) failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// The log payload could not be decoded against the ABI.
    #[error("decode error: {reason}")]
    Decode { reason: String },

    /// The ABI has no event whose selector matches the log's topic0.
    #[error("no ABI event matches topic0 {topic0}")]
    NoMatchingEvent { topic0: String },

    #[error("Handler error in '{handler}': {reason}")]
    Handler { handler: String, reason: String },

    /// An event signature string could not be parsed.
    #[error("invalid event signature '{signature}': {reason}")]
    InvalidSignature { signature: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    /// The dispatcher queue has been closed by `destroy()`.
    #[error("dispatcher closed")]
    Closed,

    #[error("{0}")]
    Other(String),
}

impl WatcherError {
    /// Returns `true` if the error means "this log is not for this ABI".
    pub fn is_decode_mismatch(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::NoMatchingEvent { .. })
    }

    /// Returns `true` if the error came from the chain query capability.
    pub fn is_rpc(&self) -> bool {
        matches!(self, Self::Rpc(_))
    }
}
