use std::sync::Arc;

use alloy::{
    primitives::BlockNumber,
    transports::{RpcError, TransportErrorKind},
};
use thiserror::Error;
use tokio::time::error as TokioError;

/// Failures of a single ledger read.
#[derive(Error, Debug, Clone)]
pub enum LedgerError {
    /// The provider refused the query because the block range is too wide.
    #[error("Block range {from}..={to} rejected as too large: {reason}")]
    RangeTooLarge { from: BlockNumber, to: BlockNumber, reason: String },

    #[error("Operation timed out")]
    Timeout,

    #[error("RPC call failed after exhausting all retry attempts: {0}")]
    RpcError(Arc<RpcError<TransportErrorKind>>),

    #[error("Block {0} not found")]
    BlockNotFound(BlockNumber),

    /// A log came back without a field the record needs.
    #[error("Malformed transfer log: {0}")]
    MalformedLog(String),
}

impl LedgerError {
    /// Returns `true` when the provider rejected the width of the queried range.
    #[must_use]
    pub fn is_range_too_large(&self) -> bool {
        matches!(self, LedgerError::RangeTooLarge { .. })
    }
}

impl From<RpcError<TransportErrorKind>> for LedgerError {
    fn from(err: RpcError<TransportErrorKind>) -> Self {
        LedgerError::RpcError(Arc::new(err))
    }
}

impl From<TokioError::Elapsed> for LedgerError {
    fn from(_: TokioError::Elapsed) -> Self {
        LedgerError::Timeout
    }
}
