use std::mem::discriminant;

use alloy::primitives::BlockNumber;
use thiserror::Error;

use crate::ledger::LedgerError;

/// Errors that escape a scan to the caller.
///
/// Per-chunk read failures never surface here; they are recorded in
/// [`ScanDiagnostics::failed_chunks`](crate::ScanDiagnostics::failed_chunks) and the scan
/// returns whatever it could recover. Only caller mistakes and setup-phase ledger failures are
/// fatal.
#[derive(Error, Debug, Clone)]
pub enum ScannerError {
    /// The requested block range cannot be scanned.
    #[error("Invalid block range: {0}")]
    InvalidRange(#[from] InvalidRange),

    /// The ledger could not be reached before any chunk work began (e.g. the tip lookup
    /// failed).
    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(#[source] LedgerError),

    /// The configured maximum block range is invalid (must be greater than zero).
    #[error("Max block range must be greater than 0")]
    InvalidMaxBlockRange,

    /// The configured number of concurrent chunk fetches is invalid (must be greater than zero).
    #[error("Max concurrent fetches must be greater than 0")]
    InvalidMaxConcurrentFetches,

    /// A bounded scan was requested with a zero record limit.
    #[error("Record limit must be greater than 0")]
    InvalidLimit,

    /// Token decimals beyond what a 256-bit value can represent.
    #[error("Token decimals {0} exceed the supported maximum of 77")]
    InvalidDecimals(u8),
}

/// Ways a requested block range can be rejected before any event query is issued.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidRange {
    /// The endpoint is neither a recognized tag nor a number.
    #[error("unrecognized block specifier {0:?}")]
    Unparseable(String),

    /// `pending` has no history to scan.
    #[error("{0} cannot be the pending block")]
    Pending(&'static str),

    /// `from` resolves above `to`.
    #[error("from block {from} is greater than to block {to}")]
    Inverted { from: BlockNumber, to: BlockNumber },

    /// A numeric endpoint lies beyond the current tip.
    #[error("{0} {1} exceeds the latest block {2}")]
    ExceedsTip(&'static str, BlockNumber, BlockNumber),
}

impl ScannerError {
    /// Returns `true` for errors caused by the caller's range parameters.
    #[must_use]
    pub fn is_invalid_range(&self) -> bool {
        matches!(self, ScannerError::InvalidRange(_))
    }
}

impl PartialEq for ScannerError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ScannerError::InvalidRange(a), ScannerError::InvalidRange(b)) => a == b,
            (ScannerError::InvalidDecimals(a), ScannerError::InvalidDecimals(b)) => a == b,
            _ => discriminant(self) == discriminant(other),
        }
    }
}
