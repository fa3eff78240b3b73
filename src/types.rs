use std::fmt;

use alloy::primitives::{Address, BlockNumber, TxHash};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    block_range::{BlockSpec, ChunkDescriptor},
    ledger::LedgerError,
};

/// Direction of a transfer relative to the queried address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "lowercase"))]
pub enum Direction {
    Sent,
    Received,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Sent => f.write_str("sent"),
            Direction::Received => f.write_str("received"),
        }
    }
}

/// One transfer in an account's history, enriched with its block timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub struct EventRecord {
    pub tx_hash: TxHash,
    pub block_number: BlockNumber,
    pub transaction_index: Option<u64>,
    pub log_index: u64,
    /// Block timestamp in seconds.
    pub timestamp: u64,
    pub counterparty_from: Address,
    pub counterparty_to: Address,
    /// Raw token amount as a base-10 integer string.
    pub value_raw: String,
    /// `value_raw` scaled by the token decimals.
    pub value_formatted: String,
    pub direction: Direction,
}

/// Input of [`TransferScanner::scan_bounded`](crate::TransferScanner::scan_bounded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub address: Address,
    pub from_block: BlockSpec,
    pub to_block: BlockSpec,
    /// Number of most recent records wanted. `None` uses the scanner's default limit.
    pub limit: Option<u32>,
}

impl ScanRequest {
    /// A request covering the whole chain (`earliest..=latest`) with the default limit.
    #[must_use]
    pub fn new(address: Address) -> Self {
        Self { address, from_block: BlockSpec::Earliest, to_block: BlockSpec::Latest, limit: None }
    }

    #[must_use]
    pub fn from_block(mut self, block: impl Into<BlockSpec>) -> Self {
        self.from_block = block.into();
        self
    }

    #[must_use]
    pub fn to_block(mut self, block: impl Into<BlockSpec>) -> Self {
        self.to_block = block.into();
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// The outcome of a scan: ordered records plus a description of how they were obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub struct ScanResult {
    pub address: Address,
    pub contract_address: Address,
    /// Sorted by block number, most recent first.
    pub records: Vec<EventRecord>,
    pub diagnostics: ScanDiagnostics,
}

impl ScanResult {
    /// `true` when every planned chunk was read successfully.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.diagnostics.failed_chunks.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub struct ScanDiagnostics {
    pub strategy: ScanStrategy,
    /// `[effective floor, resolved to-block]`, or `None` when the range was empty.
    pub scanned_range: Option<ChunkDescriptor>,
    /// Lowest block covered by a bounded scan, highest block covered by an exhaustive one.
    pub stopped_at: Option<BlockNumber>,
    pub stop_reason: StopReason,
    pub chunking: ChunkingInfo,
    pub failed_chunks: Vec<ChunkFailure>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub enum ScanStrategy {
    /// Reverse walk from the tip, stopping once `limit` records are found.
    Bounded { limit: u32 },
    /// Forward walk over the whole range.
    Exhaustive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub enum StopReason {
    /// Enough records were collected before the floor was reached.
    LimitReached,
    /// The bounded walk reached the effective floor.
    FloorReached,
    /// The bounded walk was abandoned after a chunk stayed too large at the minimum width.
    RangeTooLarge,
    /// The exhaustive walk consumed its whole plan.
    Completed,
    /// The effective floor was above the requested end; nothing was queried.
    EmptyRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub struct ChunkingInfo {
    /// Chunk width (in blocks) the plan was built with.
    pub chunk_size: u64,
    pub max_concurrent_fetches: usize,
    /// Number of fetch rounds issued.
    pub batches: u64,
    /// Chunks (including shrunk sub-chunks) that were queried.
    pub chunks_fetched: u64,
    /// Number of times a chunk was split after a range-too-large rejection.
    pub shrink_retries: u64,
    pub single_shot: SingleShotOutcome,
}

/// Result of the exhaustive strategy's initial whole-range query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub enum SingleShotOutcome {
    #[default]
    NotAttempted,
    Succeeded,
    /// Rejected as too large; `accepted_width` is the probe width that worked, if any.
    RangeTooLarge { accepted_width: Option<u64> },
    Failed,
}

/// A chunk whose events could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub struct ChunkFailure {
    pub chunk: ChunkDescriptor,
    pub kind: FailureKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub enum FailureKind {
    /// Still rejected as too wide at the smallest allowed width.
    RangeTooLarge,
    /// Transport, timeout or malformed-response failure of an event query.
    Fetch,
    /// The events were read but a block timestamp lookup failed.
    Timestamp,
}

impl ChunkFailure {
    pub(crate) fn new(chunk: ChunkDescriptor, kind: FailureKind, error: &LedgerError) -> Self {
        Self { chunk, kind, message: error.to_string() }
    }
}
