//! The scanning engine.
//!
//! [`TransferScanner`] owns a [`Ledger`] and a validated [`ScannerConfig`] and exposes the two
//! strategies:
//!
//! * [`TransferScanner::scan_bounded`] walks backward from the tip in concurrent rounds and
//!   stops once the requested number of records has been found.
//! * [`TransferScanner::scan_exhaustive`] walks forward from the floor, one paced chunk at a
//!   time, and returns the complete history.
//!
//! Both resolve the requested range against a single tip fetched at scan start, clamp the
//! floor to the configured first-existence block, and keep all per-scan state (timestamp
//! cache, collected records, failures) in a session dropped when the scan returns.

mod aggregator;
mod bounded;
mod builder;
mod cache;
mod exhaustive;
mod fetcher;
mod session;

use std::time::Duration;

use alloy::primitives::{Address, BlockNumber};

pub use aggregator::{classify_direction, format_value};
pub use builder::TransferScannerBuilder;
pub use cache::BlockTimestampCache;
pub use fetcher::{ChunkFetchOutcome, ConcurrentFetcher, FetchReport};

use crate::{
    ScannerError,
    block_range::{BlockSpec, ChunkDescriptor, ChunkPlanner, precheck_range, resolve_range},
    ledger::Ledger,
    types::{ChunkingInfo, ScanDiagnostics, ScanResult, ScanStrategy, StopReason},
};

/// Default chunk width of the bounded strategy.
pub const DEFAULT_BOUNDED_BLOCK_RANGE: u64 = 10_000;
/// Default number of chunks the bounded strategy reads concurrently.
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 15;
/// Default number of records a bounded scan returns when the request names no limit.
pub const DEFAULT_LIMIT: u32 = 10;
/// Default chunk width of the exhaustive strategy.
pub const DEFAULT_EXHAUSTIVE_BLOCK_RANGE: u64 = 2_000;
/// Default pause between consecutive exhaustive chunks.
pub const DEFAULT_EXHAUSTIVE_PACING: Duration = Duration::from_millis(100);
/// Default number of times a too-large chunk may be halved.
pub const DEFAULT_MAX_SHRINK_STEPS: u32 = 4;
/// Default token decimals used to format values.
pub const DEFAULT_TOKEN_DECIMALS: u8 = 18;

/// Tunables of a [`TransferScanner`]. Built and validated by [`TransferScannerBuilder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerConfig {
    /// No chunk ever starts below this block.
    pub first_existence_block: BlockNumber,
    pub bounded_block_range: u64,
    pub bounded_concurrency: usize,
    pub default_limit: u32,
    pub exhaustive_block_range: u64,
    pub exhaustive_pacing: Duration,
    /// Whether the exhaustive strategy first tries the whole range in one query.
    pub single_shot: bool,
    pub max_shrink_steps: u32,
    pub token_decimals: u8,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            first_existence_block: 0,
            bounded_block_range: DEFAULT_BOUNDED_BLOCK_RANGE,
            bounded_concurrency: DEFAULT_MAX_CONCURRENT_FETCHES,
            default_limit: DEFAULT_LIMIT,
            exhaustive_block_range: DEFAULT_EXHAUSTIVE_BLOCK_RANGE,
            exhaustive_pacing: DEFAULT_EXHAUSTIVE_PACING,
            single_shot: true,
            max_shrink_steps: DEFAULT_MAX_SHRINK_STEPS,
            token_decimals: DEFAULT_TOKEN_DECIMALS,
        }
    }
}

/// Reconstructs an account's transfer history from a [`Ledger`].
///
/// Holds no state between scans; concurrent scans on the same scanner are independent.
#[derive(Debug)]
pub struct TransferScanner<L> {
    ledger: L,
    config: ScannerConfig,
}

impl<L: Ledger> TransferScanner<L> {
    #[must_use]
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    #[must_use]
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    fn planner(&self) -> ChunkPlanner {
        ChunkPlanner::new(self.config.first_existence_block)
    }

    /// Resolves `[from, to]` against a freshly fetched tip and clamps the floor.
    ///
    /// Returns `None` when the clamped floor lies above `to`.
    ///
    /// # Errors
    ///
    /// * [`ScannerError::InvalidRange`] for ranges that cannot be resolved. Ranges that are
    ///   invalid regardless of the tip are rejected before the ledger is contacted.
    /// * [`ScannerError::LedgerUnavailable`] if the tip lookup fails.
    async fn plan_bounds(
        &self,
        from: BlockSpec,
        to: BlockSpec,
    ) -> Result<Option<ChunkDescriptor>, ScannerError> {
        precheck_range(from, to)?;

        let tip = self.ledger.current_tip().await.map_err(|e| {
            error!(error = %e, "Failed to fetch the current tip");
            ScannerError::LedgerUnavailable(e)
        })?;

        let (from, to) = resolve_range(from, to, tip)?;
        let floor = self.planner().effective_floor(from);
        if floor > to {
            debug!(floor = floor, to_block = to, "Effective floor above the requested end");
            return Ok(None);
        }

        debug!(tip = tip, floor = floor, to_block = to, "Resolved scan range");
        Ok(Some(ChunkDescriptor::new(floor, to)))
    }

    fn empty_result(
        &self,
        address: Address,
        strategy: ScanStrategy,
        chunking: ChunkingInfo,
    ) -> ScanResult {
        ScanResult {
            address,
            contract_address: self.ledger.contract_address(),
            records: Vec::new(),
            diagnostics: ScanDiagnostics {
                strategy,
                scanned_range: None,
                stopped_at: None,
                stop_reason: StopReason::EmptyRange,
                chunking,
                failed_chunks: Vec::new(),
            },
        }
    }
}
