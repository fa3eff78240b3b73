//! In-memory [`Ledger`] and helpers for tests.

pub mod macros;

use std::{
    collections::{HashMap, HashSet},
    ops::RangeInclusive,
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use alloy::{
    primitives::{Address, BlockNumber, TxHash, U256, address, keccak256},
    transports::TransportErrorKind,
};

use crate::{
    ledger::{Ledger, LedgerError, RawTransfer},
    types::Direction,
};

/// The account whose history tests scan.
pub const ACCOUNT: Address = address!("0x000000000000000000000000000000000000000a");
/// Any other party.
pub const OTHER: Address = address!("0x000000000000000000000000000000000000000b");
/// Contract address reported by [`MockLedger`].
pub const TOKEN: Address = address!("0x00000000000000000000000000000000000000aa");

/// Timestamp [`MockLedger`] reports for blocks without an explicit one.
#[must_use]
pub fn default_timestamp(block: BlockNumber) -> u64 {
    1_700_000_000 + block * 12
}

/// Deterministic transaction hash for a `(block, log_index)` pair.
#[must_use]
pub fn tx_hash(block: BlockNumber, log_index: u64) -> TxHash {
    keccak256([block.to_be_bytes(), log_index.to_be_bytes()].concat())
}

/// A transfer of `value` base units at `block`.
#[must_use]
pub fn raw_transfer(
    log_index: u64,
    block: BlockNumber,
    from: Address,
    to: Address,
    value: u64,
) -> RawTransfer {
    RawTransfer {
        tx_hash: tx_hash(block, log_index),
        block_number: block,
        transaction_index: Some(0),
        log_index,
        from,
        to,
        value: U256::from(value),
    }
}

fn overlaps(a: &RangeInclusive<BlockNumber>, b: &RangeInclusive<BlockNumber>) -> bool {
    a.start() <= b.end() && b.start() <= a.end()
}

fn transport_error(message: &str) -> LedgerError {
    TransportErrorKind::custom_str(message).into()
}

/// A ledger held in memory, with injectable failures and call accounting.
///
/// Event queries are answered in ascending `(block, log index)` order, like a node would.
#[derive(Debug, Default)]
pub struct MockLedger {
    tip: BlockNumber,
    transfers: Vec<RawTransfer>,
    timestamps: HashMap<BlockNumber, u64>,
    failing_timestamps: HashSet<BlockNumber>,
    failing_ranges: Vec<RangeInclusive<BlockNumber>>,
    too_large_ranges: Vec<RangeInclusive<BlockNumber>>,
    max_range: Option<u64>,
    latency: Option<Duration>,
    failing_tip: bool,

    tip_queries: AtomicUsize,
    event_queries: AtomicUsize,
    timestamp_queries: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    queried_ranges: Mutex<Vec<RangeInclusive<BlockNumber>>>,
    queried: AtomicBool,
}

impl MockLedger {
    #[must_use]
    pub fn new(tip: BlockNumber) -> Self {
        Self { tip, ..Self::default() }
    }

    /// Adds a transfer at `block`; log indices are assigned in insertion order.
    #[must_use]
    pub fn with_transfer(
        mut self,
        block: BlockNumber,
        from: Address,
        to: Address,
        value: u64,
    ) -> Self {
        let log_index = self.transfers.len() as u64;
        self.transfers.push(raw_transfer(log_index, block, from, to, value));
        self
    }

    #[must_use]
    pub fn with_raw_transfer(mut self, transfer: RawTransfer) -> Self {
        self.transfers.push(transfer);
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, block: BlockNumber, timestamp: u64) -> Self {
        self.timestamps.insert(block, timestamp);
        self
    }

    /// Timestamp lookups for `block` fail with a transport error.
    #[must_use]
    pub fn with_failing_timestamp(mut self, block: BlockNumber) -> Self {
        self.failing_timestamps.insert(block);
        self
    }

    /// Event queries overlapping `range` fail with a transport error.
    #[must_use]
    pub fn with_failing_range(mut self, range: RangeInclusive<BlockNumber>) -> Self {
        self.failing_ranges.push(range);
        self
    }

    /// Event queries overlapping `range` are rejected as too large, whatever their width.
    #[must_use]
    pub fn with_too_large_range(mut self, range: RangeInclusive<BlockNumber>) -> Self {
        self.too_large_ranges.push(range);
        self
    }

    /// Event queries wider than `max_range` blocks are rejected as too large.
    #[must_use]
    pub fn with_max_range(mut self, max_range: u64) -> Self {
        self.max_range = Some(max_range);
        self
    }

    /// Every call waits `latency` before answering.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Tip lookups fail with a transport error.
    #[must_use]
    pub fn with_failing_tip(mut self) -> Self {
        self.failing_tip = true;
        self
    }

    #[must_use]
    pub fn tip_queries(&self) -> usize {
        self.tip_queries.load(Ordering::SeqCst)
    }

    /// Directional event queries issued; a chunk costs two.
    #[must_use]
    pub fn event_queries(&self) -> usize {
        self.event_queries.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn timestamp_queries(&self) -> usize {
        self.timestamp_queries.load(Ordering::SeqCst)
    }

    /// Highest number of event queries observed in flight at once.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Ranges of every event query, in call order.
    #[must_use]
    pub fn queried_ranges(&self) -> Vec<RangeInclusive<BlockNumber>> {
        self.queried_ranges.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// `true` once any ledger method was called.
    #[must_use]
    pub fn was_queried(&self) -> bool {
        self.queried.load(Ordering::SeqCst)
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn check_range(&self, range: &RangeInclusive<BlockNumber>) -> Result<(), LedgerError> {
        let (from, to) = (*range.start(), *range.end());
        let width = to.saturating_sub(from) + 1;

        if let Some(max) = self.max_range
            && width > max
        {
            return Err(LedgerError::RangeTooLarge {
                from,
                to,
                reason: format!("query exceeds {max} blocks"),
            });
        }
        if self.too_large_ranges.iter().any(|r| overlaps(r, range)) {
            return Err(LedgerError::RangeTooLarge {
                from,
                to,
                reason: "query returned more than 10000 results".to_string(),
            });
        }
        if self.failing_ranges.iter().any(|r| overlaps(r, range)) {
            return Err(transport_error("connection reset by peer"));
        }
        Ok(())
    }
}

impl Ledger for MockLedger {
    fn contract_address(&self) -> Address {
        TOKEN
    }

    async fn current_tip(&self) -> Result<BlockNumber, LedgerError> {
        self.queried.store(true, Ordering::SeqCst);
        self.tip_queries.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        if self.failing_tip {
            return Err(transport_error("connection refused"));
        }
        Ok(self.tip)
    }

    async fn transfer_events(
        &self,
        direction: Direction,
        address: Address,
        range: RangeInclusive<BlockNumber>,
    ) -> Result<Vec<RawTransfer>, LedgerError> {
        self.queried.store(true, Ordering::SeqCst);
        self.event_queries.fetch_add(1, Ordering::SeqCst);
        self.queried_ranges.lock().unwrap_or_else(PoisonError::into_inner).push(range.clone());

        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        self.delay().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.check_range(&range)?;

        let mut transfers: Vec<RawTransfer> = self
            .transfers
            .iter()
            .filter(|t| range.contains(&t.block_number))
            .filter(|t| match direction {
                Direction::Sent => t.from == address,
                Direction::Received => t.to == address,
            })
            .cloned()
            .collect();
        transfers.sort_by_key(|t| (t.block_number, t.log_index));
        Ok(transfers)
    }

    async fn block_timestamp(&self, block: BlockNumber) -> Result<u64, LedgerError> {
        self.queried.store(true, Ordering::SeqCst);
        self.timestamp_queries.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        if self.failing_timestamps.contains(&block) {
            return Err(transport_error("header unavailable"));
        }
        if block > self.tip {
            return Err(LedgerError::BlockNotFound(block));
        }
        Ok(self.timestamps.get(&block).copied().unwrap_or_else(|| default_timestamp(block)))
    }
}
