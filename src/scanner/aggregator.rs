use std::{cmp::Ordering, collections::HashSet};

use alloy::primitives::{Address, TxHash, U256};

use crate::{
    block_range::ChunkDescriptor,
    ledger::{LedgerError, RawTransfer},
    types::{ChunkFailure, Direction, EventRecord, FailureKind},
};

/// `Sent` when `address` is the sender, `Received` otherwise.
///
/// Addresses compare as 20-byte values, so hex casing in their textual form is irrelevant.
#[must_use]
pub fn classify_direction(address: Address, transfer: &RawTransfer) -> Direction {
    if transfer.from == address { Direction::Sent } else { Direction::Received }
}

/// Scales `value` down by `decimals`, keeping at least one fractional digit.
///
/// `format_value(U256::from(1_500_000u64), 6) == "1.5"`
#[must_use]
pub fn format_value(value: U256, decimals: u8) -> String {
    let base = U256::from(10u64).pow(U256::from(decimals));
    let (integer, fraction) = value.div_rem(base);

    let fraction = fraction.to_string();
    let padding = usize::from(decimals).saturating_sub(fraction.len());
    let mut digits = "0".repeat(padding) + &fraction;
    let significant = digits.trim_end_matches('0').len().max(1);
    digits.truncate(significant);

    if decimals == 0 { format!("{integer}.0") } else { format!("{integer}.{digits}") }
}

/// Most recent first: block, then transaction index, then log index, all descending.
fn most_recent_first(a: &EventRecord, b: &EventRecord) -> Ordering {
    b.block_number
        .cmp(&a.block_number)
        .then_with(|| b.transaction_index.cmp(&a.transaction_index))
        .then_with(|| b.log_index.cmp(&a.log_index))
        .then_with(|| a.tx_hash.cmp(&b.tx_hash))
}

/// Accumulates records and failures across fetch rounds.
#[derive(Debug)]
pub(crate) struct ResultAggregator {
    address: Address,
    decimals: u8,
    records: Vec<EventRecord>,
    seen: HashSet<(TxHash, u64)>,
    failures: Vec<ChunkFailure>,
}

impl ResultAggregator {
    pub(crate) fn new(address: Address, decimals: u8) -> Self {
        Self { address, decimals, records: Vec::new(), seen: HashSet::new(), failures: Vec::new() }
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    /// Adds `transfer`; a log already added (a self-transfer shows up in both directions) is
    /// ignored.
    pub(crate) fn push(&mut self, transfer: RawTransfer, timestamp: u64) {
        if !self.seen.insert((transfer.tx_hash, transfer.log_index)) {
            return;
        }

        let direction = classify_direction(self.address, &transfer);
        self.records.push(EventRecord {
            tx_hash: transfer.tx_hash,
            block_number: transfer.block_number,
            transaction_index: transfer.transaction_index,
            log_index: transfer.log_index,
            timestamp,
            counterparty_from: transfer.from,
            counterparty_to: transfer.to,
            value_raw: transfer.value.to_string(),
            value_formatted: format_value(transfer.value, self.decimals),
            direction,
        });
    }

    pub(crate) fn record_failure(
        &mut self,
        chunk: ChunkDescriptor,
        kind: FailureKind,
        error: &LedgerError,
    ) {
        self.failures.push(ChunkFailure::new(chunk, kind, error));
    }

    /// Sorts, then truncates to `limit`. Truncating before the final sort would favor
    /// whichever chunk happened to finish first.
    pub(crate) fn finish(mut self, limit: Option<usize>) -> (Vec<EventRecord>, Vec<ChunkFailure>) {
        self.records.sort_by(most_recent_first);
        if let Some(limit) = limit {
            self.records.truncate(limit);
        }
        self.failures.sort_by_key(|failure| std::cmp::Reverse(failure.chunk.from_block));
        (self.records, self.failures)
    }
}
