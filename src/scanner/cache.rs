use std::collections::{BTreeSet, HashMap};

use alloy::primitives::BlockNumber;
use futures::{StreamExt, stream};

use crate::ledger::{Ledger, LedgerError};

/// Block number to timestamp memo, scoped to a single scan.
///
/// Lookups that hit the memo never touch the ledger. The cache is dropped with its scan, so
/// nothing is shared between requests.
#[derive(Debug, Default)]
pub struct BlockTimestampCache {
    timestamps: HashMap<BlockNumber, u64>,
    fetches: u64,
}

impl BlockTimestampCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached timestamp of `block`, if it has been fetched.
    #[must_use]
    pub fn get(&self, block: BlockNumber) -> Option<u64> {
        self.timestamps.get(&block).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Number of ledger lookups performed so far.
    #[must_use]
    pub fn fetches(&self) -> u64 {
        self.fetches
    }

    /// Timestamp of `block`, fetched from `ledger` on first use.
    ///
    /// # Errors
    ///
    /// The ledger's error if the block has not been seen and the lookup fails.
    pub async fn timestamp_of<L: Ledger>(
        &mut self,
        ledger: &L,
        block: BlockNumber,
    ) -> Result<u64, LedgerError> {
        if let Some(timestamp) = self.get(block) {
            return Ok(timestamp);
        }

        self.fetches += 1;
        let timestamp = ledger.block_timestamp(block).await?;
        self.timestamps.insert(block, timestamp);
        Ok(timestamp)
    }

    /// Makes sure every block in `blocks` is cached, fetching the missing ones with at most
    /// `concurrency` lookups in flight.
    ///
    /// Successful lookups are kept even when another one fails.
    ///
    /// # Errors
    ///
    /// The first lookup error encountered.
    pub async fn prefetch<L: Ledger>(
        &mut self,
        ledger: &L,
        blocks: impl IntoIterator<Item = BlockNumber>,
        concurrency: usize,
    ) -> Result<(), LedgerError> {
        let missing: BTreeSet<BlockNumber> =
            blocks.into_iter().filter(|block| !self.timestamps.contains_key(block)).collect();
        if missing.is_empty() {
            return Ok(());
        }

        self.fetches += missing.len() as u64;
        let fetched: Vec<Result<(BlockNumber, u64), LedgerError>> = stream::iter(missing)
            .map(|block| async move {
                ledger.block_timestamp(block).await.map(|timestamp| (block, timestamp))
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        let mut first_error = None;
        for result in fetched {
            match result {
                Ok((block, timestamp)) => {
                    self.timestamps.insert(block, timestamp);
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}
