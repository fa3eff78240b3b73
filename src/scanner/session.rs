use alloy::primitives::Address;

use crate::{
    ledger::Ledger,
    scanner::{
        aggregator::ResultAggregator,
        cache::BlockTimestampCache,
        fetcher::{ChunkFetchOutcome, FetchReport},
    },
    types::{ChunkingInfo, FailureKind},
};

/// State owned by one scan invocation and dropped when it returns.
///
/// Only [`ScanSession::fold`] mutates it, and only after a whole fetch round has completed, so
/// no fetch task ever observes the cache or the record list.
#[derive(Debug)]
pub(crate) struct ScanSession {
    pub(crate) cache: BlockTimestampCache,
    pub(crate) aggregator: ResultAggregator,
    pub(crate) chunking: ChunkingInfo,
}

impl ScanSession {
    pub(crate) fn new(address: Address, decimals: u8, chunking: ChunkingInfo) -> Self {
        Self {
            cache: BlockTimestampCache::new(),
            aggregator: ResultAggregator::new(address, decimals),
            chunking,
        }
    }

    /// Number of distinct records collected so far.
    pub(crate) fn collected(&self) -> usize {
        self.aggregator.len()
    }

    /// Enriches the successful outcomes of `report` with block timestamps and folds them into
    /// the aggregator. Failures, including chunks whose timestamps could not be read, are
    /// recorded instead.
    pub(crate) async fn fold<L: Ledger>(&mut self, ledger: &L, report: FetchReport) {
        self.chunking.batches += 1;
        self.chunking.chunks_fetched += report.chunks_fetched;
        self.chunking.shrink_retries += report.shrink_retries;

        for outcome in report.outcomes {
            match outcome {
                ChunkFetchOutcome::Success { chunk, sent, received } => {
                    let blocks = sent.iter().chain(&received).map(|t| t.block_number);
                    let concurrency = self.chunking.max_concurrent_fetches;
                    if let Err(error) = self.cache.prefetch(ledger, blocks, concurrency).await {
                        warn!(chunk = %chunk, error = %error, "Failed to fetch block timestamps");
                        self.aggregator.record_failure(chunk, FailureKind::Timestamp, &error);
                        continue;
                    }

                    for transfer in sent.into_iter().chain(received) {
                        // prefetch succeeded, so every block is cached
                        let timestamp = self.cache.get(transfer.block_number).unwrap_or_default();
                        self.aggregator.push(transfer, timestamp);
                    }
                }
                ChunkFetchOutcome::Failure { chunk, error } => {
                    let kind = if error.is_range_too_large() {
                        FailureKind::RangeTooLarge
                    } else {
                        FailureKind::Fetch
                    };
                    self.aggregator.record_failure(chunk, kind, &error);
                }
            }
        }
    }
}
