use alloy::primitives::Address;
use futures::{StreamExt, stream};

use crate::{
    block_range::ChunkDescriptor,
    ledger::{Ledger, LedgerError, RawTransfer},
    types::Direction,
};

/// Result of reading one chunk.
#[derive(Debug, Clone)]
pub enum ChunkFetchOutcome {
    Success { chunk: ChunkDescriptor, sent: Vec<RawTransfer>, received: Vec<RawTransfer> },
    Failure { chunk: ChunkDescriptor, error: LedgerError },
}

impl ChunkFetchOutcome {
    #[must_use]
    pub fn chunk(&self) -> ChunkDescriptor {
        match self {
            ChunkFetchOutcome::Success { chunk, .. } | ChunkFetchOutcome::Failure { chunk, .. } => {
                *chunk
            }
        }
    }
}

/// Outcomes of a fetch round plus the bookkeeping that ends up in the diagnostics.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub outcomes: Vec<ChunkFetchOutcome>,
    /// Event-query pairs issued, shrunk sub-chunks included.
    pub chunks_fetched: u64,
    pub shrink_retries: u64,
}

impl FetchReport {
    /// `true` if some chunk stayed too large even after shrinking.
    #[must_use]
    pub fn has_range_too_large_failure(&self) -> bool {
        self.outcomes.iter().any(|outcome| match outcome {
            ChunkFetchOutcome::Failure { error, .. } => error.is_range_too_large(),
            ChunkFetchOutcome::Success { .. } => false,
        })
    }

    fn absorb(&mut self, other: FetchReport) {
        self.outcomes.extend(other.outcomes);
        self.chunks_fetched += other.chunks_fetched;
        self.shrink_retries += other.shrink_retries;
    }
}

/// Reads chunks with at most `max_concurrent_fetches` chunks in flight.
///
/// Each chunk issues the sent and received queries concurrently. A failing chunk never aborts
/// its siblings; it comes back as [`ChunkFetchOutcome::Failure`]. A chunk rejected as too large
/// is split in halves and retried, up to `max_shrink_steps` levels deep.
#[derive(Debug)]
pub struct ConcurrentFetcher<'a, L> {
    ledger: &'a L,
    address: Address,
    max_concurrent_fetches: usize,
    max_shrink_steps: u32,
}

impl<'a, L: Ledger> ConcurrentFetcher<'a, L> {
    /// # Panics
    ///
    /// Panics if `max_concurrent_fetches` is 0.
    #[must_use]
    pub fn new(
        ledger: &'a L,
        address: Address,
        max_concurrent_fetches: usize,
        max_shrink_steps: u32,
    ) -> Self {
        assert!(max_concurrent_fetches >= 1, "max_concurrent_fetches must be at least 1");
        Self { ledger, address, max_concurrent_fetches, max_shrink_steps }
    }

    /// Fetches every chunk of `chunks`; outcome order is unspecified.
    pub async fn fetch_batch(&self, chunks: Vec<ChunkDescriptor>) -> FetchReport {
        let reports: Vec<FetchReport> = stream::iter(chunks)
            .map(|chunk| self.fetch_chunk(chunk))
            .buffer_unordered(self.max_concurrent_fetches)
            .collect()
            .await;

        reports.into_iter().fold(FetchReport::default(), |mut acc, report| {
            acc.absorb(report);
            acc
        })
    }

    /// Fetches one chunk, splitting it on range-too-large rejections.
    ///
    /// The returned outcomes cover `chunk` exactly, possibly as several sub-chunks.
    pub async fn fetch_chunk(&self, chunk: ChunkDescriptor) -> FetchReport {
        let mut report = FetchReport::default();
        let mut pending = vec![(chunk, 0u32)];

        while let Some((chunk, depth)) = pending.pop() {
            report.chunks_fetched += 1;
            match self.fetch_pair(chunk).await {
                Ok((sent, received)) => {
                    report.outcomes.push(ChunkFetchOutcome::Success { chunk, sent, received });
                }
                Err(error) => {
                    if error.is_range_too_large()
                        && depth < self.max_shrink_steps
                        && let Some((low, high)) = chunk.split()
                    {
                        debug!(
                            chunk = %chunk,
                            depth = depth + 1,
                            "Range too large, retrying as two halves"
                        );
                        report.shrink_retries += 1;
                        pending.push((high, depth + 1));
                        pending.push((low, depth + 1));
                        continue;
                    }

                    warn!(chunk = %chunk, error = %error, "Failed to fetch transfers for chunk");
                    report.outcomes.push(ChunkFetchOutcome::Failure { chunk, error });
                }
            }
        }

        report
    }

    /// Issues both directional queries for `chunk` concurrently.
    ///
    /// # Errors
    ///
    /// The first error of either query.
    pub async fn fetch_pair(
        &self,
        chunk: ChunkDescriptor,
    ) -> Result<(Vec<RawTransfer>, Vec<RawTransfer>), LedgerError> {
        let (sent, received) = tokio::try_join!(
            self.ledger.transfer_events(Direction::Sent, self.address, chunk.range()),
            self.ledger.transfer_events(Direction::Received, self.address, chunk.range()),
        )?;

        if !sent.is_empty() || !received.is_empty() {
            trace!(
                chunk = %chunk,
                sent = sent.len(),
                received = received.len(),
                "Found transfers in chunk"
            );
        }

        Ok((sent, received))
    }
}
