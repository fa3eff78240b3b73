use alloy::primitives::{Address, BlockNumber};

use crate::{
    ScannerError,
    block_range::{BlockSpec, ChunkDescriptor},
    ledger::Ledger,
    scanner::{
        TransferScanner,
        fetcher::{ChunkFetchOutcome, ConcurrentFetcher, FetchReport},
        session::ScanSession,
    },
    types::{
        ChunkingInfo, ScanDiagnostics, ScanResult, ScanStrategy, SingleShotOutcome, StopReason,
    },
};

/// What the initial whole-range query left to do.
struct SingleShotPlan {
    outcome: SingleShotOutcome,
    report: FetchReport,
    chunk_size: u64,
    /// First block still to scan, `None` when the single shot covered everything.
    resume_from: Option<BlockNumber>,
}

impl<L: Ledger> TransferScanner<L> {
    /// Returns every transfer of `address` in `[from_block, to_block]`, newest first.
    ///
    /// The range is first queried as a whole (unless disabled with
    /// [`single_shot`](crate::TransferScannerBuilder::single_shot)). If the ledger rejects it as
    /// too large, halving probe widths are tried on its start, and the first accepted width
    /// sizes the remaining chunks. Otherwise the configured exhaustive chunk width is used.
    /// Chunks are then read one at a time, oldest first, pausing `exhaustive_pacing` between
    /// them. Failed chunks are skipped and listed in the diagnostics.
    ///
    /// # Errors
    ///
    /// * [`ScannerError::InvalidRange`] if the range cannot be resolved.
    /// * [`ScannerError::LedgerUnavailable`] if the tip cannot be fetched.
    pub async fn scan_exhaustive(
        &self,
        address: Address,
        from_block: impl Into<BlockSpec>,
        to_block: impl Into<BlockSpec>,
    ) -> Result<ScanResult, ScannerError> {
        let strategy = ScanStrategy::Exhaustive;
        let chunking = ChunkingInfo {
            chunk_size: self.config.exhaustive_block_range,
            max_concurrent_fetches: 1,
            ..ChunkingInfo::default()
        };

        let Some(range) = self.plan_bounds(from_block.into(), to_block.into()).await? else {
            return Ok(self.empty_result(address, strategy, chunking));
        };

        info!(address = %address, range = %range, "Starting exhaustive scan");

        let mut session = ScanSession::new(address, self.config.token_decimals, chunking);
        let max_shrink_steps = self.config.max_shrink_steps;
        let fetcher = ConcurrentFetcher::new(&self.ledger, address, 1, max_shrink_steps);

        let mut resume_from = Some(range.from_block);
        if self.config.single_shot {
            let plan = self.single_shot(&fetcher, range).await;
            session.chunking.single_shot = plan.outcome;
            session.chunking.chunk_size = plan.chunk_size;
            resume_from = plan.resume_from;
            session.fold(&self.ledger, plan.report).await;
        }

        if let Some(start) = resume_from {
            let chunks = self.planner().forward(start, range.to_block, session.chunking.chunk_size);
            for (index, chunk) in chunks.enumerate() {
                if index > 0 && !self.config.exhaustive_pacing.is_zero() {
                    tokio::time::sleep(self.config.exhaustive_pacing).await;
                }
                let report = fetcher.fetch_chunk(chunk).await;
                session.fold(&self.ledger, report).await;
            }
        }

        let (records, failed_chunks) = session.aggregator.finish(None);

        info!(
            address = %address,
            records = records.len(),
            chunks_fetched = session.chunking.chunks_fetched,
            failed_chunks = failed_chunks.len(),
            "Exhaustive scan finished"
        );

        Ok(ScanResult {
            address,
            contract_address: self.ledger.contract_address(),
            records,
            diagnostics: ScanDiagnostics {
                strategy,
                scanned_range: Some(range),
                stopped_at: Some(range.to_block),
                stop_reason: StopReason::Completed,
                chunking: session.chunking,
                failed_chunks,
            },
        })
    }

    /// Queries `range` in one go, then probes halving widths if it is rejected as too large.
    async fn single_shot(
        &self,
        fetcher: &ConcurrentFetcher<'_, L>,
        range: ChunkDescriptor,
    ) -> SingleShotPlan {
        let default_size = self.config.exhaustive_block_range;
        let mut report = FetchReport { chunks_fetched: 1, ..FetchReport::default() };

        let error = match fetcher.fetch_pair(range).await {
            Ok((sent, received)) => {
                debug!(range = %range, "Single-shot query succeeded");
                report.outcomes.push(ChunkFetchOutcome::Success { chunk: range, sent, received });
                return SingleShotPlan {
                    outcome: SingleShotOutcome::Succeeded,
                    report,
                    chunk_size: range.width(),
                    resume_from: None,
                };
            }
            Err(error) => error,
        };

        if !error.is_range_too_large() {
            warn!(
                range = %range,
                error = %error,
                "Single-shot query failed, using default chunking"
            );
            return SingleShotPlan {
                outcome: SingleShotOutcome::Failed,
                report,
                chunk_size: default_size,
                resume_from: Some(range.from_block),
            };
        }

        debug!(range = %range, "Single-shot query rejected as too large, probing smaller widths");

        let mut width = range.width() / 2;
        let mut steps = 0;
        while width > default_size && steps < self.config.max_shrink_steps {
            steps += 1;
            report.shrink_retries += 1;
            report.chunks_fetched += 1;

            let probe = ChunkDescriptor::new(range.from_block, range.from_block + width - 1);
            match fetcher.fetch_pair(probe).await {
                Ok((sent, received)) => {
                    debug!(width = width, "Probe width accepted");
                    let outcome = ChunkFetchOutcome::Success { chunk: probe, sent, received };
                    report.outcomes.push(outcome);
                    return SingleShotPlan {
                        outcome: SingleShotOutcome::RangeTooLarge { accepted_width: Some(width) },
                        report,
                        chunk_size: width,
                        resume_from: Some(probe.to_block + 1),
                    };
                }
                Err(error) if error.is_range_too_large() => width /= 2,
                Err(error) => {
                    warn!(width = width, error = %error, "Probe failed, using default chunking");
                    break;
                }
            }
        }

        SingleShotPlan {
            outcome: SingleShotOutcome::RangeTooLarge { accepted_width: None },
            report,
            chunk_size: default_size,
            resume_from: Some(range.from_block),
        }
    }
}
