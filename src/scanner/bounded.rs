use crate::{
    ScannerError,
    ledger::Ledger,
    scanner::{TransferScanner, fetcher::ConcurrentFetcher, session::ScanSession},
    types::{ChunkingInfo, ScanDiagnostics, ScanRequest, ScanResult, ScanStrategy, StopReason},
};

impl<L: Ledger> TransferScanner<L> {
    /// Returns the `limit` most recent transfers of `request.address`, newest first.
    ///
    /// Chunks are pulled from the tip downward, `bounded_concurrency` at a time. After each
    /// round the scan stops if enough records were collected, if a chunk stayed too large at
    /// the smallest width, or if the floor was reached. A round in flight always completes, so
    /// more than `limit` records may be collected before the final truncation.
    ///
    /// Chunk failures do not fail the scan; they are listed in the diagnostics.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use alloy::primitives::address;
    /// # use transfer_scanner::{RpcLedger, RpcLedgerBuilder, ScanRequest, TransferScannerBuilder};
    /// #
    /// # async fn example() -> anyhow::Result<()> {
    /// # let token = address!("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
    /// # let account = address!("0xd8dA6BF26964af9d7eed9e03e53415d37aa96045");
    /// let ledger: RpcLedger =
    ///     RpcLedgerBuilder::new("https://eth.llamarpc.com", token).build().await?;
    /// let scanner =
    ///     TransferScannerBuilder::new().first_existence_block(6_082_465).connect(ledger)?;
    ///
    /// let result = scanner.scan_bounded(&ScanRequest::new(account).limit(5)).await?;
    /// for record in &result.records {
    ///     println!("{} {} {}", record.block_number, record.direction, record.value_formatted);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// * [`ScannerError::InvalidLimit`] if the effective limit is 0.
    /// * [`ScannerError::InvalidRange`] if the range cannot be resolved.
    /// * [`ScannerError::LedgerUnavailable`] if the tip cannot be fetched.
    pub async fn scan_bounded(&self, request: &ScanRequest) -> Result<ScanResult, ScannerError> {
        let limit = request.limit.unwrap_or(self.config.default_limit);
        if limit == 0 {
            return Err(ScannerError::InvalidLimit);
        }

        let address = request.address;
        let strategy = ScanStrategy::Bounded { limit };
        let chunk_size = self.config.bounded_block_range;
        let concurrency = self.config.bounded_concurrency;
        let chunking = ChunkingInfo {
            chunk_size,
            max_concurrent_fetches: concurrency,
            ..ChunkingInfo::default()
        };

        let Some(range) = self.plan_bounds(request.from_block, request.to_block).await? else {
            return Ok(self.empty_result(address, strategy, chunking));
        };

        info!(
            address = %address,
            range = %range,
            limit = limit,
            "Starting bounded scan"
        );

        let mut session = ScanSession::new(address, self.config.token_decimals, chunking);
        let max_shrink_steps = self.config.max_shrink_steps;
        let fetcher = ConcurrentFetcher::new(&self.ledger, address, concurrency, max_shrink_steps);
        let mut chunks = self.planner().backward(range.from_block, range.to_block, chunk_size);
        let mut stopped_at = None;

        let stop_reason = loop {
            let batch = chunks.next_batch(concurrency);
            // chunks are descending, so the last one reaches lowest
            let Some(lowest) = batch.last().map(|chunk| chunk.from_block) else {
                break StopReason::FloorReached;
            };

            let report = fetcher.fetch_batch(batch).await;
            let too_large = report.has_range_too_large_failure();
            session.fold(&self.ledger, report).await;
            stopped_at = Some(lowest);

            if session.collected() >= limit as usize {
                break StopReason::LimitReached;
            }
            if too_large {
                warn!(
                    stopped_at = lowest,
                    "Chunk still too large at the smallest width, abandoning bounded scan"
                );
                break StopReason::RangeTooLarge;
            }
            if chunks.is_exhausted() {
                break StopReason::FloorReached;
            }
        };

        let collected = session.collected();
        let (records, failed_chunks) = session.aggregator.finish(Some(limit as usize));

        info!(
            address = %address,
            records = records.len(),
            collected = collected,
            stopped_at = ?stopped_at,
            stop_reason = ?stop_reason,
            failed_chunks = failed_chunks.len(),
            "Bounded scan finished"
        );

        Ok(ScanResult {
            address,
            contract_address: self.ledger.contract_address(),
            records,
            diagnostics: ScanDiagnostics {
                strategy,
                scanned_range: Some(range),
                stopped_at,
                stop_reason,
                chunking: session.chunking,
                failed_chunks,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        ScannerError,
        block_range::BlockSpec,
        error::InvalidRange,
        scanner::TransferScannerBuilder,
        test_utils::{ACCOUNT, MockLedger, OTHER},
        types::{ScanRequest, StopReason},
    };

    fn ledger() -> MockLedger {
        MockLedger::new(250)
            .with_transfer(100, ACCOUNT, OTHER, 1)
            .with_transfer(120, OTHER, ACCOUNT, 2)
            .with_transfer(150, ACCOUNT, OTHER, 3)
            .with_transfer(180, OTHER, ACCOUNT, 4)
            .with_transfer(200, ACCOUNT, OTHER, 5)
    }

    fn builder() -> TransferScannerBuilder {
        TransferScannerBuilder::new()
            .first_existence_block(50)
            .bounded_block_range(25)
            .bounded_concurrency(2)
    }

    #[tokio::test]
    async fn stops_after_the_round_that_reaches_the_limit() {
        let scanner = builder().connect(ledger()).unwrap();

        let result = scanner.scan_bounded(&ScanRequest::new(ACCOUNT).limit(2)).await.unwrap();

        let blocks: Vec<_> = result.records.iter().map(|r| r.block_number).collect();
        assert_eq!(blocks, vec![200, 180]);
        assert_eq!(result.diagnostics.stop_reason, StopReason::LimitReached);
        assert_eq!(result.diagnostics.stopped_at, Some(151));
        assert_eq!(result.diagnostics.chunking.batches, 2);
        assert!(scanner.ledger().queried_ranges().iter().all(|r| *r.start() >= 151));
    }

    #[tokio::test]
    async fn reaches_floor_when_limit_is_not_met() {
        let scanner = builder().connect(ledger()).unwrap();

        let result = scanner.scan_bounded(&ScanRequest::new(ACCOUNT).limit(10)).await.unwrap();

        assert_eq!(result.records.len(), 5);
        assert_eq!(result.diagnostics.stop_reason, StopReason::FloorReached);
        assert_eq!(result.diagnostics.stopped_at, Some(50));
        // 9 chunks in rounds of 2
        assert_eq!(result.diagnostics.chunking.batches, 5);
    }

    #[tokio::test]
    async fn missing_limit_uses_default() {
        let scanner = builder().default_limit(3).connect(ledger()).unwrap();

        let result = scanner.scan_bounded(&ScanRequest::new(ACCOUNT)).await.unwrap();

        assert_eq!(result.records.len(), 3);
    }

    #[tokio::test]
    async fn zero_limit_is_rejected() {
        let scanner = builder().connect(ledger()).unwrap();

        let err = scanner.scan_bounded(&ScanRequest::new(ACCOUNT).limit(0)).await.unwrap_err();

        assert_eq!(err, ScannerError::InvalidLimit);
        assert_eq!(scanner.ledger().tip_queries(), 0);
    }

    #[tokio::test]
    async fn abandons_on_persistent_range_too_large() {
        let ledger = ledger().with_too_large_range(160..=165);
        let scanner = builder().max_shrink_steps(1).connect(ledger).unwrap();

        let result = scanner.scan_bounded(&ScanRequest::new(ACCOUNT).limit(10)).await.unwrap();

        assert_eq!(result.diagnostics.stop_reason, StopReason::RangeTooLarge);
        assert_eq!(result.diagnostics.stopped_at, Some(151));
        assert!(!result.is_complete());
        let blocks: Vec<_> = result.records.iter().map(|r| r.block_number).collect();
        assert_eq!(blocks, vec![200, 180]);
    }

    #[tokio::test]
    async fn tip_failure_is_fatal() {
        let scanner = builder().connect(ledger().with_failing_tip()).unwrap();

        let err = scanner.scan_bounded(&ScanRequest::new(ACCOUNT)).await.unwrap_err();

        assert!(matches!(err, ScannerError::LedgerUnavailable(_)), "got {err:?}");
        assert_eq!(scanner.ledger().event_queries(), 0);
    }

    #[tokio::test]
    async fn to_block_above_tip_is_rejected() {
        let scanner = builder().connect(ledger()).unwrap();

        let err = scanner
            .scan_bounded(&ScanRequest::new(ACCOUNT).to_block(BlockSpec::Number(300)))
            .await
            .unwrap_err();

        assert_eq!(err, ScannerError::InvalidRange(InvalidRange::ExceedsTip("to_block", 300, 250)));
        assert_eq!(scanner.ledger().event_queries(), 0);
    }
}
