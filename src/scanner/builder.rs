use std::time::Duration;

use alloy::primitives::BlockNumber;

use crate::{
    ScannerError,
    ledger::Ledger,
    scanner::{ScannerConfig, TransferScanner},
};

/// Largest decimals value for which `10^decimals` fits in a `U256`.
const MAX_TOKEN_DECIMALS: u8 = 77;

/// Builder/configuration for [`TransferScanner`].
#[derive(Clone, Debug, Default)]
pub struct TransferScannerBuilder {
    config: ScannerConfig,
}

impl TransferScannerBuilder {
    /// Creates a builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the earliest block that can hold relevant transfers, usually the token's deployment
    /// block. Scans never query below it.
    #[must_use]
    pub fn first_existence_block(mut self, block: BlockNumber) -> Self {
        self.config.first_existence_block = block;
        self
    }

    /// Sets the chunk width of bounded scans.
    ///
    /// Must be greater than 0.
    #[must_use]
    pub fn bounded_block_range(mut self, max_block_range: u64) -> Self {
        self.config.bounded_block_range = max_block_range;
        self
    }

    /// Sets how many chunks a bounded scan reads concurrently.
    ///
    /// Must be greater than 0.
    #[must_use]
    pub fn bounded_concurrency(mut self, max_concurrent_fetches: usize) -> Self {
        self.config.bounded_concurrency = max_concurrent_fetches;
        self
    }

    /// Sets the limit used by bounded requests that do not name one.
    ///
    /// Must be greater than 0.
    #[must_use]
    pub fn default_limit(mut self, limit: u32) -> Self {
        self.config.default_limit = limit;
        self
    }

    /// Sets the default chunk width of exhaustive scans.
    ///
    /// Must be greater than 0.
    #[must_use]
    pub fn exhaustive_block_range(mut self, max_block_range: u64) -> Self {
        self.config.exhaustive_block_range = max_block_range;
        self
    }

    /// Sets the pause between consecutive exhaustive chunks.
    #[must_use]
    pub fn exhaustive_pacing(mut self, pacing: Duration) -> Self {
        self.config.exhaustive_pacing = pacing;
        self
    }

    /// Enables or disables the exhaustive strategy's initial whole-range query.
    #[must_use]
    pub fn single_shot(mut self, enabled: bool) -> Self {
        self.config.single_shot = enabled;
        self
    }

    /// Sets how many times a chunk rejected as too large may be halved before it is given up.
    #[must_use]
    pub fn max_shrink_steps(mut self, steps: u32) -> Self {
        self.config.max_shrink_steps = steps;
        self
    }

    /// Sets the token decimals used for `value_formatted`.
    ///
    /// Must not exceed 77.
    #[must_use]
    pub fn token_decimals(mut self, decimals: u8) -> Self {
        self.config.token_decimals = decimals;
        self
    }

    /// Validates the configuration and binds it to `ledger`.
    ///
    /// # Errors
    ///
    /// * [`ScannerError::InvalidMaxBlockRange`] if either chunk width is 0.
    /// * [`ScannerError::InvalidMaxConcurrentFetches`] if the bounded concurrency is 0.
    /// * [`ScannerError::InvalidLimit`] if the default limit is 0.
    /// * [`ScannerError::InvalidDecimals`] if the decimals exceed 77.
    pub fn connect<L: Ledger>(self, ledger: L) -> Result<TransferScanner<L>, ScannerError> {
        let config = self.config;
        if config.bounded_block_range == 0 || config.exhaustive_block_range == 0 {
            return Err(ScannerError::InvalidMaxBlockRange);
        }
        if config.bounded_concurrency == 0 {
            return Err(ScannerError::InvalidMaxConcurrentFetches);
        }
        if config.default_limit == 0 {
            return Err(ScannerError::InvalidLimit);
        }
        if config.token_decimals > MAX_TOKEN_DECIMALS {
            return Err(ScannerError::InvalidDecimals(config.token_decimals));
        }

        debug!(
            first_existence_block = config.first_existence_block,
            bounded_block_range = config.bounded_block_range,
            bounded_concurrency = config.bounded_concurrency,
            exhaustive_block_range = config.exhaustive_block_range,
            "TransferScanner configured"
        );

        Ok(TransferScanner { ledger, config })
    }
}
