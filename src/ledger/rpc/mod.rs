//! [`Ledger`](crate::Ledger) over an Alloy provider for an ERC-20 style token.
//!
//! Every call runs under a total timeout and is retried with exponential backoff. If the
//! primary provider keeps failing the call moves on to the fallback providers in the order they
//! were added. Range-too-large rejections are recognized by their JSON-RPC error code and are
//! neither retried nor failed over, since the scanner recovers from them by shrinking the
//! chunk.
//!
//! ```rust,no_run
//! use alloy::primitives::address;
//! use std::time::Duration;
//! use transfer_scanner::{RpcLedger, RpcLedgerBuilder};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let token = address!("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
//! let ledger: RpcLedger = RpcLedgerBuilder::new("https://eth.llamarpc.com", token)
//!     .fallback("https://rpc.ankr.com/eth")
//!     .call_timeout(Duration::from_secs(30))
//!     .build()
//!     .await?;
//! # Ok(()) }
//! ```

mod builder;

use std::{fmt::Debug, future::Future, ops::RangeInclusive, time::Duration};

use alloy::{
    consensus::BlockHeader,
    eips::BlockNumberOrTag,
    network::{BlockResponse, Ethereum, Network},
    primitives::{Address, BlockNumber},
    providers::{Provider, RootProvider},
    rpc::types::{Filter, Log},
    sol,
    sol_types::SolEvent,
    transports::{RpcError, TransportErrorKind},
};
use backon::{ExponentialBuilder, Retryable};
use tokio::time::timeout;

pub use builder::{
    DEFAULT_CALL_TIMEOUT, DEFAULT_MAX_RETRIES, DEFAULT_MIN_DELAY, DEFAULT_RANGE_TOO_LARGE_CODES,
    IntoRootProvider, RpcLedgerBuilder,
};

use crate::{
    ledger::{Ledger, LedgerError, RawTransfer},
    types::Direction,
};

sol! {
    /// ERC-20 `Transfer` event.
    #[derive(Debug, PartialEq, Eq)]
    event Transfer(address indexed from, address indexed to, uint256 value);
}

/// Token ledger backed by one primary and any number of fallback RPC providers.
#[derive(Clone, Debug)]
pub struct RpcLedger<N: Network = Ethereum> {
    pub(crate) token: Address,
    pub(crate) primary_provider: RootProvider<N>,
    pub(crate) fallback_providers: Vec<RootProvider<N>>,
    pub(crate) call_timeout: Duration,
    pub(crate) max_retries: usize,
    pub(crate) min_delay: Duration,
    pub(crate) range_too_large_codes: Vec<i64>,
}

impl<N: Network> RpcLedger<N> {
    #[must_use]
    pub fn primary(&self) -> &RootProvider<N> {
        &self.primary_provider
    }

    #[must_use]
    pub fn token(&self) -> Address {
        self.token
    }

    /// Fetch the latest block number.
    ///
    /// # Errors
    ///
    /// See [retry errors](#retry-errors).
    pub async fn get_block_number(&self) -> Result<BlockNumber, LedgerError> {
        debug!("eth_blockNumber called");
        let result = self
            .try_operation_with_failover(|provider| async move {
                provider.get_block_number().await
            })
            .await;
        if let Err(e) = &result {
            error!(error = %e, "eth_blockNumber failed");
        }
        result
    }

    /// Fetch the timestamp of block `number`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::BlockNotFound`] if the provider has no such block, otherwise see
    /// [retry errors](#retry-errors).
    pub async fn get_block_timestamp(&self, number: BlockNumber) -> Result<u64, LedgerError> {
        debug!(block_number = number, "eth_getBlockByNumber called");
        let result = self
            .try_operation_with_failover(move |provider| async move {
                provider.get_block_by_number(BlockNumberOrTag::Number(number)).await
            })
            .await;
        if let Err(e) = &result {
            error!(block_number = number, error = %e, "eth_getBlockByNumber failed");
        }

        result?
            .map(|block| block.header().timestamp())
            .ok_or(LedgerError::BlockNotFound(number))
    }

    /// Fetch logs for `filter`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::RangeTooLarge`] when the provider answers with one of the configured
    /// range-too-large codes, otherwise see [retry errors](#retry-errors).
    pub async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, LedgerError> {
        debug!("eth_getLogs called");
        let result = self
            .try_operation_with_failover(move |provider| async move {
                provider.get_logs(filter).await
            })
            .await;
        if let Err(e) = &result {
            error!(error = %e, "eth_getLogs failed");
        }
        result
    }

    /// Run `operation` against the primary provider, then each fallback in turn.
    ///
    /// # Errors
    /// <a name="retry-errors"></a>
    ///
    /// * [`LedgerError::Timeout`] if `call_timeout` elapsed on every provider.
    /// * [`LedgerError::RpcError`] with the last provider's error once retries are exhausted.
    /// * [`LedgerError::RangeTooLarge`] immediately, without failover.
    async fn try_operation_with_failover<T: Debug, F, Fut>(
        &self,
        operation: F,
    ) -> Result<T, LedgerError>
    where
        F: Fn(RootProvider<N>) -> Fut,
        Fut: Future<Output = Result<T, RpcError<TransportErrorKind>>>,
    {
        let mut last_error = match self.try_provider_with_timeout(self.primary(), &operation).await
        {
            Ok(value) => return Ok(value),
            Err(e) if e.is_range_too_large() => return Err(e),
            Err(e) => e,
        };

        let num_fallbacks = self.fallback_providers.len();
        if num_fallbacks > 0 {
            info!("Primary provider failed, trying fallback provider(s)");
        }

        for (idx, provider) in self.fallback_providers.iter().enumerate() {
            info!("Attempting fallback provider {}/{}", idx + 1, num_fallbacks);
            match self.try_provider_with_timeout(provider, &operation).await {
                Ok(value) => {
                    info!(provider_num = idx + 1, "Fallback provider succeeded");
                    return Ok(value);
                }
                Err(e) if e.is_range_too_large() => return Err(e),
                Err(e) => {
                    warn!(provider_num = idx + 1, error = %e, "Fallback provider failed");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    /// Execute `operation` on `provider` with exponential backoff under a total timeout.
    async fn try_provider_with_timeout<T, F, Fut>(
        &self,
        provider: &RootProvider<N>,
        operation: F,
    ) -> Result<T, LedgerError>
    where
        F: Fn(RootProvider<N>) -> Fut,
        Fut: Future<Output = Result<T, RpcError<TransportErrorKind>>>,
    {
        let retry_strategy = ExponentialBuilder::default()
            .with_max_times(self.max_retries)
            .with_min_delay(self.min_delay);

        let result = timeout(
            self.call_timeout,
            (|| operation(provider.clone()))
                .retry(retry_strategy)
                .when(|err: &RpcError<TransportErrorKind>| !self.is_range_too_large(err))
                .notify(|err: &RpcError<TransportErrorKind>, dur: Duration| {
                    debug!(error = %err, "RPC error, retrying after {:?}", dur);
                })
                .sleep(tokio::time::sleep),
        )
        .await?;

        result.map_err(|err| self.classify(err))
    }

    fn is_range_too_large(&self, err: &RpcError<TransportErrorKind>) -> bool {
        err.as_error_resp()
            .is_some_and(|payload| self.range_too_large_codes.contains(&payload.code))
    }

    fn classify(&self, err: RpcError<TransportErrorKind>) -> LedgerError {
        match err.as_error_resp() {
            Some(payload) if self.range_too_large_codes.contains(&payload.code) => {
                LedgerError::RangeTooLarge { from: 0, to: 0, reason: payload.message.to_string() }
            }
            _ => err.into(),
        }
    }

    fn transfer_filter(
        &self,
        direction: Direction,
        address: Address,
        range: &RangeInclusive<BlockNumber>,
    ) -> Filter {
        let filter = Filter::new()
            .address(self.token)
            .event_signature(Transfer::SIGNATURE_HASH)
            .from_block(*range.start())
            .to_block(*range.end());

        match direction {
            Direction::Sent => filter.topic1(address.into_word()),
            Direction::Received => filter.topic2(address.into_word()),
        }
    }
}

/// Converts a `Transfer` log into a [`RawTransfer`].
fn decode_transfer(log: &Log) -> Result<RawTransfer, LedgerError> {
    let decoded = log
        .log_decode::<Transfer>()
        .map_err(|e| LedgerError::MalformedLog(format!("cannot decode Transfer: {e}")))?;
    let Transfer { from, to, value } = decoded.inner.data;

    let tx_hash = log
        .transaction_hash
        .ok_or_else(|| LedgerError::MalformedLog("missing transaction hash".into()))?;
    let block_number =
        log.block_number.ok_or_else(|| LedgerError::MalformedLog("missing block number".into()))?;
    let log_index =
        log.log_index.ok_or_else(|| LedgerError::MalformedLog("missing log index".into()))?;

    Ok(RawTransfer {
        tx_hash,
        block_number,
        transaction_index: log.transaction_index,
        log_index,
        from,
        to,
        value,
    })
}

impl<N: Network> Ledger for RpcLedger<N> {
    fn contract_address(&self) -> Address {
        self.token
    }

    async fn current_tip(&self) -> Result<BlockNumber, LedgerError> {
        self.get_block_number().await
    }

    async fn transfer_events(
        &self,
        direction: Direction,
        address: Address,
        range: RangeInclusive<BlockNumber>,
    ) -> Result<Vec<RawTransfer>, LedgerError> {
        let filter = self.transfer_filter(direction, address, &range);

        let logs = self.get_logs(&filter).await.map_err(|e| match e {
            LedgerError::RangeTooLarge { reason, .. } => {
                LedgerError::RangeTooLarge { from: *range.start(), to: *range.end(), reason }
            }
            other => other,
        })?;

        logs.iter().map(decode_transfer).collect()
    }

    async fn block_timestamp(&self, block: BlockNumber) -> Result<u64, LedgerError> {
        self.get_block_timestamp(block).await
    }
}
