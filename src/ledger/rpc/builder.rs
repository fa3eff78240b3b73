use std::{future::Future, pin::Pin, time::Duration};

use alloy::{
    network::{Ethereum, Network},
    primitives::Address,
    providers::{
        Provider, RootProvider,
        fillers::{FillProvider, TxFiller},
    },
    transports::http::reqwest::Url,
};

use crate::ledger::{LedgerError, rpc::RpcLedger};

type BoxedProviderFuture<N> =
    Pin<Box<dyn Future<Output = Result<RootProvider<N>, LedgerError>> + Send>>;

/// Default total timeout of one ledger call, retries included.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);
/// Default maximum number of retry attempts.
pub const DEFAULT_MAX_RETRIES: usize = 3;
/// Default base delay between retries.
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_secs(1);
/// JSON-RPC error codes providers use to reject an over-wide `eth_getLogs` range.
pub const DEFAULT_RANGE_TOO_LARGE_CODES: &[i64] = &[-32005, -32602];

/// Conversion trait for types that can be turned into an Alloy [`RootProvider`].
pub trait IntoRootProvider<N: Network = Ethereum> {
    /// # Errors
    ///
    /// Returns an error if the underlying provider cannot be constructed or connected.
    fn into_root_provider(
        self,
    ) -> impl Future<Output = Result<RootProvider<N>, LedgerError>> + Send;
}

impl<N: Network> IntoRootProvider<N> for RootProvider<N> {
    async fn into_root_provider(self) -> Result<RootProvider<N>, LedgerError> {
        Ok(self)
    }
}

impl<N: Network> IntoRootProvider<N> for &str {
    async fn into_root_provider(self) -> Result<RootProvider<N>, LedgerError> {
        Ok(RootProvider::connect(self).await?)
    }
}

impl<N: Network> IntoRootProvider<N> for Url {
    async fn into_root_provider(self) -> Result<RootProvider<N>, LedgerError> {
        Ok(RootProvider::connect(self.as_str()).await?)
    }
}

impl<F, P, N> IntoRootProvider<N> for FillProvider<F, P, N>
where
    F: TxFiller<N>,
    P: Provider<N>,
    N: Network,
{
    async fn into_root_provider(self) -> Result<RootProvider<N>, LedgerError> {
        Ok(self.root().to_owned())
    }
}

/// Builder for [`RpcLedger`].
pub struct RpcLedgerBuilder<N: Network, P: IntoRootProvider<N>> {
    primary_provider: P,
    fallback_providers: Vec<BoxedProviderFuture<N>>,
    token: Address,
    call_timeout: Duration,
    max_retries: usize,
    min_delay: Duration,
    range_too_large_codes: Vec<i64>,
}

impl<N: Network, P: IntoRootProvider<N>> RpcLedgerBuilder<N, P> {
    /// Ledger for the token at `token`, read through `provider`.
    #[must_use]
    pub fn new(provider: P, token: Address) -> Self {
        Self {
            primary_provider: provider,
            fallback_providers: vec![],
            token,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            min_delay: DEFAULT_MIN_DELAY,
            range_too_large_codes: DEFAULT_RANGE_TOO_LARGE_CODES.to_vec(),
        }
    }

    /// Add a fallback provider, tried after the primary in insertion order.
    #[must_use]
    pub fn fallback<F: IntoRootProvider<N> + Send + 'static>(mut self, provider: F) -> Self {
        self.fallback_providers.push(Box::pin(provider.into_root_provider()));
        self
    }

    /// Set the total timeout of a call, retries included.
    #[must_use]
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    #[must_use]
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the base delay for exponential backoff retries.
    #[must_use]
    pub fn min_delay(mut self, min_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self
    }

    /// Replace the JSON-RPC error codes treated as "block range too large".
    #[must_use]
    pub fn range_too_large_codes(mut self, codes: impl IntoIterator<Item = i64>) -> Self {
        self.range_too_large_codes = codes.into_iter().collect();
        self
    }

    /// Connect every provider and build the [`RpcLedger`].
    ///
    /// # Errors
    ///
    /// Returns an error if any of the providers fail to connect.
    pub async fn build(self) -> Result<RpcLedger<N>, LedgerError> {
        debug!(
            token = %self.token,
            call_timeout_ms = self.call_timeout.as_millis(),
            max_retries = self.max_retries,
            fallback_count = self.fallback_providers.len(),
            "Building RpcLedger"
        );

        let primary_provider = self.primary_provider.into_root_provider().await?;

        let mut fallback_providers = Vec::with_capacity(self.fallback_providers.len());
        for (idx, fallback) in self.fallback_providers.into_iter().enumerate() {
            trace!(fallback_index = idx, "Connecting fallback provider");
            fallback_providers.push(fallback.await?);
        }

        info!(token = %self.token, "RpcLedger initialized");

        Ok(RpcLedger {
            token: self.token,
            primary_provider,
            fallback_providers,
            call_timeout: self.call_timeout,
            max_retries: self.max_retries,
            min_delay: self.min_delay,
            range_too_large_codes: self.range_too_large_codes,
        })
    }
}
