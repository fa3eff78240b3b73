//! Transfer-Scanner reconstructs an account's token-transfer history from a chain that offers no
//! index by address.
//!
//! History is recovered by replaying `Transfer` logs over block ranges, split into chunks the
//! provider accepts. The main entry point is [`TransferScanner`], built with
//! [`TransferScannerBuilder`] on top of any [`Ledger`]. [`RpcLedger`] is the Alloy-backed
//! implementation.
//!
//! # Strategies
//!
//! * [`TransferScanner::scan_bounded`] walks backward from the tip with bounded concurrency and
//!   stops as soon as the requested number of records is found. Meant for interactive use.
//! * [`TransferScanner::scan_exhaustive`] walks forward from the floor, one paced chunk at a
//!   time, and returns the full history. Meant for audits.
//!
//! # Ordering
//!
//! Records are always returned most recent first: block number, then transaction index, then log
//! index, all descending. The order never depends on which concurrent query finished first, so
//! two scans of an unchanged range return identical records.
//!
//! # Partial failures
//!
//! Only caller mistakes ([`ScannerError::InvalidRange`], invalid configuration) and a failed tip
//! lookup ([`ScannerError::LedgerUnavailable`]) fail a scan. A chunk that cannot be read is
//! listed in [`ScanDiagnostics::failed_chunks`] and the scan returns everything else it found;
//! check [`ScanResult::is_complete`] before treating a result as the full history.
//!
//! # Range limits
//!
//! Providers reject `eth_getLogs` ranges above their own cap. Such rejections are recognized by
//! error code, and the rejected chunk is halved and retried up to
//! [`max_shrink_steps`](TransferScannerBuilder::max_shrink_steps) times.
//!
//! # Example
//!
//! ```no_run
//! use alloy::primitives::address;
//! use transfer_scanner::{BlockSpec, RpcLedger, RpcLedgerBuilder, TransferScannerBuilder};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let token = address!("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
//! let account = address!("0xd8dA6BF26964af9d7eed9e03e53415d37aa96045");
//!
//! let ledger: RpcLedger =
//!     RpcLedgerBuilder::new("https://eth.llamarpc.com", token).build().await?;
//! let scanner = TransferScannerBuilder::new()
//!     .first_existence_block(6_082_465)
//!     .token_decimals(6)
//!     .connect(ledger)?;
//!
//! let result = scanner.scan_exhaustive(account, BlockSpec::Earliest, BlockSpec::Latest).await?;
//! println!("{} transfers, complete: {}", result.records.len(), result.is_complete());
//! # Ok(())
//! # }
//! ```

#[macro_use]
mod logging;

pub mod block_range;
pub mod ledger;
pub mod scanner;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

mod error;
mod types;

pub use block_range::{BlockSpec, ChunkDescriptor, ChunkPlanner};
pub use error::{InvalidRange, ScannerError};
pub use ledger::{Ledger, LedgerError, RawTransfer, RpcLedger, RpcLedgerBuilder};
pub use scanner::{
    DEFAULT_BOUNDED_BLOCK_RANGE, DEFAULT_EXHAUSTIVE_BLOCK_RANGE, DEFAULT_EXHAUSTIVE_PACING,
    DEFAULT_LIMIT, DEFAULT_MAX_CONCURRENT_FETCHES, ScannerConfig, TransferScanner,
    TransferScannerBuilder,
};
pub use types::{
    ChunkFailure, ChunkingInfo, Direction, EventRecord, FailureKind, ScanDiagnostics, ScanRequest,
    ScanResult, ScanStrategy, SingleShotOutcome, StopReason,
};
