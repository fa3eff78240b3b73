//! Read-only access to the token ledger.
//!
//! The scanner only ever talks to the chain through [`Ledger`]. [`RpcLedger`] implements it on
//! top of an Alloy provider for an ERC-20 style token; tests use the in-memory
//! `test_utils::MockLedger`.

use std::{future::Future, ops::RangeInclusive};

use alloy::primitives::{Address, BlockNumber, TxHash, U256};

use crate::types::Direction;

mod error;
pub mod rpc;

pub use error::LedgerError;
pub use rpc::{RpcLedger, RpcLedgerBuilder};

/// A transfer log as returned by the ledger, before timestamp enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransfer {
    pub tx_hash: TxHash,
    pub block_number: BlockNumber,
    pub transaction_index: Option<u64>,
    pub log_index: u64,
    pub from: Address,
    pub to: Address,
    pub value: U256,
}

/// The minimal read interface the scanner needs from a ledger.
///
/// Every async method is a suspension point of a scan; nothing else in the scanner awaits.
/// Implementations own their timeout and retry behavior. Errors are reported per call and the
/// scanner decides whether they are fatal.
pub trait Ledger: Send + Sync {
    /// Address of the token contract whose transfers are scanned.
    fn contract_address(&self) -> Address;

    /// Number of the most recent block.
    fn current_tip(&self) -> impl Future<Output = Result<BlockNumber, LedgerError>> + Send;

    /// Transfers in `range` (inclusive) where `address` is the sender ([`Direction::Sent`]) or
    /// the recipient ([`Direction::Received`]).
    ///
    /// # Errors
    ///
    /// [`LedgerError::RangeTooLarge`] when the provider rejects the width of `range`; any other
    /// variant for transport failures.
    fn transfer_events(
        &self,
        direction: Direction,
        address: Address,
        range: RangeInclusive<BlockNumber>,
    ) -> impl Future<Output = Result<Vec<RawTransfer>, LedgerError>> + Send;

    /// Timestamp (seconds) of block `block`.
    fn block_timestamp(
        &self,
        block: BlockNumber,
    ) -> impl Future<Output = Result<u64, LedgerError>> + Send;
}

impl<L: Ledger> Ledger for &L {
    fn contract_address(&self) -> Address {
        (**self).contract_address()
    }

    fn current_tip(&self) -> impl Future<Output = Result<BlockNumber, LedgerError>> + Send {
        (**self).current_tip()
    }

    fn transfer_events(
        &self,
        direction: Direction,
        address: Address,
        range: RangeInclusive<BlockNumber>,
    ) -> impl Future<Output = Result<Vec<RawTransfer>, LedgerError>> + Send {
        (**self).transfer_events(direction, address, range)
    }

    fn block_timestamp(
        &self,
        block: BlockNumber,
    ) -> impl Future<Output = Result<u64, LedgerError>> + Send {
        (**self).block_timestamp(block)
    }
}
