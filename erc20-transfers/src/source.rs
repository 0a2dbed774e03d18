//! Upstream log source: filtered ERC-20 `Transfer` logs for a block range.
//!
//! The mapper only depends on the [`LogSource`] trait. [`RpcLogSource`]
//! implements it on top of any alloy [`Provider`] with one `eth_getLogs`
//! call, decoding entries lazily as the caller iterates.

use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::Provider;
use alloy::rpc::types::{Filter, Log};
use alloy::sol_types::SolEvent;
use async_trait::async_trait;

use crate::error::{Error, Result};

alloy::sol! {
    /// ERC-20 `Transfer` event.
    #[allow(missing_docs)]
    #[derive(Debug, PartialEq, Eq)]
    event Transfer(address indexed from, address indexed to, uint256 value);
}

/// Contract address and inclusive block bounds for a log query.
///
/// The event signature is always `Transfer`; the indexed `from` and `to`
/// topics are never filtered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferFilter {
    /// Token contract emitting the logs.
    pub token: Address,
    /// First block, inclusive.
    pub from_block: u64,
    /// Last block, inclusive.
    pub to_block: u64,
}

impl TransferFilter {
    /// A filter covering exactly one block (`[block, block]`).
    #[must_use]
    pub const fn single_block(token: Address, block: u64) -> Self {
        Self {
            token,
            from_block: block,
            to_block: block,
        }
    }

    /// The equivalent `eth_getLogs` filter.
    #[must_use]
    pub fn to_rpc_filter(&self) -> Filter {
        Filter::new()
            .address(self.token)
            .event_signature(Transfer::SIGNATURE_HASH)
            .from_block(self.from_block)
            .to_block(self.to_block)
    }
}

/// One decoded `Transfer` log entry as delivered by a [`LogSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawTransfer {
    /// Hash of the transaction that emitted the log.
    pub tx_hash: TxHash,
    /// Position of the log within its block.
    pub log_index: u64,
    /// Block the log was included in, as reported by the log itself.
    pub block_number: u64,
    /// Sender.
    pub from: Address,
    /// Receiver.
    pub to: Address,
    /// Amount, full 256-bit width.
    pub value: U256,
}

/// A source of filtered `Transfer` logs.
///
/// Opening may fail; so may any individual item. The returned iterator is
/// finite and owns whatever resources back it: dropping it releases them.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Iterator over decoded entries.
    type Logs: Iterator<Item = Result<RawTransfer>> + Send;

    /// Open an iterator over every `Transfer` log matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query cannot be issued.
    async fn transfer_logs(&self, filter: &TransferFilter) -> Result<Self::Logs>;
}

/// [`LogSource`] backed by a JSON-RPC node.
#[derive(Debug, Clone)]
pub struct RpcLogSource<P> {
    provider: P,
}

impl<P: Provider> RpcLogSource<P> {
    /// Wrap a connected provider.
    pub const fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Borrow the underlying provider.
    pub const fn provider(&self) -> &P {
        &self.provider
    }
}

#[async_trait]
impl<P: Provider> LogSource for RpcLogSource<P> {
    type Logs = RpcTransferLogs;

    async fn transfer_logs(&self, filter: &TransferFilter) -> Result<Self::Logs> {
        let logs = self.provider.get_logs(&filter.to_rpc_filter()).await?;
        tracing::debug!(
            token = %filter.token,
            from = filter.from_block,
            to = filter.to_block,
            logs = logs.len(),
            "fetched logs"
        );
        Ok(RpcTransferLogs {
            logs: logs.into_iter(),
        })
    }
}

/// Logs returned by one `eth_getLogs` call, decoded on iteration.
#[derive(Debug)]
pub struct RpcTransferLogs {
    logs: std::vec::IntoIter<Log>,
}

impl Iterator for RpcTransferLogs {
    type Item = Result<RawTransfer>;

    fn next(&mut self) -> Option<Self::Item> {
        self.logs.next().map(|log| decode_transfer(&log))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.logs.size_hint()
    }
}

/// Decode an RPC log into a [`RawTransfer`].
///
/// # Errors
///
/// Returns [`Error::MalformedLog`] if the log lacks its transaction hash,
/// log index or block number, and [`Error::Decode`] if its topics and data
/// are not a `Transfer` event.
pub fn decode_transfer(log: &Log) -> Result<RawTransfer> {
    let tx_hash = log
        .transaction_hash
        .ok_or(Error::MalformedLog("transaction_hash"))?;
    let log_index = log.log_index.ok_or(Error::MalformedLog("log_index"))?;
    let block_number = log.block_number.ok_or(Error::MalformedLog("block_number"))?;
    let event = log.log_decode::<Transfer>()?.inner.data;

    Ok(RawTransfer {
        tx_hash,
        log_index,
        block_number,
        from: event.from,
        to: event.to,
        value: event.value,
    })
}
