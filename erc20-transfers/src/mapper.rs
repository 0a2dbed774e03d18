//! Maps raw `Transfer` log entries to [`Record`]s.

use alloy::primitives::Address;

use crate::error::Result;
use crate::record::Record;
use crate::source::{LogSource, RawTransfer, TransferFilter};

/// Turns the `Transfer` logs of one block into records.
#[derive(Debug, Clone)]
pub struct EventMapper<S> {
    source: S,
}

impl<S: LogSource> EventMapper<S> {
    /// Create a mapper reading from `source`.
    pub const fn new(source: S) -> Self {
        Self { source }
    }

    /// Borrow the underlying log source.
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Collect every `Transfer` emitted by `token` in `block`.
    ///
    /// Records come back in source order. Each record's `block` is the one
    /// embedded in its log, which is authoritative even if it differs from
    /// the requested `block`. Every call re-queries the source.
    ///
    /// # Errors
    ///
    /// Returns the first error the source reports, either when opening the
    /// query or while iterating; records read before it are discarded.
    pub async fn transfers(&self, token: Address, block: u64) -> Result<Vec<Record>> {
        let filter = TransferFilter::single_block(token, block);
        // The iterator lives only in this scope, so it is dropped on every path.
        let logs = self.source.transfer_logs(&filter).await?;
        let records = logs
            .map(|raw| raw.map(|raw| to_record(&raw)))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(%token, block, records = records.len(), "mapped transfers");
        Ok(records)
    }
}

/// Build the canonical record for one decoded log entry.
#[must_use]
pub fn to_record(raw: &RawTransfer) -> Record {
    Record {
        id: Record::id_for(&format!("{:#x}", raw.tx_hash), raw.log_index),
        from: raw.from.to_string(),
        to: raw.to.to_string(),
        value: raw.value.to_string(),
        block: raw.block_number,
    }
}
