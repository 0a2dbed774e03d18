//! Block ingestion: map one block's transfers and store each record.

use alloy::primitives::Address;

use crate::error::Result;
use crate::mapper::EventMapper;
use crate::record::Record;
use crate::source::LogSource;
use crate::store::RecordStore;

/// Outcome of ingesting one block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Records produced by the mapper.
    pub fetched: usize,
    /// Records whose `add` succeeded (duplicates included).
    pub stored: usize,
    /// Ids of records whose `add` failed.
    pub failed: Vec<String>,
}

/// Owns a mapper and a store for the duration of one run.
#[derive(Debug)]
pub struct IngestionPipeline<S> {
    mapper: EventMapper<S>,
    store: Box<dyn RecordStore>,
}

impl<S: LogSource> IngestionPipeline<S> {
    /// Wire `mapper` to `store`.
    pub fn new(mapper: EventMapper<S>, store: Box<dyn RecordStore>) -> Self {
        Self { mapper, store }
    }

    /// Map every transfer `token` emitted in `block` and add each one to the
    /// store.
    ///
    /// Each add is independent: a failure is logged and counted, and the
    /// remaining records are still written.
    ///
    /// # Errors
    ///
    /// Returns an error only if mapping the block fails, in which case
    /// nothing is written.
    pub async fn ingest(&self, token: Address, block: u64) -> Result<IngestReport> {
        let records = self.mapper.transfers(token, block).await?;
        tracing::info!(%token, block, transfers = records.len(), "fetched transfers");

        let mut report = IngestReport {
            fetched: records.len(),
            ..IngestReport::default()
        };
        for record in &records {
            match self.store.add(record).await {
                Ok(()) => report.stored += 1,
                Err(e) => {
                    tracing::error!(id = %record.id, error = %e, "save transfer");
                    report.failed.push(record.id.clone());
                }
            }
        }

        tracing::info!(
            block,
            stored = report.stored,
            failed = report.failed.len(),
            "block ingested"
        );
        Ok(report)
    }

    /// Every record ever stored, not only the last ingested block.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read in full.
    pub async fn snapshot(&self) -> Result<Vec<Record>> {
        self.store.read().await
    }

    /// Close the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails to close.
    pub async fn close(self) -> Result<()> {
        self.store.close().await
    }
}
