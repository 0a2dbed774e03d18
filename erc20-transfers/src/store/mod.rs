//! Idempotent record persistence.
//!
//! A [`RecordStore`] keeps at most one copy of each record id. Adding an id
//! that already exists succeeds and leaves the stored record untouched.
//! Two backends implement the contract:
//!
//! - [`RelationalStore`]: a single SQLite file, duplicates detected through
//!   the primary-key violation.
//! - [`WideColumnStore`]: a column-family table (Cloud Bigtable), one row per
//!   record keyed by id, so re-adding overwrites in place.

use std::fmt;

use async_trait::async_trait;

use crate::error::Result;
use crate::record::Record;

pub mod relational;
pub mod wide_column;

pub use relational::RelationalStore;
pub use wide_column::WideColumnStore;

/// Name of the table both backends store records in.
pub const TABLE_NAME: &str = "transfers";

/// Persistence capability shared by every storage backend.
#[async_trait]
pub trait RecordStore: Send + Sync + fmt::Debug {
    /// Persist `record` unless a record with the same id already exists.
    ///
    /// # Errors
    ///
    /// Returns an error on any durability or connectivity failure. A
    /// duplicate id is not an error.
    async fn add(&self, record: &Record) -> Result<()>;

    /// Return every stored record.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan or decoding any row fails; no partial
    /// result is produced.
    async fn read(&self) -> Result<Vec<Record>>;

    /// Release the connection or handle held by the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to shut down cleanly.
    async fn close(&self) -> Result<()>;
}
