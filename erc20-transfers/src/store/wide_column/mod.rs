//! Column-family backed [`RecordStore`].
//!
//! Each record is one row keyed by its id. The row has five column
//! families (`id`, `from`, `to`, `value`, `block`), each holding a single
//! column named after the family. Every cell stores the UTF-8 string form of
//! the field, so the block height is written as decimal text.
//!
//! The service itself is reached through two traits: [`TableAdmin`] for
//! schema provisioning and [`TableData`] for row reads and writes.
//! [`BigtableClient`] implements both against Cloud Bigtable;
//! [`MemoryTables`] is an in-process stand-in.

use std::fmt;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::record::Record;
use crate::store::RecordStore;

pub mod bigtable;
mod chunks;
pub mod memory;

pub use bigtable::{BigtableClient, BigtableConfig};
pub use memory::MemoryTables;

/// Column families every record row uses, in field order.
pub const COLUMN_FAMILIES: [&str; 5] =
    [FAMILY_ID, FAMILY_FROM, FAMILY_TO, FAMILY_VALUE, FAMILY_BLOCK];

const FAMILY_ID: &str = "id";
const FAMILY_FROM: &str = "from";
const FAMILY_TO: &str = "to";
const FAMILY_VALUE: &str = "value";
const FAMILY_BLOCK: &str = "block";

/// One cell of a row: family, column qualifier and value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Column family name.
    pub family: String,
    /// Column qualifier within the family.
    pub qualifier: Vec<u8>,
    /// Cell contents.
    pub value: Vec<u8>,
}

impl Cell {
    /// A cell whose qualifier is the family name itself.
    #[must_use]
    pub fn named(family: &str, value: impl Into<Vec<u8>>) -> Self {
        Self {
            family: family.to_owned(),
            qualifier: family.as_bytes().to_vec(),
            value: value.into(),
        }
    }
}

/// A row as returned by a full-table read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    /// Row key.
    pub key: Vec<u8>,
    /// Cells of the row, newest first within a column.
    pub cells: Vec<Cell>,
}

impl Row {
    /// The newest value stored under `family:qualifier`, if any.
    #[must_use]
    pub fn cell(&self, family: &str, qualifier: &[u8]) -> Option<&[u8]> {
        self.cells
            .iter()
            .find(|c| c.family == family && c.qualifier == qualifier)
            .map(|c| c.value.as_slice())
    }
}

/// Schema operations of a column-family service.
#[async_trait]
pub trait TableAdmin: Send + Sync + fmt::Debug {
    /// Ids of every table in the instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the service cannot be queried.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Create an empty table.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be created (including when it
    /// already exists).
    async fn create_table(&self, table: &str) -> Result<()>;

    /// Names of the column families declared on `table`.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    async fn column_families(&self, table: &str) -> Result<Vec<String>>;

    /// Declare a new column family on `table`.
    ///
    /// # Errors
    ///
    /// Returns an error if the family cannot be created.
    async fn create_column_family(&self, table: &str, family: &str) -> Result<()>;
}

/// Row operations of a column-family service.
#[async_trait]
pub trait TableData: Send + Sync + fmt::Debug {
    /// Write `cells` into the row `key`, replacing the columns they name.
    ///
    /// # Errors
    ///
    /// Returns an error if the mutation is rejected or cannot be sent.
    async fn mutate_row(&self, table: &str, key: &[u8], cells: Vec<Cell>) -> Result<()>;

    /// Read every row of `table`, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan fails at any point.
    async fn read_rows(&self, table: &str) -> Result<Vec<Row>>;

    /// Release the connection, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if shutdown fails.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Make sure `table` exists with every family in [`COLUMN_FAMILIES`].
///
/// Missing pieces are created, existing ones are left alone, so running
/// this repeatedly is harmless.
///
/// # Errors
///
/// Returns [`Error::Provision`] describing the first step that failed.
pub async fn provision<A: TableAdmin + ?Sized>(admin: &A, table: &str) -> Result<()> {
    let tables = admin
        .list_tables()
        .await
        .map_err(|e| Error::provision(table, format!("listing tables: {e}")))?;

    if !tables.iter().any(|t| t == table) {
        admin
            .create_table(table)
            .await
            .map_err(|e| Error::provision(table, format!("creating table: {e}")))?;
        tracing::info!(table, "created table");
    }

    let families = admin
        .column_families(table)
        .await
        .map_err(|e| Error::provision(table, format!("reading table info: {e}")))?;

    for family in COLUMN_FAMILIES {
        if families.iter().any(|f| f == family) {
            continue;
        }
        admin
            .create_column_family(table, family)
            .await
            .map_err(|e| Error::provision(table, format!("creating column family {family}: {e}")))?;
        tracing::info!(table, family, "created column family");
    }

    Ok(())
}

/// Records kept in a column-family table, one row per record id.
#[derive(Debug, Clone)]
pub struct WideColumnStore<C> {
    client: C,
    table: String,
}

impl<C: TableData> WideColumnStore<C> {
    /// Provision `table` through `admin` and return a store writing to it
    /// through `client`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Provision`] if the table or any of its column
    /// families cannot be verified or created.
    pub async fn open<A: TableAdmin + ?Sized>(
        admin: &A,
        client: C,
        table: impl Into<String>,
    ) -> Result<Self> {
        let table = table.into();
        provision(admin, &table).await?;
        Ok(Self { client, table })
    }

    /// Name of the backing table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Borrow the data client.
    pub const fn client(&self) -> &C {
        &self.client
    }
}

fn record_cells(record: &Record) -> Vec<Cell> {
    vec![
        Cell::named(FAMILY_ID, record.id.as_bytes()),
        Cell::named(FAMILY_FROM, record.from.as_bytes()),
        Cell::named(FAMILY_TO, record.to.as_bytes()),
        Cell::named(FAMILY_VALUE, record.value.as_bytes()),
        Cell::named(FAMILY_BLOCK, record.block.to_string()),
    ]
}

fn decode_row(row: &Row) -> Result<Record> {
    let key = String::from_utf8_lossy(&row.key);
    let field = |family: &str| -> Result<String> {
        let bytes = row
            .cell(family, family.as_bytes())
            .ok_or_else(|| Error::corrupt_row(key.as_ref(), format!("missing {family} cell")))?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| Error::corrupt_row(key.as_ref(), format!("{family} is not UTF-8")))
    };

    let block = field(FAMILY_BLOCK)?;
    let block = block
        .parse::<u64>()
        .map_err(|e| Error::corrupt_row(key.as_ref(), format!("block {block:?}: {e}")))?;

    Ok(Record {
        id: field(FAMILY_ID)?,
        from: field(FAMILY_FROM)?,
        to: field(FAMILY_TO)?,
        value: field(FAMILY_VALUE)?,
        block,
    })
}

#[async_trait]
impl<C: TableData> RecordStore for WideColumnStore<C> {
    async fn add(&self, record: &Record) -> Result<()> {
        self.client
            .mutate_row(&self.table, record.id.as_bytes(), record_cells(record))
            .await
    }

    async fn read(&self) -> Result<Vec<Record>> {
        let rows = self.client.read_rows(&self.table).await?;
        let mut records = rows.iter().map(decode_row).collect::<Result<Vec<_>>>()?;
        // The key space carries no ordering; callers rely on chronological output.
        records.sort_by_key(|r| r.block);
        Ok(records)
    }

    async fn close(&self) -> Result<()> {
        self.client.close().await
    }
}
