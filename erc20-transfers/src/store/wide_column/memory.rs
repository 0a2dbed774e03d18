//! In-process column-family service.
//!
//! Mirrors the parts of Bigtable the store relies on: tables and families
//! must be created before use, writes replace cells in place, and a scan
//! returns rows in no guaranteed order (the key space is a hash map).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{Cell, Row, TableAdmin, TableData};
use crate::error::{Error, Result};

type Column = (String, Vec<u8>);

#[derive(Debug, Default)]
struct Table {
    families: Vec<String>,
    rows: HashMap<Vec<u8>, HashMap<Column, Vec<u8>>>,
}

/// Shared handle to a set of in-memory tables; clones see the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryTables {
    tables: Arc<Mutex<HashMap<String, Table>>>,
}

impl MemoryTables {
    /// An instance with no tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently stored in `table`.
    #[must_use]
    pub fn row_count(&self, table: &str) -> usize {
        self.lock().get(table).map_or(0, |t| t.rows.len())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Table>> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn not_found(operation: &'static str, what: String) -> Error {
    Error::Service {
        operation,
        status: 404,
        body: format!("{what} not found"),
    }
}

fn already_exists(operation: &'static str, what: String) -> Error {
    Error::Service {
        operation,
        status: 409,
        body: format!("{what} already exists"),
    }
}

#[async_trait]
impl TableAdmin for MemoryTables {
    async fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self.lock().keys().cloned().collect())
    }

    async fn create_table(&self, table: &str) -> Result<()> {
        let mut tables = self.lock();
        if tables.contains_key(table) {
            return Err(already_exists("createTable", format!("table {table}")));
        }
        tables.insert(table.to_owned(), Table::default());
        Ok(())
    }

    async fn column_families(&self, table: &str) -> Result<Vec<String>> {
        self.lock()
            .get(table)
            .map(|t| t.families.clone())
            .ok_or_else(|| not_found("getTable", format!("table {table}")))
    }

    async fn create_column_family(&self, table: &str, family: &str) -> Result<()> {
        let mut tables = self.lock();
        let t = tables
            .get_mut(table)
            .ok_or_else(|| not_found("modifyColumnFamilies", format!("table {table}")))?;
        if t.families.iter().any(|f| f == family) {
            return Err(already_exists(
                "modifyColumnFamilies",
                format!("column family {family}"),
            ));
        }
        t.families.push(family.to_owned());
        Ok(())
    }
}

#[async_trait]
impl TableData for MemoryTables {
    async fn mutate_row(&self, table: &str, key: &[u8], cells: Vec<Cell>) -> Result<()> {
        let mut tables = self.lock();
        let t = tables
            .get_mut(table)
            .ok_or_else(|| not_found("mutateRow", format!("table {table}")))?;

        // Validate the whole mutation before applying any of it.
        if let Some(cell) = cells.iter().find(|c| !t.families.contains(&c.family)) {
            return Err(not_found("mutateRow", format!("column family {}", cell.family)));
        }

        let row = t.rows.entry(key.to_vec()).or_default();
        for cell in cells {
            row.insert((cell.family, cell.qualifier), cell.value);
        }
        Ok(())
    }

    async fn read_rows(&self, table: &str) -> Result<Vec<Row>> {
        let tables = self.lock();
        let t = tables
            .get(table)
            .ok_or_else(|| not_found("readRows", format!("table {table}")))?;

        Ok(t.rows
            .iter()
            .map(|(key, columns)| Row {
                key: key.clone(),
                cells: columns
                    .iter()
                    .map(|((family, qualifier), value)| Cell {
                        family: family.clone(),
                        qualifier: qualifier.clone(),
                        value: value.clone(),
                    })
                    .collect(),
            })
            .collect())
    }
}
