//! SQLite-backed [`RecordStore`].
//!
//! Layout:
//! ```sql
//! transfers(id TEXT PRIMARY KEY, value TEXT, sender TEXT, receiver TEXT, block INTEGER)
//! ```

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::FromRow;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::error::{Error, Result};
use crate::record::Record;
use crate::store::RecordStore;

const CREATE_TABLE: &str = r"
    CREATE TABLE IF NOT EXISTS transfers (
        id TEXT PRIMARY KEY,
        value TEXT,
        sender TEXT,
        receiver TEXT,
        block INTEGER
    )";

const INSERT_TRANSFER: &str = r"
    INSERT INTO transfers (id, value, sender, receiver, block)
    VALUES (?, ?, ?, ?, ?)";

const SELECT_TRANSFERS: &str = r"
    SELECT id, value, sender, receiver, block
    FROM transfers";

#[derive(Debug, FromRow)]
struct TransferRow {
    id: String,
    value: String,
    sender: String,
    receiver: String,
    block: i64,
}

impl TryFrom<TransferRow> for Record {
    type Error = Error;

    fn try_from(row: TransferRow) -> Result<Self> {
        let block = u64::try_from(row.block)
            .map_err(|_| Error::corrupt_row(&row.id, format!("negative block {}", row.block)))?;
        Ok(Self {
            id: row.id,
            from: row.sender,
            to: row.receiver,
            value: row.value,
            block,
        })
    }
}

/// Records kept in one SQLite database.
#[derive(Debug, Clone)]
pub struct RelationalStore {
    pool: SqlitePool,
}

impl RelationalStore {
    /// Open (creating if missing) the database file at `path` and make sure
    /// the `transfers` table exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the table cannot be
    /// created.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        tracing::debug!(path = %path.display(), "opened sqlite store");
        Self::init(pool).await
    }

    /// Open a private in-memory database.
    ///
    /// The pool holds a single connection that is never recycled, since the
    /// data lives only as long as that connection.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite cannot be initialised.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await?;

        Self::init(pool).await
    }

    async fn init(pool: SqlitePool) -> Result<Self> {
        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Borrow the connection pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl RecordStore for RelationalStore {
    async fn add(&self, record: &Record) -> Result<()> {
        // SQLite integers are signed 64-bit.
        let block = i64::try_from(record.block).map_err(|_| Error::BlockOutOfRange(record.block))?;

        let result = sqlx::query(INSERT_TRANSFER)
            .bind(&record.id)
            .bind(&record.value)
            .bind(&record.from)
            .bind(&record.to)
            .bind(block)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                tracing::debug!(id = %record.id, "transfer already stored");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn read(&self) -> Result<Vec<Record>> {
        let rows: Vec<TransferRow> = sqlx::query_as(SELECT_TRANSFERS)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Record::try_from).collect()
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}
