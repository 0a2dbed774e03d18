//! Error types for transfer mapping and persistence.

/// Errors produced while reading transfer logs or persisting records.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The JSON-RPC transport failed (node unreachable, bad response, ...).
    #[error("rpc: {0}")]
    Rpc(#[from] alloy::transports::TransportError),

    /// A log entry is missing a field the mapping requires.
    #[error("malformed log: missing {0}")]
    MalformedLog(&'static str),

    /// A log entry does not ABI-decode as an ERC-20 `Transfer`.
    #[error("decode transfer log: {0}")]
    Decode(#[from] alloy::sol_types::Error),

    /// The log source failed for a reason of its own.
    #[error("log source: {0}")]
    Source(String),

    /// The SQLite driver reported a failure.
    #[error("sqlite: {0}")]
    Sqlite(#[from] sqlx::Error),

    /// An HTTP request to the wide-column service could not be completed.
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    /// The wide-column service answered with a non-success status.
    #[error("{operation} failed with status {status}: {body}")]
    Service {
        /// The service operation that failed (e.g. `mutateRow`).
        operation: &'static str,
        /// HTTP status code.
        status: u16,
        /// Response body, as returned by the service.
        body: String,
    },

    /// Table or column-family provisioning failed.
    #[error("provisioning table {table}: {reason}")]
    Provision {
        /// Table being provisioned.
        table: String,
        /// What went wrong.
        reason: String,
    },

    /// A stored row cannot be decoded back into a record.
    #[error("corrupt row {row}: {reason}")]
    CorruptRow {
        /// Row key (record id) of the offending row.
        row: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A block number does not fit the backend's integer column.
    #[error("block number {0} out of range for storage")]
    BlockOutOfRange(u64),
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Build a [`Error::CorruptRow`].
    pub(crate) fn corrupt_row(row: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CorruptRow {
            row: row.into(),
            reason: reason.into(),
        }
    }

    /// Build a [`Error::Provision`].
    pub(crate) fn provision(table: impl Into<String>, reason: impl ToString) -> Self {
        Self::Provision {
            table: table.into(),
            reason: reason.to_string(),
        }
    }
}
