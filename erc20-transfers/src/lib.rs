//! ERC-20 `Transfer` ingestion core.
//!
//! Turns the `Transfer` logs a token contract emitted in one block into
//! [`Record`]s and stores each of them exactly once, in either SQLite
//! ([`RelationalStore`]) or a column-family table such as Cloud Bigtable
//! ([`WideColumnStore`]).
//!
//! ```rust,ignore
//! use erc20_transfers::{EventMapper, IngestionPipeline, RelationalStore, RpcLogSource};
//!
//! let provider = ProviderBuilder::new().connect_http(rpc_url);
//! let mapper = EventMapper::new(RpcLogSource::new(provider));
//! let store = RelationalStore::open("transfers.db").await?;
//! let pipeline = IngestionPipeline::new(mapper, Box::new(store));
//!
//! pipeline.ingest(usdc, 19_000_000).await?;
//! for record in pipeline.snapshot().await? {
//!     println!("{record}");
//! }
//! pipeline.close().await?;
//! ```

pub mod error;
pub mod mapper;
pub mod pipeline;
pub mod record;
pub mod source;
pub mod store;

pub use error::{Error, Result};
pub use mapper::EventMapper;
pub use pipeline::{IngestReport, IngestionPipeline};
pub use record::Record;
pub use source::{LogSource, RawTransfer, RpcLogSource, TransferFilter};
pub use store::wide_column::{BigtableClient, BigtableConfig, MemoryTables};
pub use store::{RecordStore, RelationalStore, TABLE_NAME, WideColumnStore};
