//! Opens the configured [`RecordStore`].

use anyhow::{Context, Result};
use erc20_transfers::{BigtableClient, RecordStore, RelationalStore, WideColumnStore};

use crate::config::StoreConfig;

/// Open the store selected by `config`, provisioning it if needed.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or the Bigtable table
/// cannot be provisioned.
pub async fn open_store(config: &StoreConfig) -> Result<Box<dyn RecordStore>> {
    match config {
        StoreConfig::Sqlite { path } => {
            let store = RelationalStore::open(path)
                .await
                .with_context(|| format!("opening {}", path.display()))?;
            tracing::info!(path = %path.display(), "using sqlite store");
            Ok(Box::new(store))
        }
        StoreConfig::Bigtable(settings) => {
            let client = BigtableClient::new(settings.client_config())?;
            let store = WideColumnStore::open(&client, client.clone(), settings.table.as_str())
                .await
                .with_context(|| {
                    format!(
                        "provisioning {}",
                        settings.client_config().table_path(&settings.table)
                    )
                })?;
            tracing::info!(
                project = %settings.project,
                instance = %settings.instance,
                table = %settings.table,
                "using bigtable store"
            );
            Ok(Box::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sqlite_backend_creates_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transfers.db");

        let store = open_store(&StoreConfig::Sqlite { path: path.clone() }).await.unwrap();

        assert!(path.exists(), "database file created");
        assert!(store.read().await.unwrap().is_empty(), "fresh store is empty");
        store.close().await.unwrap();
    }
}
