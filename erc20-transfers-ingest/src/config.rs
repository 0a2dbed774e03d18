//! Runtime configuration loaded from `config.toml`.
//!
//! Selects the RPC endpoint, the token contract and the storage backend.
//! Every value can be overridden from the command line; when no config file
//! is present the built-in defaults (public mainnet RPC, USDC, SQLite file
//! `transfers.db`) are used.
//!
//! ```toml
//! rpc = "https://ethereum-rpc.publicnode.com"
//! token = "usdc"
//!
//! [store]
//! backend = "bigtable"
//! project = "my-project"
//! instance = "my-instance"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use alloy::primitives::Address;
use anyhow::{Context, Result, bail};
use erc20_transfers::{BigtableConfig, TABLE_NAME};
use serde::Deserialize;

use crate::tokens;

/// Public Ethereum mainnet RPC used when none is configured.
pub const DEFAULT_RPC: &str = "https://ethereum-rpc.publicnode.com";

/// SQLite file used when none is configured.
pub const DEFAULT_DB_PATH: &str = "transfers.db";

/// Top-level configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// JSON-RPC endpoint of an Ethereum node.
    #[serde(default)]
    pub rpc: Option<String>,

    /// Token symbol or contract address.
    #[serde(default)]
    pub token: Option<String>,

    /// Storage backend.
    #[serde(default)]
    pub store: StoreConfig,
}

/// Storage backend selection, tagged by `backend`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    /// A single SQLite file.
    Sqlite {
        /// Database file, created if missing.
        #[serde(default = "default_db_path")]
        path: PathBuf,
    },
    /// A Cloud Bigtable instance.
    Bigtable(BigtableSettings),
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from(DEFAULT_DB_PATH)
}

fn default_table() -> String {
    TABLE_NAME.to_owned()
}

/// Bigtable deployment settings.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BigtableSettings {
    /// Google Cloud project id. Required.
    #[serde(default)]
    pub project: String,

    /// Bigtable instance id. Required.
    #[serde(default)]
    pub instance: String,

    /// Table holding the records.
    #[serde(default = "default_table")]
    pub table: String,

    /// OAuth2 access token; falls back to `BIGTABLE_ACCESS_TOKEN`.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Data API base URL override.
    #[serde(default)]
    pub data_endpoint: Option<String>,

    /// Admin API base URL override.
    #[serde(default)]
    pub admin_endpoint: Option<String>,
}

impl Default for BigtableSettings {
    fn default() -> Self {
        Self {
            project: String::new(),
            instance: String::new(),
            table: default_table(),
            access_token: None,
            data_endpoint: None,
            admin_endpoint: None,
        }
    }
}

impl fmt::Debug for BigtableSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BigtableSettings")
            .field("project", &self.project)
            .field("instance", &self.instance)
            .field("table", &self.table)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("data_endpoint", &self.data_endpoint)
            .field("admin_endpoint", &self.admin_endpoint)
            .finish()
    }
}

impl BigtableSettings {
    /// Client settings for this deployment.
    #[must_use]
    pub fn client_config(&self) -> BigtableConfig {
        let mut config = BigtableConfig::new(&self.project, &self.instance);
        if let Some(token) = &self.access_token {
            config = config.with_access_token(token);
        }
        if let Some(endpoint) = &self.data_endpoint {
            config.data_endpoint.clone_from(endpoint);
        }
        if let Some(endpoint) = &self.admin_endpoint {
            config.admin_endpoint.clone_from(endpoint);
        }
        config
    }
}

/// Backend names accepted by `--store`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Backend {
    /// SQLite file.
    Sqlite,
    /// Cloud Bigtable.
    Bigtable,
}

/// Values given on the command line; `None` keeps the file's value.
#[derive(Debug, Default)]
pub struct Overrides {
    /// `--rpc`.
    pub rpc: Option<String>,
    /// `--token`.
    pub token: Option<String>,
    /// `--store`.
    pub backend: Option<Backend>,
    /// `--db-path`.
    pub db_path: Option<PathBuf>,
    /// `--project`.
    pub project: Option<String>,
    /// `--instance`.
    pub instance: Option<String>,
    /// `--table`.
    pub table: Option<String>,
}

/// Fully resolved run settings.
#[derive(Debug)]
pub struct Settings {
    /// JSON-RPC endpoint.
    pub rpc: String,
    /// Token contract address.
    pub token: Address,
    /// Storage backend.
    pub store: StoreConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Returns [`Config::default`] if the file does not exist,
    /// allowing the binary to work without any config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text =
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Apply command-line overrides and validate the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be resolved, or if the Bigtable
    /// backend is selected without a project or instance.
    pub fn resolve(self, overrides: Overrides) -> Result<Settings> {
        let rpc = overrides
            .rpc
            .or(self.rpc)
            .unwrap_or_else(|| DEFAULT_RPC.to_owned());
        let token = overrides
            .token
            .or(self.token)
            .unwrap_or_else(|| tokens::DEFAULT_TOKEN.to_owned());
        let token = tokens::resolve(&token)?;

        let store = match (overrides.backend, self.store) {
            (Some(Backend::Sqlite) | None, StoreConfig::Sqlite { path }) => StoreConfig::Sqlite {
                path: overrides.db_path.unwrap_or(path),
            },
            (Some(Backend::Sqlite), StoreConfig::Bigtable(_)) => StoreConfig::Sqlite {
                path: overrides.db_path.unwrap_or_else(default_db_path),
            },
            (Some(Backend::Bigtable) | None, StoreConfig::Bigtable(settings)) => {
                StoreConfig::Bigtable(merge_bigtable(
                    settings,
                    overrides.project,
                    overrides.instance,
                    overrides.table,
                )?)
            }
            (Some(Backend::Bigtable), StoreConfig::Sqlite { .. }) => {
                StoreConfig::Bigtable(merge_bigtable(
                    BigtableSettings::default(),
                    overrides.project,
                    overrides.instance,
                    overrides.table,
                )?)
            }
        };

        Ok(Settings { rpc, token, store })
    }
}

fn merge_bigtable(
    mut settings: BigtableSettings,
    project: Option<String>,
    instance: Option<String>,
    table: Option<String>,
) -> Result<BigtableSettings> {
    if let Some(project) = project {
        settings.project = project;
    }
    if let Some(instance) = instance {
        settings.instance = instance;
    }
    if let Some(table) = table {
        settings.table = table;
    }

    for (flag, value) in [("project", &settings.project), ("instance", &settings.instance)] {
        if value.is_empty() {
            bail!("the {flag} flag is required for the bigtable backend");
        }
    }
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Config {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn empty_file_means_defaults() {
        let settings = parse("").resolve(Overrides::default()).unwrap();

        assert_eq!(settings.rpc, DEFAULT_RPC, "default rpc");
        assert_eq!(settings.token, tokens::by_symbol("USDC").unwrap().address, "USDC");
        assert_eq!(
            settings.store,
            StoreConfig::Sqlite {
                path: PathBuf::from("transfers.db")
            },
            "sqlite default"
        );
    }

    #[test]
    fn bigtable_section_parses() {
        let config = parse(
            r#"
            token = "dai"

            [store]
            backend = "bigtable"
            project = "onboarding"
            instance = "testn1"
            "#,
        );

        let settings = config.resolve(Overrides::default()).unwrap();
        let StoreConfig::Bigtable(bigtable) = settings.store else {
            panic!("expected bigtable backend");
        };
        assert_eq!(bigtable.project, "onboarding", "project");
        assert_eq!(bigtable.instance, "testn1", "instance");
        assert_eq!(bigtable.table, "transfers", "default table");
        assert_eq!(settings.token, tokens::by_symbol("DAI").unwrap().address, "token");
    }

    #[test]
    fn cli_overrides_file() {
        let config = parse(
            r#"
            rpc = "http://file:8545"

            [store]
            backend = "sqlite"
            path = "file.db"
            "#,
        );
        let overrides = Overrides {
            rpc: Some("http://cli:8545".to_owned()),
            db_path: Some(PathBuf::from("cli.db")),
            ..Overrides::default()
        };

        let settings = config.resolve(overrides).unwrap();
        assert_eq!(settings.rpc, "http://cli:8545", "cli rpc wins");
        assert_eq!(
            settings.store,
            StoreConfig::Sqlite {
                path: PathBuf::from("cli.db")
            },
            "cli path wins"
        );
    }

    #[test]
    fn bigtable_requires_project_and_instance() {
        let overrides = Overrides {
            backend: Some(Backend::Bigtable),
            project: Some("p".to_owned()),
            ..Overrides::default()
        };

        let err = parse("").resolve(overrides).unwrap_err();
        assert!(err.to_string().contains("instance"), "unexpected error: {err}");
    }

    #[test]
    fn switching_backend_from_cli() {
        let overrides = Overrides {
            backend: Some(Backend::Bigtable),
            project: Some("p".to_owned()),
            instance: Some("i".to_owned()),
            table: Some("t".to_owned()),
            ..Overrides::default()
        };

        let settings = parse("").resolve(overrides).unwrap();
        let StoreConfig::Bigtable(bigtable) = settings.store else {
            panic!("expected bigtable backend");
        };
        assert_eq!(
            bigtable.client_config().table_path(&bigtable.table),
            "projects/p/instances/i/tables/t",
            "path"
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<Config>("rcp = \"typo\"").is_err(), "typo must fail");
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.store, StoreConfig::default(), "defaults");
    }
}
