//! Cloud Bigtable client over the REST/JSON API.
//!
//! Schema operations go to the table admin service
//! (`bigtableadmin.googleapis.com`), row operations to the data service
//! (`bigtable.googleapis.com`). Requests carry an OAuth2 bearer token, e.g.
//! the output of `gcloud auth print-access-token`.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use base64ct::{Base64, Encoding};
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;

use super::chunks::{self, ReadRowsResponse};
use super::{Cell, Row, TableAdmin, TableData};
use crate::error::{Error, Result};

/// Default data API endpoint.
pub const DATA_ENDPOINT: &str = "https://bigtable.googleapis.com";

/// Default table admin API endpoint.
pub const ADMIN_ENDPOINT: &str = "https://bigtableadmin.googleapis.com";

/// Environment variable consulted when no access token is configured.
pub const ACCESS_TOKEN_ENV: &str = "BIGTABLE_ACCESS_TOKEN";

/// Connection settings for one Bigtable instance.
#[derive(Clone)]
pub struct BigtableConfig {
    /// Google Cloud project id.
    pub project: String,
    /// Bigtable instance id.
    pub instance: String,
    /// OAuth2 access token sent as a bearer token.
    pub access_token: Option<String>,
    /// Base URL of the data API.
    pub data_endpoint: String,
    /// Base URL of the table admin API.
    pub admin_endpoint: String,
}

impl BigtableConfig {
    /// Settings for `project`/`instance` on the public endpoints, with the
    /// access token taken from [`ACCESS_TOKEN_ENV`] if set.
    #[must_use]
    pub fn new(project: impl Into<String>, instance: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            instance: instance.into(),
            access_token: std::env::var(ACCESS_TOKEN_ENV).ok().filter(|t| !t.is_empty()),
            data_endpoint: DATA_ENDPOINT.to_owned(),
            admin_endpoint: ADMIN_ENDPOINT.to_owned(),
        }
    }

    /// Replace the access token.
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// `projects/<project>/instances/<instance>`.
    #[must_use]
    pub fn instance_path(&self) -> String {
        format!("projects/{}/instances/{}", self.project, self.instance)
    }

    /// `projects/<project>/instances/<instance>/tables/<table>`.
    #[must_use]
    pub fn table_path(&self, table: &str) -> String {
        format!("{}/tables/{table}", self.instance_path())
    }
}

impl fmt::Debug for BigtableConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BigtableConfig")
            .field("project", &self.project)
            .field("instance", &self.instance)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("data_endpoint", &self.data_endpoint)
            .field("admin_endpoint", &self.admin_endpoint)
            .finish()
    }
}

/// Bigtable admin + data client.
#[derive(Debug, Clone)]
pub struct BigtableClient {
    http: reqwest::Client,
    config: BigtableConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListTablesResponse {
    #[serde(default)]
    tables: Vec<TableName>,
    #[serde(default)]
    next_page_token: String,
}

#[derive(Debug, Deserialize)]
struct TableName {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableSchema {
    #[serde(default)]
    column_families: HashMap<String, serde_json::Value>,
}

/// `ReadRows` is server-streaming: the REST gateway answers with an array
/// of messages, or a single message for short streams.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReadRowsBody {
    Stream(Vec<ReadRowsResponse>),
    Single(ReadRowsResponse),
}

impl BigtableClient {
    /// Build a client for the instance described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialised.
    pub fn new(config: BigtableConfig) -> Result<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self { http, config })
    }

    /// The connection settings.
    #[must_use]
    pub const fn config(&self) -> &BigtableConfig {
        &self.config
    }

    fn admin_url(&self, path: &str) -> String {
        format!("{}/v2/{path}", self.config.admin_endpoint.trim_end_matches('/'))
    }

    fn data_url(&self, path: &str) -> String {
        format!("{}/v2/{path}", self.config.data_endpoint.trim_end_matches('/'))
    }

    async fn send(&self, operation: &'static str, request: RequestBuilder) -> Result<Response> {
        let request = match &self.config.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::Service {
            operation,
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl TableAdmin for BigtableClient {
    async fn list_tables(&self) -> Result<Vec<String>> {
        let url = self.admin_url(&format!("{}/tables", self.config.instance_path()));
        let mut tables = Vec::new();
        let mut page_token = String::new();

        loop {
            let mut request = self.http.get(&url).query(&[("view", "NAME_ONLY")]);
            if !page_token.is_empty() {
                request = request.query(&[("pageToken", page_token.as_str())]);
            }
            let page: ListTablesResponse = self.send("listTables", request).await?.json().await?;

            // Names are fully qualified: projects/p/instances/i/tables/<id>.
            tables.extend(
                page.tables
                    .into_iter()
                    .filter_map(|t| t.name.rsplit('/').next().map(str::to_owned)),
            );
            if page.next_page_token.is_empty() {
                return Ok(tables);
            }
            page_token = page.next_page_token;
        }
    }

    async fn create_table(&self, table: &str) -> Result<()> {
        let url = self.admin_url(&format!("{}/tables", self.config.instance_path()));
        let body = json!({ "tableId": table, "table": {} });
        self.send("createTable", self.http.post(url).json(&body)).await?;
        Ok(())
    }

    async fn column_families(&self, table: &str) -> Result<Vec<String>> {
        let url = self.admin_url(&self.config.table_path(table));
        let request = self.http.get(url).query(&[("view", "SCHEMA_VIEW")]);
        let schema: TableSchema = self.send("getTable", request).await?.json().await?;
        Ok(schema.column_families.into_keys().collect())
    }

    async fn create_column_family(&self, table: &str, family: &str) -> Result<()> {
        let url = self.admin_url(&format!(
            "{}:modifyColumnFamilies",
            self.config.table_path(table)
        ));
        let body = json!({ "modifications": [{ "id": family, "create": {} }] });
        self.send("modifyColumnFamilies", self.http.post(url).json(&body)).await?;
        Ok(())
    }
}

#[async_trait]
impl TableData for BigtableClient {
    async fn mutate_row(&self, table: &str, key: &[u8], cells: Vec<Cell>) -> Result<()> {
        let url = self.data_url(&format!("{}:mutateRow", self.config.table_path(table)));
        let body = mutate_row_body(key, &cells);
        self.send("mutateRow", self.http.post(url).json(&body)).await?;
        Ok(())
    }

    async fn read_rows(&self, table: &str) -> Result<Vec<Row>> {
        let url = self.data_url(&format!("{}:readRows", self.config.table_path(table)));
        let body = json!({ "filter": { "cellsPerColumnLimitFilter": 1 } });
        let response = self.send("readRows", self.http.post(url).json(&body)).await?;
        let responses = match response.json::<ReadRowsBody>().await? {
            ReadRowsBody::Stream(responses) => responses,
            ReadRowsBody::Single(response) => vec![response],
        };
        chunks::merge(responses)
    }
}

/// JSON body of a `mutateRow` call setting every cell at server time.
fn mutate_row_body(key: &[u8], cells: &[Cell]) -> serde_json::Value {
    let mutations: Vec<_> = cells
        .iter()
        .map(|cell| {
            json!({
                "setCell": {
                    "familyName": cell.family,
                    "columnQualifier": Base64::encode_string(&cell.qualifier),
                    // -1: the server assigns the timestamp.
                    "timestampMicros": "-1",
                    "value": Base64::encode_string(&cell.value),
                }
            })
        })
        .collect();

    json!({ "rowKey": Base64::encode_string(key), "mutations": mutations })
}
