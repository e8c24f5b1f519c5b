//! Execution of generated SQL.
//!
//! [`BackendWarehouse`] goes through the backend's `run_query` endpoint.
//! [`BigQueryWarehouse`] calls the BigQuery REST API directly with an access
//! token for the runtime's service account.

use std::sync::Arc;

use async_trait::async_trait;
use cora_core::config::{join_url, CoraConfig};
use cora_core::{Endpoint, QueryResult, Row};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::client::Backend;
use crate::error::BackendError;
use crate::identity::TokenProvider;

/// Executes SQL and returns the resulting rows.
#[async_trait]
pub trait Warehouse: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run_query(&self, database: &str, sql: &str) -> Result<QueryResult, BackendError>;
}

// =============================================================================
// Backend run_query
// =============================================================================

/// Runs SQL through [`Backend::run_query`].
pub struct BackendWarehouse {
    backend: Arc<dyn Backend>,
}

impl BackendWarehouse {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Warehouse for BackendWarehouse {
    fn name(&self) -> &'static str {
        "backend"
    }

    async fn run_query(&self, database: &str, sql: &str) -> Result<QueryResult, BackendError> {
        self.backend.run_query(database, sql).await
    }
}

// =============================================================================
// BigQuery REST
// =============================================================================

const BIGQUERY_SCOPE_AUDIENCE: &str = "https://www.googleapis.com/auth/bigquery";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    query: &'a str,
    use_legacy_sql: bool,
    location: &'a str,
    default_dataset: DatasetReference<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DatasetReference<'a> {
    project_id: &'a str,
    dataset_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    job_complete: bool,
    schema: Option<TableSchema>,
    #[serde(default)]
    rows: Vec<TableRow>,
}

#[derive(Debug, Deserialize)]
struct TableSchema {
    #[serde(default)]
    fields: Vec<TableField>,
}

#[derive(Debug, Deserialize)]
struct TableField {
    name: String,
    #[serde(rename = "type")]
    field_type: String,
}

#[derive(Debug, Deserialize)]
struct TableRow {
    #[serde(default)]
    f: Vec<TableCell>,
}

#[derive(Debug, Deserialize)]
struct TableCell {
    #[serde(default)]
    v: Value,
}

/// Runs SQL with the BigQuery `jobs.query` REST method.
///
/// Only the first page of results is read. A job that does not complete
/// within the server-side wait is reported as a failure.
pub struct BigQueryWarehouse {
    http: reqwest::Client,
    tokens: Arc<dyn TokenProvider>,
    base_url: String,
    project_id: String,
    location: String,
}

impl BigQueryWarehouse {
    pub fn new(
        http: reqwest::Client,
        tokens: Arc<dyn TokenProvider>,
        base_url: impl Into<String>,
        project_id: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            http,
            tokens,
            base_url: base_url.into(),
            project_id: project_id.into(),
            location: location.into(),
        }
    }

    pub fn from_config(
        config: &CoraConfig,
        http: reqwest::Client,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self::new(
            http,
            tokens,
            config.warehouse.bigquery_url.clone(),
            config.project.project_id.clone(),
            config.project.region_id.clone(),
        )
    }

    fn queries_url(&self) -> String {
        join_url(
            &self.base_url,
            &format!("bigquery/v2/projects/{}/queries", self.project_id),
        )
    }
}

#[async_trait]
impl Warehouse for BigQueryWarehouse {
    fn name(&self) -> &'static str {
        "bigquery"
    }

    async fn run_query(&self, database: &str, sql: &str) -> Result<QueryResult, BackendError> {
        let endpoint = Endpoint::RunQuery;
        let token = self
            .tokens
            .fetch_token(BIGQUERY_SCOPE_AUDIENCE)
            .await
            .map_err(|e| BackendError::auth(endpoint, e))?;

        let body = QueryRequest {
            query: sql,
            use_legacy_sql: false,
            location: &self.location,
            default_dataset: DatasetReference {
                project_id: &self.project_id,
                dataset_id: database,
            },
        };

        let response = self
            .http
            .post(self.queries_url())
            .bearer_auth(token.secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::transport(endpoint, e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| BackendError::transport(endpoint, e.to_string()))?;
        if !status.is_success() {
            return Err(BackendError::status(endpoint, status.as_u16(), text));
        }

        let parsed: QueryResponse = serde_json::from_str(&text)
            .map_err(|e| BackendError::decode(endpoint, e.to_string()))?;
        if !parsed.job_complete {
            return Err(BackendError::decode(
                endpoint,
                "query job did not complete in time",
            ));
        }

        let result = decode_rows(parsed).map_err(|e| BackendError::decode(endpoint, e))?;
        debug!(rows = result.len(), "BigQuery query complete");
        Ok(result)
    }
}

fn decode_rows(response: QueryResponse) -> Result<QueryResult, String> {
    let fields = response.schema.map(|s| s.fields).unwrap_or_default();
    let mut rows = Vec::with_capacity(response.rows.len());
    for table_row in response.rows {
        if table_row.f.len() != fields.len() {
            return Err(format!(
                "row has {} cells but schema has {} fields",
                table_row.f.len(),
                fields.len()
            ));
        }
        let mut row = Row::new();
        for (field, cell) in fields.iter().zip(table_row.f) {
            row.insert(field.name.clone(), convert_cell(&field.field_type, cell.v));
        }
        rows.push(row);
    }
    Ok(QueryResult::new(rows))
}

/// BigQuery returns scalar cells as strings; restore their JSON type.
fn convert_cell(field_type: &str, value: Value) -> Value {
    let text = match value {
        Value::String(s) => s,
        other => return other,
    };
    match field_type.to_ascii_uppercase().as_str() {
        "INTEGER" | "INT64" => text
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or(Value::String(text)),
        "FLOAT" | "FLOAT64" => text
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::String(text)),
        // Exact decimals become numbers only when f64 holds them losslessly.
        "NUMERIC" => text
            .parse::<f64>()
            .ok()
            .filter(|f| f.to_string() == text)
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::String(text)),
        "BOOLEAN" | "BOOL" => match text.as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::String(text),
        },
        _ => Value::String(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::StaticTokenProvider;
    use serde_json::json;

    fn parse(body: Value) -> QueryResponse {
        serde_json::from_value(body).unwrap()
    }

    // ---- Cell conversion ----

    #[test]
    fn test_convert_cell_types() {
        assert_eq!(convert_cell("INTEGER", json!("42")), json!(42));
        assert_eq!(convert_cell("FLOAT64", json!("1.5")), json!(1.5));
        assert_eq!(convert_cell("BOOLEAN", json!("true")), json!(true));
        assert_eq!(convert_cell("STRING", json!("NTT")), json!("NTT"));
        assert_eq!(convert_cell("DATE", json!("2024-01-31")), json!("2024-01-31"));
        assert_eq!(convert_cell("INTEGER", Value::Null), Value::Null);
    }

    #[test]
    fn test_convert_cell_keeps_unparseable_text() {
        assert_eq!(convert_cell("INT64", json!("n/a")), json!("n/a"));
        assert_eq!(convert_cell("FLOAT", json!("NaN")), json!("NaN"));
    }

    #[test]
    fn test_convert_cell_keeps_decimal_precision() {
        assert_eq!(convert_cell("NUMERIC", json!("1200.5")), json!(1200.5));
        assert_eq!(convert_cell("NUMERIC", json!("42")), json!(42.0));
        assert_eq!(
            convert_cell("NUMERIC", json!("12345678901234567890.12")),
            json!("12345678901234567890.12")
        );
        assert_eq!(
            convert_cell("BIGNUMERIC", json!("123456789012345678901234.5")),
            json!("123456789012345678901234.5")
        );
        assert_eq!(convert_cell("NUMERIC", json!("0.10")), json!("0.10"));
        assert_eq!(convert_cell("BIGNUMERIC", json!("1.5")), json!("1.5"));
    }

    // ---- Row decoding ----

    #[test]
    fn test_decode_rows_in_schema_order() {
        let response = parse(json!({
            "jobComplete": true,
            "schema": { "fields": [
                { "name": "vendor", "type": "STRING" },
                { "name": "amount", "type": "NUMERIC" }
            ]},
            "rows": [
                { "f": [ { "v": "NTT" }, { "v": "1200.5" } ] },
                { "f": [ { "v": "ACME" }, { "v": null } ] }
            ]
        }));
        let result = decode_rows(response).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.columns(), vec!["vendor", "amount"]);
        assert_eq!(result.rows[0]["amount"], json!(1200.5));
        assert_eq!(result.rows[1]["amount"], Value::Null);
    }

    #[test]
    fn test_decode_rows_empty_result() {
        let response = parse(json!({
            "jobComplete": true,
            "schema": { "fields": [ { "name": "x", "type": "STRING" } ] }
        }));
        assert!(decode_rows(response).unwrap().is_empty());
    }

    #[test]
    fn test_decode_rows_cell_count_mismatch() {
        let response = parse(json!({
            "jobComplete": true,
            "schema": { "fields": [ { "name": "x", "type": "STRING" } ] },
            "rows": [ { "f": [ { "v": "a" }, { "v": "b" } ] } ]
        }));
        assert!(decode_rows(response).is_err());
    }

    // ---- Request ----

    #[test]
    fn test_query_request_shape() {
        let body = serde_json::to_value(QueryRequest {
            query: "SELECT 1",
            use_legacy_sql: false,
            location: "us-central1",
            default_dataset: DatasetReference {
                project_id: "p",
                dataset_id: "finance",
            },
        })
        .unwrap();
        assert_eq!(
            body,
            json!({
                "query": "SELECT 1",
                "useLegacySql": false,
                "location": "us-central1",
                "defaultDataset": { "projectId": "p", "datasetId": "finance" }
            })
        );
    }

    #[test]
    fn test_queries_url() {
        let wh = BigQueryWarehouse::new(
            reqwest::Client::new(),
            Arc::new(StaticTokenProvider::new(Some("t".to_string()))),
            "https://bigquery.googleapis.com/",
            "acme",
            "US",
        );
        assert_eq!(
            wh.queries_url(),
            "https://bigquery.googleapis.com/bigquery/v2/projects/acme/queries"
        );
        assert_eq!(wh.name(), "bigquery");
    }
}
