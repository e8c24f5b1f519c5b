use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;

// =============================================================================
// Endpoints
// =============================================================================

/// Backend capabilities, one HTTP endpoint each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    AvailableDatabases,
    GetKnownSql,
    GenerateSql,
    RunQuery,
    EmbedSql,
    NaturalResponse,
    GenerateViz,
}

impl Endpoint {
    /// All endpoints, in the order they appear in the configuration file.
    pub const ALL: [Endpoint; 7] = [
        Endpoint::AvailableDatabases,
        Endpoint::GetKnownSql,
        Endpoint::GenerateSql,
        Endpoint::RunQuery,
        Endpoint::EmbedSql,
        Endpoint::NaturalResponse,
        Endpoint::GenerateViz,
    ];

    /// Stable name used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::AvailableDatabases => "available_databases",
            Endpoint::GetKnownSql => "get_known_sql",
            Endpoint::GenerateSql => "generate_sql",
            Endpoint::RunQuery => "run_query",
            Endpoint::EmbedSql => "embed_sql",
            Endpoint::NaturalResponse => "natural_response",
            Endpoint::GenerateViz => "generate_viz",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Query data
// =============================================================================

/// Response code the backend uses for a successfully generated query.
pub const SUCCESS_STATUS: i64 = 200;

/// One result record. Column order is preserved as returned by the warehouse.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// SQL produced by the backend for a natural-language question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedQuery {
    pub sql: String,
    pub status_code: i64,
}

impl GeneratedQuery {
    pub fn new(sql: impl Into<String>, status_code: i64) -> Self {
        Self {
            sql: sql.into(),
            status_code,
        }
    }

    /// Whether the backend was able to produce SQL for the question.
    pub fn is_success(&self) -> bool {
        self.status_code == SUCCESS_STATUS
    }
}

/// Tabular rows returned by executing a [`GeneratedQuery`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryResult {
    pub rows: Vec<Row>,
}

impl QueryResult {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// The first `limit` rows, or all of them if there are fewer.
    pub fn head(&self, limit: usize) -> &[Row] {
        &self.rows[..self.rows.len().min(limit)]
    }

    /// Column names in first-seen order across all rows.
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for row in &self.rows {
            for key in row.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
        columns
    }

    /// Serialize the first `limit` rows as a JSON array of records.
    pub fn head_as_records_json(&self, limit: usize) -> Result<String> {
        Ok(serde_json::to_string(self.head(limit))?)
    }
}

/// Chart definitions generated for a result set.
///
/// `primary` renders into the `chart_div` element, `secondary` into
/// `chart_div_1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualizationSpec {
    pub primary: String,
    pub secondary: String,
}
