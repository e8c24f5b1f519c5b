//! Request and response bodies for the backend endpoints.
//!
//! List-valued fields are accepted either as JSON arrays or as strings that
//! contain a JSON array of records, since deployed backends return both.

use cora_core::{Row, VisualizationSpec};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Serialize)]
pub struct KnownSqlRequest<'a> {
    pub user_database: &'a str,
}

#[derive(Debug, Serialize)]
pub struct GenerateSqlRequest<'a> {
    pub user_question: &'a str,
    pub user_database: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RunQueryRequest<'a> {
    pub user_database: &'a str,
    pub generated_sql: &'a str,
}

#[derive(Debug, Serialize)]
pub struct EmbedSqlRequest<'a> {
    pub user_question: &'a str,
    pub generated_sql: &'a str,
    pub user_database: &'a str,
}

#[derive(Debug, Serialize)]
pub struct NaturalResponseRequest<'a> {
    pub user_question: &'a str,
    pub user_database: &'a str,
}

#[derive(Debug, Serialize)]
pub struct GenerateVizRequest<'a> {
    pub user_question: &'a str,
    pub sql_generated: &'a str,
    /// JSON array of records, as a string.
    pub sql_results: &'a str,
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct KnownDbResponse {
    #[serde(rename = "KnownDB")]
    pub known_db: Value,
}

#[derive(Debug, Deserialize)]
pub struct KnownSqlResponse {
    #[serde(rename = "KnownSQL")]
    pub known_sql: Value,
}

#[derive(Debug, Deserialize)]
pub struct GenerateSqlResponse {
    #[serde(rename = "ResponseCode")]
    pub response_code: i64,
    #[serde(rename = "GeneratedSQL", default)]
    pub generated_sql: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NaturalResponseResponse {
    #[serde(rename = "NaturalResponse")]
    pub natural_response: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateVizResponse {
    #[serde(rename = "GeneratedChartjs")]
    pub generated_chartjs: ChartPair,
}

#[derive(Debug, Deserialize)]
pub struct ChartPair {
    pub chart_div: Value,
    pub chart_div_1: Value,
}

impl From<ChartPair> for VisualizationSpec {
    fn from(pair: ChartPair) -> Self {
        VisualizationSpec {
            primary: value_to_text(pair.chart_div),
            secondary: value_to_text(pair.chart_div_1),
        }
    }
}

// =============================================================================
// Decoding helpers
// =============================================================================

/// Unwrap a list that may be encoded as a JSON string.
pub fn list_items(value: Value) -> Result<Vec<Value>, String> {
    match value {
        Value::Array(items) => Ok(items),
        Value::String(s) => match serde_json::from_str::<Value>(&s) {
            Ok(Value::Array(items)) => Ok(items),
            Ok(other) => Err(format!("expected a list, got {}", kind(&other))),
            Err(e) => Err(format!("expected a JSON list: {}", e)),
        },
        Value::Null => Ok(Vec::new()),
        other => Err(format!("expected a list, got {}", kind(&other))),
    }
}

/// Rows from a list of records.
pub fn rows_from(value: Value) -> Result<Vec<Row>, String> {
    list_items(value)?
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => Ok(map),
            other => Err(format!("expected a record, got {}", kind(&other))),
        })
        .collect()
}

/// Strings from a list whose items are strings or single-purpose records.
///
/// For a record, `preferred` names the field to use; otherwise its first
/// string field is taken.
pub fn strings_from(value: Value, preferred: &str) -> Result<Vec<String>, String> {
    list_items(value)?
        .into_iter()
        .map(|item| match item {
            Value::String(s) => Ok(s),
            Value::Object(map) => map
                .get(preferred)
                .and_then(Value::as_str)
                .or_else(|| map.values().find_map(Value::as_str))
                .map(str::to_string)
                .ok_or_else(|| "record has no text field".to_string()),
            other => Err(format!("expected text, got {}", kind(&other))),
        })
        .collect()
}

fn value_to_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a record",
    }
}
