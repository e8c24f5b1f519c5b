use std::fmt;

use chrono::{DateTime, Utc};
use cora_core::{GeneratedQuery, QueryResult, Row, VisualizationSpec};
use serde::Serialize;

/// Reply for a question that produced rows.
pub const ANSWERED_MESSAGE: &str = "I'd be glad to help! Here's your answer!";
/// Reply for valid SQL that matched nothing.
pub const EMPTY_RESULT_MESSAGE: &str =
    "The query was generated successfully, but it did not return any data, please request different data!";
/// Reply when the backend could not produce SQL.
pub const UNANSWERABLE_MESSAGE: &str =
    "Hmm, I'm still learning about that. Could you rephrase your question, or provide more context?";

// =============================================================================
// Enums
// =============================================================================

/// Who authored a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// Classification of an assistant turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// SQL ran and returned rows.
    Answered,
    /// SQL ran and returned no rows.
    EmptyResult,
    /// The backend could not generate SQL for the question.
    Unanswerable,
    /// A backend or token call failed.
    SystemError,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Answered => "answered",
            OutcomeKind::EmptyResult => "empty_result",
            OutcomeKind::Unanswerable => "unanswerable",
            OutcomeKind::SystemError => "system_error",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Turn
// =============================================================================

/// Query data attached to an assistant turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnPayload {
    pub sql: String,
    pub result: QueryResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charts: Option<VisualizationSpec>,
}

/// One transcript entry.
///
/// Fields are private: turns are built only through the constructors below,
/// which pair each outcome with the payload it is allowed to carry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Turn {
    role: Role,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<OutcomeKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<TurnPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    created_at: DateTime<Utc>,
}

impl Turn {
    fn assistant(
        text: impl Into<String>,
        outcome: OutcomeKind,
        payload: Option<TurnPayload>,
        error: Option<String>,
    ) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            outcome: Some(outcome),
            payload,
            error,
            created_at: Utc::now(),
        }
    }

    /// A question as the user typed it.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            outcome: None,
            payload: None,
            error: None,
            created_at: Utc::now(),
        }
    }

    /// SQL ran, returned rows, and charts were generated.
    pub fn answered(query: GeneratedQuery, result: QueryResult, charts: VisualizationSpec) -> Self {
        Self::assistant(
            ANSWERED_MESSAGE,
            OutcomeKind::Answered,
            Some(TurnPayload {
                sql: query.sql,
                result,
                charts: Some(charts),
            }),
            None,
        )
    }

    /// SQL ran and returned nothing; the SQL is kept for inspection.
    pub fn empty_result(query: GeneratedQuery) -> Self {
        Self::assistant(
            EMPTY_RESULT_MESSAGE,
            OutcomeKind::EmptyResult,
            Some(TurnPayload {
                sql: query.sql,
                result: QueryResult::default(),
                charts: None,
            }),
            None,
        )
    }

    /// The backend could not generate SQL.
    pub fn unanswerable() -> Self {
        Self::assistant(UNANSWERABLE_MESSAGE, OutcomeKind::Unanswerable, None, None)
    }

    /// A call to `source` failed with `detail`.
    pub fn system_error(source: &str, detail: impl Into<String>) -> Self {
        Self::assistant(
            format!(
                "Something went wrong while talking to the backend ({}). Please try again.",
                source
            ),
            OutcomeKind::SystemError,
            None,
            Some(detail.into()),
        )
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn outcome(&self) -> Option<OutcomeKind> {
        self.outcome
    }

    pub fn payload(&self) -> Option<&TurnPayload> {
        self.payload.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn sql(&self) -> Option<&str> {
        self.payload.as_ref().map(|p| p.sql.as_str())
    }

    pub fn rows(&self) -> &[Row] {
        self.payload
            .as_ref()
            .map(|p| p.result.rows.as_slice())
            .unwrap_or(&[])
    }

    pub fn charts(&self) -> Option<&VisualizationSpec> {
        self.payload.as_ref().and_then(|p| p.charts.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(n: usize) -> QueryResult {
        QueryResult::new(
            (0..n)
                .map(|i| json!({ "col": i }).as_object().cloned().unwrap())
                .collect(),
        )
    }

    fn charts() -> VisualizationSpec {
        VisualizationSpec {
            primary: "a".to_string(),
            secondary: "b".to_string(),
        }
    }

    // ---- Constructors ----

    #[test]
    fn test_user_turn() {
        let turn = Turn::user("How many invoices?");
        assert_eq!(turn.role(), Role::User);
        assert_eq!(turn.text(), "How many invoices?");
        assert!(turn.outcome().is_none());
        assert!(turn.payload().is_none());
    }

    #[test]
    fn test_answered_turn_carries_payload() {
        let turn = Turn::answered(GeneratedQuery::new("SELECT 1", 200), rows(3), charts());
        assert_eq!(turn.role(), Role::Assistant);
        assert_eq!(turn.outcome(), Some(OutcomeKind::Answered));
        assert_eq!(turn.text(), ANSWERED_MESSAGE);
        assert_eq!(turn.sql(), Some("SELECT 1"));
        assert_eq!(turn.rows().len(), 3);
        assert_eq!(turn.charts(), Some(&charts()));
    }

    #[test]
    fn test_empty_result_turn_keeps_sql_only() {
        let turn = Turn::empty_result(GeneratedQuery::new("SELECT * WHERE 1=0", 200));
        assert_eq!(turn.outcome(), Some(OutcomeKind::EmptyResult));
        assert_eq!(turn.sql(), Some("SELECT * WHERE 1=0"));
        assert!(turn.rows().is_empty());
        assert!(turn.charts().is_none());
    }

    #[test]
    fn test_unanswerable_turn_has_no_payload() {
        let turn = Turn::unanswerable();
        assert_eq!(turn.outcome(), Some(OutcomeKind::Unanswerable));
        assert_eq!(turn.text(), UNANSWERABLE_MESSAGE);
        assert!(turn.payload().is_none());
        assert!(turn.error().is_none());
    }

    #[test]
    fn test_system_error_turn_names_source() {
        let turn = Turn::system_error("generate_sql", "connection refused");
        assert_eq!(turn.outcome(), Some(OutcomeKind::SystemError));
        assert!(turn.text().contains("generate_sql"));
        assert_eq!(turn.error(), Some("connection refused"));
        assert!(turn.payload().is_none());
    }

    // ---- Serialization ----

    #[test]
    fn test_turn_serialization_skips_empty_fields() {
        let value = serde_json::to_value(Turn::user("hi")).unwrap();
        assert_eq!(value["role"], json!("user"));
        assert!(value.get("outcome").is_none());
        assert!(value.get("payload").is_none());

        let value = serde_json::to_value(Turn::empty_result(GeneratedQuery::new("SELECT 1", 200)))
            .unwrap();
        assert_eq!(value["outcome"], json!("empty_result"));
        assert_eq!(value["payload"]["result"], json!([]));
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(OutcomeKind::Answered.to_string(), "answered");
        assert_eq!(OutcomeKind::SystemError.to_string(), "system_error");
    }
}
