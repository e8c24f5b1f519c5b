//! Outcome classification.

use cora_core::{GeneratedQuery, QueryResult};

use crate::types::OutcomeKind;

/// Classify a generated query and the rows it produced.
///
/// - failed generation -> `Unanswerable`
/// - no rows -> `EmptyResult`
/// - otherwise -> `Answered`
///
/// Never returns `SystemError`; that kind is assigned when a call fails.
pub fn classify(query: &GeneratedQuery, result: &QueryResult) -> OutcomeKind {
    if !query.is_success() {
        OutcomeKind::Unanswerable
    } else if result.is_empty() {
        OutcomeKind::EmptyResult
    } else {
        OutcomeKind::Answered
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

    #[test]
    fn test_failed_generation_is_unanswerable() {
        let query = GeneratedQuery::new("", 500);
        assert_eq!(classify(&query, &rows(0)), OutcomeKind::Unanswerable);
        // Rows do not matter once generation failed.
        assert_eq!(classify(&query, &rows(3)), OutcomeKind::Unanswerable);
    }

    #[test]
    fn test_success_without_rows_is_empty_result() {
        let query = GeneratedQuery::new("SELECT * WHERE 1=0", 200);
        assert_eq!(classify(&query, &rows(0)), OutcomeKind::EmptyResult);
    }

    #[test]
    fn test_success_with_rows_is_answered() {
        let query = GeneratedQuery::new("SELECT 1", 200);
        assert_eq!(classify(&query, &rows(1)), OutcomeKind::Answered);
        assert_eq!(classify(&query, &rows(500)), OutcomeKind::Answered);
    }

    #[test]
    fn test_classify_is_total_over_status_codes() {
        for code in [0, 100, 199, 200, 201, 400, 404, 500, 503, -1] {
            for n in [0, 1, 13] {
                let query = GeneratedQuery::new("SELECT 1", code);
                let expected = match (code == 200, n == 0) {
                    (false, _) => OutcomeKind::Unanswerable,
                    (true, true) => OutcomeKind::EmptyResult,
                    (true, false) => OutcomeKind::Answered,
                };
                assert_eq!(classify(&query, &rows(n)), expected);
                // Deterministic.
                assert_eq!(classify(&query, &rows(n)), classify(&query, &rows(n)));
            }
        }
    }
}
