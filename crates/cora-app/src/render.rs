//! Terminal and HTML rendering of transcript turns.

use std::path::{Path, PathBuf};

use cora_chat::{OutcomeKind, Role, Turn};
use cora_core::{QueryResult, VisualizationSpec};
use serde_json::Value;

/// Google Charts loader referenced by every chart page.
pub const CHART_LOADER_URL: &str = "https://www.gstatic.com/charts/loader.js";

/// Element ids the two chart definitions draw into.
pub const PRIMARY_CHART_ID: &str = "chart_div";
pub const SECONDARY_CHART_ID: &str = "chart_div_1";

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Aligned text table of the first `max_rows` rows.
pub fn render_table(result: &QueryResult, max_rows: usize) -> String {
    let columns = result.columns();
    if columns.is_empty() {
        return String::new();
    }

    let shown = result.head(max_rows);
    let cells: Vec<Vec<String>> = shown
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|c| row.get(c).map(cell_text).unwrap_or_default())
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let line = |values: &[String]| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<width$}", v, width = *w))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = Vec::with_capacity(cells.len() + 3);
    out.push(line(&columns));
    out.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for row in &cells {
        out.push(line(row));
    }

    let hidden = result.len() - shown.len();
    if hidden > 0 {
        out.push(format!("… {} more rows", hidden));
    }
    out.join("\n")
}

/// Text for one turn, prefixed by its author.
pub fn render_turn(turn: &Turn, max_rows: usize) -> String {
    let prefix = match turn.role() {
        Role::User => "you>",
        Role::Assistant => "cora>",
    };
    let mut out = format!("{} {}", prefix, turn.text());

    match turn.outcome() {
        Some(OutcomeKind::Answered) => {
            if let Some(payload) = turn.payload() {
                out.push_str("\n\n");
                out.push_str(&render_table(&payload.result, max_rows));
                out.push_str("\n\nSQL:\n");
                out.push_str(&payload.sql);
            }
        }
        Some(OutcomeKind::EmptyResult) => {
            if let Some(sql) = turn.sql() {
                out.push_str("\n\nSQL:\n");
                out.push_str(sql);
            }
        }
        Some(OutcomeKind::SystemError) => {
            if let Some(detail) = turn.error() {
                out.push_str(&format!("\n({})", detail));
            }
        }
        Some(OutcomeKind::Unanswerable) | None => {}
    }
    out
}

/// Standalone HTML page that draws `chart_js` into `element_id`.
pub fn chart_page(element_id: &str, chart_js: &str) -> String {
    format!(
        r#"<html>
  <head>
    <script type="text/javascript" src="{loader}"></script>
    <script type="text/javascript">
{chart_js}
    </script>
  </head>
  <body>
    <div id="{element_id}"></div>
  </body>
</html>
"#,
        loader = CHART_LOADER_URL,
        chart_js = chart_js,
        element_id = element_id,
    )
}

/// Write both chart definitions as HTML pages under `dir`.
///
/// Files are named `<stem>-chart_div.html` and `<stem>-chart_div_1.html`.
pub fn write_charts(
    dir: &Path,
    stem: &str,
    spec: &VisualizationSpec,
) -> std::io::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(2);
    for (id, js) in [
        (PRIMARY_CHART_ID, &spec.primary),
        (SECONDARY_CHART_ID, &spec.secondary),
    ] {
        let path = dir.join(format!("{}-{}.html", stem, id));
        std::fs::write(&path, chart_page(id, js))?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cora_core::GeneratedQuery;
    use serde_json::json;

    fn result(values: Vec<Value>) -> QueryResult {
        QueryResult::new(
            values
                .into_iter()
                .map(|v| v.as_object().cloned().unwrap())
                .collect(),
        )
    }

    // ---- Tables ----

    #[test]
    fn test_table_aligns_columns() {
        let table = render_table(
            &result(vec![
                json!({ "vendor": "NTT", "amount": 1200 }),
                json!({ "vendor": "Acme Corp", "amount": null }),
            ]),
            50,
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "vendor    | amount");
        assert_eq!(lines[1], "----------+-------");
        assert_eq!(lines[2], "NTT       | 1200");
        assert_eq!(lines[3], "Acme Corp |");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_table_caps_rows_with_footer() {
        let rows = (0..7).map(|i| json!({ "n": i })).collect();
        let table = render_table(&result(rows), 5);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2 + 5 + 1);
        assert_eq!(lines.last(), Some(&"… 2 more rows"));
    }

    #[test]
    fn test_table_fills_missing_cells() {
        let table = render_table(
            &result(vec![json!({ "a": 1 }), json!({ "a": 2, "b": true })]),
            50,
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "a | b");
        assert_eq!(lines[2], "1 |");
        assert_eq!(lines[3], "2 | true");
    }

    #[test]
    fn test_empty_table() {
        assert_eq!(render_table(&QueryResult::default(), 10), "");
    }

    // ---- Turns ----

    #[test]
    fn test_render_user_turn() {
        assert_eq!(render_turn(&Turn::user("hello"), 10), "you> hello");
    }

    #[test]
    fn test_render_answered_turn() {
        let turn = Turn::answered(
            GeneratedQuery::new("SELECT 1 AS n", 200),
            result(vec![json!({ "n": 1 })]),
            VisualizationSpec {
                primary: "p".to_string(),
                secondary: "s".to_string(),
            },
        );
        let text = render_turn(&turn, 10);
        assert!(text.starts_with("cora> I'd be glad to help!"));
        assert!(text.contains("n\n-\n1"));
        assert!(text.ends_with("SQL:\nSELECT 1 AS n"));
    }

    #[test]
    fn test_render_empty_result_shows_sql() {
        let turn = Turn::empty_result(GeneratedQuery::new("SELECT 2", 200));
        assert!(render_turn(&turn, 10).ends_with("SQL:\nSELECT 2"));
    }

    #[test]
    fn test_render_system_error_shows_detail() {
        let turn = Turn::system_error("run_query", "HTTP 502: bad gateway");
        let text = render_turn(&turn, 10);
        assert!(text.starts_with("cora> Something went wrong"));
        assert!(text.ends_with("(HTTP 502: bad gateway)"));
    }

    // ---- Charts ----

    #[test]
    fn test_chart_page_contents() {
        let page = chart_page(PRIMARY_CHART_ID, "google.charts.load('current');");
        assert!(page.contains(CHART_LOADER_URL));
        assert!(page.contains("google.charts.load('current');"));
        assert!(page.contains(r#"<div id="chart_div"></div>"#));
    }

    #[test]
    fn test_write_charts_creates_two_pages() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("charts");
        let spec = VisualizationSpec {
            primary: "drawA()".to_string(),
            secondary: "drawB()".to_string(),
        };
        let paths = write_charts(&out, "turn-2", &spec).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("turn-2-chart_div.html"));
        assert!(paths[1].ends_with("turn-2-chart_div_1.html"));

        let second = std::fs::read_to_string(&paths[1]).unwrap();
        assert!(second.contains("drawB()"));
        assert!(second.contains(r#"<div id="chart_div_1"></div>"#));
    }
}
