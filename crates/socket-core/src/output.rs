//! Output kinds and renderers shared by every command: one JSON object per
//! invocation, markdown tables, plain-text failure banners. Colorization is
//! the binary's concern.

use serde::Serialize;
use serde_json::Value;

use crate::result::CResult;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OutputKind {
    Text,
    Json,
    Markdown,
}

impl OutputKind {
    /// --json and --markdown are mutually exclusive; both set is a usage error.
    pub fn from_flags(json: bool, markdown: bool) -> Result<OutputKind, String> {
        match (json, markdown) {
            (true, true) => Err("--json and --markdown are mutually exclusive".to_string()),
            (true, false) => Ok(OutputKind::Json),
            (false, true) => Ok(OutputKind::Markdown),
            (false, false) => Ok(OutputKind::Text),
        }
    }
}

/// The single JSON object emitted in --json mode, success or failure.
pub fn render_json<T: Serialize>(result: &CResult<T>) -> String {
    result.to_json().to_string()
}

/// A GitHub-style markdown table.
pub fn markdown_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    out.push_str("| ");
    out.push_str(&headers.join(" | "));
    out.push_str(" |\n| ");
    out.push_str(&vec!["---"; headers.len()].join(" | "));
    out.push_str(" |\n");
    for row in rows {
        out.push_str("| ");
        out.push_str(&row.join(" | "));
        out.push_str(" |\n");
    }
    out
}

/// Table rows from an array of API objects, one column per field name.
pub fn rows_from_values(items: &[Value], fields: &[&str]) -> Vec<Vec<String>> {
    items
        .iter()
        .map(|item| {
            fields
                .iter()
                .map(|f| match item.get(*f) {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Null) | None => String::new(),
                    Some(v) => v.to_string(),
                })
                .collect()
        })
        .collect()
}

pub fn fail_banner(message: &str, cause: Option<&str>) -> String {
    match cause {
        Some(cause) => format!("Fail: {} ({})", message, cause),
        None => format!("Fail: {}", message),
    }
}

pub fn input_error_banner(problems: &[String]) -> String {
    let mut out = String::from("Input error:\n");
    for problem in problems {
        out.push_str(&format!("  - {}\n", problem));
    }
    out
}
