use crate::domain::contract::{LlmExpense, RecordContext};
use crate::domain::expense::ExpenseRecord;
use anyhow::{bail, ensure, Context};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static FENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)```(?:json)?\s*").unwrap());
static LABEL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\A\s*json\b\s*").unwrap());

const PREVIEW_CHARS: usize = 500;

/// Strips Markdown fences and a leading `json` label, then isolates the first `[` through
/// the last `]`. Without array delimiters the cleaned text is returned as-is so that
/// parsing fails loudly.
pub fn extract_json_array(text: &str) -> String {
    let without_fences = FENCE_RE.replace_all(text.trim(), "");
    let without_label = LABEL_RE.replace(&without_fences, "");
    let trimmed = without_label.trim();

    match (trimmed.find('['), trimmed.rfind(']')) {
        (Some(start), Some(end)) if end > start => trimmed[start..=end].to_string(),
        _ => trimmed.to_string(),
    }
}

pub fn parse_expenses(text: &str, ctx: &RecordContext<'_>) -> anyhow::Result<Vec<ExpenseRecord>> {
    let json_str = extract_json_array(text);
    let value = serde_json::from_str::<Value>(&json_str)
        .with_context(|| format!("model output is not valid JSON: {}", preview(&json_str)))?;

    let elements = match value {
        Value::Array(items) => items,
        obj @ Value::Object(_) => vec![obj],
        other => bail!("model output must be a JSON array of expenses (got {other})"),
    };
    ensure!(!elements.is_empty(), "model returned an empty expense array");

    elements
        .into_iter()
        .enumerate()
        .map(|(idx, element)| {
            ensure!(
                element.is_object(),
                "expense #{idx} is not a JSON object: {element}"
            );
            let parsed = serde_json::from_value::<LlmExpense>(element)
                .with_context(|| format!("expense #{idx} does not match the expense schema"))?;
            parsed
                .validate_and_into_record(ctx)
                .with_context(|| format!("expense #{idx} failed validation"))
        })
        .collect()
}

pub fn preview(text: &str) -> String {
    crate::extract::text::truncate_chars(text, PREVIEW_CHARS)
}
