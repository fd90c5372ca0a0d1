use crate::domain::expense::{
    Category, ExpenseRecord, PaymentMode, UNKNOWN_VENDOR, UNSPECIFIED_ITEM,
};
use crate::extract::text::clean_item;
use anyhow::{bail, ensure, Context};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One expense object as the model emits it. Every field is optional on the wire;
/// validation decides what is fatal.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LlmExpense {
    #[serde(default, deserialize_with = "loose_string")]
    pub date: Option<String>,
    #[serde(default)]
    pub amount: Option<LlmAmount>,
    #[serde(default, deserialize_with = "loose_string")]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub sub_category: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub item: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub vendor: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub payment_mode: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LlmAmount {
    Number(f64),
    Text(String),
}

impl LlmAmount {
    fn value(&self) -> anyhow::Result<f64> {
        let amount = match self {
            LlmAmount::Number(n) => *n,
            LlmAmount::Text(s) => {
                let cleaned: String = s
                    .trim()
                    .trim_start_matches('₹')
                    .trim_start_matches("Rs.")
                    .trim_start_matches("Rs")
                    .chars()
                    .filter(|c| *c != ',' && !c.is_whitespace())
                    .collect();
                cleaned
                    .parse::<f64>()
                    .with_context(|| format!("amount is not numeric: {s:?}"))?
            }
        };
        ensure!(amount.is_finite(), "amount must be finite (got {amount})");
        ensure!(amount >= 0.0, "amount must be non-negative (got {amount})");
        Ok(amount)
    }
}

/// Per-message values attached to every record.
#[derive(Debug, Clone)]
pub struct RecordContext<'a> {
    pub message_date: NaiveDate,
    pub default_currency: &'a str,
    pub raw_message: &'a str,
    pub timestamp: DateTime<Utc>,
}

impl LlmExpense {
    pub fn validate_and_into_record(self, ctx: &RecordContext<'_>) -> anyhow::Result<ExpenseRecord> {
        let Some(amount) = self.amount.as_ref() else {
            bail!("expense is missing amount");
        };
        let amount = amount.value()?;

        let date = self
            .date
            .as_deref()
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
            .unwrap_or(ctx.message_date);

        let currency = non_blank(self.currency)
            .map(|s| s.to_uppercase())
            .unwrap_or_else(|| ctx.default_currency.to_string());

        let category = self
            .category
            .as_deref()
            .map(Category::from_label)
            .unwrap_or(Category::Other);

        let payment_mode = self
            .payment_mode
            .as_deref()
            .map(PaymentMode::from_label)
            .unwrap_or(PaymentMode::Unknown);

        let item = self
            .item
            .as_deref()
            .map(clean_item)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNSPECIFIED_ITEM.to_string());

        Ok(ExpenseRecord {
            date,
            amount,
            currency,
            category,
            sub_category: non_blank(self.sub_category).unwrap_or_default(),
            item,
            vendor: non_blank(self.vendor).unwrap_or_else(|| UNKNOWN_VENDOR.to_string()),
            payment_mode,
            notes: non_blank(self.notes).unwrap_or_default(),
            raw_message: ctx.raw_message.to_string(),
            timestamp: ctx.timestamp,
        })
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}
