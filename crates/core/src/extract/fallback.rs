//! Deterministic extractor used whenever the model path fails.
//!
//! Recovers one record per "<amount> for/on/spent/paid <context>" clause, then degrades
//! to the first number in the message, and finally to a single "Needs review" record.
//! Clause boundaries are heuristic: an "and" inside an item or vendor name splits it.
//! Indic digits are read as ASCII before matching; `raw_message` itself is never rewritten.

use crate::domain::contract::RecordContext;
use crate::domain::expense::{
    Category, ExpenseRecord, PaymentMode, UNKNOWN_VENDOR, UNSPECIFIED_ITEM,
};
use crate::extract::classify::{classify, detect_vendor, Classification};
use crate::extract::text::{ascii_digits, truncate_chars, ITEM_MAX_CHARS};
use once_cell::sync::Lazy;
use regex::Regex;

const NOTES_MAX_CHARS: usize = 100;
const NEEDS_REVIEW: &str = "Needs review";

// Context stops before the next number (the next amount-bearing clause) or a comma.
static CLAUSE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"([0-9]+(?:,[0-9]{2,3})*(?:\.[0-9]+)?)\s*(?:rupees|rs\.?|₹)?\s*(?:for|on|spent|paid)\s+([^,0-9]+)",
    )
    .unwrap()
});
static AND_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\band\b").unwrap());
static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+(?:,[0-9]{2,3})*(?:\.[0-9]+)?").unwrap());

/// Never returns an empty vector.
pub fn extract(ctx: &RecordContext<'_>) -> Vec<ExpenseRecord> {
    let message = ctx.raw_message;
    let normalized = ascii_digits(message);
    let lowered = normalized.to_lowercase();

    let clauses: Vec<ExpenseRecord> = CLAUSE_RE
        .captures_iter(&lowered)
        .filter_map(|caps| {
            let amount = parse_amount(caps.get(1)?.as_str())?;
            let context = clause_context(caps.get(2)?.as_str());
            Some(record(ctx, amount, classify(context), detect_vendor(context), context))
        })
        .collect();
    if !clauses.is_empty() {
        tracing::debug!(count = clauses.len(), "fallback matched amount clauses");
        return clauses;
    }

    if let Some(amount) = NUMBER_RE
        .find_iter(&normalized)
        .find_map(|m| parse_amount(m.as_str()))
    {
        tracing::debug!(amount, "fallback using first number in message");
        return vec![record(
            ctx,
            amount,
            classify(&lowered),
            detect_vendor(&lowered),
            message,
        )];
    }

    tracing::debug!("fallback found no amount; emitting review record");
    vec![needs_review(ctx)]
}

fn clause_context(raw: &str) -> &str {
    let cut = AND_RE.find(raw).map_or(raw, |m| &raw[..m.start()]);
    cut.trim()
        .trim_end_matches(|c: char| matches!(c, '.' | '!' | ';' | ':'))
        .trim_end()
}

fn parse_amount(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse::<f64>().ok()
}

fn record(
    ctx: &RecordContext<'_>,
    amount: f64,
    classification: Classification,
    vendor: String,
    notes: &str,
) -> ExpenseRecord {
    let item = truncate_chars(classification.item.trim(), ITEM_MAX_CHARS);
    ExpenseRecord {
        date: ctx.message_date,
        amount,
        currency: ctx.default_currency.to_string(),
        category: classification.category,
        sub_category: classification.sub_category,
        item: if item.is_empty() {
            UNSPECIFIED_ITEM.to_string()
        } else {
            item
        },
        vendor,
        payment_mode: PaymentMode::Unknown,
        notes: truncate_chars(notes, NOTES_MAX_CHARS),
        raw_message: ctx.raw_message.to_string(),
        timestamp: ctx.timestamp,
    }
}

fn needs_review(ctx: &RecordContext<'_>) -> ExpenseRecord {
    ExpenseRecord {
        date: ctx.message_date,
        amount: 0.0,
        currency: ctx.default_currency.to_string(),
        category: Category::Other,
        sub_category: NEEDS_REVIEW.to_string(),
        item: UNSPECIFIED_ITEM.to_string(),
        vendor: UNKNOWN_VENDOR.to_string(),
        payment_mode: PaymentMode::Unknown,
        notes: truncate_chars(ctx.raw_message, NOTES_MAX_CHARS),
        raw_message: ctx.raw_message.to_string(),
        timestamp: ctx.timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn ctx(message: &str) -> RecordContext<'_> {
        RecordContext {
            message_date: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
            default_currency: "INR",
            raw_message: message,
            timestamp: Utc.with_ymd_and_hms(2026, 10, 16, 6, 0, 0).unwrap(),
        }
    }

    #[test]
    fn recovers_every_clause_in_order() {
        let msg = "Spent 300 for groceries and 200 for phone accessories and 100 for petrol";
        let records = extract(&ctx(msg));

        let amounts: Vec<f64> = records.iter().map(|r| r.amount).collect();
        let categories: Vec<Category> = records.iter().map(|r| r.category).collect();
        assert_eq!(amounts, vec![300.0, 200.0, 100.0]);
        assert_eq!(
            categories,
            vec![Category::Groceries, Category::Shopping, Category::Travel]
        );
        assert_eq!(records[1].notes, "phone accessories");
        assert_eq!(records[2].sub_category, "Petrol");
        assert!(records.iter().all(|r| r.raw_message == msg));
        assert!(records.iter().all(|r| r.payment_mode == PaymentMode::Unknown));
    }

    #[test]
    fn trailing_amount_uses_whole_message() {
        let msg = "Bought pizza from Swiggy for 500";
        let records = extract(&ctx(msg));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].amount, 500.0);
        assert_eq!(records[0].vendor, "Swiggy");
        assert_eq!(records[0].category, Category::Food);
        assert_eq!(records[0].item, "pizza");
        assert_eq!(records[0].notes, msg);
    }

    #[test]
    fn message_without_digits_yields_review_record() {
        let records = extract(&ctx("bought some stuff today"));
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.amount, 0.0);
        assert_eq!(r.category, Category::Other);
        assert_eq!(r.sub_category, "Needs review");
        assert_eq!(r.item, "unspecified");
        assert_eq!(r.vendor, "Unknown");
    }

    #[test]
    fn empty_message_still_yields_a_record() {
        let records = extract(&ctx(""));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sub_category, "Needs review");
    }

    #[test]
    fn accepts_currency_words_grouped_and_decimal_amounts() {
        let records = extract(&ctx("Paid 1,500 rs for jeans on Myntra"));
        assert_eq!(records[0].amount, 1500.0);
        assert_eq!(records[0].item, "jeans");
        assert_eq!(records[0].vendor, "Myntra");

        let records = extract(&ctx("49.50 on coffee"));
        assert_eq!(records[0].amount, 49.5);
        assert_eq!(records[0].category, Category::Food);
    }

    #[test]
    fn rupee_symbol_before_amount() {
        let records = extract(&ctx("₹250 for dinner at zomato."));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].amount, 250.0);
        assert_eq!(records[0].vendor, "Zomato");
        assert_eq!(records[0].notes, "dinner at zomato");
    }

    #[test]
    fn first_number_wins_without_clause() {
        let records = extract(&ctx("Uber ride 180 and tip 20"));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].amount, 180.0);
        assert_eq!(records[0].category, Category::Travel);
        assert_eq!(records[0].vendor, "Uber");
    }

    #[test]
    fn unmatched_context_keeps_truncated_text_as_item() {
        let records = extract(&ctx("600 for a birthday gift"));
        assert_eq!(records[0].category, Category::Other);
        assert_eq!(records[0].sub_category, "Miscellaneous");
        assert_eq!(records[0].item, "a birthday gift");
    }

    #[test]
    fn reads_devanagari_amounts() {
        let msg = "₹५०० for pizza";
        let records = extract(&ctx(msg));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].amount, 500.0);
        assert_eq!(records[0].category, Category::Food);
        assert_eq!(records[0].raw_message, msg);

        let records = extract(&ctx("chai ५०, then 100 petrol"));
        assert_eq!(records[0].amount, 50.0);
        assert_ne!(records[0].sub_category, "Needs review");
    }

    #[test]
    fn unsupported_digit_scripts_do_not_hide_later_amounts() {
        // Mathematical bold digits are Unicode digits but not an amount script.
        let records = extract(&ctx("note \u{1D7D3} then 100 petrol"));
        assert_eq!(records[0].amount, 100.0);
        assert_eq!(records[0].category, Category::Travel);
    }

    #[test]
    fn is_deterministic() {
        let msg = "120 for tea and 80 on bus";
        assert_eq!(extract(&ctx(msg)), extract(&ctx(msg)));
    }
}
