use crate::domain::expense::ExpenseRecord;
use crate::extract::ExpenseExtractor;
use crate::storage::Ledger;
use crate::time::local::local_date;
use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::sync::Arc;

const NEEDS_REVIEW: &str = "Needs review";

pub const HELP_TEXT: &str = "\
🎯 Welcome to the Expense Tracker Bot!

You can add expenses in multiple ways:

Single expense:
• \"Spent 200 on pizza from Swiggy\"
• \"Bought jeans for ₹1500 from Myntra\"

Multiple expenses:
• \"Today I spent 300 for groceries and 200 for phone accessories and 100 for petrol\"
• \"Paid 500 for lunch and 180 for Uber\"

I'll automatically:
✅ Extract ALL expenses
✅ Categorize each one
✅ Save them to your ledger

Commands:
/start - Show this message
/today - Today's total expenses
/help - Get help";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Today,
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming<'a> {
    Command(Command),
    Expense(&'a str),
    Empty,
}

/// Splits slash commands (including the `/cmd@BotName` group form) from expense text.
///
/// Expense text is handed back untouched; trimming is only used to classify it.
pub fn parse_incoming(text: &str) -> Incoming<'_> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Incoming::Empty;
    }

    let Some(rest) = trimmed.strip_prefix('/') else {
        return Incoming::Expense(text);
    };

    let word = rest.split_whitespace().next().unwrap_or_default();
    let name = word.split('@').next().unwrap_or_default().to_ascii_lowercase();
    Incoming::Command(match name.as_str() {
        "start" => Command::Start,
        "help" => Command::Help,
        "today" => Command::Today,
        _ => Command::Unknown(name),
    })
}

/// Result of one expense message: what was extracted and how much of it was persisted.
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub records: Vec<ExpenseRecord>,
    pub saved: usize,
}

impl SaveOutcome {
    pub fn all_saved(&self) -> bool {
        self.saved == self.records.len()
    }

    pub fn reply(&self) -> String {
        if !self.all_saved() {
            return format!(
                "⚠️ Saved {}/{} expenses. Check the ledger.",
                self.saved,
                self.records.len()
            );
        }

        match self.records.as_slice() {
            [] => "❌ No expenses found. Try: 'Spent 200 on coffee'".to_string(),
            [exp] => {
                let mut out = format!(
                    "✅ Expense Saved!\n\n\
                     💵 Amount: {}\n\
                     📁 Category: {}\n\
                     🏷️ Item: {}\n\
                     🏪 Vendor: {}\n\
                     📅 Date: {}",
                    money(&exp.currency, exp.amount),
                    exp.category,
                    exp.item,
                    exp.vendor,
                    exp.date
                );
                if exp.sub_category == NEEDS_REVIEW {
                    out.push_str("\n\n⚠️ I couldn't find an amount; saved it for review.");
                }
                out
            }
            many => {
                let mut out = format!("✅ Saved {} expenses!\n\n", many.len());
                for (i, exp) in many.iter().enumerate() {
                    let _ = writeln!(
                        out,
                        "{}. {} - {} ({})",
                        i + 1,
                        money(&exp.currency, exp.amount),
                        exp.item,
                        exp.category
                    );
                }
                let totals: Vec<String> = totals_by_currency(many)
                    .into_iter()
                    .map(|(currency, total)| format!("{}{total:.2}", currency_prefix(currency)))
                    .collect();
                let _ = write!(out, "\n💰 Total: {}", totals.join(" + "));
                out
            }
        }
    }
}

/// Routes incoming chat text to the extractor, the ledger, or static replies.
#[derive(Clone)]
pub struct ConversationHandler {
    extractor: ExpenseExtractor,
    ledger: Arc<dyn Ledger>,
}

impl ConversationHandler {
    pub fn new(extractor: ExpenseExtractor, ledger: Arc<dyn Ledger>) -> Self {
        Self { extractor, ledger }
    }

    pub async fn handle_text(&self, text: &str, sent_at: DateTime<Utc>) -> String {
        match parse_incoming(text) {
            Incoming::Empty => "❌ No expenses found. Try: 'Spent 200 on coffee'".to_string(),
            Incoming::Command(Command::Today) => self.today_summary(sent_at).await,
            Incoming::Command(Command::Start | Command::Help) => HELP_TEXT.to_string(),
            Incoming::Command(Command::Unknown(name)) => {
                tracing::debug!(command = %name, "unknown command");
                HELP_TEXT.to_string()
            }
            Incoming::Expense(body) => self.record_expenses(body, sent_at).await.reply(),
        }
    }

    /// Extracts and appends every expense in `text`. A failed append is counted, not fatal.
    pub async fn record_expenses(&self, text: &str, sent_at: DateTime<Utc>) -> SaveOutcome {
        let records = self.extractor.extract(text, sent_at).await;

        let mut saved = 0;
        for record in &records {
            match self.ledger.append(record).await {
                Ok(id) => {
                    saved += 1;
                    tracing::debug!(%id, ledger = self.ledger.name(), "expense appended");
                }
                Err(err) => {
                    tracing::error!(
                        error = %format!("{err:#}"),
                        ledger = self.ledger.name(),
                        "failed to append expense"
                    );
                }
            }
        }

        if saved < records.len() {
            tracing::warn!(saved, total = records.len(), "partial save");
        }
        SaveOutcome { records, saved }
    }

    /// Today's total and count, where "today" is the sender's local date at `now`.
    pub async fn today_summary(&self, now: DateTime<Utc>) -> String {
        let options = self.extractor.options();
        let today = local_date(now, options.utc_offset);

        let summary = async {
            let total = self.ledger.total_for(today).await?;
            let count = self.ledger.count_for(today).await?;
            anyhow::Ok((total, count))
        }
        .await;

        match summary {
            Ok((total, count)) => format!(
                "💰 Today's Summary:\n\nTotal: {}{total:.2}\nTransactions: {count}",
                currency_prefix(&options.default_currency)
            ),
            Err(err) => {
                tracing::error!(error = %format!("{err:#}"), %today, "today summary failed");
                format!("❌ Error: {err}")
            }
        }
    }
}

/// Sums per currency, in the order each currency first appears.
fn totals_by_currency(records: &[ExpenseRecord]) -> Vec<(&str, f64)> {
    let mut totals: Vec<(&str, f64)> = Vec::new();
    for exp in records {
        match totals.iter_mut().find(|(c, _)| c.eq_ignore_ascii_case(&exp.currency)) {
            Some((_, total)) => *total += exp.amount,
            None => totals.push((exp.currency.as_str(), exp.amount)),
        }
    }
    totals
}

fn currency_prefix(code: &str) -> String {
    match code.to_ascii_uppercase().as_str() {
        "INR" => "₹".to_string(),
        "USD" => "$".to_string(),
        "EUR" => "€".to_string(),
        "GBP" => "£".to_string(),
        other => format!("{other} "),
    }
}

fn money(currency: &str, amount: f64) -> String {
    let prefix = currency_prefix(currency);
    if amount.fract() == 0.0 {
        format!("{prefix}{amount:.0}")
    } else {
        format!("{prefix}{amount:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractorOptions;
    use crate::storage::memory::MemoryLedger;
    use chrono::{FixedOffset, NaiveDate, TimeZone};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    fn extractor() -> ExpenseExtractor {
        ExpenseExtractor::offline(ExtractorOptions {
            default_currency: "INR".to_string(),
            utc_offset: FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap(),
            temperature: 0.2,
            max_output_tokens: 2000,
        })
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 6, 0, 0).unwrap()
    }

    /// Fails every other append, and every aggregate query.
    #[derive(Default)]
    struct FlakyLedger {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Ledger for FlakyLedger {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn append(&self, _record: &ExpenseRecord) -> anyhow::Result<Uuid> {
            if self.calls.fetch_add(1, Ordering::SeqCst) % 2 == 1 {
                anyhow::bail!("quota exceeded");
            }
            Ok(Uuid::new_v4())
        }

        async fn total_for(&self, _date: NaiveDate) -> anyhow::Result<f64> {
            anyhow::bail!("ledger offline")
        }

        async fn count_for(&self, _date: NaiveDate) -> anyhow::Result<i64> {
            anyhow::bail!("ledger offline")
        }
    }

    #[test]
    fn parses_commands_and_expenses() {
        assert_eq!(parse_incoming("/today"), Incoming::Command(Command::Today));
        assert_eq!(
            parse_incoming("/Today@kharcha_bot extra"),
            Incoming::Command(Command::Today)
        );
        assert_eq!(parse_incoming("/help"), Incoming::Command(Command::Help));
        assert_eq!(
            parse_incoming("/undo"),
            Incoming::Command(Command::Unknown("undo".to_string()))
        );
        assert_eq!(parse_incoming("  100 for tea "), Incoming::Expense("  100 for tea "));
        assert_eq!(parse_incoming("   "), Incoming::Empty);
    }

    #[tokio::test]
    async fn multi_expense_reply_lists_each_and_total() {
        let ledger = Arc::new(MemoryLedger::new());
        let handler = ConversationHandler::new(extractor(), ledger.clone());

        let reply = handler
            .handle_text(
                "Spent 300 for groceries and 200 for phone accessories and 100 for petrol",
                now(),
            )
            .await;

        assert!(reply.starts_with("✅ Saved 3 expenses!"));
        assert!(reply.contains("1. ₹300 - groceries (Groceries)"));
        assert!(reply.contains("3. ₹100 - petrol (Travel)"));
        assert!(reply.contains("💰 Total: ₹600.00"));
        assert_eq!(ledger.records().await.len(), 3);
    }

    #[tokio::test]
    async fn stored_raw_message_is_the_untouched_input() {
        let ledger = Arc::new(MemoryLedger::new());
        let handler = ConversationHandler::new(extractor(), ledger.clone());

        handler.handle_text("  100 for tea\n", now()).await;

        let records = ledger.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].raw_message, "  100 for tea\n");
        assert_eq!(records[0].amount, 100.0);
    }

    #[test]
    fn mixed_currency_total_is_split_per_currency() {
        let ts = now();
        let record = |amount: f64, currency: &str| ExpenseRecord {
            date: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
            amount,
            currency: currency.to_string(),
            category: crate::domain::expense::Category::Food,
            sub_category: "Restaurant/Delivery".to_string(),
            item: "lunch".to_string(),
            vendor: "Unknown".to_string(),
            payment_mode: crate::domain::expense::PaymentMode::Unknown,
            notes: String::new(),
            raw_message: "lunch 500 and 12 usd".to_string(),
            timestamp: ts,
        };
        let outcome = SaveOutcome {
            records: vec![record(500.0, "INR"), record(12.0, "USD"), record(80.0, "INR")],
            saved: 3,
        };

        let reply = outcome.reply();
        assert!(reply.contains("2. $12 - lunch (Food)"));
        assert!(reply.ends_with("💰 Total: ₹580.00 + $12.00"));
    }

    #[tokio::test]
    async fn single_expense_reply_shows_details() {
        let ledger = Arc::new(MemoryLedger::new());
        let handler = ConversationHandler::new(extractor(), ledger);

        let reply = handler
            .handle_text("Bought pizza from Swiggy for 500", now())
            .await;
        assert!(reply.contains("💵 Amount: ₹500"));
        assert!(reply.contains("📁 Category: Food"));
        assert!(reply.contains("🏪 Vendor: Swiggy"));
        assert!(reply.contains("📅 Date: 2026-10-16"));
    }

    #[tokio::test]
    async fn review_record_is_flagged_in_reply() {
        let handler = ConversationHandler::new(extractor(), Arc::new(MemoryLedger::new()));
        let reply = handler.handle_text("bought some stuff today", now()).await;
        assert!(reply.contains("💵 Amount: ₹0"));
        assert!(reply.contains("saved it for review"));
    }

    #[tokio::test]
    async fn partial_persistence_reports_saved_count() {
        let handler = ConversationHandler::new(extractor(), Arc::new(FlakyLedger::default()));
        let outcome = handler
            .record_expenses("300 for groceries and 200 for charger and 100 for bus", now())
            .await;

        assert_eq!(outcome.records.len(), 3);
        assert_eq!(outcome.saved, 2);
        assert_eq!(outcome.reply(), "⚠️ Saved 2/3 expenses. Check the ledger.");
    }

    #[tokio::test]
    async fn today_summary_reads_ledger_for_local_day() {
        let ledger = Arc::new(MemoryLedger::new());
        let handler = ConversationHandler::new(extractor(), ledger);

        handler.handle_text("120 for coffee", now()).await;
        handler.handle_text("80.50 for snacks", now()).await;

        let reply = handler.handle_text("/today", now()).await;
        assert_eq!(
            reply,
            "💰 Today's Summary:\n\nTotal: ₹200.50\nTransactions: 2"
        );
    }

    #[tokio::test]
    async fn today_summary_failure_is_an_error_reply() {
        let handler = ConversationHandler::new(extractor(), Arc::new(FlakyLedger::default()));
        let reply = handler.handle_text("/today", now()).await;
        assert_eq!(reply, "❌ Error: ledger offline");
    }

    #[tokio::test]
    async fn help_and_unknown_commands_show_help() {
        let handler = ConversationHandler::new(extractor(), Arc::new(MemoryLedger::new()));
        assert_eq!(handler.handle_text("/start", now()).await, HELP_TEXT);
        assert_eq!(handler.handle_text("/undo", now()).await, HELP_TEXT);
    }

    #[test]
    fn money_drops_zero_fraction() {
        assert_eq!(money("INR", 300.0), "₹300");
        assert_eq!(money("INR", 49.5), "₹49.50");
        assert_eq!(money("AED", 10.0), "AED 10");
    }
}
