use crate::domain::expense::ExpenseRecord;
use crate::storage::Ledger;
use anyhow::Context;
use chrono::NaiveDate;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PgLedger {
    pool: sqlx::PgPool,
}

impl PgLedger {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Ledger for PgLedger {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn append(&self, record: &ExpenseRecord) -> anyhow::Result<Uuid> {
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO expenses (expense_date, amount, currency, category, sub_category, item, vendor, payment_mode, notes, raw_message, recorded_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING id",
        )
        .bind(record.date)
        .bind(record.amount)
        .bind(&record.currency)
        .bind(record.category.as_str())
        .bind(&record.sub_category)
        .bind(&record.item)
        .bind(&record.vendor)
        .bind(record.payment_mode.as_str())
        .bind(&record.notes)
        .bind(&record.raw_message)
        .bind(record.timestamp)
        .fetch_one(&self.pool)
        .await
        .context("insert expenses failed")?;

        Ok(id)
    }

    async fn total_for(&self, date: NaiveDate) -> anyhow::Result<f64> {
        let total: f64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0)::float8 FROM expenses WHERE expense_date = $1",
        )
        .bind(date)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("failed to sum expenses for {date}"))?;
        Ok(total)
    }

    async fn count_for(&self, date: NaiveDate) -> anyhow::Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM expenses WHERE expense_date = $1")
            .bind(date)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("failed to count expenses for {date}"))?;
        Ok(count)
    }
}
