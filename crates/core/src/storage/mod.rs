pub mod memory;
pub mod postgres;

use crate::domain::expense::ExpenseRecord;
use anyhow::Context;
use chrono::NaiveDate;
use uuid::Uuid;

/// Append-only expense ledger, queryable by calendar day.
#[async_trait::async_trait]
pub trait Ledger: Send + Sync {
    fn name(&self) -> &'static str;

    async fn append(&self, record: &ExpenseRecord) -> anyhow::Result<Uuid>;

    async fn total_for(&self, date: NaiveDate) -> anyhow::Result<f64>;

    async fn count_for(&self, date: NaiveDate) -> anyhow::Result<i64>;
}

pub async fn migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("sqlx migrations failed")?;
    Ok(())
}
