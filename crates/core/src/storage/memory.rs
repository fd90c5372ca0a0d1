use crate::domain::expense::ExpenseRecord;
use crate::storage::Ledger;
use chrono::NaiveDate;
use tokio::sync::Mutex;
use uuid::Uuid;

/// In-process ledger for dry runs and tests. Contents are lost on exit.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    rows: Mutex<Vec<(Uuid, ExpenseRecord)>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<ExpenseRecord> {
        self.rows
            .lock()
            .await
            .iter()
            .map(|(_, record)| record.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl Ledger for MemoryLedger {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn append(&self, record: &ExpenseRecord) -> anyhow::Result<Uuid> {
        let id = Uuid::new_v4();
        self.rows.lock().await.push((id, record.clone()));
        Ok(id)
    }

    async fn total_for(&self, date: NaiveDate) -> anyhow::Result<f64> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .filter(|(_, r)| r.date == date)
            .map(|(_, r)| r.amount)
            .sum())
    }

    async fn count_for(&self, date: NaiveDate) -> anyhow::Result<i64> {
        let count = self
            .rows
            .lock()
            .await
            .iter()
            .filter(|(_, r)| r.date == date)
            .count();
        Ok(count as i64)
    }
}
