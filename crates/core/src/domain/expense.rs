use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const UNKNOWN_VENDOR: &str = "Unknown";
pub const UNSPECIFIED_ITEM: &str = "unspecified";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Food,
    Shopping,
    Travel,
    Entertainment,
    Bills,
    Healthcare,
    Groceries,
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Food,
        Category::Shopping,
        Category::Travel,
        Category::Entertainment,
        Category::Bills,
        Category::Healthcare,
        Category::Groceries,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Food => "Food",
            Category::Shopping => "Shopping",
            Category::Travel => "Travel",
            Category::Entertainment => "Entertainment",
            Category::Bills => "Bills",
            Category::Healthcare => "Healthcare",
            Category::Groceries => "Groceries",
            Category::Other => "Other",
        }
    }

    /// Case-insensitive lookup; anything outside the enumeration is `Other`.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(label))
            .unwrap_or(Category::Other)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMode {
    #[serde(rename = "UPI")]
    Upi,
    Cash,
    Card,
    Unknown,
}

impl PaymentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMode::Upi => "UPI",
            PaymentMode::Cash => "Cash",
            PaymentMode::Card => "Card",
            PaymentMode::Unknown => "Unknown",
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "upi" => PaymentMode::Upi,
            "cash" => PaymentMode::Cash,
            "card" | "credit card" | "debit card" => PaymentMode::Card,
            _ => PaymentMode::Unknown,
        }
    }
}

impl fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persisted expense. A message yields one or more of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    /// Day the expense occurred (sender's local date), not the creation instant.
    pub date: NaiveDate,
    /// `0` means the amount could not be determined.
    pub amount: f64,
    pub currency: String,
    pub category: Category,
    pub sub_category: String,
    pub item: String,
    pub vendor: String,
    pub payment_mode: PaymentMode,
    pub notes: String,
    /// Verbatim user input. Never post-processed.
    pub raw_message: String,
    pub timestamp: DateTime<Utc>,
}
