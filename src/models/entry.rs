//! Loan entries: who borrowed which book, and whether it came back

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: i64,
    pub book_id: i64,
    pub borrower: String,
    pub date_started: DateTime<Utc>,
    pub date_finished: Option<DateTime<Utc>>,
    pub returned: bool,
}

impl Entry {
    /// Start a loan
    pub fn open(id: i64, book_id: i64, borrower: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            book_id,
            borrower: borrower.into(),
            date_started: now,
            date_finished: None,
            returned: false,
        }
    }

    /// Mark the book as returned. A loan closes once.
    pub fn close(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        if self.returned {
            return Err(AppError::BusinessRule(format!(
                "Entry {} was already returned",
                self.id
            )));
        }
        self.returned = true;
        self.date_finished = Some(now);
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewEntry {
    pub borrowed_book_id: i64,
    #[validate(length(min = 1, message = "Borrower username is required"))]
    pub borrower_username: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PatchEntry {
    pub returned: bool,
}

#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct EntryQuery {
    pub returned: Option<bool>,
    pub username: Option<String>,
    /// Substring of the borrowed book's title
    pub book_title: Option<String>,
    /// Only loans started within the last day, week, month or year
    pub since: Option<String>,
}

/// Look-back window for loan listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Since {
    Day,
    Week,
    Month,
    Year,
}

impl Since {
    /// Case-insensitive; anything else means no window
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "day" => Some(Since::Day),
            "week" => Some(Since::Week),
            "month" => Some(Since::Month),
            "year" => Some(Since::Year),
            _ => None,
        }
    }

    /// Earliest start date inside the window
    pub fn cutoff(self, now: DateTime<Utc>) -> DateTime<Utc> {
        let cutoff = match self {
            Since::Day => Some(now - Duration::days(1)),
            Since::Week => Some(now - Duration::weeks(1)),
            Since::Month => now.checked_sub_months(Months::new(1)),
            Since::Year => now.checked_sub_months(Months::new(12)),
        };
        cutoff.unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}
