use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One mutation observed on a watched table. Subscribers re-fetch the
/// affected view; events carry identifiers, not row data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: String,
    pub kind: ChangeKind,
    pub record_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeEvent {
    pub fn new(table: &str, kind: ChangeKind) -> Self {
        Self {
            table: table.to_string(),
            kind,
            record_id: None,
            date: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn with_record_id(mut self, record_id: impl Into<String>) -> Self {
        self.record_id = Some(record_id.into());
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}
