use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Audit record of one callback attempt. Append-only.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct JournalEntry {
    pub id: Uuid,
    pub name: String,
    pub received_data: String,
    pub status: String,
    pub acquirer_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewJournalEntry {
    pub name: String,
    pub received_data: String,
    pub status: String,
    pub acquirer_id: Option<Uuid>,
}

impl NewJournalEntry {
    /// Entry for a callback that was rejected before any state transition.
    pub fn failed(received_data: Option<String>, status: &str, acquirer_id: Option<Uuid>) -> Self {
        Self {
            name: format!("Failed Transaction at {}", Utc::now().format("%Y-%m-%d %H:%M:%S%.6f")),
            received_data: received_data.unwrap_or_else(|| "No data provided".to_string()),
            status: status.to_string(),
            acquirer_id,
        }
    }

    pub fn into_entry(self) -> JournalEntry {
        JournalEntry {
            id: Uuid::new_v4(),
            name: self.name,
            received_data: self.received_data,
            status: self.status,
            acquirer_id: self.acquirer_id,
            created_at: Utc::now(),
        }
    }
}
