//! Natural-key upsert vocabulary shared by the authoritative services.

mod merge_policy;

pub use merge_policy::MergePolicy;

use serde::{Deserialize, Serialize};

/// What an upsert did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    /// Row exists and the payload carried no present fields.
    Unchanged,
}

/// Plain acknowledgement body (`{"message": "..."}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// `"<Entity> synced"`.
    pub fn synced(entity: &str) -> Self {
        Self::new(format!("{} synced", entity))
    }
}
