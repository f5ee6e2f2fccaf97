use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Which authority receives a buffered table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Authority {
    Profile,
    TimeSeries,
}

/// Tables of the local durable buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferTable {
    Users,
    WorkData,
    Feedback,
    Daily,
    SleepRecords,
    WeeklyPredictions,
    MonthlyPredictions,
}

impl BufferTable {
    /// Drain order: the account root first, then its children.
    pub const SYNC_ORDER: [BufferTable; 7] = [
        BufferTable::Users,
        BufferTable::WorkData,
        BufferTable::Feedback,
        BufferTable::Daily,
        BufferTable::SleepRecords,
        BufferTable::WeeklyPredictions,
        BufferTable::MonthlyPredictions,
    ];

    pub fn table_name(self) -> &'static str {
        match self {
            BufferTable::Users => "users",
            BufferTable::WorkData => "work_data",
            BufferTable::Feedback => "feedback",
            BufferTable::Daily => "daily",
            BufferTable::SleepRecords => "sleep_records",
            BufferTable::WeeklyPredictions => "weekly_predictions",
            BufferTable::MonthlyPredictions => "monthly_predictions",
        }
    }

    /// Receiver path on the owning authority.
    pub fn endpoint(self) -> &'static str {
        match self {
            BufferTable::Users => "/sync_users",
            BufferTable::WorkData => "/sync_work_data",
            BufferTable::Feedback => "/sync_feedback",
            BufferTable::Daily => "/sync_daily",
            BufferTable::SleepRecords => "/sync_sleep_records",
            BufferTable::WeeklyPredictions => "/sync_weekly_predictions",
            BufferTable::MonthlyPredictions => "/sync_monthly_predictions",
        }
    }

    pub fn authority(self) -> Authority {
        match self {
            BufferTable::Users | BufferTable::WorkData | BufferTable::Feedback => {
                Authority::Profile
            }
            _ => Authority::TimeSeries,
        }
    }
}

impl fmt::Display for BufferTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

impl FromStr for BufferTable {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        BufferTable::SYNC_ORDER
            .into_iter()
            .find(|t| t.table_name() == s)
            .ok_or_else(|| format!("unknown buffer table '{}'", s))
    }
}

/// An unsynced buffer row rendered in its receiver's wire shape.
///
/// `version` is the row's edit counter when it was read; every local save
/// bumps it.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferedRow {
    pub table: BufferTable,
    pub id: i32,
    pub version: i32,
    pub payload: serde_json::Value,
}

/// Client-side store of locally created rows awaiting upload.
#[async_trait]
pub trait LocalBufferTrait: Send + Sync {
    /// Unsynced rows in ascending id order.
    fn list_unsynced(&self, table: BufferTable) -> Result<Vec<BufferedRow>>;
    /// Flags the row synced only if it is still at `row.version`. Returns
    /// `false` when a newer local save landed while the row was in flight.
    async fn mark_synced(&self, row: &BufferedRow) -> Result<bool>;
    fn count_unsynced(&self, table: BufferTable) -> Result<i64>;
}

/// Sends one buffered row to its authority; `Ok` only on a 2xx response.
#[async_trait]
pub trait SyncTransport: Send + Sync {
    async fn deliver(&self, row: &BufferedRow) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSyncReport {
    pub table: BufferTable,
    pub attempted: usize,
    pub synced: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TableSyncReport {
    pub fn new(table: BufferTable) -> Self {
        Self {
            table,
            attempted: 0,
            synced: 0,
            failed: 0,
            error: None,
        }
    }
}

/// Per-table outcome of one sync pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPassReport {
    pub tables: Vec<TableSyncReport>,
    pub duration_ms: i64,
}

impl SyncPassReport {
    pub fn total_synced(&self) -> usize {
        self.tables.iter().map(|t| t.synced).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.tables.iter().map(|t| t.failed).sum()
    }

    pub fn table(&self, table: BufferTable) -> Option<&TableSyncReport> {
        self.tables.iter().find(|t| t.table == table)
    }
}
