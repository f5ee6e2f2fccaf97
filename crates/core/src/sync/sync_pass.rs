use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use tokio::sync::Mutex;

use super::buffer_model::{
    BufferTable, LocalBufferTrait, SyncPassReport, SyncTransport, TableSyncReport,
};
use crate::errors::{Error, Result};

/// Drains the local buffer to the authorities, one row per request.
///
/// A row is flagged synced only after its request succeeded; failures leave it
/// for the next pass. Passes never overlap.
pub struct SyncPassEngine {
    buffer: Arc<dyn LocalBufferTrait>,
    transport: Arc<dyn SyncTransport>,
    pass_lock: Mutex<()>,
}

impl SyncPassEngine {
    pub fn new(buffer: Arc<dyn LocalBufferTrait>, transport: Arc<dyn SyncTransport>) -> Self {
        Self {
            buffer,
            transport,
            pass_lock: Mutex::new(()),
        }
    }

    pub async fn run_pass(&self) -> Result<SyncPassReport> {
        let _guard = self
            .pass_lock
            .try_lock()
            .map_err(|_| Error::Unavailable("A sync pass is already running".to_string()))?;

        let started = Instant::now();
        let mut tables = Vec::with_capacity(BufferTable::SYNC_ORDER.len());
        for table in BufferTable::SYNC_ORDER {
            tables.push(self.drain_table(table).await);
        }

        let report = SyncPassReport {
            tables,
            duration_ms: started.elapsed().as_millis() as i64,
        };
        info!(
            "[SyncPass] Pass finished in {}ms: synced={} failed={}",
            report.duration_ms,
            report.total_synced(),
            report.total_failed()
        );
        Ok(report)
    }

    async fn drain_table(&self, table: BufferTable) -> TableSyncReport {
        let mut report = TableSyncReport::new(table);
        let rows = match self.buffer.list_unsynced(table) {
            Ok(rows) => rows,
            Err(err) => {
                warn!("[SyncPass] Could not read {} from buffer: {}", table, err);
                report.error = Some(err.to_string());
                return report;
            }
        };
        if rows.is_empty() {
            return report;
        }
        debug!("[SyncPass] {} unsynced row(s) in {}", rows.len(), table);

        for row in rows {
            report.attempted += 1;
            if let Err(err) = self.transport.deliver(&row).await {
                warn!("[SyncPass] {} row {} not delivered: {}", table, row.id, err);
                report.failed += 1;
                continue;
            }
            match self.buffer.mark_synced(&row).await {
                Ok(true) => report.synced += 1,
                Ok(false) => {
                    debug!(
                        "[SyncPass] {} row {} changed while in flight, resending next pass",
                        table, row.id
                    );
                    report.synced += 1;
                }
                Err(err) => {
                    // Delivered but not flagged; the upsert receivers absorb the resend.
                    warn!(
                        "[SyncPass] {} row {} delivered but not flagged: {}",
                        table, row.id, err
                    );
                    report.failed += 1;
                }
            }
        }
        report
    }
}
