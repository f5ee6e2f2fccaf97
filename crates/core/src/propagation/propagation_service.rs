use std::sync::Arc;

use log::{debug, info, warn};

use super::propagation_model::{DailyMetricPush, PropagationDrainReport, PropagationMode};
use super::propagation_traits::{DailyMetricsPropagator, PropagationOutboxTrait};
use crate::errors::{Error, Result};
use crate::sync::{backoff_seconds, classify_error, SyncRetryClass};

/// Routes metric pushes either straight to the propagator or through the
/// durable outbox. Never fails the caller.
pub struct PropagationDispatcher {
    mode: PropagationMode,
    propagator: Option<Arc<dyn DailyMetricsPropagator>>,
    outbox: Option<Arc<dyn PropagationOutboxTrait>>,
}

impl PropagationDispatcher {
    pub fn new(
        mode: PropagationMode,
        propagator: Option<Arc<dyn DailyMetricsPropagator>>,
        outbox: Option<Arc<dyn PropagationOutboxTrait>>,
    ) -> Self {
        Self {
            mode,
            propagator,
            outbox,
        }
    }

    /// Dispatcher that drops every push. Used when no time-series authority is configured.
    pub fn disabled() -> Self {
        Self::new(PropagationMode::Inline, None, None)
    }

    pub fn mode(&self) -> PropagationMode {
        self.mode
    }

    pub async fn dispatch(&self, payload: DailyMetricPush) {
        match self.mode {
            PropagationMode::Inline => {
                let Some(propagator) = &self.propagator else {
                    debug!(
                        "[Propagation] No time-series authority configured, dropping push for {}",
                        payload.email
                    );
                    return;
                };
                if let Err(err) = propagator.push_daily(&payload).await {
                    warn!(
                        "[Propagation] Push for {} on {} failed: {}",
                        payload.email, payload.date, err
                    );
                }
            }
            PropagationMode::Durable => {
                let Some(outbox) = &self.outbox else {
                    warn!("[Propagation] Durable mode without an outbox, dropping push");
                    return;
                };
                let email = payload.email.clone();
                match outbox.enqueue(payload).await {
                    Ok(event_id) => debug!("[Propagation] Queued {} for {}", event_id, email),
                    Err(err) => warn!("[Propagation] Failed to queue push for {}: {}", email, err),
                }
            }
        }
    }
}

/// Delivers due outbox events one at a time, oldest first.
pub async fn drain_propagation_outbox(
    outbox: &dyn PropagationOutboxTrait,
    propagator: &dyn DailyMetricsPropagator,
    limit: i64,
) -> Result<PropagationDrainReport> {
    let events = outbox.list_pending(limit)?;
    let mut report = PropagationDrainReport::default();
    if events.is_empty() {
        return Ok(report);
    }

    for event in events {
        match propagator.push_daily(&event.payload).await {
            Ok(()) => {
                outbox.mark_sent(vec![event.event_id.clone()]).await?;
                report.delivered += 1;
            }
            Err(err) => {
                let message = err.to_string();
                if is_permanent(&err) {
                    warn!(
                        "[Propagation] Event {} rejected permanently: {}",
                        event.event_id, message
                    );
                    outbox
                        .mark_dead(vec![event.event_id.clone()], Some(message))
                        .await?;
                    report.dead += 1;
                } else {
                    let delay = backoff_seconds(event.retry_count);
                    debug!(
                        "[Propagation] Event {} failed (attempt {}), retrying in {}s: {}",
                        event.event_id,
                        event.retry_count + 1,
                        delay,
                        message
                    );
                    outbox
                        .schedule_retry(vec![event.event_id.clone()], delay, Some(message))
                        .await?;
                    report.rescheduled += 1;
                }
            }
        }
    }

    info!(
        "[Propagation] Outbox drain: delivered={} rescheduled={} dead={}",
        report.delivered, report.rescheduled, report.dead
    );
    Ok(report)
}

fn is_permanent(err: &Error) -> bool {
    classify_error(err) == SyncRetryClass::Permanent
}
