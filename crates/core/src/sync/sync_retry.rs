//! Retry classification shared by the buffer drain and the propagation outbox.

use serde::{Deserialize, Serialize};

use crate::errors::Error;

const OUTBOX_BASE_DELAY_SECS: i64 = 5;
const OUTBOX_MAX_DOUBLINGS: i32 = 8;

/// Whether a failed delivery is worth attempting again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncRetryClass {
    Retryable,
    Permanent,
}

/// Receivers answer 4xx for payloads they will never accept; timeouts,
/// write contention, throttling and 5xx may clear up on their own.
pub fn classify_http_status(status: u16) -> SyncRetryClass {
    match status {
        408 | 409 | 423 | 425 | 429 | 500..=599 => SyncRetryClass::Retryable,
        _ => SyncRetryClass::Permanent,
    }
}

pub fn classify_error(err: &Error) -> SyncRetryClass {
    match err {
        Error::Remote { status, .. } => classify_http_status(*status),
        Error::Network(_) | Error::Database(_) | Error::Unavailable(_) => {
            SyncRetryClass::Retryable
        }
        _ => SyncRetryClass::Permanent,
    }
}

/// Delay before the next outbox attempt: 5s doubled per prior failure, capped at 8 doublings.
pub fn backoff_seconds(consecutive_failures: i32) -> i64 {
    let doublings = consecutive_failures.clamp(0, OUTBOX_MAX_DOUBLINGS) as u32;
    OUTBOX_BASE_DELAY_SECS << doublings
}
