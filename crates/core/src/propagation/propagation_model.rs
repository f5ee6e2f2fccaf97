use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::utils::time_utils::format_date;

/// Health metrics pushed from the profile authority to the time-series
/// authority's `sync_daily` receiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMetricPush {
    pub email: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper_pressure: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower_pressure: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_steps: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<i32>,
}

impl DailyMetricPush {
    fn empty(email: &str, date: NaiveDate) -> Self {
        DailyMetricPush {
            email: email.to_string(),
            date: format_date(date),
            upper_pressure: None,
            lower_pressure: None,
            daily_steps: None,
            heart_rate: None,
        }
    }

    pub fn blood_pressure(
        email: &str,
        date: NaiveDate,
        upper_pressure: Option<i32>,
        lower_pressure: Option<i32>,
    ) -> Self {
        DailyMetricPush {
            upper_pressure,
            lower_pressure,
            ..Self::empty(email, date)
        }
    }

    pub fn daily_steps(email: &str, date: NaiveDate, daily_steps: Option<i32>) -> Self {
        DailyMetricPush {
            daily_steps,
            ..Self::empty(email, date)
        }
    }

    pub fn heart_rate(email: &str, date: NaiveDate, heart_rate: Option<i32>) -> Self {
        DailyMetricPush {
            heart_rate,
            ..Self::empty(email, date)
        }
    }
}

/// How the profile authority hands metric writes to the time-series authority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropagationMode {
    /// Call out after the local commit; failures are logged and dropped.
    #[default]
    Inline,
    /// Record an outbox event; a background worker delivers it with retries.
    Durable,
}

impl fmt::Display for PropagationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropagationMode::Inline => write!(f, "inline"),
            PropagationMode::Durable => write!(f, "durable"),
        }
    }
}

impl FromStr for PropagationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" => Ok(PropagationMode::Inline),
            "durable" | "outbox" => Ok(PropagationMode::Durable),
            other => Err(format!("unknown propagation mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropagationStatus {
    Pending,
    Sent,
    Dead,
}

impl PropagationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropagationStatus::Pending => "pending",
            PropagationStatus::Sent => "sent",
            PropagationStatus::Dead => "dead",
        }
    }
}

impl FromStr for PropagationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PropagationStatus::Pending),
            "sent" => Ok(PropagationStatus::Sent),
            "dead" => Ok(PropagationStatus::Dead),
            other => Err(format!("unknown propagation status '{}'", other)),
        }
    }
}

/// A durable, not-yet-delivered cross-service push.
#[derive(Debug, Clone, PartialEq)]
pub struct PropagationEvent {
    pub event_id: String,
    pub payload: DailyMetricPush,
    pub status: PropagationStatus,
    pub retry_count: i32,
    pub next_retry_at: Option<NaiveDateTime>,
    pub last_error: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Outcome of one outbox drain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropagationDrainReport {
    pub delivered: usize,
    pub rescheduled: usize,
    pub dead: usize,
}
