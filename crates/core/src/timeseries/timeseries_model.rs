use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{Error, Result};
use crate::reconcile::MergePolicy;
use crate::utils::time_utils::{parse_date_key, parse_timestamp};

/// Sleep-disorder classification label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredictionLabel {
    Insomnia,
    Normal,
    SleepApnea,
}

impl PredictionLabel {
    pub fn code(self) -> i32 {
        match self {
            PredictionLabel::Insomnia => 0,
            PredictionLabel::Normal => 1,
            PredictionLabel::SleepApnea => 2,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(PredictionLabel::Insomnia),
            1 => Some(PredictionLabel::Normal),
            2 => Some(PredictionLabel::SleepApnea),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PredictionLabel::Insomnia => "Insomnia",
            PredictionLabel::Normal => "Normal",
            PredictionLabel::SleepApnea => "Sleep Apnea",
        }
    }
}

impl fmt::Display for PredictionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PredictionLabel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(code) = trimmed.parse::<i32>() {
            return Self::from_code(code).ok_or_else(|| format!("unknown label code {}", code));
        }
        let folded: String = trimmed
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();
        match folded.as_str() {
            "insomnia" => Ok(PredictionLabel::Insomnia),
            "normal" => Ok(PredictionLabel::Normal),
            "sleepapnea" => Ok(PredictionLabel::SleepApnea),
            _ => Err(format!("unknown prediction label '{}'", s)),
        }
    }
}

impl Serialize for PredictionLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Accepts the integer code or the label text.
impl<'de> Deserialize<'de> for PredictionLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Code(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Code(code) => i32::try_from(code)
                .ok()
                .and_then(PredictionLabel::from_code)
                .ok_or_else(|| D::Error::custom(format!("unknown label code {}", code))),
            Raw::Text(text) => text.parse().map_err(D::Error::custom),
        }
    }
}

// ---------------------------------------------------------------------------
// Daily records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub id: i32,
    pub email: String,
    pub date: NaiveDate,
    pub upper_pressure: Option<i32>,
    pub lower_pressure: Option<i32>,
    pub daily_steps: Option<i32>,
    pub heart_rate: Option<i32>,
    pub duration: f64,
    pub prediction_result: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DailyKey {
    pub email: String,
    pub date: NaiveDate,
}

/// Present fields of a daily upsert. Insert defaults `duration` to 0.0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyRecordPatch {
    pub upper_pressure: Option<i32>,
    pub lower_pressure: Option<i32>,
    pub daily_steps: Option<i32>,
    pub heart_rate: Option<i32>,
    pub duration: Option<f64>,
    pub prediction_result: Option<i32>,
}

impl DailyRecordPatch {
    pub fn is_empty(&self) -> bool {
        *self == DailyRecordPatch::default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncDailyRequest {
    pub email: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub upper_pressure: Option<i32>,
    #[serde(default)]
    pub lower_pressure: Option<i32>,
    #[serde(default)]
    pub daily_steps: Option<i32>,
    #[serde(default)]
    pub heart_rate: Option<i32>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub prediction_result: Option<PredictionLabel>,
}

impl SyncDailyRequest {
    pub fn to_key_and_patch(
        &self,
        policy: MergePolicy,
        today: NaiveDate,
    ) -> (DailyKey, DailyRecordPatch) {
        let key = DailyKey {
            email: self.email.trim().to_string(),
            date: parse_date_key(self.date.as_deref(), today),
        };
        let patch = DailyRecordPatch {
            upper_pressure: policy.int(self.upper_pressure),
            lower_pressure: policy.int(self.lower_pressure),
            daily_steps: policy.int(self.daily_steps),
            heart_rate: policy.int(self.heart_rate),
            duration: policy.float(self.duration),
            prediction_result: policy.code(self.prediction_result.map(PredictionLabel::code)),
        };
        (key, patch)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SavePredictionRequest {
    pub email: String,
    pub prediction_result: PredictionLabel,
}

// ---------------------------------------------------------------------------
// Sleep sessions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepSession {
    pub id: i32,
    pub email: String,
    pub sleep_date: NaiveDate,
    pub sleep_time: NaiveDateTime,
    pub wake_time: NaiveDateTime,
    pub duration: f64,
}

/// A sleep session with the wake time already rolled past midnight if needed.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSleepSession {
    pub email: String,
    pub sleep_date: NaiveDate,
    pub sleep_time: NaiveDateTime,
    pub wake_time: NaiveDateTime,
    pub duration: f64,
}

impl NewSleepSession {
    /// A wake time at or before the sleep time is taken to be the next day.
    pub fn normalize(email: &str, sleep_time: NaiveDateTime, wake_time: NaiveDateTime) -> Self {
        let wake_time = if wake_time <= sleep_time {
            wake_time + Duration::days(1)
        } else {
            wake_time
        };
        let duration = (wake_time - sleep_time).num_seconds() as f64 / 3600.0;
        NewSleepSession {
            email: email.to_string(),
            sleep_date: sleep_time.date(),
            sleep_time,
            wake_time,
            duration,
        }
    }
}

/// Body of `save-sleep-record` and of buffered `sleep_records` rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleepRecordRequest {
    pub email: String,
    pub sleep_time: String,
    pub wake_time: String,
}

impl SleepRecordRequest {
    pub fn to_session(&self) -> Result<NewSleepSession> {
        let email = self.email.trim();
        if email.is_empty() {
            return Err(Error::validation("email is required"));
        }
        let sleep_time = parse_timestamp(&self.sleep_time)
            .ok_or_else(|| Error::validation(format!("Invalid sleep_time '{}'", self.sleep_time)))?;
        let wake_time = parse_timestamp(&self.wake_time)
            .ok_or_else(|| Error::validation(format!("Invalid wake_time '{}'", self.wake_time)))?;
        Ok(NewSleepSession::normalize(email, sleep_time, wake_time))
    }
}

/// One line of the sleep history listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepHistoryItem {
    pub date: String,
    pub duration: String,
    pub duration_hours: f64,
    pub time: String,
}

impl From<&SleepSession> for SleepHistoryItem {
    fn from(session: &SleepSession) -> Self {
        let minutes = (session.wake_time - session.sleep_time).num_minutes().max(0);
        SleepHistoryItem {
            date: session.sleep_time.format("%d %B %Y").to_string(),
            duration: format!("{}h {}m", minutes / 60, minutes % 60),
            duration_hours: session.duration,
            time: format!(
                "{} - {}",
                session.sleep_time.format("%H:%M"),
                session.wake_time.format("%H:%M")
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Prediction history
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionPeriod {
    Weekly,
    Monthly,
}

impl PredictionPeriod {
    /// Days of daily history aggregated for this period.
    pub fn window_days(self) -> i64 {
        match self {
            PredictionPeriod::Weekly => 7,
            PredictionPeriod::Monthly => 30,
        }
    }

    pub fn entity_name(self) -> &'static str {
        match self {
            PredictionPeriod::Weekly => "Weekly prediction",
            PredictionPeriod::Monthly => "Monthly prediction",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionHistoryEntry {
    pub id: i32,
    pub email: String,
    pub prediction_result: PredictionLabel,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPredictionEntry {
    pub email: String,
    pub prediction_result: PredictionLabel,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncPredictionRequest {
    pub email: String,
    pub prediction_result: PredictionLabel,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn labels_accept_codes_and_text() {
        let from_code: PredictionLabel = serde_json::from_value(serde_json::json!(2)).unwrap();
        let from_text: PredictionLabel =
            serde_json::from_value(serde_json::json!("Sleep Apnea")).unwrap();
        let from_digit_text: PredictionLabel =
            serde_json::from_value(serde_json::json!("1")).unwrap();
        assert_eq!(from_code, PredictionLabel::SleepApnea);
        assert_eq!(from_text, PredictionLabel::SleepApnea);
        assert_eq!(from_digit_text, PredictionLabel::Normal);
        assert!(serde_json::from_value::<PredictionLabel>(serde_json::json!(7)).is_err());
        assert_eq!(
            serde_json::to_value(PredictionLabel::Insomnia).unwrap(),
            serde_json::json!("Insomnia")
        );
    }

    #[test]
    fn daily_request_resolves_key_and_presence() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let request: SyncDailyRequest = serde_json::from_value(serde_json::json!({
            "email": "ana@example.com",
            "date": "2024-05-01T10:00:00",
            "heart_rate": 0,
            "prediction_result": null
        }))
        .unwrap();

        let (key, patch) = request.to_key_and_patch(MergePolicy::PresentValues, today);
        assert_eq!(key.date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(patch.heart_rate, Some(0));
        assert_eq!(patch.upper_pressure, None);
        assert_eq!(patch.prediction_result, None);

        let (_, legacy) = request.to_key_and_patch(MergePolicy::TruthyValues, today);
        assert!(legacy.is_empty());
    }

    #[test]
    fn sleep_session_rolls_wake_time_past_midnight() {
        let session = NewSleepSession::normalize(
            "ana@example.com",
            dt("2024-05-01T22:30:00"),
            dt("2024-05-01T06:00:00"),
        );
        assert_eq!(session.wake_time, dt("2024-05-02T06:00:00"));
        assert_eq!(session.duration, 7.5);
        assert_eq!(session.sleep_date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());

        let equal = NewSleepSession::normalize(
            "ana@example.com",
            dt("2024-05-01T22:00:00"),
            dt("2024-05-01T22:00:00"),
        );
        assert_eq!(equal.duration, 24.0);
    }

    #[test]
    fn sleep_request_rejects_unparseable_times() {
        let request = SleepRecordRequest {
            email: "ana@example.com".into(),
            sleep_time: "late".into(),
            wake_time: "2024-05-02T06:00:00".into(),
        };
        assert!(matches!(request.to_session(), Err(Error::Validation(_))));
    }
}
