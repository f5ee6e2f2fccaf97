use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::reconcile::MergePolicy;
use crate::utils::time_utils::parse_birth_date;

pub const DEFAULT_ROLE: &str = "user";
/// Password marker for accounts first seen through offline sync.
pub const OFFLINE_CREATED_PASSWORD: &str = "OFFLINE_CREATED";

pub const DEFAULT_QUALITY_OF_SLEEP: f64 = 5.0;
pub const DEFAULT_PHYSICAL_ACTIVITY_LEVEL: f64 = 50.0;
pub const DEFAULT_STRESS_LEVEL: f64 = 5.0;

/// Account row as exposed by the profile authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i32,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub hashed_password: String,
    pub role: String,
    pub name: Option<String>,
    pub gender: Option<i32>,
    pub work: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub age: Option<i32>,
    pub weight: f64,
    pub height: f64,
    pub upper_pressure: Option<i32>,
    pub lower_pressure: Option<i32>,
    pub daily_steps: Option<i32>,
    pub heart_rate: Option<i32>,
}

/// Field-level changes to an account. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountPatch {
    pub name: Option<String>,
    pub gender: Option<i32>,
    pub work: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub age: Option<i32>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub upper_pressure: Option<i32>,
    pub lower_pressure: Option<i32>,
    pub daily_steps: Option<i32>,
    pub heart_rate: Option<i32>,
}

impl AccountPatch {
    pub fn is_empty(&self) -> bool {
        *self == AccountPatch::default()
    }
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub hashed_password: String,
    pub role: String,
    pub fields: AccountPatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkProfile {
    pub id: i32,
    pub email: String,
    pub work_id: Option<i32>,
    pub quality_of_sleep: f64,
    pub physical_activity_level: f64,
    pub stress_level: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkProfilePatch {
    pub work_id: Option<i32>,
    pub quality_of_sleep: Option<f64>,
    pub physical_activity_level: Option<f64>,
    pub stress_level: Option<f64>,
}

impl WorkProfilePatch {
    pub fn is_empty(&self) -> bool {
        *self == WorkProfilePatch::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub id: i32,
    pub email: String,
    pub feedback: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub email: String,
    pub feedback: String,
    pub created_at: NaiveDateTime,
}

/// Flat profile document: account columns plus the work profile scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub account: Account,
    #[serde(default)]
    pub work_id: Option<i32>,
    #[serde(default)]
    pub quality_of_sleep: Option<f64>,
    #[serde(default)]
    pub physical_activity_level: Option<f64>,
    #[serde(default)]
    pub stress_level: Option<f64>,
}

impl UserProfile {
    pub fn new(account: Account, work: Option<WorkProfile>) -> Self {
        match work {
            Some(work) => UserProfile {
                account,
                work_id: work.work_id,
                quality_of_sleep: Some(work.quality_of_sleep),
                physical_activity_level: Some(work.physical_activity_level),
                stress_level: Some(work.stress_level),
            },
            None => UserProfile {
                account,
                work_id: None,
                quality_of_sleep: None,
                physical_activity_level: None,
                stress_level: None,
            },
        }
    }
}

/// Row shape returned by the admin listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: i32,
    pub email: String,
    pub name: Option<String>,
    pub role: String,
}

impl From<Account> for AccountSummary {
    fn from(account: Account) -> Self {
        AccountSummary {
            id: account.id,
            email: account.email,
            name: account.name,
            role: account.role,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub email: String,
    pub role: String,
}

/// `sync_users` payload; buffer-only columns (id, synced, ...) are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncUserRequest {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub gender: Option<i32>,
    #[serde(default)]
    pub work: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub age: Option<i32>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub upper_pressure: Option<i32>,
    #[serde(default)]
    pub lower_pressure: Option<i32>,
    #[serde(default)]
    pub daily_steps: Option<i32>,
    #[serde(default)]
    pub heart_rate: Option<i32>,
}

impl SyncUserRequest {
    pub fn to_patch(&self, policy: MergePolicy) -> AccountPatch {
        let date_of_birth = policy
            .text(self.date_of_birth.clone())
            .and_then(|raw| parse_birth_date(&raw));
        AccountPatch {
            name: policy.text(self.name.clone()),
            gender: policy.code(self.gender),
            work: policy.text(self.work.clone()),
            date_of_birth,
            age: policy.int(self.age),
            weight: policy.float(self.weight),
            height: policy.float(self.height),
            upper_pressure: policy.int(self.upper_pressure),
            lower_pressure: policy.int(self.lower_pressure),
            daily_steps: policy.int(self.daily_steps),
            heart_rate: policy.int(self.heart_rate),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncWorkDataRequest {
    pub email: String,
    #[serde(default)]
    pub work_id: Option<i32>,
    #[serde(default)]
    pub quality_of_sleep: Option<f64>,
    #[serde(default)]
    pub physical_activity_level: Option<f64>,
    #[serde(default)]
    pub stress_level: Option<f64>,
}

impl SyncWorkDataRequest {
    pub fn to_patch(&self, policy: MergePolicy) -> WorkProfilePatch {
        WorkProfilePatch {
            work_id: policy.code(self.work_id),
            quality_of_sleep: policy.float(self.quality_of_sleep),
            physical_activity_level: policy.float(self.physical_activity_level),
            stress_level: policy.float(self.stress_level),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncFeedbackRequest {
    pub email: String,
    pub feedback: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitFeedbackRequest {
    pub email: String,
    pub feedback: String,
}

/// Body shared by the single-field `save-*` endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileFieldRequest {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub gender: Option<i32>,
    #[serde(default, alias = "dob")]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub work: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BloodPressureRequest {
    pub email: String,
    #[serde(default)]
    pub upper_pressure: Option<i32>,
    #[serde(default)]
    pub lower_pressure: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStepsRequest {
    pub email: String,
    #[serde(default)]
    pub daily_steps: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartRateRequest {
    pub email: String,
    #[serde(default)]
    pub heart_rate: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_user_patch_keeps_absent_fields_absent() {
        let request: SyncUserRequest = serde_json::from_value(serde_json::json!({
            "id": 7,
            "email": "ana@example.com",
            "heart_rate": 0,
            "weight": 61.5,
            "name": "",
            "synced": 0
        }))
        .unwrap();

        let present = request.to_patch(MergePolicy::PresentValues);
        assert_eq!(present.heart_rate, Some(0));
        assert_eq!(present.weight, Some(61.5));
        assert_eq!(present.name, None);
        assert_eq!(present.upper_pressure, None);

        let truthy = request.to_patch(MergePolicy::TruthyValues);
        assert_eq!(truthy.heart_rate, None);
        assert_eq!(truthy.weight, Some(61.5));
    }

    #[test]
    fn invalid_birth_date_is_dropped_from_patch() {
        let request = SyncUserRequest {
            email: "ana@example.com".into(),
            date_of_birth: Some("someday".into()),
            ..Default::default()
        };
        assert!(request.to_patch(MergePolicy::PresentValues).is_empty());
    }

    #[test]
    fn profile_serializes_flat_without_password() {
        let account = Account {
            id: 1,
            email: "ana@example.com".into(),
            hashed_password: "secret".into(),
            role: DEFAULT_ROLE.into(),
            name: Some("Ana".into()),
            gender: Some(1),
            work: None,
            date_of_birth: None,
            age: None,
            weight: 0.0,
            height: 0.0,
            upper_pressure: Some(120),
            lower_pressure: Some(80),
            daily_steps: None,
            heart_rate: None,
        };
        let value = serde_json::to_value(UserProfile::new(account, None)).unwrap();
        assert_eq!(value["email"], "ana@example.com");
        assert_eq!(value["upper_pressure"], 120);
        assert!(value.get("hashed_password").is_none());
        assert!(value["work_id"].is_null());
    }

    #[test]
    fn metric_requests_use_camel_case_fields() {
        let bp: BloodPressureRequest = serde_json::from_value(serde_json::json!({
            "email": "ana@example.com",
            "upperPressure": 130,
            "lowerPressure": 85
        }))
        .unwrap();
        assert_eq!(bp.upper_pressure, Some(130));
        assert_eq!(bp.lower_pressure, Some(85));
    }
}
