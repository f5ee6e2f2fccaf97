use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::timeseries_model::PredictionLabel;
use crate::errors::Result;
use crate::profiles::UserProfile;

/// Model input assembled from a profile and the latest sleep duration.
///
/// Missing profile values take population defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionFeatures {
    pub gender: i32,
    pub age: i32,
    pub occupation: i32,
    pub sleep_duration: f64,
    pub quality_of_sleep: f64,
    pub physical_activity_level: f64,
    pub stress_level: f64,
    /// 0 = normal, 1 = obese, 2 = overweight.
    pub bmi_category: i32,
    pub heart_rate: i32,
    pub daily_steps: i32,
    pub systolic: i32,
    pub diastolic: i32,
}

/// BMI bucket; missing or zero measurements count as normal.
pub fn bmi_category(height_cm: f64, weight_kg: f64) -> i32 {
    if height_cm <= 0.0 || weight_kg <= 0.0 {
        return 0;
    }
    let height_m = height_cm / 100.0;
    let bmi = weight_kg / (height_m * height_m);
    if bmi < 25.0 {
        0
    } else if bmi < 30.0 {
        2
    } else {
        1
    }
}

impl PredictionFeatures {
    pub fn from_profile(profile: &UserProfile, sleep_duration: f64) -> Self {
        let account = &profile.account;
        let height = if account.height > 0.0 { account.height } else { 170.0 };
        let weight = if account.weight > 0.0 { account.weight } else { 65.0 };
        PredictionFeatures {
            gender: account.gender.unwrap_or(0),
            age: account.age.unwrap_or(30),
            occupation: profile.work_id.unwrap_or(0),
            sleep_duration,
            quality_of_sleep: profile.quality_of_sleep.unwrap_or(5.0),
            physical_activity_level: profile.physical_activity_level.unwrap_or(50.0),
            stress_level: profile.stress_level.unwrap_or(5.0),
            bmi_category: bmi_category(height, weight),
            heart_rate: account.heart_rate.unwrap_or(70),
            daily_steps: account.daily_steps.unwrap_or(5000),
            systolic: account.upper_pressure.unwrap_or(120),
            diastolic: account.lower_pressure.unwrap_or(80),
        }
    }
}

/// Opaque `features -> label` model.
pub trait SleepClassifier: Send + Sync {
    fn classify(&self, features: &PredictionFeatures) -> Result<PredictionLabel>;
}

/// Where the time-series authority reads profiles from.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// `Ok(None)` when the profile authority does not know the email.
    async fn fetch_profile(&self, email: &str) -> Result<Option<UserProfile>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: PredictionLabel,
}
