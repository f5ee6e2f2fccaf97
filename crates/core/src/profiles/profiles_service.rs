use std::sync::Arc;

use log::{debug, info};

use super::credentials::hash_password;
use super::profiles_model::*;
use super::profiles_traits::ProfileRepositoryTrait;
use super::work_titles::work_id_for_title;
use crate::errors::{Error, Result};
use crate::propagation::{DailyMetricPush, PropagationDispatcher};
use crate::reconcile::{MergePolicy, MessageResponse, UpsertOutcome};
use crate::utils::time_utils::{age_on, now_naive, parse_birth_date, parse_timestamp_or, today};

/// Profile authority: accounts, work profiles and feedback.
pub struct ProfileService {
    repository: Arc<dyn ProfileRepositoryTrait>,
    propagation: Arc<PropagationDispatcher>,
    policy: MergePolicy,
}

fn require_email(email: &str) -> Result<String> {
    let email = email.trim();
    if email.is_empty() {
        return Err(Error::validation("email is required"));
    }
    Ok(email.to_string())
}

impl ProfileService {
    pub fn new(
        repository: Arc<dyn ProfileRepositoryTrait>,
        propagation: Arc<PropagationDispatcher>,
        policy: MergePolicy,
    ) -> Self {
        Self {
            repository,
            propagation,
            policy,
        }
    }

    pub fn merge_policy(&self) -> MergePolicy {
        self.policy
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<RegisterResponse> {
        let email = require_email(&request.email)?;
        if request.password.is_empty() {
            return Err(Error::validation("password is required"));
        }
        if self.repository.get_account(&email)?.is_some() {
            return Err(Error::Conflict("Email already registered".to_string()));
        }

        let role = request
            .role
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ROLE.to_string());
        let account = self
            .repository
            .create_account(NewAccount {
                email,
                hashed_password: hash_password(&request.password),
                role,
                fields: AccountPatch::default(),
            })
            .await?;
        info!("[Profile] Registered account {}", account.email);

        Ok(RegisterResponse {
            message: "User registered".to_string(),
            email: account.email,
            role: account.role,
        })
    }

    pub fn get_profile(&self, email: &str) -> Result<UserProfile> {
        let account = self
            .repository
            .get_account(email)?
            .ok_or_else(|| Error::not_found("User not found"))?;
        let work = self.repository.get_work_profile(email)?;
        Ok(UserProfile::new(account, work))
    }

    pub fn list_accounts(&self) -> Result<Vec<AccountSummary>> {
        Ok(self
            .repository
            .list_accounts()?
            .into_iter()
            .map(AccountSummary::from)
            .collect())
    }

    pub fn get_account_detail(&self, email: &str) -> Result<Account> {
        self.repository
            .get_account(email)?
            .ok_or_else(|| Error::not_found("User not found"))
    }

    /// `PUT /user-profile/update`: name, gender and date of birth when supplied.
    pub async fn update_profile(&self, request: ProfileFieldRequest) -> Result<Account> {
        let email = require_email(&request.email)?;
        let date_of_birth = request.date_of_birth.as_deref().and_then(parse_birth_date);
        let patch = AccountPatch {
            name: self.policy.text(request.name),
            gender: request.gender,
            age: date_of_birth.map(|dob| age_on(dob, today())),
            date_of_birth,
            ..Default::default()
        };
        self.repository.update_account(email, patch).await
    }

    pub async fn save_name(&self, request: ProfileFieldRequest) -> Result<MessageResponse> {
        let name = request
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| Error::validation("name is required"))?;
        self.apply(
            &request.email,
            AccountPatch {
                name: Some(name),
                ..Default::default()
            },
        )
        .await?;
        Ok(MessageResponse::new("Name saved"))
    }

    pub async fn save_gender(&self, request: ProfileFieldRequest) -> Result<MessageResponse> {
        self.apply(
            &request.email,
            AccountPatch {
                gender: request.gender,
                ..Default::default()
            },
        )
        .await?;
        Ok(MessageResponse::new("Gender saved"))
    }

    /// Stores the date of birth and the age derived from it.
    pub async fn save_date_of_birth(&self, request: ProfileFieldRequest) -> Result<MessageResponse> {
        let raw = request
            .date_of_birth
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| Error::validation("date_of_birth is required"))?;
        let dob = parse_birth_date(&raw)
            .ok_or_else(|| Error::validation(format!("Invalid date of birth '{}'", raw)))?;
        self.apply(
            &request.email,
            AccountPatch {
                date_of_birth: Some(dob),
                age: Some(age_on(dob, today())),
                ..Default::default()
            },
        )
        .await?;
        Ok(MessageResponse::new("Date of birth saved"))
    }

    pub async fn save_weight(&self, request: ProfileFieldRequest) -> Result<MessageResponse> {
        self.apply(
            &request.email,
            AccountPatch {
                weight: request.weight,
                ..Default::default()
            },
        )
        .await?;
        Ok(MessageResponse::new("Weight saved"))
    }

    pub async fn save_height(&self, request: ProfileFieldRequest) -> Result<MessageResponse> {
        self.apply(
            &request.email,
            AccountPatch {
                height: request.height,
                ..Default::default()
            },
        )
        .await?;
        Ok(MessageResponse::new("Height saved"))
    }

    /// Stores the occupation title and upserts the work profile with its mapped code.
    pub async fn save_work(&self, request: ProfileFieldRequest) -> Result<UserProfile> {
        let title = request
            .work
            .filter(|w| !w.trim().is_empty())
            .ok_or_else(|| Error::validation("work is required"))?;
        let work_id = work_id_for_title(&title);
        let account = self
            .apply(
                &request.email,
                AccountPatch {
                    work: Some(title),
                    ..Default::default()
                },
            )
            .await?;
        self.repository
            .upsert_work_profile(
                account.email.clone(),
                WorkProfilePatch {
                    work_id: Some(work_id),
                    ..Default::default()
                },
            )
            .await?;
        self.get_profile(&account.email)
    }

    pub async fn save_blood_pressure(&self, request: BloodPressureRequest) -> Result<MessageResponse> {
        let account = self
            .apply(
                &request.email,
                AccountPatch {
                    upper_pressure: request.upper_pressure,
                    lower_pressure: request.lower_pressure,
                    ..Default::default()
                },
            )
            .await?;
        self.propagation
            .dispatch(DailyMetricPush::blood_pressure(
                &account.email,
                today(),
                account.upper_pressure,
                account.lower_pressure,
            ))
            .await;
        Ok(MessageResponse::new("BP saved"))
    }

    pub async fn save_daily_steps(&self, request: DailyStepsRequest) -> Result<MessageResponse> {
        let account = self
            .apply(
                &request.email,
                AccountPatch {
                    daily_steps: request.daily_steps,
                    ..Default::default()
                },
            )
            .await?;
        self.propagation
            .dispatch(DailyMetricPush::daily_steps(
                &account.email,
                today(),
                account.daily_steps,
            ))
            .await;
        Ok(MessageResponse::new("Steps saved"))
    }

    pub async fn save_heart_rate(&self, request: HeartRateRequest) -> Result<MessageResponse> {
        let account = self
            .apply(
                &request.email,
                AccountPatch {
                    heart_rate: request.heart_rate,
                    ..Default::default()
                },
            )
            .await?;
        self.propagation
            .dispatch(DailyMetricPush::heart_rate(
                &account.email,
                today(),
                account.heart_rate,
            ))
            .await;
        Ok(MessageResponse::new("Heart rate saved"))
    }

    pub async fn submit_feedback(&self, request: SubmitFeedbackRequest) -> Result<MessageResponse> {
        let email = require_email(&request.email)?;
        self.repository
            .insert_feedback(NewFeedback {
                email,
                feedback: request.feedback,
                created_at: now_naive(),
            })
            .await?;
        Ok(MessageResponse::new("Feedback submitted"))
    }

    // -- Sync receivers ----------------------------------------------------

    pub async fn sync_user(&self, request: SyncUserRequest) -> Result<MessageResponse> {
        let email = require_email(&request.email)?;
        let patch = request.to_patch(self.policy);
        let outcome = self.repository.upsert_account(email.clone(), patch).await?;
        log_outcome("User", &email, outcome);
        Ok(MessageResponse::synced("User"))
    }

    pub async fn sync_work_data(&self, request: SyncWorkDataRequest) -> Result<MessageResponse> {
        let email = require_email(&request.email)?;
        let patch = request.to_patch(self.policy);
        let outcome = self
            .repository
            .upsert_work_profile(email.clone(), patch)
            .await?;
        log_outcome("Work", &email, outcome);
        Ok(MessageResponse::synced("Work"))
    }

    pub async fn sync_feedback(&self, request: SyncFeedbackRequest) -> Result<MessageResponse> {
        let email = require_email(&request.email)?;
        let created_at = parse_timestamp_or(request.created_at.as_deref(), now_naive());
        self.repository
            .insert_feedback(NewFeedback {
                email,
                feedback: request.feedback,
                created_at,
            })
            .await?;
        Ok(MessageResponse::synced("Feedback"))
    }

    async fn apply(&self, email: &str, patch: AccountPatch) -> Result<Account> {
        let email = require_email(email)?;
        self.repository.update_account(email, patch).await
    }
}

fn log_outcome(entity: &str, email: &str, outcome: UpsertOutcome) {
    debug!("[Reconcile] {} {} -> {:?}", entity, email, outcome);
}
