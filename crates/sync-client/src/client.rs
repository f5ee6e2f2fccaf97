//! HTTP client for the sync receivers, profile lookups and metric propagation.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{StatusCode, Url};
use serde::Serialize;
use sleepsync_core::profiles::UserProfile;
use sleepsync_core::propagation::{DailyMetricPush, DailyMetricsPropagator};
use sleepsync_core::sync::{Authority, BufferedRow, SyncTransport};
use sleepsync_core::timeseries::ProfileSource;

use crate::error::{Result, SyncClientError};

/// Default bound on every outbound call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;
const MAX_LOG_BODY_CHARS: usize = 512;

/// Base URLs of the two authorities. Either may be absent when a process
/// only talks to one of them.
#[derive(Debug, Clone, Default)]
pub struct SyncEndpoints {
    pub profile_url: Option<String>,
    pub timeseries_url: Option<String>,
}

impl SyncEndpoints {
    pub fn new(profile_url: Option<String>, timeseries_url: Option<String>) -> Self {
        let clean = |url: Option<String>| {
            url.map(|u| u.trim().trim_end_matches('/').to_string())
                .filter(|u| !u.is_empty())
        };
        Self {
            profile_url: clean(profile_url),
            timeseries_url: clean(timeseries_url),
        }
    }

    fn base(&self, authority: Authority) -> Result<&str> {
        let (url, name) = match authority {
            Authority::Profile => (&self.profile_url, "profile"),
            Authority::TimeSeries => (&self.timeseries_url, "time-series"),
        };
        url.as_deref().ok_or_else(|| {
            SyncClientError::invalid_request(format!("{} authority URL is not configured", name))
        })
    }
}

#[derive(Debug, Clone)]
pub struct SyncApiClient {
    client: reqwest::Client,
    endpoints: SyncEndpoints,
}

impl SyncApiClient {
    pub fn new(endpoints: SyncEndpoints, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoints })
    }

    pub fn endpoints(&self) -> &SyncEndpoints {
        &self.endpoints
    }

    fn log_response(status: StatusCode, body: &str) {
        if status.is_success() {
            debug!("Sync API response status: {}", status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("Sync API response error ({}): {}", status, preview);
    }

    /// Reads the body and turns a non-2xx answer into `SyncClientError::Api`,
    /// preferring the receiver's `detail` text.
    async fn check_response(response: reqwest::Response) -> Result<String> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if status.is_success() {
            return Ok(body);
        }
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
            .unwrap_or_else(|| format!("Request failed: {}", body));
        Err(SyncClientError::api(status.as_u16(), message))
    }

    async fn post_json<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<()> {
        let response = self.client.post(url).json(body).send().await?;
        Self::check_response(response).await?;
        Ok(())
    }

    /// Posts one buffered row to its receiver; `Ok` only on 2xx.
    pub async fn send_row(&self, row: &BufferedRow) -> Result<()> {
        let base = self.endpoints.base(row.table.authority())?;
        let url = format!("{}{}", base, row.table.endpoint());
        debug!("[SyncPass] POST {} row {}", url, row.id);
        self.post_json(&url, &row.payload).await
    }

    /// `GET /user-profile/{email}`; 404 means the email is unknown.
    pub async fn get_profile(&self, email: &str) -> Result<Option<UserProfile>> {
        let base = self.endpoints.base(Authority::Profile)?;
        let mut url = Url::parse(base)
            .map_err(|e| SyncClientError::invalid_request(format!("bad profile URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| SyncClientError::invalid_request("profile URL cannot be a base"))?
            .pop_if_empty()
            .push("user-profile")
            .push(email);

        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = Self::check_response(response).await?;
        Ok(Some(serde_json::from_str(&body)?))
    }

    /// `POST /sync_daily` on the time-series authority.
    pub async fn post_daily(&self, payload: &DailyMetricPush) -> Result<()> {
        let base = self.endpoints.base(Authority::TimeSeries)?;
        let url = format!("{}/sync_daily", base);
        self.post_json(&url, payload).await
    }
}

#[async_trait]
impl SyncTransport for SyncApiClient {
    async fn deliver(&self, row: &BufferedRow) -> sleepsync_core::Result<()> {
        Ok(self.send_row(row).await?)
    }
}

#[async_trait]
impl ProfileSource for SyncApiClient {
    async fn fetch_profile(&self, email: &str) -> sleepsync_core::Result<Option<UserProfile>> {
        Ok(self.get_profile(email).await?)
    }
}

#[async_trait]
impl DailyMetricsPropagator for SyncApiClient {
    async fn push_daily(&self, payload: &DailyMetricPush) -> sleepsync_core::Result<()> {
        Ok(self.post_daily(payload).await?)
    }
}
