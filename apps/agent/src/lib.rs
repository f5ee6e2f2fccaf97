//! Offline sync agent: owns the local durable buffer and drains it to the
//! profile and time-series authorities.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use log::{info, warn};
use sleepsync_core::sync::{jittered_interval, SyncPassEngine, SyncPassReport};
use sleepsync_storage_sqlite::{open_store, DbOptions, LocalBufferRepository, BUFFER_MIGRATIONS};
use sleepsync_sync_client::{SyncApiClient, SyncEndpoints, DEFAULT_TIMEOUT_SECS};

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub buffer_db: String,
    pub profile_url: Option<String>,
    pub timeseries_url: Option<String>,
    pub timeout: Duration,
    /// `None` runs a single pass.
    pub interval_secs: Option<u64>,
}

impl AgentConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let read = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let seconds = |name: &str| -> anyhow::Result<Option<u64>> {
            read(name)
                .map(|raw| {
                    raw.parse::<u64>().with_context(|| {
                        format!("{} must be a number of seconds, got '{}'", name, raw)
                    })
                })
                .transpose()
        };

        Ok(AgentConfig {
            buffer_db: read("SLEEPSYNC_BUFFER_DB")
                .unwrap_or_else(|| "data/buffer.db".to_string()),
            profile_url: read("SLEEPSYNC_PROFILE_URL"),
            timeseries_url: read("SLEEPSYNC_TIMESERIES_URL"),
            timeout: Duration::from_secs(
                seconds("SLEEPSYNC_SYNC_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            interval_secs: seconds("SLEEPSYNC_AGENT_INTERVAL_SECS")?.filter(|s| *s > 0),
        })
    }
}

pub struct Agent {
    buffer: Arc<LocalBufferRepository>,
    engine: SyncPassEngine,
}

impl Agent {
    pub fn open(config: &AgentConfig) -> anyhow::Result<Self> {
        let (pool, writer) =
            open_store(&config.buffer_db, &DbOptions::default(), BUFFER_MIGRATIONS)
                .with_context(|| format!("failed to open buffer {}", config.buffer_db))?;
        let buffer = Arc::new(LocalBufferRepository::new(pool, writer));

        if config.profile_url.is_none() || config.timeseries_url.is_none() {
            warn!("[SyncPass] Only one authority configured; rows for the other stay buffered");
        }
        let client = SyncApiClient::new(
            SyncEndpoints::new(config.profile_url.clone(), config.timeseries_url.clone()),
            config.timeout,
        )?;
        let engine = SyncPassEngine::new(buffer.clone(), Arc::new(client));
        Ok(Agent { buffer, engine })
    }

    /// The buffer the app writes to while offline.
    pub fn buffer(&self) -> &Arc<LocalBufferRepository> {
        &self.buffer
    }

    pub async fn run_once(&self) -> anyhow::Result<SyncPassReport> {
        Ok(self.engine.run_pass().await?)
    }

    /// Runs a pass every `interval_secs` plus jitter until the task is cancelled.
    pub async fn run_periodic(&self, interval_secs: u64) {
        info!("[SyncPass] Periodic sync every ~{}s", interval_secs);
        loop {
            if let Err(err) = self.run_once().await {
                warn!("[SyncPass] Pass skipped: {}", err);
            }
            tokio::time::sleep(jittered_interval(interval_secs)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> anyhow::Result<AgentConfig> {
        let map: HashMap<&str, &str> = vars.iter().copied().collect();
        AgentConfig::from_lookup(|name| map.get(name).map(|v| v.to_string()))
    }

    #[test]
    fn unset_interval_means_a_single_pass() {
        let config = config_from(&[("SLEEPSYNC_AGENT_INTERVAL_SECS", " ")]).unwrap();
        assert_eq!(config.interval_secs, None);
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.buffer_db, "data/buffer.db");
    }

    #[test]
    fn bad_numbers_are_reported() {
        let err = config_from(&[("SLEEPSYNC_SYNC_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("SLEEPSYNC_SYNC_TIMEOUT_SECS"));
    }
}
