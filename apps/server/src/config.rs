//! Process configuration read from `SLEEPSYNC_*` environment variables.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use sleepsync_core::propagation::PropagationMode;
use sleepsync_core::reconcile::MergePolicy;
use thiserror::Error;

pub const DEFAULT_PRIMARY_CONNECT_TIMEOUT_SECS: u64 = 3;
pub const DEFAULT_PROPAGATION_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_POOL_SIZE: u32 = 8;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            name,
            reason: reason.into(),
        }
    }
}

/// Which authority this process serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceRole {
    Profile,
    TimeSeries,
}

impl ServiceRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceRole::Profile => "profile",
            ServiceRole::TimeSeries => "timeseries",
        }
    }

    fn default_bind_addr(&self) -> &'static str {
        match self {
            ServiceRole::Profile => "0.0.0.0:8000",
            ServiceRole::TimeSeries => "0.0.0.0:8001",
        }
    }
}

impl fmt::Display for ServiceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "profile" | "auth" => Ok(ServiceRole::Profile),
            "timeseries" | "time-series" | "predict" => Ok(ServiceRole::TimeSeries),
            other => Err(format!("unknown service role '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub role: ServiceRole,
    pub bind_addr: String,
    pub primary_db: String,
    pub fallback_db: String,
    pub primary_connect_timeout: Duration,
    pub pool_size: u32,
    pub merge_policy: MergePolicy,
    pub profile_url: Option<String>,
    pub timeseries_url: Option<String>,
    pub propagation_mode: PropagationMode,
    pub propagation_timeout: Duration,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let role = match read("SLEEPSYNC_SERVICE") {
            Some(raw) => raw
                .parse::<ServiceRole>()
                .map_err(|e| ConfigError::invalid("SLEEPSYNC_SERVICE", e))?,
            None => ServiceRole::Profile,
        };
        let merge_policy = match read("SLEEPSYNC_MERGE_POLICY") {
            Some(raw) => raw
                .parse::<MergePolicy>()
                .map_err(|e| ConfigError::invalid("SLEEPSYNC_MERGE_POLICY", e))?,
            None => MergePolicy::default(),
        };
        let propagation_mode = match read("SLEEPSYNC_PROPAGATION_MODE") {
            Some(raw) => raw
                .parse::<PropagationMode>()
                .map_err(|e| ConfigError::invalid("SLEEPSYNC_PROPAGATION_MODE", e))?,
            None => PropagationMode::default(),
        };

        let primary_connect_timeout = Duration::from_secs(parse_number(
            "SLEEPSYNC_PRIMARY_CONNECT_TIMEOUT_SECS",
            read("SLEEPSYNC_PRIMARY_CONNECT_TIMEOUT_SECS"),
            DEFAULT_PRIMARY_CONNECT_TIMEOUT_SECS,
        )?);
        let propagation_timeout = Duration::from_secs(parse_number(
            "SLEEPSYNC_PROPAGATION_TIMEOUT_SECS",
            read("SLEEPSYNC_PROPAGATION_TIMEOUT_SECS"),
            DEFAULT_PROPAGATION_TIMEOUT_SECS,
        )?);
        let pool_size = parse_number(
            "SLEEPSYNC_POOL_SIZE",
            read("SLEEPSYNC_POOL_SIZE"),
            DEFAULT_POOL_SIZE,
        )?;
        if pool_size == 0 {
            return Err(ConfigError::invalid("SLEEPSYNC_POOL_SIZE", "must be at least 1"));
        }

        let url = |name: &str| read(name).map(|v| v.trim_end_matches('/').to_string());

        Ok(ServerConfig {
            role,
            bind_addr: read("SLEEPSYNC_BIND_ADDR")
                .unwrap_or_else(|| role.default_bind_addr().to_string()),
            primary_db: read("SLEEPSYNC_PRIMARY_DB")
                .unwrap_or_else(|| format!("data/{}-primary.db", role)),
            fallback_db: read("SLEEPSYNC_FALLBACK_DB")
                .unwrap_or_else(|| format!("data/{}-fallback.db", role)),
            primary_connect_timeout,
            pool_size,
            merge_policy,
            profile_url: url("SLEEPSYNC_PROFILE_URL"),
            timeseries_url: url("SLEEPSYNC_TIMESERIES_URL"),
            propagation_mode,
            propagation_timeout,
        })
    }
}

fn parse_number<T: FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    match raw {
        Some(value) => value
            .parse::<T>()
            .map_err(|e| ConfigError::invalid(name, format!("'{}': {}", value, e))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_follow_the_role() {
        let config = config_from(&[("SLEEPSYNC_SERVICE", "timeseries")]).unwrap();
        assert_eq!(config.role, ServiceRole::TimeSeries);
        assert_eq!(config.bind_addr, "0.0.0.0:8001");
        assert_eq!(config.primary_db, "data/timeseries-primary.db");
        assert_eq!(config.primary_connect_timeout, Duration::from_secs(3));
        assert_eq!(config.propagation_timeout, Duration::from_secs(5));
        assert_eq!(config.merge_policy, MergePolicy::PresentValues);
        assert_eq!(config.propagation_mode, PropagationMode::Inline);
    }

    #[test]
    fn blank_values_are_unset_and_urls_are_trimmed() {
        let config = config_from(&[
            ("SLEEPSYNC_BIND_ADDR", "   "),
            ("SLEEPSYNC_TIMESERIES_URL", " http://ts.local:8001/ "),
            ("SLEEPSYNC_PROFILE_URL", ""),
        ])
        .unwrap();
        assert_eq!(config.role, ServiceRole::Profile);
        assert_eq!(config.bind_addr, "0.0.0.0:8000");
        assert_eq!(config.timeseries_url.as_deref(), Some("http://ts.local:8001"));
        assert!(config.profile_url.is_none());
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = config_from(&[("SLEEPSYNC_POOL_SIZE", "lots")]).unwrap_err();
        assert!(err.to_string().contains("SLEEPSYNC_POOL_SIZE"));

        let err = config_from(&[("SLEEPSYNC_PROPAGATION_MODE", "carrier-pigeon")]).unwrap_err();
        assert!(err.to_string().contains("SLEEPSYNC_PROPAGATION_MODE"));
    }
}
