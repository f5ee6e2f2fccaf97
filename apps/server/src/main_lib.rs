use std::sync::Arc;

use sleepsync_core::datastore::{ProfileStore, TimeSeriesStore};
use sleepsync_core::profiles::{ProfileRepositoryTrait, ProfileService};
use sleepsync_core::propagation::{
    drain_propagation_outbox, DailyMetricsPropagator, PropagationDispatcher, PropagationMode,
    PropagationOutboxTrait,
};
use sleepsync_core::sync::{
    jittered_interval, PROPAGATION_BATCH_SIZE, PROPAGATION_WORKER_INTERVAL_SECS,
};
use sleepsync_core::timeseries::{SleepClassifier, TimeSeriesRepositoryTrait, TimeSeriesService};
use sleepsync_storage_sqlite::{
    create_pool, init, open_store, run_migrations, spawn_writer, DbOptions, DbPool,
    ProfileRepository, PropagationOutboxRepository, TimeSeriesRepository, WriteHandle,
    SERVER_MIGRATIONS,
};
use sleepsync_sync_client::{SyncApiClient, SyncEndpoints};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{ServerConfig, ServiceRole};
use crate::error::{ApiError, ApiResult};

/// Process-scoped state shared by every handler. Only the services of the
/// configured role are present.
pub struct AppState {
    pub config: ServerConfig,
    pub profiles: Option<Arc<ProfileService>>,
    pub profile_store: Option<Arc<ProfileStore>>,
    pub timeseries: Option<Arc<TimeSeriesService>>,
    pub timeseries_store: Option<Arc<TimeSeriesStore>>,
    pub propagation_outbox: Option<Arc<PropagationOutboxRepository>>,
    pub propagator: Option<Arc<SyncApiClient>>,
}

impl AppState {
    pub fn role(&self) -> ServiceRole {
        self.config.role
    }

    pub fn profiles(&self) -> ApiResult<&Arc<ProfileService>> {
        self.profiles
            .as_ref()
            .ok_or_else(|| ApiError::Unavailable("Profile service is not enabled".to_string()))
    }

    pub fn timeseries(&self) -> ApiResult<&Arc<TimeSeriesService>> {
        self.timeseries
            .as_ref()
            .ok_or_else(|| ApiError::Unavailable("Time-series service is not enabled".to_string()))
    }

    /// Operations served by the fallback store since startup.
    pub fn fallback_count(&self) -> u64 {
        let profiles = self.profile_store.as_ref().map_or(0, |s| s.fallback_count());
        let timeseries = self
            .timeseries_store
            .as_ref()
            .map_or(0, |s| s.fallback_count());
        profiles + timeseries
    }
}

/// Opens the primary store without touching it: an unreachable primary is
/// reported per operation, so startup only warns.
fn open_primary(config: &ServerConfig) -> anyhow::Result<(Arc<DbPool>, WriteHandle)> {
    let options = DbOptions {
        connection_timeout: config.primary_connect_timeout,
        pool_size: config.pool_size,
        ..DbOptions::default()
    };
    if let Err(err) = init(&config.primary_db) {
        warn!("Primary store directory unavailable: {}", err);
    }
    let pool = create_pool(&config.primary_db, &options)?;
    if let Err(err) = run_migrations(&pool, SERVER_MIGRATIONS) {
        warn!(
            "Primary store {} not migrated, operations will fall back until it is reachable: {}",
            config.primary_db, err
        );
    }
    let writer = spawn_writer(pool.as_ref().clone());
    Ok((pool, writer))
}

fn open_fallback(config: &ServerConfig) -> anyhow::Result<(Arc<DbPool>, WriteHandle)> {
    let options = DbOptions {
        pool_size: config.pool_size,
        ..DbOptions::default()
    };
    Ok(open_store(&config.fallback_db, &options, SERVER_MIGRATIONS)?)
}

pub fn build_state(config: ServerConfig) -> anyhow::Result<Arc<AppState>> {
    build_state_with_classifier(config, None)
}

/// Wires stores and services for the configured role. The classifier is
/// optional; without one `/predict` answers 503.
pub fn build_state_with_classifier(
    config: ServerConfig,
    classifier: Option<Arc<dyn SleepClassifier>>,
) -> anyhow::Result<Arc<AppState>> {
    info!(
        "Starting {} service (primary={}, fallback={})",
        config.role, config.primary_db, config.fallback_db
    );
    let (primary_pool, primary_writer) = open_primary(&config)?;
    let (fallback_pool, fallback_writer) = open_fallback(&config)?;

    let mut state = AppState {
        config: config.clone(),
        profiles: None,
        profile_store: None,
        timeseries: None,
        timeseries_store: None,
        propagation_outbox: None,
        propagator: None,
    };

    match config.role {
        ServiceRole::Profile => {
            let primary: Arc<dyn ProfileRepositoryTrait> =
                Arc::new(ProfileRepository::new(primary_pool, primary_writer));
            let fallback: Arc<dyn ProfileRepositoryTrait> = Arc::new(ProfileRepository::new(
                fallback_pool.clone(),
                fallback_writer.clone(),
            ));
            let store = Arc::new(ProfileStore::new(primary, fallback));

            let propagator = match &config.timeseries_url {
                Some(url) => Some(Arc::new(SyncApiClient::new(
                    SyncEndpoints::new(None, Some(url.clone())),
                    config.propagation_timeout,
                )?)),
                None => {
                    warn!("SLEEPSYNC_TIMESERIES_URL not set, health metrics will not propagate");
                    None
                }
            };
            let outbox = match config.propagation_mode {
                PropagationMode::Durable => Some(Arc::new(PropagationOutboxRepository::new(
                    fallback_pool,
                    fallback_writer,
                ))),
                PropagationMode::Inline => None,
            };
            let dispatcher = PropagationDispatcher::new(
                config.propagation_mode,
                propagator
                    .clone()
                    .map(|p| p as Arc<dyn DailyMetricsPropagator>),
                outbox.clone().map(|o| o as Arc<dyn PropagationOutboxTrait>),
            );

            state.profiles = Some(Arc::new(ProfileService::new(
                store.clone(),
                Arc::new(dispatcher),
                config.merge_policy,
            )));
            state.profile_store = Some(store);
            state.propagation_outbox = outbox;
            state.propagator = propagator;
        }
        ServiceRole::TimeSeries => {
            let primary: Arc<dyn TimeSeriesRepositoryTrait> =
                Arc::new(TimeSeriesRepository::new(primary_pool, primary_writer));
            let fallback: Arc<dyn TimeSeriesRepositoryTrait> =
                Arc::new(TimeSeriesRepository::new(fallback_pool, fallback_writer));
            let store = Arc::new(TimeSeriesStore::new(primary, fallback));

            let mut service = TimeSeriesService::new(store.clone(), config.merge_policy);
            match &config.profile_url {
                Some(url) => {
                    let client = SyncApiClient::new(
                        SyncEndpoints::new(Some(url.clone()), None),
                        config.propagation_timeout,
                    )?;
                    service = service.with_profile_source(Arc::new(client));
                }
                None => warn!("SLEEPSYNC_PROFILE_URL not set, /predict is disabled"),
            }
            if let Some(classifier) = classifier {
                service = service.with_classifier(classifier);
            }

            state.timeseries = Some(Arc::new(service));
            state.timeseries_store = Some(store);
        }
    }

    Ok(Arc::new(state))
}

/// Drains the durable propagation outbox on a jittered cadence. `None` unless
/// the profile service runs in durable mode with a configured target.
pub fn spawn_propagation_worker(state: Arc<AppState>) -> Option<JoinHandle<()>> {
    let outbox = state.propagation_outbox.clone()?;
    let Some(propagator) = state.propagator.clone() else {
        warn!("[Propagation] Durable mode without SLEEPSYNC_TIMESERIES_URL, events stay queued");
        return None;
    };

    info!(
        "[Propagation] Outbox worker started (every ~{}s)",
        PROPAGATION_WORKER_INTERVAL_SECS
    );
    Some(tokio::spawn(async move {
        loop {
            match drain_propagation_outbox(
                outbox.as_ref(),
                propagator.as_ref(),
                PROPAGATION_BATCH_SIZE,
            )
            .await
            {
                Ok(report) if report.delivered + report.rescheduled + report.dead > 0 => {
                    debug!("[Propagation] Worker tick: {:?}", report);
                }
                Ok(_) => {}
                Err(err) => warn!("[Propagation] Outbox drain failed: {}", err),
            }
            tokio::time::sleep(jittered_interval(PROPAGATION_WORKER_INTERVAL_SECS)).await;
        }
    }))
}
