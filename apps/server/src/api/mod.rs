use std::sync::Arc;

use axum::Router;

use crate::config::ServiceRole;
use crate::main_lib::AppState;

pub mod health;
pub mod predict;
pub mod profile;
pub mod sync;
pub mod timeseries;

/// Routes of the configured role plus `/health`.
pub fn app_router(state: Arc<AppState>) -> Router {
    let routes = match state.role() {
        ServiceRole::Profile => profile::router().merge(sync::profile_router()),
        ServiceRole::TimeSeries => timeseries::router()
            .merge(predict::router())
            .merge(sync::timeseries_router()),
    };
    Router::new()
        .merge(health::router())
        .merge(routes)
        .with_state(state)
}
