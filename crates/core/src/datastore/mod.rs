//! Primary/fallback datastore selection.

mod fallback_repositories;
mod fallback_store;

pub use fallback_repositories::{ProfileStore, TimeSeriesStore};
pub use fallback_store::{fallback_log_level, FallbackStore};

#[cfg(test)]
mod fallback_store_tests;
