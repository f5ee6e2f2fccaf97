//! Time-series authority: daily records, sleep sessions and prediction history.

mod aggregation;
mod prediction_model;
mod sleep_summary;
mod timeseries_model;
mod timeseries_service;
mod timeseries_traits;

pub use aggregation::{aggregate_labels, LabelCounts};
pub use prediction_model::*;
pub use sleep_summary::*;
pub use timeseries_model::*;
pub use timeseries_service::TimeSeriesService;
pub use timeseries_traits::TimeSeriesRepositoryTrait;

#[cfg(test)]
mod timeseries_service_tests;
