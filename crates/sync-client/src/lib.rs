//! reqwest client for the sleepsync sync receivers.
//!
//! One [`SyncApiClient`] serves as the buffer's sync transport, the
//! time-series authority's profile source and the profile authority's
//! metric propagator.

mod client;
mod error;

pub use client::{SyncApiClient, SyncEndpoints, DEFAULT_TIMEOUT_SECS};
pub use error::{Result, SyncClientError};
