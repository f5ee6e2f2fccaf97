//! Offline sync: local buffer contracts, the sync pass engine and retry policy.

mod buffer_model;
mod sync_pass;
mod sync_retry;
mod sync_schedule;

pub use buffer_model::*;
pub use sync_pass::*;
pub use sync_retry::*;
pub use sync_schedule::*;
