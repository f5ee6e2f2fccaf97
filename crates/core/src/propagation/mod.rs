//! Cross-service propagation of health metrics from the profile authority to
//! the time-series authority.

mod propagation_model;
mod propagation_service;
mod propagation_traits;

pub use propagation_model::*;
pub use propagation_service::*;
pub use propagation_traits::*;
