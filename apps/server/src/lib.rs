pub mod api;
pub mod config;
pub mod error;
pub mod extract;
pub mod main_lib;

pub use api::app_router;
pub use config::{ServerConfig, ServiceRole};
pub use main_lib::{build_state, build_state_with_classifier, spawn_propagation_worker, AppState};
