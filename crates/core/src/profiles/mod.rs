//! Profile authority: accounts, work profiles and feedback.

mod credentials;
mod profiles_model;
mod profiles_service;
mod profiles_traits;
mod work_titles;

pub use credentials::{hash_password, verify_password};
pub use profiles_model::*;
pub use profiles_service::ProfileService;
pub use profiles_traits::ProfileRepositoryTrait;
pub use work_titles::{normalize_work_title, work_id_for_title, UNKNOWN_WORK_ID};

#[cfg(test)]
mod profiles_service_tests;
