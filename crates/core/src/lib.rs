//! Domain core for the sleepsync services: models, reconciliation services,
//! cross-service propagation, primary/fallback selection and the offline sync
//! engine. Storage and HTTP live in sibling crates behind the traits defined here.

pub mod datastore;
pub mod errors;
pub mod profiles;
pub mod propagation;
pub mod reconcile;
pub mod sync;
pub mod timeseries;
pub mod utils;

pub use errors::{Error, Result};
