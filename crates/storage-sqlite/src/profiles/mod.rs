pub mod model;
mod repository;

pub use repository::ProfileRepository;
