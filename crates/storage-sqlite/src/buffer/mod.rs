//! Client-side Local Durable Buffer.

pub mod model;
mod repository;
pub mod schema;

pub use repository::LocalBufferRepository;
