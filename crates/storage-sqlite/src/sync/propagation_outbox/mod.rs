mod model;
mod repository;

pub use model::PropagationOutboxDB;
pub use repository::PropagationOutboxRepository;
