//! SQLite storage for sync infrastructure (the cross-service propagation outbox).

pub mod propagation_outbox;

pub use propagation_outbox::PropagationOutboxRepository;
