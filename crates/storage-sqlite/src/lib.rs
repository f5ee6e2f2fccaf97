//! SQLite storage for sleepsync: authoritative repositories, the propagation
//! outbox and the client-side buffer, all behind the traits in `sleepsync-core`.

pub mod buffer;
pub mod db;
pub mod errors;
pub mod profiles;
pub mod schema;
pub mod sync;
pub mod timeseries;

pub use buffer::LocalBufferRepository;
pub use db::{
    create_pool, get_connection, init, open_store, run_migrations, spawn_writer, DbOptions,
    DbPool, WriteHandle, BUFFER_MIGRATIONS, SERVER_MIGRATIONS,
};
pub use errors::StorageError;
pub use profiles::ProfileRepository;
pub use sync::PropagationOutboxRepository;
pub use timeseries::TimeSeriesRepository;
