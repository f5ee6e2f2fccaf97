use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use log::{log, Level};

use crate::errors::{Error, Result};

/// Runs every store operation against a primary and, when the primary fails
/// at the storage layer, re-runs it against a fallback store.
///
/// Domain outcomes (`NotFound`, `Validation`, `Conflict`, ...) are returned as
/// is. Only `Error::Database` triggers the fallback; its result is returned
/// whether it succeeds or not.
pub struct FallbackStore<R: ?Sized> {
    primary: Arc<R>,
    fallback: Arc<R>,
    fallbacks: AtomicU64,
}

/// Unreachable stores are expected during outages; anything else is a defect.
pub fn fallback_log_level(err: &Error) -> Level {
    if err.is_connectivity() {
        Level::Warn
    } else {
        Level::Error
    }
}

impl<R: ?Sized + Send + Sync> FallbackStore<R> {
    pub fn new(primary: Arc<R>, fallback: Arc<R>) -> Self {
        Self {
            primary,
            fallback,
            fallbacks: AtomicU64::new(0),
        }
    }

    pub fn primary(&self) -> &Arc<R> {
        &self.primary
    }

    pub fn fallback(&self) -> &Arc<R> {
        &self.fallback
    }

    /// Number of operations served by the fallback store so far.
    pub fn fallback_count(&self) -> u64 {
        self.fallbacks.load(Ordering::Relaxed)
    }

    fn note_fallback(&self, operation: &str, err: &Error) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
        log!(
            fallback_log_level(err),
            "[Fallback] Primary store failed during {}, switching to fallback: {}",
            operation,
            err
        );
    }

    pub fn read<T>(&self, operation: &str, action: impl Fn(&R) -> Result<T>) -> Result<T> {
        match action(self.primary.as_ref()) {
            Err(err) if err.is_storage_failure() => {
                self.note_fallback(operation, &err);
                action(self.fallback.as_ref())
            }
            outcome => outcome,
        }
    }

    pub async fn write<'a, T, F>(&'a self, operation: &str, action: F) -> Result<T>
    where
        F: Fn(&'a R) -> BoxFuture<'a, Result<T>>,
    {
        match action(self.primary.as_ref()).await {
            Err(err) if err.is_storage_failure() => {
                self.note_fallback(operation, &err);
                action(self.fallback.as_ref()).await
            }
            outcome => outcome,
        }
    }
}
