//! Single writer thread per store. Every mutation runs inside an immediate
//! transaction on this thread, so concurrent upserts on one natural key are
//! serialized.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use diesel::{Connection, SqliteConnection};
use log::{debug, error};
use sleepsync_core::errors::{Error, Result};
use tokio::sync::oneshot;

use super::DbPool;
use crate::errors::StorageError;

type WriteJob = Box<dyn FnOnce(&DbPool) + Send>;

enum WriteCommand {
    Run(WriteJob),
    Shutdown,
}

struct WriterThread {
    sender: mpsc::Sender<WriteCommand>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Drop for WriterThread {
    fn drop(&mut self) {
        let _ = self.sender.send(WriteCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("[Writer] writer thread panicked during shutdown");
            }
        }
    }
}

/// Cloneable handle onto the writer thread. The thread stops when the last
/// handle is dropped.
#[derive(Clone)]
pub struct WriteHandle {
    inner: Arc<WriterThread>,
}

/// Lets a job return core errors while diesel still sees its own error type
/// for rollback.
enum TxError {
    Job(Error),
    Diesel(diesel::result::Error),
}

impl From<diesel::result::Error> for TxError {
    fn from(err: diesel::result::Error) -> Self {
        TxError::Diesel(err)
    }
}

impl WriteHandle {
    /// Runs `job` in an immediate transaction on the writer thread.
    pub async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel::<Result<T>>();

        let task: WriteJob = Box::new(move |pool: &DbPool| {
            let outcome = match pool.get() {
                Ok(mut conn) => conn
                    .immediate_transaction::<T, TxError, _>(|tx| job(tx).map_err(TxError::Job))
                    .map_err(|err| match err {
                        TxError::Job(e) => e,
                        TxError::Diesel(e) => Error::from(StorageError::Query(e)),
                    }),
                Err(e) => Err(Error::from(StorageError::Pool(e))),
            };
            let _ = reply_tx.send(outcome);
        });

        self.inner
            .sender
            .send(WriteCommand::Run(task))
            .map_err(|_| Error::from(StorageError::Writer("writer thread stopped".into())))?;

        reply_rx
            .await
            .map_err(|_| Error::from(StorageError::Writer("writer dropped the job".into())))?
    }
}

pub fn spawn_writer(pool: DbPool) -> WriteHandle {
    let (sender, receiver) = mpsc::channel::<WriteCommand>();

    let handle = thread::Builder::new()
        .name("sqlite-writer".into())
        .spawn(move || {
            debug!("[Writer] started");
            while let Ok(command) = receiver.recv() {
                match command {
                    WriteCommand::Run(job) => job(&pool),
                    WriteCommand::Shutdown => break,
                }
            }
            debug!("[Writer] stopped");
        });

    let handle = match handle {
        Ok(handle) => Some(handle),
        Err(e) => {
            error!("[Writer] failed to spawn writer thread: {}", e);
            None
        }
    };

    WriteHandle {
        inner: Arc::new(WriterThread { sender, handle }),
    }
}
