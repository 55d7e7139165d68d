//! SQLite access serialized through a dedicated worker thread.
//!
//! All reads and writes go through [`Database::execute`]: the closure runs
//! on the worker's single connection, so every repository operation is an
//! atomic unit of work against current store state. Other app instances
//! may share the database file; nothing in-process races.

use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::Context;
use log::{error, info};
use rusqlite::Connection;
use tokio::sync::oneshot;

use crate::db::migrations::run_migrations;
use crate::error::{Result, ServiceError};

type StoreTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum StoreMessage {
    Run(StoreTask),
    Shutdown,
}

/// Another instance may hold a write lock briefly; wait this long for it
/// before giving up with SQLITE_BUSY.
const BUSY_TIMEOUT_MS: u32 = 5_000;

struct WorkerLink {
    tx: mpsc::Sender<StoreMessage>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for WorkerLink {
    fn drop(&mut self) {
        let mut guard = match self.handle.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if self.tx.send(StoreMessage::Shutdown).is_err() {
                error!("Store worker was already gone at shutdown");
            }
            if let Err(panic) = handle.join() {
                error!("Store worker panicked: {panic:?}");
            }
        }
    }
}

/// Pragmas for this store: WAL so readers in other instances never block
/// us, a busy timeout for their writes, and foreign keys as a backstop
/// behind the explicit cascade/detach in the users repository.
fn configure(conn: &Connection) {
    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        error!("Could not switch to WAL journaling: {err}");
    }
    if let Err(err) = conn.pragma_update(None, "busy_timeout", BUSY_TIMEOUT_MS) {
        error!("Could not set busy timeout: {err}");
    }
    if let Err(err) = conn.pragma_update(None, "foreign_keys", "ON") {
        error!("Could not enable foreign key enforcement: {err}");
    }
}

fn worker_loop(conn: &mut Connection, rx: &mpsc::Receiver<StoreMessage>) {
    while let Ok(message) = rx.recv() {
        match message {
            StoreMessage::Run(task) => task(conn),
            StoreMessage::Shutdown => break,
        }
    }
    info!("Store worker stopping");
}

#[derive(Clone)]
pub struct Database {
    link: Arc<WorkerLink>,
    db_path: Arc<PathBuf>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> anyhow::Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        Self::start(db_path)
    }

    /// Ephemeral store; contents are gone when the handle drops. Used by
    /// the test suites.
    pub fn open_in_memory() -> anyhow::Result<Self> {
        Self::start(PathBuf::from(":memory:"))
    }

    fn start(db_path: PathBuf) -> anyhow::Result<Self> {
        let (tx, rx) = mpsc::channel::<StoreMessage>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let worker_path = db_path.clone();

        let handle = thread::Builder::new()
            .name("cabstand-db".into())
            .spawn(move || {
                let mut conn = match Connection::open(&worker_path) {
                    Ok(conn) => conn,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow::Error::new(err)
                            .context("failed to open SQLite database")));
                        return;
                    }
                };

                configure(&conn);

                let migrated =
                    run_migrations(&mut conn).context("failed to run database migrations");
                if ready_tx.send(migrated).is_err() {
                    error!("Nobody waiting on store startup; worker exiting");
                    return;
                }

                worker_loop(&mut conn, &rx);
            })
            .context("failed to spawn store worker thread")?;

        ready_rx
            .recv()
            .context("store worker exited before signaling readiness")??;

        info!("Store ready at {}", db_path.display());

        Ok(Self {
            link: Arc::new(WorkerLink {
                tx,
                handle: Mutex::new(Some(handle)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    /// Run one unit of work on the store thread and await its result.
    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();

        let message = StoreMessage::Run(Box::new(move |conn| {
            let outcome = task(conn);
            if reply_tx.send(outcome).is_err() {
                error!("Store caller went away before its result arrived");
            }
        }));

        self.link
            .tx
            .send(message)
            .map_err(|err| ServiceError::Storage(format!("store worker unreachable: {err}")))?;

        reply_rx
            .await
            .map_err(|_| ServiceError::Storage("store worker dropped the task".into()))?
    }
}
