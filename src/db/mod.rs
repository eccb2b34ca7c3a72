//! Database layer for the GTD board.
//!
//! Every mutating operation follows the same shape: open an immediate
//! transaction, load the full task set, compute the new state in memory with
//! the `tree` algorithms, write back only the rows that changed, commit, and
//! publish one change event.

pub mod cascade;
pub mod export;
pub mod moves;
pub mod paths;
pub mod tasks;
pub mod views;

use crate::subscriptions::{ChangeEvent, ChangeNotifier, MutationKind};
use crate::types::TaskId;
use anyhow::{Result, anyhow};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Database handle wrapping a SQLite connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    notifier: Option<ChangeNotifier>,
}

impl Database {
    /// Open or create the database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for concurrent access
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA foreign_keys=ON;
             PRAGMA busy_timeout=5000;",
        )?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            notifier: None,
        };

        db.run_migrations()?;

        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            notifier: None,
        };

        db.run_migrations()?;

        Ok(db)
    }

    /// Publish a change event after every successful mutation.
    pub fn with_notifier(mut self, notifier: ChangeNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Run database migrations.
    fn run_migrations(&self) -> Result<()> {
        let mut conn = self.lock()?;
        embedded::migrations::runner().run(&mut *conn)?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database connection lock poisoned"))
    }

    /// Execute a function with exclusive access to the connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Execute a function with mutable access to the connection (for transactions).
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.lock()?;
        f(&mut conn)
    }

    /// Run `f` inside an immediate transaction.
    ///
    /// The write lock is taken before the first read, so concurrent
    /// read-modify-write operations on the same file serialize instead of
    /// losing updates. Returning `Err` rolls everything back.
    pub fn with_transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction) -> Result<T>,
    {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let value = f(&tx)?;
            tx.commit()?;
            Ok(value)
        })
    }

    /// Tell subscribers that a committed operation changed `task_ids`.
    pub(crate) fn publish(&self, kind: MutationKind, task_ids: Vec<TaskId>) {
        if let Some(notifier) = &self.notifier {
            let receivers = notifier.publish(ChangeEvent { kind, task_ids });
            debug!(?kind, receivers, "Published change event");
        }
    }
}

/// Get the current timestamp in milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Today's local date, used by the date-based views.
pub fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}
