pub mod attempts;
pub mod facts;
pub mod schema;
pub mod settings;
pub mod stats;
pub mod sync;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{Result, TutorError};

// Re-export all public items from submodules
pub use attempts::*;
pub use facts::*;
pub use schema::run_migrations;
pub use settings::*;
pub use stats::*;
pub use sync::ProgressSyncQueue;

pub type DbPool = Arc<Mutex<Connection>>;

/// Extension trait for logging errors before discarding them
pub trait LogOnError<T> {
    /// Log the error at warn level and return None
    fn log_warn(self, context: &str) -> Option<T>;
}

impl<T, E: std::fmt::Display> LogOnError<T> for std::result::Result<T, E> {
    fn log_warn(self, context: &str) -> Option<T> {
        match self {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("{}: {}", context, e);
                None
            }
        }
    }
}

/// Try to acquire the database lock, returning an error if poisoned
pub fn try_lock(pool: &DbPool) -> Result<MutexGuard<'_, Connection>> {
  pool.lock().map_err(|_: PoisonError<_>| {
    tracing::error!("Database mutex poisoned - a thread panicked while holding the lock");
    TutorError::DbLock
  })
}

pub fn init_db(path: &Path) -> Result<DbPool> {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent)?;
  }

  // Create backup before migrations if database exists
  if path.exists() {
    let backup_path = path.with_extension("db.backup");
    if let Err(e) = std::fs::copy(path, &backup_path) {
      tracing::warn!("Could not create database backup: {}", e);
    }
  }

  let conn = Connection::open(path)?;
  run_migrations(&conn)?;
  tracing::info!("Database ready at {}", path.display());
  Ok(Arc::new(Mutex::new(conn)))
}

/// Create a backup of the database using VACUUM INTO
pub fn backup_database(conn: &Connection, backup_path: &Path) -> rusqlite::Result<()> {
  conn.execute("VACUUM INTO ?1", [backup_path.to_string_lossy()])?;
  Ok(())
}

/// Fixed-width UTC timestamps so stored text sorts chronologically.
pub(crate) fn to_db_timestamp(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp; `column` is reported if the text is corrupt.
pub(crate) fn from_db_timestamp(s: &str, column: usize) -> rusqlite::Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e)))
}
