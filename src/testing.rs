//! Test utilities for database setup.
//!
//! Reuses the real migrations so tests never carry their own copy of the
//! schema.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use crate::db::{run_migrations, DbPool};
use crate::domain::InputMethod;
use crate::progress::Progress;

/// A migrated progress database in a temporary directory.
pub struct TestEnv {
    /// Temporary directory (kept alive for database file persistence)
    pub temp: TempDir,
    pub conn: Connection,
}

impl TestEnv {
    pub fn new() -> rusqlite::Result<Self> {
        let temp =
            TempDir::new().map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        let conn = Connection::open(temp.path().join("progress.db"))?;
        run_migrations(&conn)?;

        Ok(Self { temp, conn })
    }

    pub fn db_path(&self) -> PathBuf {
        self.temp.path().join("progress.db")
    }

    /// A second handle on the same database, shaped like the app's pool.
    pub fn pool(&self) -> rusqlite::Result<DbPool> {
        Ok(Arc::new(Mutex::new(Connection::open(self.db_path())?)))
    }
}

/// Answer `key` correctly on the number pad until it is mastered.
pub fn master_fact(progress: &mut Progress, key: &str, now: DateTime<Utc>) {
    let needed = progress.thresholds().mastered_min_correct;
    for _ in 0..needed {
        progress
            .record_attempt_at(key, true, InputMethod::NumberPad, 2000, now)
            .ok();
    }
}

