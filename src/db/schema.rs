use rusqlite::{Connection, Result};

pub fn run_migrations(conn: &Connection) -> Result<()> {
  // Create tables with COMPLETE schema for new databases
  // Migrations below handle upgrades for existing databases
  conn.execute_batch(
    r#"
    CREATE TABLE IF NOT EXISTS fact_progress (
      fact TEXT PRIMARY KEY,
      a INTEGER NOT NULL,
      b INTEGER NOT NULL,
      confidence TEXT NOT NULL DEFAULT 'new',
      correct_count INTEGER NOT NULL DEFAULT 0,
      incorrect_count INTEGER NOT NULL DEFAULT 0,
      -- epoch milliseconds
      last_seen INTEGER,
      last_correct INTEGER,
      -- JSON array, either attempt objects or legacy booleans
      recent_attempts TEXT NOT NULL DEFAULT '[]',
      preferred_strategy TEXT,
      updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS attempts (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      fact TEXT NOT NULL,
      correct INTEGER NOT NULL,
      input_method TEXT NOT NULL,
      response_time_ms INTEGER NOT NULL,
      hint_shown INTEGER NOT NULL DEFAULT 0,
      attempted_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS settings (
      key TEXT PRIMARY KEY,
      value TEXT NOT NULL
    );

    -- Default settings
    INSERT OR IGNORE INTO settings (key, value) VALUES ('session_goal', '5');
    INSERT OR IGNORE INTO settings (key, value) VALUES ('focus_tables', '{"tables":[],"enabled":true}');

    -- Indexes
    CREATE INDEX IF NOT EXISTS idx_fact_progress_confidence ON fact_progress(confidence);
    CREATE INDEX IF NOT EXISTS idx_attempts_fact ON attempts(fact);
    CREATE INDEX IF NOT EXISTS idx_attempts_attempted_at ON attempts(attempted_at);
    "#,
  )?;

  // ============================================================
  // MIGRATIONS FOR EXISTING DATABASES
  // These are no-ops for new databases (columns already exist)
  // ============================================================

  // Migration: hint tracking and pinned strategies arrived after the first release
  add_column_if_missing(conn, "attempts", "hint_shown", "INTEGER NOT NULL DEFAULT 0")?;
  add_column_if_missing(conn, "fact_progress", "preferred_strategy", "TEXT")?;

  Ok(())
}

/// Check if a column exists in a table
pub(crate) fn column_exists(conn: &Connection, table: &str, column: &str) -> bool {
  conn
    .prepare(&format!("SELECT {} FROM {} LIMIT 1", column, table))
    .is_ok()
}

/// Add a column if it doesn't already exist
fn add_column_if_missing(conn: &Connection, table: &str, column: &str, column_def: &str) -> Result<()> {
  if !column_exists(conn, table, column) {
    tracing::info!("Migrating {}: adding column {}", table, column);
    conn.execute(
      &format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, column_def),
      [],
    )?;
  }
  Ok(())
}
