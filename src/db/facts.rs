//! Per-fact progress rows.
//!
//! Rows are written from exported snapshots and read back as snapshot
//! entries, so everything loaded from the database goes through the same
//! decoding (legacy histories included) as a JSON snapshot.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Result};
use serde_json::{json, Value};
use std::path::Path;

use crate::config::ConfidenceThresholds;
use crate::db::{backup_database, to_db_timestamp};
use crate::domain::Fact;
#[cfg(feature = "profiling")]
use crate::profiling::EventType;
use crate::snapshot::{self, LoadReport, PersistedFact};

fn conversion_error<E>(e: E) -> rusqlite::Error
where
  E: std::error::Error + Send + Sync + 'static,
{
  rusqlite::Error::ToSqlConversionFailure(Box::new(e))
}

/// Upsert one exported fact.
pub fn save_fact(conn: &Connection, persisted: &PersistedFact, now: DateTime<Utc>) -> Result<()> {
  let fact = Fact::parse(&persisted.fact).map_err(conversion_error)?;
  let attempts = serde_json::to_string(&persisted.recent_attempts).map_err(conversion_error)?;
  let confidence = persisted.confidence.unwrap_or_default();

  conn.execute(
    r#"
    INSERT INTO fact_progress
      (fact, a, b, confidence, correct_count, incorrect_count,
       last_seen, last_correct, recent_attempts, preferred_strategy, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
    ON CONFLICT(fact) DO UPDATE SET
      confidence = excluded.confidence,
      correct_count = excluded.correct_count,
      incorrect_count = excluded.incorrect_count,
      last_seen = excluded.last_seen,
      last_correct = excluded.last_correct,
      recent_attempts = excluded.recent_attempts,
      preferred_strategy = excluded.preferred_strategy,
      updated_at = excluded.updated_at
    "#,
    params![
      persisted.fact,
      fact.a(),
      fact.b(),
      confidence.as_str(),
      persisted.correct_count,
      persisted.incorrect_count,
      persisted.last_seen.map(|dt| dt.timestamp_millis()),
      persisted.last_correct.map(|dt| dt.timestamp_millis()),
      attempts,
      persisted.preferred_strategy,
      to_db_timestamp(now),
    ],
  )?;
  Ok(())
}

/// Upsert a batch of exported facts in one transaction.
pub fn save_facts(conn: &Connection, facts: &[PersistedFact], now: DateTime<Utc>) -> Result<usize> {
  #[cfg(feature = "profiling")]
  crate::profile_log!(EventType::DbQuery {
    operation: "upsert".into(),
    table: "fact_progress".into(),
  });

  let tx = conn.unchecked_transaction()?;
  for persisted in facts {
    save_fact(&tx, persisted, now)?;
  }
  tx.commit()?;
  tracing::debug!("Saved {} fact rows", facts.len());
  Ok(facts.len())
}

/// Every stored row as a snapshot entry, in registry order.
pub fn load_fact_rows(conn: &Connection) -> Result<Vec<Value>> {
  #[cfg(feature = "profiling")]
  crate::profile_log!(EventType::DbQuery {
    operation: "select".into(),
    table: "fact_progress".into(),
  });

  let mut stmt = conn.prepare(
    r#"
    SELECT fact, confidence, correct_count, incorrect_count,
           last_seen, last_correct, recent_attempts, preferred_strategy
    FROM fact_progress
    ORDER BY a, b
    "#,
  )?;

  let rows = stmt.query_map([], row_to_entry)?;
  rows.collect()
}

fn row_to_entry(row: &rusqlite::Row) -> Result<Value> {
  let attempts_text: String = row.get(6)?;
  // Unparsable text is passed through so the decoder reports it
  let recent_attempts =
    serde_json::from_str::<Value>(&attempts_text).unwrap_or(Value::String(attempts_text));

  Ok(json!({
    "fact": row.get::<_, String>(0)?,
    "confidence": row.get::<_, Option<String>>(1)?,
    "correctCount": row.get::<_, i64>(2)?,
    "incorrectCount": row.get::<_, i64>(3)?,
    "lastSeen": row.get::<_, Option<i64>>(4)?,
    "lastCorrect": row.get::<_, Option<i64>>(5)?,
    "recentAttempts": recent_attempts,
    "preferredStrategy": row.get::<_, Option<String>>(7)?,
  }))
}

/// Load stored progress. Bad rows are reported in the load report and
/// their facts start fresh.
pub fn load_progress(conn: &Connection, thresholds: &ConfidenceThresholds) -> Result<LoadReport> {
  let entries = load_fact_rows(conn)?;
  Ok(snapshot::load_facts(&entries, thresholds, Utc::now()))
}

/// Delete all fact rows, returning how many were removed.
pub fn clear_facts(conn: &Connection) -> Result<usize> {
  conn.execute("DELETE FROM fact_progress", [])
}

/// Outcome of replacing stored progress with a snapshot file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
  pub saved: usize,
  pub skipped: usize,
}

/// Replace all stored fact rows with the contents of a snapshot file.
///
/// The file is read and decoded before anything is touched; a missing or
/// unreadable file leaves the database as it was. The current database is
/// copied to `backup_path` before the rows are swapped in one transaction.
pub fn import_snapshot(
  conn: &Connection,
  path: &Path,
  thresholds: &ConfidenceThresholds,
  backup_path: &Path,
  now: DateTime<Utc>,
) -> crate::Result<ImportSummary> {
  let report = snapshot::read_file(path, thresholds)?;

  if let Some(parent) = backup_path.parent() {
    std::fs::create_dir_all(parent)?;
  }
  backup_database(conn, backup_path)?;
  tracing::info!("Backed up progress to {}", backup_path.display());

  let exported = snapshot::export(&report.progress);
  let tx = conn.unchecked_transaction()?;
  tx.execute("DELETE FROM fact_progress", [])?;
  for persisted in &exported {
    save_fact(&tx, persisted, now)?;
  }
  tx.commit()?;
  let saved = exported.len();

  tracing::info!(
    "Imported {} facts from {} ({} entries skipped)",
    saved,
    path.display(),
    report.skipped.len()
  );
  Ok(ImportSummary {
    saved,
    skipped: report.skipped.len(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Confidence, InputMethod};
  use crate::progress::Progress;
  use crate::testing::TestEnv;

  #[test]
  fn test_save_and_load_progress() {
    let env = TestEnv::new().unwrap();
    let mut progress = Progress::default();
    let now = Utc::now();
    crate::testing::master_fact(&mut progress, "6x7", now);
    progress
      .record_attempt_at("3x4", false, InputMethod::MultipleChoice, 5000, now)
      .unwrap();

    let exported = snapshot::export(&progress);
    assert_eq!(save_facts(&env.conn, &exported, now).unwrap(), 144);

    let report = load_progress(&env.conn, &ConfidenceThresholds::default()).unwrap();
    assert!(report.skipped.is_empty());
    assert_eq!(
      report.progress.get_by_key("6x7").unwrap().confidence(),
      Confidence::Mastered
    );
    assert_eq!(report.progress.get_by_key("3x4").unwrap().incorrect_count, 1);
  }

  #[test]
  fn test_upsert_replaces_row() {
    let env = TestEnv::new().unwrap();
    let mut progress = Progress::default();
    let now = Utc::now();

    save_fact(&env.conn, &snapshot::to_persisted(progress.get_by_key("2x2").unwrap()), now).unwrap();
    progress
      .record_attempt_at("2x2", true, InputMethod::NumberPad, 900, now)
      .unwrap();
    save_fact(&env.conn, &snapshot::to_persisted(progress.get_by_key("2x2").unwrap()), now).unwrap();

    let rows = load_fact_rows(&env.conn).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["correctCount"], 1);
    assert_eq!(rows[0]["confidence"], "learning");
  }

  #[test]
  fn test_legacy_rows_decode() {
    let env = TestEnv::new().unwrap();
    env
      .conn
      .execute_batch(
        r#"
        INSERT INTO fact_progress (fact, a, b, confidence, correct_count, incorrect_count,
                                   recent_attempts, updated_at)
        VALUES ('4x5', 4, 5, 'mastered', 6, 0, '[true,true,true,true,true,true]', '2024-01-01T00:00:00.000Z');
        INSERT INTO fact_progress (fact, a, b, confidence, correct_count, incorrect_count,
                                   recent_attempts, updated_at)
        VALUES ('5x5', 5, 5, 'new', 0, 0, 'garbage', '2024-01-01T00:00:00.000Z');
        "#,
      )
      .unwrap();

    let report = load_progress(&env.conn, &ConfidenceThresholds::default()).unwrap();
    assert_eq!(report.skipped.len(), 1);
    // Boolean history is recognition only
    assert_eq!(
      report.progress.get_by_key("4x5").unwrap().confidence(),
      Confidence::Learning
    );
    assert_eq!(report.progress.get_by_key("5x5").unwrap().confidence(), Confidence::New);
  }

  #[test]
  fn test_clear_facts() {
    let env = TestEnv::new().unwrap();
    let progress = Progress::default();
    save_facts(&env.conn, &snapshot::export(&progress), Utc::now()).unwrap();
    assert_eq!(clear_facts(&env.conn).unwrap(), 144);
    assert!(load_fact_rows(&env.conn).unwrap().is_empty());
  }

  #[test]
  fn test_import_missing_file_keeps_rows() {
    let env = TestEnv::new().unwrap();
    let mut progress = Progress::default();
    let now = Utc::now();
    crate::testing::master_fact(&mut progress, "9x6", now);
    save_facts(&env.conn, &snapshot::export(&progress), now).unwrap();

    let missing = env.temp.path().join("typo.json");
    let backup = env.temp.path().join("backups").join("before_import.db");
    let err = import_snapshot(&env.conn, &missing, &ConfidenceThresholds::default(), &backup, now)
      .unwrap_err();
    assert!(matches!(err, crate::TutorError::Io(_)));
    assert!(!backup.exists());

    let report = load_progress(&env.conn, &ConfidenceThresholds::default()).unwrap();
    assert_eq!(
      report.progress.get_by_key("9x6").unwrap().confidence(),
      Confidence::Mastered
    );
  }

  #[test]
  fn test_import_replaces_rows_after_backup() {
    let env = TestEnv::new().unwrap();
    let now = Utc::now();
    let mut stored = Progress::default();
    crate::testing::master_fact(&mut stored, "9x6", now);
    save_facts(&env.conn, &snapshot::export(&stored), now).unwrap();

    let mut incoming = Progress::default();
    incoming
      .record_attempt_at("2x7", true, InputMethod::NumberPad, 1500, now)
      .unwrap();
    let file = env.temp.path().join("incoming.json");
    snapshot::write_file(&file, &incoming).unwrap();

    let backup = env.temp.path().join("backups").join("before_import.db");
    let summary =
      import_snapshot(&env.conn, &file, &ConfidenceThresholds::default(), &backup, now).unwrap();
    assert_eq!(summary, ImportSummary { saved: 144, skipped: 0 });
    assert!(backup.exists());

    let report = load_progress(&env.conn, &ConfidenceThresholds::default()).unwrap();
    assert_eq!(report.progress.get_by_key("9x6").unwrap().confidence(), Confidence::New);
    assert_eq!(report.progress.get_by_key("2x7").unwrap().correct_count, 1);
  }
}
