//! Attempt log: one row per answered question

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::{params, Connection, Result};

use crate::db::{from_db_timestamp, to_db_timestamp};
use crate::domain::{Attempt, Fact, InputMethod};
#[cfg(feature = "profiling")]
use crate::profiling::EventType;

/// Upper bound on rows returned by `get_attempts_since`.
pub const ATTEMPT_QUERY_LIMIT: usize = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub id: i64,
    pub fact: String,
    pub correct: bool,
    pub input_method: InputMethod,
    pub response_time_ms: u32,
    pub hint_shown: bool,
    pub attempted_at: DateTime<Utc>,
}

pub fn insert_attempt(conn: &Connection, fact: Fact, attempt: &Attempt, hint_shown: bool) -> Result<i64> {
    #[cfg(feature = "profiling")]
    crate::profile_log!(EventType::DbQuery {
        operation: "insert".into(),
        table: "attempts".into(),
    });

    conn.execute(
        r#"
    INSERT INTO attempts (fact, correct, input_method, response_time_ms, hint_shown, attempted_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    "#,
        params![
            fact.key(),
            attempt.correct,
            attempt.input_method.as_str(),
            attempt.response_time_ms,
            hint_shown,
            to_db_timestamp(attempt.timestamp),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

const SELECT_ATTEMPTS: &str = r#"
    SELECT id, fact, correct, input_method, response_time_ms, hint_shown, attempted_at
    FROM attempts
"#;

/// All logged attempts for one fact, oldest first.
pub fn get_fact_attempts(conn: &Connection, fact: Fact) -> Result<Vec<AttemptRecord>> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE fact = ?1 ORDER BY attempted_at, id",
        SELECT_ATTEMPTS
    ))?;
    let rows = stmt.query_map(params![fact.key()], row_to_attempt)?;
    rows.collect()
}

/// Most recent attempts first, optionally only those after `since`.
pub fn get_attempts_since(conn: &Connection, since: Option<DateTime<Utc>>) -> Result<Vec<AttemptRecord>> {
    let cutoff = since.map(to_db_timestamp).unwrap_or_default();
    let mut stmt = conn.prepare(&format!(
        "{} WHERE attempted_at > ?1 ORDER BY attempted_at DESC, id DESC LIMIT ?2",
        SELECT_ATTEMPTS
    ))?;
    let rows = stmt.query_map(params![cutoff, ATTEMPT_QUERY_LIMIT as i64], row_to_attempt)?;
    rows.collect()
}

/// Attempts made on a UTC calendar day, oldest first.
pub fn get_attempts_by_date(conn: &Connection, date: NaiveDate) -> Result<Vec<AttemptRecord>> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE substr(attempted_at, 1, 10) = ?1 ORDER BY attempted_at, id",
        SELECT_ATTEMPTS
    ))?;
    let rows = stmt.query_map(params![date.format("%Y-%m-%d").to_string()], row_to_attempt)?;
    rows.collect()
}

/// Delete attempts older than `retention_days`, returning how many went.
pub fn prune_attempts(conn: &Connection, retention_days: i64, now: DateTime<Utc>) -> Result<usize> {
    #[cfg(feature = "profiling")]
    crate::profile_log!(EventType::DbQuery {
        operation: "delete".into(),
        table: "attempts".into(),
    });

    // A retention period reaching past the calendar keeps everything
    let Some(cutoff) = Duration::try_days(retention_days).and_then(|d| now.checked_sub_signed(d)) else {
        return Ok(0);
    };
    let cutoff = to_db_timestamp(cutoff);
    let removed = conn.execute("DELETE FROM attempts WHERE attempted_at < ?1", params![cutoff])?;
    if removed > 0 {
        tracing::info!("Pruned {} attempts older than {} days", removed, retention_days);
    }
    Ok(removed)
}

fn row_to_attempt(row: &rusqlite::Row) -> Result<AttemptRecord> {
    let method_str: String = row.get(3)?;
    let attempted_at_str: String = row.get(6)?;

    Ok(AttemptRecord {
        id: row.get(0)?,
        fact: row.get(1)?,
        correct: row.get(2)?,
        input_method: InputMethod::from_str(&method_str).unwrap_or(InputMethod::MultipleChoice),
        response_time_ms: row.get(4)?,
        hint_shown: row.get(5)?,
        attempted_at: from_db_timestamp(&attempted_at_str, 6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestEnv;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn log(env: &TestEnv, key: &str, correct: bool, when: &str) {
        let attempt = Attempt::new(correct, InputMethod::NumberPad, 2100, at(when));
        insert_attempt(&env.conn, Fact::parse(key).unwrap(), &attempt, false).unwrap();
    }

    #[test]
    fn test_insert_and_read_back() {
        let env = TestEnv::new().unwrap();
        let attempt = Attempt::new(false, InputMethod::MultipleChoice, 3400, at("2024-06-01T08:30:00Z"));
        let id = insert_attempt(&env.conn, Fact::new(7, 6).unwrap(), &attempt, true).unwrap();

        let records = get_fact_attempts(&env.conn, Fact::new(7, 6).unwrap()).unwrap();
        assert_eq!(
            records,
            vec![AttemptRecord {
                id,
                fact: "7x6".into(),
                correct: false,
                input_method: InputMethod::MultipleChoice,
                response_time_ms: 3400,
                hint_shown: true,
                attempted_at: at("2024-06-01T08:30:00Z"),
            }]
        );
        assert!(get_fact_attempts(&env.conn, Fact::new(6, 7).unwrap()).unwrap().is_empty());
    }

    #[test]
    fn test_attempts_since_newest_first() {
        let env = TestEnv::new().unwrap();
        log(&env, "2x2", true, "2024-06-01T08:00:00Z");
        log(&env, "2x3", true, "2024-06-02T08:00:00Z");
        log(&env, "2x4", false, "2024-06-03T08:00:00Z");

        let all = get_attempts_since(&env.conn, None).unwrap();
        let facts: Vec<_> = all.iter().map(|r| r.fact.as_str()).collect();
        assert_eq!(facts, vec!["2x4", "2x3", "2x2"]);

        let recent = get_attempts_since(&env.conn, Some(at("2024-06-02T08:00:00Z"))).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].fact, "2x4");
    }

    #[test]
    fn test_attempts_by_date() {
        let env = TestEnv::new().unwrap();
        log(&env, "3x3", true, "2024-06-01T23:59:00Z");
        log(&env, "3x4", true, "2024-06-02T00:01:00Z");

        let day = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();
        let records = get_attempts_by_date(&env.conn, day).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].fact, "3x4");
    }

    #[test]
    fn test_prune_old_attempts() {
        let env = TestEnv::new().unwrap();
        let now = at("2024-07-01T12:00:00Z");
        log(&env, "5x5", true, "2024-05-01T12:00:00Z");
        log(&env, "5x6", true, "2024-06-15T12:00:00Z");

        assert_eq!(prune_attempts(&env.conn, 30, now).unwrap(), 1);
        let left = get_attempts_since(&env.conn, None).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].fact, "5x6");
    }

    #[test]
    fn test_corrupt_timestamp_is_an_error() {
        let env = TestEnv::new().unwrap();
        env.conn
            .execute(
                "INSERT INTO attempts (fact, correct, input_method, response_time_ms, hint_shown, attempted_at)
                 VALUES ('3x3', 1, 'number_pad', 1500, 0, 'not a time')",
                [],
            )
            .unwrap();

        let err = get_fact_attempts(&env.conn, Fact::parse("3x3").unwrap()).unwrap_err();
        assert!(matches!(err, rusqlite::Error::FromSqlConversionFailure(6, _, _)));
    }

    #[test]
    fn test_prune_with_huge_retention_keeps_everything() {
        let env = TestEnv::new().unwrap();
        log(&env, "5x5", true, "2024-05-01T12:00:00Z");
        assert_eq!(prune_attempts(&env.conn, i64::MAX, at("2024-07-01T12:00:00Z")).unwrap(), 0);
        assert_eq!(prune_attempts(&env.conn, 1_000_000_000, at("2024-07-01T12:00:00Z")).unwrap(), 0);
        assert_eq!(get_attempts_since(&env.conn, None).unwrap().len(), 1);
    }
}
