//! Practice statistics derived from the attempt log

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::{params, Connection, Result};
use serde::Serialize;
use std::collections::BTreeSet;

use crate::db::to_db_timestamp;
#[cfg(feature = "profiling")]
use crate::profiling::EventType;

/// Longest streak looked for, in days.
pub const MAX_STREAK_DAYS: i64 = 365;

/// One UTC day of practice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub attempt_count: u32,
    pub correct_count: u32,
    /// Distinct facts answered that day
    pub facts_attempted: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TodayStats {
    pub attempts: u32,
    pub correct: u32,
    /// Whole percent, 0 when nothing was answered
    pub accuracy: u32,
}

impl TodayStats {
    fn new(attempts: u32, correct: u32) -> Self {
        let accuracy = if attempts > 0 {
            (correct as f64 / attempts as f64 * 100.0).round() as u32
        } else {
            0
        };
        Self {
            attempts,
            correct,
            accuracy,
        }
    }
}

/// Per-day summaries for the last `days` days, newest first.
pub fn get_daily_summaries(conn: &Connection, days: i64, now: DateTime<Utc>) -> Result<Vec<DailySummary>> {
    #[cfg(feature = "profiling")]
    crate::profile_log!(EventType::DbQuery {
        operation: "select".into(),
        table: "attempts".into(),
    });

    let cutoff = to_db_timestamp(now - Duration::days(days));
    let mut stmt = conn.prepare(
        r#"
    SELECT substr(attempted_at, 1, 10) AS day,
           COUNT(*),
           SUM(correct),
           COUNT(DISTINCT fact)
    FROM attempts
    WHERE attempted_at >= ?1
    GROUP BY day
    ORDER BY day DESC
    "#,
    )?;

    let rows = stmt.query_map(params![cutoff], |row| {
        let day: String = row.get(0)?;
        let date = NaiveDate::parse_from_str(&day, "%Y-%m-%d").map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;
        Ok(DailySummary {
            date,
            attempt_count: row.get(1)?,
            correct_count: row.get(2)?,
            facts_attempted: row.get(3)?,
        })
    })?;
    rows.collect()
}

/// Consecutive days with practice ending today. A day off today does not
/// break a streak that ran through yesterday.
pub fn get_streak_days(conn: &Connection, now: DateTime<Utc>) -> Result<u32> {
    let practiced: BTreeSet<NaiveDate> = get_daily_summaries(conn, MAX_STREAK_DAYS, now)?
        .into_iter()
        .map(|s| s.date)
        .collect();

    let today = now.date_naive();
    let mut streak = 0;
    for offset in 0..MAX_STREAK_DAYS {
        let day = today - Duration::days(offset);
        if practiced.contains(&day) {
            streak += 1;
        } else if offset > 0 {
            break;
        }
    }
    Ok(streak)
}

pub fn get_today_stats(conn: &Connection, now: DateTime<Utc>) -> Result<TodayStats> {
    let today = now.date_naive().format("%Y-%m-%d").to_string();
    let (attempts, correct): (u32, Option<u32>) = conn.query_row(
        "SELECT COUNT(*), SUM(correct) FROM attempts WHERE substr(attempted_at, 1, 10) = ?1",
        params![today],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(TodayStats::new(attempts, correct.unwrap_or(0)))
}
