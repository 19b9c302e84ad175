//! Key/value settings: session goal and focus tables

use rusqlite::{params, Connection, Result};

use crate::db::LogOnError;
use crate::session::FocusTables;
#[cfg(feature = "profiling")]
use crate::profiling::EventType;

const SESSION_GOAL: &str = "session_goal";
const FOCUS_TABLES: &str = "focus_tables";

pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    #[cfg(feature = "profiling")]
    crate::profile_log!(EventType::DbQuery {
        operation: "select".into(),
        table: "settings".into(),
    });

    let mut stmt = conn.prepare("SELECT value FROM settings WHERE key = ?1")?;
    let mut rows = stmt.query(params![key])?;
    if let Some(row) = rows.next()? {
        Ok(Some(row.get(0)?))
    } else {
        Ok(None)
    }
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
        params![key, value],
    )?;
    Ok(())
}

/// Stored goal, unclamped. `None` if missing or unparsable.
pub fn get_session_goal(conn: &Connection) -> Result<Option<u32>> {
    Ok(get_setting(conn, SESSION_GOAL)?.and_then(|v| v.parse().ok()))
}

pub fn set_session_goal(conn: &Connection, goal: u32) -> Result<()> {
    set_setting(conn, SESSION_GOAL, &goal.to_string())
}

/// Saved focus tables; a corrupt value falls back to no filter.
pub fn get_focus_tables(conn: &Connection) -> Result<FocusTables> {
    Ok(get_setting(conn, FOCUS_TABLES)?
        .and_then(|json| {
            serde_json::from_str::<FocusTables>(&json).log_warn("Could not parse stored focus tables")
        })
        .unwrap_or_default())
}

pub fn set_focus_tables(conn: &Connection, focus: &FocusTables) -> Result<()> {
    let json = serde_json::to_string(focus)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    set_setting(conn, FOCUS_TABLES, &json)
}
