//! Event types for profiling.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A profiling event with timestamp and optional duration.
#[derive(Serialize)]
pub struct ProfileEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    /// Duration in microseconds (for timed events)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_us: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl ProfileEvent {
    pub fn new(event_type: EventType) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            duration_us: None,
            metadata: None,
        }
    }

    pub fn with_duration(event_type: EventType, duration: std::time::Duration) -> Self {
        Self {
            duration_us: Some(duration.as_micros() as u64),
            ..Self::new(event_type)
        }
    }

    pub fn with_metadata(event_type: EventType, metadata: serde_json::Value) -> Self {
        Self {
            metadata: Some(metadata),
            ..Self::new(event_type)
        }
    }
}

/// Types of events that can be logged.
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventType {
    // === Session lifecycle ===
    SessionStart {
        session_id: String,
    },
    SessionEnd {
        total_events: u64,
    },

    // === Database operations ===
    DbQuery {
        /// select, insert, upsert, delete
        operation: String,
        table: String,
    },

    // === Scheduling ===
    /// Next-fact selection ran
    FactSelection {
        /// Facts scored after focus and recency filtering
        candidates: usize,
        focus_tables: Vec<u8>,
        picked: Option<String>,
        duration_us: u64,
    },

    // === Recording ===
    AttemptRecorded {
        fact: String,
        correct: bool,
        input_method: String,
        response_time_ms: u32,
        previous: String,
        confidence: String,
    },

    // === Persistence ===
    SnapshotLoad {
        entries: usize,
        skipped: usize,
    },
    SyncFlush {
        facts: usize,
        ok: bool,
    },

    /// A timed code block completed
    TimedScope {
        name: String,
    },
}
