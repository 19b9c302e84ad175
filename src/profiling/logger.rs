//! JSONL file logger for profiling events.

use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;

use super::event::{EventType, ProfileEvent};
use crate::paths;

/// Global logger instance - must be initialized via init().
static LOGGER: Mutex<Option<ProfileLogger>> = Mutex::new(None);

/// Event counter for session statistics.
static EVENT_COUNT: AtomicU64 = AtomicU64::new(0);

/// Writes events to a JSONL file.
pub struct ProfileLogger {
    writer: BufWriter<File>,
    session_id: String,
}

impl ProfileLogger {
    /// Create a new logger with a timestamped filename under `dir`.
    fn new(dir: &Path) -> std::io::Result<Self> {
        let session_id = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        create_dir_all(dir)?;

        let filename = dir.join(format!("profile_{}.jsonl", session_id));
        let file = OpenOptions::new().create(true).append(true).open(&filename)?;

        tracing::info!("Profiling enabled: writing to {}", filename.display());

        Ok(Self {
            writer: BufWriter::new(file),
            session_id,
        })
    }

    fn log(&mut self, event: ProfileEvent) {
        if let Ok(json) = serde_json::to_string(&event) {
            let _ = writeln!(self.writer, "{}", json);
            // Flush periodically for durability (every 100 events)
            if EVENT_COUNT.load(Ordering::Relaxed) % 100 == 0 {
                let _ = self.writer.flush();
            }
            tracing::trace!(target: "profile", "{}", json);
        }
        EVENT_COUNT.fetch_add(1, Ordering::Relaxed);
    }

    fn flush(&mut self) {
        let _ = self.writer.flush();
    }
}

/// Initialize the profiler. Call this from main() before any logging.
pub fn init() {
    init_in(Path::new(&paths::profile_dir()));
}

/// Initialize the profiler writing into `dir`.
pub fn init_in(dir: &Path) {
    let Ok(mut guard) = LOGGER.lock() else {
        return;
    };
    if guard.is_some() {
        tracing::warn!("Profiler already initialized");
        return;
    }

    match ProfileLogger::new(dir) {
        Ok(logger) => {
            let session_id = logger.session_id.clone();
            *guard = Some(logger);

            drop(guard); // Release lock before logging
            log_event(EventType::SessionStart { session_id });
        }
        Err(e) => {
            tracing::error!("Failed to initialize profiler: {}", e);
        }
    }
}

/// Shutdown the profiler and flush remaining events.
pub fn shutdown() {
    let total_events = EVENT_COUNT.load(Ordering::Relaxed);
    log_event(EventType::SessionEnd { total_events });

    if let Ok(mut guard) = LOGGER.lock() {
        if let Some(ref mut logger) = *guard {
            logger.flush();
            tracing::info!("Profiling session ended: {} events logged", total_events);
        }
        *guard = None;
    }
}

fn write(event: ProfileEvent) {
    if let Ok(mut guard) = LOGGER.lock() {
        if let Some(ref mut logger) = *guard {
            logger.log(event);
        }
    }
}

pub fn log_event(event_type: EventType) {
    write(ProfileEvent::new(event_type));
}

pub fn log_event_with_meta(event_type: EventType, metadata: serde_json::Value) {
    write(ProfileEvent::with_metadata(event_type, metadata));
}

/// Log a timed scope completion.
pub fn log_timed(name: &str, duration: Duration) {
    write(ProfileEvent::with_duration(
        EventType::TimedScope {
            name: name.to_string(),
        },
        duration,
    ));
}
