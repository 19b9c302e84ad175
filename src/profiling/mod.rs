//! Compile-time conditional profiling system.
//!
//! When the `profiling` feature is enabled, this module provides JSONL-based
//! event logging under the data directory's `profiles/` folder. When
//! disabled, all functions are no-ops with zero runtime cost.
//!
//! # Usage
//!
//! ```ignore
//! use times_tutor::profile_log;
//! use times_tutor::profiling::EventType;
//!
//! profile_log!(EventType::SnapshotLoad { entries: 144, skipped: 0 });
//! ```

#[cfg(feature = "profiling")]
mod event;
#[cfg(feature = "profiling")]
mod logger;

#[cfg(feature = "profiling")]
pub use event::*;
#[cfg(feature = "profiling")]
pub use logger::*;

#[cfg(not(feature = "profiling"))]
mod noop;
#[cfg(not(feature = "profiling"))]
pub use noop::*;

// Macros are defined here to be available at crate root

/// Log a profiling event.
///
/// When the `profiling` feature is disabled, this macro expands to nothing.
#[cfg(feature = "profiling")]
#[macro_export]
macro_rules! profile_log {
    ($event_type:expr) => {
        $crate::profiling::log_event($event_type)
    };
    ($event_type:expr, $meta:expr) => {
        $crate::profiling::log_event_with_meta($event_type, $meta)
    };
}

#[cfg(not(feature = "profiling"))]
#[macro_export]
macro_rules! profile_log {
    ($($args:tt)*) => {};
}

/// Execute a block and log its duration.
///
/// When the `profiling` feature is disabled, this macro just executes the block.
///
/// ```ignore
/// let report = profile_scope!("load_progress", {
///     db::load_progress(&conn, &config.thresholds)
/// });
/// ```
#[cfg(feature = "profiling")]
#[macro_export]
macro_rules! profile_scope {
    ($name:expr, $body:block) => {{
        let _start = std::time::Instant::now();
        let result = $body;
        $crate::profiling::log_timed($name, _start.elapsed());
        result
    }};
}

#[cfg(not(feature = "profiling"))]
#[macro_export]
macro_rules! profile_scope {
    ($name:expr, $body:block) => {
        $body
    };
}
