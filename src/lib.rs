pub mod config;
pub mod content;
pub mod db;
pub mod domain;
pub mod error;
pub mod paths;
pub mod profiling;
pub mod progress;
pub mod session;
pub mod snapshot;
pub mod srs;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{Result, TutorError};
pub use progress::{AttemptOutcome, MasteryEvent, Progress, ProgressSummary};
