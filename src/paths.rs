//! Project path functions - single source of truth for all file paths.
//!
//! ## Environment Variables
//!
//! - `DATA_DIR`: Override the base data directory (default: "data")
//!
//! This allows keeping several learners' progress side by side:
//! ```bash
//! DATA_DIR=data/maya times-tutor
//! DATA_DIR=data/leo times-tutor
//! ```

use std::env;
use std::sync::OnceLock;

/// Lazily initialized data directory from DATA_DIR env var
static DATA_DIR_VALUE: OnceLock<String> = OnceLock::new();

/// Get the base data directory (from DATA_DIR env var or default "data")
pub fn data_dir() -> &'static str {
    DATA_DIR_VALUE.get_or_init(|| env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()))
}

/// SQLite database holding fact progress and the attempt log
pub fn db_path() -> String {
    format!("{}/progress.db", data_dir())
}

/// JSON snapshot export location
pub fn snapshot_path() -> String {
    format!("{}/progress.json", data_dir())
}

/// Database copies taken before an import replaces stored progress
pub fn backup_dir() -> String {
    format!("{}/backups", data_dir())
}

/// Directory for profiling output
pub fn profile_dir() -> String {
    format!("{}/profiles", data_dir())
}

#[cfg(test)]
mod tests {
    use super::*;

    // OnceLock initializes once, so only the default layout is checked here.

    #[test]
    fn test_data_dir_default() {
        assert!(!data_dir().is_empty());
    }

    #[test]
    fn test_db_path_format() {
        assert!(db_path().ends_with("/progress.db"));
    }

    #[test]
    fn test_snapshot_path_format() {
        assert!(snapshot_path().ends_with("/progress.json"));
    }

    #[test]
    fn test_backup_dir_under_data_dir() {
        assert!(backup_dir().starts_with(data_dir()));
    }

    #[test]
    fn test_profile_dir_under_data_dir() {
        assert!(profile_dir().starts_with(data_dir()));
    }
}
