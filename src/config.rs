//! Tutor configuration.
//!
//! Every threshold the engine uses lives here with its default value. A
//! `config.toml` can override any subset of them; missing keys keep their
//! defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, TutorError};

// ==================== Confidence Thresholds ====================

/// Classification thresholds applied to the recent attempt window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceThresholds {
    /// Average correct number-pad time for mastered (fluent recall)
    pub mastered_max_time_ms: f64,
    /// Average correct number-pad time for confident
    pub confident_max_time_ms: f64,
    pub mastered_min_accuracy: f64,
    pub confident_min_accuracy: f64,
    /// Correct number-pad answers in the window required for mastered
    pub mastered_min_correct: usize,
    /// Correct number-pad answers in the window required for confident
    pub confident_min_correct: usize,
    /// Lifetime correct answers before a learning fact switches to free entry
    pub mc_correct_to_advance: u32,
    /// Attempts kept per fact
    pub recent_attempts_window: usize,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            mastered_max_time_ms: 5000.0,
            confident_max_time_ms: 10000.0,
            mastered_min_accuracy: 0.9,
            confident_min_accuracy: 0.7,
            mastered_min_correct: 5,
            confident_min_correct: 3,
            mc_correct_to_advance: 2,
            recent_attempts_window: crate::domain::DEFAULT_ATTEMPT_WINDOW,
        }
    }
}

// ==================== Scheduler Configuration ====================

/// Base priority per confidence level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseScores {
    pub new: f64,
    pub learning: f64,
    pub confident: f64,
    pub mastered: f64,
}

impl Default for BaseScores {
    fn default() -> Self {
        Self {
            new: 50.0,
            learning: 100.0,
            confident: 30.0,
            mastered: 10.0,
        }
    }
}

/// Hand-ranked difficulty of unseen facts; lower surfaces first.
///
/// Rules are checked top to bottom and the first match wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyRanks {
    pub ones: u8,
    pub tens: u8,
    pub twos_and_fives: u8,
    pub squares: u8,
    pub nines: u8,
    /// Either factor 3 or 4
    pub small_factors: u8,
    /// Everything else (6s, 7s, 8s, 11s, 12s)
    pub hardest: u8,
}

impl Default for DifficultyRanks {
    fn default() -> Self {
        Self {
            ones: 0,
            tens: 1,
            twos_and_fives: 2,
            squares: 3,
            nines: 4,
            small_factors: 5,
            hardest: 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub base_scores: BaseScores,
    /// Multiplier on the lifetime error rate
    pub trouble_spot_weight: f64,
    /// Bonus for mastered facts that are due for review
    pub review_bonus: f64,
    pub review_interval_days: i64,
    /// Penalty for facts seen within `recency_window_minutes`
    pub recency_penalty: f64,
    pub recency_window_minutes: i64,
    /// Score removed per difficulty rank for new facts
    pub difficulty_weight: f64,
    pub difficulty: DifficultyRanks,
    /// Most recent shown facts excluded from selection
    pub recent_exclusion: usize,
    /// Candidates kept after sorting by score
    pub top_candidates: usize,
    /// Leading candidates the random pick is drawn from
    pub pick_from: usize,
    /// Capacity of the recently-shown history
    pub recent_history: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            base_scores: BaseScores::default(),
            trouble_spot_weight: 50.0,
            review_bonus: 40.0,
            review_interval_days: 3,
            recency_penalty: 30.0,
            recency_window_minutes: 60,
            difficulty_weight: 5.0,
            difficulty: DifficultyRanks::default(),
            recent_exclusion: 3,
            top_candidates: 5,
            pick_from: 3,
            recent_history: 10,
        }
    }
}

// ==================== Session Configuration ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub default_goal: u32,
    pub min_goal: u32,
    pub max_goal: u32,
    /// Choices shown in multiple-choice mode, correct answer included
    pub choice_count: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_goal: 5,
            min_goal: 3,
            max_goal: 20,
            choice_count: 4,
        }
    }
}

// ==================== Sync Configuration ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Quiet period after the last attempt before snapshots are flushed
    pub debounce_ms: i64,
    /// Attempt log entries older than this are pruned
    pub attempt_retention_days: i64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 2000,
            attempt_retention_days: 30,
        }
    }
}

// ==================== Database Configuration ====================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<String>,
}

/// Configuration file structure for config.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TutorConfig {
    pub thresholds: ConfidenceThresholds,
    pub scheduler: SchedulerConfig,
    pub session: SessionConfig,
    pub sync: SyncConfig,
    pub database: DatabaseConfig,
}

impl TutorConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| TutorError::Config(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}

/// Config file location: `TUTOR_CONFIG` env var, else `config.toml`.
pub fn config_path() -> PathBuf {
    std::env::var("TUTOR_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"))
}

/// Load configuration, falling back to defaults when the file is missing
/// or unreadable.
pub fn load_config() -> TutorConfig {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let path = config_path();
    if !path.exists() {
        tracing::debug!("No config file at {}, using defaults", path.display());
        return TutorConfig::default();
    }

    match TutorConfig::from_file(&path) {
        Ok(config) => {
            tracing::info!("Loaded configuration from {}", path.display());
            config
        }
        Err(e) => {
            tracing::warn!("Ignoring {}: {}", path.display(), e);
            TutorConfig::default()
        }
    }
}

/// Resolve the database path with priority: config.toml > DATABASE_PATH env > default
pub fn database_path(config: &TutorConfig) -> PathBuf {
    // Priority 1: config.toml
    if let Some(path) = &config.database.path {
        tracing::info!("Using database from config.toml: {}", path);
        return PathBuf::from(path);
    }

    // Priority 2: .env DATABASE_PATH
    if let Ok(path) = std::env::var("DATABASE_PATH") {
        tracing::info!("Using database from DATABASE_PATH env: {}", path);
        return PathBuf::from(path);
    }

    let default = PathBuf::from(crate::paths::db_path());
    tracing::info!("Using default database path: {}", default.display());
    default
}
