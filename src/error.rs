use thiserror::Error;

#[derive(Error, Debug)]
pub enum TutorError {
  /// A fact key outside the canonical 1-12 × 1-12 grid. Always a caller bug.
  #[error("Unknown fact: {0}")]
  UnknownFact(String),

  /// A persisted entry that could not be coerced into a fact state.
  #[error("Invalid snapshot entry '{fact}': {reason}")]
  InvalidSnapshot { fact: String, reason: String },

  #[error("Database error: {0}")]
  Database(#[from] rusqlite::Error),

  #[error("Database unavailable")]
  DbLock,

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("Configuration error: {0}")]
  Config(String),

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TutorError>;
