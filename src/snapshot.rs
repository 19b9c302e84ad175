//! Load and export boundary for persisted fact state.
//!
//! Snapshots are JSON objects, one per fact. Older snapshots stored the
//! attempt history as a plain list of booleans; those are normalised into
//! full attempts here so the rest of the crate only ever sees one shape.
//! A persisted `confidence` is read but never trusted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::config::ConfidenceThresholds;
use crate::domain::{Attempt, AttemptWindow, Confidence, Fact, FactState, InputMethod};
use crate::error::{Result, TutorError};
use crate::progress::Progress;

/// Response time given to attempts decoded from the boolean history shape.
pub const LEGACY_RESPONSE_TIME_MS: u32 = 10_000;

/// One entry of the attempt history as found on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredAttempt {
  Recorded(Attempt),
  /// Correctness only, from before method and timing were tracked
  Legacy(bool),
}

impl StoredAttempt {
  /// Normalise to a full attempt. Legacy entries count as multiple choice.
  pub fn into_attempt(self, loaded_at: DateTime<Utc>) -> Attempt {
    match self {
      Self::Recorded(attempt) => attempt,
      Self::Legacy(correct) => Attempt::new(
        correct,
        InputMethod::MultipleChoice,
        LEGACY_RESPONSE_TIME_MS,
        loaded_at,
      ),
    }
  }
}

/// Exported per-fact record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedFact {
  pub fact: String,
  #[serde(default, deserialize_with = "lenient_confidence")]
  pub confidence: Option<Confidence>,
  #[serde(default)]
  pub correct_count: u32,
  #[serde(default)]
  pub incorrect_count: u32,
  #[serde(default, with = "crate::domain::timestamp::option_epoch_millis")]
  pub last_seen: Option<DateTime<Utc>>,
  #[serde(default, with = "crate::domain::timestamp::option_epoch_millis")]
  pub last_correct: Option<DateTime<Utc>>,
  #[serde(default)]
  pub recent_attempts: Vec<StoredAttempt>,
  #[serde(default)]
  pub preferred_strategy: Option<String>,
}

impl PersistedFact {
  /// Decode into a fact state. Confidence is left at `new`; callers
  /// reclassify.
  pub fn into_state(self, window: usize, loaded_at: DateTime<Utc>) -> Result<FactState> {
    let fact = Fact::parse(&self.fact).map_err(|_| TutorError::InvalidSnapshot {
      fact: self.fact.clone(),
      reason: "not a fact in the 1-12 grid".into(),
    })?;

    let mut state = FactState::new(fact, window);
    state.correct_count = self.correct_count;
    state.incorrect_count = self.incorrect_count;
    state.last_seen = self.last_seen;
    state.last_correct = self.last_correct;
    state.preferred_strategy = self.preferred_strategy;
    state.recent_attempts = AttemptWindow::from_attempts(
      self
        .recent_attempts
        .into_iter()
        .map(|a| a.into_attempt(loaded_at)),
      window,
    );
    Ok(state)
  }
}

/// Outcome of a snapshot load. Entries that could not be decoded are
/// listed in `skipped`; their facts start fresh.
#[derive(Debug)]
pub struct LoadReport {
  pub progress: Progress,
  pub skipped: Vec<TutorError>,
}

/// Export one fact.
pub fn to_persisted(state: &FactState) -> PersistedFact {
  PersistedFact {
    fact: state.fact.key(),
    confidence: Some(state.confidence()),
    correct_count: state.correct_count,
    incorrect_count: state.incorrect_count,
    last_seen: state.last_seen,
    last_correct: state.last_correct,
    recent_attempts: state
      .recent_attempts()
      .iter()
      .cloned()
      .map(StoredAttempt::Recorded)
      .collect(),
    preferred_strategy: state.preferred_strategy.clone(),
  }
}

/// Export every fact, in registry order.
pub fn export(progress: &Progress) -> Vec<PersistedFact> {
  progress.facts().iter().map(to_persisted).collect()
}

fn entry_label(entry: &Value) -> String {
  match entry.get("fact") {
    Some(Value::String(key)) => key.clone(),
    Some(other) => other.to_string(),
    None => "<missing>".into(),
  }
}

/// Decode a snapshot. Each entry is handled on its own: a malformed entry
/// is reported and skipped, facts with no entry start at `new`, and a
/// later entry for the same fact replaces an earlier one.
pub fn load_facts(entries: &[Value], thresholds: &ConfidenceThresholds, now: DateTime<Utc>) -> LoadReport {
  let window = thresholds.recent_attempts_window;
  let mut states = Vec::with_capacity(entries.len());
  let mut skipped = Vec::new();

  for entry in entries {
    let decoded = PersistedFact::deserialize(entry)
      .map_err(|e| TutorError::InvalidSnapshot {
        fact: entry_label(entry),
        reason: e.to_string(),
      })
      .and_then(|persisted| persisted.into_state(window, now));

    match decoded {
      Ok(state) => states.push(state),
      Err(e) => {
        tracing::warn!("Skipping snapshot entry: {}", e);
        skipped.push(e);
      }
    }
  }

  #[cfg(feature = "profiling")]
  crate::profile_log!(crate::profiling::EventType::SnapshotLoad {
    entries: entries.len(),
    skipped: skipped.len(),
  });

  tracing::debug!(
    "Loaded {} snapshot entries ({} skipped)",
    states.len(),
    skipped.len()
  );

  LoadReport {
    progress: Progress::from_states(states, thresholds.clone()),
    skipped,
  }
}

/// Decode a snapshot document. The top level must be a JSON array.
pub fn load_facts_from_json(
  json: &str,
  thresholds: &ConfidenceThresholds,
  now: DateTime<Utc>,
) -> Result<LoadReport> {
  let entries: Vec<Value> = serde_json::from_str(json)?;
  Ok(load_facts(&entries, thresholds, now))
}

pub fn to_json(progress: &Progress) -> Result<String> {
  Ok(serde_json::to_string_pretty(&export(progress))?)
}

/// Read a snapshot file. A missing file is an `Io` error, never an empty
/// profile, so a mistyped import path cannot replace stored progress.
pub fn read_file(path: &Path, thresholds: &ConfidenceThresholds) -> Result<LoadReport> {
  let contents = std::fs::read_to_string(path)?;
  load_facts_from_json(&contents, thresholds, Utc::now())
}

pub fn write_file(path: &Path, progress: &Progress) -> Result<()> {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent)?;
  }
  std::fs::write(path, to_json(progress)?)?;
  tracing::info!("Wrote snapshot to {}", path.display());
  Ok(())
}

/// Unknown or mistyped confidence labels decode as `None`.
fn lenient_confidence<'de, D>(deserializer: D) -> std::result::Result<Option<Confidence>, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Option::<Value>::deserialize(deserializer)?;
  Ok(value.as_ref().and_then(Value::as_str).and_then(Confidence::from_str))
}
