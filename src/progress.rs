//! Learner progress: the single owned fact map and the attempt recorder.
//!
//! `Progress` is the one writable copy of a learner's state. The UI layer
//! owns it and passes it to the scheduler; snapshots for persistence are
//! taken from it after each attempt.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

use crate::config::ConfidenceThresholds;
use crate::domain::{generate_all_facts, Attempt, Confidence, Fact, FactState, InputMethod, FACT_COUNT};
use crate::error::Result;
use crate::srs::{classifier, mastery};

/// Facts per reveal tier in the progress summary.
pub const FACTS_PER_TIER: usize = 36;
pub const MAX_TIER: usize = 4;

/// Milestones handed to the reward collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MasteryEvent {
  /// A fact reached `mastered` from a lower level
  FactMastered { fact: String },
  /// Every fact touching `table` is now mastered
  TableMastered { table: u8 },
}

/// Result of recording one answer.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptOutcome {
  pub fact: Fact,
  pub previous: Confidence,
  pub confidence: Confidence,
  pub events: Vec<MasteryEvent>,
}

impl AttemptOutcome {
  pub fn confidence_changed(&self) -> bool {
    self.previous != self.confidence
  }

  pub fn newly_mastered_tables(&self) -> impl Iterator<Item = u8> + '_ {
    self.events.iter().filter_map(|e| match e {
      MasteryEvent::TableMastered { table } => Some(*table),
      _ => None,
    })
  }
}

/// Counts for progress displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressSummary {
  pub new: usize,
  pub learning: usize,
  pub confident: usize,
  pub mastered: usize,
  pub mastered_tables: Vec<u8>,
  /// 0..=4, one step per 36 confident-or-better facts
  pub tier: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
  facts: Vec<FactState>,
  thresholds: ConfidenceThresholds,
}

impl Default for Progress {
  fn default() -> Self {
    Self::new(ConfidenceThresholds::default())
  }
}

impl Progress {
  /// Fresh profile: all 144 facts at `new`.
  pub fn new(thresholds: ConfidenceThresholds) -> Self {
    Self {
      facts: generate_all_facts(thresholds.recent_attempts_window),
      thresholds,
    }
  }

  /// Build from loaded states. Facts missing from `states` start fresh,
  /// later duplicates replace earlier ones, and every confidence is
  /// recomputed.
  pub fn from_states(states: impl IntoIterator<Item = FactState>, thresholds: ConfidenceThresholds) -> Self {
    let mut progress = Self::new(thresholds);
    for mut state in states {
      classifier::reclassify(&mut state, &progress.thresholds);
      let idx = state.fact.index();
      progress.facts[idx] = state;
    }
    progress
  }

  /// Recreate the full registry at `new`.
  pub fn reset(&mut self) {
    tracing::info!("Resetting progress for all {} facts", FACT_COUNT);
    self.facts = generate_all_facts(self.thresholds.recent_attempts_window);
  }

  pub fn facts(&self) -> &[FactState] {
    &self.facts
  }

  pub fn thresholds(&self) -> &ConfidenceThresholds {
    &self.thresholds
  }

  pub fn get(&self, fact: Fact) -> &FactState {
    &self.facts[fact.index()]
  }

  pub fn get_by_key(&self, key: &str) -> Result<&FactState> {
    let fact = Fact::parse(key)?;
    Ok(self.get(fact))
  }

  /// Record an answer given now.
  pub fn record_attempt(
    &mut self,
    key: &str,
    correct: bool,
    input_method: InputMethod,
    response_time_ms: u32,
  ) -> Result<AttemptOutcome> {
    self.record_attempt_at(key, correct, input_method, response_time_ms, Utc::now())
  }

  /// Record an answer: append it to the fact's window, update counters,
  /// reclassify, and report any mastery milestones it crossed.
  pub fn record_attempt_at(
    &mut self,
    key: &str,
    correct: bool,
    input_method: InputMethod,
    response_time_ms: u32,
    now: DateTime<Utc>,
  ) -> Result<AttemptOutcome> {
    let fact = Fact::parse(key).map_err(|e| {
      tracing::warn!("Attempt recorded for unknown fact '{}'", key);
      e
    })?;

    let tables = fact.tables();
    let mastered_before: Vec<bool> = tables
      .iter()
      .map(|&t| mastery::is_table_mastered(&self.facts, t))
      .collect();

    let state = &mut self.facts[fact.index()];
    state.push_attempt(Attempt::new(correct, input_method, response_time_ms, now));
    let previous = classifier::reclassify(state, &self.thresholds);
    let confidence = state.confidence();

    let mut events = Vec::new();
    if confidence == Confidence::Mastered && previous != Confidence::Mastered {
      events.push(MasteryEvent::FactMastered { fact: fact.key() });
    }

    for (&table, was_mastered) in tables.iter().zip(mastered_before) {
      if !was_mastered && mastery::is_table_mastered(&self.facts, table) {
        tracing::info!("Table {} mastered", table);
        events.push(MasteryEvent::TableMastered { table });
      }
    }

    #[cfg(feature = "profiling")]
    crate::profile_log!(crate::profiling::EventType::AttemptRecorded {
      fact: fact.key(),
      correct,
      input_method: input_method.as_str().into(),
      response_time_ms,
      previous: previous.as_str().into(),
      confidence: confidence.as_str().into(),
    });

    Ok(AttemptOutcome {
      fact,
      previous,
      confidence,
      events,
    })
  }

  pub fn set_preferred_strategy(&mut self, key: &str, strategy: Option<String>) -> Result<()> {
    let fact = Fact::parse(key)?;
    self.facts[fact.index()].preferred_strategy = strategy;
    Ok(())
  }

  pub fn mastered_tables(&self) -> BTreeSet<u8> {
    mastery::mastered_tables(&self.facts)
  }

  pub fn facts_by_confidence(&self, confidence: Confidence) -> Vec<&FactState> {
    self.facts.iter().filter(|s| s.confidence() == confidence).collect()
  }

  pub fn summary(&self) -> ProgressSummary {
    let count = |c| self.facts.iter().filter(|s| s.confidence() == c).count();
    let confident = count(Confidence::Confident);
    let mastered = count(Confidence::Mastered);

    ProgressSummary {
      new: count(Confidence::New),
      learning: count(Confidence::Learning),
      confident,
      mastered,
      mastered_tables: self.mastered_tables().into_iter().collect(),
      tier: ((confident + mastered) / FACTS_PER_TIER).min(MAX_TIER),
    }
  }
}
