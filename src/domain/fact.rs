use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::attempt::{Attempt, AttemptWindow};
use crate::error::{Result, TutorError};

pub const MIN_FACTOR: u8 = 1;
pub const MAX_FACTOR: u8 = 12;

/// Number of facts in the registry (12 × 12).
pub const FACT_COUNT: usize = (MAX_FACTOR as usize) * (MAX_FACTOR as usize);

/// A multiplication fact `a × b`, both factors in 1..=12.
///
/// `7×8` and `8×7` are distinct facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fact {
  a: u8,
  b: u8,
}

impl Fact {
  pub fn new(a: u8, b: u8) -> Result<Self> {
    if is_factor(a) && is_factor(b) {
      Ok(Self { a, b })
    } else {
      Err(TutorError::UnknownFact(format!("{}x{}", a, b)))
    }
  }

  /// Parse a fact key such as `"7x8"`.
  pub fn parse(key: &str) -> Result<Self> {
    let unknown = || TutorError::UnknownFact(key.to_string());
    let (a, b) = key.trim().split_once(['x', 'X']).ok_or_else(unknown)?;
    let a: u8 = a.trim().parse().map_err(|_| unknown())?;
    let b: u8 = b.trim().parse().map_err(|_| unknown())?;
    Self::new(a, b).map_err(|_| unknown())
  }

  pub fn a(&self) -> u8 {
    self.a
  }

  pub fn b(&self) -> u8 {
    self.b
  }

  pub fn answer(&self) -> u32 {
    self.a as u32 * self.b as u32
  }

  /// Canonical identity used in snapshots and the attempt log.
  pub fn key(&self) -> String {
    format!("{}x{}", self.a, self.b)
  }

  pub fn is_square(&self) -> bool {
    self.a == self.b
  }

  pub fn involves(&self, factor: u8) -> bool {
    self.a == factor || self.b == factor
  }

  /// Tables this fact belongs to: one for squares, otherwise two.
  pub fn tables(&self) -> Vec<u8> {
    if self.is_square() {
      vec![self.a]
    } else {
      vec![self.a, self.b]
    }
  }

  /// Position in the registry, row-major by `a`.
  pub(crate) fn index(&self) -> usize {
    (self.a - MIN_FACTOR) as usize * MAX_FACTOR as usize + (self.b - MIN_FACTOR) as usize
  }
}

impl fmt::Display for Fact {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} × {}", self.a, self.b)
  }
}

impl FromStr for Fact {
  type Err = TutorError;

  fn from_str(s: &str) -> Result<Self> {
    Self::parse(s)
  }
}

pub fn is_factor(n: u8) -> bool {
  (MIN_FACTOR..=MAX_FACTOR).contains(&n)
}

/// All 144 facts in registry order (1×1, 1×2, …, 12×12).
pub fn all_facts() -> impl Iterator<Item = Fact> {
  (MIN_FACTOR..=MAX_FACTOR).flat_map(|a| (MIN_FACTOR..=MAX_FACTOR).map(move |b| Fact { a, b }))
}

/// Learner confidence on a single fact.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
  #[default]
  New,
  Learning,
  Confident,
  Mastered,
}

impl Confidence {
  pub const ALL: [Confidence; 4] = [
    Confidence::New,
    Confidence::Learning,
    Confidence::Confident,
    Confidence::Mastered,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::New => "new",
      Self::Learning => "learning",
      Self::Confident => "confident",
      Self::Mastered => "mastered",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "new" => Some(Self::New),
      "learning" => Some(Self::Learning),
      "confident" => Some(Self::Confident),
      "mastered" => Some(Self::Mastered),
      _ => None,
    }
  }
}

/// Mutable learning state for one fact.
///
/// `confidence` is derived from `recent_attempts` and is only written by
/// the classifier, so it has no public setter.
#[derive(Debug, Clone, PartialEq)]
pub struct FactState {
  pub fact: Fact,
  pub(crate) confidence: Confidence,
  pub correct_count: u32,
  pub incorrect_count: u32,
  pub last_seen: Option<DateTime<Utc>>,
  pub last_correct: Option<DateTime<Utc>>,
  pub(crate) recent_attempts: AttemptWindow,
  pub preferred_strategy: Option<String>,
}

impl FactState {
  pub fn new(fact: Fact, window: usize) -> Self {
    Self {
      fact,
      confidence: Confidence::New,
      correct_count: 0,
      incorrect_count: 0,
      last_seen: None,
      last_correct: None,
      recent_attempts: AttemptWindow::new(window),
      preferred_strategy: None,
    }
  }

  pub fn confidence(&self) -> Confidence {
    self.confidence
  }

  pub fn recent_attempts(&self) -> &AttemptWindow {
    &self.recent_attempts
  }

  pub fn total_attempts(&self) -> u32 {
    self.correct_count + self.incorrect_count
  }

  /// Lifetime share of wrong answers; 0 before the first attempt.
  pub fn error_rate(&self) -> f64 {
    let total = self.total_attempts();
    if total > 0 {
      self.incorrect_count as f64 / total as f64
    } else {
      0.0
    }
  }

  /// Append an attempt and bump the lifetime counters and timestamps.
  /// Reclassification is the caller's job.
  pub(crate) fn push_attempt(&mut self, attempt: Attempt) {
    if attempt.correct {
      self.correct_count += 1;
      self.last_correct = Some(attempt.timestamp);
    } else {
      self.incorrect_count += 1;
    }
    self.last_seen = Some(attempt.timestamp);
    self.recent_attempts.push(attempt);
  }
}

/// Fresh registry: every fact at `new`, in registry order.
pub fn generate_all_facts(window: usize) -> Vec<FactState> {
  all_facts().map(|fact| FactState::new(fact, window)).collect()
}
