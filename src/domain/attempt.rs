use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// How the learner entered their answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMethod {
  /// Picked from a set of choices (recognition)
  MultipleChoice,
  /// Typed the product on a number pad (recall)
  NumberPad,
}

impl InputMethod {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::MultipleChoice => "multiple_choice",
      Self::NumberPad => "number_pad",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "multiple_choice" => Some(Self::MultipleChoice),
      "number_pad" => Some(Self::NumberPad),
      _ => None,
    }
  }

  pub fn is_recall(&self) -> bool {
    matches!(self, Self::NumberPad)
  }
}

/// One answered question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
  pub correct: bool,
  pub input_method: InputMethod,
  pub response_time_ms: u32,
  #[serde(with = "crate::domain::timestamp::epoch_millis")]
  pub timestamp: DateTime<Utc>,
}

impl Attempt {
  pub fn new(
    correct: bool,
    input_method: InputMethod,
    response_time_ms: u32,
    timestamp: DateTime<Utc>,
  ) -> Self {
    Self {
      correct,
      input_method,
      response_time_ms,
      timestamp,
    }
  }
}

/// Default number of attempts kept per fact.
pub const DEFAULT_ATTEMPT_WINDOW: usize = 8;

/// Bounded, oldest-first attempt history. Pushing past capacity evicts the
/// oldest entry.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptWindow {
  attempts: VecDeque<Attempt>,
  capacity: usize,
}

impl Default for AttemptWindow {
  fn default() -> Self {
    Self::new(DEFAULT_ATTEMPT_WINDOW)
  }
}

impl AttemptWindow {
  /// A zero capacity is bumped to one so the latest attempt is always kept.
  pub fn new(capacity: usize) -> Self {
    let capacity = capacity.max(1);
    Self {
      attempts: VecDeque::with_capacity(capacity),
      capacity,
    }
  }

  /// Build a window from a history, keeping only the most recent entries.
  pub fn from_attempts(attempts: impl IntoIterator<Item = Attempt>, capacity: usize) -> Self {
    let mut window = Self::new(capacity);
    for attempt in attempts {
      window.push(attempt);
    }
    window
  }

  /// Append an attempt, returning the evicted one if the window was full.
  pub fn push(&mut self, attempt: Attempt) -> Option<Attempt> {
    let evicted = if self.attempts.len() >= self.capacity {
      self.attempts.pop_front()
    } else {
      None
    };
    self.attempts.push_back(attempt);
    evicted
  }

  pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Attempt> + ExactSizeIterator {
    self.attempts.iter()
  }

  /// The last `n` attempts, oldest first.
  pub fn latest(&self, n: usize) -> impl Iterator<Item = &Attempt> {
    let skip = self.attempts.len().saturating_sub(n);
    self.attempts.iter().skip(skip)
  }

  pub fn last(&self) -> Option<&Attempt> {
    self.attempts.back()
  }

  pub fn len(&self) -> usize {
    self.attempts.len()
  }

  pub fn is_empty(&self) -> bool {
    self.attempts.is_empty()
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn to_vec(&self) -> Vec<Attempt> {
    self.attempts.iter().cloned().collect()
  }
}
