//! Confidence classification from the recent attempt window.
//!
//! Only number-pad (recall) attempts can promote a fact past `learning`.
//! Multiple-choice answers show the learner recognises the product, which
//! is enough to start learning but not to be trusted as recall.

use crate::config::ConfidenceThresholds;
use crate::domain::{AttemptWindow, Confidence, FactState};

/// Number-pad statistics over the recent window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
  /// Attempts considered (whole window, any input method)
  pub attempts: usize,
  pub number_pad_attempts: usize,
  pub number_pad_correct: usize,
  /// 0.0 when there are no number-pad attempts
  pub number_pad_accuracy: f64,
  /// Mean time of correct number-pad answers; infinite when there are none
  pub avg_correct_time_ms: f64,
}

impl WindowStats {
  pub fn from_window(window: &AttemptWindow, size: usize) -> Self {
    let recent: Vec<_> = window.latest(size).collect();
    let number_pad: Vec<_> = recent.iter().filter(|a| a.input_method.is_recall()).collect();

    let correct_times: Vec<f64> = number_pad
      .iter()
      .filter(|a| a.correct)
      .map(|a| a.response_time_ms as f64)
      .collect();

    let number_pad_accuracy = if number_pad.is_empty() {
      0.0
    } else {
      correct_times.len() as f64 / number_pad.len() as f64
    };

    let avg_correct_time_ms = if correct_times.is_empty() {
      f64::INFINITY
    } else {
      correct_times.iter().sum::<f64>() / correct_times.len() as f64
    };

    Self {
      attempts: recent.len(),
      number_pad_attempts: number_pad.len(),
      number_pad_correct: correct_times.len(),
      number_pad_accuracy,
      avg_correct_time_ms,
    }
  }

  fn qualifies(&self, min_correct: usize, max_time_ms: f64, min_accuracy: f64) -> bool {
    self.number_pad_correct >= min_correct
      && self.avg_correct_time_ms < max_time_ms
      && self.number_pad_accuracy >= min_accuracy
  }
}

/// Classify a fact from its attempt history.
pub fn classify(state: &FactState, thresholds: &ConfidenceThresholds) -> Confidence {
  classify_window(state.recent_attempts(), thresholds)
}

pub fn classify_window(window: &AttemptWindow, thresholds: &ConfidenceThresholds) -> Confidence {
  if window.is_empty() {
    return Confidence::New;
  }

  let stats = WindowStats::from_window(window, thresholds.recent_attempts_window);

  if stats.qualifies(
    thresholds.mastered_min_correct,
    thresholds.mastered_max_time_ms,
    thresholds.mastered_min_accuracy,
  ) {
    Confidence::Mastered
  } else if stats.qualifies(
    thresholds.confident_min_correct,
    thresholds.confident_max_time_ms,
    thresholds.confident_min_accuracy,
  ) {
    Confidence::Confident
  } else {
    Confidence::Learning
  }
}

/// Recompute and store a fact's confidence, returning the previous level.
pub fn reclassify(state: &mut FactState, thresholds: &ConfidenceThresholds) -> Confidence {
  let previous = state.confidence;
  state.confidence = classify(state, thresholds);
  if previous != state.confidence {
    tracing::debug!(
      "{} confidence {} -> {}",
      state.fact.key(),
      previous.as_str(),
      state.confidence.as_str()
    );
  }
  previous
}
