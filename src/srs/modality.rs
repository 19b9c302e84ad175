use crate::config::ConfidenceThresholds;
use crate::domain::{Confidence, FactState, InputMethod};

/// Whether to show choices instead of the number pad.
///
/// Unseen facts always get choices; learning facts switch to free entry
/// after a couple of correct answers; confident and mastered facts are
/// always typed.
pub fn use_multiple_choice(state: &FactState, thresholds: &ConfidenceThresholds) -> bool {
  match state.confidence() {
    Confidence::New => true,
    Confidence::Learning => state.correct_count < thresholds.mc_correct_to_advance,
    Confidence::Confident | Confidence::Mastered => false,
  }
}

pub fn preferred_input_method(state: &FactState, thresholds: &ConfidenceThresholds) -> InputMethod {
  if use_multiple_choice(state, thresholds) {
    InputMethod::MultipleChoice
  } else {
    InputMethod::NumberPad
  }
}
