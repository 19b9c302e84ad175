//! Multiple-choice options built from common multiplication mistakes.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::Fact;

/// Random fillers are drawn from 1..=FILL_MAX.
pub const FILL_MAX: u32 = 144;

/// Wrong answers a learner plausibly gives for `a × b`, in priority order.
/// Non-positive values, the correct answer and duplicates are dropped.
pub fn mistake_candidates(fact: Fact) -> Vec<u32> {
  let a = fact.a() as i64;
  let b = fact.b() as i64;
  let correct = a * b;

  let raw = [
    correct + a,   // one group too many
    correct - a,   // one group too few
    correct + b,   // mixed up which factor to add
    correct - b,
    a + b,         // added instead of multiplied
    correct + 1,
    correct - 1,
    correct + 10,
    correct - 10,
    (a + 1) * b,   // off by one on a factor
    a * (b + 1),
  ];

  let mut candidates = Vec::with_capacity(raw.len());
  for n in raw {
    if n > 0 && n != correct {
      let n = n as u32;
      if !candidates.contains(&n) {
        candidates.push(n);
      }
    }
  }
  candidates
}

/// Generate `count` distinct answer options including the correct one,
/// in random order.
///
/// `count` is clamped to 1..=FILL_MAX so the random fill always terminates.
pub fn generate_choices<R: Rng + ?Sized>(fact: Fact, count: usize, rng: &mut R) -> Vec<u32> {
  let count = count.clamp(1, FILL_MAX as usize);
  let correct = fact.answer();

  let mut choices = vec![correct];

  let mut mistakes = mistake_candidates(fact);
  mistakes.shuffle(rng);
  choices.extend(mistakes.into_iter().take(count - 1));

  // Fill with random values if the mistakes ran out
  while choices.len() < count {
    let n = rng.random_range(1..=FILL_MAX);
    if !choices.contains(&n) {
      choices.push(n);
    }
  }

  choices.shuffle(rng);
  choices
}
