//! Times-table mastery derived from per-fact confidence.

use std::collections::BTreeSet;

use crate::domain::{Confidence, FactState, MAX_FACTOR, MIN_FACTOR};

/// A table is mastered when every fact with `t` as either factor is.
pub fn is_table_mastered(facts: &[FactState], table: u8) -> bool {
  let mut touching = facts.iter().filter(|s| s.fact.involves(table)).peekable();
  // An empty registry masters nothing
  touching.peek().is_some() && touching.all(|s| s.confidence() == Confidence::Mastered)
}

/// All mastered tables in ascending order.
pub fn mastered_tables(facts: &[FactState]) -> BTreeSet<u8> {
  (MIN_FACTOR..=MAX_FACTOR)
    .filter(|&table| is_table_mastered(facts, table))
    .collect()
}

/// Mastered facts per table, for progress displays.
pub fn table_progress(facts: &[FactState], table: u8) -> (usize, usize) {
  facts
    .iter()
    .filter(|s| s.fact.involves(table))
    .fold((0, 0), |(mastered, total), s| {
      let hit = usize::from(s.confidence() == Confidence::Mastered);
      (mastered + hit, total + 1)
    })
}
