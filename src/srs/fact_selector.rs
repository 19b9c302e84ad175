//! Adaptive next-fact selection.
//!
//! Facts are scored by how much practice they need:
//! - Facts being learned come first
//! - Frequently missed facts get a trouble-spot bonus
//! - Mastered facts come back for review after a few days
//! - Anything seen in the last hour is pushed back
//! - Unseen facts surface easiest first
//!
//! The pick is random among the best few candidates so sessions do not
//! replay the same sequence.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::collections::{BTreeSet, VecDeque};

use crate::config::{DifficultyRanks, SchedulerConfig};
use crate::domain::{Confidence, Fact, FactState};

/// A candidate fact with its priority score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactScore {
  pub fact: Fact,
  pub score: f64,
}

/// Recently shown facts, newest last.
#[derive(Debug, Clone, PartialEq)]
pub struct RecentFacts {
  facts: VecDeque<Fact>,
  capacity: usize,
}

impl Default for RecentFacts {
  fn default() -> Self {
    Self::new(SchedulerConfig::default().recent_history)
  }
}

impl RecentFacts {
  pub fn new(capacity: usize) -> Self {
    let capacity = capacity.max(1);
    Self {
      facts: VecDeque::with_capacity(capacity),
      capacity,
    }
  }

  /// Record a shown fact, dropping the oldest entry when full.
  pub fn push(&mut self, fact: Fact) {
    if self.facts.len() >= self.capacity {
      self.facts.pop_front();
    }
    self.facts.push_back(fact);
  }

  /// True if `fact` is among the last `n` shown.
  pub fn shown_within(&self, fact: Fact, n: usize) -> bool {
    self.facts.iter().rev().take(n).any(|&f| f == fact)
  }

  pub fn last(&self) -> Option<Fact> {
    self.facts.back().copied()
  }

  pub fn len(&self) -> usize {
    self.facts.len()
  }

  pub fn is_empty(&self) -> bool {
    self.facts.is_empty()
  }

  pub fn clear(&mut self) {
    self.facts.clear();
  }

  pub fn iter(&self) -> impl Iterator<Item = &Fact> {
    self.facts.iter()
  }
}

impl FromIterator<Fact> for RecentFacts {
  fn from_iter<I: IntoIterator<Item = Fact>>(iter: I) -> Self {
    let mut recent = Self::default();
    for fact in iter {
      recent.push(fact);
    }
    recent
  }
}

/// Everything the scheduler looks at for one pick.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerContext<'a> {
  pub facts: &'a [FactState],
  pub recent: &'a RecentFacts,
  /// Empty means no filter
  pub focus_tables: &'a BTreeSet<u8>,
  pub now: DateTime<Utc>,
}

/// Hand-ranked difficulty for facts the learner has not met yet.
pub fn fact_difficulty(fact: Fact, ranks: &DifficultyRanks) -> u8 {
  if fact.involves(1) {
    ranks.ones
  } else if fact.involves(10) {
    ranks.tens
  } else if fact.involves(2) || fact.involves(5) {
    ranks.twos_and_fives
  } else if fact.is_square() {
    ranks.squares
  } else if fact.involves(9) {
    ranks.nines
  } else if fact.a() <= 4 || fact.b() <= 4 {
    ranks.small_factors
  } else {
    ranks.hardest
  }
}

/// Priority of a fact; higher is more urgent.
pub fn score_fact(state: &FactState, config: &SchedulerConfig, now: DateTime<Utc>) -> f64 {
  let base = &config.base_scores;
  let mut score = match state.confidence() {
    Confidence::Learning => base.learning,
    Confidence::New => base.new,
    Confidence::Confident => base.confident,
    Confidence::Mastered => base.mastered,
  };

  // Trouble spot: lifetime error rate
  score += state.error_rate() * config.trouble_spot_weight;

  if let Some(last_seen) = state.last_seen {
    let since = now - last_seen;

    // Spaced review of mastered facts
    if state.confidence() == Confidence::Mastered
      && Duration::try_days(config.review_interval_days).is_some_and(|interval| since >= interval)
    {
      score += config.review_bonus;
    }

    // An interval too large to represent covers everything
    if Duration::try_minutes(config.recency_window_minutes).is_none_or(|window| since < window) {
      score -= config.recency_penalty;
    }
  }

  // Ease into new facts
  if state.confidence() == Confidence::New {
    score -= fact_difficulty(state.fact, &config.difficulty) as f64 * config.difficulty_weight;
  }

  score
}

/// Facts allowed by the focus-table filter.
pub fn eligible_facts<'a>(
  facts: &'a [FactState],
  focus_tables: &BTreeSet<u8>,
) -> Vec<&'a FactState> {
  facts
    .iter()
    .filter(|s| {
      focus_tables.is_empty()
        || focus_tables.contains(&s.fact.a())
        || focus_tables.contains(&s.fact.b())
    })
    .collect()
}

/// Score every candidate, best first. Recently shown facts are left out
/// unless that would leave nothing to pick.
pub fn score_candidates(ctx: &SchedulerContext<'_>, config: &SchedulerConfig) -> Vec<FactScore> {
  let eligible = eligible_facts(ctx.facts, ctx.focus_tables);

  let not_recent: Vec<_> = eligible
    .iter()
    .copied()
    .filter(|s| !ctx.recent.shown_within(s.fact, config.recent_exclusion))
    .collect();

  // Repeating a fact beats stalling
  let candidates = if not_recent.is_empty() { eligible } else { not_recent };

  let mut scores: Vec<FactScore> = candidates
    .into_iter()
    .map(|s| FactScore {
      fact: s.fact,
      score: score_fact(s, config, ctx.now),
    })
    .collect();

  // Stable: equal scores keep registry order
  scores.sort_by(|x, y| y.score.total_cmp(&x.score));
  scores
}

/// Uniform pick among the leading candidates of a best-first list.
pub fn pick_from_top<R: Rng + ?Sized>(
  scores: &[FactScore],
  config: &SchedulerConfig,
  rng: &mut R,
) -> Option<Fact> {
  let top = &scores[..scores.len().min(config.top_candidates.max(1))];
  if top.is_empty() {
    return None;
  }

  let pool = top.len().min(config.pick_from.max(1));
  let idx = rng.random_range(0..pool);
  Some(top[idx].fact)
}

/// Main entry point: choose the next fact to present.
///
/// Returns `None` only when no fact passes the focus filter, which cannot
/// happen with a full registry and valid table numbers.
pub fn select_next_fact<R: Rng + ?Sized>(
  ctx: &SchedulerContext<'_>,
  config: &SchedulerConfig,
  rng: &mut R,
) -> Option<Fact> {
  #[cfg(feature = "profiling")]
  let started = std::time::Instant::now();

  let scores = score_candidates(ctx, config);
  let picked = pick_from_top(&scores, config, rng);

  #[cfg(feature = "profiling")]
  crate::profile_log!(crate::profiling::EventType::FactSelection {
    candidates: scores.len(),
    focus_tables: ctx.focus_tables.iter().copied().collect(),
    picked: picked.map(|f| f.key()),
    duration_us: started.elapsed().as_micros() as u64,
  });

  match picked {
    Some(fact) => tracing::debug!(
      "Selected {} from {} candidates (focus: {:?})",
      fact.key(),
      scores.len(),
      ctx.focus_tables
    ),
    None => tracing::warn!("No eligible facts for focus tables {:?}", ctx.focus_tables),
  }

  picked
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{generate_all_facts, Attempt, InputMethod};
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  fn fact(key: &str) -> Fact {
    Fact::parse(key).unwrap()
  }

  fn state_mut<'a>(facts: &'a mut [FactState], key: &str) -> &'a mut FactState {
    let f = fact(key);
    facts.iter_mut().find(|s| s.fact == f).unwrap()
  }

  fn answer(state: &mut FactState, correct: bool, method: InputMethod, at: DateTime<Utc>) {
    state.push_attempt(Attempt::new(correct, method, 2000, at));
    crate::srs::classifier::reclassify(state, &Default::default());
  }

  fn master(state: &mut FactState, at: DateTime<Utc>) {
    for _ in 0..5 {
      answer(state, true, InputMethod::NumberPad, at);
    }
    assert_eq!(state.confidence(), Confidence::Mastered);
  }

  fn ctx<'a>(
    facts: &'a [FactState],
    recent: &'a RecentFacts,
    focus: &'a BTreeSet<u8>,
    now: DateTime<Utc>,
  ) -> SchedulerContext<'a> {
    SchedulerContext {
      facts,
      recent,
      focus_tables: focus,
      now,
    }
  }

  // Difficulty ranking

  #[test]
  fn test_difficulty_ranking() {
    let ranks = DifficultyRanks::default();
    assert_eq!(fact_difficulty(fact("1x7"), &ranks), 0);
    assert_eq!(fact_difficulty(fact("10x1"), &ranks), 0);
    assert_eq!(fact_difficulty(fact("10x7"), &ranks), 1);
    assert_eq!(fact_difficulty(fact("2x9"), &ranks), 2);
    assert_eq!(fact_difficulty(fact("8x5"), &ranks), 2);
    assert_eq!(fact_difficulty(fact("7x7"), &ranks), 3);
    assert_eq!(fact_difficulty(fact("9x9"), &ranks), 3);
    assert_eq!(fact_difficulty(fact("9x6"), &ranks), 4);
    assert_eq!(fact_difficulty(fact("3x8"), &ranks), 5);
    assert_eq!(fact_difficulty(fact("4x4"), &ranks), 3);
    assert_eq!(fact_difficulty(fact("7x8"), &ranks), 7);
    assert_eq!(fact_difficulty(fact("11x12"), &ranks), 7);
  }

  #[test]
  fn test_difficulty_is_configurable() {
    let ranks = DifficultyRanks {
      hardest: 10,
      ..Default::default()
    };
    assert_eq!(fact_difficulty(fact("6x7"), &ranks), 10);
  }

  // Scoring

  #[test]
  fn test_score_new_fact_eased_by_difficulty() {
    let config = SchedulerConfig::default();
    let now = Utc::now();
    let easy = FactState::new(fact("1x5"), 8);
    let hard = FactState::new(fact("7x8"), 8);
    assert_eq!(score_fact(&easy, &config, now), 50.0);
    assert_eq!(score_fact(&hard, &config, now), 50.0 - 35.0);
  }

  #[test]
  fn test_score_trouble_spot_beats_fresh_fact() {
    let config = SchedulerConfig::default();
    let now = Utc::now();
    let mut facts = generate_all_facts(8);

    let troubled = state_mut(&mut facts, "7x8");
    for _ in 0..3 {
      answer(troubled, false, InputMethod::NumberPad, now - Duration::hours(2));
    }
    assert_eq!(troubled.correct_count, 0);
    assert_eq!(troubled.incorrect_count, 3);

    let troubled_score = score_fact(state_mut(&mut facts, "7x8"), &config, now);
    let fresh_score = score_fact(state_mut(&mut facts, "1x1"), &config, now);
    // learning 100 + error rate 1.0 * 50
    assert_eq!(troubled_score, 150.0);
    assert!(troubled_score > fresh_score);
  }

  #[test]
  fn test_score_recency_penalty() {
    let config = SchedulerConfig::default();
    let now = Utc::now();
    let mut state = FactState::new(fact("6x7"), 8);
    answer(&mut state, true, InputMethod::MultipleChoice, now - Duration::minutes(10));
    // learning 100 - recent 30
    assert_eq!(score_fact(&state, &config, now), 70.0);
    // An hour later the penalty lifts
    assert_eq!(score_fact(&state, &config, now + Duration::hours(1)), 100.0);
  }

  #[test]
  fn test_score_mastered_review_bonus() {
    let config = SchedulerConfig::default();
    let now = Utc::now();
    let mut state = FactState::new(fact("6x7"), 8);
    master(&mut state, now - Duration::days(4));
    assert_eq!(score_fact(&state, &config, now), 10.0 + 40.0);

    let mut fresh = FactState::new(fact("6x8"), 8);
    master(&mut fresh, now - Duration::days(1));
    assert_eq!(score_fact(&fresh, &config, now), 10.0);
  }

  #[test]
  fn test_score_review_bonus_only_for_mastered() {
    let config = SchedulerConfig::default();
    let now = Utc::now();
    let mut state = FactState::new(fact("6x7"), 8);
    for _ in 0..3 {
      answer(&mut state, true, InputMethod::NumberPad, now - Duration::days(5));
    }
    assert_eq!(state.confidence(), Confidence::Confident);
    assert_eq!(score_fact(&state, &config, now), 30.0);
  }

  #[test]
  fn test_score_extreme_intervals_do_not_panic() {
    let config = SchedulerConfig {
      review_interval_days: i64::MAX,
      recency_window_minutes: i64::MAX,
      ..SchedulerConfig::default()
    };
    let now = Utc::now();
    let mut state = FactState::new(fact("6x7"), 8);
    master(&mut state, now - Duration::days(400));

    // Never due for review, always inside the recency window
    assert_eq!(score_fact(&state, &config, now), 10.0 - 30.0);
  }

  // Recent history

  #[test]
  fn test_recent_facts_capacity() {
    let mut recent = RecentFacts::new(2);
    recent.push(fact("1x1"));
    recent.push(fact("1x2"));
    recent.push(fact("1x3"));
    assert_eq!(recent.len(), 2);
    assert!(!recent.shown_within(fact("1x1"), 10));
    assert_eq!(recent.last(), Some(fact("1x3")));
  }

  #[test]
  fn test_recent_facts_shown_within() {
    let recent: RecentFacts = ["2x2", "2x3", "2x4", "2x5"].iter().map(|k| fact(k)).collect();
    assert!(recent.shown_within(fact("2x5"), 3));
    assert!(recent.shown_within(fact("2x3"), 3));
    assert!(!recent.shown_within(fact("2x2"), 3));
    assert!(recent.shown_within(fact("2x2"), 4));
  }

  // Candidate filtering

  #[test]
  fn test_focus_tables_filter() {
    let facts = generate_all_facts(8);
    let focus = BTreeSet::from([7]);
    let eligible = eligible_facts(&facts, &focus);
    assert_eq!(eligible.len(), 23);
    assert!(eligible.iter().all(|s| s.fact.involves(7)));
  }

  #[test]
  fn test_recent_facts_excluded() {
    let facts = generate_all_facts(8);
    let recent: RecentFacts = ["1x1", "1x2", "1x3"].iter().map(|k| fact(k)).collect();
    let focus = BTreeSet::new();
    let scores = score_candidates(&ctx(&facts, &recent, &focus, Utc::now()), &Default::default());
    assert_eq!(scores.len(), 141);
    assert!(scores.iter().all(|s| !recent.shown_within(s.fact, 3)));
  }

  #[test]
  fn test_only_last_three_excluded() {
    let facts = generate_all_facts(8);
    let recent: RecentFacts = ["1x1", "1x2", "1x3", "1x4"].iter().map(|k| fact(k)).collect();
    let focus = BTreeSet::new();
    let scores = score_candidates(&ctx(&facts, &recent, &focus, Utc::now()), &Default::default());
    assert!(scores.iter().any(|s| s.fact == fact("1x1")));
    assert!(!scores.iter().any(|s| s.fact == fact("1x4")));
  }

  #[test]
  fn test_recent_exclusion_falls_back_when_everything_is_recent() {
    let facts: Vec<_> = generate_all_facts(8)
      .into_iter()
      .filter(|s| s.fact == fact("1x1") || s.fact == fact("1x2"))
      .collect();
    let recent: RecentFacts = ["1x1", "1x2"].iter().map(|k| fact(k)).collect();
    let focus = BTreeSet::new();
    let scores = score_candidates(&ctx(&facts, &recent, &focus, Utc::now()), &Default::default());
    assert_eq!(scores.len(), 2);
  }

  #[test]
  fn test_scores_sorted_descending() {
    let facts = generate_all_facts(8);
    let recent = RecentFacts::default();
    let focus = BTreeSet::new();
    let scores = score_candidates(&ctx(&facts, &recent, &focus, Utc::now()), &Default::default());
    assert!(scores.windows(2).all(|w| w[0].score >= w[1].score));
  }

  // Picking

  #[test]
  fn test_pick_from_empty() {
    let mut rng = StdRng::seed_from_u64(1);
    assert_eq!(pick_from_top(&[], &Default::default(), &mut rng), None);
  }

  #[test]
  fn test_pick_single_candidate() {
    let mut rng = StdRng::seed_from_u64(1);
    let scores = [FactScore {
      fact: fact("3x3"),
      score: 1.0,
    }];
    assert_eq!(pick_from_top(&scores, &Default::default(), &mut rng), Some(fact("3x3")));
  }

  #[test]
  fn test_pick_only_from_leading_three() {
    let mut rng = StdRng::seed_from_u64(7);
    let scores: Vec<_> = ["1x1", "1x2", "1x3", "1x4", "1x5", "1x6"]
      .iter()
      .enumerate()
      .map(|(i, k)| FactScore {
        fact: fact(k),
        score: 100.0 - i as f64,
      })
      .collect();
    let allowed = [fact("1x1"), fact("1x2"), fact("1x3")];
    for _ in 0..200 {
      let picked = pick_from_top(&scores, &Default::default(), &mut rng).unwrap();
      assert!(allowed.contains(&picked));
    }
  }

  #[test]
  fn test_pick_from_one_is_deterministic() {
    let mut rng = StdRng::seed_from_u64(7);
    let config = SchedulerConfig {
      pick_from: 1,
      ..Default::default()
    };
    let scores = [
      FactScore { fact: fact("4x4"), score: 9.0 },
      FactScore { fact: fact("4x5"), score: 8.0 },
    ];
    for _ in 0..20 {
      assert_eq!(pick_from_top(&scores, &config, &mut rng), Some(fact("4x4")));
    }
  }

  // End to end

  #[test]
  fn test_select_respects_focus_tables() {
    let facts = generate_all_facts(8);
    let mut recent = RecentFacts::default();
    let focus = BTreeSet::from([3, 11]);
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..100 {
      let picked = select_next_fact(&ctx(&facts, &recent, &focus, Utc::now()), &Default::default(), &mut rng)
        .unwrap();
      assert!(picked.involves(3) || picked.involves(11));
      recent.push(picked);
    }
  }

  #[test]
  fn test_fresh_profile_starts_with_easiest() {
    let facts = generate_all_facts(8);
    let recent = RecentFacts::default();
    let focus = BTreeSet::new();
    let ranks = DifficultyRanks::default();
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..100 {
      let picked = select_next_fact(&ctx(&facts, &recent, &focus, Utc::now()), &Default::default(), &mut rng)
        .unwrap();
      assert!(fact_difficulty(picked, &ranks) <= 2);
    }
  }

  #[test]
  fn test_select_avoids_immediate_repeat() {
    let facts = generate_all_facts(8);
    let mut recent = RecentFacts::default();
    let focus = BTreeSet::new();
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..50 {
      let picked = select_next_fact(&ctx(&facts, &recent, &focus, Utc::now()), &Default::default(), &mut rng)
        .unwrap();
      assert!(!recent.shown_within(picked, 3));
      recent.push(picked);
    }
  }

  #[test]
  fn test_select_empty_registry() {
    let recent = RecentFacts::default();
    let focus = BTreeSet::new();
    let mut rng = StdRng::seed_from_u64(0);
    assert_eq!(
      select_next_fact(&ctx(&[], &recent, &focus, Utc::now()), &Default::default(), &mut rng),
      None
    );
  }

  #[test]
  fn test_select_out_of_range_focus_yields_none() {
    let facts = generate_all_facts(8);
    let recent = RecentFacts::default();
    let focus = BTreeSet::from([13]);
    let mut rng = StdRng::seed_from_u64(0);
    assert_eq!(
      select_next_fact(&ctx(&facts, &recent, &focus, Utc::now()), &Default::default(), &mut rng),
      None
    );
  }
}
