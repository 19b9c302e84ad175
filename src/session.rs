//! In-memory practice session and the learner's focus-table choice.
//!
//! Both are owned by the UI layer alongside `Progress`; nothing here is
//! global.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::config::{SchedulerConfig, SessionConfig};
use crate::domain::{is_factor, Fact};
use crate::progress::Progress;
use crate::srs::{select_next_fact, RecentFacts, SchedulerContext};

/// Tables the learner asked to practise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusTables {
  tables: BTreeSet<u8>,
  enabled: bool,
}

impl Default for FocusTables {
  fn default() -> Self {
    Self {
      tables: BTreeSet::new(),
      enabled: true,
    }
  }
}

impl FocusTables {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add or remove a table. Numbers outside 1..=12 are ignored.
  pub fn toggle(&mut self, table: u8) {
    if !is_factor(table) {
      tracing::warn!("Ignoring focus toggle for table {}", table);
      return;
    }
    if !self.tables.remove(&table) {
      self.tables.insert(table);
    }
  }

  pub fn set(&mut self, tables: impl IntoIterator<Item = u8>) {
    self.tables = tables.into_iter().filter(|&t| is_factor(t)).collect();
  }

  pub fn clear(&mut self) {
    self.tables.clear();
  }

  pub fn set_enabled(&mut self, enabled: bool) {
    self.enabled = enabled;
  }

  pub fn is_enabled(&self) -> bool {
    self.enabled
  }

  /// Chosen tables, ascending, whether or not the filter is on.
  pub fn tables(&self) -> &BTreeSet<u8> {
    &self.tables
  }

  /// The filter the scheduler should apply; empty when disabled.
  pub fn active(&self) -> BTreeSet<u8> {
    if self.enabled {
      self.tables.clone()
    } else {
      BTreeSet::new()
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PracticeSession {
  goal: u32,
  min_goal: u32,
  max_goal: u32,
  /// Questions answered this session
  pub progress: u32,
  /// Consecutive correct answers
  pub streak: u32,
  current_fact: Option<Fact>,
  recent: RecentFacts,
  pub started_at: DateTime<Utc>,
}

impl Default for PracticeSession {
  fn default() -> Self {
    Self::new(&SessionConfig::default(), &SchedulerConfig::default())
  }
}

impl PracticeSession {
  pub fn new(config: &SessionConfig, scheduler: &SchedulerConfig) -> Self {
    let mut session = Self {
      goal: config.default_goal,
      min_goal: config.min_goal,
      max_goal: config.max_goal.max(config.min_goal),
      progress: 0,
      streak: 0,
      current_fact: None,
      recent: RecentFacts::new(scheduler.recent_history),
      started_at: Utc::now(),
    };
    session.set_goal(config.default_goal);
    session
  }

  pub fn goal(&self) -> u32 {
    self.goal
  }

  /// Clamped to the configured range (3..=20 by default).
  pub fn set_goal(&mut self, goal: u32) {
    self.goal = goal.clamp(self.min_goal, self.max_goal);
  }

  pub fn current_fact(&self) -> Option<Fact> {
    self.current_fact
  }

  pub fn recent(&self) -> &RecentFacts {
    &self.recent
  }

  /// Mark `fact` as the question on screen.
  pub fn present(&mut self, fact: Fact) {
    self.current_fact = Some(fact);
    self.recent.push(fact);
  }

  /// Pick the next fact for this session and present it.
  pub fn next_fact<R: Rng + ?Sized>(
    &mut self,
    progress: &Progress,
    focus: &FocusTables,
    config: &SchedulerConfig,
    now: DateTime<Utc>,
    rng: &mut R,
  ) -> Option<Fact> {
    let focus_tables = focus.active();
    let ctx = SchedulerContext {
      facts: progress.facts(),
      recent: &self.recent,
      focus_tables: &focus_tables,
      now,
    };
    let fact = select_next_fact(&ctx, config, rng)?;
    self.present(fact);
    Some(fact)
  }

  /// Count an answer toward the goal and update the streak.
  pub fn record_answer(&mut self, correct: bool) {
    self.progress += 1;
    if correct {
      self.streak += 1;
    } else {
      self.streak = 0;
    }
  }

  pub fn is_goal_complete(&self) -> bool {
    self.progress >= self.goal
  }

  /// Start a new round; the goal and recent history are kept.
  pub fn reset_progress(&mut self) {
    self.progress = 0;
    self.streak = 0;
  }
}
