//! Debounced write-behind of fact snapshots.
//!
//! The practice loop queues an exported snapshot after every attempt. The
//! queue keeps only the newest snapshot per fact and writes the batch once
//! answers stop coming for the debounce period. A failed write puts the
//! batch back so the next flush retries it.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

use crate::db::{save_facts, try_lock, DbPool};
use crate::error::Result;
use crate::snapshot::PersistedFact;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
  /// Nothing waiting
  Synced,
  Pending,
  /// Last flush failed; the batch is still queued
  Error,
}

#[derive(Debug, Clone)]
pub struct ProgressSyncQueue {
  pending: BTreeMap<String, PersistedFact>,
  last_queued: Option<DateTime<Utc>>,
  debounce: Duration,
  status: SyncStatus,
}

impl ProgressSyncQueue {
  pub fn new(debounce_ms: i64) -> Self {
    Self {
      pending: BTreeMap::new(),
      last_queued: None,
      debounce: Duration::try_milliseconds(debounce_ms.max(0)).unwrap_or(Duration::MAX),
      status: SyncStatus::Synced,
    }
  }

  /// Queue a snapshot, replacing any earlier one for the same fact, and
  /// restart the debounce timer.
  pub fn queue(&mut self, persisted: PersistedFact, now: DateTime<Utc>) {
    self.pending.insert(persisted.fact.clone(), persisted);
    self.last_queued = Some(now);
    if self.status == SyncStatus::Synced {
      self.status = SyncStatus::Pending;
    }
  }

  pub fn len(&self) -> usize {
    self.pending.len()
  }

  pub fn is_empty(&self) -> bool {
    self.pending.is_empty()
  }

  pub fn status(&self) -> SyncStatus {
    self.status
  }

  /// True once the queue is non-empty and quiet for the debounce period.
  pub fn is_due(&self, now: DateTime<Utc>) -> bool {
    match self.last_queued {
      Some(last) => !self.pending.is_empty() && now - last >= self.debounce,
      None => false,
    }
  }

  /// Write everything queued. On failure the batch is re-queued and the
  /// error returned.
  pub fn flush(&mut self, pool: &DbPool, now: DateTime<Utc>) -> Result<usize> {
    if self.pending.is_empty() {
      return Ok(0);
    }

    let batch: Vec<PersistedFact> = std::mem::take(&mut self.pending).into_values().collect();
    let written = try_lock(pool).and_then(|conn| Ok(save_facts(&conn, &batch, now)?));

    #[cfg(feature = "profiling")]
    crate::profile_log!(crate::profiling::EventType::SyncFlush {
      facts: batch.len(),
      ok: written.is_ok(),
    });

    match written {
      Ok(count) => {
        self.status = SyncStatus::Synced;
        tracing::debug!("Synced {} fact snapshots", count);
        Ok(count)
      }
      Err(e) => {
        tracing::warn!("Progress sync failed, re-queueing {} facts: {}", batch.len(), e);
        for persisted in batch {
          // Anything queued meanwhile is newer
          self.pending.entry(persisted.fact.clone()).or_insert(persisted);
        }
        self.status = SyncStatus::Error;
        Err(e)
      }
    }
  }

  /// Queue the snapshot taken after an answer. Whatever was already queued
  /// is flushed first if it has been quiet long enough, since the time
  /// spent on this answer counts toward the debounce.
  pub fn queue_after_answer(
    &mut self,
    pool: &DbPool,
    persisted: PersistedFact,
    now: DateTime<Utc>,
  ) -> Result<usize> {
    let flushed = self.flush_if_due(pool, now);
    self.queue(persisted, now);
    flushed
  }

  /// Flush only when the debounce period has passed.
  pub fn flush_if_due(&mut self, pool: &DbPool, now: DateTime<Utc>) -> Result<usize> {
    if self.is_due(now) {
      self.flush(pool, now)
    } else {
      Ok(0)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::load_fact_rows;
  use crate::domain::InputMethod;
  use crate::progress::Progress;
  use crate::snapshot::to_persisted;
  use crate::testing::TestEnv;

  fn snapshot_after(progress: &mut Progress, key: &str, correct: bool) -> PersistedFact {
    progress
      .record_attempt(key, correct, InputMethod::NumberPad, 1500)
      .unwrap();
    to_persisted(progress.get_by_key(key).unwrap())
  }

  #[test]
  fn test_same_fact_replaces_entry() {
    let mut progress = Progress::default();
    let mut queue = ProgressSyncQueue::new(2000);
    let now = Utc::now();

    queue.queue(snapshot_after(&mut progress, "3x7", true), now);
    queue.queue(snapshot_after(&mut progress, "3x7", false), now);
    queue.queue(snapshot_after(&mut progress, "4x7", true), now);

    assert_eq!(queue.len(), 2);
    assert_eq!(queue.pending["3x7"].incorrect_count, 1);
    assert_eq!(queue.status(), SyncStatus::Pending);
  }

  #[test]
  fn test_debounce_restarts_on_queue() {
    let mut progress = Progress::default();
    let mut queue = ProgressSyncQueue::new(2000);
    let start = Utc::now();
    assert!(!queue.is_due(start));

    queue.queue(snapshot_after(&mut progress, "2x2", true), start);
    assert!(!queue.is_due(start + Duration::milliseconds(1999)));

    let later = start + Duration::milliseconds(1500);
    queue.queue(snapshot_after(&mut progress, "2x3", true), later);
    assert!(!queue.is_due(start + Duration::milliseconds(2500)));
    assert!(queue.is_due(later + Duration::milliseconds(2000)));
  }

  #[test]
  fn test_flush_writes_batch() {
    let env = TestEnv::new().unwrap();
    let pool = env.pool().unwrap();
    let mut progress = Progress::default();
    let mut queue = ProgressSyncQueue::new(2000);
    let now = Utc::now();

    queue.queue(snapshot_after(&mut progress, "6x6", true), now);
    queue.queue(snapshot_after(&mut progress, "6x7", true), now);

    assert_eq!(queue.flush_if_due(&pool, now).unwrap(), 0);
    assert_eq!(queue.flush_if_due(&pool, now + Duration::seconds(3)).unwrap(), 2);
    assert!(queue.is_empty());
    assert_eq!(queue.status(), SyncStatus::Synced);
    assert_eq!(load_fact_rows(&env.conn).unwrap().len(), 2);
  }

  #[test]
  fn test_failed_flush_requeues() {
    let env = TestEnv::new().unwrap();
    let pool = env.pool().unwrap();
    let mut progress = Progress::default();
    let mut queue = ProgressSyncQueue::new(0);
    let now = Utc::now();

    env.conn.execute_batch("DROP TABLE fact_progress").unwrap();
    queue.queue(snapshot_after(&mut progress, "8x8", true), now);

    assert!(queue.flush(&pool, now).is_err());
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.status(), SyncStatus::Error);

    // Recover once the table is back
    crate::db::run_migrations(&env.conn).unwrap();
    assert_eq!(queue.flush(&pool, now).unwrap(), 1);
    assert!(queue.is_empty());
  }

  #[test]
  fn test_answers_spaced_out_are_synced_during_session() {
    let env = TestEnv::new().unwrap();
    let pool = env.pool().unwrap();
    let mut progress = Progress::default();
    let mut queue = ProgressSyncQueue::new(2000);
    let start = Utc::now();

    let keys = ["2x6", "3x6", "4x6", "5x6", "6x6"];
    let mut flushed = 0;
    for (i, key) in keys.iter().enumerate() {
      let at = start + Duration::seconds(10 * i as i64);
      flushed += queue
        .queue_after_answer(&pool, snapshot_after(&mut progress, key, true), at)
        .unwrap();
    }

    // Everything but the last answer is already on disk
    assert_eq!(flushed, 4);
    assert_eq!(queue.len(), 1);
    assert_eq!(load_fact_rows(&env.conn).unwrap().len(), 4);
  }

  #[test]
  fn test_quick_answers_stay_batched() {
    let env = TestEnv::new().unwrap();
    let pool = env.pool().unwrap();
    let mut progress = Progress::default();
    let mut queue = ProgressSyncQueue::new(2000);
    let start = Utc::now();

    for (i, key) in ["7x2", "7x3", "7x4"].iter().enumerate() {
      let at = start + Duration::milliseconds(500 * i as i64);
      let flushed = queue
        .queue_after_answer(&pool, snapshot_after(&mut progress, key, true), at)
        .unwrap();
      assert_eq!(flushed, 0);
    }
    assert_eq!(queue.len(), 3);
  }

  #[test]
  fn test_huge_debounce_never_due() {
    let mut progress = Progress::default();
    let mut queue = ProgressSyncQueue::new(i64::MAX);
    let now = Utc::now();
    queue.queue(snapshot_after(&mut progress, "9x2", true), now);
    assert!(!queue.is_due(now + Duration::days(3650)));
  }

  #[test]
  fn test_empty_flush_is_noop() {
    let env = TestEnv::new().unwrap();
    let pool = env.pool().unwrap();
    let mut queue = ProgressSyncQueue::new(2000);
    assert_eq!(queue.flush(&pool, Utc::now()).unwrap(), 0);
  }
}
