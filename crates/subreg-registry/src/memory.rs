//! An in-process [`SchemaLog`].
//!
//! Useful for single-node embedding and tests. Handles created with
//! [`MemoryLog::node`] share one history but carry their own leadership, so
//! a leader and its followers can be simulated in one process.

use std::sync::Arc;

use chrono::Utc;
use subreg_core::log::{Leadership, LogEntry, LogError, LogOp, SchemaLog};
use tokio::sync::{Mutex, watch};

#[derive(Debug)]
pub struct MemoryLog {
  entries:    Arc<Mutex<Vec<LogEntry>>>,
  leadership: watch::Sender<Leadership>,
}

impl MemoryLog {
  /// A fresh, empty log on a node that is the leader.
  pub fn leader() -> Self { Self::with_leadership(Leadership::Leader) }

  pub fn with_leadership(leadership: Leadership) -> Self {
    Self {
      entries:    Arc::default(),
      leadership: watch::Sender::new(leadership),
    }
  }

  /// Another node's handle onto the same history.
  pub fn node(&self, leadership: Leadership) -> Self {
    Self {
      entries:    Arc::clone(&self.entries),
      leadership: watch::Sender::new(leadership),
    }
  }

  pub fn set_leadership(&self, leadership: Leadership) {
    self.leadership.send_replace(leadership);
  }

  pub async fn len(&self) -> usize { self.entries.lock().await.len() }

  pub async fn is_empty(&self) -> bool { self.entries.lock().await.is_empty() }
}

impl SchemaLog for MemoryLog {
  fn leadership(&self) -> Leadership { self.leadership.borrow().clone() }

  async fn append(&self, op: LogOp) -> Result<u64, LogError> {
    if !self.leadership.borrow().is_leader() {
      return Err(LogError::NotLeader);
    }
    let mut entries = self.entries.lock().await;
    let offset = entries.last().map_or(1, |e| e.offset + 1);
    entries.push(LogEntry { offset, op, appended_at: Utc::now() });
    Ok(offset)
  }

  async fn read_after(&self, offset: u64) -> Result<Vec<LogEntry>, LogError> {
    let entries = self.entries.lock().await;
    // Offsets are contiguous from 1, so entry `n` lives at index `n - 1`.
    let start = usize::try_from(offset).unwrap_or(usize::MAX).min(entries.len());
    Ok(entries[start..].to_vec())
  }
}
