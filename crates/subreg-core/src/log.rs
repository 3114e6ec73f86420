//! The authoritative log and the leader-forwarding collaborator.
//!
//! The log is an opaque ordered-append store. Only the leader may append;
//! every node reads it in offset order to keep its catalog current. Writes
//! that arrive at a follower are handed to a [`Forwarder`] instead.

use std::{collections::BTreeMap, future::Future};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
  qualified::QualifiedSubject,
  schema::{RegisteredSchema, SchemaCandidate, SchemaVersion},
};

// ─── Entries ─────────────────────────────────────────────────────────────────

/// A state change recorded in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LogOp {
  Register {
    version: SchemaVersion,
  },
  SoftDelete {
    subject:  QualifiedSubject,
    versions: Vec<u32>,
  },
  PermanentDelete {
    subject:  QualifiedSubject,
    versions: Vec<u32>,
  },
}

impl LogOp {
  pub fn subject(&self) -> &QualifiedSubject {
    match self {
      LogOp::Register { version } => &version.subject,
      LogOp::SoftDelete { subject, .. } | LogOp::PermanentDelete { subject, .. } => {
        subject
      }
    }
  }
}

/// An appended [`LogOp`]. Offsets start at 1 and strictly increase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
  pub offset:      u64,
  pub op:          LogOp,
  pub appended_at: DateTime<Utc>,
}

// ─── Leadership ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Leadership {
  Leader,
  Follower { leader_url: Option<String> },
}

impl Leadership {
  pub fn is_leader(&self) -> bool { matches!(self, Self::Leader) }
}

// ─── Log trait ───────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LogError {
  /// The append was rejected because this node is not (or no longer) the
  /// leader. Nothing was written.
  #[error("this node is not the leader")]
  NotLeader,

  #[error("log store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<LogError> for crate::Error {
  fn from(e: LogError) -> Self {
    match e {
      LogError::NotLeader => crate::Error::OperationTimeout(
        "Leadership changed while writing to the log; retry the request".into(),
      ),
      LogError::Store(e) => crate::Error::Store(format!("Error in the backend datastore: {e}")),
    }
  }
}

/// The authoritative, totally ordered history of the registry.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait SchemaLog: Send + Sync {
  /// This node's current view of leadership.
  fn leadership(&self) -> Leadership;

  /// Durably append `op` and return its offset.
  ///
  /// Fails with [`LogError::NotLeader`] if this node cannot append.
  fn append(
    &self,
    op: LogOp,
  ) -> impl Future<Output = Result<u64, LogError>> + Send + '_;

  /// Every entry with an offset greater than `offset`, in offset order.
  fn read_after(
    &self,
    offset: u64,
  ) -> impl Future<Output = Result<Vec<LogEntry>, LogError>> + Send + '_;
}

// ─── Forwarding ──────────────────────────────────────────────────────────────

/// Header name (lower-cased) to value, as carried on a forwarded request.
pub type ForwardHeaders = BTreeMap<String, String>;

/// Sends a write to the current leader. One method per forwarded call.
pub trait Forwarder: Send + Sync {
  /// Forward a subject delete; returns the affected version numbers.
  fn forward_delete<'a>(
    &'a self,
    leader_url: &'a str,
    subject: &'a QualifiedSubject,
    permanent: bool,
    headers: &'a ForwardHeaders,
  ) -> impl Future<Output = crate::Result<Vec<u32>>> + Send + 'a;

  /// Forward a schema registration.
  fn forward_register<'a>(
    &'a self,
    leader_url: &'a str,
    subject: &'a QualifiedSubject,
    candidate: &'a SchemaCandidate,
    normalize: bool,
    headers: &'a ForwardHeaders,
  ) -> impl Future<Output = crate::Result<RegisteredSchema>> + Send + 'a;
}

/// Keep only the whitelisted headers. Names match case-insensitively and are
/// lower-cased in the result.
pub fn filter_headers<'a, I>(headers: I, whitelist: &[String]) -> ForwardHeaders
where
  I: IntoIterator<Item = (&'a str, &'a str)>,
{
  headers
    .into_iter()
    .filter(|(name, _)| whitelist.iter().any(|w| w.eq_ignore_ascii_case(name)))
    .map(|(name, value)| (name.to_ascii_lowercase(), value.to_owned()))
    .collect()
}
