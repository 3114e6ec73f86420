//! Encoding and decoding helpers between log types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings; ops as tagged JSON.

use chrono::{DateTime, Utc};
use subreg_core::log::{LogEntry, LogOp};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── LogOp ───────────────────────────────────────────────────────────────────

pub fn encode_op_kind(op: &LogOp) -> &'static str {
  match op {
    LogOp::Register { .. } => "register",
    LogOp::SoftDelete { .. } => "soft_delete",
    LogOp::PermanentDelete { .. } => "permanent_delete",
  }
}

pub fn encode_op(op: &LogOp) -> Result<String> { Ok(serde_json::to_string(op)?) }

pub fn decode_op(s: &str) -> Result<LogOp> { Ok(serde_json::from_str(s)?) }

// ─── Offsets ─────────────────────────────────────────────────────────────────

pub fn encode_offset(offset: u64) -> Result<i64> {
  i64::try_from(offset).map_err(|_| Error::Offset(i64::MAX))
}

pub fn decode_offset(raw: i64) -> Result<u64> {
  u64::try_from(raw).map_err(|_| Error::Offset(raw))
}

// ─── Raw rows ────────────────────────────────────────────────────────────────

/// A `log_entries` row as read from SQLite.
pub struct RawEntry {
  pub log_offset:  i64,
  pub op_json:     String,
  pub appended_at: String,
}

impl RawEntry {
  pub fn into_entry(self) -> Result<LogEntry> {
    Ok(LogEntry {
      offset:      decode_offset(self.log_offset)?,
      op:          decode_op(&self.op_json)?,
      appended_at: decode_dt(&self.appended_at)?,
    })
  }
}
