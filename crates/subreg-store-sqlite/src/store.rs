//! [`SqliteLog`], the SQLite implementation of [`SchemaLog`].

use std::path::Path;

use chrono::Utc;
use subreg_core::log::{Leadership, LogEntry, LogError, LogOp, SchemaLog};
use tokio::sync::watch;
use tracing::debug;

use crate::{
  Result,
  encode::{RawEntry, decode_offset, encode_dt, encode_offset, encode_op, encode_op_kind},
  schema::SCHEMA,
};

// ─── Log ─────────────────────────────────────────────────────────────────────

/// The registry log backed by a single SQLite file.
///
/// Leadership is supplied by the process (configuration or an external
/// election) and can be changed at runtime with
/// [`SqliteLog::set_leadership`]. A handle that is not the leader refuses to
/// append.
pub struct SqliteLog {
  conn:       tokio_rusqlite::Connection,
  leadership: watch::Sender<Leadership>,
}

impl SqliteLog {
  /// Open (or create) a log at `path` and run schema initialisation. The
  /// handle starts out as the leader.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory log, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(Self {
      conn,
      leadership: watch::Sender::new(Leadership::Leader),
    })
  }

  pub fn with_leadership(self, leadership: Leadership) -> Self {
    self.leadership.send_replace(leadership);
    self
  }

  pub fn set_leadership(&self, leadership: Leadership) {
    self.leadership.send_replace(leadership);
  }

  /// Offset of the newest entry, 0 when empty.
  pub async fn tail(&self) -> Result<u64> {
    let raw: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row(
          "SELECT COALESCE(MAX(log_offset), 0) FROM log_entries",
          [],
          |row| row.get(0),
        )?)
      })
      .await?;
    decode_offset(raw)
  }

  async fn insert(&self, op: &LogOp) -> Result<u64> {
    let kind        = encode_op_kind(op).to_owned();
    let subject     = op.subject().to_string();
    let op_json     = encode_op(op)?;
    let appended_at = encode_dt(Utc::now());

    let offset: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO log_entries (op_kind, subject, op_json, appended_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![kind, subject, op_json, appended_at],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;
    decode_offset(offset)
  }

  async fn select_after(&self, offset: u64) -> Result<Vec<LogEntry>> {
    let after = encode_offset(offset)?;

    let raws: Vec<RawEntry> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT log_offset, op_json, appended_at
           FROM log_entries
           WHERE log_offset > ?1
           ORDER BY log_offset",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![after], |row| {
            Ok(RawEntry {
              log_offset:  row.get(0)?,
              op_json:     row.get(1)?,
              appended_at: row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEntry::into_entry).collect()
  }
}

// ─── SchemaLog impl ──────────────────────────────────────────────────────────

impl SchemaLog for SqliteLog {
  fn leadership(&self) -> Leadership { self.leadership.borrow().clone() }

  async fn append(&self, op: LogOp) -> std::result::Result<u64, LogError> {
    if !self.leadership.borrow().is_leader() {
      return Err(LogError::NotLeader);
    }
    let offset = self.insert(&op).await?;
    debug!(offset, subject = %op.subject(), kind = encode_op_kind(&op), "log entry appended");
    Ok(offset)
  }

  async fn read_after(&self, offset: u64) -> std::result::Result<Vec<LogEntry>, LogError> {
    Ok(self.select_after(offset).await?)
  }
}
