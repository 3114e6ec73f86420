//! SQL schema for the subreg SQLite log.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Strictly append-only: no UPDATE or DELETE is ever issued against this
-- table. `log_offset` aliases the rowid, so offsets are assigned in order.
CREATE TABLE IF NOT EXISTS log_entries (
    log_offset  INTEGER PRIMARY KEY,
    op_kind     TEXT NOT NULL,   -- 'register' | 'soft_delete' | 'permanent_delete'
    subject     TEXT NOT NULL,   -- rendered qualified subject
    op_json     TEXT NOT NULL,   -- tagged JSON LogOp
    appended_at TEXT NOT NULL    -- ISO 8601 UTC
);

CREATE INDEX IF NOT EXISTS log_entries_subject_idx ON log_entries(subject);

PRAGMA user_version = 1;
";
