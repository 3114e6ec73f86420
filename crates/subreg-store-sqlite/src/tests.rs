//! Integration tests for `SqliteLog` against in-memory and on-disk databases.

use subreg_core::{
  log::{ForwardHeaders, Forwarder, Leadership, LogError, LogOp, SchemaLog},
  qualified::QualifiedSubject,
  schema::{RegisteredSchema, SchemaCandidate, SchemaType, SchemaVersion},
};
use subreg_registry::{Registry, RegistryConfig};

use crate::SqliteLog;

async fn log() -> SqliteLog {
  SqliteLog::open_in_memory()
    .await
    .expect("in-memory log")
}

fn subject(name: &str) -> QualifiedSubject {
  QualifiedSubject::normalize("default", name).unwrap()
}

fn register(name: &str, version: u32, id: i64) -> LogOp {
  LogOp::Register {
    version: SchemaVersion {
      subject: subject(name),
      version,
      id,
      schema_type: SchemaType::Avro,
      references: vec![],
      schema: "\"string\"".into(),
      deleted: false,
    },
  }
}

// ─── Append & read ───────────────────────────────────────────────────────────

#[tokio::test]
async fn offsets_are_assigned_in_order() {
  let l = log().await;
  assert_eq!(l.tail().await.unwrap(), 0);
  assert_eq!(l.append(register("a", 1, 1)).await.unwrap(), 1);
  assert_eq!(l.append(register("a", 2, 2)).await.unwrap(), 2);
  assert_eq!(l.tail().await.unwrap(), 2);
}

#[tokio::test]
async fn read_after_returns_suffix_in_order() {
  let l = log().await;
  l.append(register("a", 1, 1)).await.unwrap();
  l.append(LogOp::SoftDelete { subject: subject("a"), versions: vec![1] })
    .await
    .unwrap();
  l.append(LogOp::PermanentDelete { subject: subject("a"), versions: vec![1] })
    .await
    .unwrap();

  let all = l.read_after(0).await.unwrap();
  assert_eq!(all.iter().map(|e| e.offset).collect::<Vec<_>>(), vec![1, 2, 3]);
  assert_eq!(all[0].op, register("a", 1, 1));

  let tail = l.read_after(2).await.unwrap();
  assert_eq!(tail.len(), 1);
  assert!(matches!(tail[0].op, LogOp::PermanentDelete { .. }));
}

#[tokio::test]
async fn follower_handle_refuses_appends() {
  let l = log()
    .await
    .with_leadership(Leadership::Follower { leader_url: Some("http://leader".into()) });
  assert!(matches!(l.append(register("a", 1, 1)).await, Err(LogError::NotLeader)));
  assert_eq!(l.tail().await.unwrap(), 0);

  l.set_leadership(Leadership::Leader);
  assert_eq!(l.append(register("a", 1, 1)).await.unwrap(), 1);
}

#[tokio::test]
async fn entries_survive_reopen() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("subreg.db");

  {
    let l = SqliteLog::open(&path).await.unwrap();
    l.append(register("orders-value", 1, 1)).await.unwrap();
  }

  let l = SqliteLog::open(&path).await.unwrap();
  let entries = l.read_after(0).await.unwrap();
  assert_eq!(entries.len(), 1);
  assert_eq!(entries[0].op.subject(), &subject("orders-value"));
}

// ─── Registry over SQLite ────────────────────────────────────────────────────

struct NoForward;

impl Forwarder for NoForward {
  async fn forward_delete<'a>(
    &'a self,
    _leader_url: &'a str,
    _subject: &'a QualifiedSubject,
    _permanent: bool,
    _headers: &'a ForwardHeaders,
  ) -> subreg_core::Result<Vec<u32>> {
    Err(subreg_core::Error::Internal("unexpected forward".into()))
  }

  async fn forward_register<'a>(
    &'a self,
    _leader_url: &'a str,
    _subject: &'a QualifiedSubject,
    _candidate: &'a SchemaCandidate,
    _normalize: bool,
    _headers: &'a ForwardHeaders,
  ) -> subreg_core::Result<RegisteredSchema> {
    Err(subreg_core::Error::Internal("unexpected forward".into()))
  }
}

#[tokio::test]
async fn registry_rebuilds_catalog_from_disk() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("subreg.db");
  let headers = ForwardHeaders::new();
  let candidate = |schema: &str| SchemaCandidate {
    schema_type: SchemaType::Avro,
    references:  vec![],
    schema:      schema.into(),
  };

  {
    let log = SqliteLog::open(&path).await.unwrap();
    let r = Registry::new(RegistryConfig::default(), log, NoForward);
    let s = r.normalize("orders-value").unwrap();
    r.register_or_forward(&headers, &s, &candidate("\"string\""), false).await.unwrap();
    r.register_or_forward(&headers, &s, &candidate("\"long\""), false).await.unwrap();
    assert_eq!(r.delete_subject_or_forward(&headers, &s, false).await.unwrap(), vec![1, 2]);
  }

  let log = SqliteLog::open(&path).await.unwrap();
  let r = Registry::new(RegistryConfig::default(), log, NoForward);
  assert_eq!(r.sync().await.unwrap(), 3);

  let s = r.normalize("orders-value").unwrap();
  assert!(!r.has_subject(&s, false).await);
  assert!(r.has_subject(&s, true).await);
  assert_eq!(r.delete_subject_or_forward(&headers, &s, true).await.unwrap(), vec![1, 2]);
  assert!(!r.has_subject(&s, true).await);
}
