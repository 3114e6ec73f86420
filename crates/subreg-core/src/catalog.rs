//! The subject catalog: an in-memory index over the log.
//!
//! [`CatalogIndex`] is a plain value. It is only ever changed by
//! [`CatalogIndex::apply`], which consumes log entries in offset order; the
//! registry wraps it in a lock and funnels every entry through a single
//! applier.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::{
  Error, Result,
  format::{Fingerprint, SchemaFormat},
  lifecycle::SubjectState,
  log::{LogEntry, LogOp},
  qualified::{QualifiedSubject, SubjectPrefix},
  schema::{SchemaCandidate, SchemaReference, SchemaVersion},
};

/// Result of [`CatalogIndex::find_exact_match`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
  Found(SchemaVersion),
  /// The subject exists under the deleted-inclusion policy but no version
  /// matches.
  NoMatch,
  /// The subject has no versions under the deleted-inclusion policy.
  NoSubject,
}

impl LookupOutcome {
  pub fn into_result(self, subject: &QualifiedSubject) -> Result<SchemaVersion> {
    match self {
      LookupOutcome::Found(v) => Ok(v),
      LookupOutcome::NoMatch => Err(Error::SchemaNotFound),
      LookupOutcome::NoSubject => Err(Error::SubjectNotFound(subject.to_string())),
    }
  }
}

/// Fingerprints of one stored version, computed once when it is applied.
#[derive(Debug, Clone)]
struct Fingerprints {
  raw:        Fingerprint,
  normalized: Fingerprint,
}

#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
  subjects:        BTreeMap<QualifiedSubject, BTreeMap<u32, SchemaVersion>>,
  /// Absent for a stored schema the format could not read.
  fingerprints:    HashMap<(QualifiedSubject, u32), Fingerprints>,
  /// Highest version ever assigned per subject; survives permanent delete.
  highest_version: HashMap<QualifiedSubject, u32>,
  max_id:          i64,
  applied:         u64,
}

impl CatalogIndex {
  // ── Application ───────────────────────────────────────────────────────

  /// Offset of the last applied entry; 0 before anything is applied.
  pub fn applied_offset(&self) -> u64 { self.applied }

  /// Apply one log entry. Entries at or below the applied offset are
  /// ignored, so replaying a range is harmless. `format` fingerprints
  /// registered versions.
  pub fn apply(&mut self, entry: &LogEntry, format: &dyn SchemaFormat) {
    if entry.offset <= self.applied {
      return;
    }
    match &entry.op {
      LogOp::Register { version } => {
        let highest = self.highest_version.entry(version.subject.clone()).or_default();
        *highest = (*highest).max(version.version);
        self.max_id = self.max_id.max(version.id);
        let key = (version.subject.clone(), version.version);
        match fingerprints_of(format, version) {
          Some(f) => self.fingerprints.insert(key, f),
          None => self.fingerprints.remove(&key),
        };
        self
          .subjects
          .entry(version.subject.clone())
          .or_default()
          .insert(version.version, version.clone());
      }
      LogOp::SoftDelete { subject, versions } => {
        if let Some(rows) = self.subjects.get_mut(subject) {
          for v in versions {
            if let Some(row) = rows.get_mut(v) {
              row.deleted = true;
            }
          }
        }
      }
      LogOp::PermanentDelete { subject, versions } => {
        if let Some(rows) = self.subjects.get_mut(subject) {
          for v in versions {
            rows.remove(v);
            self.fingerprints.remove(&(subject.clone(), *v));
          }
          if rows.is_empty() {
            self.subjects.remove(subject);
          }
        }
      }
    }
    self.applied = entry.offset;
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  pub fn state(&self, subject: &QualifiedSubject) -> SubjectState {
    match self.subjects.get(subject) {
      None => SubjectState::Absent,
      Some(rows) if rows.values().any(SchemaVersion::is_live) => SubjectState::Live,
      Some(_) => SubjectState::SoftDeleted,
    }
  }

  /// True iff at least one version passes the deleted-inclusion policy.
  pub fn has_subject(&self, subject: &QualifiedSubject, include_deleted: bool) -> bool {
    self.versions(subject, include_deleted).next().is_some()
  }

  /// Versions of `subject` in ascending order; live only unless
  /// `include_deleted`.
  pub fn versions<'a>(
    &'a self,
    subject: &QualifiedSubject,
    include_deleted: bool,
  ) -> impl Iterator<Item = &'a SchemaVersion> + 'a {
    self
      .subjects
      .get(subject)
      .into_iter()
      .flat_map(BTreeMap::values)
      .filter(move |v| include_deleted || v.is_live())
  }

  pub fn get(&self, subject: &QualifiedSubject, version: u32) -> Option<&SchemaVersion> {
    self.subjects.get(subject)?.get(&version)
  }

  /// Distinct subjects matching `prefix` with at least one version under the
  /// deleted-inclusion policy.
  pub fn list_subjects(
    &self,
    prefix: &SubjectPrefix,
    include_deleted: bool,
  ) -> BTreeSet<QualifiedSubject> {
    self
      .subjects
      .iter()
      .filter(|(subject, _)| prefix.matches(subject))
      .filter(|(_, rows)| include_deleted || rows.values().any(SchemaVersion::is_live))
      .map(|(subject, _)| subject.clone())
      .collect()
  }

  /// Find the first version of `subject` equal to `candidate`.
  ///
  /// The candidate is validated before anything is compared, so an invalid
  /// schema is reported as [`Error::InvalidSchema`] whether or not the
  /// subject exists. `candidate.references` must already be resolved.
  pub fn find_exact_match(
    &self,
    subject: &QualifiedSubject,
    candidate: &SchemaCandidate,
    format: &dyn SchemaFormat,
    normalize: bool,
    include_deleted: bool,
  ) -> Result<LookupOutcome> {
    let wanted = format.fingerprint(
      candidate.schema_type,
      &candidate.schema,
      &candidate.references,
      normalize,
    )?;

    if !self.has_subject(subject, include_deleted) {
      return Ok(LookupOutcome::NoSubject);
    }
    for version in self.versions(subject, include_deleted) {
      if self.stored_fingerprint(version, normalize)? == &wanted {
        return Ok(LookupOutcome::Found(version.clone()));
      }
    }
    Ok(LookupOutcome::NoMatch)
  }

  /// The id of a schema identical to `fingerprint` anywhere in the registry.
  pub fn find_id(&self, fingerprint: &Fingerprint) -> Result<Option<i64>> {
    for version in self.subjects.values().flat_map(BTreeMap::values) {
      if self.stored_fingerprint(version, false)? == fingerprint {
        return Ok(Some(version.id));
      }
    }
    Ok(None)
  }

  /// Versions of other subjects whose references point at
  /// `subject`/`version`.
  pub fn referenced_by(&self, subject: &QualifiedSubject, version: u32) -> Vec<&SchemaVersion> {
    let target = subject.to_string();
    self
      .subjects
      .iter()
      .filter(|(other, _)| *other != subject)
      .flat_map(|(_, rows)| rows.values())
      .filter(|v| {
        v.references
          .iter()
          .any(|r| r.subject == target && r.version == version)
      })
      .collect()
  }

  /// Validate and normalize `references` under `tenant`, requiring each to
  /// name an existing version (live or soft-deleted).
  pub fn resolve_references(
    &self,
    tenant: &str,
    references: &[SchemaReference],
  ) -> Result<Vec<SchemaReference>> {
    references
      .iter()
      .map(|r| {
        r.validate()?;
        let subject = QualifiedSubject::normalize(tenant, &r.subject).map_err(|e| {
          Error::InvalidSchema(format!("Invalid reference '{}': {e}", r.name))
        })?;
        if self.get(&subject, r.version).is_none() {
          return Err(Error::InvalidSchema(format!(
            "Reference '{}' points at {{subject={subject}, version={}}} which does not exist",
            r.name, r.version
          )));
        }
        Ok(SchemaReference {
          name:    r.name.clone(),
          subject: subject.to_string(),
          version: r.version,
        })
      })
      .collect()
  }

  /// Highest version ever assigned to `subject`, 0 if none.
  pub fn highest_version(&self, subject: &QualifiedSubject) -> u32 {
    self.highest_version.get(subject).copied().unwrap_or(0)
  }

  /// Highest global id ever assigned, 0 if none.
  pub fn max_id(&self) -> i64 { self.max_id }

  fn stored_fingerprint(&self, version: &SchemaVersion, normalize: bool) -> Result<&Fingerprint> {
    let key = (version.subject.clone(), version.version);
    let stored = self.fingerprints.get(&key).ok_or_else(|| {
      Error::Internal(format!(
        "Stored schema {{subject={}, version={}}} is unreadable",
        version.subject, version.version
      ))
    })?;
    Ok(if normalize { &stored.normalized } else { &stored.raw })
  }
}

fn fingerprints_of(format: &dyn SchemaFormat, version: &SchemaVersion) -> Option<Fingerprints> {
  let of = |normalize| {
    format
      .fingerprint(version.schema_type, &version.schema, &version.references, normalize)
      .ok()
  };
  Some(Fingerprints { raw: of(false)?, normalized: of(true)? })
}
