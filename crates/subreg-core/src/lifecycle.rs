//! The subject delete lifecycle.
//!
//! ```text
//! ABSENT ──register──▶ LIVE ──soft delete──▶ SOFT_DELETED ──permanent delete──▶ ABSENT
//! ```
//!
//! There is no direct permanent delete from LIVE. Planning a delete is a pure
//! function of the catalog; the resulting [`LogOp`] is what gets appended.

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  catalog::CatalogIndex,
  log::LogOp,
  qualified::QualifiedSubject,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteMode {
  Soft,
  Permanent,
}

impl DeleteMode {
  pub fn from_permanent(permanent: bool) -> Self {
    if permanent { Self::Permanent } else { Self::Soft }
  }

  pub fn is_permanent(self) -> bool { self == Self::Permanent }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectState {
  /// No versions of any kind.
  Absent,
  /// At least one live version.
  Live,
  /// Only soft-deleted versions remain.
  SoftDeleted,
}

/// The versions that changed state in a delete, in ascending order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRecord {
  pub subject:  QualifiedSubject,
  pub mode:     DeleteMode,
  pub versions: Vec<u32>,
}

/// Reject a delete that the subject's current state does not allow.
pub fn check_delete(
  state: SubjectState,
  subject: &QualifiedSubject,
  mode: DeleteMode,
) -> Result<()> {
  match (state, mode) {
    (SubjectState::Absent, _) => Err(Error::SubjectNotFound(subject.to_string())),
    (SubjectState::SoftDeleted, DeleteMode::Soft)
    | (SubjectState::Live, DeleteMode::Permanent) => {
      Err(Error::SubjectNotSoftDeleted {
        subject: subject.to_string(),
        mode,
      })
    }
    _ => Ok(()),
  }
}

/// Decide what a delete of `subject` would do against `index`.
///
/// On success returns the op to append and the record to hand back to the
/// caller. Nothing is mutated here, so a rejected delete changes nothing.
pub fn plan_delete(
  index: &CatalogIndex,
  subject: &QualifiedSubject,
  mode: DeleteMode,
) -> Result<(LogOp, DeleteRecord)> {
  check_delete(index.state(subject), subject, mode)?;

  let versions: Vec<u32> = index
    .versions(subject, mode.is_permanent())
    .map(|v| v.version)
    .collect();

  let op = match mode {
    DeleteMode::Soft => LogOp::SoftDelete {
      subject:  subject.clone(),
      versions: versions.clone(),
    },
    DeleteMode::Permanent => {
      for version in &versions {
        if let Some(referrer) = index.referenced_by(subject, *version).first() {
          return Err(Error::ReferenceExists(format!(
            "One or more references exist to the schema \
             {{subject={subject}, version={version}}}, \
             e.g. from {{subject={}, version={}}}",
            referrer.subject, referrer.version
          )));
        }
      }
      LogOp::PermanentDelete {
        subject:  subject.clone(),
        versions: versions.clone(),
      }
    }
  };

  Ok((op, DeleteRecord {
    subject: subject.clone(),
    mode,
    versions,
  }))
}
