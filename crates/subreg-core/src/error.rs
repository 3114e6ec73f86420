//! Error types for `subreg-core`.
//!
//! [`Error`] is the closed set of failure kinds the registry reports. Every
//! layer raises the most specific kind it can; the REST boundary maps each
//! kind exactly once to a stable numeric code and a status class.

use thiserror::Error;

use crate::lifecycle::DeleteMode;

#[derive(Debug, Error)]
pub enum Error {
  #[error("Subject '{0}' not found.")]
  SubjectNotFound(String),

  #[error("Schema not found")]
  SchemaNotFound,

  /// A soft delete hit an already soft-deleted subject, or a permanent
  /// delete hit a subject that still has live versions. `mode` is the delete
  /// that was requested.
  #[error("{}", not_soft_deleted_message(.subject, *.mode))]
  SubjectNotSoftDeleted { subject: String, mode: DeleteMode },

  #[error("{0}")]
  InvalidSchema(String),

  #[error("{0}")]
  InvalidSubject(String),

  /// Blocks a permanent delete; the message names the referencing version.
  #[error("{0}")]
  ReferenceExists(String),

  #[error("{0}")]
  OperationNotPermitted(String),

  #[error("{0}")]
  OperationTimeout(String),

  #[error("{0}")]
  ForwardingFailed(String),

  #[error("{0}")]
  Store(String),

  #[error("{0}")]
  Internal(String),
}

fn not_soft_deleted_message(subject: &str, mode: DeleteMode) -> String {
  match mode {
    DeleteMode::Soft => format!(
      "Subject '{subject}' was soft deleted. Set permanent=true to delete permanently"
    ),
    DeleteMode::Permanent => format!(
      "Subject '{subject}' was not deleted first before being permanently deleted"
    ),
  }
}

// ─── Stable codes ────────────────────────────────────────────────────────────

pub const SUBJECT_NOT_FOUND: u32 = 40401;
pub const SCHEMA_NOT_FOUND: u32 = 40403;
pub const SUBJECT_SOFT_DELETED: u32 = 40404;
pub const SUBJECT_NOT_SOFT_DELETED: u32 = 40405;
pub const INVALID_SCHEMA: u32 = 42201;
pub const OPERATION_NOT_PERMITTED: u32 = 42205;
pub const REFERENCE_EXISTS: u32 = 42206;
pub const INVALID_SUBJECT: u32 = 42208;
pub const INTERNAL: u32 = 50000;
pub const STORE_ERROR: u32 = 50001;
pub const OPERATION_TIMEOUT: u32 = 50002;
pub const FORWARDING_FAILED: u32 = 50003;

impl Error {
  /// The stable numeric code reported to callers for this kind.
  pub fn code(&self) -> u32 {
    match self {
      Error::SubjectNotFound(_) => SUBJECT_NOT_FOUND,
      Error::SchemaNotFound => SCHEMA_NOT_FOUND,
      Error::SubjectNotSoftDeleted { mode: DeleteMode::Soft, .. } => {
        SUBJECT_SOFT_DELETED
      }
      Error::SubjectNotSoftDeleted { mode: DeleteMode::Permanent, .. } => {
        SUBJECT_NOT_SOFT_DELETED
      }
      Error::InvalidSchema(_) => INVALID_SCHEMA,
      Error::InvalidSubject(_) => INVALID_SUBJECT,
      Error::ReferenceExists(_) => REFERENCE_EXISTS,
      Error::OperationNotPermitted(_) => OPERATION_NOT_PERMITTED,
      Error::OperationTimeout(_) => OPERATION_TIMEOUT,
      Error::ForwardingFailed(_) => FORWARDING_FAILED,
      Error::Store(_) => STORE_ERROR,
      Error::Internal(_) => INTERNAL,
    }
  }

  /// Rebuild an error reported by a remote node from its code and message.
  ///
  /// `subject` is the qualified subject the remote call was about; the
  /// subject-bearing kinds are re-rendered from it. Unknown codes become
  /// [`Error::Internal`] carrying the remote message.
  pub fn from_code(code: u32, message: String, subject: &str) -> Self {
    let subject = subject.to_owned();
    match code {
      SUBJECT_NOT_FOUND => Error::SubjectNotFound(subject),
      SCHEMA_NOT_FOUND => Error::SchemaNotFound,
      SUBJECT_SOFT_DELETED => Error::SubjectNotSoftDeleted {
        subject,
        mode: DeleteMode::Soft,
      },
      SUBJECT_NOT_SOFT_DELETED => Error::SubjectNotSoftDeleted {
        subject,
        mode: DeleteMode::Permanent,
      },
      INVALID_SCHEMA => Error::InvalidSchema(message),
      INVALID_SUBJECT => Error::InvalidSubject(message),
      REFERENCE_EXISTS => Error::ReferenceExists(message),
      OPERATION_NOT_PERMITTED => Error::OperationNotPermitted(message),
      OPERATION_TIMEOUT => Error::OperationTimeout(message),
      FORWARDING_FAILED => Error::ForwardingFailed(message),
      STORE_ERROR => Error::Store(message),
      _ => Error::Internal(message),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn soft_and_permanent_conflicts_have_distinct_codes() {
    let soft = Error::SubjectNotSoftDeleted {
      subject: "orders-value".into(),
      mode:    DeleteMode::Soft,
    };
    let permanent = Error::SubjectNotSoftDeleted {
      subject: "orders-value".into(),
      mode:    DeleteMode::Permanent,
    };
    assert_eq!(soft.code(), SUBJECT_SOFT_DELETED);
    assert_eq!(permanent.code(), SUBJECT_NOT_SOFT_DELETED);
    assert!(soft.to_string().contains("permanent=true"));
    assert!(permanent.to_string().contains("not deleted first"));
  }

  #[test]
  fn from_code_restores_kind() {
    let err = Error::from_code(REFERENCE_EXISTS, "referenced".into(), "a");
    assert!(matches!(err, Error::ReferenceExists(ref m) if m == "referenced"));

    let err = Error::from_code(SUBJECT_NOT_FOUND, "ignored".into(), "a");
    assert!(matches!(err, Error::SubjectNotFound(ref s) if s == "a"));

    let err = Error::from_code(SUBJECT_SOFT_DELETED, String::new(), "a");
    assert_eq!(err.code(), SUBJECT_SOFT_DELETED);
  }

  #[test]
  fn unknown_code_is_internal() {
    let err = Error::from_code(99999, "boom".into(), "a");
    assert!(matches!(err, Error::Internal(ref m) if m == "boom"));
  }
}
