//! Schema versions, the rows of the registry's append-only history.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{Error, Result, qualified::QualifiedSubject};

/// The format a schema is written in.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  EnumString,
  Display,
  AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum SchemaType {
  #[default]
  Avro,
  Protobuf,
  Json,
}

impl SchemaType {
  /// Parse an optional request-supplied type; absent means AVRO.
  pub fn parse(raw: Option<&str>) -> Result<Self> {
    match raw {
      None => Ok(Self::default()),
      Some(s) => s
        .parse()
        .map_err(|_| Error::InvalidSchema(format!("Unknown schema type: {s}"))),
    }
  }
}

/// A named dependency on a specific version of another subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaReference {
  pub name:    String,
  /// Rendered qualified subject of the referenced version.
  pub subject: String,
  pub version: u32,
}

impl SchemaReference {
  /// Structural checks; resolution against the catalog happens elsewhere.
  pub fn validate(&self) -> Result<()> {
    if self.name.trim().is_empty() {
      return Err(Error::InvalidSchema("Reference name must not be empty".into()));
    }
    if self.subject.trim().is_empty() {
      return Err(Error::InvalidSchema(format!(
        "Reference '{}' has an empty subject",
        self.name
      )));
    }
    if self.version == 0 {
      return Err(Error::InvalidSchema(format!(
        "Reference '{}' has an invalid version 0",
        self.name
      )));
    }
    Ok(())
  }
}

/// One registered version of a subject.
///
/// `version` is assigned once per subject and never reused; `id` is unique
/// registry-wide and shared by identical schemas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaVersion {
  pub subject:     QualifiedSubject,
  pub version:     u32,
  pub id:          i64,
  pub schema_type: SchemaType,
  pub references:  Vec<SchemaReference>,
  pub schema:      String,
  pub deleted:     bool,
}

impl SchemaVersion {
  pub fn is_live(&self) -> bool { !self.deleted }
}

/// A schema submitted for lookup or registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaCandidate {
  pub schema_type: SchemaType,
  pub references:  Vec<SchemaReference>,
  pub schema:      String,
}

/// The outcome of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredSchema {
  pub id:      i64,
  pub version: u32,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn schema_type_parses_case_insensitively() {
    assert_eq!(SchemaType::parse(None).unwrap(), SchemaType::Avro);
    assert_eq!(SchemaType::parse(Some("protobuf")).unwrap(), SchemaType::Protobuf);
    assert_eq!(SchemaType::parse(Some("JSON")).unwrap(), SchemaType::Json);
    assert_eq!(SchemaType::Protobuf.to_string(), "PROTOBUF");
  }

  #[test]
  fn unknown_schema_type_is_invalid_schema() {
    assert!(matches!(
      SchemaType::parse(Some("THRIFT")),
      Err(Error::InvalidSchema(_))
    ));
  }

  #[test]
  fn reference_validation() {
    let ok = SchemaReference {
      name:    "com.acme.Address".into(),
      subject: "address-value".into(),
      version: 1,
    };
    assert!(ok.validate().is_ok());

    let no_version = SchemaReference { version: 0, ..ok.clone() };
    assert!(matches!(no_version.validate(), Err(Error::InvalidSchema(_))));

    let no_subject = SchemaReference { subject: " ".into(), ..ok };
    assert!(matches!(no_subject.validate(), Err(Error::InvalidSchema(_))));
  }
}
