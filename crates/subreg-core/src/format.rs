//! The format-specific schema collaborator.
//!
//! The registry never interprets a schema itself. It asks a [`SchemaFormat`]
//! to validate and canonicalize the text, then compares SHA-256
//! [`Fingerprint`]s of the canonical form together with the schema type and
//! the reference list.

use std::fmt::Write as _;

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::{
  Error, Result,
  schema::{SchemaReference, SchemaType},
};

/// Validates and canonicalizes schema text for one or more schema types.
pub trait SchemaFormat: Send + Sync {
  /// Return the canonical text of `schema`, or [`Error::InvalidSchema`] if it
  /// is structurally invalid. With `normalize` set, the format may
  /// additionally drop documentation and other non-semantic detail.
  fn canonicalize(
    &self,
    schema_type: SchemaType,
    schema: &str,
    normalize: bool,
  ) -> Result<String>;

  /// Fingerprint a schema for equality comparison.
  fn fingerprint(
    &self,
    schema_type: SchemaType,
    schema: &str,
    references: &[SchemaReference],
    normalize: bool,
  ) -> Result<Fingerprint> {
    let canonical = self.canonicalize(schema_type, schema, normalize)?;
    Ok(Fingerprint::compute(schema_type, &canonical, references))
  }
}

/// Hex SHA-256 over schema type, canonical text and references.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
  pub fn compute(
    schema_type: SchemaType,
    canonical: &str,
    references: &[SchemaReference],
  ) -> Self {
    let type_name: &str = schema_type.as_ref();
    let mut hasher = Sha256::new();
    hasher.update(type_name);
    hasher.update([0]);
    hasher.update(canonical);
    for r in references {
      hasher.update([0]);
      hasher.update(&r.name);
      hasher.update([0]);
      hasher.update(&r.subject);
      hasher.update([0]);
      hasher.update(r.version.to_be_bytes());
    }
    Self(hex::encode(hasher.finalize()))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

// ─── Bundled implementation ──────────────────────────────────────────────────

/// Format support without a full schema compiler.
///
/// - AVRO and JSON must parse as JSON; the canonical form is compact JSON with
///   object keys sorted. Normalizing strips `doc`/`aliases` (AVRO) or
///   `description`/`$comment` (JSON) annotations.
/// - PROTOBUF canonical form drops `//` comments and blank lines and trims
///   each line. Normalizing also collapses runs of whitespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicFormat;

impl SchemaFormat for BasicFormat {
  fn canonicalize(
    &self,
    schema_type: SchemaType,
    schema: &str,
    normalize: bool,
  ) -> Result<String> {
    if schema.trim().is_empty() {
      return Err(Error::InvalidSchema("Empty schema".into()));
    }
    match schema_type {
      SchemaType::Avro => canonical_json(schema, normalize, &["doc", "aliases"]),
      SchemaType::Json => {
        canonical_json(schema, normalize, &["description", "$comment"])
      }
      SchemaType::Protobuf => canonical_proto(schema, normalize),
    }
  }
}

fn canonical_json(schema: &str, normalize: bool, annotations: &[&str]) -> Result<String> {
  let mut value: Value = serde_json::from_str(schema)
    .map_err(|e| Error::InvalidSchema(format!("Invalid schema: {e}")))?;
  if normalize {
    strip_keys(&mut value, annotations);
  }
  let mut out = String::with_capacity(schema.len());
  write_sorted(&value, &mut out);
  Ok(out)
}

fn strip_keys(value: &mut Value, keys: &[&str]) {
  match value {
    Value::Object(map) => {
      map.retain(|k, _| !keys.contains(&k.as_str()));
      map.values_mut().for_each(|v| strip_keys(v, keys));
    }
    Value::Array(items) => items.iter_mut().for_each(|v| strip_keys(v, keys)),
    _ => {}
  }
}

/// Compact JSON with object keys in sorted order regardless of map backing.
fn write_sorted(value: &Value, out: &mut String) {
  match value {
    Value::Object(map) => {
      let mut keys: Vec<&String> = map.keys().collect();
      keys.sort();
      out.push('{');
      for (i, k) in keys.into_iter().enumerate() {
        if i > 0 {
          out.push(',');
        }
        // Serialising a str to JSON cannot fail.
        let _ = write!(out, "{}:", Value::String(k.clone()));
        write_sorted(&map[k], out);
      }
      out.push('}');
    }
    Value::Array(items) => {
      out.push('[');
      for (i, v) in items.iter().enumerate() {
        if i > 0 {
          out.push(',');
        }
        write_sorted(v, out);
      }
      out.push(']');
    }
    scalar => {
      let _ = write!(out, "{scalar}");
    }
  }
}

/// Cut `line` at a `//` comment that is not inside a string literal.
fn strip_line_comment(line: &str) -> &str {
  let bytes = line.as_bytes();
  let mut quote: Option<u8> = None;
  let mut i = 0;
  while i < bytes.len() {
    match (quote, bytes[i]) {
      (Some(_), b'\\') => i += 1,
      (Some(q), b) if b == q => quote = None,
      (None, b'"' | b'\'') => quote = Some(bytes[i]),
      (None, b'/') if bytes.get(i + 1) == Some(&b'/') => return &line[..i],
      _ => {}
    }
    i += 1;
  }
  line
}

fn canonical_proto(schema: &str, normalize: bool) -> Result<String> {
  let lines: Vec<String> = schema
    .lines()
    .map(strip_line_comment)
    .map(str::trim)
    .filter(|line| !line.is_empty())
    .map(|line| {
      if normalize {
        line.split_whitespace().collect::<Vec<_>>().join(" ")
      } else {
        line.to_owned()
      }
    })
    .collect();

  if lines.is_empty() {
    return Err(Error::InvalidSchema(
      "Protobuf schema has no definitions".into(),
    ));
  }
  Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
  use super::*;

  const RECORD: &str = r#"{"type":"record","name":"Order","fields":[{"name":"id","type":"long"}]}"#;

  #[test]
  fn json_key_order_and_whitespace_do_not_matter() {
    let a = BasicFormat.canonicalize(SchemaType::Avro, RECORD, false).unwrap();
    let b = BasicFormat
      .canonicalize(
        SchemaType::Avro,
        r#"{ "name": "Order", "fields": [ {"type": "long", "name": "id"} ], "type": "record" }"#,
        false,
      )
      .unwrap();
    assert_eq!(a, b);
  }

  #[test]
  fn avro_doc_only_ignored_when_normalizing() {
    let documented = r#"{"type":"record","name":"Order","doc":"an order","fields":[{"name":"id","type":"long","doc":"pk"}]}"#;
    let plain = BasicFormat.canonicalize(SchemaType::Avro, RECORD, false).unwrap();
    let raw = BasicFormat.canonicalize(SchemaType::Avro, documented, false).unwrap();
    let normalized = BasicFormat.canonicalize(SchemaType::Avro, documented, true).unwrap();
    assert_ne!(plain, raw);
    assert_eq!(plain, normalized);
  }

  #[test]
  fn malformed_json_is_invalid_schema() {
    let err = BasicFormat
      .canonicalize(SchemaType::Json, "{not json", false)
      .unwrap_err();
    assert!(matches!(err, Error::InvalidSchema(_)));
  }

  #[test]
  fn empty_schema_is_invalid() {
    assert!(matches!(
      BasicFormat.canonicalize(SchemaType::Protobuf, "  \n ", false),
      Err(Error::InvalidSchema(_))
    ));
  }

  #[test]
  fn proto_comments_are_ignored() {
    let a = "syntax = \"proto3\";\nmessage Order {\n  int64 id = 1;\n}\n";
    let b = "// orders\nsyntax = \"proto3\";\n\nmessage Order {\n  int64 id = 1; // primary key\n}";
    let ca = BasicFormat.canonicalize(SchemaType::Protobuf, a, false).unwrap();
    let cb = BasicFormat.canonicalize(SchemaType::Protobuf, b, false).unwrap();
    assert_eq!(ca, cb);
  }

  #[test]
  fn proto_slashes_inside_strings_are_kept() {
    let a = "option go_package = \"http://acme.io/orders\"; // pkg";
    let b = "option go_package = \"http://acme.io/payments\";";
    let ca = BasicFormat.canonicalize(SchemaType::Protobuf, a, false).unwrap();
    let cb = BasicFormat.canonicalize(SchemaType::Protobuf, b, false).unwrap();
    assert_eq!(ca, "option go_package = \"http://acme.io/orders\";");
    assert_ne!(ca, cb);
    assert_eq!(strip_line_comment(r#"x = 'a\'//b'; // c"#), r#"x = 'a\'//b'; "#);
  }

  #[test]
  fn proto_normalize_collapses_whitespace() {
    let a = "message Order {\n  int64   id = 1;\n}";
    let b = "message Order {\n  int64 id = 1;\n}";
    let fa = BasicFormat.fingerprint(SchemaType::Protobuf, a, &[], true).unwrap();
    let fb = BasicFormat.fingerprint(SchemaType::Protobuf, b, &[], true).unwrap();
    assert_eq!(fa, fb);
    let fa = BasicFormat.fingerprint(SchemaType::Protobuf, a, &[], false).unwrap();
    assert_ne!(fa, fb);
  }

  #[test]
  fn fingerprint_covers_type_and_references() {
    let r = SchemaReference {
      name:    "Address".into(),
      subject: "address-value".into(),
      version: 1,
    };
    let plain = BasicFormat.fingerprint(SchemaType::Avro, RECORD, &[], false).unwrap();
    let with_ref = BasicFormat
      .fingerprint(SchemaType::Avro, RECORD, std::slice::from_ref(&r), false)
      .unwrap();
    let as_json = BasicFormat.fingerprint(SchemaType::Json, RECORD, &[], false).unwrap();
    assert_ne!(plain, with_ref);
    assert_ne!(plain, as_json);
    assert_eq!(plain.as_str().len(), 64);
  }
}
