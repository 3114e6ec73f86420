//! Qualified subject names.
//!
//! A caller-supplied subject string is resolved against the serving tenant
//! into a [`QualifiedSubject`]. The textual form is
//!
//! ```text
//! [tenant "_"] [":" context ":"] local-name
//! ```
//!
//! Contexts start with `.`; the default context is `.` itself and is never
//! rendered. The tenant prefix is omitted for [`DEFAULT_TENANT`]. The wildcard
//! context `:*:` is only meaningful in a [`SubjectPrefix`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const DEFAULT_TENANT: &str = "default";
pub const TENANT_DELIMITER: char = '_';
pub const CONTEXT_DELIMITER: char = ':';
pub const DEFAULT_CONTEXT: &str = ".";
pub const WILDCARD: &str = "*";
/// The listing pattern that matches every context of a tenant.
pub const CONTEXT_WILDCARD: &str = ":*:";

// ─── QualifiedSubject ────────────────────────────────────────────────────────

/// The fully resolved identity of a subject. Equal iff all three fields match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QualifiedSubject {
  pub tenant:     String,
  pub context:    String,
  pub local_name: String,
}

impl QualifiedSubject {
  /// Resolve `raw` under `tenant`.
  ///
  /// Idempotent: normalizing the rendered form of a result yields the same
  /// result. Malformed context syntax is rejected, never stripped.
  pub fn normalize(tenant: &str, raw: &str) -> Result<Self> {
    let rest = strip_tenant(tenant, raw);
    let (context, local_name) = split_context(rest)?;

    let context = match context {
      None => DEFAULT_CONTEXT,
      Some(WILDCARD) => {
        return Err(Error::InvalidSubject(format!(
          "The wildcard context is not a valid subject context: '{raw}'"
        )));
      }
      Some(ctx) => validate_context(ctx, raw)?,
    };

    if local_name.is_empty() {
      return Err(Error::InvalidSubject(format!(
        "Subject name must not be empty: '{raw}'"
      )));
    }
    if local_name.chars().any(char::is_control) {
      return Err(Error::InvalidSubject(format!(
        "Subject name contains control characters: '{}'",
        local_name.escape_debug()
      )));
    }

    Ok(Self {
      tenant:     tenant.to_owned(),
      context:    context.to_owned(),
      local_name: local_name.to_owned(),
    })
  }

  pub fn is_default_context(&self) -> bool { self.context == DEFAULT_CONTEXT }
}

impl fmt::Display for QualifiedSubject {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.tenant != DEFAULT_TENANT {
      write!(f, "{}{TENANT_DELIMITER}", self.tenant)?;
    }
    // A local name starting with the delimiter needs an explicit context,
    // or it would read back as one.
    if !self.is_default_context() || self.local_name.starts_with(CONTEXT_DELIMITER) {
      write!(f, "{CONTEXT_DELIMITER}{}{CONTEXT_DELIMITER}", self.context)?;
    }
    f.write_str(&self.local_name)
  }
}

/// Free-function form of [`QualifiedSubject::normalize`].
pub fn normalize(tenant: &str, raw: &str) -> Result<QualifiedSubject> {
  QualifiedSubject::normalize(tenant, raw)
}

// ─── Prefix patterns ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextPattern {
  /// `:*:`, every context of the tenant.
  Any,
  Exact(String),
}

/// A listing pattern: a context pattern plus a local-name prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectPrefix {
  pub tenant:       String,
  pub context:      ContextPattern,
  pub local_prefix: String,
}

impl SubjectPrefix {
  /// Parse a `subjectPrefix` listing parameter.
  ///
  /// `:*:orders` matches `orders*` in every context, `:.staging:` matches
  /// everything in `.staging`, and a bare `orders` matches `orders*` in the
  /// default context only.
  pub fn parse(tenant: &str, raw: &str) -> Result<Self> {
    let rest = strip_tenant(tenant, raw);
    let (context, local_prefix) = split_context(rest)?;

    let context = match context {
      None => ContextPattern::Exact(DEFAULT_CONTEXT.to_owned()),
      Some(WILDCARD) => ContextPattern::Any,
      Some(ctx) => ContextPattern::Exact(validate_context(ctx, raw)?.to_owned()),
    };

    Ok(Self {
      tenant: tenant.to_owned(),
      context,
      local_prefix: local_prefix.to_owned(),
    })
  }

  /// The pattern that lists every subject of `tenant`.
  pub fn all(tenant: &str) -> Self {
    Self {
      tenant:       tenant.to_owned(),
      context:      ContextPattern::Any,
      local_prefix: String::new(),
    }
  }

  pub fn matches(&self, subject: &QualifiedSubject) -> bool {
    if subject.tenant != self.tenant {
      return false;
    }
    let context_ok = match &self.context {
      ContextPattern::Any => true,
      ContextPattern::Exact(ctx) => *ctx == subject.context,
    };
    context_ok && subject.local_name.starts_with(&self.local_prefix)
  }
}

pub fn matches_prefix(subject: &QualifiedSubject, prefix: &SubjectPrefix) -> bool {
  prefix.matches(subject)
}

// ─── Parsing helpers ─────────────────────────────────────────────────────────

fn strip_tenant<'a>(tenant: &str, raw: &'a str) -> &'a str {
  if tenant == DEFAULT_TENANT {
    return raw;
  }
  raw
    .strip_prefix(tenant)
    .and_then(|r| r.strip_prefix(TENANT_DELIMITER))
    .unwrap_or(raw)
}

/// Split an optional leading `:ctx:` off `s`.
fn split_context(s: &str) -> Result<(Option<&str>, &str)> {
  let Some(rest) = s.strip_prefix(CONTEXT_DELIMITER) else {
    return Ok((None, s));
  };
  match rest.find(CONTEXT_DELIMITER) {
    Some(end) => Ok((Some(&rest[..end]), &rest[end + 1..])),
    None => Err(Error::InvalidSubject(format!(
      "Unterminated context in subject '{s}'"
    ))),
  }
}

fn validate_context<'a>(ctx: &'a str, raw: &str) -> Result<&'a str> {
  if !ctx.starts_with('.') {
    return Err(Error::InvalidSubject(format!(
      "Context must start with '.' in subject '{raw}'"
    )));
  }
  if ctx.chars().any(|c| c.is_whitespace() || c.is_control()) {
    return Err(Error::InvalidSubject(format!(
      "Context contains invalid characters in subject '{raw}'"
    )));
  }
  Ok(ctx)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn qs(tenant: &str, context: &str, local: &str) -> QualifiedSubject {
    QualifiedSubject {
      tenant:     tenant.into(),
      context:    context.into(),
      local_name: local.into(),
    }
  }

  #[test]
  fn bare_name_lands_in_default_context() {
    let q = normalize(DEFAULT_TENANT, "orders-value").unwrap();
    assert_eq!(q, qs(DEFAULT_TENANT, ".", "orders-value"));
    assert_eq!(q.to_string(), "orders-value");
  }

  #[test]
  fn context_prefix_is_parsed() {
    let q = normalize(DEFAULT_TENANT, ":.staging:orders-value").unwrap();
    assert_eq!(q, qs(DEFAULT_TENANT, ".staging", "orders-value"));
    assert_eq!(q.to_string(), ":.staging:orders-value");
  }

  #[test]
  fn explicit_default_context_renders_bare() {
    let q = normalize(DEFAULT_TENANT, ":.:orders").unwrap();
    assert_eq!(q, qs(DEFAULT_TENANT, ".", "orders"));
    assert_eq!(q.to_string(), "orders");
  }

  #[test]
  fn leading_delimiter_keeps_explicit_default_context() {
    let q = normalize(DEFAULT_TENANT, ":.::x").unwrap();
    assert_eq!(q, qs(DEFAULT_TENANT, ".", ":x"));
    assert_eq!(q.to_string(), ":.::x");

    let q = normalize("acme", ":.::x").unwrap();
    assert_eq!(q.to_string(), "acme_:.::x");
    assert_eq!(normalize("acme", &q.to_string()).unwrap(), q);
  }

  #[test]
  fn tenant_prefix_is_added_and_stripped() {
    let q = normalize("acme", ":.prod:orders").unwrap();
    assert_eq!(q.to_string(), "acme_:.prod:orders");
    assert_eq!(normalize("acme", "acme_:.prod:orders").unwrap(), q);
  }

  #[test]
  fn normalize_is_idempotent() {
    let inputs = [
      "orders",
      ":.ctx:orders",
      ":.:orders",
      ":.a.b/c:x:y",
      "acme_orders",
      "acme_acme_orders",
      "t_:.ctx:v",
      "with space",
      ":.::x",
      ":.ctx::x",
    ];
    for tenant in [DEFAULT_TENANT, "acme", "t"] {
      for s in inputs {
        let once = normalize(tenant, s).unwrap();
        let twice = normalize(tenant, &once.to_string()).unwrap();
        assert_eq!(once, twice, "tenant={tenant} input={s}");
      }
    }
  }

  #[test]
  fn malformed_contexts_are_rejected() {
    for s in [":.ctx", "::orders", ":ctx:orders", ":.bad ctx:orders", ":*:orders"] {
      let err = normalize(DEFAULT_TENANT, s).unwrap_err();
      assert!(matches!(err, Error::InvalidSubject(_)), "{s}: {err:?}");
    }
  }

  #[test]
  fn empty_and_control_names_are_rejected() {
    assert!(matches!(
      normalize(DEFAULT_TENANT, ":.ctx:"),
      Err(Error::InvalidSubject(_))
    ));
    assert!(matches!(
      normalize(DEFAULT_TENANT, "a\u{0}b"),
      Err(Error::InvalidSubject(_))
    ));
  }

  #[test]
  fn wildcard_prefix_matches_every_context() {
    let p = SubjectPrefix::parse(DEFAULT_TENANT, CONTEXT_WILDCARD).unwrap();
    assert_eq!(p.context, ContextPattern::Any);
    assert!(p.matches(&qs(DEFAULT_TENANT, ".", "a")));
    assert!(p.matches(&qs(DEFAULT_TENANT, ".staging", "b")));
    assert!(!p.matches(&qs("acme", ".", "a")));
  }

  #[test]
  fn context_prefix_matches_one_context() {
    let p = SubjectPrefix::parse(DEFAULT_TENANT, ":.staging:").unwrap();
    assert!(p.matches(&qs(DEFAULT_TENANT, ".staging", "anything")));
    assert!(!p.matches(&qs(DEFAULT_TENANT, ".", "anything")));

    let p = SubjectPrefix::parse(DEFAULT_TENANT, ":*:ord").unwrap();
    assert!(p.matches(&qs(DEFAULT_TENANT, ".x", "orders")));
    assert!(!p.matches(&qs(DEFAULT_TENANT, ".x", "payments")));
  }

  #[test]
  fn bare_prefix_is_default_context_only() {
    let p = SubjectPrefix::parse(DEFAULT_TENANT, "ord").unwrap();
    assert!(matches_prefix(&qs(DEFAULT_TENANT, ".", "orders"), &p));
    assert!(!matches_prefix(&qs(DEFAULT_TENANT, ".x", "orders"), &p));
  }

  #[test]
  fn tenant_prefix_in_pattern_is_stripped() {
    let p = SubjectPrefix::parse("acme", "acme_:*:").unwrap();
    assert_eq!(p, SubjectPrefix::all("acme"));
  }

  #[test]
  fn unterminated_prefix_is_rejected() {
    assert!(SubjectPrefix::parse(DEFAULT_TENANT, ":.staging").is_err());
  }
}
