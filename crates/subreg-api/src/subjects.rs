//! Handlers for `/subjects` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/subjects` | Optional `?subjectPrefix=` (default `:*:`) and `?deleted=` |
//! | `POST`   | `/subjects/{subject}` | Lookup; body [`SchemaBody`]; `?normalize=`, `?deleted=` |
//! | `DELETE` | `/subjects/{subject}` | `?permanent=`; forwarded to the leader on followers |

use axum::{
  Json,
  extract::{Path, Query, State, rejection::JsonRejection},
  http::HeaderMap,
};
use serde::{Deserialize, Serialize};
use subreg_core::{
  log::{ForwardHeaders, Forwarder, SchemaLog, filter_headers},
  qualified::CONTEXT_WILDCARD,
  schema::{SchemaCandidate, SchemaReference, SchemaType, SchemaVersion},
};
use subreg_registry::Registry;

use crate::error::ApiError;

// ─── Shared bodies ───────────────────────────────────────────────────────────

/// Schema payload accepted by lookup and registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaBody {
  pub schema:      String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub schema_type: Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub references:  Vec<SchemaReference>,
}

impl SchemaBody {
  pub fn into_candidate(self) -> Result<SchemaCandidate, ApiError> {
    Ok(SchemaCandidate {
      schema_type: SchemaType::parse(self.schema_type.as_deref())?,
      references:  self.references,
      schema:      self.schema,
    })
  }
}

impl From<&SchemaCandidate> for SchemaBody {
  fn from(c: &SchemaCandidate) -> Self {
    Self {
      schema:      c.schema.clone(),
      schema_type: Some(c.schema_type.to_string()),
      references:  c.references.clone(),
    }
  }
}

/// A matched schema version as returned by lookup.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaResponse {
  pub subject:     String,
  pub version:     u32,
  pub id:          i64,
  /// Omitted for AVRO.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub schema_type: Option<SchemaType>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub references:  Vec<SchemaReference>,
  pub schema:      String,
}

impl From<SchemaVersion> for SchemaResponse {
  fn from(v: SchemaVersion) -> Self {
    Self {
      subject:     v.subject.to_string(),
      version:     v.version,
      id:          v.id,
      schema_type: (v.schema_type != SchemaType::Avro).then_some(v.schema_type),
      references:  v.references,
      schema:      v.schema,
    }
  }
}

/// Whitelisted inbound headers to carry on a forwarded write. Values that
/// are not visible ASCII are dropped.
pub fn forward_headers(headers: &HeaderMap, whitelist: &[String]) -> ForwardHeaders {
  filter_headers(
    headers
      .iter()
      .filter_map(|(name, value)| Some((name.as_str(), value.to_str().ok()?))),
    whitelist,
  )
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
  /// Defaults to every context of the serving tenant.
  pub subject_prefix: Option<String>,
  #[serde(default)]
  pub deleted:        bool,
}

/// `GET /subjects[?subjectPrefix=<pattern>][&deleted=true]`
pub async fn list<L, F>(
  State(registry): State<Registry<L, F>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<String>>, ApiError>
where
  L: SchemaLog + 'static,
  F: Forwarder + 'static,
{
  let prefix = params.subject_prefix.as_deref().unwrap_or(CONTEXT_WILDCARD);
  let subjects = registry
    .list_subjects_with_prefix(prefix, params.deleted)
    .await?;
  Ok(Json(subjects.iter().map(ToString::to_string).collect()))
}

// ─── Lookup ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LookupParams {
  #[serde(default)]
  pub normalize: bool,
  #[serde(default)]
  pub deleted:   bool,
}

/// `POST /subjects/{subject}[?normalize=true][&deleted=true]`
pub async fn lookup<L, F>(
  State(registry): State<Registry<L, F>>,
  Path(subject): Path<String>,
  Query(params): Query<LookupParams>,
  body: Result<Json<SchemaBody>, JsonRejection>,
) -> Result<Json<SchemaResponse>, ApiError>
where
  L: SchemaLog + 'static,
  F: Forwarder + 'static,
{
  let subject = registry.normalize(&subject)?;
  let Json(body) = body?;
  let candidate = body.into_candidate()?;
  let found = registry
    .lookup_schema_under_subject(&subject, &candidate, params.normalize, params.deleted)
    .await?;
  Ok(Json(found.into()))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
  #[serde(default)]
  pub permanent: bool,
}

/// `DELETE /subjects/{subject}[?permanent=true]`
pub async fn delete<L, F>(
  State(registry): State<Registry<L, F>>,
  Path(subject): Path<String>,
  Query(params): Query<DeleteParams>,
  headers: HeaderMap,
) -> Result<Json<Vec<u32>>, ApiError>
where
  L: SchemaLog + 'static,
  F: Forwarder + 'static,
{
  let subject = registry.normalize(&subject)?;
  let headers = forward_headers(&headers, &registry.config().whitelist_headers);
  let versions = registry
    .delete_subject_or_forward(&headers, &subject, params.permanent)
    .await?;
  Ok(Json(versions))
}
