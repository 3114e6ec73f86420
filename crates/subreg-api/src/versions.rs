//! Handler for `POST /subjects/{subject}/versions`.

use axum::{
  Json,
  extract::{Path, Query, State, rejection::JsonRejection},
  http::HeaderMap,
};
use serde::Deserialize;
use subreg_core::{
  log::{Forwarder, SchemaLog},
  schema::RegisteredSchema,
};
use subreg_registry::Registry;

use crate::{
  error::ApiError,
  subjects::{SchemaBody, forward_headers},
};

#[derive(Debug, Deserialize)]
pub struct RegisterParams {
  #[serde(default)]
  pub normalize: bool,
}

/// `POST /subjects/{subject}/versions[?normalize=true]`, returns
/// `{"id": n, "version": v}`. Re-registering a live schema returns the
/// existing version.
pub async fn register<L, F>(
  State(registry): State<Registry<L, F>>,
  Path(subject): Path<String>,
  Query(params): Query<RegisterParams>,
  headers: HeaderMap,
  body: Result<Json<SchemaBody>, JsonRejection>,
) -> Result<Json<RegisteredSchema>, ApiError>
where
  L: SchemaLog + 'static,
  F: Forwarder + 'static,
{
  let subject = registry.normalize(&subject)?;
  let Json(body) = body?;
  let candidate = body.into_candidate()?;
  let headers = forward_headers(&headers, &registry.config().whitelist_headers);
  let registered = registry
    .register_or_forward(&headers, &subject, &candidate, params.normalize)
    .await?;
  Ok(Json(registered))
}
