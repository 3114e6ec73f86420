//! JSON REST API for subreg.
//!
//! Exposes an axum [`Router`] backed by a [`subreg_registry::Registry`], and
//! the [`HttpForwarder`] a follower uses to send writes to the leader's copy
//! of the same API. TLS and authentication are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .merge(subreg_api::api_router(registry.clone()))
//! ```

pub mod error;
pub mod forward;
pub mod subjects;
pub mod versions;

use axum::{
  Router,
  routing::{get, post},
};
use subreg_core::log::{Forwarder, SchemaLog};
use subreg_registry::Registry;

pub use error::ApiError;
pub use forward::HttpForwarder;

/// Build a fully-materialised API router for `registry`.
pub fn api_router<L, F>(registry: Registry<L, F>) -> Router<()>
where
  L: SchemaLog + 'static,
  F: Forwarder + 'static,
{
  Router::new()
    .route("/subjects", get(subjects::list::<L, F>))
    .route(
      "/subjects/{subject}",
      post(subjects::lookup::<L, F>).delete(subjects::delete::<L, F>),
    )
    .route("/subjects/{subject}/versions", post(versions::register::<L, F>))
    .with_state(registry)
}
