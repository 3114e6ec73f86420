//! Process wiring for the subreg server.
//!
//! Holds the deserialised [`ServerConfig`] and turns it into the pieces
//! `main` assembles: the registry settings, this node's leadership, and the
//! traced HTTP router.

use std::{path::PathBuf, time::Duration};

use axum::Router;
use serde::Deserialize;
use subreg_api::api_router;
use subreg_core::{
  log::{Forwarder, Leadership, SchemaLog},
  qualified::DEFAULT_TENANT,
};
use subreg_registry::{Mode, Registry, RegistryConfig};
use tower_http::trace::TraceLayer;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `SUBREG_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  /// Tenant every subject served by this node belongs to.
  pub tenant:             String,
  /// The SQLite log. Nodes of one registry share it.
  pub store_path:         PathBuf,
  /// This node's own base URL, as other nodes would reach it.
  pub node_url:           Option<String>,
  /// Base URL of the current leader.
  pub leader_url:         Option<String>,
  /// Whether this node appends to the log itself.
  pub leader:             bool,
  pub mode:               Mode,
  pub forward_timeout_ms: u64,
  /// How often the catalog catches up with the log.
  pub sync_interval_ms:   u64,
  pub whitelist_headers:  Vec<String>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:               "127.0.0.1".to_string(),
      port:               8081,
      tenant:             DEFAULT_TENANT.to_string(),
      store_path:         PathBuf::from("subreg.db"),
      node_url:           None,
      leader_url:         None,
      leader:             true,
      mode:               Mode::ReadWrite,
      forward_timeout_ms: 30_000,
      sync_interval_ms:   500,
      whitelist_headers:  Vec::new(),
    }
  }
}

impl ServerConfig {
  pub fn registry_config(&self) -> RegistryConfig {
    RegistryConfig {
      tenant:            self.tenant.clone(),
      mode:              self.mode,
      forward_timeout:   self.forward_timeout(),
      whitelist_headers: self.whitelist_headers.clone(),
    }
  }

  /// A node leads if configured to, or if the leader URL names itself.
  pub fn leadership(&self) -> Leadership {
    let names_self = match (&self.node_url, &self.leader_url) {
      (Some(node), Some(leader)) => {
        node.trim_end_matches('/') == leader.trim_end_matches('/')
      }
      _ => false,
    };
    if self.leader || names_self {
      Leadership::Leader
    } else {
      Leadership::Follower { leader_url: self.leader_url.clone() }
    }
  }

  pub fn forward_timeout(&self) -> Duration { Duration::from_millis(self.forward_timeout_ms) }

  pub fn sync_interval(&self) -> Duration { Duration::from_millis(self.sync_interval_ms.max(1)) }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// The API router with request tracing.
pub fn router<L, F>(registry: Registry<L, F>) -> Router
where
  L: SchemaLog + 'static,
  F: Forwarder + 'static,
{
  api_router(registry).layer(TraceLayer::new_for_http())
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use config::{Config, File, FileFormat};
  use subreg_api::HttpForwarder;
  use subreg_registry::MemoryLog;
  use tower::ServiceExt;

  use super::*;

  fn parse(toml: &str) -> ServerConfig {
    Config::builder()
      .add_source(File::from_str(toml, FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn missing_keys_fall_back_to_defaults() {
    let cfg = parse("port = 9000");
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.tenant, "default");
    assert_eq!(cfg.mode, Mode::ReadWrite);
    assert!(cfg.leader);
    assert_eq!(cfg.forward_timeout(), Duration::from_secs(30));
  }

  #[test]
  fn follower_settings_flow_into_registry_config() {
    let cfg = parse(
      r#"
        tenant = "acme"
        leader = false
        leader_url = "http://leader:8081"
        mode = "READONLY"
        forward_timeout_ms = 250
        whitelist_headers = ["X-Request-Id"]
      "#,
    );
    assert_eq!(cfg.leadership(), Leadership::Follower {
      leader_url: Some("http://leader:8081".into()),
    });

    let registry = cfg.registry_config();
    assert_eq!(registry.tenant, "acme");
    assert_eq!(registry.mode, Mode::ReadOnly);
    assert_eq!(registry.forward_timeout, Duration::from_millis(250));
    assert_eq!(registry.whitelist_headers, vec!["X-Request-Id".to_string()]);
  }

  #[test]
  fn node_named_as_leader_leads() {
    let cfg = parse(
      r#"
        leader = false
        node_url = "http://node-a:8081/"
        leader_url = "http://node-a:8081"
      "#,
    );
    assert_eq!(cfg.leadership(), Leadership::Leader);
  }

  #[tokio::test]
  async fn traced_router_serves_api() {
    let registry = Registry::new(
      RegistryConfig::default(),
      MemoryLog::leader(),
      HttpForwarder::new(Duration::from_secs(1)).unwrap(),
    );
    let resp = router(registry)
      .oneshot(Request::get("/subjects").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(serde_json::from_slice::<Vec<String>>(&bytes).unwrap(), Vec::<String>::new());
  }
}
