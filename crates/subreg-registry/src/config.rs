//! Registry-level settings.

use std::time::Duration;

use serde::Deserialize;
use subreg_core::qualified::DEFAULT_TENANT;

/// Whether the registry accepts writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
  #[default]
  ReadWrite,
  ReadOnly,
}

#[derive(Debug, Clone)]
pub struct RegistryConfig {
  /// Tenant every subject on this node is resolved under.
  pub tenant:            String,
  pub mode:              Mode,
  /// Upper bound on a forwarded round trip to the leader.
  pub forward_timeout:   Duration,
  /// Inbound header names carried on forwarded requests.
  pub whitelist_headers: Vec<String>,
}

impl Default for RegistryConfig {
  fn default() -> Self {
    Self {
      tenant:            DEFAULT_TENANT.to_owned(),
      mode:              Mode::ReadWrite,
      forward_timeout:   Duration::from_secs(30),
      whitelist_headers: Vec::new(),
    }
  }
}
