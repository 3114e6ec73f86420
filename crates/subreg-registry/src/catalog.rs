//! [`Catalog`]: the shared, lock-protected view of the log.
//!
//! Any number of readers take the read lock. Mutation happens only in
//! [`Catalog::sync`], which holds the applier mutex for its whole run so
//! there is exactly one consumer of the log at a time, and takes the write
//! lock once per entry so readers never observe half an entry.

use subreg_core::{Result, catalog::CatalogIndex, format::SchemaFormat, log::SchemaLog};
use tokio::sync::{Mutex, RwLock, RwLockReadGuard};
use tracing::debug;

#[derive(Debug, Default)]
pub struct Catalog {
  index:   RwLock<CatalogIndex>,
  applier: Mutex<()>,
}

impl Catalog {
  pub fn new() -> Self { Self::default() }

  /// A read snapshot of the index.
  pub async fn read(&self) -> RwLockReadGuard<'_, CatalogIndex> {
    self.index.read().await
  }

  /// Apply every log entry past the current offset, in order. Returns the
  /// applied offset afterwards. `format` fingerprints each registered
  /// version as it is applied.
  pub async fn sync<L: SchemaLog>(&self, log: &L, format: &dyn SchemaFormat) -> Result<u64> {
    let _applier = self.applier.lock().await;

    let from = self.index.read().await.applied_offset();
    let entries = log.read_after(from).await?;
    if entries.is_empty() {
      return Ok(from);
    }

    let mut applied = from;
    for entry in &entries {
      let mut index = self.index.write().await;
      index.apply(entry, format);
      applied = index.applied_offset();
    }
    debug!(from, applied, count = entries.len(), "catalog caught up");
    Ok(applied)
  }
}
