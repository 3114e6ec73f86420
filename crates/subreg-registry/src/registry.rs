//! [`Registry`]: lookups, listings, deletes and registrations.

use std::{collections::BTreeSet, future::Future, sync::Arc, time::Duration};

use subreg_core::{
  Error, Result,
  catalog::{CatalogIndex, LookupOutcome},
  format::{BasicFormat, SchemaFormat},
  lifecycle::{self, DeleteMode, DeleteRecord},
  log::{ForwardHeaders, Forwarder, LogOp, SchemaLog},
  qualified::{QualifiedSubject, SubjectPrefix},
  schema::{RegisteredSchema, SchemaCandidate, SchemaVersion},
};
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
  catalog::Catalog,
  config::{Mode, RegistryConfig},
  router::{self, Route},
};

/// The registry service handle.
///
/// Cloning is cheap; all state is reference-counted.
pub struct Registry<L, F> {
  inner: Arc<Inner<L, F>>,
}

struct Inner<L, F> {
  config:     RegistryConfig,
  log:        L,
  forwarder:  F,
  format:     Arc<dyn SchemaFormat>,
  catalog:    Catalog,
  /// Serializes every write executed on this node while it leads.
  write_lock: Mutex<()>,
}

impl<L, F> Clone for Registry<L, F> {
  fn clone(&self) -> Self { Self { inner: Arc::clone(&self.inner) } }
}

/// What a leader-side registration decided to do.
enum RegisterPlan {
  Existing(RegisteredSchema),
  Append(LogOp, RegisteredSchema),
}

impl<L, F> Registry<L, F>
where
  L: SchemaLog + 'static,
  F: Forwarder + 'static,
{
  pub fn new(config: RegistryConfig, log: L, forwarder: F) -> Self {
    Self::with_format(config, log, forwarder, Arc::new(BasicFormat))
  }

  pub fn with_format(
    config: RegistryConfig,
    log: L,
    forwarder: F,
    format: Arc<dyn SchemaFormat>,
  ) -> Self {
    Self {
      inner: Arc::new(Inner {
        config,
        log,
        forwarder,
        format,
        catalog: Catalog::new(),
        write_lock: Mutex::new(()),
      }),
    }
  }

  pub fn config(&self) -> &RegistryConfig { &self.inner.config }

  pub fn tenant(&self) -> &str { &self.inner.config.tenant }

  pub fn log(&self) -> &L { &self.inner.log }

  pub fn is_leader(&self) -> bool { self.inner.log.leadership().is_leader() }

  /// Resolve a caller-supplied subject under this node's tenant.
  pub fn normalize(&self, raw: &str) -> Result<QualifiedSubject> {
    QualifiedSubject::normalize(self.tenant(), raw)
  }

  /// Bring the catalog up to the log tail.
  pub async fn sync(&self) -> Result<u64> {
    self.inner.catalog.sync(&self.inner.log, self.inner.format.as_ref()).await
  }

  /// Keep the catalog caught up in the background until the handle is
  /// aborted.
  pub fn spawn_catch_up(&self, every: Duration) -> JoinHandle<()> {
    let registry = self.clone();
    tokio::spawn(async move {
      let mut ticker = tokio::time::interval(every);
      ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
      loop {
        ticker.tick().await;
        if let Err(e) = registry.sync().await {
          warn!(error = %e, "catalog catch-up failed");
        }
      }
    })
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  pub async fn has_subject(&self, subject: &QualifiedSubject, include_deleted: bool) -> bool {
    self.inner.catalog.read().await.has_subject(subject, include_deleted)
  }

  /// Qualified names of subjects matching the `subjectPrefix` pattern.
  pub async fn list_subjects_with_prefix(
    &self,
    prefix: &str,
    include_deleted: bool,
  ) -> Result<BTreeSet<QualifiedSubject>> {
    let prefix = SubjectPrefix::parse(self.tenant(), prefix)?;
    Ok(self.inner.catalog.read().await.list_subjects(&prefix, include_deleted))
  }

  /// Find the version of `subject` that `candidate` is equal to.
  ///
  /// Fails with [`Error::SubjectNotFound`] when the subject has no versions
  /// under the deleted-inclusion policy, [`Error::SchemaNotFound`] when it
  /// does but none match, and [`Error::InvalidSchema`] when the candidate
  /// (or one of its references) is invalid.
  pub async fn lookup_schema_under_subject(
    &self,
    subject: &QualifiedSubject,
    candidate: &SchemaCandidate,
    normalize: bool,
    include_deleted: bool,
  ) -> Result<SchemaVersion> {
    info!(
      %subject,
      deleted = include_deleted,
      schema_type = %candidate.schema_type,
      "schema lookup under subject"
    );
    let index = self.inner.catalog.read().await;
    let candidate = self.resolve(&index, candidate)?;
    index
      .find_exact_match(
        subject,
        &candidate,
        self.inner.format.as_ref(),
        normalize,
        include_deleted,
      )?
      .into_result(subject)
  }

  // ── Writes ────────────────────────────────────────────────────────────

  /// Delete `subject`, locally if this node leads, otherwise on the leader.
  /// Returns the versions that changed state, in ascending order.
  pub async fn delete_subject_or_forward(
    &self,
    headers: &ForwardHeaders,
    subject: &QualifiedSubject,
    permanent: bool,
  ) -> Result<Vec<u32>> {
    info!(%subject, permanent, "deleting subject");
    self.ensure_writable(subject)?;

    let mode = DeleteMode::from_permanent(permanent);
    let state = self.inner.catalog.read().await.state(subject);
    lifecycle::check_delete(state, subject, mode)?;

    match router::route(&self.inner.log.leadership())? {
      Route::Local => {
        let subject = subject.clone();
        let record = self
          .run_as_leader(move |registry| async move {
            registry.delete_locally(&subject, mode).await
          })
          .await?;
        Ok(record.versions)
      }
      Route::Forward { leader_url } => {
        debug!(%subject, %leader_url, "forwarding delete to leader");
        router::bounded(
          self.inner.config.forward_timeout,
          "Delete subject",
          self
            .inner
            .forwarder
            .forward_delete(&leader_url, subject, permanent, headers),
        )
        .await
      }
    }
  }

  /// Register `candidate` under `subject`, locally if this node leads,
  /// otherwise on the leader. Registering a schema that is already live
  /// under the subject returns the existing version.
  pub async fn register_or_forward(
    &self,
    headers: &ForwardHeaders,
    subject: &QualifiedSubject,
    candidate: &SchemaCandidate,
    normalize: bool,
  ) -> Result<RegisteredSchema> {
    info!(%subject, schema_type = %candidate.schema_type, "registering schema");
    self.ensure_writable(subject)?;

    match router::route(&self.inner.log.leadership())? {
      Route::Local => {
        let subject = subject.clone();
        let candidate = candidate.clone();
        self
          .run_as_leader(move |registry| async move {
            registry.register_locally(&subject, &candidate, normalize).await
          })
          .await
      }
      Route::Forward { leader_url } => {
        debug!(%subject, %leader_url, "forwarding registration to leader");
        router::bounded(
          self.inner.config.forward_timeout,
          "Register schema",
          self.inner.forwarder.forward_register(
            &leader_url,
            subject,
            candidate,
            normalize,
            headers,
          ),
        )
        .await
      }
    }
  }

  // ── Leader-side execution ─────────────────────────────────────────────

  /// Run a write on its own task. Dropping the caller's future (e.g. on
  /// client disconnect) does not cancel an append already under way.
  async fn run_as_leader<T, W, Fut>(&self, write: W) -> Result<T>
  where
    T: Send + 'static,
    W: FnOnce(Self) -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
  {
    tokio::spawn(write(self.clone()))
      .await
      .map_err(|e| Error::Internal(format!("Write task failed: {e}")))?
  }

  async fn delete_locally(
    &self,
    subject: &QualifiedSubject,
    mode: DeleteMode,
  ) -> Result<DeleteRecord> {
    let _write = self.inner.write_lock.lock().await;
    self.sync().await?;

    let (op, record) = {
      let index = self.inner.catalog.read().await;
      lifecycle::plan_delete(&index, subject, mode)?
    };

    let offset = self.inner.log.append(op).await?;
    self.settle(offset).await;
    info!(%subject, ?mode, offset, versions = ?record.versions, "subject deleted");
    Ok(record)
  }

  async fn register_locally(
    &self,
    subject: &QualifiedSubject,
    candidate: &SchemaCandidate,
    normalize: bool,
  ) -> Result<RegisteredSchema> {
    let _write = self.inner.write_lock.lock().await;
    self.sync().await?;

    let plan = {
      let index = self.inner.catalog.read().await;
      self.plan_register(&index, subject, candidate, normalize)?
    };

    match plan {
      RegisterPlan::Existing(registered) => Ok(registered),
      RegisterPlan::Append(op, registered) => {
        let offset = self.inner.log.append(op).await?;
        self.settle(offset).await;
        info!(
          %subject,
          id = registered.id,
          version = registered.version,
          offset,
          "schema registered"
        );
        Ok(registered)
      }
    }
  }

  fn plan_register(
    &self,
    index: &CatalogIndex,
    subject: &QualifiedSubject,
    candidate: &SchemaCandidate,
    normalize: bool,
  ) -> Result<RegisterPlan> {
    let format = self.inner.format.as_ref();
    let candidate = self.resolve(index, candidate)?;

    if let LookupOutcome::Found(existing) =
      index.find_exact_match(subject, &candidate, format, normalize, false)?
    {
      return Ok(RegisterPlan::Existing(RegisteredSchema {
        id:      existing.id,
        version: existing.version,
      }));
    }

    let fingerprint = format.fingerprint(
      candidate.schema_type,
      &candidate.schema,
      &candidate.references,
      false,
    )?;
    let id = match index.find_id(&fingerprint)? {
      Some(id) => id,
      None => index.max_id() + 1,
    };
    let registered = RegisteredSchema {
      id,
      version: index.highest_version(subject) + 1,
    };

    let op = LogOp::Register {
      version: SchemaVersion {
        subject:     subject.clone(),
        version:     registered.version,
        id:          registered.id,
        schema_type: candidate.schema_type,
        references:  candidate.references,
        schema:      candidate.schema,
        deleted:     false,
      },
    };
    Ok(RegisterPlan::Append(op, registered))
  }

  /// Apply a committed append to the catalog. The entry is already in the
  /// log, so a failure here is left to the catch-up task.
  async fn settle(&self, offset: u64) {
    if let Err(e) = self.sync().await {
      warn!(offset, error = %e, "committed entry not yet applied; catch-up will retry");
    }
  }

  // ── Helpers ───────────────────────────────────────────────────────────

  /// Validate and resolve the candidate's references against `index`.
  fn resolve(&self, index: &CatalogIndex, candidate: &SchemaCandidate) -> Result<SchemaCandidate> {
    Ok(SchemaCandidate {
      schema_type: candidate.schema_type,
      references:  index.resolve_references(self.tenant(), &candidate.references)?,
      schema:      candidate.schema.clone(),
    })
  }

  fn ensure_writable(&self, subject: &QualifiedSubject) -> Result<()> {
    match self.inner.config.mode {
      Mode::ReadWrite => Ok(()),
      Mode::ReadOnly => Err(Error::OperationNotPermitted(format!(
        "Subject {subject} is in read-only mode"
      ))),
    }
  }
}
