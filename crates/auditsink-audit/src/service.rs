//! AuditLog - host-facing audit service
//!
//! Wires an [`AppendSink`] and a [`RetentionPruner`] to one audit file and one
//! configuration, and exposes the two operations a host calls:
//! [`AuditLog::append`] for every audit event and [`AuditLog::maybe_prune`]
//! on start or on a schedule.
//!
//! Unlike a best-effort diagnostics logger, append failures are returned to
//! the caller: a silently dropped audit record is a gap in the trail.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use auditsink_core::config::Config;
use auditsink_core::domain::{AuditRecord, Level, RequestContext, RetentionPolicy};
use auditsink_core::ports::{FsMetadata, IClock, IFileLock, IFileMetadata, SystemClock};
use tracing::{debug, warn};

use crate::error::AuditError;
use crate::lock::FlockFileLock;
use crate::pruner::{PruneOutcome, RetentionPruner};
use crate::sink::AppendSink;

/// Append and prune operations over a single audit file
pub struct AuditLog {
    sink: AppendSink,
    pruner: RetentionPruner,
    clock: Arc<dyn IClock>,
    min_level: Level,
    retention: RetentionPolicy,
    request: Option<RequestContext>,
}

impl AuditLog {
    /// Creates a service from explicit collaborators
    ///
    /// A relative `config.audit.file` is resolved against `base`. The same
    /// `lock` serialises appends and prune write-backs.
    pub fn new(
        config: &Config,
        base: &Path,
        clock: Arc<dyn IClock>,
        metadata: Arc<dyn IFileMetadata>,
        lock: Arc<dyn IFileLock>,
    ) -> Self {
        let audit = &config.audit;
        let path = audit.resolved_file(base);

        let sink = AppendSink::new(path, Arc::clone(&lock))
            .with_lock_timeout(audit.lock_timeout())
            .with_sync_on_write(audit.sync_on_write);
        let pruner = RetentionPruner::new(Arc::clone(&clock), metadata, lock)
            .with_lock_timeout(audit.lock_timeout());

        Self {
            sink,
            pruner,
            clock,
            min_level: audit.level,
            retention: audit.retention(),
            request: None,
        }
    }

    /// Creates a service using the system clock, real file metadata and `flock(2)`
    pub fn with_system_adapters(config: &Config, base: &Path) -> Self {
        Self::new(
            config,
            base,
            Arc::new(SystemClock),
            Arc::new(FsMetadata),
            Arc::new(FlockFileLock::new()),
        )
    }

    /// Creates a production service and runs one prune pass before returning it
    ///
    /// A failed prune pass is reported and does not prevent the service from
    /// being returned.
    pub fn open(config: &Config, base: &Path) -> Self {
        Self::with_system_adapters(config, base).prune_on_open()
    }

    /// Runs one prune pass and returns `self`, ready for appends
    pub fn prune_on_open(self) -> Self {
        // maybe_prune already reports the failure
        let _ = self.maybe_prune();
        self
    }

    /// Attaches request metadata to the `extra` map of every record
    pub fn with_request(mut self, request: RequestContext) -> Self {
        self.request = if request.is_empty() { None } else { Some(request) };
        self
    }

    /// Path of the audit file
    pub fn path(&self) -> &Path {
        self.sink.path()
    }

    pub fn min_level(&self) -> Level {
        self.min_level
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    /// Records an audit event stamped with the current time
    ///
    /// Events below the configured minimum level are discarded and the call
    /// succeeds.
    pub fn append(
        &self,
        level: Level,
        message: &str,
        context: BTreeMap<String, String>,
    ) -> Result<(), AuditError> {
        if !level.is_at_least(self.min_level) {
            debug!(%level, min_level = %self.min_level, "Audit event below minimum level");
            return Ok(());
        }

        let mut record =
            AuditRecord::new(self.clock.now(), level, message).with_context_map(context);
        if let Some(request) = &self.request {
            record = record.with_request(request);
        }
        self.sink.append(&record)
    }

    /// Appends a prebuilt record, subject to the same minimum level
    pub fn record(&self, record: &AuditRecord) -> Result<(), AuditError> {
        if !record.level().is_at_least(self.min_level) {
            return Ok(());
        }
        self.sink.append(record)
    }

    /// Runs one prune pass with the configured retention
    ///
    /// Failures are reported here and returned; the audit file is left intact
    /// unless the write-back itself failed.
    pub fn maybe_prune(&self) -> Result<PruneOutcome, AuditError> {
        self.prune_with(self.retention)
    }

    /// Runs one prune pass with an explicit retention
    pub fn prune_with(&self, policy: RetentionPolicy) -> Result<PruneOutcome, AuditError> {
        self.pruner.prune(self.sink.path(), policy).map_err(|e| {
            warn!(error = %e, path = %self.path().display(), "Audit log pruning failed");
            e
        })
    }
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("path", &PathBuf::from(self.path()))
            .field("min_level", &self.min_level)
            .field("retention", &self.retention)
            .field("request", &self.request)
            .finish()
    }
}
