//! auditsink Audit - Append-only audit log with retention pruning
//!
//! Provides:
//! - `AppendSink`: writes one rendered `AuditRecord` per locked append
//! - `RetentionPruner`: once-per-day, stage-then-swap removal of expired lines
//! - `AuditLog`: the host-facing facade (`append` / `maybe_prune`)
//! - `PruneScheduler`: periodic pruning on a tokio interval
//! - `FlockFileLock` / `InProcessLock`: implementations of the `IFileLock` port

pub mod error;
pub mod lock;
pub mod pruner;
pub mod scheduler;
pub mod service;
pub mod sink;

pub use error::AuditError;
pub use lock::{FlockFileLock, InProcessLock};
pub use pruner::{PruneOutcome, PruneReport, RetentionPruner, SkipReason};
pub use scheduler::{PruneScheduler, SchedulerSummary};
pub use service::AuditLog;
pub use sink::AppendSink;
