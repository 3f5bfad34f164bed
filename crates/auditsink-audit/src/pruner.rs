//! RetentionPruner - removes expired lines from a live audit file
//!
//! A prune pass runs through three phases:
//!
//! ```text
//! eligibility ──→ streaming filter (unlocked) ──→ swap (exclusive lock)
//!     │                    │                             │
//!  skip reasons      anonymous staging file     tail filter + truncate + rewrite
//! ```
//!
//! 1. **Eligibility**: pruning is disabled below one day, a missing file is a
//!    no-op, and a file whose mtime falls on today's date is skipped. The
//!    mtime rule caps pruning at once per calendar day; since every append
//!    also bumps the mtime, a log written to every day may rarely qualify.
//! 2. **Streaming filter**: the file is read line by line, in order, with a
//!    single reusable buffer. Lines without a valid `[YYYY-MM-DD` prefix are
//!    dropped, as are lines older than the retention window. Retained lines
//!    are copied byte for byte into an anonymous staging file.
//! 3. **Swap**: only after the source has been fully consumed, the exclusive
//!    lock is taken and everything past the consumed offset runs through the
//!    same filter. That covers lines appended during phase 2 and an
//!    unterminated final line; no appender is mid-write while the lock is
//!    held, so such a line is a leftover and is judged like any other. The
//!    target is then truncated and rewritten in place.
//!
//! Any failure before truncation leaves the original file untouched. Rewriting
//! in place (rather than renaming over the path) keeps appenders that already
//! opened the file writing into the live inode. A failed write-back is retried
//! once from the staging file before the pass gives up.
//!
//! ## Sidecar lock file
//!
//! Only one pass runs per audit file at a time: a pass holds a sidecar
//! `<file>.prune.lock` for its whole duration and skips if another holds it.
//! With [`FlockFileLock`](crate::lock::FlockFileLock) the sidecar is created
//! next to the audit file on the first pass and left in place afterwards. It
//! is always empty and may be deleted whenever no pass is running; the
//! directory holding the audit file must therefore be writable.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use auditsink_core::domain::{parse_line_date, RetentionPolicy};
use auditsink_core::ports::{IClock, IFileLock, IFileMetadata};
use chrono::NaiveDateTime;
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};

use crate::error::AuditError;
use crate::sink::DEFAULT_LOCK_TIMEOUT;

/// Suffix of the sidecar file that keeps prune passes mutually exclusive
const PRUNE_LOCK_SUFFIX: &str = ".prune.lock";

// ============================================================================
// Outcome types
// ============================================================================

/// Why a prune pass did not rewrite the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Retention is below one day
    Disabled,
    /// The audit file does not exist
    Missing,
    /// The last-modified time could not be read
    MetadataUnavailable,
    /// The file was already modified today
    ModifiedToday,
    /// Another prune pass holds the sidecar lock
    AlreadyRunning,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::Disabled => "retention disabled",
            SkipReason::Missing => "audit file missing",
            SkipReason::MetadataUnavailable => "modification time unavailable",
            SkipReason::ModifiedToday => "already modified today",
            SkipReason::AlreadyRunning => "another prune pass is running",
        };
        write!(f, "{}", s)
    }
}

/// Line counts of a completed prune pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Lines within the retention window, copied through
    pub kept: u64,
    /// Datable lines older than the retention window
    pub expired: u64,
    /// Lines without a valid date prefix
    pub undatable: u64,
    /// Bytes past the unlocked read, filtered under the exclusive lock
    pub tail_bytes: u64,
}

impl PruneReport {
    /// Total lines removed from the file
    pub fn dropped(&self) -> u64 {
        self.expired + self.undatable
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "kept": self.kept,
            "dropped": self.dropped(),
            "expired": self.expired,
            "undatable": self.undatable,
            "tail_bytes": self.tail_bytes,
        })
    }
}

/// Result of [`RetentionPruner::prune`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PruneOutcome {
    Skipped(SkipReason),
    Pruned(PruneReport),
}

impl PruneOutcome {
    pub fn is_pruned(&self) -> bool {
        matches!(self, PruneOutcome::Pruned(_))
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            PruneOutcome::Skipped(reason) => json!({
                "outcome": "skipped",
                "reason": reason.to_string(),
            }),
            PruneOutcome::Pruned(report) => {
                let mut value = report.to_json();
                value["outcome"] = json!("pruned");
                value
            }
        }
    }
}

impl fmt::Display for PruneOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PruneOutcome::Skipped(reason) => write!(f, "Skipped({})", reason),
            PruneOutcome::Pruned(report) => {
                write!(f, "Pruned(kept {}, dropped {})", report.kept, report.dropped())
            }
        }
    }
}

// ============================================================================
// RetentionPruner
// ============================================================================

/// Line tallies of the streaming filter
#[derive(Debug, Default)]
struct FilterStats {
    kept: u64,
    expired: u64,
    undatable: u64,
    /// Bytes the filter consumed from its reader
    consumed: u64,
}

/// What the filter does with a final line that has no `\n`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PartialLine {
    /// Leave it unconsumed; an appender may still be writing it
    Stop,
    /// Judge it like a complete line
    Filter,
}

/// Rewrites an audit file to the lines inside a retention window
pub struct RetentionPruner {
    clock: Arc<dyn IClock>,
    metadata: Arc<dyn IFileMetadata>,
    lock: Arc<dyn IFileLock>,
    lock_timeout: Duration,
}

impl RetentionPruner {
    /// Creates a pruner reading time and mtimes through the given ports
    ///
    /// `lock` must be the same implementation the file's appenders use.
    pub fn new(
        clock: Arc<dyn IClock>,
        metadata: Arc<dyn IFileMetadata>,
        lock: Arc<dyn IFileLock>,
    ) -> Self {
        Self {
            clock,
            metadata,
            lock,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Bound on waiting for the exclusive lock before the swap
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Runs one prune pass over `path`
    ///
    /// # Errors
    ///
    /// - [`AuditError::Read`] if the file cannot be read; the file is untouched
    /// - [`AuditError::Lock`] if the swap lock is not acquired in time; the
    ///   file is untouched
    /// - [`AuditError::Write`] if staging or the write-back fails
    #[instrument(skip(self), fields(path = %path.display(), keep_for_days = policy.keep_for_days()))]
    pub fn prune(&self, path: &Path, policy: RetentionPolicy) -> Result<PruneOutcome, AuditError> {
        if let Some(reason) = self.check_eligibility(path, policy) {
            debug!(%reason, "Skipping audit log pruning");
            return Ok(PruneOutcome::Skipped(reason));
        }

        let pass_guard = match self.lock.lock_exclusive(&prune_lock_path(path), Duration::ZERO) {
            Ok(guard) => guard,
            Err(e) if e.is_timeout() => {
                debug!("Another prune pass holds the sidecar lock");
                return Ok(PruneOutcome::Skipped(SkipReason::AlreadyRunning));
            }
            Err(e) => return Err(e.into()),
        };

        let now = self.clock.now();
        let source = File::open(path).map_err(|e| AuditError::read(path, e))?;
        let outcome = self.prune_from(path, source, policy, now);

        pass_guard.release();
        outcome
    }

    /// Phase 1: decides whether a pass is due
    fn check_eligibility(&self, path: &Path, policy: RetentionPolicy) -> Option<SkipReason> {
        if !policy.is_enabled() {
            return Some(SkipReason::Disabled);
        }
        if !self.metadata.exists(path) {
            return Some(SkipReason::Missing);
        }
        let Some(modified) = self.metadata.modified(path) else {
            return Some(SkipReason::MetadataUnavailable);
        };
        if modified.date() == self.clock.now().date() {
            return Some(SkipReason::ModifiedToday);
        }
        None
    }

    /// Phases 2 and 3 over an already opened source
    fn prune_from<R: Read>(
        &self,
        path: &Path,
        source: R,
        policy: RetentionPolicy,
        now: NaiveDateTime,
    ) -> Result<PruneOutcome, AuditError> {
        let mut staging = tempfile::tempfile().map_err(|e| AuditError::write(path, e))?;

        let stats = {
            let mut writer = BufWriter::new(&mut staging);
            let stats = stage_retained(
                path,
                BufReader::new(source),
                &mut writer,
                policy,
                now,
                PartialLine::Stop,
            )?;
            writer.flush().map_err(|e| AuditError::write(path, e))?;
            stats
        };

        let tail = self.swap(path, &mut staging, stats.consumed, policy, now)?;

        let report = PruneReport {
            kept: stats.kept + tail.kept,
            expired: stats.expired + tail.expired,
            undatable: stats.undatable + tail.undatable,
            tail_bytes: tail.consumed,
        };
        info!(
            kept = report.kept,
            dropped = report.dropped(),
            undatable = report.undatable,
            tail_bytes = report.tail_bytes,
            "Audit log pruned"
        );
        Ok(PruneOutcome::Pruned(report))
    }

    /// Phase 3: filters the unread tail and rewrites the target in place
    fn swap(
        &self,
        path: &Path,
        staging: &mut File,
        consumed: u64,
        policy: RetentionPolicy,
        now: NaiveDateTime,
    ) -> Result<FilterStats, AuditError> {
        let guard = self
            .lock
            .lock_exclusive(path, self.lock_timeout)
            .map_err(|e| {
                error!(error = %e, "Could not lock audit log for write-back; file left untouched");
                AuditError::from(e)
            })?;

        let mut target = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| AuditError::write(path, e))?;

        target
            .seek(SeekFrom::Start(consumed))
            .map_err(|e| AuditError::read(path, e))?;
        let tail = {
            let mut writer = BufWriter::new(&mut *staging);
            let tail = stage_retained(
                path,
                BufReader::new(&mut target),
                &mut writer,
                policy,
                now,
                PartialLine::Filter,
            )?;
            writer.flush().map_err(|e| AuditError::write(path, e))?;
            tail
        };
        if tail.consumed > 0 {
            debug!(
                tail_bytes = tail.consumed,
                kept = tail.kept,
                "Filtered lines past the unlocked read"
            );
        }

        let staged_bytes = staging
            .stream_position()
            .map_err(|e| AuditError::write(path, e))?;

        copy_back_with_retry(path, staged_bytes, || {
            staging.seek(SeekFrom::Start(0))?;
            write_back(&mut target, staging)
        })?;

        guard.release();
        Ok(tail)
    }
}

impl fmt::Debug for RetentionPruner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetentionPruner")
            .field("lock_timeout", &self.lock_timeout)
            .finish()
    }
}

/// Path of the sidecar lock serialising prune passes over `path`
pub fn prune_lock_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(PRUNE_LOCK_SUFFIX);
    PathBuf::from(name)
}

/// Copies retained lines from `reader` into `writer`, in order
///
/// `partial` decides the fate of a final line without `\n`: the unlocked
/// read leaves it for the swap, the swap filters it.
fn stage_retained<R: BufRead, W: Write>(
    path: &Path,
    mut reader: R,
    writer: &mut W,
    policy: RetentionPolicy,
    now: NaiveDateTime,
    partial: PartialLine,
) -> Result<FilterStats, AuditError> {
    let mut stats = FilterStats::default();
    let mut line = Vec::new();
    let mut line_number: u64 = 0;

    loop {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .map_err(|e| AuditError::read(path, e))?;
        if read == 0 || (partial == PartialLine::Stop && line.last() != Some(&b'\n')) {
            break;
        }
        line_number += 1;
        stats.consumed += read as u64;

        match parse_line_date(&line) {
            Some(date) if policy.retains(date, now) => {
                writer
                    .write_all(&line)
                    .map_err(|e| AuditError::write(path, e))?;
                stats.kept += 1;
            }
            Some(_) => stats.expired += 1,
            None => {
                debug!(line_number, "Dropping audit line without a date prefix");
                stats.undatable += 1;
            }
        }
    }

    Ok(stats)
}

/// Runs `attempt` and retries it once on failure
///
/// After truncation the staged lines exist only in the anonymous staging
/// file, which is gone once the pass returns, so a second failure is logged
/// with the size of what was lost.
fn copy_back_with_retry<F>(path: &Path, staged_bytes: u64, mut attempt: F) -> Result<(), AuditError>
where
    F: FnMut() -> io::Result<()>,
{
    let first = match attempt() {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    warn!(error = %first, staged_bytes, "Audit log write-back failed, retrying from staging");

    attempt().map_err(|e| {
        error!(
            path = %path.display(),
            error = %e,
            first_error = %first,
            staged_bytes,
            "Audit log write-back failed twice; retained lines are lost"
        );
        AuditError::write(path, e)
    })
}

fn write_back(target: &mut File, staging: &mut File) -> io::Result<()> {
    target.set_len(0)?;
    target.seek(SeekFrom::Start(0))?;
    io::copy(staging, target)?;
    target.flush()?;
    target.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::{FlockFileLock, InProcessLock};
    use auditsink_core::ports::{FixedClock, FixedMetadata};
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::TempDir;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn pruner_at(now: NaiveDateTime, modified: Option<NaiveDateTime>) -> RetentionPruner {
        RetentionPruner::new(
            Arc::new(FixedClock::new(now)),
            Arc::new(FixedMetadata::new(modified)),
            Arc::new(FlockFileLock::new()),
        )
        .with_lock_timeout(Duration::from_millis(200))
    }

    fn january_log() -> String {
        let mut content = String::new();
        for day in 1..=10 {
            content.push_str(&format!("[2024-01-{day:02} 10:00:00] INFO: day {day} [] []\n"));
            if day == 6 {
                content.push_str("malformed continuation line\n");
            }
        }
        content
    }

    /// Fails with an I/O error once `fail_after` bytes have been served
    struct FailingReader {
        data: Vec<u8>,
        pos: usize,
        fail_after: usize,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.pos >= self.fail_after {
                return Err(io::Error::new(io::ErrorKind::Other, "disk went away"));
            }
            let end = self.fail_after.min(self.data.len()).min(self.pos + buf.len());
            let n = end - self.pos;
            buf[..n].copy_from_slice(&self.data[self.pos..end]);
            self.pos = end;
            Ok(n)
        }
    }

    #[test]
    fn test_prunes_expired_and_malformed_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.log");
        fs::write(&path, january_log()).unwrap();

        let pruner = pruner_at(at(2024, 1, 20, 9), Some(at(2024, 1, 10, 10)));
        let outcome = pruner.prune(&path, RetentionPolicy::new(15)).unwrap();

        assert_eq!(
            outcome,
            PruneOutcome::Pruned(PruneReport {
                kept: 6,
                expired: 4,
                undatable: 1,
                tail_bytes: 0,
            })
        );
        let content = fs::read_to_string(&path).unwrap();
        let days: Vec<&str> = content.lines().map(|l| &l[1..11]).collect();
        assert_eq!(
            days,
            vec![
                "2024-01-05",
                "2024-01-06",
                "2024-01-07",
                "2024-01-08",
                "2024-01-09",
                "2024-01-10"
            ]
        );
    }

    #[test]
    fn test_retained_lines_are_byte_identical() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.log");
        let kept = b"[2024-01-19 23:59:59] INFO: caf\xc3\xa9 \xff raw {\"a\":\"b\"} []\r\n".to_vec();
        let mut content = b"[2023-01-01 00:00:00] INFO: ancient [] []\n".to_vec();
        content.extend_from_slice(&kept);
        fs::write(&path, &content).unwrap();

        let pruner = pruner_at(at(2024, 1, 20, 9), Some(at(2024, 1, 19, 23)));
        pruner.prune(&path, RetentionPolicy::new(30)).unwrap();

        assert_eq!(fs::read(&path).unwrap(), kept);
    }

    #[test]
    fn test_skip_reasons() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.log");
        let now = at(2024, 1, 20, 9);

        let pruner = pruner_at(now, Some(at(2024, 1, 1, 0)));
        assert_eq!(
            pruner.prune(&path, RetentionPolicy::new(15)).unwrap(),
            PruneOutcome::Skipped(SkipReason::Missing)
        );

        fs::write(&path, january_log()).unwrap();
        for days in [0, -1] {
            assert_eq!(
                pruner.prune(&path, RetentionPolicy::new(days)).unwrap(),
                PruneOutcome::Skipped(SkipReason::Disabled)
            );
        }

        let pruner = pruner_at(now, None);
        assert_eq!(
            pruner.prune(&path, RetentionPolicy::new(15)).unwrap(),
            PruneOutcome::Skipped(SkipReason::MetadataUnavailable)
        );

        let pruner = pruner_at(now, Some(at(2024, 1, 20, 0)));
        assert_eq!(
            pruner.prune(&path, RetentionPolicy::new(15)).unwrap(),
            PruneOutcome::Skipped(SkipReason::ModifiedToday)
        );

        assert_eq!(fs::read_to_string(&path).unwrap(), january_log());
    }

    #[test]
    fn test_skips_when_another_pass_is_running() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.log");
        fs::write(&path, january_log()).unwrap();

        let lock = InProcessLock::new();
        let _running = lock
            .lock_exclusive(&prune_lock_path(&path), Duration::ZERO)
            .unwrap();

        let pruner = RetentionPruner::new(
            Arc::new(FixedClock::new(at(2024, 1, 20, 9))),
            Arc::new(FixedMetadata::new(Some(at(2024, 1, 10, 0)))),
            Arc::new(lock.clone()),
        );
        assert_eq!(
            pruner.prune(&path, RetentionPolicy::new(15)).unwrap(),
            PruneOutcome::Skipped(SkipReason::AlreadyRunning)
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), january_log());
    }

    #[test]
    fn test_read_failure_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.log");
        let original = january_log();
        fs::write(&path, &original).unwrap();

        let pruner = pruner_at(at(2024, 1, 20, 9), Some(at(2024, 1, 10, 0)));
        let source = FailingReader {
            data: original.clone().into_bytes(),
            pos: 0,
            fail_after: original.len() / 2,
        };
        let err = pruner
            .prune_from(&path, source, RetentionPolicy::new(15), at(2024, 1, 20, 9))
            .unwrap_err();

        assert!(matches!(err, AuditError::Read { .. }));
        assert!(!err.is_fatal());
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn test_lock_timeout_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.log");
        fs::write(&path, january_log()).unwrap();

        let lock = InProcessLock::new();
        let _writer = lock
            .lock_exclusive(&path, Duration::from_millis(10))
            .unwrap();

        let pruner = RetentionPruner::new(
            Arc::new(FixedClock::new(at(2024, 1, 20, 9))),
            Arc::new(FixedMetadata::new(Some(at(2024, 1, 10, 0)))),
            Arc::new(lock.clone()),
        )
        .with_lock_timeout(Duration::from_millis(20));

        let err = pruner.prune(&path, RetentionPolicy::new(15)).unwrap_err();
        assert!(matches!(err, AuditError::Lock(_)));
        assert_eq!(fs::read_to_string(&path).unwrap(), january_log());
        assert!(!lock.is_held(&prune_lock_path(&path)));
    }

    fn pruned_report(outcome: PruneOutcome) -> PruneReport {
        match outcome {
            PruneOutcome::Pruned(report) => report,
            other => panic!("expected a prune, got {other:?}"),
        }
    }

    #[test]
    fn test_fresh_unterminated_final_line_is_kept() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.log");
        fs::write(
            &path,
            "[2023-06-01 00:00:00] INFO: old [] []\n[2024-01-19 08:00:00] INFO: partial",
        )
        .unwrap();

        let pruner = pruner_at(at(2024, 1, 20, 9), Some(at(2024, 1, 19, 8)));
        let report = pruned_report(pruner.prune(&path, RetentionPolicy::new(15)).unwrap());

        assert_eq!(report.kept, 1);
        assert_eq!(report.expired, 1);
        assert_eq!(report.tail_bytes, 35);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "[2024-01-19 08:00:00] INFO: partial"
        );
    }

    #[test]
    fn test_stale_unterminated_final_line_is_dropped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.log");
        fs::write(
            &path,
            "[2024-01-19 08:00:00] INFO: fresh [] []\n[2020-01-01 00:00:00] INFO: ancient",
        )
        .unwrap();

        let pruner = pruner_at(at(2024, 1, 20, 9), Some(at(2024, 1, 19, 8)));
        let report = pruned_report(pruner.prune(&path, RetentionPolicy::new(15)).unwrap());

        assert_eq!(report.kept, 1);
        assert_eq!(report.expired, 1);
        assert_eq!(report.tail_bytes, 35);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "[2024-01-19 08:00:00] INFO: fresh [] []\n"
        );
    }

    #[test]
    fn test_undatable_unterminated_final_line_is_dropped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.log");
        fs::write(
            &path,
            "[2024-01-19 08:00:00] INFO: fresh [] []\ngarbage no date",
        )
        .unwrap();

        let pruner = pruner_at(at(2024, 1, 20, 9), Some(at(2024, 1, 19, 8)));
        let report = pruned_report(pruner.prune(&path, RetentionPolicy::new(15)).unwrap());

        assert_eq!(report.undatable, 1);
        assert_eq!(report.tail_bytes, 15);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "[2024-01-19 08:00:00] INFO: fresh [] []\n"
        );
    }

    #[test]
    fn test_lines_past_the_read_offset_are_filtered() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.log");
        let read_part = "[2024-01-19 00:00:00] INFO: a [] []\n";
        let appended = "[2020-01-01 00:00:00] INFO: b [] []\n\
                        noise\n\
                        [2024-01-18 00:00:00] INFO: d [] []\n";
        fs::write(&path, format!("{read_part}{appended}")).unwrap();

        // The unlocked read only saw the first line; the rest arrived later
        let pruner = pruner_at(at(2024, 1, 20, 9), Some(at(2024, 1, 19, 0)));
        let outcome = pruner
            .prune_from(
                &path,
                read_part.as_bytes(),
                RetentionPolicy::new(15),
                at(2024, 1, 20, 9),
            )
            .unwrap();

        assert_eq!(
            pruned_report(outcome),
            PruneReport {
                kept: 2,
                expired: 1,
                undatable: 1,
                tail_bytes: appended.len() as u64,
            }
        );
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "[2024-01-19 00:00:00] INFO: a [] []\n[2024-01-18 00:00:00] INFO: d [] []\n"
        );
    }

    #[test]
    fn test_stage_retained_counts_consumed_bytes() {
        let input = b"[2024-01-19] a\nbad\n[2020-01-01] b\n".to_vec();
        let mut out = Vec::new();
        let stats = stage_retained(
            Path::new("audit.log"),
            &input[..],
            &mut out,
            RetentionPolicy::new(5),
            at(2024, 1, 20, 0),
            PartialLine::Stop,
        )
        .unwrap();

        assert_eq!(out, b"[2024-01-19] a\n");
        assert_eq!(stats.kept, 1);
        assert_eq!(stats.undatable, 1);
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.consumed, input.len() as u64);
    }

    #[test]
    fn test_stage_retained_partial_line_modes() {
        let input = b"[2024-01-19] a\n[2024-01-19] b";
        let policy = RetentionPolicy::new(5);
        let now = at(2024, 1, 20, 0);

        let mut out = Vec::new();
        let stats = stage_retained(
            Path::new("audit.log"),
            &input[..],
            &mut out,
            policy,
            now,
            PartialLine::Stop,
        )
        .unwrap();
        assert_eq!(out, b"[2024-01-19] a\n");
        assert_eq!(stats.consumed, 15);

        let mut out = Vec::new();
        let stats = stage_retained(
            Path::new("audit.log"),
            &input[..],
            &mut out,
            policy,
            now,
            PartialLine::Filter,
        )
        .unwrap();
        assert_eq!(out, input.to_vec());
        assert_eq!(stats.kept, 2);
        assert_eq!(stats.consumed, input.len() as u64);
    }

    #[test]
    fn test_sidecar_lock_file_stays_empty_next_to_log() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("audit.log");
        fs::write(&path, january_log()).unwrap();

        let pruner = pruner_at(at(2024, 1, 20, 9), Some(at(2024, 1, 10, 10)));
        pruner.prune(&path, RetentionPolicy::new(15)).unwrap();

        let sidecar = prune_lock_path(&path);
        assert_eq!(fs::metadata(&sidecar).unwrap().len(), 0);

        // Removing it between passes is harmless
        fs::remove_file(&sidecar).unwrap();
        assert!(pruner
            .prune(&path, RetentionPolicy::new(15))
            .unwrap()
            .is_pruned());
    }

    #[test]
    fn test_copy_back_retries_once() {
        let mut attempts = 0;
        copy_back_with_retry(Path::new("audit.log"), 42, || {
            attempts += 1;
            if attempts == 1 {
                Err(io::Error::new(io::ErrorKind::Other, "transient"))
            } else {
                Ok(())
            }
        })
        .unwrap();
        assert_eq!(attempts, 2);
    }

    #[test]
    fn test_copy_back_gives_up_after_second_failure() {
        let mut attempts = 0;
        let err = copy_back_with_retry(Path::new("audit.log"), 42, || {
            attempts += 1;
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        })
        .unwrap_err();

        assert_eq!(attempts, 2);
        assert!(matches!(err, AuditError::Write { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_outcome_display_and_json() {
        let report = PruneReport {
            kept: 6,
            expired: 4,
            undatable: 1,
            tail_bytes: 0,
        };
        let pruned = PruneOutcome::Pruned(report);
        assert_eq!(pruned.to_string(), "Pruned(kept 6, dropped 5)");
        assert_eq!(pruned.to_json()["outcome"], "pruned");
        assert_eq!(pruned.to_json()["dropped"], 5);

        let skipped = PruneOutcome::Skipped(SkipReason::ModifiedToday);
        assert_eq!(skipped.to_string(), "Skipped(already modified today)");
        assert_eq!(skipped.to_json()["reason"], "already modified today");
        assert!(!skipped.is_pruned());
    }

    #[test]
    fn test_prune_lock_path_appends_suffix() {
        assert_eq!(
            prune_lock_path(Path::new("/var/log/audit.log")),
            PathBuf::from("/var/log/audit.log.prune.lock")
        );
    }
}
