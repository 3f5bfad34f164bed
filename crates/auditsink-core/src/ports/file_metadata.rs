//! File metadata port
//!
//! The pruner's eligibility check only needs two facts about the audit file:
//! does it exist, and when was it last modified. Both go through
//! [`IFileMetadata`] so the once-per-day rule can be tested without touching
//! real mtimes.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Local, NaiveDateTime};

/// Read-only view of audit file metadata
pub trait IFileMetadata: Send + Sync {
    /// Returns true if `path` exists
    fn exists(&self, path: &Path) -> bool;

    /// Last modification time in local wall-clock time
    ///
    /// `None` if the metadata or the timestamp cannot be read.
    fn modified(&self, path: &Path) -> Option<NaiveDateTime>;
}

/// Metadata read from the real filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsMetadata;

impl IFileMetadata for FsMetadata {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn modified(&self, path: &Path) -> Option<NaiveDateTime> {
        let modified = std::fs::metadata(path).ok()?.modified().ok()?;
        Some(DateTime::<Local>::from(modified).naive_local())
    }
}

/// Real existence checks with a pinned modification time
///
/// Lets the once-per-day rule be exercised against real files whose actual
/// mtime is always "today".
#[derive(Debug, Default)]
pub struct FixedMetadata {
    modified: Mutex<Option<NaiveDateTime>>,
}

impl FixedMetadata {
    pub fn new(modified: Option<NaiveDateTime>) -> Self {
        Self {
            modified: Mutex::new(modified),
        }
    }

    /// Pins the reported modification time
    pub fn set_modified(&self, modified: Option<NaiveDateTime>) {
        if let Ok(mut guard) = self.modified.lock() {
            *guard = modified;
        }
    }
}

impl IFileMetadata for FixedMetadata {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn modified(&self, path: &Path) -> Option<NaiveDateTime> {
        if !path.exists() {
            return None;
        }
        match self.modified.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
