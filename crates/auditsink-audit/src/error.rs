//! Error types for the audit sink and pruner

use std::path::{Path, PathBuf};

use auditsink_core::domain::LockError;
use thiserror::Error;

/// Errors raised by appends and prune passes
#[derive(Debug, Error)]
pub enum AuditError {
    /// The audit file (or its directory) could not be created or written
    #[error("failed to write audit log {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The audit file could not be read during a prune pass
    #[error("failed to read audit log {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The exclusive lock could not be acquired
    #[error(transparent)]
    Lock(#[from] LockError),
}

impl AuditError {
    pub fn write(path: &Path, source: std::io::Error) -> Self {
        AuditError::Write {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn read(path: &Path, source: std::io::Error) -> Self {
        AuditError::Read {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Returns true for failures that mean an audit record may be missing
    ///
    /// Read failures during pruning leave the file untouched and are not fatal.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, AuditError::Read { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_display() {
        let err = AuditError::write(
            Path::new("/var/log/audit.log"),
            io::Error::new(io::ErrorKind::Other, "No space left on device"),
        );
        assert_eq!(
            err.to_string(),
            "failed to write audit log /var/log/audit.log: No space left on device"
        );

        let err = AuditError::from(LockError::Timeout {
            path: PathBuf::from("/var/log/audit.log"),
            waited_ms: 10,
        });
        assert_eq!(
            err.to_string(),
            "timed out after 10ms waiting for exclusive lock on /var/log/audit.log"
        );
    }

    #[test]
    fn test_fatality() {
        let io_err = || io::Error::new(io::ErrorKind::Other, "boom");
        assert!(AuditError::write(Path::new("a"), io_err()).is_fatal());
        assert!(!AuditError::read(Path::new("a"), io_err()).is_fatal());
        assert!(AuditError::Lock(LockError::Timeout {
            path: PathBuf::from("a"),
            waited_ms: 1,
        })
        .is_fatal());
    }
}
