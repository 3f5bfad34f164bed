//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. The audit sink and the retention pruner depend on
//! these, and their production implementations live in the audit crate.
//!
//! ## Ports Overview
//!
//! - [`IClock`] - Current local wall-clock time
//! - [`IFileMetadata`] - Existence and last-modified time of the audit file
//! - [`IFileLock`] - Exclusive advisory lock shared by append and prune

pub mod clock;
pub mod file_lock;
pub mod file_metadata;

pub use clock::{FixedClock, IClock, SystemClock};
pub use file_lock::{IFileLock, LockGuard};
pub use file_metadata::{FixedMetadata, FsMetadata, IFileMetadata};
