//! auditsink Core - Domain types, ports and configuration
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `AuditRecord`, `Level`, `RetentionPolicy`, the log line parser
//! - **Port definitions** - Traits for adapters: `IClock`, `IFileMetadata`, `IFileLock`
//! - **Configuration** - YAML-backed `Config` with validation and a builder
//!
//! # Architecture
//!
//! The domain module is pure: it never touches the filesystem or the wall clock.
//! Ports define the trait interfaces the audit crate's adapters implement, so
//! time, file metadata and locking can all be replaced by fakes in tests.

pub mod config;
pub mod domain;
pub mod ports;
