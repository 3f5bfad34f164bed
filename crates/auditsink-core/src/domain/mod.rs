//! Domain entities and business logic
//!
//! This module contains the core domain types for auditsink:
//! - Severity levels for audit records
//! - The audit record and its single-line rendering
//! - The audit file line parser and age computation
//! - The retention policy
//! - Domain-specific error types

pub mod errors;
pub mod level;
pub mod log_line;
pub mod record;
pub mod retention;

// Re-export commonly used types
pub use errors::{DomainError, LockError};
pub use level::Level;
pub use log_line::{age_in_days, parse_line_date};
pub use record::{parse_context_pair, AuditRecord, RequestContext, TIMESTAMP_FORMAT};
pub use retention::RetentionPolicy;
