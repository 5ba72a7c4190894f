//! Primary tracking and diagnostic fan-out for replicated PostgreSQL clusters
//!
//! A `ClusterConnection` keeps one pool per member and follows the writable
//! primary in the background. A `ClusterChecker` runs catalog diagnostics on
//! the primary or on every member and reconciles the per-member findings.

pub mod check;
pub mod config;
pub mod error;
pub mod health;
pub mod metrics;
pub mod pool;
pub mod topology;

pub use check::{
    ClusterChecker, DatabaseManagement, Diagnostic, DiagnosticKind, Finding, ReconciliationPolicy,
    TargetMembers,
};
pub use error::{CheckExecutionError, ConfigurationError, Error, ProbeError, Result};
pub use health::{ClusterConnection, PgPrimaryDetector, PrimaryDetector, RefreshOptions};
pub use pool::{Credentials, MemberConnection, PgMemberConnectionFactory};
pub use topology::Endpoint;
