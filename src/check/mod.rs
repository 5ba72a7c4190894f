//! Diagnostics and cluster-wide checks
//!
//! This module provides:
//! - The `Diagnostic` and `Finding` traits and the closed `DiagnosticKind` set
//! - Per-member execution and cross-member reconciliation (union / intersection)
//! - `ClusterChecker`, which fans a diagnostic out over the cluster
//! - A few built-in catalog diagnostics
//! - Cluster-wide statistics reset and lookup

mod builtin;
mod cluster_check;
mod context;
mod diagnostic;
mod management;
mod reconcile;
mod runner;
mod stats;

pub use builtin::{
    InvalidIndex, InvalidIndexes, TableWithoutPrimaryKey, TablesWithoutPrimaryKey, UnusedIndex,
    UnusedIndexes,
};
pub use cluster_check::{ClusterChecker, TargetMembers};
pub use context::{
    CheckContext, DEFAULT_BLOAT_PERCENTAGE_THRESHOLD, DEFAULT_REMAINING_PERCENTAGE_THRESHOLD,
    DEFAULT_SCHEMA_NAME,
};
pub use diagnostic::{Diagnostic, DiagnosticKind, ExecutionTopology, Finding};
pub use management::{DatabaseManagement, PgStatisticsMaintenance, StatisticsMaintenance};
pub use reconcile::{intersection, union, ReconciliationPolicy};
pub use runner::{run_on_member, MemberFindings};
pub use stats::{last_stats_reset, log_last_stats_reset, stats_reset_message};
