//! Primary tracking for a replicated PostgreSQL cluster
//!
//! This module provides:
//! - Primary detection for a single member (`pg_is_in_recovery`)
//! - A cluster connection holding one pool per member
//! - Periodic primary re-detection with an atomically swapped primary reference

mod cluster;
mod primary;

pub use cluster::{ClusterConnection, ClusterState, RefreshOptions, RefreshOutcome};
pub use primary::{PgPrimaryDetector, PrimaryDetector};
