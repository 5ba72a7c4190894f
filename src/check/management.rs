//! Cluster-wide statistics maintenance
//!
//! Resetting statistics has to reach every member, since each replica keeps
//! its own usage counters. The last reset time is read from the primary.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::error::CheckExecutionError;
use crate::health::ClusterConnection;
use crate::pool::MemberConnection;

use super::stats::last_stats_reset;

const RESET_STATISTICS_SQL: &str = "select pg_stat_reset()";

/// Statistics operations on a single member
#[async_trait]
pub trait StatisticsMaintenance: Send + Sync + 'static {
    /// Reset usage counters; returns whether the member performed the reset
    async fn reset_statistics(&self, member: &MemberConnection) -> Result<bool, sqlx::Error>;

    async fn last_stats_reset(
        &self,
        member: &MemberConnection,
    ) -> Result<Option<DateTime<Utc>>, sqlx::Error>;
}

/// Statistics maintenance through the PostgreSQL statistics functions
#[derive(Debug, Clone, Copy, Default)]
pub struct PgStatisticsMaintenance;

#[async_trait]
impl StatisticsMaintenance for PgStatisticsMaintenance {
    async fn reset_statistics(&self, member: &MemberConnection) -> Result<bool, sqlx::Error> {
        sqlx::query(RESET_STATISTICS_SQL)
            .execute(member.pool())
            .await?;
        Ok(true)
    }

    async fn last_stats_reset(
        &self,
        member: &MemberConnection,
    ) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
        last_stats_reset(member).await
    }
}

/// Statistics maintenance for a whole cluster
pub struct DatabaseManagement {
    cluster: Arc<ClusterConnection>,
    statistics: Arc<dyn StatisticsMaintenance>,
}

impl DatabaseManagement {
    pub fn new(cluster: Arc<ClusterConnection>, statistics: Arc<dyn StatisticsMaintenance>) -> Self {
        Self {
            cluster,
            statistics,
        }
    }

    /// Reset statistics on every member
    ///
    /// Every member is attempted. Any failure fails the call with the first
    /// error in member order; otherwise the result is true only if every
    /// member reported a reset.
    pub async fn reset_statistics(&self) -> Result<bool, CheckExecutionError> {
        let _registration = self.cluster.register_operation()?;
        let members = self.cluster.members();

        let results = join_all(members.iter().map(|member| {
            debug!(endpoint = %member.endpoint(), "Resetting statistics");
            self.statistics.reset_statistics(member)
        }))
        .await;

        let mut all_reset = true;
        let mut first_error = None;
        for (member, result) in members.iter().zip(results) {
            match result {
                Ok(reset) => all_reset &= reset,
                Err(source) => {
                    warn!(endpoint = %member.endpoint(), error = %source, "Statistics reset failed on member");
                    first_error.get_or_insert(CheckExecutionError::Maintenance {
                        operation: "reset",
                        endpoint: member.endpoint().clone(),
                        source,
                    });
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }
        info!(members = members.len(), all_reset, "Statistics reset across cluster");
        Ok(all_reset)
    }

    /// Time of the last statistics reset on the current primary
    pub async fn last_stats_reset(&self) -> Result<Option<DateTime<Utc>>, CheckExecutionError> {
        let _registration = self.cluster.register_operation()?;
        let primary = self.cluster.primary();
        debug!(primary = %primary.endpoint(), "Reading last statistics reset");

        self.statistics
            .last_stats_reset(&primary)
            .await
            .map_err(|source| CheckExecutionError::Maintenance {
                operation: "lookup",
                endpoint: primary.endpoint().clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::TimeZone;

    use crate::error::ProbeError;
    use crate::health::{PrimaryDetector, RefreshOptions};
    use crate::pool::test_member;

    struct FixedPrimary(&'static str);

    #[async_trait]
    impl PrimaryDetector for FixedPrimary {
        async fn is_primary(&self, member: &MemberConnection) -> Result<bool, ProbeError> {
            Ok(member.endpoint().name() == self.0)
        }
    }

    #[derive(Clone, Copy)]
    enum Reset {
        Done,
        Skipped,
        Fails,
    }

    /// Statistics answering from a per-host script
    struct ScriptedStatistics {
        resets: HashMap<&'static str, Reset>,
        last_reset: HashMap<&'static str, DateTime<Utc>>,
        calls: AtomicUsize,
    }

    impl ScriptedStatistics {
        fn new(resets: &[(&'static str, Reset)]) -> Self {
            Self {
                resets: resets.iter().copied().collect(),
                last_reset: HashMap::new(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl StatisticsMaintenance for ScriptedStatistics {
        async fn reset_statistics(&self, member: &MemberConnection) -> Result<bool, sqlx::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.resets.get(member.endpoint().name()) {
                Some(Reset::Done) | None => Ok(true),
                Some(Reset::Skipped) => Ok(false),
                Some(Reset::Fails) => Err(sqlx::Error::PoolTimedOut),
            }
        }

        async fn last_stats_reset(
            &self,
            member: &MemberConnection,
        ) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.last_reset.get(member.endpoint().name()).copied())
        }
    }

    async fn management(
        names: &[&str],
        primary: &'static str,
        statistics: ScriptedStatistics,
    ) -> (DatabaseManagement, Arc<ScriptedStatistics>) {
        let members = names.iter().map(|name| test_member(name)).collect();
        let cluster = ClusterConnection::from_members(
            members,
            Arc::new(FixedPrimary(primary)),
            RefreshOptions::default(),
        )
        .await
        .unwrap();
        let statistics = Arc::new(statistics);
        let management = DatabaseManagement::new(Arc::new(cluster), statistics.clone());
        (management, statistics)
    }

    #[tokio::test]
    async fn test_reset_on_every_member() {
        let (management, statistics) =
            management(&["pg-1", "pg-2", "pg-3"], "pg-1", ScriptedStatistics::new(&[])).await;

        assert!(management.reset_statistics().await.unwrap());
        assert_eq!(statistics.calls.load(Ordering::SeqCst), 3);
        management.cluster.close().await;
    }

    #[tokio::test]
    async fn test_reset_is_and_of_members() {
        let (management, _) = management(
            &["pg-1", "pg-2"],
            "pg-1",
            ScriptedStatistics::new(&[("pg-1", Reset::Done), ("pg-2", Reset::Skipped)]),
        )
        .await;

        assert!(!management.reset_statistics().await.unwrap());
        management.cluster.close().await;
    }

    #[tokio::test]
    async fn test_reset_fails_if_any_member_fails() {
        let (management, statistics) = management(
            &["pg-1", "pg-2", "pg-3"],
            "pg-1",
            ScriptedStatistics::new(&[("pg-2", Reset::Fails), ("pg-3", Reset::Fails)]),
        )
        .await;

        let err = management.reset_statistics().await.unwrap_err();
        assert!(matches!(
            err,
            CheckExecutionError::Maintenance { operation: "reset", .. }
        ));
        assert_eq!(err.endpoint().map(|e| e.name()), Some("pg-2"));
        assert_eq!(statistics.calls.load(Ordering::SeqCst), 3);
        management.cluster.close().await;
    }

    #[tokio::test]
    async fn test_last_reset_read_from_primary() {
        let reset = Utc.with_ymd_and_hms(2024, 3, 8, 9, 0, 0).unwrap();
        let mut scripted = ScriptedStatistics::new(&[]);
        scripted.last_reset.insert("pg-2", reset);
        let (management, statistics) = management(&["pg-1", "pg-2"], "pg-2", scripted).await;

        assert_eq!(management.last_stats_reset().await.unwrap(), Some(reset));
        assert_eq!(statistics.calls.load(Ordering::SeqCst), 1);
        management.cluster.close().await;
    }

    #[tokio::test]
    async fn test_never_reset_on_primary() {
        let (management, _) =
            management(&["pg-1", "pg-2"], "pg-1", ScriptedStatistics::new(&[])).await;

        assert_eq!(management.last_stats_reset().await.unwrap(), None);
        management.cluster.close().await;
    }

    #[tokio::test]
    async fn test_rejected_after_close() {
        let (management, statistics) =
            management(&["pg-1", "pg-2"], "pg-1", ScriptedStatistics::new(&[])).await;
        management.cluster.close().await;

        assert!(matches!(
            management.reset_statistics().await,
            Err(CheckExecutionError::ClusterClosed)
        ));
        assert!(matches!(
            management.last_stats_reset().await,
            Err(CheckExecutionError::ClusterClosed)
        ));
        assert_eq!(statistics.calls.load(Ordering::SeqCst), 0);
    }
}
