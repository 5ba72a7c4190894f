//! Primary detection for PostgreSQL members
//!
//! A member is the primary when it is not in recovery. The probe is a single
//! scalar query run through the member's pool; any failure is reported as a
//! `ProbeError`, never as "not primary".

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::ProbeError;
use crate::metrics::metrics;
use crate::pool::MemberConnection;

/// Answers whether a member currently accepts writes
#[async_trait]
pub trait PrimaryDetector: Send + Sync {
    async fn is_primary(&self, member: &MemberConnection) -> Result<bool, ProbeError>;
}

/// Detector using `pg_is_in_recovery()`
#[derive(Debug, Clone, Copy, Default)]
pub struct PgPrimaryDetector;

impl PgPrimaryDetector {
    const PROBE_SQL: &'static str = "select not pg_is_in_recovery()";
}

#[async_trait]
impl PrimaryDetector for PgPrimaryDetector {
    async fn is_primary(&self, member: &MemberConnection) -> Result<bool, ProbeError> {
        let writable: bool = sqlx::query_scalar(Self::PROBE_SQL)
            .fetch_one(member.pool())
            .await
            .map_err(|source| ProbeError::Query {
                endpoint: member.endpoint().clone(),
                source,
            })?;

        debug!(endpoint = %member.endpoint(), writable, "Primary probe completed");
        Ok(writable)
    }
}

/// Run one probe bounded by `timeout`
pub(crate) async fn probe_with_timeout(
    detector: &dyn PrimaryDetector,
    member: &MemberConnection,
    timeout: Duration,
) -> Result<bool, ProbeError> {
    let result = match tokio::time::timeout(timeout, detector.is_primary(member)).await {
        Ok(result) => result,
        Err(_) => Err(ProbeError::Timeout {
            endpoint: member.endpoint().clone(),
            timeout,
        }),
    };

    let label = match &result {
        Ok(true) => "primary",
        Ok(false) => "replica",
        Err(ProbeError::Timeout { .. }) => "timeout",
        Err(ProbeError::Query { .. }) => "failure",
    };
    metrics().record_probe(label);
    result
}
