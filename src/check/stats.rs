//! Statistics reset tracking
//!
//! Usage counters start from zero after `pg_stat_reset()` or a replica
//! restart, so statistics-based diagnostics log when that last happened.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::pool::MemberConnection;

const LAST_STATS_RESET_SQL: &str =
    "select stats_reset from pg_catalog.pg_stat_database where datname = current_database()";

/// Time of the last statistics reset for the current database, if any
pub async fn last_stats_reset(member: &MemberConnection) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    let reset = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(LAST_STATS_RESET_SQL)
        .fetch_optional(member.pool())
        .await?;
    Ok(reset.flatten())
}

pub fn stats_reset_message(reset: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match reset {
        Some(reset) => format!(
            "Last statistics reset on this host was {} days ago ({})",
            (now - reset).num_days(),
            reset.to_rfc3339()
        ),
        None => "Statistics have never been reset on this host".to_string(),
    }
}

/// Log how long ago statistics were reset on a member
pub async fn log_last_stats_reset(member: &MemberConnection) -> Result<(), sqlx::Error> {
    let reset = last_stats_reset(member).await?;
    info!(
        endpoint = %member.endpoint(),
        "{}",
        stats_reset_message(reset, Utc::now())
    );
    Ok(())
}
