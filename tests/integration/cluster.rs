//! Cluster connection integration tests

use crate::{get_cluster_config, skip_if_not_enabled};
use pg_cluster_audit::health::{ClusterState, RefreshOutcome};

#[tokio::test]
async fn test_connect_finds_writable_primary() {
    skip_if_not_enabled!();

    let cluster = get_cluster_config().connect().await;
    assert_eq!(cluster.state(), ClusterState::Active);
    assert!(!cluster.members().is_empty());

    let primary = cluster.primary();
    assert!(cluster
        .probe(primary.endpoint())
        .await
        .expect("Probe of primary should succeed"));

    let in_recovery: bool = sqlx::query_scalar("select pg_is_in_recovery()")
        .fetch_one(primary.pool())
        .await
        .expect("Recovery query should succeed");
    assert!(!in_recovery);

    cluster.close().await;
}

#[tokio::test]
async fn test_refresh_keeps_stable_primary() {
    skip_if_not_enabled!();

    let cluster = get_cluster_config().connect().await;
    let before = cluster.primary();

    assert_eq!(cluster.refresh_now().await, RefreshOutcome::Unchanged);
    tokio::time::sleep(std::time::Duration::from_millis(1200)).await;
    assert_eq!(cluster.primary().endpoint(), before.endpoint());

    cluster.close().await;
}

#[tokio::test]
async fn test_close_twice() {
    skip_if_not_enabled!();

    let cluster = get_cluster_config().connect().await;
    cluster.close().await;
    cluster.close().await;

    assert!(cluster.is_closed());
    assert!(cluster.members().iter().all(|m| m.is_closed()));
}
