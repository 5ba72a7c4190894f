//! Diagnostic integration tests

use std::sync::Arc;

use crate::{get_cluster_config, skip_if_not_enabled, unique_schema};
use pg_cluster_audit::check::{
    CheckContext, ClusterChecker, DatabaseManagement, InvalidIndexes, PgStatisticsMaintenance,
    TablesWithoutPrimaryKey, UnusedIndexes,
};
use pg_cluster_audit::health::ClusterConnection;

async fn execute(cluster: &ClusterConnection, sql: &str) {
    sqlx::query(sql)
        .execute(cluster.primary().pool())
        .await
        .unwrap_or_else(|e| panic!("'{}' should succeed: {}", sql, e));
}

async fn drop_schema(cluster: &ClusterConnection, schema: &str) {
    let sql = format!("drop schema if exists {} cascade", schema);
    let _ = sqlx::query(&sql).execute(cluster.primary().pool()).await;
}

#[tokio::test]
async fn test_tables_without_primary_key() {
    skip_if_not_enabled!();

    let cluster = get_cluster_config().connect().await;
    let schema = unique_schema("it_no_pk");
    drop_schema(&cluster, &schema).await;
    execute(&cluster, &format!("create schema {}", schema)).await;
    execute(&cluster, &format!("create table {}.audit_log (id bigint, payload text)", schema)).await;
    execute(&cluster, &format!("create table {}.accounts (id bigint primary key)", schema)).await;

    let context = CheckContext::of_schema(&schema).expect("Schema name should be valid");
    let checker = ClusterChecker::new(Arc::clone(&cluster), context);
    let findings = checker
        .check(Arc::new(TablesWithoutPrimaryKey), |_| true)
        .await
        .expect("Check should succeed");

    let tables: Vec<&str> = findings.iter().map(|f| f.table_name.as_str()).collect();
    assert_eq!(tables, vec![format!("{}.audit_log", schema).as_str()]);

    let none = checker
        .check(Arc::new(TablesWithoutPrimaryKey), |f| f.table_size_bytes > 1_000_000_000)
        .await
        .expect("Check should succeed");
    assert!(none.is_empty());

    drop_schema(&cluster, &schema).await;
    cluster.close().await;
}

#[tokio::test]
async fn test_unused_indexes_across_cluster() {
    skip_if_not_enabled!();

    let cluster = get_cluster_config().connect().await;
    let schema = unique_schema("it_unused");
    drop_schema(&cluster, &schema).await;
    execute(&cluster, &format!("create schema {}", schema)).await;
    execute(
        &cluster,
        &format!("create table {}.orders (id bigint primary key, created_at timestamptz)", schema),
    )
    .await;
    execute(
        &cluster,
        &format!("create index orders_created_at_idx on {}.orders (created_at)", schema),
    )
    .await;

    let checker = ClusterChecker::new(
        Arc::clone(&cluster),
        CheckContext::of_schema(&schema).expect("Schema name should be valid"),
    );
    let findings = checker
        .check(Arc::new(UnusedIndexes), |_| true)
        .await
        .expect("Check should succeed on every member");

    // Replicas may not have replayed the index yet
    if cluster.members().len() == 1 {
        let indexes: Vec<&str> = findings.iter().map(|f| f.index_name.as_str()).collect();
        assert_eq!(
            indexes,
            vec![format!("{}.orders_created_at_idx", schema).as_str()]
        );
    }

    drop_schema(&cluster, &schema).await;
    cluster.close().await;
}

#[tokio::test]
async fn test_invalid_indexes_empty_schema() {
    skip_if_not_enabled!();

    let cluster = get_cluster_config().connect().await;
    let schema = unique_schema("it_invalid");
    drop_schema(&cluster, &schema).await;
    execute(&cluster, &format!("create schema {}", schema)).await;

    let checker = ClusterChecker::new(
        Arc::clone(&cluster),
        CheckContext::of_schema(&schema).expect("Schema name should be valid"),
    );
    let findings = checker
        .check(Arc::new(InvalidIndexes), |_| true)
        .await
        .expect("Check should succeed");
    assert!(findings.is_empty());

    drop_schema(&cluster, &schema).await;
    cluster.close().await;
}

#[tokio::test]
async fn test_reset_statistics_on_all_members() {
    skip_if_not_enabled!();

    let cluster = get_cluster_config().connect().await;
    let management = DatabaseManagement::new(Arc::clone(&cluster), Arc::new(PgStatisticsMaintenance));

    let before = chrono::Utc::now() - chrono::Duration::seconds(5);
    assert!(management
        .reset_statistics()
        .await
        .expect("Reset should succeed on every member"));

    let reset = management
        .last_stats_reset()
        .await
        .expect("Lookup should succeed")
        .expect("Primary should report a reset time");
    assert!(reset >= before);

    cluster.close().await;
}
