//! Integration test entry point
//!
//! Run with: PG_AUDIT_RUN_INTEGRATION_TESTS=1 cargo test --test integration
//!
//! Environment variables:
//! - PG_AUDIT_RUN_INTEGRATION_TESTS: Set to "1" to enable integration tests
//! - PG_AUDIT_TEST_URL: Cluster connection string, may list several hosts
//!   (default: postgresql://127.0.0.1:5432/postgres)
//! - PG_AUDIT_TEST_USER: Login (default: postgres)
//! - PG_AUDIT_TEST_PASS: Password (default: postgres)

mod checks;
mod cluster;

use std::env;
use std::sync::Arc;

use pg_cluster_audit::health::{ClusterConnection, PgPrimaryDetector, RefreshOptions};
use pg_cluster_audit::pool::{Credentials, PgMemberConnectionFactory};

/// Check if integration tests should run
pub fn should_run_integration_tests() -> bool {
    env::var("PG_AUDIT_RUN_INTEGRATION_TESTS")
        .map(|v| v == "1")
        .unwrap_or(false)
}

/// Skip test if integration tests are not enabled
#[macro_export]
macro_rules! skip_if_not_enabled {
    () => {
        if !crate::should_run_integration_tests() {
            eprintln!("Skipping integration test (set PG_AUDIT_RUN_INTEGRATION_TESTS=1 to run)");
            return;
        }
    };
}

/// Get cluster connection config from environment
pub fn get_cluster_config() -> ClusterTestConfig {
    ClusterTestConfig {
        url: env::var("PG_AUDIT_TEST_URL")
            .unwrap_or_else(|_| "postgresql://127.0.0.1:5432/postgres".to_string()),
        user: env::var("PG_AUDIT_TEST_USER").unwrap_or_else(|_| "postgres".to_string()),
        password: env::var("PG_AUDIT_TEST_PASS").unwrap_or_else(|_| "postgres".to_string()),
    }
}

/// Cluster test configuration
#[derive(Debug, Clone)]
pub struct ClusterTestConfig {
    pub url: String,
    pub user: String,
    pub password: String,
}

impl ClusterTestConfig {
    pub fn credentials(&self) -> Credentials {
        Credentials::of_url(&self.url, self.user.as_str(), self.password.as_str())
            .expect("Test credentials should be valid")
    }

    /// Connect to the cluster with a short refresh interval
    pub async fn connect(&self) -> Arc<ClusterConnection> {
        let options = RefreshOptions::new(
            std::time::Duration::from_millis(500),
            std::time::Duration::from_secs(2),
        )
        .expect("Refresh options should be valid");
        let cluster = ClusterConnection::connect(
            &self.credentials(),
            options,
            &PgMemberConnectionFactory::default(),
            Arc::new(PgPrimaryDetector),
        )
        .await
        .expect("Failed to connect to cluster");
        Arc::new(cluster)
    }
}

/// Schema name unique to one test run
pub fn unique_schema(prefix: &str) -> String {
    format!("{}_{}", prefix, std::process::id())
}
