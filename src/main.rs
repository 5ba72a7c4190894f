use std::fmt::Debug;
use std::sync::Arc;

use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use pg_cluster_audit::check::{
    stats_reset_message, ClusterChecker, DatabaseManagement, Diagnostic, InvalidIndexes,
    PgStatisticsMaintenance, TablesWithoutPrimaryKey, UnusedIndexes,
};
use pg_cluster_audit::config::{self, Config};
use pg_cluster_audit::health::{ClusterConnection, PgPrimaryDetector};
use pg_cluster_audit::metrics::start_metrics_server;
use pg_cluster_audit::pool::PgMemberConnectionFactory;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = load_or_default_config();

    if config.metrics.enabled {
        let addr = config.metrics.listen_addr.clone();
        tokio::spawn(async move {
            if let Err(e) = start_metrics_server(&addr).await {
                error!(addr = %addr, error = %e, "Metrics server stopped");
            }
        });
    }

    let credentials = config.cluster.credentials()?;
    let options = config.refresh.options()?;
    let context = config.context.check_context()?;
    let factory = PgMemberConnectionFactory::new(config.pool.member_pool_config()?);

    info!(
        urls = credentials.connection_urls().count(),
        refresh_interval = ?options.refresh_interval,
        probe_timeout = ?options.probe_timeout,
        "Connecting to cluster"
    );
    let cluster = Arc::new(
        ClusterConnection::connect(&credentials, options, &factory, Arc::new(PgPrimaryDetector))
            .await?,
    );
    for member in cluster.members() {
        info!(
            endpoint = %member.endpoint(),
            can_be_primary = member.endpoint().can_be_primary(),
            "Cluster member"
        );
    }

    let management = DatabaseManagement::new(Arc::clone(&cluster), Arc::new(PgStatisticsMaintenance));
    match management.last_stats_reset().await {
        Ok(reset) => info!(
            primary = %cluster.primary().endpoint(),
            "{}",
            stats_reset_message(reset, chrono::Utc::now())
        ),
        Err(e) => warn!(error = %e, "Could not read last statistics reset"),
    }

    let checker = ClusterChecker::new(Arc::clone(&cluster), context);
    if config.checks.run_on_startup {
        run_check(&checker, InvalidIndexes).await;
        run_check(&checker, TablesWithoutPrimaryKey).await;
        run_check(&checker, UnusedIndexes).await;
    }

    info!(primary = %cluster.primary().endpoint(), "Tracking primary, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    cluster.close().await;
    Ok(())
}

/// Run one diagnostic with its default targets and log the findings
async fn run_check<D>(checker: &ClusterChecker, diagnostic: D)
where
    D: Diagnostic,
    D::Finding: Debug,
{
    let kind = diagnostic.kind();
    match checker.check(Arc::new(diagnostic), |_| true).await {
        Ok(findings) => {
            info!(diagnostic = %kind, findings = findings.len(), "Diagnostic finished");
            for finding in &findings {
                info!(diagnostic = %kind, finding = ?finding, "Finding");
            }
        }
        Err(e) => warn!(diagnostic = %kind, error = %e, "Diagnostic could not run"),
    }
}

fn load_or_default_config() -> Config {
    // Try to load from config file
    let config_paths = ["config/pg-cluster-audit.toml", "pg-cluster-audit.toml"];

    for path in config_paths {
        match config::load_config(path) {
            Ok(config) => {
                info!(path = path, "Loaded configuration");
                return config;
            }
            Err(e) => {
                warn!(path = path, error = %e, "Failed to load config");
            }
        }
    }

    info!(
        searched = ?config_paths,
        "No usable configuration file found, using default configuration for a local server"
    );
    Config::default()
}
