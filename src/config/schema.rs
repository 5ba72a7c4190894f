use std::time::Duration;

use serde::Deserialize;

use crate::check::{
    CheckContext, DEFAULT_BLOAT_PERCENTAGE_THRESHOLD, DEFAULT_REMAINING_PERCENTAGE_THRESHOLD,
    DEFAULT_SCHEMA_NAME,
};
use crate::error::ConfigurationError;
use crate::health::RefreshOptions;
use crate::pool::{Credentials, MemberPoolConfig};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Cluster topology and login
    pub cluster: ClusterConfig,
    /// Background primary refresh
    #[serde(default)]
    pub refresh: RefreshConfig,
    /// Per-member connection pools
    #[serde(default)]
    pub pool: PoolConfig,
    /// Schema and thresholds for diagnostics
    #[serde(default)]
    pub context: ContextConfig,
    /// Diagnostics run by the binary
    #[serde(default)]
    pub checks: ChecksConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    /// Validate every section without opening connections
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.cluster.credentials()?;
        self.refresh.options()?;
        self.pool.member_pool_config()?;
        self.context.check_context()?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cluster: ClusterConfig::default(),
            refresh: RefreshConfig::default(),
            pool: PoolConfig::default(),
            context: ContextConfig::default(),
            checks: ChecksConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

// ============================================================================
// Cluster Configuration
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ClusterConfig {
    /// Connection strings; each may list several hosts
    pub connection_urls: Vec<String>,
    pub user: String,
    pub password: String,
}

impl ClusterConfig {
    pub fn credentials(&self) -> Result<Credentials, ConfigurationError> {
        Credentials::new(
            self.connection_urls.iter().cloned(),
            self.user.as_str(),
            self.password.as_str(),
        )
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            connection_urls: vec!["postgresql://127.0.0.1:5432/postgres".to_string()],
            user: "postgres".to_string(),
            password: "postgres".to_string(),
        }
    }
}

// ============================================================================
// Refresh Configuration
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    /// Interval between refresh cycles (milliseconds)
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
    /// Timeout for each member probe (milliseconds)
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

fn default_refresh_interval_ms() -> u64 {
    5000
}

fn default_probe_timeout_ms() -> u64 {
    3000
}

impl RefreshConfig {
    pub fn options(&self) -> Result<RefreshOptions, ConfigurationError> {
        RefreshOptions::new(
            Duration::from_millis(self.refresh_interval_ms),
            Duration::from_millis(self.probe_timeout_ms),
        )
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_refresh_interval_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

// ============================================================================
// Pool Configuration
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
    #[serde(default = "default_max_lifetime_ms")]
    pub max_lifetime_ms: u64,
}

fn default_max_connections() -> u32 {
    2
}

fn default_acquire_timeout_ms() -> u64 {
    5000
}

fn default_idle_timeout_ms() -> u64 {
    300_000 // 5 minutes
}

fn default_max_lifetime_ms() -> u64 {
    3_600_000 // 1 hour
}

impl PoolConfig {
    pub fn member_pool_config(&self) -> Result<MemberPoolConfig, ConfigurationError> {
        let config = MemberPoolConfig {
            max_connections: self.max_connections,
            acquire_timeout: Duration::from_millis(self.acquire_timeout_ms),
            idle_timeout: Duration::from_millis(self.idle_timeout_ms),
            max_lifetime: Duration::from_millis(self.max_lifetime_ms),
        };
        config.validate()?;
        Ok(config)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            max_lifetime_ms: default_max_lifetime_ms(),
        }
    }
}

// ============================================================================
// Check Context / Checks Configuration
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ContextConfig {
    #[serde(default = "default_schema_name")]
    pub schema_name: String,
    #[serde(default = "default_bloat_percentage_threshold")]
    pub bloat_percentage_threshold: f64,
    #[serde(default = "default_remaining_percentage_threshold")]
    pub remaining_percentage_threshold: f64,
}

fn default_schema_name() -> String {
    DEFAULT_SCHEMA_NAME.to_string()
}

fn default_bloat_percentage_threshold() -> f64 {
    DEFAULT_BLOAT_PERCENTAGE_THRESHOLD
}

fn default_remaining_percentage_threshold() -> f64 {
    DEFAULT_REMAINING_PERCENTAGE_THRESHOLD
}

impl ContextConfig {
    pub fn check_context(&self) -> Result<CheckContext, ConfigurationError> {
        CheckContext::new(
            &self.schema_name,
            self.bloat_percentage_threshold,
            self.remaining_percentage_threshold,
        )
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            schema_name: default_schema_name(),
            bloat_percentage_threshold: default_bloat_percentage_threshold(),
            remaining_percentage_threshold: default_remaining_percentage_threshold(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChecksConfig {
    /// Run the built-in diagnostics once after connecting
    #[serde(default = "default_run_on_startup")]
    pub run_on_startup: bool,
}

fn default_run_on_startup() -> bool {
    true
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            run_on_startup: default_run_on_startup(),
        }
    }
}

// ============================================================================
// Metrics Configuration
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_listen_addr")]
    pub listen_addr: String,
}

fn default_metrics_listen_addr() -> String {
    "127.0.0.1:9187".to_string()
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: default_metrics_listen_addr(),
        }
    }
}
