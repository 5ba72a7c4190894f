use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tracing::debug;

use crate::error::ConfigurationError;
use crate::topology::{strip_role_parameter, HostUrl};

use super::credentials::Credentials;
use super::member::MemberConnection;

/// Configuration for the pool kept per member
#[derive(Debug, Clone)]
pub struct MemberPoolConfig {
    /// Maximum number of open connections to one member
    pub max_connections: u32,
    /// How long to wait for a free connection
    pub acquire_timeout: Duration,
    /// Maximum idle time before closing
    pub idle_timeout: Duration,
    /// Maximum connection age before recycling
    pub max_lifetime: Duration,
}

impl Default for MemberPoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 2,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(300),  // 5 minutes
            max_lifetime: Duration::from_secs(3600), // 1 hour
        }
    }
}

impl MemberPoolConfig {
    /// Reject settings that leave a pool unable to serve a query
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_connections == 0 {
            return Err(ConfigurationError::ZeroCount {
                argument: "max_connections",
            });
        }
        let durations = [
            ("acquire_timeout", self.acquire_timeout),
            ("idle_timeout", self.idle_timeout),
            ("max_lifetime", self.max_lifetime),
        ];
        for (argument, duration) in durations {
            if duration.is_zero() {
                return Err(ConfigurationError::NonPositiveDuration { argument });
            }
        }
        Ok(())
    }
}

/// Opens a `MemberConnection` for one host of the cluster
pub trait MemberConnectionFactory: Send + Sync {
    fn connect(
        &self,
        host: &HostUrl,
        credentials: &Credentials,
    ) -> Result<MemberConnection, ConfigurationError>;
}

/// Factory backed by sqlx PostgreSQL pools
///
/// Pools connect lazily: no I/O happens until the first query.
#[derive(Debug, Clone, Default)]
pub struct PgMemberConnectionFactory {
    config: MemberPoolConfig,
}

impl PgMemberConnectionFactory {
    pub fn new(config: MemberPoolConfig) -> Self {
        Self { config }
    }

    fn connect_options(
        host: &HostUrl,
        credentials: &Credentials,
    ) -> Result<PgConnectOptions, ConfigurationError> {
        let url = strip_role_parameter(&host.url);
        let options = PgConnectOptions::from_str(&url).map_err(|source| {
            ConfigurationError::ConnectOptions {
                endpoint: host.endpoint.clone(),
                source,
            }
        })?;
        Ok(options
            .username(credentials.user_name())
            .password(credentials.password()))
    }
}

impl MemberConnectionFactory for PgMemberConnectionFactory {
    fn connect(
        &self,
        host: &HostUrl,
        credentials: &Credentials,
    ) -> Result<MemberConnection, ConfigurationError> {
        let options = Self::connect_options(host, credentials)?;
        let pool = PgPoolOptions::new()
            .max_connections(self.config.max_connections)
            .min_connections(0)
            .acquire_timeout(self.config.acquire_timeout)
            .idle_timeout(Some(self.config.idle_timeout))
            .max_lifetime(Some(self.config.max_lifetime))
            .connect_lazy_with(options);

        debug!(
            endpoint = %host.endpoint,
            max_connections = self.config.max_connections,
            "Created member connection pool"
        );
        Ok(MemberConnection::new(
            host.endpoint.clone(),
            host.url.clone(),
            pool,
        ))
    }
}
