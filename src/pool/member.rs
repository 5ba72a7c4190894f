use std::hash::{Hash, Hasher};

use sqlx::PgPool;
use tracing::debug;

use crate::topology::Endpoint;

/// A pooled handle bound to exactly one cluster member
///
/// Equality and hashing use the endpoint only.
#[derive(Debug, Clone)]
pub struct MemberConnection {
    endpoint: Endpoint,
    url: String,
    pool: PgPool,
}

impl MemberConnection {
    pub fn new(endpoint: Endpoint, url: String, pool: PgPool) -> Self {
        Self {
            endpoint,
            url,
            pool,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Single-host connection string this member was opened from
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Number of idle pooled connections
    pub fn idle_count(&self) -> usize {
        self.pool.num_idle()
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// Close all pooled connections to this member
    pub async fn close(&self) {
        self.pool.close().await;
        debug!(endpoint = %self.endpoint, "Closed member connection pool");
    }
}

impl PartialEq for MemberConnection {
    fn eq(&self, other: &Self) -> bool {
        self.endpoint == other.endpoint
    }
}

impl Eq for MemberConnection {}

impl Hash for MemberConnection {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.endpoint.hash(state);
    }
}

/// Member whose pool never connects unless used
#[cfg(test)]
pub(crate) fn test_member(name: &str) -> MemberConnection {
    use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

    let endpoint = Endpoint::new(name, 5432, true);
    let options = PgConnectOptions::new().host(name).port(5432);
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_lazy_with(options);
    MemberConnection::new(endpoint, format!("postgresql://{}:5432/db", name), pool)
}
