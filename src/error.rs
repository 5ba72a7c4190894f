//! Error taxonomy for cluster auditing
//!
//! - `ConfigurationError`: bad topology, credentials or options. Fatal, never retried.
//! - `ProbeError`: a single member's primary probe failed.
//! - `CheckExecutionError`: a diagnostic could not produce a cluster-level answer.

use std::time::Duration;

use thiserror::Error;

use crate::check::{DiagnosticKind, ReconciliationPolicy, TargetMembers};
use crate::topology::Endpoint;

/// Result alias for fallible crate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error for operations that may fail for more than one reason
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Probe(#[from] ProbeError),
    #[error(transparent)]
    Check(#[from] CheckExecutionError),
}

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("{argument} cannot be blank or empty")]
    BlankUrl { argument: &'static str },
    #[error("{argument} has invalid format: {url}")]
    InvalidUrlFormat { argument: &'static str, url: String },
    #[error("invalid port in host segment '{segment}'")]
    InvalidPort { segment: String },
    #[error("the port number must be in the range from 1024 to 65535, got {port}")]
    PortOutOfRange { port: u16 },
    #[error("unsupported targetServerType value '{value}'")]
    UnsupportedRoleSelection { value: String },
    #[error("connection string has an empty database name: {url}")]
    InvalidDatabaseName { url: String },
    #[error("connectionUrls have to contain at least one url")]
    NoConnectionUrls,
    #[error("userName cannot be blank or empty")]
    BlankUserName,
    #[error("password cannot be blank or empty")]
    BlankPassword,
    #[error("schemaName cannot be blank or empty")]
    BlankSchemaName,
    #[error("{argument} must be in the range from 0 to 100, got {value}")]
    InvalidPercentage { argument: &'static str, value: f64 },
    #[error("{argument} must be a positive duration")]
    NonPositiveDuration { argument: &'static str },
    #[error("{argument} must be greater than zero")]
    ZeroCount { argument: &'static str },
    #[error("no hosts found in supplied connection strings")]
    NoHosts,
    #[error("no primary found among supplied endpoints: {endpoints}")]
    NoPrimaryFound { endpoints: String },
    #[error("endpoint {endpoint} is not a member of this cluster")]
    UnknownEndpoint { endpoint: Endpoint },
    #[error("invalid connect options for {endpoint}: {source}")]
    ConnectOptions {
        endpoint: Endpoint,
        #[source]
        source: sqlx::Error,
    },
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("primary probe failed on {endpoint}: {source}")]
    Query {
        endpoint: Endpoint,
        #[source]
        source: sqlx::Error,
    },
    #[error("primary probe on {endpoint} timed out after {timeout:?}")]
    Timeout { endpoint: Endpoint, timeout: Duration },
}

impl ProbeError {
    pub fn endpoint(&self) -> &Endpoint {
        match self {
            Self::Query { endpoint, .. } | Self::Timeout { endpoint, .. } => endpoint,
        }
    }
}

#[derive(Debug, Error)]
pub enum CheckExecutionError {
    #[error("diagnostic {diagnostic} failed on {endpoint}: {source}")]
    Execution {
        diagnostic: DiagnosticKind,
        endpoint: Endpoint,
        #[source]
        source: sqlx::Error,
    },
    #[error("diagnostic {diagnostic} task on {endpoint} aborted: {reason}")]
    Aborted {
        diagnostic: DiagnosticKind,
        endpoint: Endpoint,
        reason: String,
    },
    #[error("diagnostic {diagnostic} cannot use {policy:?} on {targets:?} members")]
    IncompatiblePolicy {
        diagnostic: DiagnosticKind,
        policy: ReconciliationPolicy,
        targets: TargetMembers,
    },
    #[error("statistics {operation} failed on {endpoint}: {source}")]
    Maintenance {
        operation: &'static str,
        endpoint: Endpoint,
        #[source]
        source: sqlx::Error,
    },
    #[error("cluster connection is closed")]
    ClusterClosed,
}

impl CheckExecutionError {
    /// Member whose failure aborted the check, when there is one
    pub fn endpoint(&self) -> Option<&Endpoint> {
        match self {
            Self::Execution { endpoint, .. }
            | Self::Aborted { endpoint, .. }
            | Self::Maintenance { endpoint, .. } => Some(endpoint),
            Self::IncompatiblePolicy { .. } | Self::ClusterClosed => None,
        }
    }
}
