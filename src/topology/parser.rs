//! Multi-host connection string parsing
//!
//! Splits `postgresql://host-1:5432,host-2:5432/db?params` into one
//! connection string per host. The role-selection parameter of every derived
//! string is rewritten to `any`, so each host can be probed whatever its
//! current role is.

use std::collections::{BTreeMap, HashMap};

use crate::error::ConfigurationError;

use super::endpoint::Endpoint;
use super::validation::{port_in_acceptable_range, url_not_blank_and_valid};

/// Protocol prefix every connection string must start with
pub const URL_HEADER: &str = "postgresql://";

/// Port used when a host segment omits one
pub const DEFAULT_PORT: u16 = 5432;

/// Parameters added to a joint primary URL unless overridden
const DEFAULT_URL_PARAMETERS: [(&str, &str); 4] = [
    ("targetServerType", "primary"),
    ("hostRecheckSeconds", "2"),
    ("connectTimeout", "1"),
    ("socketTimeout", "600"),
];

/// Role requested through the `targetServerType` parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleSelection {
    Any,
    Primary,
    PreferPrimary,
    Secondary,
    PreferSecondary,
}

impl RoleSelection {
    pub const PARAMETER: &'static str = "targetServerType";

    /// Parse a parameter value, accepting legacy spellings
    ///
    /// Values are case-sensitive.
    pub fn parse(value: &str) -> Result<Self, ConfigurationError> {
        match value {
            "any" => Ok(Self::Any),
            "primary" | "master" => Ok(Self::Primary),
            "preferPrimary" => Ok(Self::PreferPrimary),
            "secondary" | "slave" => Ok(Self::Secondary),
            "preferSecondary" | "preferSlave" => Ok(Self::PreferSecondary),
            other => Err(ConfigurationError::UnsupportedRoleSelection {
                value: other.to_string(),
            }),
        }
    }

    /// Current spelling of this role
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Primary => "primary",
            Self::PreferPrimary => "preferPrimary",
            Self::Secondary => "secondary",
            Self::PreferSecondary => "preferSecondary",
        }
    }

    /// Whether a host selected this way is known never to be writable
    pub fn is_replica_only(&self) -> bool {
        *self == Self::Secondary
    }
}

/// A single-host connection string and the endpoint it targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostUrl {
    pub endpoint: Endpoint,
    pub url: String,
}

/// Parse several connection strings into one entry per distinct host
///
/// The first occurrence of a host (name and port) wins, including its role
/// hint. Output follows first-seen order across the inputs.
pub fn parse_connection_urls<I, S>(urls: I) -> Result<Vec<HostUrl>, ConfigurationError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut result: Vec<HostUrl> = Vec::new();
    for url in urls {
        for host in parse_connection_url(url.as_ref())? {
            if !result.iter().any(|h| h.endpoint == host.endpoint) {
                result.push(host);
            }
        }
    }
    Ok(result)
}

/// Parse one, possibly multi-host, connection string
///
/// A string with no hosts after the prefix yields an empty list.
pub fn parse_connection_url(url: &str) -> Result<Vec<HostUrl>, ConfigurationError> {
    let url = url_not_blank_and_valid(url, "pgUrl")?;
    let (hosts_block, tail) = split_hosts(url);
    let (tail, role) = rewrite_role_parameter(tail)?;
    let can_be_primary = role.map_or(true, |r| !r.is_replica_only());

    let mut hosts: Vec<HostUrl> = Vec::new();
    for segment in hosts_block.split(',').filter(|s| !s.trim().is_empty()) {
        let (name, port) = parse_host_segment(segment)?;
        let endpoint = Endpoint::new(name, port, can_be_primary);
        if hosts.iter().any(|h| h.endpoint == endpoint) {
            continue;
        }
        let url = format!("{}{}{}", URL_HEADER, endpoint, tail);
        hosts.push(HostUrl { endpoint, url });
    }
    Ok(hosts)
}

/// Remove the role-selection parameter from a connection string
///
/// The parameter is meaningful to this crate only; the database driver
/// receives the string without it.
pub fn strip_role_parameter(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };
    let kept: Vec<&str> = query
        .split('&')
        .filter(|pair| parameter_name(pair) != RoleSelection::PARAMETER)
        .collect();
    if kept.is_empty() {
        base.to_string()
    } else {
        format!("{}?{}", base, kept.join("&"))
    }
}

/// Build one connection string to the primary of a cluster from several URLs
///
/// Host blocks are joined in sorted order; the database name comes from the
/// first URL in sorted order. `url_parameters` override the defaults.
pub fn build_common_url_to_primary(
    urls: &[&str],
    url_parameters: &HashMap<String, String>,
) -> Result<String, ConfigurationError> {
    let mut sorted: Vec<&str> = Vec::with_capacity(urls.len());
    for url in urls {
        sorted.push(url_not_blank_and_valid(url, "pgUrl")?);
    }
    sorted.sort_unstable();
    sorted.dedup();
    let first = sorted.first().ok_or(ConfigurationError::NoConnectionUrls)?;

    let database = extract_database_name(first)?;
    let mut hosts: Vec<&str> = sorted.iter().map(|u| split_hosts(u).0).collect();
    hosts.sort_unstable();

    Ok(format!(
        "{}{}{}{}",
        URL_HEADER,
        hosts.join(","),
        database,
        construct_url_parameters(url_parameters)
    ))
}

/// Database segment of a connection string including its leading slash
fn extract_database_name(url: &str) -> Result<&str, ConfigurationError> {
    let (_, tail) = split_hosts(url);
    match tail.find('?') {
        Some(1) => Err(ConfigurationError::InvalidDatabaseName {
            url: url.to_string(),
        }),
        Some(idx) => Ok(&tail[..idx]),
        None => Ok(tail),
    }
}

/// Render defaults merged with explicit parameters, sorted by name
fn construct_url_parameters(url_parameters: &HashMap<String, String>) -> String {
    let mut joint: BTreeMap<&str, &str> = url_parameters
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    for (key, value) in DEFAULT_URL_PARAMETERS {
        joint.entry(key).or_insert(value);
    }
    let rendered: Vec<String> = joint.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    format!("?{}", rendered.join("&"))
}

/// Split a validated URL into its host block and the `/db?params` tail
///
/// The database segment is optional, so the host block ends at the first
/// `/` or `?`.
fn split_hosts(url: &str) -> (&str, &str) {
    let rest = &url[URL_HEADER.len()..];
    match rest.find(&['/', '?'][..]) {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, ""),
    }
}

/// Rewrite the role parameter of a `/db?params` tail to `any`
///
/// Returns the rewritten tail and the role originally requested, if any.
fn rewrite_role_parameter(
    tail: &str,
) -> Result<(String, Option<RoleSelection>), ConfigurationError> {
    let Some((path, query)) = tail.split_once('?') else {
        return Ok((tail.to_string(), None));
    };

    let mut role = None;
    let mut pairs: Vec<String> = Vec::new();
    for pair in query.split('&') {
        if parameter_name(pair) == RoleSelection::PARAMETER {
            let value = pair.split_once('=').map(|(_, v)| v).unwrap_or_default();
            role = Some(RoleSelection::parse(value)?);
            pairs.push(format!(
                "{}={}",
                RoleSelection::PARAMETER,
                RoleSelection::Any.as_str()
            ));
        } else {
            pairs.push(pair.to_string());
        }
    }
    Ok((format!("{}?{}", path, pairs.join("&")), role))
}

fn parameter_name(pair: &str) -> &str {
    pair.split_once('=').map_or(pair, |(name, _)| name)
}

/// Parse `host`, `host:port`, `[v6]` or `[v6]:port`
fn parse_host_segment(segment: &str) -> Result<(String, u16), ConfigurationError> {
    let malformed = || ConfigurationError::InvalidUrlFormat {
        argument: "hostName",
        url: segment.to_string(),
    };

    let (host, port) = if let Some(bracketed) = segment.strip_prefix('[') {
        let (host, after) = bracketed.split_once(']').ok_or_else(malformed)?;
        match after.strip_prefix(':') {
            Some(port) => (host, Some(port)),
            None if after.is_empty() => (host, None),
            None => return Err(malformed()),
        }
    } else {
        match segment.split_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (segment, None),
        }
    };

    if host.trim().is_empty() {
        return Err(malformed());
    }

    let port = match port {
        Some(p) => p.parse::<u16>().map_err(|_| ConfigurationError::InvalidPort {
            segment: segment.to_string(),
        })?,
        None => DEFAULT_PORT,
    };
    let port = port_in_acceptable_range(port)?;
    Ok((host.to_string(), port))
}
