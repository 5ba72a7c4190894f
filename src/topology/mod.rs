//! Cluster topology from connection strings
//!
//! This module provides:
//! - `Endpoint`, the immutable identity of one cluster member
//! - Parsing of multi-host connection strings into per-host strings
//! - Validators shared with credentials and check context

mod endpoint;
mod parser;
pub mod validation;

pub use endpoint::Endpoint;
pub use parser::{
    build_common_url_to_primary, parse_connection_url, parse_connection_urls,
    strip_role_parameter, HostUrl, RoleSelection, DEFAULT_PORT, URL_HEADER,
};
