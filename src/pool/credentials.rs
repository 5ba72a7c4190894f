use std::collections::BTreeSet;
use std::fmt;

use crate::error::ConfigurationError;
use crate::topology::validation::url_not_blank_and_valid;

/// Connection strings and login for every host of a cluster
///
/// URLs are kept sorted and deduplicated.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    connection_urls: BTreeSet<String>,
    user_name: String,
    password: String,
}

impl Credentials {
    pub fn new<I, S>(
        connection_urls: I,
        user_name: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let connection_urls: BTreeSet<String> =
            connection_urls.into_iter().map(Into::into).collect();
        if connection_urls.is_empty() {
            return Err(ConfigurationError::NoConnectionUrls);
        }
        for url in &connection_urls {
            url_not_blank_and_valid(url, "connectionUrl")?;
        }

        let user_name = user_name.into();
        if user_name.trim().is_empty() {
            return Err(ConfigurationError::BlankUserName);
        }
        let password = password.into();
        if password.trim().is_empty() {
            return Err(ConfigurationError::BlankPassword);
        }

        Ok(Self {
            connection_urls,
            user_name,
            password,
        })
    }

    /// Credentials for a single (possibly multi-host) write URL
    pub fn of_url(
        write_url: &str,
        user_name: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, ConfigurationError> {
        url_not_blank_and_valid(write_url, "writeUrl")?;
        Self::new([write_url], user_name, password)
    }

    pub fn connection_urls(&self) -> impl Iterator<Item = &str> {
        self.connection_urls.iter().map(String::as_str)
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("connection_urls", &self.connection_urls)
            .field("user_name", &self.user_name)
            .field("password", &"***")
            .finish()
    }
}
