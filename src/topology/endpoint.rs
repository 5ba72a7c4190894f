use std::fmt;
use std::hash::{Hash, Hasher};

/// One cluster member, identified by host name and port
///
/// `can_be_primary` is a hint taken from the connection string the endpoint
/// was parsed from. It does not take part in equality or hashing.
#[derive(Debug, Clone)]
pub struct Endpoint {
    name: String,
    port: u16,
    can_be_primary: bool,
}

impl Endpoint {
    pub fn new(name: impl Into<String>, port: u16, can_be_primary: bool) -> Self {
        Self {
            name: name.into(),
            port,
            can_be_primary,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn can_be_primary(&self) -> bool {
        self.can_be_primary
    }

    /// Address string (host:port), bracketing IPv6 literals
    pub fn addr(&self) -> String {
        self.to_string()
    }
}

impl PartialEq for Endpoint {
    fn eq(&self, other: &Self) -> bool {
        self.port == other.port && self.name == other.name
    }
}

impl Eq for Endpoint {}

impl Hash for Endpoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.port.hash(state);
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.contains(':') {
            write!(f, "[{}]:{}", self.name, self.port)
        } else {
            write!(f, "{}:{}", self.name, self.port)
        }
    }
}
