use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::error::{Error, Result};

pub const HOST_PROPERTY: &str = "couchdb.host";
pub const PORT_PROPERTY: &str = "couchdb.port";
pub const PROTOCOL_PROPERTY: &str = "couchdb.protocol";
pub const DATABASE_PROPERTY: &str = "couchdb.database";
pub const USERNAME_PROPERTY: &str = "couchdb.username";
pub const PASSWORD_PROPERTY: &str = "couchdb.password";
pub const CREATE_DB_PROPERTY: &str = "couchdb.createdb";
pub const BATCH_SIZE_PROPERTY: &str = "batchsize";

pub const DEFAULT_BATCH_SIZE: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
}

impl Display for Protocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Http => f.write_str("http"),
            Protocol::Https => f.write_str("https"),
        }
    }
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            other => Err(Error::Config(format!("unsupported protocol '{}'", other))),
        }
    }
}

/// Connection and batching settings, read once when a client is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CouchConfig {
    pub host: String,
    pub port: u16,
    pub protocol: Protocol,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub create_db_if_absent: bool,
    pub batch_size: usize,
}

impl Default for CouchConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5984,
            protocol: Protocol::Http,
            database: "testdb".to_string(),
            username: Some("Admin".to_string()),
            password: Some("root".to_string()),
            create_db_if_absent: true,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl CouchConfig {
    /// Build a config from harness properties. Keys this adapter does not
    /// know are ignored.
    pub fn from_properties(props: &HashMap<String, String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(host) = props.get(HOST_PROPERTY) {
            config.host = host.clone();
        }
        if let Some(port) = props.get(PORT_PROPERTY) {
            config.port = parse(PORT_PROPERTY, port)?;
        }
        if let Some(protocol) = props.get(PROTOCOL_PROPERTY) {
            config.protocol = protocol.parse()?;
        }
        if let Some(database) = props.get(DATABASE_PROPERTY) {
            config.database = database.clone();
        }
        if let Some(username) = props.get(USERNAME_PROPERTY) {
            config.username = Some(username.clone()).filter(|u| !u.is_empty());
        }
        if let Some(password) = props.get(PASSWORD_PROPERTY) {
            config.password = Some(password.clone());
        }
        if let Some(create) = props.get(CREATE_DB_PROPERTY) {
            config.create_db_if_absent = parse(CREATE_DB_PROPERTY, create)?;
        }
        if let Some(batch_size) = props.get(BATCH_SIZE_PROPERTY) {
            config.batch_size = parse(BATCH_SIZE_PROPERTY, batch_size)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Config(format!(
                "{} must be a positive integer",
                BATCH_SIZE_PROPERTY
            )));
        }
        if self.database.is_empty() {
            return Err(Error::Config("database name must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("invalid value '{}' for {}", value, key)))
}
