use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MigrateError;

/// SQL driver used to reach the database.
///
/// Only PostgreSQL is supported; the legacy driver names are accepted so
/// existing invocations keep working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    #[default]
    Postgres,
}

impl Driver {
    /// URL scheme prepended to connection strings that carry none.
    pub fn scheme(&self) -> &'static str {
        match self {
            Driver::Postgres => "postgres",
        }
    }
}

impl FromStr for Driver {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" | "psycopg2" => Ok(Driver::Postgres),
            other => Err(MigrateError::Config(format!(
                "unsupported driver '{}', expected one of: postgres, postgresql, pg",
                other
            ))),
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL.
    #[serde(default)]
    pub url: String,

    /// Driver for the connection.
    #[serde(default)]
    pub driver: Driver,

    /// Connection pool size. Migrations run over a single connection.
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// Connect/checkout timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Statement timeout in seconds; unset leaves the server default.
    #[serde(default)]
    pub statement_timeout_secs: Option<u64>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            driver: Driver::default(),
            pool_size: default_pool_size(),
            connect_timeout_secs: default_connect_timeout(),
            statement_timeout_secs: None,
        }
    }
}

impl DatabaseConfig {
    /// Connection URL with the driver scheme added when the raw value has none.
    pub fn connection_url(&self) -> String {
        let url = self.url.trim();
        if url.contains("://") {
            url.to_string()
        } else {
            format!("{}://{}", self.driver.scheme(), url)
        }
    }
}

fn default_pool_size() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    30
}
