mod database;

pub use database::{DatabaseConfig, Driver};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{MigrateError, Result};

/// Environment variable holding the connection string.
pub const DATABASE_URL_ENV: &str = "DATABASE_MIGRATION_URL";

/// Default configuration file, read only when present.
pub const DEFAULT_CONFIG_FILE: &str = "migrate.toml";

/// Default directory holding migration files.
pub const DEFAULT_MIGRATIONS_DIR: &str = "migrations";

/// Contents of the optional `migrate.toml` file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrateConfig {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Migration file location.
    #[serde(default)]
    pub migrations: MigrationsConfig,
}

impl MigrateConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| MigrateError::Config(format!("Failed to read config file: {}", e)))?;

        Self::parse_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let content = substitute_env_vars(content);

        toml::from_str(&content)
            .map_err(|e| MigrateError::Config(format!("Failed to parse config: {}", e)))
    }
}

/// Migration file location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationsConfig {
    /// Directory containing `<timestamp>_<name>.sql` files.
    #[serde(default = "default_migrations_dir")]
    pub dir: PathBuf,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            dir: default_migrations_dir(),
        }
    }
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from(DEFAULT_MIGRATIONS_DIR)
}

/// The operation a single invocation performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Execute,
    Rollback,
    Create,
    Status,
}

impl Command {
    /// Whether the command talks to the database.
    pub fn needs_database(&self) -> bool {
        !matches!(self, Command::Create)
    }

    /// Whether the command requires `--migration_name`.
    pub fn needs_migration_name(&self) -> bool {
        matches!(self, Command::Rollback | Command::Create)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Command::Execute => "execute",
            Command::Rollback => "rollback",
            Command::Create => "create",
            Command::Status => "status",
        };
        f.write_str(s)
    }
}

/// Values supplied on the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub driver: Option<String>,
    pub dbstring: Option<String>,
    pub migration_name: Option<String>,
    pub migrations_dir: Option<PathBuf>,
}

/// Everything one invocation needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub command: Command,
    pub database: DatabaseConfig,
    pub migrations_dir: PathBuf,
    pub migration_name: Option<String>,
}

impl RunnerConfig {
    /// Merge command-line values, the environment URL and the config file.
    ///
    /// The connection string is taken from `--dbstring`, then the
    /// environment, then the file. Missing required values are reported as
    /// [`MigrateError::Config`] before any connection is attempted.
    pub fn resolve(
        command: Command,
        overrides: ConfigOverrides,
        env_url: Option<String>,
        file: MigrateConfig,
    ) -> Result<Self> {
        let mut database = file.database;

        if let Some(driver) = overrides.driver.as_deref() {
            database.driver = driver.parse()?;
        }

        let url = non_empty(overrides.dbstring)
            .map(|url| ("--dbstring", url))
            .or_else(|| non_empty(env_url).map(|url| (DATABASE_URL_ENV, url)))
            .or_else(|| non_empty(Some(database.url.clone())).map(|url| ("config file", url)));

        match url {
            Some((source, url)) => {
                debug!("Using connection string from {}", source);
                database.url = url;
            }
            None if command.needs_database() => {
                return Err(MigrateError::Config(format!(
                    "dbstring is missing, provide it with the {} environment variable or --dbstring",
                    DATABASE_URL_ENV
                )));
            }
            None => {}
        }

        let migration_name = non_empty(overrides.migration_name);
        let migration_name = match (command, migration_name) {
            (Command::Rollback, Some(name)) => Some(validate_name(rollback_stem(&name))?),
            (Command::Create, Some(name)) => Some(validate_name(&name)?),
            (cmd, None) if cmd.needs_migration_name() => {
                return Err(MigrateError::Config(format!(
                    "missing --migration_name for {}",
                    cmd
                )));
            }
            (_, name) => name,
        };

        let migrations_dir = overrides.migrations_dir.unwrap_or(file.migrations.dir);

        Ok(Self {
            command,
            database,
            migrations_dir,
            migration_name,
        })
    }

    /// The migration name, or a config error when the command needed one.
    pub fn require_migration_name(&self) -> Result<&str> {
        self.migration_name.as_deref().ok_or_else(|| {
            MigrateError::Config(format!("missing --migration_name for {}", self.command))
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Rollback names are given without the `.sql` suffix; tolerate it anyway.
fn rollback_stem(name: &str) -> &str {
    name.strip_suffix(".sql").unwrap_or(name)
}

/// Names must stay inside the migrations directory.
fn validate_name(name: &str) -> Result<String> {
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(MigrateError::Config(format!(
            "invalid migration name '{}': must not contain path separators",
            name
        )));
    }
    Ok(name.to_string())
}

/// Substitute `${VAR_NAME}` with environment variable values.
fn substitute_env_vars(content: &str) -> String {
    let mut result = content.to_string();
    let re = match regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}") {
        Ok(re) => re,
        Err(_) => return result,
    };

    for cap in re.captures_iter(content) {
        let var_name = &cap[1];
        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(&cap[0], &value);
        }
    }

    result
}
