mod create;
mod execute;
mod rollback;
mod status;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, error};

use migrate_core::config::{
    Command, ConfigOverrides, MigrateConfig, RunnerConfig, DATABASE_URL_ENV, DEFAULT_CONFIG_FILE,
};
use migrate_core::error::MigrateError;
use migrate_runtime::{Database, MigrationRunner};

/// Migrate and rollback database scripts.
#[derive(Parser)]
#[command(name = "migrate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// SQL driver to use.
    #[arg(long, global = true)]
    pub driver: Option<String>,

    /// Connection string; falls back to the DATABASE_MIGRATION_URL environment variable.
    #[arg(long, global = true)]
    pub dbstring: Option<String>,

    /// Migration name to create or roll back.
    #[arg(long = "migration_name", alias = "migration-name", global = true)]
    pub migration_name: Option<String>,

    /// Migrations directory path.
    #[arg(short, long, global = true)]
    pub migrations_dir: Option<PathBuf>,

    /// Configuration file path (read only if it exists, unless given explicitly).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// CLI commands.
#[derive(Subcommand, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Apply all pending migrations.
    Execute,

    /// Roll back one migration by running its down section.
    Rollback,

    /// Create a new migration file.
    Create,

    /// Show which migrations are applied, rolled back or pending.
    Status,
}

impl From<Commands> for Command {
    fn from(cmd: Commands) -> Self {
        match cmd {
            Commands::Execute => Command::Execute,
            Commands::Rollback => Command::Rollback,
            Commands::Create => Command::Create,
            Commands::Status => Command::Status,
        }
    }
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// Missing or invalid arguments are logged and the process returns
    /// without doing any work.
    pub async fn execute(self) -> Result<()> {
        dotenvy::dotenv().ok();
        init_tracing(self.verbose);

        let config = match self.runner_config() {
            Ok(config) => config,
            Err(e) if e.is_config() => {
                error!("{}", e);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        debug!(
            "Running {} with migrations in {:?}",
            config.command, config.migrations_dir
        );

        match config.command {
            Command::Execute => execute::run(&config).await,
            Command::Rollback => rollback::run(&config).await,
            Command::Create => create::run(&config),
            Command::Status => status::run(&config).await,
        }
    }

    /// Build the runner configuration from flags, environment and config file.
    fn runner_config(&self) -> migrate_core::Result<RunnerConfig> {
        let file = load_config_file(self.config.as_deref())?;

        RunnerConfig::resolve(
            self.command.into(),
            ConfigOverrides {
                driver: self.driver.clone(),
                dbstring: self.dbstring.clone(),
                migration_name: self.migration_name.clone(),
                migrations_dir: self.migrations_dir.clone(),
            },
            std::env::var(DATABASE_URL_ENV).ok(),
            file,
        )
    }
}

/// Read the config file; the default one is optional.
fn load_config_file(explicit: Option<&Path>) -> migrate_core::Result<MigrateConfig> {
    match explicit {
        Some(path) if !path.exists() => Err(MigrateError::Config(format!(
            "Configuration file not found: {}",
            path.display()
        ))),
        Some(path) => MigrateConfig::from_file(path),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            MigrateConfig::from_file(DEFAULT_CONFIG_FILE)
        }
        None => Ok(MigrateConfig::default()),
    }
}

fn init_tracing(verbose: bool) {
    let log_level = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string()))
        .with_target(false)
        .try_init();
}

/// Connect and build a runner for the configured migrations directory.
async fn connect(config: &RunnerConfig) -> Result<(Database, MigrationRunner)> {
    let db = Database::from_config(&config.database).await?;
    let runner = MigrationRunner::new(db.pool().clone(), &config.migrations_dir);
    Ok((db, runner))
}
