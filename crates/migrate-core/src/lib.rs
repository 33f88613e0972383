//! Core types for the `migrate` tool: configuration, errors, and the
//! migration file and bookkeeping models.

pub mod config;
pub mod error;
pub mod migration;
pub mod sql;

#[cfg(feature = "testing")]
pub mod testing;

pub use config::{Command, ConfigOverrides, DatabaseConfig, Driver, MigrateConfig, RunnerConfig};
pub use error::{MigrateError, Result};
pub use migration::{MigrationFile, MigrationName, MigrationRecord, MigrationStatus, RecordKind};
