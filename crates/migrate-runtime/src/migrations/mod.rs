mod generator;
mod loader;
mod runner;

pub use generator::MigrationGenerator;
pub use loader::{list_migration_files, read_migration};
pub use runner::{ExecuteReport, MigrationRunner, RollbackReport};
