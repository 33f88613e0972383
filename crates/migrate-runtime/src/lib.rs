pub mod db;
pub mod migrations;

pub use db::Database;
pub use migrations::{ExecuteReport, MigrationGenerator, MigrationRunner, RollbackReport};
