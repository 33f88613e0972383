mod file;
mod name;
mod record;

pub use file::{MigrationFile, DOWN_MARKER, NEW_MIGRATION_TEMPLATE};
pub use name::{MigrationName, VERSION_FORMAT};
pub use record::{
    pending_files, MigrationRecord, MigrationState, MigrationStatus, RecordKind, StatusEntry,
};
