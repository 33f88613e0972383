use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

use chrono::{Local, NaiveDateTime};
use migrate_core::error::{MigrateError, Result};
use migrate_core::migration::{MigrationName, NEW_MIGRATION_TEMPLATE};
use tracing::info;

/// Writes new, empty migration files.
pub struct MigrationGenerator {
    /// Output directory for migrations.
    output_dir: PathBuf,
}

impl MigrationGenerator {
    /// Create a new migration generator.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Write `<local timestamp>_<label>.sql` and return its path.
    pub fn create(&self, label: &str) -> Result<PathBuf> {
        self.create_at(label, Local::now().naive_local())
    }

    /// Write a new migration stamped with `now`.
    ///
    /// Fails if a file with the same name already exists.
    pub fn create_at(&self, label: &str, now: NaiveDateTime) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;

        let path = self.output_dir.join(MigrationName::for_new(now, label));

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => MigrateError::InvalidArgument(format!(
                    "migration {} already exists",
                    path.display()
                )),
                _ => MigrateError::Io(e),
            })?;
        file.write_all(NEW_MIGRATION_TEMPLATE.as_bytes())?;

        info!("Created migration {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use migrate_core::migration::MigrationFile;
    use tempfile::TempDir;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_create_writes_template() {
        let dir = TempDir::new().unwrap();
        let generator = MigrationGenerator::new(dir.path());

        let path = generator.create_at("init", at(0, 0, 0)).unwrap();
        assert_eq!(path, dir.path().join("20240101000000_init.sql"));

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, NEW_MIGRATION_TEMPLATE);

        let parsed = MigrationFile::parse("20240101000000_init.sql", &content).unwrap();
        assert!(parsed.has_down());
    }

    #[test]
    fn test_create_makes_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("db").join("migrations");
        let generator = MigrationGenerator::new(&nested);

        let path = generator.create("add_users").unwrap();
        assert!(path.starts_with(&nested));
        assert!(path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| MigrationName::parse(n).is_conventional())
            .unwrap_or(false));
    }

    #[test]
    fn test_create_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let generator = MigrationGenerator::new(dir.path());

        generator.create_at("init", at(1, 2, 3)).unwrap();
        let err = generator.create_at("init", at(1, 2, 3)).unwrap_err();
        assert!(matches!(err, MigrateError::InvalidArgument(_)));
    }
}
