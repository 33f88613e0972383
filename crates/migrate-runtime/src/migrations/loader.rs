//! Reading migration files from disk.

use std::io::ErrorKind;
use std::path::Path;

use migrate_core::error::{MigrateError, Result};
use migrate_core::migration::{MigrationFile, MigrationName};
use tracing::{debug, warn};

/// List the `.sql` files in `dir`, sorted by name.
///
/// Migration files are named `<14-digit-timestamp>_<name>.sql`, so name order
/// is creation order. A missing directory has no migrations.
pub fn list_migration_files(dir: &Path) -> Result<Vec<String>> {
    if !dir.exists() {
        debug!("Migrations directory does not exist: {:?}", dir);
        return Ok(Vec::new());
    }

    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if !path.is_file() || path.extension().map(|e| e != "sql").unwrap_or(true) {
            continue;
        }

        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                MigrateError::InvalidArgument(format!("Invalid migration filename: {:?}", path))
            })?
            .to_string();

        if !MigrationName::parse(&file_name).is_conventional() {
            warn!(
                "Migration {} does not follow <timestamp>_<name>.sql; it is ordered by name only",
                file_name
            );
        }

        files.push(file_name);
    }

    files.sort();

    debug!("Found {} migration files in {:?}", files.len(), dir);
    Ok(files)
}

/// Read and parse one migration file.
pub fn read_migration(dir: &Path, file_name: &str) -> Result<MigrationFile> {
    let path = dir.join(file_name);
    let content = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => {
            MigrateError::NotFound(format!("migration file {}", path.display()))
        }
        _ => MigrateError::Io(e),
    })?;

    MigrationFile::parse(file_name, &content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_list_from_empty_dir() {
        let dir = TempDir::new().unwrap();
        assert!(list_migration_files(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_list_from_nonexistent_dir() {
        let files = list_migration_files(Path::new("/nonexistent/migrations")).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_list_sorted() {
        let dir = TempDir::new().unwrap();

        fs::write(dir.path().join("20240102000000_second.sql"), "SELECT 2;").unwrap();
        fs::write(dir.path().join("20240101000000_first.sql"), "SELECT 1;").unwrap();
        fs::write(dir.path().join("20240103000000_third.sql"), "SELECT 3;").unwrap();

        let files = list_migration_files(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![
                "20240101000000_first.sql",
                "20240102000000_second.sql",
                "20240103000000_third.sql",
            ]
        );
    }

    #[test]
    fn test_list_ignores_non_sql() {
        let dir = TempDir::new().unwrap();

        fs::write(dir.path().join("20240101000000_init.sql"), "SELECT 1;").unwrap();
        fs::write(dir.path().join("README.md"), "notes").unwrap();
        fs::write(dir.path().join("backup.sql.bak"), "old").unwrap();
        fs::create_dir(dir.path().join("archive.sql")).unwrap();

        let files = list_migration_files(dir.path()).unwrap();
        assert_eq!(files, vec!["20240101000000_init.sql"]);
    }

    #[test]
    fn test_read_migration() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("20240101000000_init.sql"),
            "CREATE TABLE t(id int);\n=====DOWN\nDROP TABLE t;\n",
        )
        .unwrap();

        let file = read_migration(dir.path(), "20240101000000_init.sql").unwrap();
        assert_eq!(file.file_name(), "20240101000000_init.sql");
        assert!(file.has_down());
    }

    #[test]
    fn test_read_missing_migration_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = read_migration(dir.path(), "20240101000000_missing.sql").unwrap_err();
        assert!(matches!(err, MigrateError::NotFound(_)));
    }
}
