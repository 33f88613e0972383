//! Migration file model.
//!
//! A migration file holds an "up" section and, optionally, a "down" section
//! separated by the literal [`DOWN_MARKER`]:
//!
//! ```text
//! CREATE TABLE t (id int);
//!
//! =====DOWN
//!
//! DROP TABLE t;
//! ```

use crate::error::{MigrateError, Result};

/// Separates the up-script (before) from the down-script (after).
pub const DOWN_MARKER: &str = "=====DOWN";

/// Content written by `create` for a new migration.
pub const NEW_MIGRATION_TEMPLATE: &str = "-- Paste your migrations here to apply inside database\n\n=====DOWN\n\n-- Paste your rollback queries to rollback database modifications";

/// A parsed migration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    file_name: String,
    up: String,
    down: Option<String>,
}

impl MigrationFile {
    /// Split `content` into its sections.
    ///
    /// Fails with [`MigrateError::MalformedMigration`] when the down marker
    /// appears more than once.
    pub fn parse(file_name: impl Into<String>, content: &str) -> Result<Self> {
        let file_name = file_name.into();
        let markers: Vec<usize> = content
            .match_indices(DOWN_MARKER)
            .map(|(idx, _)| idx)
            .collect();

        let (up, down) = match markers.as_slice() {
            [] => (content.to_string(), None),
            [idx] => (
                content[..*idx].to_string(),
                Some(content[idx + DOWN_MARKER.len()..].to_string()),
            ),
            many => {
                return Err(MigrateError::MalformedMigration {
                    file: file_name,
                    reason: format!("down marker {} appears {} times", DOWN_MARKER, many.len()),
                });
            }
        };

        Ok(Self {
            file_name,
            up,
            down,
        })
    }

    /// File name including the `.sql` suffix; also the bookkeeping record name.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// SQL run by `execute`.
    pub fn up_sql(&self) -> &str {
        &self.up
    }

    /// The down section, if the file has one.
    pub fn down_sql(&self) -> Option<&str> {
        self.down.as_deref()
    }

    pub fn has_down(&self) -> bool {
        self.down.is_some()
    }

    /// SQL run by `rollback`.
    ///
    /// Without a down section this is the whole file, i.e. the up-script.
    pub fn rollback_sql(&self) -> &str {
        self.down.as_deref().unwrap_or(&self.up)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_up_and_down() {
        let content = "CREATE TABLE t(id int);\n=====DOWN\nDROP TABLE t;\n";
        let file = MigrationFile::parse("20240101000000_init.sql", content).unwrap();

        assert_eq!(file.file_name(), "20240101000000_init.sql");
        assert_eq!(file.up_sql(), "CREATE TABLE t(id int);\n");
        assert_eq!(file.down_sql(), Some("\nDROP TABLE t;\n"));
        assert_eq!(file.rollback_sql(), "\nDROP TABLE t;\n");
        assert!(!file.up_sql().contains(DOWN_MARKER));
        assert!(!file.rollback_sql().contains(DOWN_MARKER));
    }

    #[test]
    fn test_parse_without_marker() {
        let content = "CREATE TABLE t(id int);";
        let file = MigrationFile::parse("20240101000000_init.sql", content).unwrap();

        assert!(!file.has_down());
        assert_eq!(file.up_sql(), content);
        assert_eq!(file.rollback_sql(), content);
    }

    #[test]
    fn test_parse_rejects_repeated_marker() {
        let content = "SELECT 1;\n=====DOWN\nSELECT 2;\n=====DOWN\nSELECT 3;";
        let err = MigrationFile::parse("20240101000000_bad.sql", content).unwrap_err();

        match err {
            MigrateError::MalformedMigration { file, reason } => {
                assert_eq!(file, "20240101000000_bad.sql");
                assert!(reason.contains("2 times"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_empty_sections() {
        let file = MigrationFile::parse("x.sql", "=====DOWN").unwrap();
        assert_eq!(file.up_sql(), "");
        assert_eq!(file.down_sql(), Some(""));
    }

    #[test]
    fn test_template_has_both_sections() {
        let file = MigrationFile::parse("x.sql", NEW_MIGRATION_TEMPLATE).unwrap();
        assert!(file.has_down());
        assert!(file.up_sql().contains("Paste your migrations"));
        assert!(file.rollback_sql().contains("Paste your rollback queries"));
    }
}
