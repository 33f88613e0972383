use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::MigrateError;

/// Tag stored in the `app` column of the bookkeeping table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// Forward application (`"app"`).
    Apply,
    /// Rollback (`"app_rollback"`).
    Rollback,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Apply => "app",
            RecordKind::Rollback => "app_rollback",
        }
    }
}

impl FromStr for RecordKind {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "app" => Ok(RecordKind::Apply),
            "app_rollback" => Ok(RecordKind::Rollback),
            other => Err(MigrateError::Database(format!(
                "unknown migration record tag '{}'",
                other
            ))),
        }
    }
}

impl TryFrom<String> for RecordKind {
    type Error = MigrateError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row of the bookkeeping table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct MigrationRecord {
    pub id: i32,
    pub name: String,
    #[sqlx(rename = "app", try_from = "String")]
    pub kind: RecordKind,
    pub applied_at: DateTime<Utc>,
}

/// Files that have no forward-application record, in file order.
///
/// `files` is expected to be sorted already; `applied` may come in any order.
pub fn pending_files<'a, I, S>(files: &'a [String], applied: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let applied: HashSet<String> = applied
        .into_iter()
        .map(|name| name.as_ref().to_string())
        .collect();

    files
        .iter()
        .filter(|file| !applied.contains(file.as_str()))
        .map(String::as_str)
        .collect()
}

/// Where a single migration file stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    Pending,
    Applied { at: DateTime<Utc> },
    RolledBack { at: DateTime<Utc> },
}

/// One line of the status report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub name: String,
    pub state: MigrationState,
}

/// State of every migration file plus records with no file on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationStatus {
    pub entries: Vec<StatusEntry>,
    pub missing_files: Vec<String>,
}

impl MigrationStatus {
    /// Build the report from sorted file names and the full record history.
    ///
    /// A file without a forward record is pending. Otherwise the most recent
    /// record (highest id) decides between applied and rolled back.
    pub fn from_records(files: &[String], records: &[MigrationRecord]) -> Self {
        let entries = files
            .iter()
            .map(|file| {
                let history: Vec<&MigrationRecord> =
                    records.iter().filter(|r| &r.name == file).collect();

                let has_apply = history.iter().any(|r| r.kind == RecordKind::Apply);
                let latest = history.iter().max_by_key(|r| r.id);

                let state = match latest {
                    Some(r) if has_apply && r.kind == RecordKind::Apply => {
                        MigrationState::Applied { at: r.applied_at }
                    }
                    Some(r) if has_apply => MigrationState::RolledBack { at: r.applied_at },
                    _ => MigrationState::Pending,
                };

                StatusEntry {
                    name: file.clone(),
                    state,
                }
            })
            .collect();

        let on_disk: HashSet<&str> = files.iter().map(String::as_str).collect();
        let missing_files = records
            .iter()
            .filter(|r| !on_disk.contains(r.name.as_str()))
            .map(|r| r.name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Self {
            entries,
            missing_files,
        }
    }

    pub fn count(&self, pred: impl Fn(&MigrationState) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.state)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn files(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn record(id: i32, name: &str, kind: RecordKind) -> MigrationRecord {
        MigrationRecord {
            id,
            name: name.to_string(),
            kind,
            applied_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, id as u32).unwrap(),
        }
    }

    #[test]
    fn test_record_kind_tags() {
        assert_eq!(RecordKind::Apply.as_str(), "app");
        assert_eq!(RecordKind::Rollback.as_str(), "app_rollback");
        assert_eq!("app_rollback".parse::<RecordKind>().unwrap(), RecordKind::Rollback);
        assert!("other".parse::<RecordKind>().is_err());
        assert_eq!(RecordKind::try_from("app".to_string()).unwrap(), RecordKind::Apply);
    }

    #[test]
    fn test_pending_is_set_difference() {
        let on_disk = files(&[
            "20240101000000_a.sql",
            "20240102000000_b.sql",
            "20240103000000_c.sql",
        ]);

        let pending = pending_files(&on_disk, ["20240101000000_a.sql"]);
        assert_eq!(pending, vec!["20240102000000_b.sql", "20240103000000_c.sql"]);

        let pending = pending_files(&on_disk, Vec::<String>::new());
        assert_eq!(pending.len(), 3);
    }

    #[test]
    fn test_pending_independent_of_record_order() {
        let on_disk = files(&["1_a.sql", "2_b.sql", "3_c.sql", "4_d.sql"]);
        let forward = pending_files(&on_disk, ["3_c.sql", "1_a.sql"]);
        let reverse = pending_files(&on_disk, ["1_a.sql", "3_c.sql"]);
        assert_eq!(forward, reverse);
        assert_eq!(forward, vec!["2_b.sql", "4_d.sql"]);
    }

    #[test]
    fn test_pending_ignores_records_without_files() {
        let on_disk = files(&["1_a.sql"]);
        let pending = pending_files(&on_disk, ["0_gone.sql", "1_a.sql"]);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_status_states() {
        let on_disk = files(&["1_a.sql", "2_b.sql", "3_c.sql"]);
        let records = vec![
            record(1, "1_a.sql", RecordKind::Apply),
            record(2, "2_b.sql", RecordKind::Apply),
            record(3, "2_b.sql", RecordKind::Rollback),
            record(4, "9_gone.sql", RecordKind::Apply),
        ];

        let status = MigrationStatus::from_records(&on_disk, &records);
        assert_eq!(
            status.entries[0].state,
            MigrationState::Applied { at: records[0].applied_at }
        );
        assert_eq!(
            status.entries[1].state,
            MigrationState::RolledBack { at: records[2].applied_at }
        );
        assert_eq!(status.entries[2].state, MigrationState::Pending);
        assert_eq!(status.missing_files, vec!["9_gone.sql".to_string()]);
        assert_eq!(status.count(|s| matches!(s, MigrationState::Pending)), 1);
    }

    #[test]
    fn test_status_rollback_without_apply_is_pending() {
        let on_disk = files(&["1_a.sql"]);
        let records = vec![record(1, "1_a.sql", RecordKind::Rollback)];

        let status = MigrationStatus::from_records(&on_disk, &records);
        assert_eq!(status.entries[0].state, MigrationState::Pending);
    }
}
