//! Migration runner.
//!
//! Reconciles the migration files on disk with the `migrations` bookkeeping
//! table. Execute and rollback hold a PostgreSQL advisory lock on the single
//! connection they use, so concurrent invocations against one database run
//! one after another.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use migrate_core::error::{MigrateError, Result};
use migrate_core::migration::{
    pending_files, MigrationFile, MigrationRecord, MigrationStatus, RecordKind,
};
use migrate_core::sql::has_statements;
use sqlx::{Connection, PgConnection, PgPool};
use tracing::{debug, info, warn};

use super::loader::{list_migration_files, read_migration};

/// Lock ID for the migration advisory lock ("MIGRATE" in ASCII).
const MIGRATION_LOCK_ID: i64 = 0x4D49_4752_4154_45;

const CREATE_MIGRATIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS migrations (
        id SERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        app TEXT NOT NULL,
        applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
"#;

/// Outcome of [`MigrationRunner::execute`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecuteReport {
    /// Files applied by this run, in order.
    pub applied: Vec<String>,
    /// Files that were already applied.
    pub skipped: usize,
}

impl ExecuteReport {
    pub fn nothing_to_do(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Outcome of [`MigrationRunner::rollback`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackReport {
    /// Record name written, e.g. `20240101000000_init.sql`.
    pub name: String,
    /// False when the file had no down section and its up-script was run.
    pub used_down_section: bool,
}

/// Applies and rolls back migrations from a directory.
pub struct MigrationRunner {
    pool: PgPool,
    migrations_dir: PathBuf,
}

impl MigrationRunner {
    pub fn new(pool: PgPool, migrations_dir: impl Into<PathBuf>) -> Self {
        Self {
            pool,
            migrations_dir: migrations_dir.into(),
        }
    }

    pub fn migrations_dir(&self) -> &Path {
        &self.migrations_dir
    }

    /// Create the bookkeeping table if it does not exist.
    pub async fn initialize(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        ensure_migrations_table(&mut conn).await
    }

    /// Apply every migration file that has no forward record, in name order.
    ///
    /// Each file runs in its own transaction together with its record
    /// insert. A failure stops the batch; files applied before it stay applied.
    pub async fn execute(&self) -> Result<ExecuteReport> {
        let mut conn = self.connection().await?;
        acquire_lock(&mut conn).await?;

        let result = self.execute_locked(&mut conn).await;

        if let Err(e) = release_lock(&mut conn).await {
            warn!("Failed to release migration lock: {}", e);
        }

        result
    }

    async fn execute_locked(&self, conn: &mut PgConnection) -> Result<ExecuteReport> {
        ensure_migrations_table(conn).await?;

        let files = list_migration_files(&self.migrations_dir)?;
        let applied = applied_names(conn).await?;
        debug!("Already applied migrations: {:?}", applied);

        let pending = pending_files(&files, &applied);
        let skipped = files.len() - pending.len();

        if pending.is_empty() {
            info!("No migrations to be executed");
            return Ok(ExecuteReport {
                applied: Vec::new(),
                skipped,
            });
        }

        // Parse everything up front so a malformed file stops the run before
        // anything is applied.
        let migrations = pending
            .iter()
            .map(|name| read_migration(&self.migrations_dir, name))
            .collect::<Result<Vec<MigrationFile>>>()?;

        let mut report = ExecuteReport {
            applied: Vec::with_capacity(migrations.len()),
            skipped,
        };

        for migration in &migrations {
            info!("Applying migration: {}", migration.file_name());
            apply(conn, migration.file_name(), RecordKind::Apply, migration.up_sql()).await?;
            info!("Migration applied: {}", migration.file_name());
            report.applied.push(migration.file_name().to_string());
        }

        info!("All {} migrations applied successfully", report.applied.len());
        Ok(report)
    }

    /// Run the down section of `<name>.sql` and record the rollback.
    ///
    /// The forward record is kept; the file still counts as applied.
    pub async fn rollback(&self, name: &str) -> Result<RollbackReport> {
        let file_name = format!("{}.sql", name);
        info!("Preparing to roll back migration {}", name);

        let migration = read_migration(&self.migrations_dir, &file_name)?;
        if !migration.has_down() {
            warn!(
                "Migration {} has no down section; re-running its up-script as the rollback",
                file_name
            );
        }

        let mut conn = self.connection().await?;
        acquire_lock(&mut conn).await?;

        let result = async {
            ensure_migrations_table(&mut conn).await?;
            info!("Rolling back migration: {}", file_name);
            apply(
                &mut conn,
                &file_name,
                RecordKind::Rollback,
                migration.rollback_sql(),
            )
            .await
        }
        .await;

        if let Err(e) = release_lock(&mut conn).await {
            warn!("Failed to release migration lock: {}", e);
        }

        result?;
        info!("Rollback of {} executed successfully", file_name);

        Ok(RollbackReport {
            name: file_name,
            used_down_section: migration.has_down(),
        })
    }

    /// Where every file stands, plus records whose file is gone.
    pub async fn status(&self) -> Result<MigrationStatus> {
        let mut conn = self.connection().await?;
        ensure_migrations_table(&mut conn).await?;

        let files = list_migration_files(&self.migrations_dir)?;
        let records = all_records(&mut conn).await?;

        Ok(MigrationStatus::from_records(&files, &records))
    }

    async fn connection(&self) -> Result<sqlx::pool::PoolConnection<sqlx::Postgres>> {
        self.pool
            .acquire()
            .await
            .map_err(|e| MigrateError::Database(format!("Failed to acquire connection: {}", e)))
    }
}

async fn ensure_migrations_table(conn: &mut PgConnection) -> Result<()> {
    debug!("Ensuring migrations table exists");
    sqlx::query(CREATE_MIGRATIONS_TABLE)
        .execute(&mut *conn)
        .await
        .map_err(|e| MigrateError::Database(format!("Failed to create migrations table: {}", e)))?;
    Ok(())
}

async fn acquire_lock(conn: &mut PgConnection) -> Result<()> {
    debug!("Acquiring migration lock...");
    sqlx::query("SELECT pg_advisory_lock($1)")
        .bind(MIGRATION_LOCK_ID)
        .execute(&mut *conn)
        .await
        .map_err(|e| MigrateError::Database(format!("Failed to acquire migration lock: {}", e)))?;
    debug!("Migration lock acquired");
    Ok(())
}

async fn release_lock(conn: &mut PgConnection) -> Result<()> {
    sqlx::query("SELECT pg_advisory_unlock($1)")
        .bind(MIGRATION_LOCK_ID)
        .execute(&mut *conn)
        .await
        .map_err(|e| MigrateError::Database(format!("Failed to release migration lock: {}", e)))?;
    debug!("Migration lock released");
    Ok(())
}

async fn applied_names(conn: &mut PgConnection) -> Result<HashSet<String>> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT DISTINCT name FROM migrations WHERE app = $1")
            .bind(RecordKind::Apply.as_str())
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| {
                MigrateError::Database(format!("Failed to get applied migrations: {}", e))
            })?;

    Ok(rows.into_iter().map(|(name,)| name).collect())
}

async fn all_records(conn: &mut PgConnection) -> Result<Vec<MigrationRecord>> {
    sqlx::query_as("SELECT id, name, app, applied_at FROM migrations ORDER BY id")
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| MigrateError::Database(format!("Failed to read migrations: {}", e)))
}

/// Run `sql` and insert its bookkeeping record in one transaction.
///
/// The section goes to the server as a single simple query, so it may hold
/// any number of statements.
async fn apply(conn: &mut PgConnection, name: &str, kind: RecordKind, sql: &str) -> Result<()> {
    let mut tx = conn
        .begin()
        .await
        .map_err(|e| MigrateError::Database(format!("Failed to start transaction: {}", e)))?;

    if has_statements(sql) {
        debug!("Executing {}:\n{}", name, sql.trim());
        sqlx::raw_sql(sql).execute(&mut *tx).await.map_err(|e| {
            MigrateError::Database(format!("Failed to apply migration '{}': {}", name, e))
        })?;
    } else {
        warn!("Migration {} has no statements to run; recording it anyway", name);
    }

    sqlx::query("INSERT INTO migrations (name, app) VALUES ($1, $2)")
        .bind(name)
        .bind(kind.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            MigrateError::Database(format!("Failed to record migration '{}': {}", name, e))
        })?;

    tx.commit()
        .await
        .map_err(|e| MigrateError::Database(format!("Failed to commit migration '{}': {}", name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_id_is_ascii_migrate() {
        let bytes = MIGRATION_LOCK_ID.to_be_bytes();
        assert_eq!(&bytes[1..], b"MIGRATE");
    }

    #[test]
    fn test_bookkeeping_table_columns() {
        for column in [
            "id SERIAL PRIMARY KEY",
            "name TEXT NOT NULL",
            "app TEXT NOT NULL",
            "applied_at TIMESTAMPTZ NOT NULL DEFAULT now()",
        ] {
            assert!(CREATE_MIGRATIONS_TABLE.contains(column), "missing {column}");
        }
        assert!(CREATE_MIGRATIONS_TABLE.contains("IF NOT EXISTS"));
    }

    #[test]
    fn test_execute_report_nothing_to_do() {
        assert!(ExecuteReport::default().nothing_to_do());
        let report = ExecuteReport {
            applied: vec!["20240101000000_init.sql".into()],
            skipped: 0,
        };
        assert!(!report.nothing_to_do());
    }
}
