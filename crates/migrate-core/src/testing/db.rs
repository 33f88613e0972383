//! Explicit database provisioning for tests.
//!
//! Integration tests reach PostgreSQL through `TEST_DATABASE_URL` only. The
//! migration URL (`DATABASE_MIGRATION_URL`) is never read here, so a test run
//! cannot touch the database a developer migrates against.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::error::{MigrateError, Result};

/// Environment variable naming the server tests may create databases on.
pub const TEST_DATABASE_URL_ENV: &str = "TEST_DATABASE_URL";

/// Connection to the server used for integration tests.
pub struct TestDatabase {
    url: String,
}

impl TestDatabase {
    /// Use the server at the given URL.
    pub fn from_url(url: &str) -> Self {
        Self {
            url: url.to_string(),
        }
    }

    /// Read `TEST_DATABASE_URL`.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var(TEST_DATABASE_URL_ENV).map_err(|_| {
            MigrateError::Config(format!(
                "{} not set. Set it explicitly for database tests.",
                TEST_DATABASE_URL_ENV
            ))
        })?;
        Ok(Self::from_url(&url))
    }

    /// Like [`from_env`](Self::from_env) but `None` when the variable is unset,
    /// so tests can skip themselves on machines without PostgreSQL.
    pub fn from_env_opt() -> Option<Self> {
        Self::from_env().ok()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Create a fresh database for one test.
    pub async fn isolated(&self, test_name: &str) -> Result<IsolatedTestDb> {
        let db_name = format!(
            "migrate_test_{}_{}",
            sanitize_db_name(test_name),
            uuid::Uuid::new_v4().simple()
        );

        let admin = PgPoolOptions::new()
            .max_connections(1)
            .connect(&self.url)
            .await?;

        sqlx::query(&format!("CREATE DATABASE \"{}\"", db_name))
            .execute(&admin)
            .await?;
        admin.close().await;

        let url = replace_db_name(&self.url, &db_name);
        let pool = PgPoolOptions::new().max_connections(2).connect(&url).await?;

        Ok(IsolatedTestDb {
            pool,
            url,
            db_name,
            base_url: self.url.clone(),
        })
    }
}

/// A database that exists for the lifetime of a single test.
pub struct IsolatedTestDb {
    pool: PgPool,
    url: String,
    db_name: String,
    base_url: String,
}

impl IsolatedTestDb {
    /// Pool for assertions made by the test itself.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// URL of the isolated database, for handing to the code under test.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    /// Run raw SQL to set up or inspect state.
    pub async fn execute(&self, sql: &str) -> Result<()> {
        sqlx::query(sql).execute(&self.pool).await?;
        Ok(())
    }

    /// Drop the database.
    pub async fn cleanup(self) -> Result<()> {
        self.pool.close().await;

        let admin = PgPoolOptions::new()
            .max_connections(1)
            .connect(&self.base_url)
            .await?;

        let _ = sqlx::query(
            "SELECT pg_terminate_backend(pid) FROM pg_stat_activity WHERE datname = $1",
        )
        .bind(&self.db_name)
        .execute(&admin)
        .await;

        sqlx::query(&format!("DROP DATABASE IF EXISTS \"{}\"", self.db_name))
            .execute(&admin)
            .await?;

        Ok(())
    }
}

fn sanitize_db_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .take(24)
        .collect()
}

/// Swap the database component of a connection URL, keeping query params.
fn replace_db_name(url: &str, new_db: &str) -> String {
    let (base, query) = match url.find('?') {
        Some(idx) => (&url[..idx], &url[idx..]),
        None => (url, ""),
    };

    let scheme_end = base.find("://").map(|i| i + 3).unwrap_or(0);
    match base[scheme_end..].rfind('/') {
        Some(idx) => format!("{}{}{}", &base[..=scheme_end + idx], new_db, query),
        None => format!("{}/{}{}", base, new_db, query),
    }
}
