//! Test support for code that runs migrations against PostgreSQL.
//!
//! Following sqlx's testing philosophy, migrations are tested against a real
//! database. Each test gets its own database so tests can run in parallel.

mod db;

pub use db::{IsolatedTestDb, TestDatabase, TEST_DATABASE_URL_ENV};
