//! Database migrations for selene
//!
//! Migrations are applied in version order, each inside its own transaction
//! together with the `schema_migrations` row that records it.

use chrono::Utc;
use rusqlite::{Connection, params};
use thiserror::Error;
use tracing::{debug, info};

/// Migration errors
#[derive(Debug, Error)]
pub enum MigrationError {
    /// SQLite error during migration
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Database schema is newer than this build of selene
    #[error("Database schema version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: i32, supported: i32 },

    /// Migration has no down script
    #[error("Migration {version} cannot be rolled back")]
    Irreversible { version: i32 },
}

/// Current schema version
pub const CURRENT_VERSION: i32 = 2;

/// A database migration
pub struct Migration {
    /// Migration version number
    pub version: i32,
    /// Migration name/description
    pub name: &'static str,
    /// SQL to apply the migration
    pub up: &'static str,
    /// SQL to revert the migration (optional)
    pub down: Option<&'static str>,
}

/// All available migrations in order
pub static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        up: include_str!("schema.sql"),
        down: Some(
            r#"
            DROP TABLE IF EXISTS test_results;
            DROP TABLE IF EXISTS builds;
            DROP TABLE IF EXISTS branches;
        "#,
        ),
    },
    Migration {
        version: 2,
        name: "failing_tests_view",
        up: r#"
            CREATE VIEW IF NOT EXISTS failing_tests AS
            SELECT tr.name AS test_name,
                   tr.critical AS critical,
                   tr.duration_secs AS duration_secs,
                   tr.log AS log,
                   b.name AS build_name,
                   br.name AS branch_name,
                   tr.created_at AS created_at
            FROM test_results tr
            JOIN builds b ON b.id = tr.build_id
            JOIN branches br ON br.id = b.branch_id
            WHERE tr.result = 'fail';
        "#,
        down: Some("DROP VIEW IF EXISTS failing_tests;"),
    },
];

fn ensure_migrations_table(conn: &Connection) -> Result<(), MigrationError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY,
            name        TEXT NOT NULL,
            applied_at  TEXT NOT NULL
        );
    "#,
    )?;
    Ok(())
}

/// Get the current schema version from the database
///
/// Returns 0 if no migrations have been applied.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_version(conn: &Connection) -> Result<i32, MigrationError> {
    let table_exists: i32 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_migrations'",
        [],
        |row| row.get(0),
    )?;

    if table_exists == 0 {
        return Ok(0);
    }

    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    Ok(version)
}

/// Apply all pending migrations
///
/// # Errors
///
/// Returns an error if any migration fails, or if the database was written
/// by a newer schema.
pub fn migrate(conn: &mut Connection) -> Result<Vec<i32>, MigrationError> {
    ensure_migrations_table(conn)?;
    let current_version = get_version(conn)?;
    if current_version > CURRENT_VERSION {
        return Err(MigrationError::UnsupportedVersion {
            found: current_version,
            supported: CURRENT_VERSION,
        });
    }

    let mut applied = Vec::new();
    for migration in MIGRATIONS {
        if migration.version > current_version {
            apply_migration(conn, migration)?;
            applied.push(migration.version);
        }
    }

    if !applied.is_empty() {
        info!(version = CURRENT_VERSION, applied = applied.len(), "Database migrated");
    }
    Ok(applied)
}

/// Apply a single migration and record it
///
/// # Errors
///
/// Returns an error if the migration fails; nothing is applied in that case.
pub fn apply_migration(conn: &mut Connection, migration: &Migration) -> Result<(), MigrationError> {
    debug!(version = migration.version, name = migration.name, "Applying migration");

    let tx = conn.transaction()?;
    tx.execute_batch(migration.up)?;
    tx.execute(
        "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
        params![migration.version, migration.name, Utc::now().to_rfc3339()],
    )?;
    tx.commit()?;
    Ok(())
}

/// Rollback to a specific version
///
/// # Errors
///
/// Returns an error if the rollback fails or a migration in range has no
/// down script.
pub fn rollback_to(conn: &mut Connection, target_version: i32) -> Result<Vec<i32>, MigrationError> {
    let current_version = get_version(conn)?;
    let mut rolled_back = Vec::new();

    for migration in MIGRATIONS.iter().rev() {
        if migration.version > target_version && migration.version <= current_version {
            let down = migration.down.ok_or(MigrationError::Irreversible {
                version: migration.version,
            })?;

            let tx = conn.transaction()?;
            tx.execute_batch(down)?;
            tx.execute(
                "DELETE FROM schema_migrations WHERE version = ?1",
                [migration.version],
            )?;
            tx.commit()?;
            rolled_back.push(migration.version);
        }
    }

    Ok(rolled_back)
}

/// Check if the database is up to date
#[must_use]
pub fn is_up_to_date(conn: &Connection) -> bool {
    get_version(conn)
        .map(|v| v >= CURRENT_VERSION)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    fn object_exists(conn: &Connection, kind: &str, name: &str) -> bool {
        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = ?1 AND name = ?2",
                [kind, name],
                |row| row.get(0),
            )
            .expect("query");
        count == 1
    }

    #[test]
    fn test_get_version_empty_db() {
        let conn = Connection::open_in_memory().expect("create db");
        assert_eq!(get_version(&conn).expect("get version"), 0);
    }

    #[test]
    fn test_migrate_applies_all() {
        let mut conn = Connection::open_in_memory().expect("create db");
        let applied = migrate(&mut conn).expect("migrate");

        assert_eq!(applied, vec![1, 2]);
        assert_eq!(get_version(&conn).expect("get version"), CURRENT_VERSION);
    }

    #[test]
    fn test_migrate_idempotent() {
        let mut conn = Connection::open_in_memory().expect("create db");
        migrate(&mut conn).expect("first migrate");
        let second = migrate(&mut conn).expect("second migrate");
        assert!(second.is_empty(), "Second migrate should apply nothing");
    }

    #[test]
    fn test_is_up_to_date() {
        let mut conn = Connection::open_in_memory().expect("create db");
        assert!(!is_up_to_date(&conn));
        migrate(&mut conn).expect("migrate");
        assert!(is_up_to_date(&conn));
    }

    #[test]
    fn test_migration_creates_objects() {
        let mut conn = Connection::open_in_memory().expect("create db");
        migrate(&mut conn).expect("migrate");

        for table in ["branches", "builds", "test_results", "schema_migrations"] {
            assert!(object_exists(&conn, "table", table), "Table {table} should exist");
        }
        assert!(object_exists(&conn, "view", "failing_tests"));
        assert!(object_exists(&conn, "index", "idx_test_results_build"));
    }

    #[test]
    fn test_rollback_one_step() {
        let mut conn = Connection::open_in_memory().expect("create db");
        migrate(&mut conn).expect("migrate");

        let rolled_back = rollback_to(&mut conn, 1).expect("rollback");
        assert_eq!(rolled_back, vec![2]);
        assert_eq!(get_version(&conn).expect("version"), 1);
        assert!(!object_exists(&conn, "view", "failing_tests"));
        assert!(object_exists(&conn, "table", "test_results"));

        // Re-applying brings the view back
        assert_eq!(migrate(&mut conn).expect("migrate"), vec![2]);
        assert!(object_exists(&conn, "view", "failing_tests"));
    }

    #[test]
    fn test_rollback_to_zero() {
        let mut conn = Connection::open_in_memory().expect("create db");
        migrate(&mut conn).expect("migrate");

        let rolled_back = rollback_to(&mut conn, 0).expect("rollback");
        assert_eq!(rolled_back, vec![2, 1]);
        assert!(!object_exists(&conn, "table", "branches"));
        assert_eq!(get_version(&conn).expect("version"), 0);
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let mut conn = Connection::open_in_memory().expect("create db");
        migrate(&mut conn).expect("migrate");
        conn.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (99, 'future', 'now')",
            [],
        )
        .expect("insert");

        let result = migrate(&mut conn);
        assert!(matches!(
            result,
            Err(MigrationError::UnsupportedVersion { found: 99, .. })
        ));
    }
}
