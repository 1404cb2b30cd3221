//! Database module for selene
//!
//! SQLite storage for branches, builds and their test results. The
//! [`Database`] doubles as a [`ResultSink`]: the build recorded last is the
//! one submitted records are attached to.

use std::path::Path;

use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, params};
use selene_reports::{Outcome, TestRecord};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::context::BuildContext;
use crate::migrations;
use crate::sink::{ResultSink, SinkError};

/// Tables that [`Database::count`] accepts
const TABLES: [&str; 3] = ["branches", "builds", "test_results"];

/// Database errors
#[derive(Debug, Error)]
pub enum DbError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(#[from] migrations::MigrationError),

    /// Table name outside the selene schema
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    /// Record not found
    #[error("Record not found: {table}/{id}")]
    NotFound { table: String, id: String },
}

/// A failing test joined with its build and branch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailingTest {
    /// Fully qualified test name
    pub test_name: String,
    /// Branch of the build
    pub branch_name: String,
    /// Build the failure was reported in
    pub build_name: String,
    /// Whether the failure blocks the pipeline
    pub critical: bool,
    /// Duration in seconds, if known
    pub duration_secs: Option<f64>,
    /// Log reference, if any
    pub log: Option<String>,
}

/// Database connection wrapper
pub struct Database {
    conn: Connection,
    current_build: Option<String>,
}

impl Database {
    /// Create a new in-memory database
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub fn in_memory() -> Result<Self, DbError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Open a database file, creating it if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the database file cannot be opened.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        debug!(path = %path.display(), "Opening database");
        Self::from_connection(Connection::open(path)?)
    }

    fn from_connection(conn: Connection) -> Result<Self, DbError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self {
            conn,
            current_build: None,
        })
    }

    /// Initialize the database schema using migrations
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn initialize(&mut self) -> Result<(), DbError> {
        migrations::migrate(&mut self.conn)?;
        Ok(())
    }

    /// Check if the database is initialized and up to date
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        migrations::is_up_to_date(&self.conn)
    }

    /// Get the current schema version
    ///
    /// # Errors
    ///
    /// Returns an error if the version cannot be read.
    pub fn schema_version(&self) -> Result<i32, DbError> {
        Ok(migrations::get_version(&self.conn)?)
    }

    /// Get the underlying connection (for advanced queries)
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Count the rows of one of the selene tables
    ///
    /// # Errors
    ///
    /// Returns an error for tables outside the schema or if the query fails.
    pub fn count(&self, table: &str) -> Result<i64, DbError> {
        if !TABLES.contains(&table) {
            return Err(DbError::UnknownTable(table.to_string()));
        }
        let query = format!("SELECT COUNT(*) FROM {table}");
        let count: i64 = self.conn.query_row(&query, [], |row| row.get(0))?;
        Ok(count)
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Get a branch id by name, inserting the branch if it is new
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup or insert fails.
    pub fn get_or_create_branch(&self, name: &str) -> Result<String, DbError> {
        let existing: Option<String> = self
            .conn
            .query_row("SELECT id FROM branches WHERE name = ?1", [name], |row| {
                row.get(0)
            })
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }

        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO branches (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![id, name, Utc::now().to_rfc3339()],
        )?;
        debug!(branch = name, "Created branch");
        Ok(id)
    }

    /// Insert or update a build, returning its id
    ///
    /// A build is identified by branch and name; recording it again updates
    /// status, stage and results path where new values are given.
    ///
    /// # Errors
    ///
    /// Returns an error if the branch or build cannot be written.
    pub fn upsert_build(&self, context: &BuildContext) -> Result<String, DbError> {
        let branch_id = self.get_or_create_branch(&context.branch_name)?;
        let now = Utc::now().to_rfc3339();
        let results_path = context
            .results_path
            .as_ref()
            .map(|p| p.display().to_string());

        let id: String = self.conn.query_row(
            r#"
            INSERT INTO builds (id, branch_id, name, status, stage, results_path, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            ON CONFLICT (branch_id, name) DO UPDATE SET
                status = COALESCE(excluded.status, builds.status),
                stage = COALESCE(excluded.stage, builds.stage),
                results_path = COALESCE(excluded.results_path, builds.results_path),
                updated_at = excluded.updated_at
            RETURNING id
            "#,
            params![
                Uuid::new_v4().to_string(),
                branch_id,
                context.build_name,
                context.status,
                context.stage,
                results_path,
                now,
            ],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Insert records for a build in one transaction
    ///
    /// # Errors
    ///
    /// Returns an error if any insert fails; no record is stored in that case.
    pub fn insert_test_results_batch(
        &mut self,
        build_id: &str,
        records: &[TestRecord],
    ) -> Result<usize, DbError> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO test_results (id, build_id, name, result, critical, duration_secs, stage, log, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )?;
            for record in records {
                stmt.execute(params![
                    Uuid::new_v4().to_string(),
                    build_id,
                    record.name,
                    record.result.as_str(),
                    record.critical,
                    record.test_duration,
                    record.stage,
                    record.log,
                    now,
                ])?;
            }
        }
        tx.commit()?;
        Ok(records.len())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Look up a build id by branch and build name
    ///
    /// # Errors
    ///
    /// Returns `DbError::NotFound` if the build was never recorded.
    pub fn build_id(&self, branch: &str, build: &str) -> Result<String, DbError> {
        self.conn
            .query_row(
                r#"
                SELECT b.id FROM builds b
                JOIN branches br ON br.id = b.branch_id
                WHERE br.name = ?1 AND b.name = ?2
                "#,
                [branch, build],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| DbError::NotFound {
                table: "builds".to_string(),
                id: format!("{branch}/{build}"),
            })
    }

    /// All records of a build, in insertion order
    ///
    /// # Errors
    ///
    /// Returns `DbError::NotFound` for an unknown build, or a query error.
    pub fn test_results_for_build(
        &self,
        branch: &str,
        build: &str,
    ) -> Result<Vec<TestRecord>, DbError> {
        let build_id = self.build_id(branch, build)?;
        let mut stmt = self.conn.prepare(
            r#"
            SELECT name, result, critical, duration_secs, stage, log
            FROM test_results
            WHERE build_id = ?1
            ORDER BY rowid
            "#,
        )?;

        let rows = stmt.query_map([&build_id], |row| {
            let result: String = row.get(1)?;
            let result = result.parse::<Outcome>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e))
            })?;
            Ok(TestRecord {
                name: row.get(0)?,
                result,
                branch_name: Some(branch.to_string()),
                build_name: Some(build.to_string()),
                log: row.get(5)?,
                stage: row.get(4)?,
                critical: row.get(2)?,
                test_duration: row.get(3)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Most recent failing tests across all builds
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn failing_tests(&self, limit: usize) -> Result<Vec<FailingTest>, DbError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT test_name, branch_name, build_name, critical, duration_secs, log
            FROM failing_tests
            ORDER BY created_at DESC, test_name
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            Ok(FailingTest {
                test_name: row.get(0)?,
                branch_name: row.get(1)?,
                build_name: row.get(2)?,
                critical: row.get(3)?,
                duration_secs: row.get(4)?,
                log: row.get(5)?,
            })
        })?;

        let mut tests = Vec::new();
        for row in rows {
            tests.push(row?);
        }
        Ok(tests)
    }
}

impl ResultSink for Database {
    fn record_build(&mut self, context: &BuildContext) -> Result<(), SinkError> {
        let build_id = self.upsert_build(context)?;
        debug!(build_id = %build_id, build = %context.build_name, "Recorded build");
        self.current_build = Some(build_id);
        Ok(())
    }

    fn submit(&mut self, records: &[TestRecord]) -> Result<usize, SinkError> {
        let build_id = self.current_build.clone().ok_or(SinkError::NoBuild)?;
        Ok(self.insert_test_results_batch(&build_id, records)?)
    }
}
