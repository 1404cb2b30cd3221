//! Configuration for the selene command line
//!
//! Global flags choose where results go (JSON lines, SQLite or nowhere) and
//! how much is logged; subcommands carry the build identity. Most flags can
//! also be set through `SELENE_*` environment variables so CI jobs can
//! export them once.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use selene_reports::{Outcome, ReportFormat};

/// Selene - collect CI test reports into one normalized result stream
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "selene")]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Store results in the SQLite database
    ///
    /// Uses --database when given, otherwise the platform data directory.
    #[arg(long, default_value = "false")]
    pub sqlite: bool,

    /// Path to SQLite database file (implies --sqlite)
    ///
    /// If the file doesn't exist, it will be created and initialized.
    #[arg(short, long, env = "SELENE_DATABASE")]
    pub database: Option<PathBuf>,

    /// Write JSON lines to this file instead of stdout
    #[arg(short, long, env = "SELENE_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Parse and summarize without storing or printing any result
    #[arg(long, default_value = "false")]
    pub dry_run: bool,

    /// Enable verbose logging (debug level)
    ///
    /// Logs are written to stderr so JSON lines on stdout stay clean.
    #[arg(short, long, default_value = "false")]
    pub verbose: bool,

    /// Quiet mode - suppress info-level logs
    ///
    /// Only errors and warnings will be logged.
    #[arg(short, long, default_value = "false")]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Ingest every report under a results directory
    ///
    /// Reports are `*.xml` files whose name contains `output` (Robot
    /// Framework) or `TESTS-`, `pytest_xUnit.xml`, `gtest_xUnit.xml`
    /// (JUnit family).
    ///
    /// Example:
    ///   selene ingest results/ --branch main --build 118 --stage smoke
    Ingest {
        /// Path to the results directory
        path: PathBuf,

        /// Branch the build ran on
        #[arg(long, env = "SELENE_BRANCH")]
        branch: String,

        /// Build name or number
        #[arg(long, env = "SELENE_BUILD")]
        build: String,

        /// Testing stage
        #[arg(long, env = "SELENE_STAGE")]
        stage: Option<String>,

        /// Overall build status reported by the CI system
        #[arg(long, visible_alias = "result")]
        status: Option<String>,

        /// Log file to reference from every test instead of the derived log.html
        #[arg(long)]
        logfile: Option<PathBuf>,

        /// Force a normalization strategy for every report (nested or flat)
        #[arg(long)]
        format: Option<ReportFormat>,
    },

    /// Record a single test result by hand
    Record {
        /// Branch the build ran on
        #[arg(long, env = "SELENE_BRANCH")]
        branch: String,

        /// Build name or number
        #[arg(long, env = "SELENE_BUILD")]
        build: String,

        /// Fully qualified test name
        #[arg(long)]
        test_name: String,

        /// Test outcome (pass or fail)
        #[arg(long)]
        result: Outcome,

        /// Log reference to attach
        #[arg(long)]
        log_path: Option<String>,

        /// Testing stage
        #[arg(long, env = "SELENE_STAGE")]
        stage: Option<String>,
    },

    /// Print the normalization strategy selected for each file
    Detect {
        /// Report files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

/// Where results are sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkChoice {
    /// Keep results in memory and only log a summary
    Memory,
    /// SQLite database at the given path
    Sqlite(PathBuf),
    /// JSON lines to a file, or stdout when `None`
    JsonLines(Option<PathBuf>),
}

impl Config {
    /// Get the database path, using a default if not specified
    ///
    /// Default location is platform-specific:
    /// - macOS: ~/Library/Application Support/selene/selene.db
    /// - Linux: ~/.local/share/selene/selene.db
    /// - Windows: %LOCALAPPDATA%\selene\selene.db
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.database.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("selene")
                .join("selene.db")
        })
    }

    /// Whether results go to SQLite
    #[must_use]
    pub fn use_database(&self) -> bool {
        self.sqlite || self.database.is_some()
    }

    /// Resolve the sink from the global flags
    ///
    /// `--dry-run` wins over everything, then SQLite, then JSON lines.
    #[must_use]
    pub fn sink_choice(&self) -> SinkChoice {
        if self.dry_run {
            SinkChoice::Memory
        } else if self.use_database() {
            SinkChoice::Sqlite(self.database_path())
        } else {
            SinkChoice::JsonLines(self.output.clone())
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The ingest results path doesn't exist or is not a directory
    /// - The database parent directory cannot be created
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(Command::Ingest { ref path, .. }) = self.command {
            if !path.exists() {
                return Err(ConfigError::ResultsPathNotFound(path.clone()));
            }
            if !path.is_dir() {
                return Err(ConfigError::ResultsPathNotDirectory(path.clone()));
            }
        }

        if let SinkChoice::Sqlite(db_path) = self.sink_choice()
            && let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::DatabaseDirectoryCreateFailed(parent.to_path_buf(), e))?;
        }

        Ok(())
    }

    /// Get the log level based on verbose/quiet flags
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        if self.verbose {
            tracing::Level::DEBUG
        } else if self.quiet {
            tracing::Level::WARN
        } else {
            tracing::Level::INFO
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Results path not found
    #[error("Results path not found: {0}")]
    ResultsPathNotFound(PathBuf),

    /// Results path is not a directory
    #[error("Results path is not a directory: {0}")]
    ResultsPathNotDirectory(PathBuf),

    /// Failed to create database directory
    #[error("Failed to create database directory {0}: {1}")]
    DatabaseDirectoryCreateFailed(PathBuf, std::io::Error),
}
