//! selene library
//!
//! Everything behind the `selene` binary: report discovery, build context,
//! log lookup, result sinks (JSON lines, memory, SQLite) and the ingestion
//! driver. Report parsing itself lives in the `selene-reports` crate.

pub mod commands;
pub mod config;
pub mod context;
pub mod db;
pub mod discover;
pub mod ingest;
pub mod log_file;
pub mod migrations;
pub mod sink;
