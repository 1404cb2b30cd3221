//! Result sinks
//!
//! A [`ResultSink`] receives the build once and then the normalized records
//! of each report. Three sinks ship with selene:
//!
//! - [`JsonLinesSink`]: one JSON object per line on any writer
//! - [`MemorySink`]: keeps everything in memory (dry runs and tests)
//! - [`crate::db::Database`]: persists into SQLite

use std::io::Write;

use selene_reports::{ReportSummary, TestRecord};
use serde::Serialize;
use thiserror::Error;

use crate::context::BuildContext;
use crate::db::DbError;

/// Sink errors
#[derive(Debug, Error)]
pub enum SinkError {
    /// Writing to the output failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing a line failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Records were submitted before any build was recorded
    #[error("No build recorded before submitting test results")]
    NoBuild,
}

/// Destination for normalized test results
pub trait ResultSink {
    /// Record the build that the following results belong to
    ///
    /// # Errors
    ///
    /// Returns an error if the sink cannot store the build.
    fn record_build(&mut self, context: &BuildContext) -> Result<(), SinkError>;

    /// Store a batch of records, returning how many were accepted
    ///
    /// # Errors
    ///
    /// Returns an error if the sink cannot store the records.
    fn submit(&mut self, records: &[TestRecord]) -> Result<usize, SinkError>;

    /// Flush anything buffered
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<S: ResultSink + ?Sized> ResultSink for &mut S {
    fn record_build(&mut self, context: &BuildContext) -> Result<(), SinkError> {
        (**self).record_build(context)
    }

    fn submit(&mut self, records: &[TestRecord]) -> Result<usize, SinkError> {
        (**self).submit(records)
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        (**self).finish()
    }
}

impl<S: ResultSink + ?Sized> ResultSink for Box<S> {
    fn record_build(&mut self, context: &BuildContext) -> Result<(), SinkError> {
        (**self).record_build(context)
    }

    fn submit(&mut self, records: &[TestRecord]) -> Result<usize, SinkError> {
        (**self).submit(records)
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        (**self).finish()
    }
}

// ============================================================================
// JSON Lines
// ============================================================================

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum Line<'a> {
    Build(&'a BuildContext),
    Test(&'a TestRecord),
}

/// Writes one JSON object per line
///
/// The build is written first as `{"kind":"build",...}`, followed by one
/// `{"kind":"test",...}` line per record.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Unwrap the writer
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, line: &Line<'_>) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, line)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

impl<W: Write> ResultSink for JsonLinesSink<W> {
    fn record_build(&mut self, context: &BuildContext) -> Result<(), SinkError> {
        self.write_line(&Line::Build(context))
    }

    fn submit(&mut self, records: &[TestRecord]) -> Result<usize, SinkError> {
        for record in records {
            self.write_line(&Line::Test(record))?;
        }
        Ok(records.len())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Collects builds and records in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    builds: Vec<BuildContext>,
    records: Vec<TestRecord>,
    finished: bool,
}

impl MemorySink {
    /// Create an empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds recorded so far
    #[must_use]
    pub fn builds(&self) -> &[BuildContext] {
        &self.builds
    }

    /// Records submitted so far
    #[must_use]
    pub fn records(&self) -> &[TestRecord] {
        &self.records
    }

    /// Whether [`ResultSink::finish`] was called
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Totals over the submitted records
    #[must_use]
    pub fn summary(&self) -> ReportSummary {
        ReportSummary::from_records(&self.records)
    }
}

impl ResultSink for MemorySink {
    fn record_build(&mut self, context: &BuildContext) -> Result<(), SinkError> {
        self.builds.push(context.clone());
        Ok(())
    }

    fn submit(&mut self, records: &[TestRecord]) -> Result<usize, SinkError> {
        if self.builds.is_empty() {
            return Err(SinkError::NoBuild);
        }
        self.records.extend_from_slice(records);
        Ok(records.len())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use selene_reports::Outcome;
    use similar_asserts::assert_eq;

    fn context() -> BuildContext {
        BuildContext::new("main", "42").expect("context")
    }

    fn record(name: &str, result: Outcome) -> TestRecord {
        context().apply(
            TestRecord::builder()
                .with_name(name)
                .with_result(result)
                .build()
                .expect("record"),
            None,
        )
    }

    #[test]
    fn test_json_lines_output() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.record_build(&context()).expect("build");
        let count = sink
            .submit(&[record("A.t1", Outcome::Pass), record("A.t2", Outcome::Fail)])
            .expect("submit");
        sink.finish().expect("finish");
        assert_eq!(count, 2);

        let output = String::from_utf8(sink.into_inner()).expect("utf8");
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).expect("valid json line"))
            .collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            serde_json::json!({"kind": "build", "branch_name": "main", "name": "42"})
        );
        assert_eq!(
            lines[2],
            serde_json::json!({
                "kind": "test",
                "name": "A.t2",
                "result": "fail",
                "branch_name": "main",
                "build_name": "42",
                "critical": true,
            })
        );
    }

    #[test]
    fn test_json_lines_round_trip_records() {
        let mut sink = JsonLinesSink::new(Vec::new());
        let original = record("Suite.case", Outcome::Pass);
        sink.submit(std::slice::from_ref(&original)).expect("submit");

        let output = String::from_utf8(sink.into_inner()).expect("utf8");
        let parsed: TestRecord = serde_json::from_str(output.trim()).expect("parse line");
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_memory_sink_collects() {
        let mut sink = MemorySink::new();
        sink.record_build(&context()).expect("build");
        sink.submit(&[record("a.b", Outcome::Pass)]).expect("submit");
        sink.submit(&[record("a.c", Outcome::Fail)]).expect("submit");
        assert!(!sink.is_finished());
        sink.finish().expect("finish");

        assert!(sink.is_finished());
        assert_eq!(sink.builds().len(), 1);
        assert_eq!(sink.records().len(), 2);
        assert_eq!(sink.summary().failed, 1);
    }

    #[test]
    fn test_memory_sink_requires_build() {
        let mut sink = MemorySink::new();
        let result = sink.submit(&[record("a.b", Outcome::Pass)]);
        assert!(matches!(result, Err(SinkError::NoBuild)));
    }

    #[test]
    fn test_boxed_sink_forwards() {
        let mut sink: Box<dyn ResultSink> = Box::new(MemorySink::new());
        sink.record_build(&context()).expect("build");
        assert_eq!(sink.submit(&[record("a.b", Outcome::Pass)]).expect("submit"), 1);
        sink.finish().expect("finish");
    }
}
