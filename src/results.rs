//! Results directory and CSV results table
//!
//! One directory per harness run, named from the local time and the
//! short source revision. It keeps every generated program, every tool
//! log and `results.csv`; nothing is cleaned up afterwards.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::generator::GenerationParameters;
use crate::{Error, Result};

/// Directory name prefix
pub const DIR_PREFIX: &str = "synthetic_dynamic_dispatch";

/// Results table file name
pub const RESULTS_FILE: &str = "results.csv";

/// Revision used when no git revision can be found
pub const UNKNOWN_REVISION: &str = "unknown";

/// Column names of the results table
pub const FIELDNAMES: [&str; 4] = ["tool", "iterations", "functions", "time"];

/// Short revision of the working tree (`git rev-parse --short HEAD`)
///
/// # Errors
///
/// Returns [`Error::Revision`] if git cannot be run or reports failure.
pub fn current_revision() -> Result<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .map_err(|e| Error::Revision(format!("failed to run git: {e}")))?;
    if !output.status.success() {
        return Err(Error::Revision(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    let rev = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if rev.is_empty() {
        return Err(Error::Revision("git printed no revision".into()));
    }
    Ok(rev)
}

/// Directory name for a run started at `time` on `revision`
#[must_use]
pub fn directory_name(time: &DateTime<Local>, revision: &str) -> String {
    format!(
        "{DIR_PREFIX}_{}_{revision}",
        time.format("%Y-%m-%d_%H-%M")
    )
}

/// Container for all artifacts of one harness run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsDirectory {
    path: PathBuf,
}

impl ResultsDirectory {
    /// Create (or reuse) `<root>/<directory_name>`
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn create(root: &Path, time: &DateTime<Local>, revision: &str) -> Result<Self> {
        let path = root.join(directory_name(time, revision));
        std::fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    /// Use an existing or new directory at an explicit path
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn at(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        std::fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    /// Directory path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the generated program for a grid cell
    #[must_use]
    pub fn program_path(&self, params: GenerationParameters, extension: &str) -> PathBuf {
        self.path.join(format!("{}.{extension}", params.test_id()))
    }

    /// Path of the results table
    #[must_use]
    pub fn results_path(&self) -> PathBuf {
        self.path.join(RESULTS_FILE)
    }
}

/// One completed tool run
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocationResult {
    /// Tool identifier
    pub tool_name: String,
    /// Grid cell
    pub parameters: GenerationParameters,
    /// Wall-clock time in seconds
    pub elapsed_seconds: f64,
    /// Captured stdout and stderr
    pub raw_output: String,
}

impl ToolInvocationResult {
    /// Build a result from a measured duration
    #[must_use]
    pub fn new(
        tool_name: impl Into<String>,
        parameters: GenerationParameters,
        elapsed: Duration,
        raw_output: String,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            parameters,
            elapsed_seconds: elapsed.as_secs_f64(),
            raw_output,
        }
    }
}

/// Row of `results.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    /// Tool identifier
    pub tool: String,
    /// Iteration count
    pub iterations: u32,
    /// Function count
    pub functions: u32,
    /// Elapsed seconds
    pub time: f64,
}

impl From<&ToolInvocationResult> for ResultRow {
    fn from(result: &ToolInvocationResult) -> Self {
        Self {
            tool: result.tool_name.clone(),
            iterations: result.parameters.iterations,
            functions: result.parameters.functions,
            time: result.elapsed_seconds,
        }
    }
}

/// Append-only CSV table with a fixed header
///
/// The file is opened per write and closed again before returning, so
/// rows already appended survive an aborted run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsTable {
    path: PathBuf,
}

impl ResultsTable {
    /// Create (truncating) the table and write the header row
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(FIELDNAMES)?;
        writer.flush()?;
        Ok(Self { path })
    }

    /// Table file path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or written.
    pub fn append(&self, row: &ResultRow) -> Result<()> {
        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.serialize(row)?;
        writer.flush()?;
        Ok(())
    }

    /// Read all data rows back
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a row is malformed.
    pub fn load(path: &Path) -> Result<Vec<ResultRow>> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();
        if headers.iter().ne(FIELDNAMES) {
            return Err(Error::Serialization(format!(
                "unexpected header in {}: {headers:?}",
                path.display()
            )));
        }
        reader
            .deserialize()
            .map(|row| row.map_err(Error::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn params(iterations: u32, functions: u32) -> GenerationParameters {
        GenerationParameters::new(iterations, functions).unwrap()
    }

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2021, 7, 14, 9, 5, 0).unwrap()
    }

    #[test]
    fn test_directory_name() {
        assert_eq!(
            directory_name(&fixed_time(), "a1b2c3d"),
            "synthetic_dynamic_dispatch_2021-07-14_09-05_a1b2c3d"
        );
    }

    #[test]
    fn test_create_directory_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let a = ResultsDirectory::create(root.path(), &fixed_time(), "abc").unwrap();
        let b = ResultsDirectory::create(root.path(), &fixed_time(), "abc").unwrap();
        assert_eq!(a, b);
        assert!(a.path().is_dir());
        assert!(a.path().ends_with("synthetic_dynamic_dispatch_2021-07-14_09-05_abc"));
    }

    #[test]
    fn test_artifact_paths() {
        let root = tempfile::tempdir().unwrap();
        let dir = ResultsDirectory::at(root.path().join("run")).unwrap();
        assert_eq!(
            dir.program_path(params(10, 2), "rs"),
            root.path().join("run").join("10i_2f.rs")
        );
        assert_eq!(dir.results_path(), root.path().join("run").join("results.csv"));
    }

    #[test]
    fn test_table_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let table = ResultsTable::create(dir.path().join("results.csv")).unwrap();
        let text = std::fs::read_to_string(table.path()).unwrap();
        assert_eq!(text, "tool,iterations,functions,time\n");
        assert!(ResultsTable::load(table.path()).unwrap().is_empty());
    }

    #[test]
    fn test_table_append_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let table = ResultsTable::create(dir.path().join("results.csv")).unwrap();

        let first = ToolInvocationResult::new(
            "rmc",
            params(10, 2),
            Duration::from_millis(1500),
            String::new(),
        );
        let second = ToolInvocationResult::new(
            "smack",
            params(10, 2),
            Duration::from_millis(250),
            String::new(),
        );
        table.append(&ResultRow::from(&first)).unwrap();
        table.append(&ResultRow::from(&second)).unwrap();

        let text = std::fs::read_to_string(table.path()).unwrap();
        assert_eq!(
            text,
            "tool,iterations,functions,time\nrmc,10,2,1.5\nsmack,10,2,0.25\n"
        );

        let rows = ResultsTable::load(table.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].tool, "rmc");
        assert!((rows[1].time - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_create_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        std::fs::write(&path, "stale\n").unwrap();
        ResultsTable::create(&path).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "tool,iterations,functions,time\n"
        );
    }

    #[test]
    fn test_tool_name_with_comma_is_quoted() {
        let dir = tempfile::tempdir().unwrap();
        let table = ResultsTable::create(dir.path().join("results.csv")).unwrap();
        table
            .append(&ResultRow {
                tool: "smack,bpl".to_string(),
                iterations: 1,
                functions: 1,
                time: 0.0,
            })
            .unwrap();
        let rows = ResultsTable::load(table.path()).unwrap();
        assert_eq!(rows[0].tool, "smack,bpl");
    }

    #[test]
    fn test_load_rejects_foreign_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.csv");
        std::fs::write(&path, "a,b\n1,2\n").unwrap();
        assert!(ResultsTable::load(&path).is_err());
    }

    #[test]
    fn test_append_without_create_fails() {
        let dir = tempfile::tempdir().unwrap();
        let table = ResultsTable {
            path: dir.path().join("absent.csv"),
        };
        let row = ResultRow {
            tool: "rmc".to_string(),
            iterations: 1,
            functions: 1,
            time: 0.0,
        };
        assert!(matches!(table.append(&row), Err(Error::Io(_))));
    }

    #[test]
    fn test_invocation_result_seconds() {
        let result = ToolInvocationResult::new(
            "rmc",
            params(3, 1),
            Duration::from_millis(2500),
            "VERIFICATION FAILED".to_string(),
        );
        assert!((result.elapsed_seconds - 2.5).abs() < 1e-9);
        let row = ResultRow::from(&result);
        assert_eq!(row.iterations, 3);
        assert_eq!(row.functions, 1);
    }
}
