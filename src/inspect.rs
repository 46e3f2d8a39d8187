//! Output inspection: one audit line per generated JSON file.
//!
//! Files are read as plain JSON without re-validating the full schema; only
//! the fields needed for the summary line are looked at.

use crate::error::InspectError;
use crate::pipeline::persist;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Summary of one output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryLine {
    pub path: PathBuf,
    /// Number of records under `problems`.
    pub count: usize,
    /// Year of the first record, as written in the file.
    pub year: String,
    /// Exam identifier of the first record.
    pub exam_number: String,
    /// Source file name of the first record.
    pub source: String,
}

impl SummaryLine {
    /// `{year}-{exam_number}`, e.g. `111-1`.
    pub fn key(&self) -> String {
        format!("{}-{}", self.year, self.exam_number)
    }
}

impl fmt::Display for SummaryLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.count, self.key(), self.source)
    }
}

/// Summarise one output file.
pub fn summarize(path: &Path) -> Result<SummaryLine, InspectError> {
    let text = std::fs::read_to_string(path).map_err(|source| InspectError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&text).map_err(|source| InspectError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    summarize_value(path, &value)
}

fn summarize_value(path: &Path, value: &Value) -> Result<SummaryLine, InspectError> {
    let shape = |detail: &str| InspectError::Shape {
        path: path.to_path_buf(),
        detail: detail.to_string(),
    };

    let problems = value
        .get("problems")
        .ok_or_else(|| shape("missing 'problems' key"))?
        .as_array()
        .ok_or_else(|| shape("'problems' is not an array"))?;
    let first = problems
        .first()
        .ok_or_else(|| shape("'problems' is empty"))?;

    let year = match first.get("year") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => return Err(shape("first record has no usable 'year'")),
    };
    let text_field = |name: &str| {
        first
            .get(name)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| shape(&format!("first record has no string '{name}'")))
    };

    Ok(SummaryLine {
        path: path.to_path_buf(),
        count: problems.len(),
        year,
        exam_number: text_field("exam_number")?,
        source: text_field("source")?,
    })
}

/// File name the quiz front-end loads its source list from.
pub const MANIFEST_FILE_NAME: &str = "problem_sources.json";

/// Output files in `dir`, sorted by file name.
///
/// Skips the manifest (both [`MANIFEST_FILE_NAME`] and `manifest`, if given)
/// and temp files left behind by an interrupted write.
pub fn list_outputs(dir: &Path, manifest: Option<&Path>) -> Result<Vec<PathBuf>, InspectError> {
    let unreadable = |source: std::io::Error| InspectError::Read {
        path: dir.to_path_buf(),
        source,
    };
    let manifest_abs = manifest.and_then(|m| std::fs::canonicalize(m).ok());

    let mut entries = std::fs::read_dir(dir)
        .map_err(unreadable)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(unreadable)?;
    entries.retain(|p| !is_bookkeeping(p, manifest_abs.as_deref()));
    entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    debug!("Listed {} output files in {}", entries.len(), dir.display());
    Ok(entries)
}

fn is_bookkeeping(path: &Path, manifest_abs: Option<&Path>) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    if name == MANIFEST_FILE_NAME || persist::is_temp_file_name(&name) {
        return true;
    }
    manifest_abs.is_some_and(|m| std::fs::canonicalize(path).ok().as_deref() == Some(m))
}

/// Summarise every output file in `dir`, stopping at the first failure.
pub fn summarize_dir(dir: &Path, manifest: Option<&Path>) -> Result<Vec<SummaryLine>, InspectError> {
    list_outputs(dir, manifest)?
        .iter()
        .map(|p| summarize(p))
        .collect()
}

/// Write a JSON array of the output file names in `dir` to `manifest`.
///
/// This is the source list the quiz front-end loads to find every question
/// file. Returns the number of entries written.
pub fn write_manifest(dir: &Path, manifest: &Path) -> Result<usize, InspectError> {
    let write_err = |source: std::io::Error| InspectError::Write {
        path: manifest.to_path_buf(),
        source,
    };
    let names: Vec<String> = list_outputs(dir, Some(manifest))?
        .iter()
        .filter(|p| p.is_file())
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();

    let json = serde_json::to_string_pretty(&names)
        .map_err(|e| write_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
    std::fs::write(manifest, json).map_err(write_err)?;
    Ok(names.len())
}
