//! Result types reported by the Extractor.

use crate::error::FileError;
use serde::Serialize;
use std::path::PathBuf;

/// What happened to one input file.
#[derive(Debug)]
pub enum FileOutcome {
    /// A validated output file was written.
    Converted { output: PathBuf, records: usize },
    /// An output file already existed; nothing was done.
    Skipped { output: PathBuf },
    /// The file failed; no output was written.
    Failed(FileError),
}

impl FileOutcome {
    pub fn is_converted(&self) -> bool {
        matches!(self, FileOutcome::Converted { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, FileOutcome::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FileOutcome::Failed(_))
    }
}

/// Outcome of one file within a batch.
#[derive(Debug)]
pub struct FileReport {
    /// 1-indexed position in the batch.
    pub index: usize,
    pub input: PathBuf,
    pub outcome: FileOutcome,
    pub duration_ms: u64,
}

/// Outcome of a whole batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
    pub total_duration_ms: u64,
}

impl BatchReport {
    pub fn converted(&self) -> usize {
        self.files.iter().filter(|f| f.outcome.is_converted()).count()
    }

    pub fn skipped(&self) -> usize {
        self.files.iter().filter(|f| f.outcome.is_skipped()).count()
    }

    pub fn failed(&self) -> usize {
        self.files.iter().filter(|f| f.outcome.is_failed()).count()
    }

    /// Total records written in this run.
    pub fn records(&self) -> usize {
        self.files
            .iter()
            .map(|f| match f.outcome {
                FileOutcome::Converted { records, .. } => records,
                _ => 0,
            })
            .sum()
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            total: self.files.len(),
            converted: self.converted(),
            skipped: self.skipped(),
            failed: self.failed(),
            records: self.records(),
            total_duration_ms: self.total_duration_ms,
            failures: self
                .files
                .iter()
                .filter_map(|f| match &f.outcome {
                    FileOutcome::Failed(e) => Some(FailureSummary {
                        input: f.input.clone(),
                        kind: e.kind().to_string(),
                        error: e.to_string(),
                    }),
                    _ => None,
                })
                .collect(),
        }
    }
}

/// Serializable digest of a [`BatchReport`], printed by `exam2json --json`.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub records: usize,
    pub total_duration_ms: u64,
    pub failures: Vec<FailureSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureSummary {
    pub input: PathBuf,
    pub kind: String,
    pub error: String,
}
