//! Error types for the exam2json library.
//!
//! Failures are split by how far they reach:
//!
//! * [`Exam2JsonError`] is **fatal**: the batch cannot run at all (input
//!   directory unreadable, output directory cannot be created, no API key).
//!   Returned as `Err(Exam2JsonError)` from [`crate::Extractor::new`] and
//!   [`crate::Extractor::run`].
//!
//! * [`FileError`] is **non-fatal**: one input file failed (service error,
//!   malformed JSON, schema mismatch). Recorded in
//!   [`crate::output::FileReport`]; the batch moves on to the next file.
//!
//! * [`ServiceError`] is raised by an [`crate::service::ExtractionService`]
//!   and wrapped into [`FileError::RemoteCall`] at the file boundary.
//!
//! * [`InspectError`] is raised by the output inspector.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the exam2json library.
#[derive(Debug, Error)]
pub enum Exam2JsonError {
    /// Input directory is missing or cannot be listed.
    #[error("Cannot read input directory '{path}': {source}")]
    InputDirUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Output directory could not be created.
    #[error("Cannot create output directory '{path}': {source}")]
    OutputDirCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No extraction service could be constructed (missing API key etc.).
    #[error("Extraction service '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single input file.
///
/// No output file is ever written when one of these is produced, so the file
/// is picked up again on the next batch run.
#[derive(Debug, Error)]
pub enum FileError {
    /// The input path does not exist.
    #[error("Input file not found: '{path}'")]
    InputNotFound { path: PathBuf },

    /// The input exists but its bytes could not be read.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The extraction service call failed.
    #[error("Remote call failed for '{path}': {source}")]
    RemoteCall {
        path: PathBuf,
        #[source]
        source: ServiceError,
    },

    /// The service answered with text that is not valid JSON.
    #[error("Service response for '{path}' is not valid JSON ({detail})\nRaw response: {preview}")]
    JsonDecode {
        path: PathBuf,
        detail: String,
        preview: String,
    },

    /// The response parsed as JSON but does not match the exam schema.
    #[error("Schema validation failed for '{path}': {}", ViolationList(.violations))]
    SchemaValidation {
        path: PathBuf,
        violations: Vec<SchemaViolation>,
    },

    /// Validated output could not be written.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FileError {
    /// Short label for the failure kind, used in console summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            FileError::InputNotFound { .. } => "missing input",
            FileError::ReadFailed { .. } => "read error",
            FileError::RemoteCall { .. } => "remote call failure",
            FileError::JsonDecode { .. } => "JSON decode failure",
            FileError::SchemaValidation { .. } => "schema validation failure",
            FileError::OutputWriteFailed { .. } => "write error",
        }
    }
}

/// Errors raised by an extraction service implementation.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Network-level failure (DNS, TLS, connection reset, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// The API answered with a non-success HTTP status.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The API refused to answer (safety filter, recitation, ...).
    #[error("request blocked: {reason}")]
    Blocked { reason: String },

    /// The API answered successfully but without any text.
    #[error("response contained no text")]
    EmptyResponse,
}

/// One schema violation found by [`crate::schema::validate`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SchemaViolation {
    /// Field path, e.g. `problems[3].options.D`.
    pub path: String,
    pub message: String,
}

impl SchemaViolation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

struct ViolationList<'a>(&'a [SchemaViolation]);

impl fmt::Display for ViolationList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} violation(s)", self.0.len())?;
        for v in self.0 {
            write!(f, "\n  - {v}")?;
        }
        Ok(())
    }
}

/// Errors raised while summarising an output file.
#[derive(Debug, Error)]
pub enum InspectError {
    #[error("Cannot read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{path}' is not valid JSON: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("'{path}' has an unexpected shape: {detail}")]
    Shape { path: PathBuf, detail: String },
}
