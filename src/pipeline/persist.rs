//! Write a validated collection to disk.
//!
//! The document is written to a temp file inside the output directory and
//! then moved into place without clobbering. The skip check treats any
//! existing output as finished, so a half-written file must never appear
//! under the final name, and an existing output is never replaced.

use crate::error::FileError;
use crate::schema::ExamCollection;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

const TEMP_PREFIX: &str = ".exam2json-";
const TEMP_SUFFIX: &str = ".tmp";

/// Whether `name` is a temp file created by an in-progress or interrupted
/// write.
pub fn is_temp_file_name(name: &str) -> bool {
    name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX)
}

/// Serialize `collection` and persist it at `path`.
pub async fn write_collection(path: &Path, collection: &ExamCollection) -> Result<(), FileError> {
    let json = collection.to_json_pretty().map_err(|e| FileError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    })?;

    let target = path.to_path_buf();
    let bytes = json.len();
    tokio::task::spawn_blocking(move || write_atomic(&target, json.as_bytes()))
        .await
        .map_err(|e| FileError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: std::io::Error::other(e.to_string()),
        })??;

    debug!("Wrote {} bytes to {}", bytes, path.display());
    Ok(())
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), FileError> {
    let failed = |source: std::io::Error| FileError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    let dir = parent_dir(path);

    let mut tmp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(&dir)
        .map_err(failed)?;
    tmp.write_all(contents).map_err(failed)?;
    tmp.as_file().sync_all().map_err(failed)?;
    tmp.persist_noclobber(path).map_err(|e| failed(e.error))?;
    Ok(())
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
