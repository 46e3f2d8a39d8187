//! Input side of the pipeline: list candidate files, derive output paths,
//! read document bytes.
//!
//! No extension filter is applied; every directory entry is a candidate and
//! anything the service cannot read simply fails for that one file.

use crate::error::{Exam2JsonError, FileError};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default suffix appended to the input file stem.
pub const DEFAULT_OUTPUT_SUFFIX: &str = "_structured_output.json";

/// List every entry of `dir`.
///
/// With `sorted = true` entries are ordered by file name; otherwise they come
/// back in whatever order the platform lists them.
pub async fn list_entries(dir: &Path, sorted: bool) -> Result<Vec<PathBuf>, Exam2JsonError> {
    let unreadable = |source: std::io::Error| Exam2JsonError::InputDirUnreadable {
        path: dir.to_path_buf(),
        source,
    };

    let mut reader = tokio::fs::read_dir(dir).await.map_err(unreadable)?;
    let mut entries = Vec::new();
    while let Some(entry) = reader.next_entry().await.map_err(unreadable)? {
        entries.push(entry.path());
    }

    if sorted {
        entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    }
    debug!("Listed {} entries in {}", entries.len(), dir.display());
    Ok(entries)
}

/// Base name of `path` as text, e.g. `examA.pdf`.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `output_dir / (stem + suffix)`: `pdfs/examA.pdf` →
/// `json/examA_structured_output.json`.
///
/// Only the last extension is stripped (`a.b.pdf` → `a.b…`); dot-files keep
/// their full name as the stem.
pub fn output_path_for(input: &Path, output_dir: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    output_dir.join(format!("{stem}{suffix}"))
}

/// Read the raw document bytes.
pub async fn read_document(path: &Path) -> Result<Vec<u8>, FileError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(FileError::InputNotFound {
            path: path.to_path_buf(),
        }),
        Err(source) => Err(FileError::ReadFailed {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_replaces_extension() {
        let out = output_path_for(Path::new("pdfs/examA.pdf"), Path::new("json"), DEFAULT_OUTPUT_SUFFIX);
        assert_eq!(out, PathBuf::from("json/examA_structured_output.json"));
    }

    #[test]
    fn output_path_strips_only_last_extension() {
        let out = output_path_for(Path::new("111.1.pdf"), Path::new("out"), DEFAULT_OUTPUT_SUFFIX);
        assert_eq!(out, PathBuf::from("out/111.1_structured_output.json"));
    }

    #[test]
    fn output_path_without_extension() {
        let out = output_path_for(Path::new("pdfs/scan"), Path::new("out"), ".json");
        assert_eq!(out, PathBuf::from("out/scan.json"));
    }

    #[test]
    fn file_name_is_base_name() {
        assert_eq!(file_name(Path::new("./pdfs/examA.pdf")), "examA.pdf");
        assert_eq!(file_name(Path::new("/")), "");
    }

    #[tokio::test]
    async fn list_entries_sorted_by_name() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c.pdf", "a.pdf", "b.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let names: Vec<String> = list_entries(dir.path(), true)
            .await
            .unwrap()
            .iter()
            .map(|p| file_name(p))
            .collect();
        assert_eq!(names, vec!["a.pdf", "b.txt", "c.pdf"]);
    }

    #[tokio::test]
    async fn list_entries_missing_dir_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = list_entries(&dir.path().join("nope"), true).await.unwrap_err();
        assert!(matches!(err, Exam2JsonError::InputDirUnreadable { .. }));
    }

    #[tokio::test]
    async fn read_missing_document() {
        let err = read_document(Path::new("/definitely/not/here.pdf")).await.unwrap_err();
        assert!(matches!(err, FileError::InputNotFound { .. }));
    }
}
