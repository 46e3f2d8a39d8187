//! Service interaction: build the request, call the service, parse and
//! validate what comes back.
//!
//! This is the only stage with network I/O. It never retries: a failed call
//! is reported as [`FileError::RemoteCall`] and the file is picked up again
//! on the next batch run because no output was written.

use crate::error::FileError;
use crate::pipeline::encode::InlineDocument;
use crate::prompts::extraction_instruction;
use crate::schema::{self, ExamCollection};
use crate::service::{ExtractionRequest, ExtractionService};
use serde_json::Value;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, warn};

/// Maximum number of characters of a bad response kept for diagnostics.
pub const PREVIEW_CHARS: usize = 500;

/// Build the request for one document.
pub fn build_request(file_name: &str, bytes: &[u8]) -> ExtractionRequest {
    ExtractionRequest {
        file_name: file_name.to_string(),
        document: InlineDocument::pdf(bytes),
        instruction: extraction_instruction(file_name),
        schema: schema::response_schema(),
    }
}

/// Call the service once and turn its answer into a validated collection.
pub async fn extract_collection(
    service: &dyn ExtractionService,
    path: &Path,
    request: &ExtractionRequest,
) -> Result<ExamCollection, FileError> {
    let start = Instant::now();
    debug!(
        "{}: requesting extraction from {} ({})",
        request.file_name,
        service.name(),
        service.model()
    );

    let text = service
        .extract(request)
        .await
        .map_err(|source| FileError::RemoteCall {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(
        "{}: {} chars of response in {:?}",
        request.file_name,
        text.chars().count(),
        start.elapsed()
    );

    parse_response(path, &text)
}

/// Parse raw response text and validate it against the exam schema.
pub fn parse_response(path: &Path, text: &str) -> Result<ExamCollection, FileError> {
    let value: Value = serde_json::from_str(text).map_err(|e| {
        warn!("{}: response is not valid JSON: {}", path.display(), e);
        FileError::JsonDecode {
            path: path.to_path_buf(),
            detail: e.to_string(),
            preview: preview(text),
        }
    })?;

    schema::validate(&value).map_err(|violations| {
        warn!(
            "{}: {} schema violation(s), first: {}",
            path.display(),
            violations.len(),
            violations
                .first()
                .map(|v| v.to_string())
                .unwrap_or_default()
        );
        FileError::SchemaValidation {
            path: path.to_path_buf(),
            violations,
        }
    })
}

/// First [`PREVIEW_CHARS`] characters followed by `...`.
pub fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(PREVIEW_CHARS).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_on_char_boundary() {
        let long = "題".repeat(600);
        let p = preview(&long);
        assert_eq!(p.chars().count(), PREVIEW_CHARS + 3);
        assert!(p.ends_with("..."));
    }

    #[test]
    fn preview_of_short_text() {
        assert_eq!(preview("oops"), "oops...");
    }

    #[test]
    fn non_json_response_is_decode_error() {
        let err = parse_response(Path::new("a.pdf"), "Here are the questions: ...").unwrap_err();
        match err {
            FileError::JsonDecode { preview, .. } => assert!(preview.starts_with("Here are")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn wrong_shape_is_schema_error() {
        let err = parse_response(Path::new("a.pdf"), r#"{"problems": {}}"#).unwrap_err();
        assert!(matches!(err, FileError::SchemaValidation { .. }));
    }

    #[test]
    fn request_carries_file_name_everywhere() {
        let req = build_request("examA.pdf", b"%PDF");
        assert_eq!(req.file_name, "examA.pdf");
        assert!(req.instruction.contains("examA.pdf"));
        assert_eq!(req.document.mime_type, "application/pdf");
        assert_eq!(req.schema["required"][0], "problems");
    }

    struct Overloaded;

    #[async_trait::async_trait]
    impl ExtractionService for Overloaded {
        fn name(&self) -> &str {
            "overloaded"
        }
        fn model(&self) -> &str {
            "none"
        }
        async fn extract(&self, _: &ExtractionRequest) -> Result<String, crate::ServiceError> {
            Err(crate::ServiceError::Api {
                status: 503,
                message: "try later".into(),
            })
        }
    }

    #[test]
    fn service_error_becomes_remote_call_failure() {
        let req = build_request("a.pdf", b"%PDF");
        let err = tokio_test::block_on(extract_collection(&Overloaded, Path::new("a.pdf"), &req))
            .unwrap_err();
        match err {
            FileError::RemoteCall { source, .. } => assert!(source.to_string().contains("503")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
