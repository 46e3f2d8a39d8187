//! End-to-end tests for exam2json.
//!
//! The remote model is replaced by a stub [`ExtractionService`] that answers
//! from a per-file table and counts calls, so these tests run offline and
//! exercise the full batch: skip check, request building, JSON decoding,
//! schema validation, persistence and the inspector.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture

use async_trait::async_trait;
use exam2json::{
    summarize_dir, BatchProgressCallback, ExamCollection, ExtractionRequest, ExtractionService,
    Extractor, ExtractorConfig, FileError, FileOutcome, ServiceError,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Route library logs through the test harness (`RUST_LOG=debug` to see them).
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

enum Reply {
    Text(String),
    Fail,
}

/// Stub service answering by input file name.
#[derive(Default)]
struct StubService {
    replies: Mutex<HashMap<String, Reply>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<ExtractionRequest>>,
}

impl StubService {
    fn with(self, file_name: &str, reply: Reply) -> Self {
        self.replies.lock().unwrap().insert(file_name.to_string(), reply);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExtractionService for StubService {
    fn name(&self) -> &str {
        "stub"
    }

    fn model(&self) -> &str {
        "stub-model"
    }

    async fn extract(&self, request: &ExtractionRequest) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.clone());
        match self.replies.lock().unwrap().get(&request.file_name) {
            Some(Reply::Text(t)) => Ok(t.clone()),
            Some(Reply::Fail) => Err(ServiceError::Api {
                status: 503,
                message: "model overloaded".into(),
            }),
            None => Err(ServiceError::EmptyResponse),
        }
    }
}

struct Workspace {
    _root: TempDir,
    input: PathBuf,
    output: PathBuf,
}

impl Workspace {
    fn new(pdfs: &[&str]) -> Self {
        init_tracing();
        let root = tempfile::tempdir().expect("tempdir");
        let input = root.path().join("pdfs");
        let output = root.path().join("json");
        std::fs::create_dir_all(&input).unwrap();
        for name in pdfs {
            std::fs::write(input.join(name), b"%PDF-1.4 fake scan").unwrap();
        }
        Self {
            _root: root,
            input,
            output,
        }
    }

    fn extractor(&self, service: Arc<StubService>) -> Extractor {
        let config = ExtractorConfig::builder()
            .input_dir(&self.input)
            .output_dir(&self.output)
            .service(service)
            .build()
            .expect("valid config");
        Extractor::new(config).expect("extractor")
    }

    fn output_file(&self, stem: &str) -> PathBuf {
        self.output.join(format!("{stem}_structured_output.json"))
    }

    fn snapshot(&self) -> Vec<(String, Vec<u8>)> {
        let mut files: Vec<(String, Vec<u8>)> = std::fs::read_dir(&self.output)
            .map(|rd| {
                rd.filter_map(Result::ok)
                    .map(|e| {
                        (
                            e.file_name().to_string_lossy().into_owned(),
                            std::fs::read(e.path()).unwrap(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();
        files.sort();
        files
    }
}

fn record(source: &str) -> Value {
    json!({
        "year": 111,
        "exam_number": "1",
        "source": source,
        "number": 1,
        "subject": "process",
        "question": "Q?",
        "options": { "A": "a", "B": "b", "C": "c", "D": "d" },
        "answer": "A"
    })
}

fn body(records: Vec<Value>) -> Reply {
    Reply::Text(json!({ "problems": records }).to_string())
}

// ── End-to-end example ───────────────────────────────────────────────────────

#[tokio::test]
async fn converts_single_file_and_inspector_summarises_it() {
    let ws = Workspace::new(&["examA.pdf"]);
    let stub = Arc::new(StubService::default().with("examA.pdf", body(vec![record("examA.pdf")])));

    let report = ws.extractor(Arc::clone(&stub)).run().await.unwrap();
    assert_eq!(report.converted(), 1);
    assert_eq!(stub.calls(), 1);

    let out = ws.output_file("examA");
    let written: Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(written, json!({ "problems": [record("examA.pdf")] }));

    let lines = summarize_dir(&ws.output, None).unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].to_string(), "1\t111-1\texamA.pdf");
}

#[tokio::test]
async fn request_carries_pdf_instruction_and_schema() {
    let ws = Workspace::new(&["examA.pdf"]);
    let stub = Arc::new(StubService::default().with("examA.pdf", body(vec![record("examA.pdf")])));
    ws.extractor(Arc::clone(&stub)).run().await.unwrap();

    let seen = stub.seen.lock().unwrap();
    let req = &seen[0];
    assert_eq!(req.file_name, "examA.pdf");
    assert_eq!(req.document.mime_type, "application/pdf");
    assert_eq!(req.document.decode().unwrap(), b"%PDF-1.4 fake scan");
    assert!(req.instruction.contains("'examA.pdf'"));
    assert_eq!(
        req.schema["properties"]["problems"]["items"]["properties"]["subject"]["enum"],
        json!(["process", "industry"])
    );
}

// ── Idempotence and skip correctness ─────────────────────────────────────────

#[tokio::test]
async fn second_run_performs_no_calls_and_no_writes() {
    let ws = Workspace::new(&["a.pdf", "b.pdf"]);
    let stub = Arc::new(
        StubService::default()
            .with("a.pdf", body(vec![record("a.pdf")]))
            .with("b.pdf", body(vec![record("b.pdf"), record("b.pdf")])),
    );
    let extractor = ws.extractor(Arc::clone(&stub));

    let first = extractor.run().await.unwrap();
    assert_eq!(first.converted(), 2);
    let after_first = ws.snapshot();

    let second = extractor.run().await.unwrap();
    assert_eq!(second.skipped(), 2);
    assert_eq!(second.converted(), 0);
    assert_eq!(stub.calls(), 2, "second run must not call the service");
    assert_eq!(ws.snapshot(), after_first);
}

#[tokio::test]
async fn existing_output_is_left_untouched() {
    let ws = Workspace::new(&["a.pdf"]);
    std::fs::create_dir_all(&ws.output).unwrap();
    std::fs::write(ws.output_file("a"), "stale but kept").unwrap();

    let stub = Arc::new(StubService::default().with("a.pdf", body(vec![record("a.pdf")])));
    let outcome = ws.extractor(Arc::clone(&stub)).convert(&ws.input.join("a.pdf")).await;

    assert!(outcome.is_skipped());
    assert_eq!(stub.calls(), 0);
    assert_eq!(std::fs::read_to_string(ws.output_file("a")).unwrap(), "stale but kept");
}

#[tokio::test]
async fn missing_input_is_reported_without_call() {
    let ws = Workspace::new(&[]);
    let stub = Arc::new(StubService::default());
    let outcome = ws
        .extractor(Arc::clone(&stub))
        .convert(&ws.input.join("ghost.pdf"))
        .await;

    assert!(matches!(outcome, FileOutcome::Failed(FileError::InputNotFound { .. })));
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn uncheckable_output_path_fails_before_call() {
    let ws = Workspace::new(&["a.pdf"]);
    // The output "directory" is a regular file, so stat on the output path
    // fails with ENOTDIR instead of reporting it absent.
    std::fs::write(&ws.output, b"not a directory").unwrap();

    let stub = Arc::new(StubService::default().with("a.pdf", body(vec![record("a.pdf")])));
    let outcome = ws
        .extractor(Arc::clone(&stub))
        .convert(&ws.input.join("a.pdf"))
        .await;

    assert!(matches!(
        outcome,
        FileOutcome::Failed(FileError::OutputWriteFailed { .. })
    ));
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn uncheckable_input_path_is_read_failure() {
    let ws = Workspace::new(&["a.pdf"]);
    let stub = Arc::new(StubService::default());
    let outcome = ws
        .extractor(Arc::clone(&stub))
        .convert(&ws.input.join("a.pdf").join("inner.pdf"))
        .await;

    assert!(matches!(outcome, FileOutcome::Failed(FileError::ReadFailed { .. })));
    assert_eq!(stub.calls(), 0);
}

// ── Schema rejection ─────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_option_is_rejected_and_nothing_written() {
    let ws = Workspace::new(&["a.pdf"]);
    let mut bad = record("a.pdf");
    bad["options"].as_object_mut().unwrap().remove("D");
    let stub = Arc::new(StubService::default().with("a.pdf", body(vec![bad])));

    let report = ws.extractor(stub).run().await.unwrap();
    assert_eq!(report.failed(), 1);
    match &report.files[0].outcome {
        FileOutcome::Failed(FileError::SchemaValidation { violations, .. }) => {
            assert_eq!(violations[0].path, "problems[0].options.D");
        }
        other => panic!("expected schema failure, got {other:?}"),
    }
    assert!(!ws.output_file("a").exists());
}

#[tokio::test]
async fn out_of_enum_subject_is_rejected() {
    let ws = Workspace::new(&["a.pdf"]);
    let mut bad = record("a.pdf");
    bad["subject"] = json!("other");
    let stub = Arc::new(StubService::default().with("a.pdf", body(vec![record("a.pdf"), bad])));

    let report = ws.extractor(stub).run().await.unwrap();
    match &report.files[0].outcome {
        FileOutcome::Failed(FileError::SchemaValidation { violations, .. }) => {
            assert_eq!(violations.len(), 1);
            assert_eq!(violations[0].path, "problems[1].subject");
        }
        other => panic!("expected schema failure, got {other:?}"),
    }
    assert!(!ws.output_file("a").exists());
}

// ── Failure isolation ────────────────────────────────────────────────────────

#[tokio::test]
async fn malformed_response_does_not_abort_batch() {
    let ws = Workspace::new(&["a.pdf", "b.pdf"]);
    let stub = Arc::new(
        StubService::default()
            .with("a.pdf", Reply::Text("I could not read this document.".into()))
            .with("b.pdf", body(vec![record("b.pdf")])),
    );

    let report = ws.extractor(Arc::clone(&stub)).run().await.unwrap();
    assert_eq!(report.failed(), 1);
    assert_eq!(report.converted(), 1);
    assert!(matches!(
        report.files[0].outcome,
        FileOutcome::Failed(FileError::JsonDecode { .. })
    ));

    assert!(!ws.output_file("a").exists());
    let b: ExamCollection =
        serde_json::from_str(&std::fs::read_to_string(ws.output_file("b")).unwrap()).unwrap();
    assert_eq!(b.problems[0].source, "b.pdf");
}

#[tokio::test]
async fn remote_failure_is_isolated_and_retried_next_run() {
    let ws = Workspace::new(&["a.pdf", "b.pdf"]);
    let stub = Arc::new(
        StubService::default()
            .with("a.pdf", Reply::Fail)
            .with("b.pdf", body(vec![record("b.pdf")])),
    );
    let report = ws.extractor(Arc::clone(&stub)).run().await.unwrap();
    assert!(matches!(
        report.files[0].outcome,
        FileOutcome::Failed(FileError::RemoteCall { .. })
    ));
    assert_eq!(report.converted(), 1);

    // The service recovers: only the failed file is attempted again.
    let recovered = Arc::new(StubService::default().with("a.pdf", body(vec![record("a.pdf")])));
    let report = ws.extractor(Arc::clone(&recovered)).run().await.unwrap();
    assert_eq!(report.converted(), 1);
    assert_eq!(report.skipped(), 1);
    assert_eq!(recovered.calls(), 1);
}

// ── Round-trip ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn written_file_round_trips_with_unicode_intact() {
    let ws = Workspace::new(&["111年試題.pdf"]);
    let mut rec = record("111年試題.pdf");
    rec["question"] = json!("下列何者為晶圓製程的第一步？");
    rec["options"]["A"] = json!("氧化");
    rec["extra_note"] = json!("dropped");
    let stub = Arc::new(StubService::default().with("111年試題.pdf", body(vec![rec.clone()])));

    ws.extractor(stub).run().await.unwrap();
    let text = std::fs::read_to_string(ws.output_file("111年試題")).unwrap();

    assert!(text.contains("下列何者為晶圓製程的第一步？"));
    assert!(!text.contains("\\u"));
    assert!(!text.contains("extra_note"));

    let parsed: ExamCollection = serde_json::from_str(&text).unwrap();
    let again = parsed.to_json_pretty().unwrap();
    assert_eq!(again, text);
    assert_eq!(parsed.problems[0].options.a, "氧化");
}

// ── Progress events ──────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl BatchProgressCallback for Recorder {
    fn on_batch_start(&self, total_files: usize) {
        self.events.lock().unwrap().push(format!("start {total_files}"));
    }
    fn on_file_start(&self, index: usize, total: usize, _input: &Path) {
        self.events.lock().unwrap().push(format!("{index}/{total}"));
    }
    fn on_file_skipped(&self, _index: usize, _total: usize, _output: &Path) {
        self.events.lock().unwrap().push("skipped".into());
    }
    fn on_file_converted(&self, _index: usize, _total: usize, _output: &Path, records: usize) {
        self.events.lock().unwrap().push(format!("converted {records}"));
    }
    fn on_file_error(&self, _index: usize, _total: usize, kind: &str, _error: &str) {
        self.events.lock().unwrap().push(format!("error {kind}"));
    }
    fn on_batch_complete(&self, converted: usize, skipped: usize, failed: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("done {converted}/{skipped}/{failed}"));
    }
}

#[tokio::test]
async fn progress_events_follow_sorted_order() {
    let ws = Workspace::new(&["c.pdf", "a.pdf", "b.pdf"]);
    std::fs::create_dir_all(&ws.output).unwrap();
    std::fs::write(ws.output_file("b"), "{}").unwrap();

    let stub = Arc::new(
        StubService::default()
            .with("a.pdf", body(vec![record("a.pdf"), record("a.pdf")]))
            .with("c.pdf", Reply::Text("{\"problems\": 5}".into())),
    );
    let recorder = Arc::new(Recorder::default());
    let config = ExtractorConfig::builder()
        .input_dir(&ws.input)
        .output_dir(&ws.output)
        .service(stub)
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    let report = Extractor::new(config).unwrap().run().await.unwrap();
    let names: Vec<String> = report
        .files
        .iter()
        .map(|f| f.input.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.pdf", "b.pdf", "c.pdf"]);

    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            "start 3",
            "1/3",
            "converted 2",
            "2/3",
            "skipped",
            "3/3",
            "error schema validation failure",
            "done 1/1/1",
        ]
    );
}

#[tokio::test]
async fn empty_input_dir_creates_output_dir() {
    let ws = Workspace::new(&[]);
    let report = ws.extractor(Arc::new(StubService::default())).run().await.unwrap();
    assert!(report.files.is_empty());
    assert!(ws.output.is_dir());
}

#[tokio::test]
async fn missing_input_dir_is_fatal() {
    let ws = Workspace::new(&[]);
    std::fs::remove_dir(&ws.input).unwrap();
    let err = ws
        .extractor(Arc::new(StubService::default()))
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, exam2json::Exam2JsonError::InputDirUnreadable { .. }));
}
