//! Structured-extraction service: the single network collaborator.
//!
//! [`ExtractionService`] is the seam between the pipeline and the hosted
//! model. The pipeline only needs "document + instruction + schema in, JSON
//! text out"; [`GeminiService`] implements that over Gemini's
//! `generateContent` REST endpoint, and tests inject a stub.
//!
//! One call per file, no retries and no backoff. Any failure surfaces as a
//! [`ServiceError`] and is turned into a per-file failure by the caller.

use crate::error::{Exam2JsonError, ServiceError};
use crate::pipeline::encode::InlineDocument;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Everything the service needs to extract one document.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    /// Base name of the input file, e.g. `examA.pdf`.
    pub file_name: String,
    /// Raw document bytes, base64-wrapped.
    pub document: InlineDocument,
    /// Natural-language extraction instruction.
    pub instruction: String,
    /// JSON Schema the response must follow.
    pub schema: Value,
}

/// A remote capability that turns a document into schema-shaped JSON text.
///
/// Implementations return the raw text; parsing and validation happen in
/// [`crate::pipeline::llm`] so every provider is held to the same checks.
#[async_trait]
pub trait ExtractionService: Send + Sync {
    /// Provider name used in logs.
    fn name(&self) -> &str;

    /// Model identifier used in logs.
    fn model(&self) -> &str;

    async fn extract(&self, request: &ExtractionRequest) -> Result<String, ServiceError>;
}

/// Gemini `generateContent` client with JSON-schema constrained output.
#[derive(Debug, Clone)]
pub struct GeminiService {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiService {
    pub const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com";
    pub const DEFAULT_MODEL: &'static str = "gemini-2.5-flash-lite";

    /// Build a client. `timeout = None` means the request may block
    /// indefinitely.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, Exam2JsonError> {
        let mut builder = Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder
            .build()
            .map_err(|e| Exam2JsonError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl ExtractionService for GeminiService {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn extract(&self, request: &ExtractionRequest) -> Result<String, ServiceError> {
        let payload = request_body(request);
        debug!(
            "POST {} ({} bytes of inline document)",
            self.endpoint(),
            request.document.data.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message: api_error_message(&raw),
            });
        }

        let body: Value = serde_json::from_str(&raw).map_err(|e| ServiceError::Api {
            status: status.as_u16(),
            message: format!("unparseable response envelope: {e}"),
        })?;
        response_text(&body)
    }
}

/// Build the `generateContent` request body.
///
/// The document goes first, the instruction second, matching the order the
/// model sees them in the chat turn.
pub(crate) fn request_body(request: &ExtractionRequest) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [
                {
                    "inline_data": {
                        "mime_type": request.document.mime_type,
                        "data": request.document.data,
                    }
                },
                { "text": request.instruction }
            ]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseJsonSchema": request.schema,
        }
    })
}

/// Pull the generated text out of a `generateContent` response.
pub(crate) fn response_text(body: &Value) -> Result<String, ServiceError> {
    if let Some(reason) = body
        .pointer("/promptFeedback/blockReason")
        .and_then(Value::as_str)
    {
        return Err(ServiceError::Blocked {
            reason: reason.to_string(),
        });
    }

    let candidate = body.pointer("/candidates/0");
    let text: String = candidate
        .and_then(|c| c.pointer("/content/parts"))
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    if !text.is_empty() {
        return Ok(text);
    }

    match candidate
        .and_then(|c| c.get("finishReason"))
        .and_then(Value::as_str)
    {
        Some(reason) if reason != "STOP" => Err(ServiceError::Blocked {
            reason: reason.to_string(),
        }),
        _ => Err(ServiceError::EmptyResponse),
    }
}

fn api_error_message(raw: &str) -> String {
    serde_json::from_str::<Value>(raw)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| raw.trim().to_string())
}
