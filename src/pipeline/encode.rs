//! Document encoding: raw PDF bytes → base64 inline payload.
//!
//! The Gemini API accepts documents inline in the JSON request body as
//! base64 with an explicit MIME type, so the PDF is sent untouched; the
//! model reads the scanned pages itself.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// A document ready to embed in a request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineDocument {
    pub mime_type: String,
    /// Standard base64, no line breaks.
    pub data: String,
}

impl InlineDocument {
    /// Wrap PDF bytes. The bytes are not checked for a `%PDF` header; the
    /// service decides whether it can read them.
    pub fn pdf(bytes: &[u8]) -> Self {
        let data = STANDARD.encode(bytes);
        debug!("Encoded {} bytes → {} bytes base64", bytes.len(), data.len());
        Self {
            mime_type: PDF_MIME_TYPE.to_string(),
            data,
        }
    }

    /// Decode back to raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.data)
    }
}
