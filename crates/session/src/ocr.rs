use std::sync::Arc;

use khmerchat_llm::{GenerativeTransport, Part};
use snafu::ResultExt;

use crate::error::{OcrError, RequestSnafu};
use crate::prompts::{GEMINI_OCR_PROMPT, OCR_NO_TEXT_MARKER};

/// One-shot text extraction from an image, outside any chat session.
pub struct OcrRequestor {
    transport: Arc<dyn GenerativeTransport>,
}

impl OcrRequestor {
    pub fn new(transport: Arc<dyn GenerativeTransport>) -> Self {
        Self { transport }
    }

    /// Returns the trimmed text found in the image, or [`OCR_NO_TEXT_MARKER`].
    ///
    /// Makes exactly one request. Overload is reported to the caller, not retried.
    pub async fn extract_text(
        &self,
        image_base64: &str,
        mime_type: &str,
    ) -> Result<String, OcrError> {
        let parts = vec![
            Part::text(GEMINI_OCR_PROMPT),
            Part::inline_image(mime_type, image_base64),
        ];

        let text = self
            .transport
            .generate(parts)
            .await
            .inspect_err(|error| tracing::warn!(mime_type, error = %error, "ocr request failed"))
            .context(RequestSnafu { stage: "ocr" })?;

        let text = text.trim();
        if text.is_empty() {
            tracing::debug!(mime_type, "ocr returned no text");
            return Ok(OCR_NO_TEXT_MARKER.to_string());
        }
        Ok(text.to_string())
    }
}

pub fn is_no_text(text: &str) -> bool {
    text.trim() == OCR_NO_TEXT_MARKER
}
