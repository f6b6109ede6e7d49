//! Extraction clients: resume content to a `CandidateFragment`, certificate
//! content to `CertificateDetails`.
//!
//! Both share one round trip: build a prompt around the document, call the
//! generative service under a `RetryPolicy`, then pull the first JSON object out
//! of whatever prose came back. Defaulting absent fields is the caller's job.

pub mod certificate;
pub mod prompts;
pub mod resume;

pub use certificate::CertificateExtractor;
pub use resume::ResumeExtractor;

use serde_json::Value;
use tracing::debug;

use crate::documents::DocumentContent;
use crate::extraction::prompts::ATTACHED_DOCUMENT;
use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, NO_GUESSING_INSTRUCTION};
use crate::llm_client::retry::RetryPolicy;
use crate::llm_client::{
    extract_json_object, GenerationRequest, GenerativeService, InlineDocument, LlmError,
};

/// Fills `{document}` in `task_prompt` with the document text, or attaches the
/// document inline and points the prompt at it.
fn build_request(task_prompt: &str, content: &DocumentContent) -> GenerationRequest {
    let (document_text, document) = match content {
        DocumentContent::Text(text) => (text.as_str(), None),
        DocumentContent::Inline { mime_type, data } => (
            ATTACHED_DOCUMENT,
            Some(InlineDocument {
                mime_type: mime_type.clone(),
                data: data.clone(),
            }),
        ),
    };

    GenerationRequest {
        system: JSON_ONLY_SYSTEM.to_string(),
        prompt: format!(
            "{}\n\n{}",
            task_prompt.replace("{document}", document_text),
            NO_GUESSING_INSTRUCTION
        ),
        document,
    }
}

/// Calls the service (retrying transient failures only) and returns the first
/// JSON object in its answer.
async fn request_json_object(
    service: &dyn GenerativeService,
    retry: &RetryPolicy,
    request: &GenerationRequest,
) -> Result<Value, LlmError> {
    let text = retry
        .run(|| service.generate(request), LlmError::is_transient)
        .await?;
    debug!("Extraction answer: {} chars", text.len());

    extract_json_object(&text)
        .map(Value::Object)
        .ok_or(LlmError::NoJsonObject)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_text_content_is_embedded_in_prompt() {
        let request = build_request(
            "RESUME:\n{document}\nEND",
            &DocumentContent::Text("Jane Doe, RN".to_string()),
        );
        assert!(request.prompt.starts_with("RESUME:\nJane Doe, RN\nEND"));
        assert!(request.prompt.contains(NO_GUESSING_INSTRUCTION));
        assert_eq!(request.system, JSON_ONLY_SYSTEM);
        assert!(request.document.is_none());
    }

    #[test]
    fn test_inline_content_is_attached() {
        let request = build_request(
            "RESUME:\n{document}",
            &DocumentContent::Inline {
                mime_type: "application/pdf".to_string(),
                data: Bytes::from_static(b"%PDF-1.7"),
            },
        );
        assert!(request.prompt.contains(ATTACHED_DOCUMENT));
        let document = request.document.unwrap();
        assert_eq!(document.mime_type, "application/pdf");
        assert_eq!(document.data, Bytes::from_static(b"%PDF-1.7"));
    }
}
