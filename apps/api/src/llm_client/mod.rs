//! Gemini `generateContent` client and the `GenerativeService` seam.
//!
//! Extraction code depends on the trait only. The model is fixed at compile
//! time so every environment extracts with the same one.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;
pub mod retry;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com";
/// The model used for all extraction calls.
pub const MODEL: &str = "gemini-1.5-flash";
const MAX_OUTPUT_TOKENS: u32 = 2048;
const TEMPERATURE: f32 = 0.1;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// TransientServiceFailure: the only retryable error.
    #[error("Service temporarily unavailable: {message}")]
    Unavailable { message: String },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("LLM returned empty content")]
    EmptyContent,

    /// FormatFailure: the answer held no parsable JSON object.
    #[error("No JSON object found in LLM response")]
    NoJsonObject,

    /// FormatFailure: a JSON object was found but did not fit the expected schema.
    #[error("LLM response did not match the expected schema: {0}")]
    Schema(#[from] serde_json::Error),
}

impl LlmError {
    pub fn is_transient(&self) -> bool {
        matches!(self, LlmError::Unavailable { .. })
    }

    pub fn is_format(&self) -> bool {
        matches!(self, LlmError::NoJsonObject | LlmError::Schema(_))
    }
}

/// A document attached to a request as base64 inline data.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineDocument {
    pub mime_type: String,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system: String,
    pub prompt: String,
    pub document: Option<InlineDocument>,
}

/// The generative extraction service seam.
#[async_trait]
pub trait GenerativeService: Send + Sync {
    /// Sends one request and returns the first text segment of the answer.
    /// Retrying is the caller's concern.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    system_instruction: GeminiContent<'a>,
    contents: Vec<GeminiContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum GeminiPart<'a> {
    Text(&'a str),
    InlineData(InlineData),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
}

impl LlmResponse {
    /// The first non-empty text segment across all candidates.
    pub fn text(&self) -> Option<&str> {
        self.candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .find(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
    #[serde(default)]
    status: String,
}

/// Gemini `generateContent` client. Constructed once in `main` and injected.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, GEMINI_API_URL)
    }

    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, MODEL)
    }

    /// Makes one raw call, returning the full response object.
    pub async fn call(&self, request: &GenerationRequest) -> Result<LlmResponse, LlmError> {
        let mut parts = vec![GeminiPart::Text(&request.prompt)];
        if let Some(document) = &request.document {
            parts.push(GeminiPart::InlineData(InlineData {
                mime_type: document.mime_type.clone(),
                data: STANDARD.encode(&document.data),
            }));
        }

        let body = GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart::Text(&request.system)],
            },
            contents: vec![GeminiContent {
                role: Some("user"),
                parts,
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        debug!(
            "LLM call: prompt_chars={}, inline_bytes={}",
            request.prompt.len(),
            request.document.as_ref().map_or(0, |d| d.data.len())
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let parsed = serde_json::from_str::<GeminiError>(&body).ok();
            let unavailable = status.as_u16() == 503
                || parsed.as_ref().is_some_and(|e| e.error.status == "UNAVAILABLE");
            let message = parsed.map(|e| e.error.message).unwrap_or(body);

            if unavailable {
                warn!("LLM API returned {}: {}", status, message);
                return Err(LlmError::Unavailable { message });
            }
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let llm_response: LlmResponse = response.json().await?;

        if let Some(usage) = &llm_response.usage_metadata {
            debug!(
                "LLM call succeeded: prompt_tokens={}, output_tokens={}",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }

        Ok(llm_response)
    }
}

#[async_trait]
impl GenerativeService for LlmClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        let response = self.call(request).await?;
        response
            .text()
            .map(str::to_string)
            .ok_or(LlmError::EmptyContent)
    }
}

/// Finds the first well-formed JSON object in free-form model output.
///
/// The answer may be wrapped in prose or code fences, so every `{` is tried as
/// a starting point until one parses as a complete object. An object cut off
/// by the end of the answer ends the search: anything after its opening brace
/// is a fragment of it, not an answer of its own.
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    for (start, _) in text.match_indices('{') {
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(Value::Object(map))) => return Some(map),
            Some(Err(e)) if e.is_eof() => return None,
            _ => {}
        }
    }
    None
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(document: Option<InlineDocument>) -> GenerationRequest {
        GenerationRequest {
            system: "Return JSON only.".to_string(),
            prompt: "Extract fields.".to_string(),
            document,
        }
    }

    fn generate_path() -> String {
        format!("/v1beta/models/{MODEL}:generateContent")
    }

    #[test]
    fn test_extract_json_object_from_prose() {
        let text = "Here is the result: {\"email\":\"a@b.com\"} Thanks!";
        let map = extract_json_object(text).unwrap();
        assert_eq!(Value::Object(map), json!({"email": "a@b.com"}));
    }

    #[test]
    fn test_extract_json_object_from_code_fence() {
        let text = "```json\n{\"name\": {\"first\": \"Jane\"}}\n```";
        let map = extract_json_object(text).unwrap();
        assert_eq!(Value::Object(map), json!({"name": {"first": "Jane"}}));
    }

    #[test]
    fn test_extract_json_object_skips_malformed_spans() {
        let text = "Note {not json} and then {\"phone\": \"555\"}";
        let map = extract_json_object(text).unwrap();
        assert_eq!(Value::Object(map), json!({"phone": "555"}));
    }

    #[test]
    fn test_extract_json_object_handles_braces_inside_strings() {
        let text = r#"{"cover_letter": "I love {curly} braces", "email": "x@y.z"}"#;
        let map = extract_json_object(text).unwrap();
        assert_eq!(map["cover_letter"], json!("I love {curly} braces"));
    }

    #[test]
    fn test_extract_json_object_rejects_truncated_answer() {
        let text = "```json\n{\"name\": {\"first\": \"Jane\", \"last\": \"Doe\"}, \"email\": \"jane@";
        assert!(extract_json_object(text).is_none());
    }

    #[test]
    fn test_extract_json_object_none_when_absent() {
        assert!(extract_json_object("Sorry, I cannot read this document.").is_none());
        assert!(extract_json_object("[1, 2, 3]").is_none());
        assert!(extract_json_object("{\"unterminated\": ").is_none());
    }

    #[test]
    fn test_response_text_uses_first_available_segment() {
        let response: LlmResponse = serde_json::from_value(json!({
            "candidates": [
                {"content": {"parts": []}},
                {"content": {"parts": [{"text": "  "}, {"text": "first"}, {"text": "second"}]}}
            ]
        }))
        .unwrap();
        assert_eq!(response.text(), Some("first"));
    }

    #[test]
    fn test_response_text_none_without_candidates() {
        let response: LlmResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(response.text(), None);
    }

    #[test]
    fn test_error_classification() {
        assert!(LlmError::Unavailable { message: String::new() }.is_transient());
        assert!(!LlmError::Api { status: 400, message: String::new() }.is_transient());
        assert!(LlmError::NoJsonObject.is_format());
        assert!(!LlmError::EmptyContent.is_format());
    }

    #[tokio::test]
    async fn test_generate_returns_first_text_segment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(generate_path()))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "{\"email\":\"a@b.com\"}"}]}}],
                "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 5}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = LlmClient::with_base_url("test-key".to_string(), server.uri());
        let text = client.generate(&request(None)).await.unwrap();
        assert_eq!(text, "{\"email\":\"a@b.com\"}");
    }

    #[tokio::test]
    async fn test_generate_sends_inline_document_as_base64() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(generate_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "{}"}]}}]
            })))
            .mount(&server)
            .await;

        let client = LlmClient::with_base_url("k".to_string(), server.uri());
        let document = InlineDocument {
            mime_type: "application/pdf".to_string(),
            data: Bytes::from_static(b"%PDF-1.4"),
        };
        client.generate(&request(Some(document))).await.unwrap();

        let received = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&received[0].body).unwrap();
        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], json!("Extract fields."));
        assert_eq!(parts[1]["inlineData"]["mimeType"], json!("application/pdf"));
        assert_eq!(parts[1]["inlineData"]["data"], json!(STANDARD.encode(b"%PDF-1.4")));
        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            json!("Return JSON only.")
        );
    }

    #[tokio::test]
    async fn test_503_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({
                "error": {"code": 503, "message": "The model is overloaded.", "status": "UNAVAILABLE"}
            })))
            .mount(&server)
            .await;

        let client = LlmClient::with_base_url("k".to_string(), server.uri());
        let err = client.generate(&request(None)).await.unwrap_err();
        assert!(err.is_transient());
        assert!(err.to_string().contains("overloaded"));
    }

    #[tokio::test]
    async fn test_400_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}
            })))
            .mount(&server)
            .await;

        let client = LlmClient::with_base_url("k".to_string(), server.uri());
        let err = client.generate(&request(None)).await.unwrap_err();
        assert!(!err.is_transient());
        assert!(matches!(err, LlmError::Api { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_no_text_segments_is_empty_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
            .mount(&server)
            .await;

        let client = LlmClient::with_base_url("k".to_string(), server.uri());
        let err = client.generate(&request(None)).await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyContent));
    }
}
