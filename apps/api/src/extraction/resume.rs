use std::sync::Arc;

use tracing::info;

use crate::documents::DocumentContent;
use crate::extraction::prompts::RESUME_EXTRACTION_PROMPT;
use crate::extraction::{build_request, request_json_object};
use crate::llm_client::retry::RetryPolicy;
use crate::llm_client::{GenerativeService, LlmError};
use crate::models::candidate::CandidateFragment;

/// Structured-data extraction for resumes.
pub struct ResumeExtractor {
    service: Arc<dyn GenerativeService>,
    retry: RetryPolicy,
}

impl ResumeExtractor {
    pub fn new(service: Arc<dyn GenerativeService>, retry: RetryPolicy) -> Self {
        Self { service, retry }
    }

    /// Returns only what the service populated. Transient failures are retried;
    /// everything else, including an exhausted retry budget, is returned as is.
    pub async fn extract(&self, content: &DocumentContent) -> Result<CandidateFragment, LlmError> {
        let request = build_request(RESUME_EXTRACTION_PROMPT, content);
        let value = request_json_object(self.service.as_ref(), &self.retry, &request).await?;
        let fragment = CandidateFragment::from_json(value)?;
        info!("Resume extraction succeeded");
        Ok(fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::{unavailable, ScriptedService};
    use std::time::Duration;

    fn extractor(service: Arc<ScriptedService>) -> ResumeExtractor {
        ResumeExtractor::new(service, RetryPolicy::new(3, Duration::from_millis(10)))
    }

    fn text(s: &str) -> DocumentContent {
        DocumentContent::Text(s.to_string())
    }

    #[tokio::test]
    async fn test_parses_fragment_wrapped_in_prose() {
        let service = Arc::new(ScriptedService::answering(
            "Here is the result: {\"email\":\"a@b.com\"} Thanks!",
        ));
        let fragment = extractor(service.clone()).extract(&text("resume")).await.unwrap();

        assert_eq!(fragment.email.as_deref(), Some("a@b.com"));
        assert!(fragment.name.is_none());
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test]
    async fn test_prompt_lists_fields_and_hints() {
        let service = Arc::new(ScriptedService::answering("{}"));
        extractor(service.clone()).extract(&text("Jane Doe")).await.unwrap();

        let prompt = &service.requests()[0].prompt;
        assert!(prompt.contains("Jane Doe"));
        for field in ["secondary_phone", "work_authorization", "years_of_experience", "cover_letter"] {
            assert!(prompt.contains(field), "prompt is missing {field}");
        }
        assert!(prompt.contains("infer the city and state"));
        assert!(prompt.contains("full state names"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failures() {
        let service = Arc::new(ScriptedService::new(vec![
            Err(unavailable()),
            Err(unavailable()),
            Ok("{\"phone\": \"555-0100\"}".to_string()),
        ]));
        let fragment = extractor(service.clone()).extract(&text("resume")).await.unwrap();

        assert_eq!(fragment.phone.as_deref(), Some("555-0100"));
        assert_eq!(service.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_three_unavailable_answers() {
        let service = Arc::new(ScriptedService::unavailable(5));
        let err = extractor(service.clone()).extract(&text("resume")).await.unwrap_err();

        assert!(err.is_transient());
        assert_eq!(service.calls(), 3);
    }

    #[tokio::test]
    async fn test_fatal_error_is_not_retried() {
        let service = Arc::new(ScriptedService::new(vec![Err(LlmError::Api {
            status: 400,
            message: "bad key".to_string(),
        })]));
        let err = extractor(service.clone()).extract(&text("resume")).await.unwrap_err();

        assert!(matches!(err, LlmError::Api { status: 400, .. }));
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test]
    async fn test_answer_without_json_is_format_failure() {
        let service = Arc::new(ScriptedService::answering("I could not read that resume."));
        let err = extractor(service).extract(&text("resume")).await.unwrap_err();
        assert!(matches!(err, LlmError::NoJsonObject));
    }

    #[tokio::test]
    async fn test_truncated_answer_is_format_failure() {
        let service = Arc::new(ScriptedService::answering(
            r#"{"name": {"first": "Jane", "last": "Doe"}, "phone": "555-01"#,
        ));
        let err = extractor(service).extract(&text("resume")).await.unwrap_err();
        assert!(matches!(err, LlmError::NoJsonObject));
    }

    #[tokio::test]
    async fn test_wrong_field_type_is_format_failure() {
        let service = Arc::new(ScriptedService::answering("{\"skills\": \"ICU, ER\"}"));
        let err = extractor(service).extract(&text("resume")).await.unwrap_err();
        assert!(err.is_format());
    }
}
