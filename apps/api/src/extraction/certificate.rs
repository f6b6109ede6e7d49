use std::sync::Arc;

use tracing::info;

use crate::documents::DocumentContent;
use crate::extraction::prompts::CERTIFICATE_EXTRACTION_PROMPT;
use crate::extraction::{build_request, request_json_object};
use crate::llm_client::retry::RetryPolicy;
use crate::llm_client::{GenerativeService, LlmError};
use crate::models::certification::{CertificateCode, CertificateDetails, CertificateFragment};

/// Certificate variant of the resume extractor: same round trip, narrower fields,
/// and the answer is validated against the short code table before use.
pub struct CertificateExtractor {
    service: Arc<dyn GenerativeService>,
    retry: RetryPolicy,
}

impl CertificateExtractor {
    pub fn new(service: Arc<dyn GenerativeService>, retry: RetryPolicy) -> Self {
        Self { service, retry }
    }

    pub async fn extract(&self, content: &DocumentContent) -> Result<CertificateDetails, LlmError> {
        let prompt = CERTIFICATE_EXTRACTION_PROMPT.replace("{short_codes}", &short_code_table());
        let request = build_request(&prompt, content);
        let value = request_json_object(self.service.as_ref(), &self.retry, &request).await?;
        let details = CertificateFragment::from_json(value)?.into_details();
        info!(
            "Certificate extraction succeeded (type recognised: {})",
            details.certificate_type.is_some()
        );
        Ok(details)
    }
}

fn short_code_table() -> String {
    CertificateCode::ALL
        .iter()
        .map(|code| format!("- {}: {}", code.short_code(), code.expansion()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::{unavailable, ScriptedService};
    use crate::models::certification::CertificationType;
    use std::time::Duration;

    fn extractor(service: Arc<ScriptedService>) -> CertificateExtractor {
        CertificateExtractor::new(service, RetryPolicy::new(3, Duration::from_millis(10)))
    }

    fn ocr_text() -> DocumentContent {
        DocumentContent::Text("American Heart Association ACLS Provider".to_string())
    }

    #[test]
    fn test_short_code_table_lists_every_code() {
        let table = short_code_table();
        assert_eq!(table.lines().count(), CertificateCode::ALL.len());
        assert!(table.contains("- BLS: Basic Life Support"));
    }

    #[tokio::test]
    async fn test_prompt_carries_short_codes_and_document() {
        let service = Arc::new(ScriptedService::answering("{}"));
        extractor(service.clone()).extract(&ocr_text()).await.unwrap();

        let prompt = &service.requests()[0].prompt;
        assert!(prompt.contains("- ACLS: Advanced Cardiovascular Life Support"));
        assert!(prompt.contains("American Heart Association ACLS Provider"));
        assert!(!prompt.contains("{short_codes}"));
    }

    #[tokio::test]
    async fn test_details_are_validated() {
        let service = Arc::new(ScriptedService::answering(
            r#"```json
            {
              "certificate_type": "Advanced Cardiovascular Life Support",
              "holder_name": " Jane Doe ",
              "license_number": "AHA-12345",
              "issue_date": "March 15, 2024",
              "expiry_date": "03/04/2026",
              "issuing_organization": "American Heart Association"
            }
            ```"#,
        ));
        let details = extractor(service).extract(&ocr_text()).await.unwrap();

        assert_eq!(
            details.certificate_type,
            Some(CertificationType::Known(CertificateCode::Acls))
        );
        assert_eq!(details.holder_name, "Jane Doe");
        assert_eq!(details.license_number, "AHA-12345");
        assert_eq!(details.issue_date, "2024-03-15");
        assert_eq!(details.expiry_date, "");
        assert_eq!(details.issuing_organization, "American Heart Association");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_like_resume_extraction() {
        let service = Arc::new(ScriptedService::new(vec![
            Err(unavailable()),
            Ok("{\"certificate_type\": \"BLS\"}".to_string()),
        ]));
        let details = extractor(service.clone()).extract(&ocr_text()).await.unwrap();

        assert_eq!(
            details.certificate_type,
            Some(CertificationType::Known(CertificateCode::Bls))
        );
        assert_eq!(service.calls(), 2);
    }

    #[tokio::test]
    async fn test_no_json_is_format_failure() {
        let service = Arc::new(ScriptedService::answering("This image is too blurry."));
        let err = extractor(service).extract(&ocr_text()).await.unwrap_err();
        assert!(err.is_format());
    }
}
