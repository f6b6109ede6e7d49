//! Application Submission Client and the staffing backend's read-only lookups.
//!
//! The orchestrator only sees the `ApplicationBackend` trait; `BackendClient`
//! is the reqwest implementation used in production.

pub mod client;
pub mod handlers;

pub use client::BackendClient;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::documents::UploadedFile;
use crate::models::candidate::CandidateRecord;

/// Shown when the backend rejects a submission without saying why.
pub const GENERIC_SUBMISSION_FAILURE: &str =
    "We could not submit your application. Please try again in a moment.";

/// SubmissionFailure and lookup failures.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend rejected the request (status {status:?}): {message}")]
    Rejected { status: Option<u16>, message: String },

    #[error("Invalid file for upload: {0}")]
    InvalidFile(String),

    #[error("Unexpected response from backend: {0}")]
    Decode(String),
}

impl BackendError {
    /// The backend's own message when it sent one, otherwise the generic failure.
    pub fn user_message(&self) -> String {
        match self {
            BackendError::Rejected { message, .. } if !message.trim().is_empty() => {
                message.clone()
            }
            _ => GENERIC_SUBMISSION_FAILURE.to_string(),
        }
    }
}

/// Everything the backend needs for the main application.
#[derive(Debug, Clone)]
pub struct ApplicationSubmission {
    pub job_id: String,
    pub candidate: CandidateRecord,
    pub resume: UploadedFile,
}

/// One complete certification, ready to post.
#[derive(Debug, Clone)]
pub struct CertificationSubmission {
    pub certification_id: Uuid,
    pub job_id: String,
    pub email: String,
    pub certificate_name: String,
    pub file: UploadedFile,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CertificationOutcome {
    Submitted { certification_id: Uuid },
    Failed { certification_id: Uuid, reason: String },
}

impl CertificationOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, CertificationOutcome::Submitted { .. })
    }
}

/// The staffing backend seam.
#[async_trait]
pub trait ApplicationBackend: Send + Sync {
    /// Returns the backend's confirmation message.
    async fn submit_application(&self, submission: &ApplicationSubmission) -> Result<String, BackendError>;

    async fn submit_certification(&self, submission: &CertificationSubmission) -> Result<(), BackendError>;
}

/// Posts every certification concurrently and waits for all of them. Failures
/// are logged and reported per item; they never fail the batch.
pub async fn submit_certifications(
    backend: &dyn ApplicationBackend,
    batch: &[CertificationSubmission],
) -> Vec<CertificationOutcome> {
    let attempts = batch.iter().map(|submission| async move {
        match backend.submit_certification(submission).await {
            Ok(()) => CertificationOutcome::Submitted {
                certification_id: submission.certification_id,
            },
            Err(e) => {
                warn!(
                    "Certification {} ({}) was not submitted: {}",
                    submission.certification_id, submission.certificate_name, e
                );
                CertificationOutcome::Failed {
                    certification_id: submission.certification_id,
                    reason: e.user_message(),
                }
            }
        }
    });

    join_all(attempts).await
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingBackend;
    use super::*;
    use bytes::Bytes;

    fn certification(name: &str) -> CertificationSubmission {
        CertificationSubmission {
            certification_id: Uuid::new_v4(),
            job_id: "JOB-1".to_string(),
            email: "jane@x.com".to_string(),
            certificate_name: name.to_string(),
            file: UploadedFile::new(format!("{name}.pdf"), "application/pdf", Bytes::from_static(b"%PDF-")),
        }
    }

    #[test]
    fn test_user_message_prefers_backend_message() {
        let err = BackendError::Rejected {
            status: Some(409),
            message: "You already applied to this job".to_string(),
        };
        assert_eq!(err.user_message(), "You already applied to this job");
    }

    #[test]
    fn test_user_message_falls_back_to_generic() {
        let blank = BackendError::Rejected {
            status: Some(500),
            message: "  ".to_string(),
        };
        assert_eq!(blank.user_message(), GENERIC_SUBMISSION_FAILURE);
        assert_eq!(
            BackendError::Decode("not json".to_string()).user_message(),
            GENERIC_SUBMISSION_FAILURE
        );
    }

    #[tokio::test]
    async fn test_certification_fan_out_reports_each_item() {
        let backend = RecordingBackend {
            failing_certificates: vec!["ACLS".to_string()],
            ..RecordingBackend::default()
        };
        let batch = vec![certification("BLS"), certification("ACLS"), certification("PALS")];

        let outcomes = submit_certifications(&backend, &batch).await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(
            outcomes[0],
            CertificationOutcome::Submitted {
                certification_id: batch[0].certification_id
            }
        );
        assert_eq!(
            outcomes[1],
            CertificationOutcome::Failed {
                certification_id: batch[1].certification_id,
                reason: GENERIC_SUBMISSION_FAILURE.to_string(),
            }
        );
        assert!(outcomes[2].is_submitted());
        assert_eq!(backend.certifications().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_batch_sends_nothing() {
        let backend = RecordingBackend::default();
        assert!(submit_certifications(&backend, &[]).await.is_empty());
        assert!(backend.certifications().is_empty());
    }
}
