use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::backend::{submit_certifications, ApplicationBackend, GENERIC_SUBMISSION_FAILURE};
use crate::documents::{DocumentExtractor, PdfStrategy, UploadedFile};
use crate::extraction::{CertificateExtractor, ResumeExtractor};
use crate::intake::session::{
    ExtractionOutcome, IntakeError, IntakeSession, SessionView, SubmissionReport,
    SubmissionSnapshot,
};
use crate::intake::store::SessionStore;
use crate::models::candidate::CandidateRecord;
use crate::models::certification::CertificationType;

/// How long a successful flow stays visible before it is closed.
pub const AUTO_CLOSE_DELAY: Duration = Duration::from_secs(3);

/// Sessions left alone this long are dropped along with their uploads.
pub const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// How often the idle sweep runs.
pub const IDLE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Sequences document extraction, structured extraction and submission for
/// every intake session. Network and parsing work never runs under the store lock.
pub struct IntakeOrchestrator {
    store: SessionStore,
    documents: DocumentExtractor,
    resumes: ResumeExtractor,
    certificates: CertificateExtractor,
    backend: Arc<dyn ApplicationBackend>,
}

impl IntakeOrchestrator {
    pub fn new(
        documents: DocumentExtractor,
        resumes: ResumeExtractor,
        certificates: CertificateExtractor,
        backend: Arc<dyn ApplicationBackend>,
    ) -> Self {
        Self {
            store: SessionStore::default(),
            documents,
            resumes,
            certificates,
            backend,
        }
    }

    pub async fn open(&self, job_id: &str) -> SessionView {
        let session = IntakeSession::new(job_id);
        let view = session.view();
        self.store.insert(session).await;
        info!(
            "Opened intake session {} for job {} ({} active)",
            view.id,
            job_id,
            self.store.len().await
        );
        view
    }

    pub async fn view(&self, id: Uuid) -> Result<SessionView, IntakeError> {
        self.store.read(id, IntakeSession::view).await
    }

    /// Abandons the flow. Results still in flight are discarded when they land.
    pub async fn cancel(&self, id: Uuid) -> Result<(), IntakeError> {
        self.store.remove_if(id, IntakeSession::ensure_cancellable).await?;
        info!("Intake session {} cancelled", id);
        Ok(())
    }

    /// Runs the whole extraction for a resume and returns the session as it
    /// stands afterwards: `review`, or `awaiting_upload` with an error.
    pub async fn upload_resume(&self, id: Uuid, file: UploadedFile) -> Result<SessionView, IntakeError> {
        let ticket = self
            .store
            .update(id, |s| s.begin_extraction(file.clone()))
            .await?;
        info!(
            "Session {}: resume uploaded ({}, {} bytes)",
            id,
            file.mime_type,
            file.bytes.len()
        );

        let outcome = self.extract_resume(id, &file).await;

        let applied = self
            .store
            .update(id, |s| Ok(s.complete_extraction(ticket, outcome)))
            .await;
        match applied {
            Ok(true) => {}
            Ok(false) | Err(IntakeError::SessionNotFound(_)) => {
                info!("Session {}: discarded stale extraction result", id);
            }
            Err(e) => return Err(e),
        }
        self.view(id).await
    }

    async fn extract_resume(&self, id: Uuid, file: &UploadedFile) -> ExtractionOutcome {
        let content = match self.documents.extract(file, PdfStrategy::Inline).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Session {}: resume could not be read: {}", id, e);
                return ExtractionOutcome::Unreadable(format!(
                    "{e}. Please upload a different file."
                ));
            }
        };

        match self.resumes.extract(&content).await {
            Ok(fragment) => {
                info!("Session {}: resume extracted", id);
                ExtractionOutcome::Extracted(fragment.into_record())
            }
            Err(e) if e.is_format() => {
                warn!("Session {}: extraction answer was unusable, falling back to manual entry: {}", id, e);
                ExtractionOutcome::ServiceFailed
            }
            Err(e) => {
                warn!("Session {}: extraction service failed, falling back to manual entry: {}", id, e);
                ExtractionOutcome::ServiceFailed
            }
        }
    }

    pub async fn update_candidate(
        &self,
        id: Uuid,
        candidate: CandidateRecord,
    ) -> Result<SessionView, IntakeError> {
        self.store
            .update(id, |s| {
                s.update_candidate(candidate)?;
                Ok(s.view())
            })
            .await
    }

    pub async fn add_certification(
        &self,
        id: Uuid,
        certification_type: Option<CertificationType>,
    ) -> Result<SessionView, IntakeError> {
        self.store
            .update(id, |s| {
                s.add_certification(certification_type)?;
                Ok(s.view())
            })
            .await
    }

    pub async fn remove_certification(&self, id: Uuid, cert_id: Uuid) -> Result<SessionView, IntakeError> {
        self.store
            .update(id, |s| {
                s.remove_certification(cert_id)?;
                Ok(s.view())
            })
            .await
    }

    pub async fn set_certification_type(
        &self,
        id: Uuid,
        cert_id: Uuid,
        certification_type: Option<CertificationType>,
    ) -> Result<SessionView, IntakeError> {
        self.store
            .update(id, |s| {
                s.set_certification_type(cert_id, certification_type)?;
                Ok(s.view())
            })
            .await
    }

    /// Attaches the file, then reads it to pre-fill the type and details.
    /// A certificate that can't be read stays attached and editable.
    pub async fn attach_certification_file(
        &self,
        id: Uuid,
        cert_id: Uuid,
        file: UploadedFile,
    ) -> Result<SessionView, IntakeError> {
        self.store
            .update(id, |s| s.attach_certification_file(cert_id, file.clone()))
            .await?;

        let details = match self.documents.extract(&file, PdfStrategy::PreferText).await {
            Ok(content) => self.certificates.extract(&content).await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match details {
            Ok(details) => {
                let file_name = file.file_name.clone();
                let applied = self
                    .store
                    .update(id, |s| Ok(s.apply_certificate_details(cert_id, &file_name, details)))
                    .await
                    .unwrap_or(false);
                if !applied {
                    info!("Session {}: discarded stale certificate details", id);
                }
            }
            Err(reason) => {
                warn!("Session {}: certificate {} could not be pre-filled: {}", id, cert_id, reason);
            }
        }

        self.view(id).await
    }

    /// Posts the application, then every complete certification concurrently.
    /// Success is decided by the main application alone.
    ///
    /// The delivery runs as its own task, so a caller that goes away mid-request
    /// does not strand the session in `submitting`.
    pub async fn submit(&self, id: Uuid) -> Result<SessionView, IntakeError> {
        let snapshot = self.store.update(id, IntakeSession::begin_submission).await?;
        info!(
            "Session {}: submitting application for job {} with {} certification(s)",
            id,
            snapshot.application.job_id,
            snapshot.certifications.len()
        );

        let delivery = tokio::spawn(deliver(
            self.store.clone(),
            self.backend.clone(),
            id,
            snapshot,
        ));

        match delivery.await {
            Ok(view) => view,
            Err(e) => {
                error!("Session {}: submission task failed: {}", id, e);
                self.store
                    .update(id, |s| {
                        s.complete_submission(Err(GENERIC_SUBMISSION_FAILURE.to_string()));
                        Ok(s.view())
                    })
                    .await
            }
        }
    }

    /// Starts the background sweep that drops abandoned sessions.
    pub fn spawn_idle_sweep(&self) -> JoinHandle<()> {
        let store = self.store.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(IDLE_SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                let evicted = store.evict_idle(SESSION_IDLE_TIMEOUT).await;
                if evicted > 0 {
                    info!("Evicted {} idle intake session(s)", evicted);
                }
            }
        })
    }
}

async fn deliver(
    store: SessionStore,
    backend: Arc<dyn ApplicationBackend>,
    id: Uuid,
    snapshot: SubmissionSnapshot,
) -> Result<SessionView, IntakeError> {
    let result = match backend.submit_application(&snapshot.application).await {
        Ok(message) => {
            let certifications = submit_certifications(backend.as_ref(), &snapshot.certifications).await;
            let failed = certifications.iter().filter(|o| !o.is_submitted()).count();
            info!(
                "Session {}: application submitted ({} of {} certification(s) failed)",
                id,
                failed,
                certifications.len()
            );
            Ok(SubmissionReport {
                message,
                certifications,
            })
        }
        Err(e) => {
            warn!("Session {}: application submission failed: {}", id, e);
            Err(e.user_message())
        }
    };

    let succeeded = result.is_ok();
    let view = store
        .update(id, |s| {
            s.complete_submission(result);
            Ok(s.view())
        })
        .await?;

    if succeeded {
        schedule_close(store, id);
    }
    Ok(view)
}

fn schedule_close(store: SessionStore, id: Uuid) {
    tokio::spawn(async move {
        tokio::time::sleep(AUTO_CLOSE_DELAY).await;
        if store.remove_if(id, |_| Ok(())).await.is_ok() {
            info!("Intake session {} closed after success", id);
        }
    });
}
