//! The intake state machine. Pure data: no I/O, no clocks, no locks.
//!
//! ```text
//! awaiting_upload -> extracting -> review -> submitting -> success
//!        ^               |           ^          |
//!        +---------------+           +----------+ (submission failed)
//! ```

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::backend::{ApplicationSubmission, CertificationOutcome, CertificationSubmission};
use crate::documents::{FileSummary, UploadedFile};
use crate::models::candidate::CandidateRecord;
use crate::models::certification::{
    CertificateDetails, CertificationRecord, CertificationType, CertificationView,
    MAX_CERTIFICATIONS,
};

/// Shown in review when extraction failed and the form starts empty.
pub const MANUAL_ENTRY_NOTICE: &str =
    "We couldn't read your resume automatically. Please fill in your details manually.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakePhase {
    AwaitingUpload,
    Extracting,
    Review,
    Submitting,
    Success,
}

impl std::fmt::Display for IntakePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            IntakePhase::AwaitingUpload => "awaiting-upload",
            IntakePhase::Extracting => "extracting",
            IntakePhase::Review => "review",
            IntakePhase::Submitting => "submitting",
            IntakePhase::Success => "success",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum IntakeError {
    #[error("Intake session {0} not found")]
    SessionNotFound(Uuid),

    #[error("Cannot {action} while {phase}")]
    InvalidPhase {
        action: &'static str,
        phase: IntakePhase,
    },

    #[error("At most {max} certifications can be attached to an application")]
    CertificationLimit { max: usize },

    #[error("Certification {0} not found")]
    CertificationNotFound(Uuid),

    #[error("Upload a resume before submitting")]
    MissingResume,
}

/// How a resume extraction ended, as far as the session cares.
#[derive(Debug, Clone)]
pub enum ExtractionOutcome {
    /// Fully defaulted record, possibly all empty.
    Extracted(CandidateRecord),
    /// The file itself could not be read; the user has to upload another one.
    Unreadable(String),
    /// The file was fine but the extraction service failed; fall back to manual entry.
    ServiceFailed,
}

/// What gets sent when the user submits.
#[derive(Debug, Clone)]
pub struct SubmissionSnapshot {
    pub application: ApplicationSubmission,
    /// Complete certifications only.
    pub certifications: Vec<CertificationSubmission>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionReport {
    pub message: String,
    pub certifications: Vec<CertificationOutcome>,
}

#[derive(Debug, Clone)]
pub struct IntakeSession {
    pub id: Uuid,
    pub job_id: String,
    pub phase: IntakePhase,
    pub candidate: CandidateRecord,
    pub resume: Option<UploadedFile>,
    pub certifications: Vec<CertificationRecord>,
    pub last_error: Option<String>,
    pub notice: Option<String>,
    pub report: Option<SubmissionReport>,
    extraction_ticket: u64,
}

/// The session as returned to the browser.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub job_id: String,
    pub phase: IntakePhase,
    pub candidate: CandidateRecord,
    pub resume: Option<FileSummary>,
    pub certifications: Vec<CertificationView>,
    pub max_certifications: usize,
    pub last_error: Option<String>,
    pub notice: Option<String>,
    pub report: Option<SubmissionReport>,
}

impl IntakeSession {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id: job_id.into(),
            phase: IntakePhase::AwaitingUpload,
            candidate: CandidateRecord::default(),
            resume: None,
            certifications: Vec::new(),
            last_error: None,
            notice: None,
            report: None,
            extraction_ticket: 0,
        }
    }

    fn require(&self, action: &'static str, allowed: &[IntakePhase]) -> Result<(), IntakeError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(IntakeError::InvalidPhase {
                action,
                phase: self.phase,
            })
        }
    }

    /// Starts a new extraction and returns its ticket. A newer upload (or a
    /// cancel) makes any earlier ticket stale.
    pub fn begin_extraction(&mut self, file: UploadedFile) -> Result<u64, IntakeError> {
        self.require(
            "upload a resume",
            &[IntakePhase::AwaitingUpload, IntakePhase::Extracting, IntakePhase::Review],
        )?;
        self.extraction_ticket += 1;
        self.phase = IntakePhase::Extracting;
        self.resume = Some(file);
        self.last_error = None;
        self.notice = None;
        Ok(self.extraction_ticket)
    }

    /// Applies an extraction result. Returns `false` (and changes nothing) when
    /// the result is stale.
    pub fn complete_extraction(&mut self, ticket: u64, outcome: ExtractionOutcome) -> bool {
        if ticket != self.extraction_ticket || self.phase != IntakePhase::Extracting {
            return false;
        }
        match outcome {
            ExtractionOutcome::Extracted(record) => {
                self.candidate = record;
                self.phase = IntakePhase::Review;
            }
            ExtractionOutcome::Unreadable(message) => {
                self.resume = None;
                self.last_error = Some(message);
                self.phase = IntakePhase::AwaitingUpload;
            }
            ExtractionOutcome::ServiceFailed => {
                self.candidate = CandidateRecord::default();
                self.notice = Some(MANUAL_ENTRY_NOTICE.to_string());
                self.phase = IntakePhase::Review;
            }
        }
        true
    }

    pub fn update_candidate(&mut self, candidate: CandidateRecord) -> Result<(), IntakeError> {
        self.require("edit the application", &[IntakePhase::Review])?;
        self.candidate = candidate;
        Ok(())
    }

    pub fn add_certification(
        &mut self,
        certification_type: Option<CertificationType>,
    ) -> Result<Uuid, IntakeError> {
        self.require("add a certification", &[IntakePhase::Review])?;
        if self.certifications.len() >= MAX_CERTIFICATIONS {
            return Err(IntakeError::CertificationLimit {
                max: MAX_CERTIFICATIONS,
            });
        }
        let record = CertificationRecord::new(certification_type);
        let id = record.id;
        self.certifications.push(record);
        Ok(id)
    }

    pub fn remove_certification(&mut self, id: Uuid) -> Result<(), IntakeError> {
        self.require("remove a certification", &[IntakePhase::Review])?;
        let before = self.certifications.len();
        self.certifications.retain(|c| c.id != id);
        if self.certifications.len() == before {
            return Err(IntakeError::CertificationNotFound(id));
        }
        Ok(())
    }

    fn certification_mut(&mut self, id: Uuid) -> Result<&mut CertificationRecord, IntakeError> {
        self.certifications
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(IntakeError::CertificationNotFound(id))
    }

    pub fn set_certification_type(
        &mut self,
        id: Uuid,
        certification_type: Option<CertificationType>,
    ) -> Result<(), IntakeError> {
        self.require("edit a certification", &[IntakePhase::Review])?;
        self.certification_mut(id)?.certification_type = certification_type;
        Ok(())
    }

    /// Replaces the file and clears details read from any previous one.
    pub fn attach_certification_file(&mut self, id: Uuid, file: UploadedFile) -> Result<(), IntakeError> {
        self.require("attach a certificate", &[IntakePhase::Review])?;
        let record = self.certification_mut(id)?;
        record.file = Some(file);
        record.details = None;
        Ok(())
    }

    /// Stores extracted details and fills the type if the user hasn't chosen one.
    /// Returns `false` if the certification is gone or no longer holds `file_name`.
    pub fn apply_certificate_details(
        &mut self,
        id: Uuid,
        file_name: &str,
        details: CertificateDetails,
    ) -> bool {
        let Ok(record) = self.certification_mut(id) else {
            return false;
        };
        if record.file.as_ref().map(|f| f.file_name.as_str()) != Some(file_name) {
            return false;
        }
        if record.certification_type.is_none() {
            record.certification_type = details.certificate_type.clone();
        }
        record.details = Some(details);
        true
    }

    /// Moves to `submitting` and returns what to send. Incomplete certifications
    /// are left out.
    pub fn begin_submission(&mut self) -> Result<SubmissionSnapshot, IntakeError> {
        self.require("submit", &[IntakePhase::Review])?;
        let resume = self.resume.clone().ok_or(IntakeError::MissingResume)?;

        let certifications = self
            .certifications
            .iter()
            .filter_map(|record| match (&record.certification_type, &record.file) {
                (Some(certification_type), Some(file)) => Some(CertificationSubmission {
                    certification_id: record.id,
                    job_id: self.job_id.clone(),
                    email: self.candidate.email.clone(),
                    certificate_name: certification_type.label().to_string(),
                    file: file.clone(),
                }),
                _ => None,
            })
            .collect();

        self.phase = IntakePhase::Submitting;
        self.last_error = None;

        Ok(SubmissionSnapshot {
            application: ApplicationSubmission {
                job_id: self.job_id.clone(),
                candidate: self.candidate.clone(),
                resume,
            },
            certifications,
        })
    }

    /// `Ok` ends the flow; `Err` returns to review with every edit kept.
    pub fn complete_submission(&mut self, result: Result<SubmissionReport, String>) {
        if self.phase != IntakePhase::Submitting {
            return;
        }
        match result {
            Ok(report) => {
                self.report = Some(report);
                self.phase = IntakePhase::Success;
            }
            Err(message) => {
                self.last_error = Some(message);
                self.phase = IntakePhase::Review;
            }
        }
    }

    /// Nothing has been sent before `submitting`, so any earlier phase can be abandoned.
    pub fn ensure_cancellable(&self) -> Result<(), IntakeError> {
        self.require(
            "cancel",
            &[
                IntakePhase::AwaitingUpload,
                IntakePhase::Extracting,
                IntakePhase::Review,
                IntakePhase::Success,
            ],
        )
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            id: self.id,
            job_id: self.job_id.clone(),
            phase: self.phase,
            candidate: self.candidate.clone(),
            resume: self.resume.as_ref().map(UploadedFile::summary),
            certifications: self.certifications.iter().map(CertificationRecord::view).collect(),
            max_certifications: MAX_CERTIFICATIONS,
            last_error: self.last_error.clone(),
            notice: self.notice.clone(),
            report: self.report.clone(),
        }
    }
}
