use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::documents::{DocumentKind, UploadedFile};
use crate::errors::AppError;
use crate::intake::session::SessionView;
use crate::models::candidate::CandidateRecord;
use crate::models::certification::CertificationType;
use crate::state::AppState;

/// Multipart field carrying the uploaded document.
const FILE_FIELD: &str = "file";

#[derive(Deserialize)]
pub struct OpenSessionRequest {
    pub job_id: String,
}

#[derive(Deserialize)]
pub struct CertificationRequest {
    /// A short code, its expansion, or free text. Blank means "not chosen yet".
    #[serde(default)]
    pub certification_type: Option<String>,
}

impl CertificationRequest {
    fn parsed_type(&self) -> Option<CertificationType> {
        self.certification_type
            .as_deref()
            .and_then(CertificationType::parse)
    }
}

/// POST /api/v1/intake/sessions
pub async fn handle_open_session(
    State(state): State<AppState>,
    Json(req): Json<OpenSessionRequest>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let job_id = req.job_id.trim();
    if job_id.is_empty() {
        return Err(AppError::Validation("job_id is required".to_string()));
    }
    let view = state.intake.open(job_id).await;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/v1/intake/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.intake.view(id).await?))
}

/// DELETE /api/v1/intake/sessions/:id
pub async fn handle_cancel_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.intake.cancel(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/intake/sessions/:id/resume
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<SessionView>, AppError> {
    let file = read_upload(multipart).await?;
    Ok(Json(state.intake.upload_resume(id, file).await?))
}

/// PUT /api/v1/intake/sessions/:id/candidate
pub async fn handle_update_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(candidate): Json<CandidateRecord>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.intake.update_candidate(id, candidate).await?))
}

/// POST /api/v1/intake/sessions/:id/certifications
pub async fn handle_add_certification(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CertificationRequest>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let view = state.intake.add_certification(id, req.parsed_type()).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// PATCH /api/v1/intake/sessions/:id/certifications/:cert_id
pub async fn handle_set_certification_type(
    State(state): State<AppState>,
    Path((id, cert_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<CertificationRequest>,
) -> Result<Json<SessionView>, AppError> {
    let view = state
        .intake
        .set_certification_type(id, cert_id, req.parsed_type())
        .await?;
    Ok(Json(view))
}

/// DELETE /api/v1/intake/sessions/:id/certifications/:cert_id
pub async fn handle_remove_certification(
    State(state): State<AppState>,
    Path((id, cert_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.intake.remove_certification(id, cert_id).await?))
}

/// POST /api/v1/intake/sessions/:id/certifications/:cert_id/file
pub async fn handle_attach_certificate(
    State(state): State<AppState>,
    Path((id, cert_id)): Path<(Uuid, Uuid)>,
    multipart: Multipart,
) -> Result<Json<SessionView>, AppError> {
    let file = read_upload(multipart).await?;
    let view = state
        .intake
        .attach_certification_file(id, cert_id, file)
        .await?;
    Ok(Json(view))
}

/// POST /api/v1/intake/sessions/:id/submit
pub async fn handle_submit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.intake.submit(id).await?))
}

/// Reads the `file` field and rejects media types the pipeline can't handle.
async fn read_upload(mut multipart: Multipart) -> Result<UploadedFile, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let declared = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let kind = DocumentKind::detect(&declared, &file_name).ok_or_else(|| {
            AppError::UnprocessableEntity(format!(
                "Unsupported file type '{declared}'. Upload a PDF, Word document, text file or image."
            ))
        })?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read upload: {e}")))?;

        return Ok(UploadedFile::new(file_name, kind.canonical_mime(&declared), bytes));
    }

    Err(AppError::Validation(format!(
        "Multipart field '{FILE_FIELD}' is required"
    )))
}
