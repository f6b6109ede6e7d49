use async_trait::async_trait;
use reqwest::{multipart, Client, Response};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::backend::{
    ApplicationBackend, ApplicationSubmission, BackendError, CertificationSubmission,
    GENERIC_SUBMISSION_FAILURE,
};
use crate::documents::UploadedFile;
use crate::models::job::{JobRecord, JobSearchQuery};

const APPLY_PATH: &str = "/api/jobs/apply";
const CERTIFICATIONS_PATH: &str = "/api/jobs/certifications";
const JOB_SEARCH_PATH: &str = "/api/jobs/search";
const STATES_PATH: &str = "/api/lookups/states";
const SKILLS_PATH: &str = "/api/lookups/skills";

/// `{ "success": bool, "message": string }`, both optional in practice.
#[derive(Debug, Default, Deserialize)]
struct BackendReply {
    success: Option<bool>,
    message: Option<String>,
}

/// reqwest client for the staffing backend. No timeout beyond transport defaults.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET /api/jobs/search. Anything other than a JSON array means "no results".
    pub async fn search_jobs(&self, query: &JobSearchQuery) -> Result<Vec<JobRecord>, BackendError> {
        let response = self.client.get(self.url(JOB_SEARCH_PATH)).query(query).send().await?;
        let body = json_body(response).await?;

        match body {
            Value::Array(_) => {
                serde_json::from_value(body).map_err(|e| BackendError::Decode(e.to_string()))
            }
            _ => Ok(Vec::new()),
        }
    }

    /// GET /api/lookups/states?country=
    pub async fn states_by_country(&self, country: &str) -> Result<Vec<String>, BackendError> {
        let response = self
            .client
            .get(self.url(STATES_PATH))
            .query(&[("country", country)])
            .send()
            .await?;
        Ok(flat_list(json_body(response).await?))
    }

    /// GET /api/lookups/skills
    pub async fn skills(&self) -> Result<Vec<String>, BackendError> {
        let response = self.client.get(self.url(SKILLS_PATH)).send().await?;
        Ok(flat_list(json_body(response).await?))
    }
}

#[async_trait]
impl ApplicationBackend for BackendClient {
    async fn submit_application(&self, submission: &ApplicationSubmission) -> Result<String, BackendError> {
        let form = application_form(submission)?;
        debug!(
            "Posting application for job {} ({} byte resume)",
            submission.job_id,
            submission.resume.bytes.len()
        );

        let response = self.client.post(self.url(APPLY_PATH)).multipart(form).send().await?;
        let message = accepted_message(response).await?;
        info!("Application for job {} accepted", submission.job_id);
        Ok(message)
    }

    async fn submit_certification(&self, submission: &CertificationSubmission) -> Result<(), BackendError> {
        let form = multipart::Form::new()
            .text("EmailID", submission.email.clone())
            .text("JobID", submission.job_id.clone())
            .text("CertificateName", submission.certificate_name.clone())
            .part("CertificateFile", file_part(&submission.file)?);

        let response = self
            .client
            .post(self.url(CERTIFICATIONS_PATH))
            .multipart(form)
            .send()
            .await?;
        accepted_message(response).await?;
        Ok(())
    }
}

/// Flattens the candidate record into the backend's form field names.
fn application_form(submission: &ApplicationSubmission) -> Result<multipart::Form, BackendError> {
    let candidate = &submission.candidate;
    let fields = [
        ("FirstName", candidate.name.first.clone()),
        ("MiddleName", candidate.name.middle.clone()),
        ("LastName", candidate.name.last.clone()),
        ("EmailID", candidate.email.clone()),
        ("MobileNo", candidate.phone.clone()),
        ("AlternatePhone", candidate.secondary_phone.clone()),
        ("Street", candidate.address.street.clone()),
        ("City", candidate.address.city.clone()),
        ("State", candidate.address.state.clone()),
        ("ZipCode", candidate.address.zip.clone()),
        ("Country", candidate.address.country.clone()),
        ("Gender", candidate.gender.clone()),
        ("Skills", candidate.skills.join(",")),
        ("EmploymentType", candidate.employment_basis.clone()),
        ("WorkAuthorization", candidate.work_authorization.to_string()),
        ("Experience", candidate.years_of_experience.to_string()),
        ("WorkStatus", candidate.work_status.clone()),
        ("ResumeCategory", candidate.resume_category.clone()),
        ("Message", candidate.cover_letter.clone()),
        ("JobID", submission.job_id.clone()),
    ];

    let form = fields
        .into_iter()
        .fold(multipart::Form::new(), |form, (name, value)| form.text(name, value));
    Ok(form.part("Resume", file_part(&submission.resume)?))
}

fn file_part(file: &UploadedFile) -> Result<multipart::Part, BackendError> {
    multipart::Part::bytes(file.bytes.to_vec())
        .file_name(file.file_name.clone())
        .mime_str(&file.mime_type)
        .map_err(|e| BackendError::InvalidFile(format!("{}: {e}", file.file_name)))
}

/// Non-2xx, or a reply with `success: false`, is a rejection carrying the
/// backend's message when there is one.
async fn accepted_message(response: Response) -> Result<String, BackendError> {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let reply: BackendReply = serde_json::from_str(&body).unwrap_or_default();
    let message = reply.message.filter(|m| !m.trim().is_empty());

    if !status.is_success() || reply.success == Some(false) {
        return Err(BackendError::Rejected {
            status: Some(status.as_u16()),
            message: message.unwrap_or_else(|| GENERIC_SUBMISSION_FAILURE.to_string()),
        });
    }

    Ok(message.unwrap_or_default())
}

async fn json_body(response: Response) -> Result<Value, BackendError> {
    let status = response.status();
    if !status.is_success() {
        return Err(BackendError::Rejected {
            status: Some(status.as_u16()),
            message: format!("lookup failed with {status}"),
        });
    }
    let text = response.text().await?;
    Ok(serde_json::from_str(&text).unwrap_or(Value::Null))
}

/// Accepts `["a", "b"]` or `[{"name": "a"}, ...]`; anything else is empty.
fn flat_list(body: Value) -> Vec<String> {
    let Value::Array(items) = body else {
        return Vec::new();
    };
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s),
            Value::Object(mut map) => match map.remove("name") {
                Some(Value::String(s)) => Some(s),
                _ => None,
            },
            _ => None,
        })
        .collect()
}
