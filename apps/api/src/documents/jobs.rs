//! Job descriptions: stored as raw text, with title, company and location
//! pulled out when they can be recognised.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::errors::{AppError, FieldErrors};
use crate::models::document::{JobRow, NewJob};
use crate::state::AppState;

pub const MAX_JOB_CHARS: usize = 50_000;
const MAX_HEADER_CHARS: usize = 200;

/// Either `raw_content`, or the structured fields with a `description`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateJobRequest {
    pub raw_content: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct JobHeader {
    pub title: String,
    pub company: String,
    pub location: Option<String>,
}

/// Recognises `Title:`/`Company:`/`Location:` lines anywhere in the text and
/// otherwise reads the first line as either "Title at Company" or the title.
pub fn extract_header(raw: &str) -> JobHeader {
    let mut header = JobHeader::default();

    for line in raw.lines().map(str::trim) {
        if let Some(value) = labelled(line, &["title", "position", "role", "job title"]) {
            if header.title.is_empty() {
                header.title = value;
            }
        } else if let Some(value) = labelled(line, &["company", "employer", "organization"]) {
            if header.company.is_empty() {
                header.company = value;
            }
        } else if let Some(value) = labelled(line, &["location"]) {
            header.location.get_or_insert(value);
        }
    }

    if header.title.is_empty() {
        if let Some(first) = raw.lines().map(str::trim).find(|l| !l.is_empty()) {
            match split_at_company(first) {
                Some((title, company)) => {
                    header.title = title;
                    if header.company.is_empty() {
                        header.company = company;
                    }
                }
                None if labelled(first, &["company", "employer", "organization", "location"]).is_none() => {
                    header.title = clip(first);
                }
                None => {}
            }
        }
    }

    header
}

fn labelled(line: &str, labels: &[&str]) -> Option<String> {
    let (label, value) = line.split_once(':')?;
    let label = label.trim().to_ascii_lowercase();
    let value = value.trim();
    (labels.contains(&label.as_str()) && !value.is_empty()).then(|| clip(value))
}

fn split_at_company(line: &str) -> Option<(String, String)> {
    let (title, company) = line.split_once(" at ")?;
    let (title, company) = (title.trim(), company.trim());
    (!title.is_empty() && !company.is_empty()).then(|| (clip(title), clip(company)))
}

fn clip(value: &str) -> String {
    value.chars().take(MAX_HEADER_CHARS).collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// POST /api/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<JobRow>), AppError> {
    let location = non_empty(req.location);
    let new_job = match (non_empty(req.raw_content), non_empty(req.description)) {
        (Some(raw), _) => {
            let header = extract_header(&raw);
            NewJob {
                user_id: auth.user.id,
                raw_content: raw,
                title: non_empty(req.title).unwrap_or(header.title),
                company: non_empty(req.company).unwrap_or(header.company),
                location: location.or(header.location),
                is_processed: false,
            }
        }
        (None, Some(description)) => {
            let title = non_empty(req.title).ok_or_else(|| {
                AppError::Fields(FieldErrors::single("title", "This field is required."))
            })?;
            let company = non_empty(req.company).unwrap_or_default();
            let raw_content = [Some(title.as_str()), Some(company.as_str()), location.as_deref()]
                .into_iter()
                .flatten()
                .filter(|part| !part.is_empty())
                .chain(std::iter::once(description.as_str()))
                .collect::<Vec<_>>()
                .join("\n");
            NewJob {
                user_id: auth.user.id,
                raw_content,
                title: clip(&title),
                company: clip(&company),
                location,
                is_processed: false,
            }
        }
        (None, None) => {
            return Err(AppError::Fields(FieldErrors::single(
                "raw_content",
                "Provide either raw_content or a description.",
            )))
        }
    };

    if new_job.raw_content.chars().count() > MAX_JOB_CHARS {
        return Err(AppError::Fields(FieldErrors::single(
            "raw_content",
            format!("Ensure this field has no more than {MAX_JOB_CHARS} characters."),
        )));
    }

    let new_job = NewJob {
        is_processed: !new_job.title.is_empty(),
        ..new_job
    };
    let job = state.documents.insert_job(new_job).await?;

    tracing::info!(user_id = %auth.user.id, job_id = %job.id, is_processed = job.is_processed, "job description saved");
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<JobRow>>, AppError> {
    Ok(Json(state.documents.list_jobs(auth.user.id).await?))
}

/// GET /api/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<JobRow>, AppError> {
    state
        .documents
        .get_job(auth.user.id, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Job description {id} not found")))
}
