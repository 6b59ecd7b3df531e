use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::cover_letter::CoverLetterInput;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GenerateCoverLetterRequest {
    pub resume_id: Option<Uuid>,
    pub job_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct GenerateCoverLetterResponse {
    pub cover_letter: String,
    pub resume_id: Uuid,
    pub job_id: Uuid,
}

/// POST /api/analysis/generate-cover-letter
///
/// Missing ids fall back to the caller's most recent resume and job.
pub async fn handle_generate_cover_letter(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<GenerateCoverLetterRequest>,
) -> Result<Json<GenerateCoverLetterResponse>, AppError> {
    let user_id = auth.user.id;

    let resume = match req.resume_id {
        Some(id) => state.documents.get_resume(user_id, id).await?,
        None => state.documents.latest_resume(user_id).await?,
    }
    .ok_or_else(|| AppError::NotFound("No resume found. Upload a resume first.".to_string()))?;

    let job = match req.job_id {
        Some(id) => state.documents.get_job(user_id, id).await?,
        None => state.documents.latest_job(user_id).await?,
    }
    .ok_or_else(|| {
        AppError::NotFound("No job description found. Add a job description first.".to_string())
    })?;

    if !resume.is_parsed {
        return Err(AppError::UnprocessableEntity(
            "The resume has no readable text to write from.".to_string(),
        ));
    }

    let candidate_name = auth.user.full_name();
    let cover_letter = state
        .writer
        .write(CoverLetterInput {
            candidate_name: &candidate_name,
            resume: &resume,
            job: &job,
        })
        .await?;

    tracing::info!(%user_id, resume_id = %resume.id, job_id = %job.id, "cover letter generated");
    Ok(Json(GenerateCoverLetterResponse {
        cover_letter,
        resume_id: resume.id,
        job_id: job.id,
    }))
}
