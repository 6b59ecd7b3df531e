//! Resume upload, retrieval and deletion.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::errors::{AppError, FieldErrors};
use crate::models::document::{NewResume, ResumeRow};
use crate::state::AppState;

pub const MAX_RESUME_BYTES: usize = 10 * 1024 * 1024;
/// Below this many characters of extracted text a resume counts as unparsed.
pub const MIN_PARSED_CHARS: usize = 50;
pub const MAX_EXTRACTED_CHARS: usize = 50_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeFileType {
    Pdf,
    Text,
}

impl ResumeFileType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResumeFileType::Pdf => "pdf",
            ResumeFileType::Text => "txt",
        }
    }
}

/// Decides the file type from the content itself, then the declared content
/// type, then the extension. `None` for anything other than PDF or text.
pub fn detect_file_type(
    file_name: &str,
    content_type: Option<&str>,
    data: &[u8],
) -> Option<ResumeFileType> {
    if data.starts_with(b"%PDF") {
        return Some(ResumeFileType::Pdf);
    }

    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    let content_type = content_type.unwrap_or_default();

    if content_type == "application/pdf" || extension == "pdf" {
        // Declared as PDF but without the magic bytes.
        return None;
    }
    let textual = content_type.starts_with("text/plain") || matches!(extension.as_str(), "txt" | "text");
    (textual && std::str::from_utf8(data).is_ok()).then_some(ResumeFileType::Text)
}

/// Trims every line, drops blank ones and caps the result at
/// `MAX_EXTRACTED_CHARS` characters.
pub fn normalize_text(raw: &str) -> String {
    let joined = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    match joined.char_indices().nth(MAX_EXTRACTED_CHARS) {
        Some((cut, _)) => joined[..cut].to_string(),
        None => joined,
    }
}

async fn extract_text(file_type: ResumeFileType, data: Bytes) -> String {
    match file_type {
        ResumeFileType::Text => String::from_utf8_lossy(&data).into_owned(),
        ResumeFileType::Pdf => {
            let extracted =
                tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&data)).await;
            match extracted {
                Ok(Ok(text)) => text,
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "PDF text extraction failed");
                    String::new()
                }
                Err(e) => {
                    tracing::error!(error = %e, "PDF extraction task panicked");
                    String::new()
                }
            }
        }
    }
}

struct Upload {
    file_name: String,
    content_type: Option<String>,
    data: Bytes,
}

/// POST /api/resumes (multipart: `file`, optional `title`)
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ResumeRow>), AppError> {
    let mut upload: Option<Upload> = None;
    let mut title: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("resume").to_string();
                let content_type = field.content_type().map(String::from);
                let data = field.bytes().await.map_err(|e| {
                    AppError::Fields(FieldErrors::single("file", format!("Upload failed: {e}")))
                })?;
                upload = Some(Upload { file_name, content_type, data });
            }
            Some("title") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Malformed title field: {e}")))?;
                title = Some(text.trim().to_string()).filter(|t| !t.is_empty());
            }
            _ => {}
        }
    }

    let upload = upload.ok_or_else(|| {
        AppError::Fields(FieldErrors::single("file", "No file was submitted."))
    })?;
    if upload.data.is_empty() {
        return Err(AppError::Fields(FieldErrors::single("file", "The submitted file is empty.")));
    }
    if upload.data.len() > MAX_RESUME_BYTES {
        return Err(AppError::Fields(FieldErrors::single(
            "file",
            "File size cannot exceed 10MB.",
        )));
    }
    let file_type = detect_file_type(&upload.file_name, upload.content_type.as_deref(), &upload.data)
        .ok_or_else(|| {
            AppError::Fields(FieldErrors::single(
                "file",
                "Unsupported file type. Upload a PDF or plain text file.",
            ))
        })?;

    let file_size = upload.data.len() as i64;
    let text = normalize_text(&extract_text(file_type, upload.data).await);
    let is_parsed = text.chars().count() >= MIN_PARSED_CHARS;
    let title = title.unwrap_or_else(|| {
        upload
            .file_name
            .rsplit_once('.')
            .map(|(stem, _)| stem.to_string())
            .unwrap_or_else(|| upload.file_name.clone())
    });

    let resume = state
        .documents
        .insert_resume(NewResume {
            user_id: auth.user.id,
            title,
            file_name: upload.file_name,
            file_type: file_type.as_str().to_string(),
            file_size,
            extracted_text: text,
            is_parsed,
        })
        .await?;

    tracing::info!(
        user_id = %auth.user.id,
        resume_id = %resume.id,
        file_type = file_type.as_str(),
        is_parsed,
        "resume uploaded"
    );
    Ok((StatusCode::CREATED, Json(resume)))
}

/// GET /api/resumes
pub async fn handle_list_resumes(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<ResumeRow>>, AppError> {
    Ok(Json(state.documents.list_resumes(auth.user.id).await?))
}

/// GET /api/resumes/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ResumeRow>, AppError> {
    state
        .documents
        .get_resume(auth.user.id, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))
}

/// DELETE /api/resumes/:id
pub async fn handle_delete_resume(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.documents.delete_resume(auth.user.id, id).await? {
        return Err(AppError::NotFound(format!("Resume {id} not found")));
    }
    tracing::info!(user_id = %auth.user.id, resume_id = %id, "resume deleted");
    Ok(StatusCode::NO_CONTENT)
}
