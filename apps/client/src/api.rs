//! Document and cover-letter calls. All of them go through the dispatcher,
//! so they share the refresh-once behaviour.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde_json::json;
use uuid::Uuid;

use crate::dispatch::{ApiRequest, Dispatcher, MultipartPart, PartData};
use crate::error::ClientError;
use crate::models::{CoverLetter, Job, JobInput, Resume};

#[derive(Clone)]
pub struct Workspace {
    dispatcher: Arc<Dispatcher>,
    generation_timeout: Duration,
}

impl Workspace {
    pub fn new(dispatcher: Arc<Dispatcher>, generation_timeout: Duration) -> Self {
        Self {
            dispatcher,
            generation_timeout,
        }
    }

    /// POST /api/resumes (multipart: `title`, `file`)
    pub async fn upload_resume(
        &self,
        title: &str,
        file_name: &str,
        data: impl Into<Bytes>,
    ) -> Result<Resume, ClientError> {
        let parts = vec![
            MultipartPart {
                name: "title".to_string(),
                data: PartData::Text(title.to_string()),
            },
            MultipartPart {
                name: "file".to_string(),
                data: PartData::File {
                    file_name: file_name.to_string(),
                    mime: mime_for(file_name).to_string(),
                    data: data.into(),
                },
            },
        ];
        let request = ApiRequest::post("/api/resumes").multipart(parts);
        self.dispatcher.send_json(&request).await
    }

    pub async fn list_resumes(&self) -> Result<Vec<Resume>, ClientError> {
        self.dispatcher
            .send_json(&ApiRequest::get("/api/resumes"))
            .await
    }

    /// DELETE /api/resumes/:id. Someone else's resume is rejected with a 404.
    pub async fn delete_resume(&self, id: Uuid) -> Result<(), ClientError> {
        let request = ApiRequest::delete(format!("/api/resumes/{id}"));
        let response = self.dispatcher.send(&request).await?;
        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }
        Ok(())
    }

    pub async fn create_job(&self, input: &JobInput) -> Result<Job, ClientError> {
        let request = ApiRequest::post("/api/jobs").json(input)?;
        self.dispatcher.send_json(&request).await
    }

    pub async fn list_jobs(&self) -> Result<Vec<Job>, ClientError> {
        self.dispatcher.send_json(&ApiRequest::get("/api/jobs")).await
    }

    /// Omitted ids fall back to the newest resume or job on the server.
    pub async fn generate_cover_letter(
        &self,
        resume_id: Option<Uuid>,
        job_id: Option<Uuid>,
    ) -> Result<CoverLetter, ClientError> {
        let request = ApiRequest::post("/api/analysis/generate-cover-letter")
            .json(&json!({ "resume_id": resume_id, "job_id": job_id }))?
            .timeout(self.generation_timeout);
        self.dispatcher.send_json(&request).await
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}
