use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::document::{JobRow, NewJob, NewResume, ResumeRow};

/// Document persistence. Every read is scoped to the owning user, so another
/// user's document looks exactly like a missing one.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_resume(&self, resume: NewResume) -> Result<ResumeRow, AppError>;
    /// Most recently updated first.
    async fn list_resumes(&self, user_id: Uuid) -> Result<Vec<ResumeRow>, AppError>;
    async fn get_resume(&self, user_id: Uuid, id: Uuid) -> Result<Option<ResumeRow>, AppError>;
    async fn latest_resume(&self, user_id: Uuid) -> Result<Option<ResumeRow>, AppError>;
    /// False when no resume with `id` belongs to `user_id`.
    async fn delete_resume(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError>;

    async fn insert_job(&self, job: NewJob) -> Result<JobRow, AppError>;
    /// Newest first.
    async fn list_jobs(&self, user_id: Uuid) -> Result<Vec<JobRow>, AppError>;
    async fn get_job(&self, user_id: Uuid, id: Uuid) -> Result<Option<JobRow>, AppError>;
    async fn latest_job(&self, user_id: Uuid) -> Result<Option<JobRow>, AppError>;
}

pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert_resume(&self, resume: NewResume) -> Result<ResumeRow, AppError> {
        let row = sqlx::query_as::<_, ResumeRow>(
            r#"
            INSERT INTO resumes
                (id, user_id, title, file_name, file_type, file_size, extracted_text, is_parsed)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(resume.user_id)
        .bind(&resume.title)
        .bind(&resume.file_name)
        .bind(&resume.file_type)
        .bind(resume.file_size)
        .bind(&resume.extracted_text)
        .bind(resume.is_parsed)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_resumes(&self, user_id: Uuid) -> Result<Vec<ResumeRow>, AppError> {
        let rows = sqlx::query_as::<_, ResumeRow>(
            "SELECT * FROM resumes WHERE user_id = $1 ORDER BY updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_resume(&self, user_id: Uuid, id: Uuid) -> Result<Option<ResumeRow>, AppError> {
        let row = sqlx::query_as::<_, ResumeRow>(
            "SELECT * FROM resumes WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn latest_resume(&self, user_id: Uuid) -> Result<Option<ResumeRow>, AppError> {
        let row = sqlx::query_as::<_, ResumeRow>(
            "SELECT * FROM resumes WHERE user_id = $1 ORDER BY updated_at DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_resume(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM resumes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_job(&self, job: NewJob) -> Result<JobRow, AppError> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            INSERT INTO job_descriptions
                (id, user_id, raw_content, title, company, location, is_processed)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(job.user_id)
        .bind(&job.raw_content)
        .bind(&job.title)
        .bind(&job.company)
        .bind(&job.location)
        .bind(job.is_processed)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_jobs(&self, user_id: Uuid) -> Result<Vec<JobRow>, AppError> {
        let rows = sqlx::query_as::<_, JobRow>(
            "SELECT * FROM job_descriptions WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_job(&self, user_id: Uuid, id: Uuid) -> Result<Option<JobRow>, AppError> {
        let row = sqlx::query_as::<_, JobRow>(
            "SELECT * FROM job_descriptions WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn latest_job(&self, user_id: Uuid) -> Result<Option<JobRow>, AppError> {
        let row = sqlx::query_as::<_, JobRow>(
            "SELECT * FROM job_descriptions WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
