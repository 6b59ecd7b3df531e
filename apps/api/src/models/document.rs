use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
    #[serde(skip_serializing)]
    pub extracted_text: String,
    pub is_parsed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub raw_content: String,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub is_processed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A resume ready to insert; `extracted_text` is already normalized.
#[derive(Debug, Clone)]
pub struct NewResume {
    pub user_id: Uuid,
    pub title: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub extracted_text: String,
    pub is_parsed: bool,
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub user_id: Uuid,
    pub raw_content: String,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub is_processed: bool,
}
