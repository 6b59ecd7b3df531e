//! In-memory stand-ins for the storage seams in `AppState`, plus fixtures.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::blacklist::TokenBlacklist;
use crate::auth::password::hash_password;
use crate::auth::store::UserStore;
use crate::auth::tokens::TokenIssuer;
use crate::config::Config;
use crate::cover_letter::{CoverLetterInput, CoverLetterWriter};
use crate::documents::store::DocumentStore;
use crate::errors::AppError;
use crate::models::document::{JobRow, NewJob, NewResume, ResumeRow};
use crate::models::user::{NewUser, ProfileUpdate, UserRow};
use crate::state::AppState;

pub const TEST_PASSWORD: &str = "Tr1cky-Lantern-42";

pub fn sample_user(email: &str) -> UserRow {
    let now = Utc::now();
    UserRow {
        id: Uuid::new_v4(),
        email: email.to_string(),
        username: email.split('@').next().unwrap_or("user").to_string(),
        password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$aGFzaGhhc2g".to_string(),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        phone: None,
        bio: String::new(),
        date_of_birth: None,
        timezone: "UTC".to_string(),
        language: "en".to_string(),
        is_active: true,
        is_verified: true,
        last_login: None,
        last_login_ip: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn sample_resume(user_id: Uuid, text: &str) -> ResumeRow {
    let now = Utc::now();
    ResumeRow {
        id: Uuid::new_v4(),
        user_id,
        title: "Resume".to_string(),
        file_name: "resume.txt".to_string(),
        file_type: "txt".to_string(),
        file_size: text.len() as i64,
        extracted_text: text.to_string(),
        is_parsed: text.chars().count() >= 50,
        created_at: now,
        updated_at: now,
    }
}

pub fn sample_job(user_id: Uuid, title: &str, company: &str) -> JobRow {
    let now = Utc::now();
    JobRow {
        id: Uuid::new_v4(),
        user_id,
        raw_content: format!("{title} at {company}\nShip reliable Rust services."),
        title: title.to_string(),
        company: company.to_string(),
        location: Some("Remote".to_string()),
        is_processed: true,
        created_at: now,
        updated_at: now,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Users
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<Uuid, UserRow>>,
}

impl MemoryUserStore {
    /// Inserts a user whose password is `TEST_PASSWORD`.
    pub fn seed(&self, email: &str, verified: bool) -> UserRow {
        let mut user = sample_user(email);
        user.password_hash = hash_password(TEST_PASSWORD).unwrap();
        user.is_verified = verified;
        self.users.lock().unwrap().insert(user.id, user.clone());
        user
    }

    pub fn get(&self, id: Uuid) -> Option<UserRow> {
        self.users.lock().unwrap().get(&id).cloned()
    }

    pub fn set_active(&self, id: Uuid, active: bool) {
        if let Some(user) = self.users.lock().unwrap().get_mut(&id) {
            user.is_active = active;
        }
    }

    fn modify(&self, id: Uuid, f: impl FnOnce(&mut UserRow)) -> Result<UserRow, AppError> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))?;
        f(user);
        user.updated_at = Utc::now();
        Ok(user.clone())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, new: NewUser) -> Result<UserRow, AppError> {
        let mut user = sample_user(&new.email.to_lowercase());
        user.username = new.username;
        user.password_hash = new.password_hash;
        user.first_name = new.first_name;
        user.last_name = new.last_name;
        user.phone = new.phone;
        user.is_verified = new.is_verified;
        self.users.lock().unwrap().insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRow>, AppError> {
        Ok(self.get(id))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRow>, AppError> {
        let email = email.to_lowercase();
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn username_taken(&self, username: &str, except: Option<Uuid>) -> Result<bool, AppError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .any(|u| u.username == username && Some(u.id) != except))
    }

    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> Result<UserRow, AppError> {
        let update = update.clone();
        self.modify(id, move |user| {
            if let Some(v) = update.username {
                user.username = v;
            }
            if let Some(v) = update.first_name {
                user.first_name = v;
            }
            if let Some(v) = update.last_name {
                user.last_name = v;
            }
            if let Some(v) = update.phone {
                user.phone = Some(v).filter(|p| !p.is_empty());
            }
            if let Some(v) = update.bio {
                user.bio = v;
            }
            if let Some(v) = update.date_of_birth {
                user.date_of_birth = Some(v);
            }
            if let Some(v) = update.timezone {
                user.timezone = v;
            }
            if let Some(v) = update.language {
                user.language = v;
            }
        })
    }

    async fn set_password(&self, id: Uuid, password_hash: &str) -> Result<UserRow, AppError> {
        let hash = password_hash.to_string();
        self.modify(id, move |user| user.password_hash = hash)
    }

    async fn mark_verified(&self, id: Uuid) -> Result<(), AppError> {
        self.modify(id, |user| user.is_verified = true).map(|_| ())
    }

    async fn record_login(&self, id: Uuid, ip: Option<&str>) -> Result<(), AppError> {
        let ip = ip.map(String::from);
        self.modify(id, move |user| {
            user.last_login = Some(Utc::now());
            user.last_login_ip = ip;
        })
        .map(|_| ())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Blacklist
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryBlacklist {
    revoked: Mutex<HashMap<Uuid, Duration>>,
}

impl MemoryBlacklist {
    pub fn len(&self) -> usize {
        self.revoked.lock().unwrap().len()
    }
}

#[async_trait]
impl TokenBlacklist for MemoryBlacklist {
    async fn revoke(&self, jti: Uuid, ttl: Duration) -> Result<bool, AppError> {
        let mut revoked = self.revoked.lock().unwrap();
        if revoked.contains_key(&jti) {
            return Ok(false);
        }
        revoked.insert(jti, ttl);
        Ok(true)
    }

    async fn is_revoked(&self, jti: Uuid) -> Result<bool, AppError> {
        Ok(self.revoked.lock().unwrap().contains_key(&jti))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Documents
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryDocumentStore {
    resumes: Mutex<Vec<ResumeRow>>,
    jobs: Mutex<Vec<JobRow>>,
}

impl MemoryDocumentStore {
    pub fn add_resume(&self, resume: ResumeRow) {
        self.resumes.lock().unwrap().push(resume);
    }

    pub fn add_job(&self, job: JobRow) {
        self.jobs.lock().unwrap().push(job);
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert_resume(&self, new: NewResume) -> Result<ResumeRow, AppError> {
        let now = Utc::now();
        let row = ResumeRow {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            title: new.title,
            file_name: new.file_name,
            file_type: new.file_type,
            file_size: new.file_size,
            extracted_text: new.extracted_text,
            is_parsed: new.is_parsed,
            created_at: now,
            updated_at: now,
        };
        self.add_resume(row.clone());
        Ok(row)
    }

    async fn list_resumes(&self, user_id: Uuid) -> Result<Vec<ResumeRow>, AppError> {
        let mut rows: Vec<_> = self
            .resumes
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        rows.reverse();
        Ok(rows)
    }

    async fn get_resume(&self, user_id: Uuid, id: Uuid) -> Result<Option<ResumeRow>, AppError> {
        Ok(self
            .resumes
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id && r.user_id == user_id)
            .cloned())
    }

    async fn latest_resume(&self, user_id: Uuid) -> Result<Option<ResumeRow>, AppError> {
        Ok(self.list_resumes(user_id).await?.into_iter().next())
    }

    async fn delete_resume(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let mut resumes = self.resumes.lock().unwrap();
        let before = resumes.len();
        resumes.retain(|r| !(r.id == id && r.user_id == user_id));
        Ok(resumes.len() < before)
    }

    async fn insert_job(&self, new: NewJob) -> Result<JobRow, AppError> {
        let now = Utc::now();
        let row = JobRow {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            raw_content: new.raw_content,
            title: new.title,
            company: new.company,
            location: new.location,
            is_processed: new.is_processed,
            created_at: now,
            updated_at: now,
        };
        self.add_job(row.clone());
        Ok(row)
    }

    async fn list_jobs(&self, user_id: Uuid) -> Result<Vec<JobRow>, AppError> {
        let mut rows: Vec<_> = self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|j| j.user_id == user_id)
            .cloned()
            .collect();
        rows.reverse();
        Ok(rows)
    }

    async fn get_job(&self, user_id: Uuid, id: Uuid) -> Result<Option<JobRow>, AppError> {
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .find(|j| j.id == id && j.user_id == user_id)
            .cloned())
    }

    async fn latest_job(&self, user_id: Uuid) -> Result<Option<JobRow>, AppError> {
        Ok(self.list_jobs(user_id).await?.into_iter().next())
    }
}

/// Writer that echoes what it was given instead of calling the LLM.
pub struct StubWriter;

#[async_trait]
impl CoverLetterWriter for StubWriter {
    async fn write(&self, input: CoverLetterInput<'_>) -> Result<String, AppError> {
        Ok(format!(
            "Dear {} team,\nI would like to join as {}.\n{}",
            input.job.company, input.job.title, input.candidate_name
        ))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// State
// ────────────────────────────────────────────────────────────────────────────

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        redis_url: "redis://unused".to_string(),
        jwt_secret: "test-secret".to_string(),
        anthropic_api_key: "unused".to_string(),
        port: 0,
        rust_log: "debug".to_string(),
        access_token_ttl_minutes: 60,
        refresh_token_ttl_days: 7,
        rotate_refresh_tokens: true,
        frontend_url: "http://localhost:5173".to_string(),
        require_email_verification: true,
    }
}

/// Handles on the in-memory stores behind a test `AppState`.
pub struct TestBackends {
    pub users: Arc<MemoryUserStore>,
    pub blacklist: Arc<MemoryBlacklist>,
    pub documents: Arc<MemoryDocumentStore>,
}

pub fn test_state(config: Config) -> (AppState, TestBackends) {
    let backends = TestBackends {
        users: Arc::new(MemoryUserStore::default()),
        blacklist: Arc::new(MemoryBlacklist::default()),
        documents: Arc::new(MemoryDocumentStore::default()),
    };
    let tokens = TokenIssuer::new(
        &config.jwt_secret,
        Duration::minutes(config.access_token_ttl_minutes),
        Duration::days(config.refresh_token_ttl_days),
    );
    let state = AppState {
        config,
        tokens,
        users: backends.users.clone(),
        blacklist: backends.blacklist.clone(),
        documents: backends.documents.clone(),
        writer: Arc::new(StubWriter),
    };
    (state, backends)
}
