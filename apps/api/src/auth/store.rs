use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::{NewUser, ProfileUpdate, UserRow};

/// User persistence. Emails are stored and looked up lowercased.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<UserRow, AppError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRow>, AppError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRow>, AppError>;
    /// True when another user (not `except`) already has this username.
    async fn username_taken(&self, username: &str, except: Option<Uuid>) -> Result<bool, AppError>;
    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> Result<UserRow, AppError>;
    async fn set_password(&self, id: Uuid, password_hash: &str) -> Result<UserRow, AppError>;
    async fn mark_verified(&self, id: Uuid) -> Result<(), AppError>;
    async fn record_login(&self, id: Uuid, ip: Option<&str>) -> Result<(), AppError>;
}

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: NewUser) -> Result<UserRow, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users
                (id, email, username, password_hash, first_name, last_name, phone, is_verified)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user.email.to_lowercase())
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(user.is_verified)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRow>, AppError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRow>, AppError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
            .bind(email.to_lowercase())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn username_taken(&self, username: &str, except: Option<Uuid>) -> Result<bool, AppError> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(username)
        .bind(except)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> Result<UserRow, AppError> {
        // An empty phone clears the column; other `None`s keep the stored value.
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users SET
                username      = COALESCE($2, username),
                first_name    = COALESCE($3, first_name),
                last_name     = COALESCE($4, last_name),
                phone         = NULLIF(COALESCE($5, phone), ''),
                bio           = COALESCE($6, bio),
                date_of_birth = COALESCE($7, date_of_birth),
                timezone      = COALESCE($8, timezone),
                language      = COALESCE($9, language),
                updated_at    = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.username)
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.phone)
        .bind(&update.bio)
        .bind(update.date_of_birth)
        .bind(&update.timezone)
        .bind(&update.language)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| AppError::NotFound(format!("User {id} not found")))
    }

    async fn set_password(&self, id: Uuid, password_hash: &str) -> Result<UserRow, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| AppError::NotFound(format!("User {id} not found")))
    }

    async fn mark_verified(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET is_verified = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_login(&self, id: Uuid, ip: Option<&str>) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET last_login = NOW(), last_login_ip = $2 WHERE id = $1")
            .bind(id)
            .bind(ip)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
