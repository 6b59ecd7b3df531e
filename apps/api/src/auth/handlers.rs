//! Axum route handlers for accounts and the token lifecycle.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::auth::password::{hash_password, password_problems, verify_password};
use crate::auth::tokens::{TokenKind, TokenPair};
use crate::auth::validation::{
    check_bio, check_email, check_name, check_phone, check_username, normalize_email,
};
use crate::errors::{AppError, FieldErrors};
use crate::models::user::{NewUser, ProfileUpdate, UserProfile, UserRow};
use crate::state::AppState;

const REQUIRED: &str = "This field is required.";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub password_confirm: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    pub user: UserProfile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

#[derive(Debug, Serialize)]
pub struct ChangePasswordResponse {
    pub message: String,
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResetPasswordConfirmRequest {
    pub uid: String,
    pub token: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/users/register
pub async fn handle_register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserProfile>), AppError> {
    let email = normalize_email(&req.email);
    let username = req.username.trim().to_string();
    let phone = req
        .phone
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from);

    let mut errors = FieldErrors::new();
    if email.is_empty() {
        errors.add("email", REQUIRED);
    } else if let Some(msg) = check_email(&email) {
        errors.add("email", msg);
    } else if state.users.find_by_email(&email).await?.is_some() {
        errors.add("email", "A user with this email already exists.");
    }

    if let Some(msg) = check_username(&username) {
        errors.add("username", msg);
    } else if state.users.username_taken(&username, None).await? {
        errors.add("username", "A user with that username already exists.");
    }

    if let Some(msg) = check_name(&req.first_name) {
        errors.add("first_name", msg);
    }
    if let Some(msg) = check_name(&req.last_name) {
        errors.add("last_name", msg);
    }
    if let Some(msg) = phone.as_deref().and_then(check_phone) {
        errors.add("phone", msg);
    }

    check_new_password(
        &mut errors,
        ("password", &req.password),
        ("password_confirm", &req.password_confirm),
        &[
            username.as_str(),
            email_local_part(&email),
            req.first_name.as_str(),
            req.last_name.as_str(),
        ],
    );
    errors.into_result()?;

    let user = state
        .users
        .create(NewUser {
            email,
            username,
            password_hash: hash_password(&req.password)?,
            first_name: req.first_name.trim().to_string(),
            last_name: req.last_name.trim().to_string(),
            phone,
            is_verified: !state.config.require_email_verification,
        })
        .await?;

    tracing::info!(user_id = %user.id, "user registered");
    if !user.is_verified {
        send_verification_link(&state, &user)?;
    }

    Ok((StatusCode::CREATED, Json(UserProfile::from(&user))))
}

/// POST /api/users/login
///
/// Issues an access/refresh pair. Unknown email and wrong password are
/// indistinguishable to the caller.
pub async fn handle_login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let mut errors = FieldErrors::new();
    if req.email.trim().is_empty() {
        errors.add("email", REQUIRED);
    }
    if req.password.is_empty() {
        errors.add("password", REQUIRED);
    }
    errors.into_result()?;

    let user = state
        .users
        .find_by_email(&normalize_email(&req.email))
        .await?
        .filter(|user| verify_password(&req.password, &user.password_hash))
        .ok_or(AppError::InvalidCredentials)?;

    if !user.is_active {
        return Err(AppError::AccountDisabled);
    }
    if state.config.require_email_verification && !user.is_verified {
        return Err(AppError::EmailNotVerified);
    }

    let pair = state.tokens.issue_pair(&user)?;
    state
        .users
        .record_login(user.id, client_ip(&headers).as_deref())
        .await?;

    tracing::info!(user_id = %user.id, "user logged in");
    Ok(Json(LoginResponse {
        access: pair.access,
        refresh: pair.refresh,
        user: UserProfile::from(&user),
    }))
}

/// POST /api/token/refresh
///
/// Exchanges a valid refresh token for a new access token. With rotation
/// enabled the presented refresh token is blacklisted and a new one returned;
/// a second exchange with the same token fails.
pub async fn handle_refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, AppError> {
    if req.refresh.trim().is_empty() {
        return Err(AppError::Fields(FieldErrors::single("refresh", REQUIRED)));
    }

    let claims = state.tokens.decode(req.refresh.trim(), TokenKind::Refresh)?;
    if state.blacklist.is_revoked(claims.jti).await? {
        tracing::warn!(user_id = %claims.sub, jti = %claims.jti, "blacklisted refresh token presented");
        return Err(AppError::TokenInvalid);
    }

    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .filter(|user| user.is_active && claims.matches_password(user))
        .ok_or(AppError::TokenInvalid)?;

    let access = state.tokens.issue(&user, TokenKind::Access)?;
    let refresh = if state.config.rotate_refresh_tokens {
        if !state.blacklist.revoke(claims.jti, claims.remaining()).await? {
            tracing::warn!(user_id = %user.id, jti = %claims.jti, "refresh token reused concurrently");
            return Err(AppError::TokenInvalid);
        }
        Some(state.tokens.issue(&user, TokenKind::Refresh)?)
    } else {
        None
    };

    tracing::debug!(user_id = %user.id, rotated = refresh.is_some(), "access token refreshed");
    Ok(Json(RefreshResponse { access, refresh }))
}

/// POST /api/users/logout
///
/// Blacklists the refresh token for the rest of its lifetime. Repeating the
/// call with the same token succeeds.
pub async fn handle_logout(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<Value>, AppError> {
    if req.refresh.trim().is_empty() {
        return Err(AppError::Fields(FieldErrors::single("refresh", REQUIRED)));
    }

    let claims = state.tokens.decode(req.refresh.trim(), TokenKind::Refresh)?;
    let newly_revoked = state.blacklist.revoke(claims.jti, claims.remaining()).await?;

    tracing::info!(user_id = %claims.sub, newly_revoked, "user logged out");
    Ok(Json(json!({ "message": "Successfully logged out" })))
}

/// GET /api/users/profile
pub async fn handle_get_profile(auth: AuthUser) -> Json<UserProfile> {
    Json(UserProfile::from(&auth.user))
}

/// PATCH /api/users/profile
pub async fn handle_update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(mut update): Json<ProfileUpdate>,
) -> Result<Json<UserProfile>, AppError> {
    let mut errors = FieldErrors::new();

    if let Some(username) = update.username.as_mut() {
        *username = username.trim().to_string();
        if let Some(msg) = check_username(username) {
            errors.add("username", msg);
        } else if state.users.username_taken(username, Some(auth.user.id)).await? {
            errors.add("username", "A user with that username already exists.");
        }
    }
    if let Some(msg) = update.first_name.as_deref().and_then(check_name) {
        errors.add("first_name", msg);
    }
    if let Some(msg) = update.last_name.as_deref().and_then(check_name) {
        errors.add("last_name", msg);
    }
    if let Some(phone) = update.phone.as_mut() {
        *phone = phone.trim().to_string();
        if let Some(msg) = (!phone.is_empty()).then(|| check_phone(phone)).flatten() {
            errors.add("phone", msg);
        }
    }
    if let Some(msg) = update.bio.as_deref().and_then(check_bio) {
        errors.add("bio", msg);
    }
    if matches!(update.timezone.as_deref(), Some(tz) if tz.trim().is_empty() || tz.len() > 50) {
        errors.add("timezone", "Enter a valid timezone.");
    }
    if matches!(update.language.as_deref(), Some(lang) if lang.trim().is_empty() || lang.len() > 10) {
        errors.add("language", "Enter a valid language code.");
    }
    errors.into_result()?;

    let user = state.users.update_profile(auth.user.id, &update).await?;
    Ok(Json(UserProfile::from(&user)))
}

/// PUT /api/users/change-password
///
/// Every token issued before the change stops working; the response carries
/// a fresh pair so the caller's session continues.
pub async fn handle_change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<ChangePasswordResponse>, AppError> {
    let mut errors = FieldErrors::new();
    if req.old_password.is_empty() {
        errors.add("old_password", REQUIRED);
    } else if !verify_password(&req.old_password, &auth.user.password_hash) {
        errors.add("old_password", "Invalid old password");
    }
    check_new_password(
        &mut errors,
        ("new_password", &req.new_password),
        ("new_password_confirm", &req.new_password_confirm),
        &user_attributes(&auth.user),
    );
    errors.into_result()?;

    let user = state
        .users
        .set_password(auth.user.id, &hash_password(&req.new_password)?)
        .await?;
    let TokenPair { access, refresh } = state.tokens.issue_pair(&user)?;

    tracing::info!(user_id = %user.id, session_jti = %auth.claims.jti, "password changed");
    Ok(Json(ChangePasswordResponse {
        message: "Password changed successfully".to_string(),
        access,
        refresh,
    }))
}

/// POST /api/users/reset-password
///
/// Always answers the same way so the endpoint cannot be used to discover
/// which emails have accounts.
pub async fn handle_reset_password_request(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> Result<Json<Value>, AppError> {
    let email = normalize_email(&req.email);
    if let Some(msg) = check_email(&email) {
        return Err(AppError::Fields(FieldErrors::single("email", msg)));
    }

    if let Some(user) = state.users.find_by_email(&email).await? {
        if user.is_active {
            let token = state.tokens.issue(&user, TokenKind::PasswordReset)?;
            let link = format!(
                "{}/reset-password/{}/{}",
                state.config.frontend_url.trim_end_matches('/'),
                user.id,
                token
            );
            tracing::info!(user_id = %user.id, %link, "password reset link issued");
        }
    }

    Ok(Json(json!({
        "message": "If an account exists for this email, a password reset link has been sent."
    })))
}

/// POST /api/users/reset-password-confirm
pub async fn handle_reset_password_confirm(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordConfirmRequest>,
) -> Result<Json<Value>, AppError> {
    let user = match resolve_link_user(&state, &req.uid, &req.token, TokenKind::PasswordReset).await? {
        Some(user) => user,
        None => {
            return Err(AppError::Fields(FieldErrors::single(
                "token",
                "Invalid or expired reset link.",
            )))
        }
    };

    let mut errors = FieldErrors::new();
    check_new_password(
        &mut errors,
        ("new_password", &req.new_password),
        ("new_password_confirm", &req.new_password_confirm),
        &user_attributes(&user),
    );
    errors.into_result()?;

    state
        .users
        .set_password(user.id, &hash_password(&req.new_password)?)
        .await?;

    tracing::info!(user_id = %user.id, "password reset");
    Ok(Json(json!({ "message": "Password has been reset successfully." })))
}

/// POST /api/users/resend-verification
pub async fn handle_resend_verification(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> Result<Json<Value>, AppError> {
    let email = normalize_email(&req.email);
    if let Some(msg) = check_email(&email) {
        return Err(AppError::Fields(FieldErrors::single("email", msg)));
    }

    if let Some(user) = state.users.find_by_email(&email).await? {
        if user.is_active && !user.is_verified {
            send_verification_link(&state, &user)?;
        }
    }

    Ok(Json(json!({
        "message": "If the account exists and is unverified, a verification email has been sent."
    })))
}

/// GET /api/users/activate/:uid/:token
pub async fn handle_verify_email(
    State(state): State<AppState>,
    Path((uid, token)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let user = resolve_link_user(&state, &uid, &token, TokenKind::EmailVerification)
        .await?
        .ok_or_else(|| AppError::Validation("Invalid or expired verification link.".to_string()))?;

    if !user.is_verified {
        state.users.mark_verified(user.id).await?;
        tracing::info!(user_id = %user.id, "email verified");
    }
    Ok(Json(json!({ "message": "Email verified successfully" })))
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

/// Shared password rules: strength of the new value and confirmation match.
fn check_new_password(
    errors: &mut FieldErrors,
    (field, password): (&str, &str),
    (confirm_field, confirm): (&str, &str),
    attributes: &[&str],
) {
    if password.is_empty() {
        errors.add(field, REQUIRED);
    } else {
        for problem in password_problems(password, attributes) {
            errors.add(field, problem);
        }
    }
    if confirm.is_empty() {
        errors.add(confirm_field, REQUIRED);
    } else if password != confirm {
        errors.add(confirm_field, "Passwords do not match");
    }
}

fn user_attributes(user: &UserRow) -> [&str; 4] {
    [
        user.username.as_str(),
        email_local_part(&user.email),
        user.first_name.as_str(),
        user.last_name.as_str(),
    ]
}

fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or_default()
}

/// Resolves the user a uid/token link points at. `None` for any mismatch:
/// bad uid, bad or expired token, token for another user, or a token issued
/// before the last password change.
async fn resolve_link_user(
    state: &AppState,
    uid: &str,
    token: &str,
    kind: TokenKind,
) -> Result<Option<UserRow>, AppError> {
    let Ok(uid) = Uuid::parse_str(uid.trim()) else {
        return Ok(None);
    };
    let Ok(claims) = state.tokens.decode(token.trim(), kind) else {
        return Ok(None);
    };
    if claims.sub != uid {
        return Ok(None);
    }

    let user = state
        .users
        .find_by_id(uid)
        .await?
        .filter(|user| user.is_active && claims.matches_password(user));
    Ok(user)
}

fn send_verification_link(state: &AppState, user: &UserRow) -> Result<(), AppError> {
    let token = state.tokens.issue(user, TokenKind::EmailVerification)?;
    let link = format!(
        "{}/activate/{}/{}",
        state.config.frontend_url.trim_end_matches('/'),
        user.id,
        token
    );
    tracing::info!(user_id = %user.id, email = %user.email, %link, "verification link issued");
    Ok(())
}

/// First `X-Forwarded-For` hop, else `X-Real-IP`.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
}

