use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use serde_json::{json, Value};

use super::build_router;
use crate::auth::tokens::TokenKind;
use crate::config::Config;
use crate::state::AppState;
use crate::test_support::{
    sample_job, sample_resume, test_config, test_state, TestBackends, TEST_PASSWORD,
};

fn server_with(config: Config) -> (TestServer, AppState, TestBackends) {
    let (state, backends) = test_state(config);
    let server = TestServer::new(build_router(state.clone())).unwrap();
    (server, state, backends)
}

fn server() -> (TestServer, AppState, TestBackends) {
    server_with(test_config())
}

fn bearer(token: &str) -> (HeaderName, HeaderValue) {
    (
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
    )
}

async fn login(server: &TestServer, email: &str, password: &str) -> Value {
    let response = server
        .post("/api/users/login")
        .json(&json!({ "email": email, "password": password }))
        .await;
    response.assert_status_ok();
    response.json::<Value>()
}

fn token(body: &Value, key: &str) -> String {
    body[key].as_str().unwrap().to_string()
}

// ────────────────────────────────────────────────────────────────────────────
// Health & login
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health() {
    let (server, _, _) = server();
    let body = server.get("/health").await.json::<Value>();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "easeapply-api");
}

#[tokio::test]
async fn test_login_returns_pair_and_profile() {
    let (server, _, backends) = server();
    let user = backends.users.seed("ada@example.com", true);

    let response = server
        .post("/api/users/login")
        .add_header(
            HeaderName::from_static("x-forwarded-for"),
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        )
        .json(&json!({ "email": "ADA@example.com ", "password": TEST_PASSWORD }))
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();

    assert!(body["access"].as_str().is_some());
    assert!(body["refresh"].as_str().is_some());
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert_eq!(body["user"]["profile"]["timezone"], "UTC");
    assert!(body["user"].get("password_hash").is_none());

    let stored = backends.users.get(user.id).unwrap();
    assert!(stored.last_login.is_some());
    assert_eq!(stored.last_login_ip.as_deref(), Some("203.0.113.7"));
}

#[tokio::test]
async fn test_login_failures_do_not_reveal_which_part_was_wrong() {
    let (server, _, backends) = server();
    backends.users.seed("ada@example.com", true);

    for (email, password) in [("ada@example.com", "wrong-password"), ("nobody@example.com", TEST_PASSWORD)] {
        let response = server
            .post("/api/users/login")
            .json(&json!({ "email": email, "password": password }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.json::<Value>()["error"]["code"], "INVALID_CREDENTIALS");
    }
}

#[tokio::test]
async fn test_login_requires_both_fields() {
    let (server, _, _) = server();
    let response = server.post("/api/users/login").json(&json!({})).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["error"]["fields"]["email"][0], "This field is required.");
    assert_eq!(body["error"]["fields"]["password"][0], "This field is required.");
}

#[tokio::test]
async fn test_login_refused_for_unverified_and_disabled_accounts() {
    let (server, _, backends) = server();
    backends.users.seed("new@example.com", false);
    let disabled = backends.users.seed("gone@example.com", true);
    backends.users.set_active(disabled.id, false);

    let response = server
        .post("/api/users/login")
        .json(&json!({ "email": "new@example.com", "password": TEST_PASSWORD }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(response.json::<Value>()["error"]["code"], "EMAIL_NOT_VERIFIED");

    let response = server
        .post("/api/users/login")
        .json(&json!({ "email": "gone@example.com", "password": TEST_PASSWORD }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(response.json::<Value>()["error"]["code"], "ACCOUNT_DISABLED");
}

#[tokio::test]
async fn test_unverified_login_allowed_when_verification_not_required() {
    let config = Config {
        require_email_verification: false,
        ..test_config()
    };
    let (server, _, backends) = server_with(config);
    backends.users.seed("new@example.com", false);
    login(&server, "new@example.com", TEST_PASSWORD).await;
}

// ────────────────────────────────────────────────────────────────────────────
// Refresh & logout
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_refresh_rotates_and_old_token_is_single_use() {
    let (server, _, backends) = server();
    backends.users.seed("ada@example.com", true);
    let pair = login(&server, "ada@example.com", TEST_PASSWORD).await;
    let old_refresh = token(&pair, "refresh");

    let response = server
        .post("/api/token/refresh")
        .json(&json!({ "refresh": old_refresh }))
        .await;
    response.assert_status_ok();
    let rotated = response.json::<Value>();
    let new_refresh = token(&rotated, "refresh");
    assert_ne!(new_refresh, old_refresh);

    // The new access token works.
    let (name, value) = bearer(&token(&rotated, "access"));
    server
        .get("/api/users/profile")
        .add_header(name, value)
        .await
        .assert_status_ok();

    // The old refresh token was blacklisted by the rotation.
    let response = server
        .post("/api/token/refresh")
        .json(&json!({ "refresh": old_refresh }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["error"]["code"], "TOKEN_INVALID");

    server
        .post("/api/token/refresh")
        .json(&json!({ "refresh": new_refresh }))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_refresh_without_rotation_keeps_refresh_token() {
    let config = Config {
        rotate_refresh_tokens: false,
        ..test_config()
    };
    let (server, _, backends) = server_with(config);
    backends.users.seed("ada@example.com", true);
    let pair = login(&server, "ada@example.com", TEST_PASSWORD).await;

    for _ in 0..2 {
        let response = server
            .post("/api/token/refresh")
            .json(&json!({ "refresh": token(&pair, "refresh") }))
            .await;
        response.assert_status_ok();
        let body = response.json::<Value>();
        assert!(body["access"].is_string());
        assert!(body.get("refresh").is_none());
    }
    assert_eq!(backends.blacklist.len(), 0);
}

#[tokio::test]
async fn test_refresh_rejects_access_tokens_and_garbage() {
    let (server, _, backends) = server();
    backends.users.seed("ada@example.com", true);
    let pair = login(&server, "ada@example.com", TEST_PASSWORD).await;

    for candidate in [token(&pair, "access"), "not.a.jwt".to_string()] {
        let response = server
            .post("/api/token/refresh")
            .json(&json!({ "refresh": candidate }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.json::<Value>()["error"]["code"], "TOKEN_INVALID");
    }

    server
        .post("/api/token/refresh")
        .json(&json!({}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_refresh_rejected_once_user_is_disabled() {
    let (server, _, backends) = server();
    let user = backends.users.seed("ada@example.com", true);
    let pair = login(&server, "ada@example.com", TEST_PASSWORD).await;
    backends.users.set_active(user.id, false);

    server
        .post("/api/token/refresh")
        .json(&json!({ "refresh": token(&pair, "refresh") }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_blacklists_refresh_token_and_is_idempotent() {
    let (server, _, backends) = server();
    backends.users.seed("ada@example.com", true);
    let pair = login(&server, "ada@example.com", TEST_PASSWORD).await;
    let refresh = token(&pair, "refresh");

    for _ in 0..2 {
        let response = server
            .post("/api/users/logout")
            .json(&json!({ "refresh": refresh }))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["message"], "Successfully logged out");
    }
    assert_eq!(backends.blacklist.len(), 1);

    server
        .post("/api/token/refresh")
        .json(&json!({ "refresh": refresh }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    server
        .post("/api/users/logout")
        .json(&json!({ "refresh": "garbage" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

// ────────────────────────────────────────────────────────────────────────────
// Profile & password
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_profile_requires_valid_bearer() {
    let (server, _, backends) = server();
    backends.users.seed("ada@example.com", true);

    let response = server.get("/api/users/profile").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["error"]["code"], "UNAUTHORIZED");

    let pair = login(&server, "ada@example.com", TEST_PASSWORD).await;
    // A refresh token is not an access token.
    let (name, value) = bearer(&token(&pair, "refresh"));
    server
        .get("/api/users/profile")
        .add_header(name, value)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let (name, value) = bearer(&token(&pair, "access"));
    let response = server.get("/api/users/profile").add_header(name, value).await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["username"], "ada");
}

#[tokio::test]
async fn test_profile_update_validates_and_applies() {
    let (server, _, backends) = server();
    backends.users.seed("ada@example.com", true);
    backends.users.seed("grace@example.com", true);
    let pair = login(&server, "ada@example.com", TEST_PASSWORD).await;
    let access = token(&pair, "access");

    let (name, value) = bearer(&access);
    let response = server
        .patch("/api/users/profile")
        .add_header(name, value)
        .json(&json!({ "bio": "x".repeat(501), "username": "grace", "phone": "12-34" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let fields = &response.json::<Value>()["error"]["fields"];
    assert!(fields["bio"].is_array());
    assert!(fields["username"].is_array());
    assert!(fields["phone"].is_array());

    let (name, value) = bearer(&access);
    let response = server
        .patch("/api/users/profile")
        .add_header(name, value)
        .json(&json!({ "timezone": "Europe/London", "bio": "Analyst.", "date_of_birth": "1815-12-10" }))
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["profile"]["timezone"], "Europe/London");
    assert_eq!(body["bio"], "Analyst.");
    assert_eq!(body["date_of_birth"], "1815-12-10");
    assert_eq!(body["first_name"], "Ada");
}

#[tokio::test]
async fn test_change_password_invalidates_old_tokens_and_returns_new_pair() {
    let (server, _, backends) = server();
    backends.users.seed("ada@example.com", true);
    let old = login(&server, "ada@example.com", TEST_PASSWORD).await;

    let (name, value) = bearer(&token(&old, "access"));
    let response = server
        .put("/api/users/change-password")
        .add_header(name, value)
        .json(&json!({
            "old_password": TEST_PASSWORD,
            "new_password": "Quiet-Harbor-77",
            "new_password_confirm": "Quiet-Harbor-77"
        }))
        .await;
    response.assert_status_ok();
    let fresh = response.json::<Value>();

    let (name, value) = bearer(&token(&old, "access"));
    server
        .get("/api/users/profile")
        .add_header(name, value)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    server
        .post("/api/token/refresh")
        .json(&json!({ "refresh": token(&old, "refresh") }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let (name, value) = bearer(&token(&fresh, "access"));
    server
        .get("/api/users/profile")
        .add_header(name, value)
        .await
        .assert_status_ok();
    login(&server, "ada@example.com", "Quiet-Harbor-77").await;
}

#[tokio::test]
async fn test_change_password_field_errors() {
    let (server, _, backends) = server();
    backends.users.seed("ada@example.com", true);
    let pair = login(&server, "ada@example.com", TEST_PASSWORD).await;

    let (name, value) = bearer(&token(&pair, "access"));
    let response = server
        .put("/api/users/change-password")
        .add_header(name, value)
        .json(&json!({
            "old_password": "not-it",
            "new_password": "1234567",
            "new_password_confirm": "7654321"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let fields = &response.json::<Value>()["error"]["fields"];
    assert_eq!(fields["old_password"][0], "Invalid old password");
    assert!(fields["new_password"].as_array().unwrap().len() >= 2);
    assert_eq!(fields["new_password_confirm"][0], "Passwords do not match");
}

// ────────────────────────────────────────────────────────────────────────────
// Registration, verification, reset
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_register_creates_unverified_user() {
    let (server, _, _) = server();
    let response = server
        .post("/api/users/register")
        .json(&json!({
            "email": "Grace@Example.com",
            "username": "grace",
            "password": "Quiet-Harbor-77",
            "password_confirm": "Quiet-Harbor-77",
            "first_name": "Grace",
            "last_name": "Hopper",
            "phone": "+14155552671"
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body = response.json::<Value>();
    assert_eq!(body["email"], "grace@example.com");
    assert_eq!(body["is_verified"], false);

    // Unverified accounts cannot log in yet.
    server
        .post("/api/users/login")
        .json(&json!({ "email": "grace@example.com", "password": "Quiet-Harbor-77" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_register_reports_every_field_problem() {
    let (server, _, backends) = server();
    backends.users.seed("ada@example.com", true);

    let response = server
        .post("/api/users/register")
        .json(&json!({
            "email": "ada@example.com",
            "username": "bad name",
            "password": "Quiet-Harbor-77",
            "password_confirm": "Quiet-Harbor-78",
            "phone": "123"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    let fields = &body["error"]["fields"];
    assert_eq!(fields["email"][0], "A user with this email already exists.");
    assert!(fields["username"].is_array());
    assert!(fields["phone"].is_array());
    assert_eq!(fields["password_confirm"][0], "Passwords do not match");
}

#[tokio::test]
async fn test_email_verification_link_activates_account() {
    let (server, state, backends) = server();
    let user = backends.users.seed("new@example.com", false);
    let token = state.tokens.issue(&user, TokenKind::EmailVerification).unwrap();

    server
        .get(&format!("/api/users/activate/{}/{}", user.id, token))
        .await
        .assert_status_ok();
    assert!(backends.users.get(user.id).unwrap().is_verified);
    login(&server, "new@example.com", TEST_PASSWORD).await;

    // A token of another kind is not a verification token.
    let reset = state.tokens.issue(&user, TokenKind::PasswordReset).unwrap();
    server
        .get(&format!("/api/users/activate/{}/{}", user.id, reset))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reset_password_request_never_reveals_accounts() {
    let (server, _, backends) = server();
    backends.users.seed("ada@example.com", true);

    let known = server
        .post("/api/users/reset-password")
        .json(&json!({ "email": "ada@example.com" }))
        .await;
    let unknown = server
        .post("/api/users/reset-password")
        .json(&json!({ "email": "nobody@example.com" }))
        .await;
    known.assert_status_ok();
    unknown.assert_status_ok();
    assert_eq!(known.json::<Value>(), unknown.json::<Value>());

    server
        .post("/api/users/resend-verification")
        .json(&json!({ "email": "nobody@example.com" }))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_reset_password_confirm_sets_password_once() {
    let (server, state, backends) = server();
    let user = backends.users.seed("ada@example.com", true);
    let reset = state.tokens.issue(&user, TokenKind::PasswordReset).unwrap();
    let request = json!({
        "uid": user.id.to_string(),
        "token": reset,
        "new_password": "Quiet-Harbor-77",
        "new_password_confirm": "Quiet-Harbor-77"
    });

    server
        .post("/api/users/reset-password-confirm")
        .json(&request)
        .await
        .assert_status_ok();
    login(&server, "ada@example.com", "Quiet-Harbor-77").await;

    // The link was bound to the old password and is now stale.
    let response = server
        .post("/api/users/reset-password-confirm")
        .json(&request)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(response.json::<Value>()["error"]["fields"]["token"].is_array());
}

#[tokio::test]
async fn test_reset_token_for_another_user_is_rejected() {
    let (server, state, backends) = server();
    let ada = backends.users.seed("ada@example.com", true);
    let grace = backends.users.seed("grace@example.com", true);
    let reset = state.tokens.issue(&grace, TokenKind::PasswordReset).unwrap();

    server
        .post("/api/users/reset-password-confirm")
        .json(&json!({
            "uid": ada.id.to_string(),
            "token": reset,
            "new_password": "Quiet-Harbor-77",
            "new_password_confirm": "Quiet-Harbor-77"
        }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

// ────────────────────────────────────────────────────────────────────────────
// Documents & cover letters
// ────────────────────────────────────────────────────────────────────────────

const RESUME_TEXT: &str = "Ada Lovelace\nAnalyst\nWrote the first published algorithm for the Analytical Engine.";

#[tokio::test]
async fn test_resume_upload_list_and_ownership() {
    let (server, _, backends) = server();
    backends.users.seed("ada@example.com", true);
    backends.users.seed("grace@example.com", true);
    let ada = login(&server, "ada@example.com", TEST_PASSWORD).await;
    let grace = login(&server, "grace@example.com", TEST_PASSWORD).await;

    let form = MultipartForm::new().add_text("title", "Main CV").add_part(
        "file",
        Part::bytes(RESUME_TEXT.as_bytes().to_vec())
            .file_name("cv.txt")
            .mime_type("text/plain"),
    );
    let (name, value) = bearer(&token(&ada, "access"));
    let response = server
        .post("/api/resumes")
        .add_header(name, value)
        .multipart(form)
        .await;
    response.assert_status(StatusCode::CREATED);
    let resume = response.json::<Value>();
    assert_eq!(resume["title"], "Main CV");
    assert_eq!(resume["file_type"], "txt");
    assert_eq!(resume["is_parsed"], true);
    assert!(resume.get("extracted_text").is_none());
    let id = resume["id"].as_str().unwrap().to_string();

    let (name, value) = bearer(&token(&ada, "access"));
    let list = server.get("/api/resumes").add_header(name, value).await.json::<Value>();
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (name, value) = bearer(&token(&grace, "access"));
    server
        .get(&format!("/api/resumes/{id}"))
        .add_header(name, value)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_resume_delete_is_owner_scoped() {
    let (server, _, backends) = server();
    backends.users.seed("ada@example.com", true);
    backends.users.seed("grace@example.com", true);
    let ada = login(&server, "ada@example.com", TEST_PASSWORD).await;
    let grace = login(&server, "grace@example.com", TEST_PASSWORD).await;

    let form = MultipartForm::new().add_text("title", "Old CV").add_part(
        "file",
        Part::bytes(RESUME_TEXT.as_bytes().to_vec())
            .file_name("cv.txt")
            .mime_type("text/plain"),
    );
    let (name, value) = bearer(&token(&ada, "access"));
    let response = server
        .post("/api/resumes")
        .add_header(name, value)
        .multipart(form)
        .await;
    response.assert_status(StatusCode::CREATED);
    let id = response.json::<Value>()["id"].as_str().unwrap().to_string();

    // Someone else's resume looks missing and survives.
    let (name, value) = bearer(&token(&grace, "access"));
    let response = server
        .delete(&format!("/api/resumes/{id}"))
        .add_header(name, value)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"]["code"], "NOT_FOUND");

    let (name, value) = bearer(&token(&ada, "access"));
    server
        .delete(&format!("/api/resumes/{id}"))
        .add_header(name, value)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let (name, value) = bearer(&token(&ada, "access"));
    server
        .get(&format!("/api/resumes/{id}"))
        .add_header(name, value)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let (name, value) = bearer(&token(&ada, "access"));
    server
        .delete(&format!("/api/resumes/{id}"))
        .add_header(name, value)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_resume_upload_rejects_unsupported_files() {
    let (server, _, backends) = server();
    backends.users.seed("ada@example.com", true);
    let ada = login(&server, "ada@example.com", TEST_PASSWORD).await;

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(vec![0x50, 0x4b, 0x03, 0x04, 0x00])
            .file_name("cv.docx")
            .mime_type("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
    );
    let (name, value) = bearer(&token(&ada, "access"));
    let response = server
        .post("/api/resumes")
        .add_header(name, value)
        .multipart(form)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(response.json::<Value>()["error"]["fields"]["file"].is_array());
}

#[tokio::test]
async fn test_job_creation_extracts_header() {
    let (server, _, backends) = server();
    backends.users.seed("ada@example.com", true);
    let ada = login(&server, "ada@example.com", TEST_PASSWORD).await;

    let (name, value) = bearer(&token(&ada, "access"));
    let response = server
        .post("/api/jobs")
        .add_header(name, value)
        .json(&json!({ "raw_content": "Rust Engineer at Ferrous Systems\nLocation: Berlin\nBuild tools." }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let job = response.json::<Value>();
    assert_eq!(job["title"], "Rust Engineer");
    assert_eq!(job["company"], "Ferrous Systems");
    assert_eq!(job["location"], "Berlin");
    assert_eq!(job["is_processed"], true);

    let (name, value) = bearer(&token(&ada, "access"));
    server
        .post("/api/jobs")
        .add_header(name, value)
        .json(&json!({ "company": "Acme" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cover_letter_uses_latest_documents() {
    let (server, _, backends) = server();
    let user = backends.users.seed("ada@example.com", true);
    let ada = login(&server, "ada@example.com", TEST_PASSWORD).await;

    let (name, value) = bearer(&token(&ada, "access"));
    let response = server
        .post("/api/analysis/generate-cover-letter")
        .add_header(name, value)
        .json(&json!({}))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    let resume = sample_resume(user.id, RESUME_TEXT);
    backends.documents.add_resume(resume.clone());
    backends.documents.add_job(sample_job(user.id, "Analyst", "Babbage & Co"));
    let latest_job = sample_job(user.id, "Rust Engineer", "Ferrous Systems");
    backends.documents.add_job(latest_job.clone());

    let (name, value) = bearer(&token(&ada, "access"));
    let response = server
        .post("/api/analysis/generate-cover-letter")
        .add_header(name, value)
        .json(&json!({}))
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["resume_id"], resume.id.to_string());
    assert_eq!(body["job_id"], latest_job.id.to_string());
    assert!(body["cover_letter"].as_str().unwrap().contains("Ferrous Systems"));
    assert!(body["cover_letter"].as_str().unwrap().contains("Ada Lovelace"));
}
