//! Account operations. Each one holds a loading flag for its duration and
//! records a displayable `last_error` when it fails.

use std::sync::Arc;

use serde_json::json;

use crate::dispatch::{ApiRequest, Dispatcher};
use crate::error::ClientError;
use crate::models::{
    ChangePasswordResponse, LoginResponse, MessageResponse, ProfileUpdate, RegisterInput,
    UserProfile,
};
use crate::session::{Operation, SessionStore};

#[derive(Clone)]
pub struct AuthController {
    dispatcher: Arc<Dispatcher>,
    session: SessionStore,
}

impl AuthController {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        let session = dispatcher.session().clone();
        Self {
            dispatcher,
            session,
        }
    }

    /// On success stores both tokens and the profile. On failure the session
    /// stays unauthenticated and `last_error` carries the server's reason.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, ClientError> {
        let _loading = self.session.start(Operation::Login);
        self.session.begin_authentication();

        let request = ApiRequest::post("/api/users/login")
            .anonymous()
            .json(&json!({ "email": email, "password": password }))?;

        match self.dispatcher.send_json::<LoginResponse>(&request).await {
            Ok(LoginResponse {
                access,
                refresh,
                user,
            }) => {
                tracing::info!(user_id = %user.id, "logged in");
                self.session.establish(access, refresh, user.clone());
                Ok(user)
            }
            Err(e) => {
                tracing::debug!(error = %e, "login failed");
                self.session.fail_authentication(e.user_message());
                Err(e)
            }
        }
    }

    /// Creates the account. Does not log in: new accounts must verify their
    /// email first.
    pub async fn register(&self, input: &RegisterInput) -> Result<UserProfile, ClientError> {
        let _loading = self.session.start(Operation::Register);
        let request = ApiRequest::post("/api/users/register")
            .anonymous()
            .json(input)?;
        self.record(self.dispatcher.send_json(&request).await)
    }

    /// Best-effort server logout, then an unconditional local one. Never
    /// fails, and is a no-op on an anonymous session.
    pub async fn logout(&self) {
        let _loading = self.session.start(Operation::Logout);

        if let Some(refresh) = self.session.refresh_token() {
            let result = async {
                let request = ApiRequest::post("/api/users/logout")
                    .anonymous()
                    .json(&json!({ "refresh": refresh }))?;
                let response = self.dispatcher.send(&request).await?;
                if !response.status().is_success() {
                    return Err(ClientError::from_response(response).await);
                }
                Ok(())
            }
            .await;

            if let Err(e) = result {
                tracing::warn!(error = %e, "server logout failed; clearing local session anyway");
            }
        }

        self.session.logout();
        self.session.set_last_error(None);
    }

    /// The server answers with a fresh token pair, since every token issued
    /// before the change stops working.
    pub async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
        new_password_confirm: &str,
    ) -> Result<String, ClientError> {
        let _loading = self.session.start(Operation::ChangePassword);
        let request = ApiRequest::put("/api/users/change-password").json(&json!({
            "old_password": old_password,
            "new_password": new_password,
            "new_password_confirm": new_password_confirm,
        }))?;

        let response: ChangePasswordResponse =
            self.record(self.dispatcher.send_json(&request).await)?;
        self.session.replace_tokens(response.access, response.refresh);
        Ok(response.message)
    }

    pub async fn reset_password_request(&self, email: &str) -> Result<String, ClientError> {
        let _loading = self.session.start(Operation::ResetPasswordRequest);
        let request = ApiRequest::post("/api/users/reset-password")
            .anonymous()
            .json(&json!({ "email": email }))?;
        let response: MessageResponse = self.record(self.dispatcher.send_json(&request).await)?;
        Ok(response.message)
    }

    pub async fn reset_password_confirm(
        &self,
        uid: &str,
        token: &str,
        new_password: &str,
        new_password_confirm: &str,
    ) -> Result<String, ClientError> {
        let _loading = self.session.start(Operation::ResetPasswordConfirm);
        let request = ApiRequest::post("/api/users/reset-password-confirm")
            .anonymous()
            .json(&json!({
                "uid": uid,
                "token": token,
                "new_password": new_password,
                "new_password_confirm": new_password_confirm,
            }))?;
        let response: MessageResponse = self.record(self.dispatcher.send_json(&request).await)?;
        Ok(response.message)
    }

    pub async fn resend_verification(&self, email: &str) -> Result<String, ClientError> {
        let _loading = self.session.start(Operation::ResendVerification);
        let request = ApiRequest::post("/api/users/resend-verification")
            .anonymous()
            .json(&json!({ "email": email }))?;
        let response: MessageResponse = self.record(self.dispatcher.send_json(&request).await)?;
        Ok(response.message)
    }

    pub async fn verify_email(&self, uid: &str, token: &str) -> Result<String, ClientError> {
        let _loading = self.session.start(Operation::VerifyEmail);
        let request = ApiRequest::get(format!("/api/users/activate/{uid}/{token}")).anonymous();
        let response: MessageResponse = self.record(self.dispatcher.send_json(&request).await)?;
        Ok(response.message)
    }

    /// Fetches the profile and caches it in the session. A dead token ends
    /// the session through the refresh path.
    pub async fn fetch_profile(&self) -> Result<UserProfile, ClientError> {
        let _loading = self.session.start(Operation::FetchProfile);
        let request = ApiRequest::get("/api/users/profile");
        let user: UserProfile = self.record(self.dispatcher.send_json(&request).await)?;
        self.session.set_user(user.clone());
        Ok(user)
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ClientError> {
        let _loading = self.session.start(Operation::UpdateProfile);
        let request = ApiRequest::patch("/api/users/profile").json(update)?;
        let user: UserProfile = self.record(self.dispatcher.send_json(&request).await)?;
        self.session.set_user(user.clone());
        Ok(user)
    }

    /// Startup: with a token but no cached profile, fetch the profile.
    /// Returns the cached or fetched user, or `None` when anonymous.
    pub async fn restore(&self) -> Result<Option<UserProfile>, ClientError> {
        let state = self.session.state();
        if !state.is_authenticated() {
            return Ok(None);
        }
        match state.user {
            Some(user) => Ok(Some(user)),
            None => self.fetch_profile().await.map(Some),
        }
    }

    fn record<T>(&self, result: Result<T, ClientError>) -> Result<T, ClientError> {
        match &result {
            Ok(_) => self.session.set_last_error(None),
            Err(e) => self.session.set_last_error(Some(e.user_message())),
        }
        result
    }
}
