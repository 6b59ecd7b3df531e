//! Client library for the EaseApply API.
//!
//! `EaseApplyClient` owns one session. Every authenticated call goes through
//! a dispatcher that refreshes an expired access token at most once per
//! request, and concurrent callers share a single refresh exchange.

pub mod api;
pub mod auth;
pub mod config;
pub mod credentials;
pub mod dispatch;
pub mod error;
pub mod models;
pub mod refresh;
pub mod session;

use std::sync::Arc;

use tokio::sync::broadcast;

pub use api::Workspace;
pub use auth::AuthController;
pub use config::ClientConfig;
pub use credentials::{
    CredentialBackend, Credentials, FileCredentialBackend, MemoryCredentialBackend,
};
pub use dispatch::{ApiRequest, Dispatcher};
pub use error::{ClientError, FieldErrors};
pub use session::{
    Operation, SessionEvent, SessionState, SessionStatus, SessionStore, SessionWatcher,
};

pub struct EaseApplyClient {
    dispatcher: Arc<Dispatcher>,
    auth: AuthController,
    workspace: Workspace,
}

impl EaseApplyClient {
    /// Restores any persisted session from `backend`. Nothing is sent to the
    /// server until an operation is called.
    pub fn new(
        config: ClientConfig,
        backend: Arc<dyn CredentialBackend>,
    ) -> Result<Self, ClientError> {
        let session = SessionStore::restore(backend)?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;

        let refresher = refresh::RefreshCoordinator::new(
            http.clone(),
            config.url(refresh::REFRESH_PATH),
            session.clone(),
            config.refresh_timeout,
        );
        let generation_timeout = config.generation_timeout;
        let dispatcher = Arc::new(Dispatcher::new(http, config, session, refresher));

        tracing::debug!(
            authenticated = dispatcher.session().state().is_authenticated(),
            "client ready"
        );

        Ok(Self {
            auth: AuthController::new(Arc::clone(&dispatcher)),
            workspace: Workspace::new(Arc::clone(&dispatcher), generation_timeout),
            dispatcher,
        })
    }

    /// Persists to `credentials_path` when set, otherwise keeps credentials
    /// in memory.
    pub fn from_config(config: ClientConfig) -> Result<Self, ClientError> {
        let backend: Arc<dyn CredentialBackend> = match &config.credentials_path {
            Some(path) => Arc::new(FileCredentialBackend::new(path.clone())),
            None => Arc::new(MemoryCredentialBackend::default()),
        };
        Self::new(config, backend)
    }

    pub fn auth(&self) -> &AuthController {
        &self.auth
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn session(&self) -> SessionWatcher {
        self.dispatcher.session().subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.dispatcher.session().events()
    }

    /// For calls this crate has no typed wrapper for.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }
}
