//! Session state: the single writer for credentials and the observable
//! session.
//!
//! Credentials and public state live together in one `watch` value, so a
//! transition updates both at once and no observer ever sees a session that
//! is authenticated without tokens, or the reverse. Each transition is then
//! written through to the `CredentialBackend`.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, watch};

use crate::credentials::{CredentialBackend, Credentials};
use crate::error::ClientError;
use crate::models::UserProfile;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionStatus {
    Anonymous,
    Authenticating,
    Authenticated,
    Refreshing,
}

/// Names for the loading flags set by auth operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Operation {
    Login,
    Register,
    Logout,
    ChangePassword,
    ResetPasswordRequest,
    ResetPasswordConfirm,
    FetchProfile,
    UpdateProfile,
    ResendVerification,
    VerifyEmail,
}

/// In-progress operations. The same operation may run more than once at a
/// time; the flag stays set until the last one finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadingFlags(BTreeMap<Operation, usize>);

impl LoadingFlags {
    pub fn contains(&self, op: Operation) -> bool {
        self.0.contains_key(&op)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Operation> + '_ {
        self.0.keys().copied()
    }

    fn insert(&mut self, op: Operation) {
        *self.0.entry(op).or_default() += 1;
    }

    fn remove(&mut self, op: Operation) {
        if let Some(count) = self.0.get_mut(&op) {
            *count -= 1;
            if *count == 0 {
                self.0.remove(&op);
            }
        }
    }
}

/// What views observe. Tokens are deliberately absent.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub status: SessionStatus,
    pub user: Option<UserProfile>,
    pub loading: LoadingFlags,
    pub last_error: Option<String>,
}

impl SessionState {
    fn anonymous() -> Self {
        Self {
            status: SessionStatus::Anonymous,
            user: None,
            loading: LoadingFlags::default(),
            last_error: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(
            self.status,
            SessionStatus::Authenticated | SessionStatus::Refreshing
        )
    }

    pub fn is_loading(&self, op: Operation) -> bool {
        self.loading.contains(op)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    LoggedIn,
    TokenRefreshed,
    LoggedOut,
    /// Credentials were discarded because they could not be renewed.
    Terminated { reason: String },
}

#[derive(Debug, Clone)]
struct Snapshot {
    credentials: Credentials,
    state: SessionState,
}

struct Shared {
    snapshot: watch::Sender<Snapshot>,
    events: broadcast::Sender<SessionEvent>,
    backend: Arc<dyn CredentialBackend>,
}

/// Cheap to clone; every clone mutates the same session.
#[derive(Clone)]
pub struct SessionStore {
    shared: Arc<Shared>,
}

impl SessionStore {
    /// An anonymous session that persists to `backend`.
    pub fn new(backend: Arc<dyn CredentialBackend>) -> Self {
        Self::with_credentials(backend, Credentials::default())
    }

    /// Rebuilds the session from persisted credentials. A stored access or
    /// refresh token counts as authenticated until the server says otherwise.
    pub fn restore(backend: Arc<dyn CredentialBackend>) -> Result<Self, ClientError> {
        let credentials = backend.load()?;
        tracing::debug!(
            has_access = credentials.access_token.is_some(),
            has_refresh = credentials.refresh_token.is_some(),
            has_user = credentials.user.is_some(),
            "session restored from storage"
        );
        Ok(Self::with_credentials(backend, credentials))
    }

    fn with_credentials(backend: Arc<dyn CredentialBackend>, credentials: Credentials) -> Self {
        let mut state = SessionState::anonymous();
        if credentials.has_tokens() {
            state.status = SessionStatus::Authenticated;
            state.user = credentials.user.clone();
        }
        let (snapshot, _) = watch::channel(Snapshot { credentials, state });
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                snapshot,
                events,
                backend,
            }),
        }
    }

    // ── Reads ────────────────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.shared.snapshot.borrow().state.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.shared.snapshot.borrow().credentials.access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.shared.snapshot.borrow().credentials.refresh_token.clone()
    }

    pub fn subscribe(&self) -> SessionWatcher {
        SessionWatcher {
            rx: self.shared.snapshot.subscribe(),
        }
    }

    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    // ── Transitions ──────────────────────────────────────────────────────────

    /// Sets `op`'s loading flag until the returned guard is dropped.
    pub fn start(&self, op: Operation) -> OperationGuard {
        self.shared
            .snapshot
            .send_modify(|s| s.state.loading.insert(op));
        OperationGuard {
            store: self.clone(),
            op,
        }
    }

    pub fn set_last_error(&self, error: Option<String>) {
        self.shared.snapshot.send_if_modified(|s| {
            let changed = s.state.last_error != error;
            s.state.last_error = error;
            changed
        });
    }

    /// Login in progress. Previous errors are cleared. A session that still
    /// holds tokens stays `Authenticated` until the login settles, since
    /// requests keep using those tokens meanwhile.
    pub fn begin_authentication(&self) {
        self.shared.snapshot.send_modify(|s| {
            if !s.credentials.has_tokens() {
                s.state.status = SessionStatus::Authenticating;
            }
            s.state.last_error = None;
        });
    }

    /// Login failed: back to whatever the held credentials support.
    pub fn fail_authentication(&self, message: String) {
        self.shared.snapshot.send_modify(|s| {
            s.state.status = if s.credentials.has_tokens() {
                SessionStatus::Authenticated
            } else {
                SessionStatus::Anonymous
            };
            s.state.last_error = Some(message);
        });
    }

    pub fn establish(&self, access: String, refresh: String, user: UserProfile) {
        self.update_persisted(|s| {
            s.credentials = Credentials {
                access_token: Some(access),
                refresh_token: Some(refresh),
                user: Some(user.clone()),
            };
            s.state.status = SessionStatus::Authenticated;
            s.state.user = Some(user);
            s.state.last_error = None;
        });
        self.emit(SessionEvent::LoggedIn);
    }

    /// Replaces both tokens of a live session (after a password change).
    pub fn replace_tokens(&self, access: String, refresh: String) {
        self.update_persisted(|s| {
            s.credentials.access_token = Some(access);
            s.credentials.refresh_token = Some(refresh);
        });
        self.emit(SessionEvent::TokenRefreshed);
    }

    pub fn set_user(&self, user: UserProfile) {
        self.update_persisted(|s| {
            if s.credentials.has_tokens() {
                s.credentials.user = Some(user.clone());
                s.state.user = Some(user);
            }
        });
    }

    pub(crate) fn begin_refresh(&self) {
        self.shared.snapshot.send_if_modified(|s| {
            let authenticated = s.state.status == SessionStatus::Authenticated;
            if authenticated {
                s.state.status = SessionStatus::Refreshing;
            }
            authenticated
        });
    }

    /// Applies a refresh result, unless the session moved on while the
    /// exchange was in flight (logout, or another login). Returns whether the
    /// tokens were applied.
    pub(crate) fn apply_refresh(
        &self,
        used_refresh: &str,
        access: String,
        rotated_refresh: Option<String>,
    ) -> bool {
        let mut applied = false;
        self.update_persisted(|s| {
            if s.credentials.refresh_token.as_deref() != Some(used_refresh) {
                return;
            }
            s.credentials.access_token = Some(access);
            if let Some(refresh) = rotated_refresh {
                s.credentials.refresh_token = Some(refresh);
            }
            s.state.status = SessionStatus::Authenticated;
            applied = true;
        });
        if applied {
            self.emit(SessionEvent::TokenRefreshed);
        }
        applied
    }

    /// A refresh failed for a transient reason; the credentials stay.
    pub(crate) fn end_refresh(&self) {
        self.shared.snapshot.send_if_modified(|s| {
            let refreshing = s.state.status == SessionStatus::Refreshing;
            if refreshing {
                s.state.status = SessionStatus::Authenticated;
            }
            refreshing
        });
    }

    /// Discards credentials and user. Emits `Terminated` only when this call
    /// actually ended a session; returns whether it did.
    pub fn terminate(&self, reason: &str) -> bool {
        self.end_session(reason, |_| true)
    }

    /// `terminate`, but only while the stored refresh token is still
    /// `used_refresh`. A rejection of a token that a login or password change
    /// already replaced leaves the newer session alone.
    pub(crate) fn terminate_if_current(&self, used_refresh: Option<&str>, reason: &str) -> bool {
        self.end_session(reason, |credentials| {
            credentials.refresh_token.as_deref() == used_refresh
        })
    }

    fn end_session(&self, reason: &str, still_current: impl FnOnce(&Credentials) -> bool) -> bool {
        let ended = self.clear_session(
            Some("Your session has expired. Please log in again."),
            still_current,
        );
        if ended {
            tracing::warn!(reason, "session terminated");
            self.emit(SessionEvent::Terminated {
                reason: reason.to_string(),
            });
        }
        ended
    }

    /// Explicit logout. Safe to call on an anonymous session.
    pub fn logout(&self) {
        if self.clear_session(None, |_| true) {
            self.emit(SessionEvent::LoggedOut);
        }
    }

    fn clear_session(
        &self,
        error: Option<&str>,
        still_current: impl FnOnce(&Credentials) -> bool,
    ) -> bool {
        let mut ended = false;
        self.shared.snapshot.send_if_modified(|s| {
            ended = (s.credentials.has_tokens() || s.state.is_authenticated())
                && still_current(&s.credentials);
            if !ended {
                return false;
            }
            s.credentials = Credentials::default();
            s.state.status = SessionStatus::Anonymous;
            s.state.user = None;
            s.state.last_error = error.map(String::from);
            true
        });
        if ended {
            if let Err(e) = self.shared.backend.clear() {
                tracing::warn!(error = %e, "failed to clear stored credentials");
            }
        }
        ended
    }

    fn update_persisted(&self, f: impl FnOnce(&mut Snapshot)) {
        let mut credentials = None;
        self.shared.snapshot.send_modify(|s| {
            f(s);
            credentials = Some(s.credentials.clone());
        });
        if let Some(credentials) = credentials {
            if let Err(e) = self.shared.backend.save(&credentials) {
                tracing::warn!(error = %e, "failed to persist credentials");
            }
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.shared.events.send(event);
    }
}

/// Clears its operation's loading flag when dropped, on every exit path.
pub struct OperationGuard {
    store: SessionStore,
    op: Operation,
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        let op = self.op;
        self.store
            .shared
            .snapshot
            .send_modify(|s| s.state.loading.remove(op));
    }
}

/// Read-only view of the session for UI layers.
#[derive(Clone)]
pub struct SessionWatcher {
    rx: watch::Receiver<Snapshot>,
}

impl SessionWatcher {
    pub fn current(&self) -> SessionState {
        self.rx.borrow().state.clone()
    }

    /// Waits for the next change and returns the new state. `None` once the
    /// session store is gone.
    pub async fn changed(&mut self) -> Option<SessionState> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().state.clone())
    }
}
