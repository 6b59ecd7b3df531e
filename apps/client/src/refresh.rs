//! Single-flight access-token refresh.
//!
//! At most one `/api/token/refresh` exchange runs at a time. Callers that
//! need a fresh token while one is in flight queue a oneshot waiter and all
//! receive that exchange's outcome. The exchange runs in its own task, so a
//! caller that gives up does not strand the others.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde_json::json;
use tokio::sync::oneshot;

use crate::error::ClientError;
use crate::models::RefreshResponse;
use crate::session::SessionStore;

type Waiter = oneshot::Sender<Result<String, ClientError>>;

pub const REFRESH_PATH: &str = "/api/token/refresh";

enum Outcome {
    Refreshed {
        used_refresh: String,
        access: String,
        rotated: Option<String>,
    },
    /// The refresh token is unusable. The session ends if it still holds
    /// that token.
    Rejected {
        used_refresh: Option<String>,
        reason: String,
    },
    /// Nothing was learned about the token; the session stays.
    Failed(ClientError),
}

pub struct RefreshCoordinator {
    http: reqwest::Client,
    url: String,
    session: SessionStore,
    timeout: Duration,
    /// `Some` while an exchange is in flight.
    waiters: Mutex<Option<Vec<Waiter>>>,
}

impl RefreshCoordinator {
    pub fn new(
        http: reqwest::Client,
        url: String,
        session: SessionStore,
        timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            http,
            url,
            session,
            timeout,
            waiters: Mutex::new(None),
        })
    }

    /// Returns an access token newer than `stale`.
    ///
    /// When the stored token already differs from `stale`, a refresh finished
    /// while the caller's request was in flight and the stored token is
    /// returned without a network call.
    pub async fn refreshed_token(
        self: &Arc<Self>,
        stale: Option<&str>,
    ) -> Result<String, ClientError> {
        let rx = {
            let mut waiters = self.lock_waiters();
            if let Some(current) = self
                .session
                .access_token()
                .filter(|current| Some(current.as_str()) != stale)
            {
                return Ok(current);
            }

            let (tx, rx) = oneshot::channel();
            match waiters.as_mut() {
                Some(queue) => queue.push(tx),
                None => {
                    *waiters = Some(vec![tx]);
                    self.spawn_exchange();
                }
            }
            rx
        };

        rx.await.unwrap_or(Err(ClientError::SessionTerminated))
    }

    /// True while an exchange is in flight.
    pub fn in_flight(&self) -> bool {
        self.lock_waiters().is_some()
    }

    fn spawn_exchange(self: &Arc<Self>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = this.exchange().await;
            this.settle(outcome);
        });
    }

    async fn exchange(&self) -> Outcome {
        let Some(refresh) = self.session.refresh_token() else {
            return Outcome::Rejected {
                used_refresh: None,
                reason: "no refresh token stored".to_string(),
            };
        };

        self.session.begin_refresh();
        tracing::debug!("refreshing access token");

        let result = tokio::time::timeout(self.timeout, self.call(&refresh)).await;
        match result {
            Ok(outcome) => outcome,
            Err(_) => Outcome::Rejected {
                used_refresh: Some(refresh),
                reason: format!("refresh timed out after {}s", self.timeout.as_secs_f32()),
            },
        }
    }

    async fn call(&self, refresh: &str) -> Outcome {
        let response = match self
            .http
            .post(&self.url)
            .json(&json!({ "refresh": refresh }))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "refresh request failed");
                return Outcome::Failed(ClientError::from(e));
            }
        };

        let status = response.status();
        if status.is_success() {
            return match response.json::<RefreshResponse>().await {
                Ok(body) => Outcome::Refreshed {
                    used_refresh: refresh.to_string(),
                    access: body.access,
                    rotated: body.refresh,
                },
                Err(e) => Outcome::Failed(ClientError::Decode(e.to_string())),
            };
        }

        match status.as_u16() {
            400 | 401 | 403 => Outcome::Rejected {
                used_refresh: Some(refresh.to_string()),
                reason: format!("refresh token rejected ({status})"),
            },
            _ => {
                let error = ClientError::from_response(response).await;
                tracing::warn!(%status, "refresh endpoint failed");
                Outcome::Failed(error)
            }
        }
    }

    /// Publishes the outcome and wakes every waiter. Runs under the waiter
    /// lock, so no caller can queue onto an exchange that already settled.
    fn settle(&self, outcome: Outcome) {
        let mut waiters = self.lock_waiters();

        let result = match outcome {
            Outcome::Refreshed {
                used_refresh,
                access,
                rotated,
            } => {
                let rotated_flag = rotated.is_some();
                if self.session.apply_refresh(&used_refresh, access.clone(), rotated) {
                    tracing::info!(rotated = rotated_flag, "access token refreshed");
                    Ok(access)
                } else {
                    tracing::debug!("session changed during refresh; result discarded");
                    self.superseded()
                }
            }
            Outcome::Rejected {
                used_refresh,
                reason,
            } => {
                if self.session.terminate_if_current(used_refresh.as_deref(), &reason)
                    || !self.session.state().is_authenticated()
                {
                    Err(ClientError::SessionTerminated)
                } else {
                    tracing::debug!(%reason, "rejected refresh token was already replaced");
                    self.superseded()
                }
            }
            Outcome::Failed(error) => {
                self.session.end_refresh();
                Err(error)
            }
        };

        let queue = waiters.take().unwrap_or_default();
        tracing::debug!(waiters = queue.len(), ok = result.is_ok(), "refresh settled");
        for waiter in queue {
            let _ = waiter.send(result.clone());
        }
    }

    /// The session moved on while the exchange was in flight (login, logout
    /// or password change). Waiters retry with whatever is stored now.
    fn superseded(&self) -> Result<String, ClientError> {
        self.session.end_refresh();
        self.session
            .access_token()
            .ok_or(ClientError::SessionTerminated)
    }

    fn lock_waiters(&self) -> MutexGuard<'_, Option<Vec<Waiter>>> {
        self.waiters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
