//! Request dispatch: attaches the bearer token, and on a 401 refreshes once
//! and retries once.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::refresh::RefreshCoordinator;
use crate::session::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// Attach the access token; refresh and retry once on 401.
    #[default]
    Bearer,
    /// No token and no refresh (login, register, password reset).
    Anonymous,
}

#[derive(Debug, Clone)]
pub enum PartData {
    Text(String),
    File {
        file_name: String,
        mime: String,
        data: Bytes,
    },
}

#[derive(Debug, Clone)]
pub struct MultipartPart {
    pub name: String,
    pub data: PartData,
}

/// Kept as data rather than a `reqwest` body so it can be rebuilt for every
/// transmission; a retry sends exactly what the caller asked for.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(Vec<MultipartPart>),
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: RequestBody,
    /// Overrides the client's default request timeout.
    pub timeout: Option<Duration>,
    pub auth: AuthMode,
    /// Set on the single retry that follows a refresh.
    pub retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: RequestBody::Empty,
            timeout: None,
            auth: AuthMode::Bearer,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, ClientError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ClientError::Config(format!("request body is not serializable: {e}")))?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    pub fn multipart(mut self, parts: Vec<MultipartPart>) -> Self {
        self.body = RequestBody::Multipart(parts);
        self
    }

    pub fn anonymous(mut self) -> Self {
        self.auth = AuthMode::Anonymous;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

pub struct Dispatcher {
    http: reqwest::Client,
    config: ClientConfig,
    session: SessionStore,
    refresher: Arc<RefreshCoordinator>,
}

impl Dispatcher {
    pub fn new(
        http: reqwest::Client,
        config: ClientConfig,
        session: SessionStore,
        refresher: Arc<RefreshCoordinator>,
    ) -> Self {
        Self {
            http,
            config,
            session,
            refresher,
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn refresher(&self) -> &Arc<RefreshCoordinator> {
        &self.refresher
    }

    /// Sends `request`. Any status other than a bearer-mode 401 is returned
    /// as-is. A bearer-mode 401 triggers one refresh and one retry; a 401 on
    /// the retry (or on a request already marked retried) is `Unauthorized`.
    pub async fn send(&self, request: &ApiRequest) -> Result<reqwest::Response, ClientError> {
        let token = match request.auth {
            AuthMode::Bearer => self.session.access_token(),
            AuthMode::Anonymous => None,
        };

        let response = self.transmit(request, token.as_deref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED || request.auth == AuthMode::Anonymous {
            return Ok(response);
        }
        if request.retried {
            tracing::warn!(path = %request.path, "401 on a request that was already retried");
            return Err(ClientError::Unauthorized);
        }

        tracing::debug!(path = %request.path, "access token rejected; refreshing");
        let fresh = self.refresher.refreshed_token(token.as_deref()).await?;

        let retry = ApiRequest {
            retried: true,
            ..request.clone()
        };
        let response = self.transmit(&retry, Some(&fresh)).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!(path = %request.path, "still unauthorized after refresh");
            return Err(ClientError::Unauthorized);
        }
        Ok(response)
    }

    /// `send`, then decodes a 2xx body as `T`; other statuses become errors.
    pub async fn send_json<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, ClientError> {
        let response = self.send(request).await?;
        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn transmit(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<reqwest::Response, ClientError> {
        let mut builder = self
            .http
            .request(request.method.clone(), self.config.url(&request.path))
            .timeout(request.timeout.unwrap_or(self.config.request_timeout));

        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(parts) => builder.multipart(build_form(parts)?),
        };

        let response = builder.send().await.map_err(|e| {
            tracing::debug!(path = %request.path, error = %e, "request failed without a response");
            ClientError::from(e)
        })?;
        tracing::debug!(
            method = %request.method,
            path = %request.path,
            status = %response.status(),
            retried = request.retried,
            "response received"
        );
        Ok(response)
    }
}

fn build_form(parts: &[MultipartPart]) -> Result<reqwest::multipart::Form, ClientError> {
    let mut form = reqwest::multipart::Form::new();
    for part in parts {
        form = match &part.data {
            PartData::Text(text) => form.text(part.name.clone(), text.clone()),
            PartData::File {
                file_name,
                mime,
                data,
            } => {
                let file = reqwest::multipart::Part::bytes(data.to_vec())
                    .file_name(file_name.clone())
                    .mime_str(mime)
                    .map_err(|e| ClientError::Config(format!("invalid content type {mime}: {e}")))?;
                form.part(part.name.clone(), file)
            }
        };
    }
    Ok(form)
}
