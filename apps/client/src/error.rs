//! Client error taxonomy.
//!
//! Transient failures (`Network`, `Server`) leave the session untouched.
//! `Validation` carries the server's field → messages mapping verbatim.
//! `SessionTerminated` means credentials are gone and the user must log in again.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Field name → messages, as reported by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClientError {
    /// No response was received.
    #[error("network error: {0}")]
    Network(String),

    #[error("validation failed")]
    Validation(FieldErrors),

    /// A 4xx without field errors, e.g. invalid credentials.
    #[error("request rejected ({status} {code}): {message}")]
    Rejected {
        status: u16,
        code: String,
        message: String,
    },

    /// Still 401 after a refresh and one retry.
    #[error("not authorized")]
    Unauthorized,

    #[error("session terminated")]
    SessionTerminated,

    #[error("server error ({status})")]
    Server { status: u16 },

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("credential storage error: {0}")]
    Storage(String),

    #[error("invalid client configuration: {0}")]
    Config(String),
}

#[derive(Deserialize)]
struct Envelope {
    error: EnvelopeBody,
}

#[derive(Deserialize)]
struct EnvelopeBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    fields: Option<FieldErrors>,
}

impl ClientError {
    /// Classifies a non-success response.
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Self::from_parts(status, &body)
    }

    /// Classifies a non-success status and its raw body.
    pub fn from_parts(status: u16, body: &str) -> Self {
        if status >= 500 {
            return ClientError::Server { status };
        }

        match serde_json::from_str::<Envelope>(body) {
            Ok(Envelope { error }) => match error.fields.filter(|f| !f.is_empty()) {
                Some(fields) => ClientError::Validation(fields),
                None => ClientError::Rejected {
                    status,
                    code: error.code,
                    message: if error.message.is_empty() {
                        default_message(status)
                    } else {
                        error.message
                    },
                },
            },
            Err(_) => ClientError::Rejected {
                status,
                code: String::new(),
                message: default_message(status),
            },
        }
    }

    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            ClientError::Validation(fields) => Some(fields),
            _ => None,
        }
    }

    /// True for failures worth retrying by hand: nothing about the request
    /// or the session was wrong.
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Network(_) | ClientError::Server { .. })
    }

    /// One human-readable line for display.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Network(_) => {
                "Unable to reach the server. Check your connection and try again.".to_string()
            }
            ClientError::Validation(fields) => {
                let messages: Vec<&str> = fields
                    .iter()
                    .flat_map(|(_, msgs)| msgs.iter().map(String::as_str))
                    .collect();
                if messages.is_empty() {
                    "Please correct the highlighted fields.".to_string()
                } else {
                    messages.join(" ")
                }
            }
            ClientError::Rejected { message, .. } => message.clone(),
            ClientError::Unauthorized => "You are not authorized to do that.".to_string(),
            ClientError::SessionTerminated => {
                "Your session has expired. Please log in again.".to_string()
            }
            ClientError::Server { .. } => {
                "Something went wrong on our side. Please try again later.".to_string()
            }
            ClientError::Decode(_) => "Received an unexpected response from the server.".to_string(),
            ClientError::Storage(_) => "Saved login details could not be accessed.".to_string(),
            ClientError::Config(msg) => msg.clone(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else if e.is_builder() {
            ClientError::Config(e.to_string())
        } else {
            ClientError::Network(e.to_string())
        }
    }
}

fn default_message(status: u16) -> String {
    match status {
        400 => "The request was invalid.".to_string(),
        401 => "Authentication required.".to_string(),
        403 => "You do not have permission to do that.".to_string(),
        404 => "Not found.".to_string(),
        429 => "Too many requests. Please wait and try again.".to_string(),
        _ => format!("Request failed with status {status}."),
    }
}
