//! Authenticated JSON calls against Google REST APIs.

use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;

use crate::auth::{AuthError, GoogleAuth};

/// A long-running operation returned by mutating Cloud Functions calls.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<OperationStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OperationStatus {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

/// Bearer-authenticated JSON client shared by the REST API wrappers.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    auth: GoogleAuth,
}

impl RestClient {
    pub fn new(http: reqwest::Client, auth: GoogleAuth) -> Self {
        Self { http, auth }
    }

    /// Send a request and decode the JSON response body.
    ///
    /// Empty bodies decode to `Value::Null`. Non-success statuses become
    /// [`ApiError::Status`] carrying the response body.
    pub async fn call(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let token = self
            .auth
            .access_token()
            .await
            .map_err(|e| ApiError::Auth { source: e })?;

        tracing::debug!(%method, url, "google api");
        let mut request = self.http.request(method.clone(), url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| ApiError::Transport {
            url: url.to_owned(),
            source: e,
        })?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| ApiError::Transport {
            url: url.to_owned(),
            source: e,
        })?;

        if !status.is_success() {
            return Err(ApiError::Status {
                method: method.to_string(),
                url: url.to_owned(),
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode {
            url: url.to_owned(),
            source: e,
        })
    }
}

/// Pull a string field out of a JSON response.
pub(crate) fn string_field(value: &Value, field: &'static str, url: &str) -> Result<String, ApiError> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| ApiError::MissingField {
            url: url.to_owned(),
            field,
        })
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("authentication failed")]
    Auth { source: AuthError },

    #[error("request to {url} failed")]
    Transport { url: String, source: reqwest::Error },

    #[error("{method} {url} returned {status}: {body}")]
    Status {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    #[error("invalid JSON from {url}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },

    #[error("response from {url} has no '{field}'")]
    MissingField { url: String, field: &'static str },

    #[error("operation {name} failed ({code}): {message}")]
    Operation {
        name: String,
        code: i32,
        message: String,
    },
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// HTTP 404.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// HTTP 409, returned by `create` when the resource already exists.
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }
}
