use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::models::CommandRequest;

/// Site backend error types
#[derive(Error, Debug, Clone)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BackendError::Deserialization(err.to_string())
        } else {
            BackendError::Network(err.to_string())
        }
    }
}

/// Body returned by `POST /control` on success
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ControlReply {
    #[serde(default)]
    pub message: Option<String>,
}

/// HTTP client for the site backend (`/status`, `/control`, `/logs`)
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET /status, returned loosely typed for the normalizer
    pub async fn fetch_status(&self) -> Result<Value, BackendError> {
        self.get("/status").await
    }

    /// GET /logs
    pub async fn fetch_logs(&self) -> Result<Vec<String>, BackendError> {
        self.get("/logs").await
    }

    /// POST /control
    pub async fn send_control(&self, request: &CommandRequest) -> Result<ControlReply, BackendError> {
        let url = format!("{}/control", self.base_url);

        let response = self.http.post(&url).json(request).send().await?;

        self.handle_response(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self.http.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Handle the HTTP response
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<T, BackendError> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Http {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        response
            .json()
            .await
            .map_err(|e| BackendError::Deserialization(e.to_string()))
    }
}

/// Best-effort message from an error body: `error`, then `message`, then the raw text.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        for key in ["error", "message"] {
            if let Some(text) = json.get(key).and_then(Value::as_str) {
                return text.to_string();
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string()
    } else {
        trimmed.to_string()
    }
}
