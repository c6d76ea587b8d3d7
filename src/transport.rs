use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use crate::config::GeminiConfig;
use crate::error::{BackendError, IntelligenceError, Result};
use crate::models::{GenerateContentRequest, GenerateContentResponse};

const MAX_ERROR_BODY_CHARS: usize = 500;

/// One non-streamed generateContent round trip. No retries, no caching.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        req: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse>;
}

pub struct GeminiTransport {
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl GeminiTransport {
    pub fn new(cfg: &GeminiConfig) -> Result<Self> {
        let timeout = cfg.get_request_timeout();
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(cfg.get_connect_timeout())
            .build()
            .map_err(|e| {
                IntelligenceError::Config(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            timeout,
        })
    }

    fn endpoint_url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    fn map_send_error(&self, e: reqwest::Error) -> BackendError {
        if e.is_timeout() {
            BackendError::Timeout {
                secs: self.timeout.as_secs(),
            }
        } else {
            BackendError::Transport(format!("Request to Gemini API failed: {e}"))
        }
    }
}

/// Map a non-success HTTP status to a backend error. Auth failures never echo
/// the body, which may contain the rejected key.
fn map_http_error(status: StatusCode, body: &str) -> BackendError {
    let body = match status.as_u16() {
        401 | 403 => "authentication failed".to_string(),
        _ => truncate(body.trim(), MAX_ERROR_BODY_CHARS),
    };
    BackendError::Api {
        status: status.as_u16(),
        body,
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}

#[async_trait]
impl Transport for GeminiTransport {
    async fn generate(
        &self,
        model: &str,
        req: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = self.endpoint_url(model);
        tracing::debug!(
            model,
            url = url.as_str(),
            web_search = req.has_web_search(),
            "Sending Gemini generateContent request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(req)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Gemini API returned an error status");
            return Err(map_http_error(status, &body).into());
        }

        tracing::debug!(status = status.as_u16(), bytes = body.len(), "Gemini response received");

        serde_json::from_str(&body).map_err(|e| {
            IntelligenceError::from(BackendError::MalformedResponse(format!(
                "Failed to parse Gemini API envelope: {e}"
            )))
        })
    }
}
