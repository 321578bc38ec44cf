//! Blocking HTTP client for the motion server.

use std::io::Read;
use std::time::Duration;
use reqwest::blocking::{Client, Response};
use duet_core::schemas::{ErrorResponse, GenerateMotionRequest, TranslateRequest, TranslateResponse};
use duet_core::{GENERATE_PATH, TRANSLATE_PATH};
use crate::config::ClientConfig;
use crate::error::ClientError;

/// What a job needs from the server. Implemented over HTTP by [`ApiClient`].
pub trait MotionBackend: Send + Sync {
    fn translate(&self, text: &str, target_lang: &str) -> Result<String, ClientError>;

    /// Ask for a video. Returns once the server has answered; the body is
    /// read by the caller.
    fn generate(&self, request: &GenerateMotionRequest) -> Result<Box<dyn Read + Send>, ClientError>;
}

pub struct ApiClient {
    client: Client,
    base_url: String,
    generate_timeout: Duration,
    translate_timeout: Duration,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ClientError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            generate_timeout: config.generate_timeout,
            translate_timeout: config.translate_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn classify(&self, e: reqwest::Error, timeout: Duration) -> ClientError {
        if e.is_timeout() {
            ClientError::Timeout(timeout)
        } else if e.is_connect() {
            ClientError::Connectivity { url: self.base_url.clone() }
        } else {
            ClientError::Request(e.to_string())
        }
    }
}

/// Pass a success response through; turn anything else into
/// [`ClientError::Remote`] carrying the server's `detail` when it sent one.
fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().unwrap_or_default();
    let detail = match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(err) => err.detail,
        Err(_) => body,
    };
    Err(ClientError::Remote {
        status: status.as_u16(),
        detail,
    })
}

impl MotionBackend for ApiClient {
    fn translate(&self, text: &str, target_lang: &str) -> Result<String, ClientError> {
        let body = TranslateRequest {
            text: text.to_string(),
            target_lang: target_lang.to_string(),
        };

        let response = self
            .client
            .post(self.url(TRANSLATE_PATH))
            .timeout(self.translate_timeout)
            .json(&body)
            .send()
            .map_err(|e| self.classify(e, self.translate_timeout))?;

        let parsed: TranslateResponse = check_status(response)?
            .json()
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

        let translation = parsed.translation.trim().to_string();
        if translation.is_empty() {
            return Err(ClientError::InvalidResponse("empty translation".into()));
        }
        Ok(translation)
    }

    fn generate(&self, request: &GenerateMotionRequest) -> Result<Box<dyn Read + Send>, ClientError> {
        let response = self
            .client
            .post(self.url(GENERATE_PATH))
            .timeout(self.generate_timeout)
            .json(request)
            .send()
            .map_err(|e| self.classify(e, self.generate_timeout))?;

        Ok(Box::new(check_status(response)?))
    }
}
