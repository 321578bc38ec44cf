//! Forwarding of `/translate` to an OpenAI-compatible machine translation
//! provider.

use std::time::Duration;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use crate::config::TranslationConfig;

#[derive(Debug, thiserror::Error)]
pub enum TranslationError {
    #[error("{0}")]
    Validation(String),

    /// The proxy is not configured (no credential).
    #[error("{0}")]
    Config(String),

    #[error("Translation failed: {0}")]
    Upstream(String),

    #[error("Translation timed out after {}s", .0.as_secs())]
    UpstreamTimeout(Duration),
}

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, TranslationError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    translation_options: TranslationOptions<'a>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct TranslationOptions<'a> {
    source_lang: &'a str,
    target_lang: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatReply>,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

pub struct TranslationProxy {
    client: reqwest::Client,
    config: TranslationConfig,
}

impl TranslationProxy {
    pub fn new(config: TranslationConfig) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn map_transport(&self, e: reqwest::Error) -> TranslationError {
        if e.is_timeout() {
            TranslationError::UpstreamTimeout(self.config.timeout)
        } else {
            TranslationError::Upstream(e.to_string())
        }
    }
}

#[async_trait]
impl Translator for TranslationProxy {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, TranslationError> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return Err(TranslationError::Config("DASHSCOPE_API_KEY not configured".into()));
        };
        if text.trim().is_empty() {
            return Err(TranslationError::Validation("text must not be empty".into()));
        }

        let body = ChatRequest {
            model: &self.config.model,
            messages: [ChatMessage { role: "user", content: text }],
            translation_options: TranslationOptions { source_lang: "auto", target_lang },
        };

        debug!(target_lang, chars = text.chars().count(), "forwarding translation");
        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            error!(%status, "translation provider rejected request: {detail}");
            return Err(TranslationError::Upstream(format!("provider returned {status}")));
        }

        let parsed: ChatResponse = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                self.map_transport(e)
            } else {
                TranslationError::Upstream(format!("unreadable provider response: {e}"))
            }
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| TranslationError::Upstream("Translation service returned empty response".into()))
    }
}
