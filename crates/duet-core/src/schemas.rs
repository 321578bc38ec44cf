//! JSON bodies exchanged between the desktop client and the server.

use serde::{Deserialize, Serialize};
use crate::{SeedPolicy, DEFAULT_TARGET_LANG};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerateMotionRequest {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_frames: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl GenerateMotionRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            num_frames: None,
            seed: None,
        }
    }

    pub fn seed_policy(&self) -> SeedPolicy {
        SeedPolicy::from_seed(self.seed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranslateRequest {
    pub text: String,
    #[serde(default = "default_target_lang")]
    pub target_lang: String,
}

fn default_target_lang() -> String {
    DEFAULT_TARGET_LANG.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranslateResponse {
    pub translation: String,
}

/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
}
