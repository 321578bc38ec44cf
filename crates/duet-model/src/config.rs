//! Model and inference settings, read from JSON files at load time.

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use crate::{Device, HostError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    /// Registered model name, see [`crate::model::build_model`]
    #[serde(default = "default_model_name")]
    pub name: String,

    /// Optional safetensors checkpoint applied on top of the built-in weights
    #[serde(default)]
    pub checkpoint: Option<PathBuf>,

    /// Structural prefix stripped from checkpoint keys (e.g. a training wrapper's `model.`)
    #[serde(default = "default_checkpoint_prefix")]
    pub checkpoint_prefix: String,

    #[serde(default = "default_device")]
    pub device: String,

    /// Keep serving with built-in weights when the checkpoint is missing.
    /// Only meant for testing.
    #[serde(default)]
    pub allow_uninitialized_weights: bool,
}

impl ModelConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        read_json(path)
    }

    pub fn device(&self) -> Result<Device> {
        self.device.parse()
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model_name(),
            checkpoint: None,
            checkpoint_prefix: default_checkpoint_prefix(),
            device: default_device(),
            allow_uninitialized_weights: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InferConfig {
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Standard deviation, in frames, of the temporal smoothing kernel
    #[serde(default = "default_smoothing_sigma")]
    pub smoothing_sigma: f32,
}

impl InferConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let config: Self = read_json(path)?;
        if config.fps == 0 {
            return Err(HostError::Config(format!("{}: fps must be positive", path.display())));
        }
        if !config.smoothing_sigma.is_finite() || config.smoothing_sigma < 0.0 {
            return Err(HostError::Config(format!(
                "{}: smoothing_sigma must be a non-negative number",
                path.display()
            )));
        }
        Ok(config)
    }
}

impl Default for InferConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            smoothing_sigma: default_smoothing_sigma(),
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| HostError::Config(format!("cannot read {}: {e}", path.display())))?;
    serde_json::from_str(&raw)
        .map_err(|e| HostError::Config(format!("cannot parse {}: {e}", path.display())))
}

fn default_model_name() -> String {
    "reference".to_string()
}

fn default_checkpoint_prefix() -> String {
    "model.".to_string()
}

fn default_device() -> String {
    "cpu".to_string()
}

fn default_fps() -> u32 {
    30
}

fn default_smoothing_sigma() -> f32 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, "{}").unwrap();

        let config = ModelConfig::from_path(&path).unwrap();
        assert_eq!(config, ModelConfig::default());
        assert_eq!(config.device().unwrap(), Device::Cpu);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = InferConfig::from_path(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, HostError::Config(_)));
    }

    #[test]
    fn test_rejects_zero_fps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("infer.json");
        std::fs::write(&path, r#"{"fps": 0}"#).unwrap();
        assert!(matches!(InferConfig::from_path(&path), Err(HostError::Config(_))));
    }
}
