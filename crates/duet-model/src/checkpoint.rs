//! Checkpoint loading.
//!
//! Checkpoints are safetensors files. Training wrappers usually nest the
//! network under an attribute, so keys arrive as `model.motion_decoder.x`;
//! [`rename_keys`] strips that structural prefix so they match the model's
//! own namespace.

use std::collections::BTreeMap;
use std::path::Path;
use safetensors::{Dtype, SafeTensors};
use tracing::{debug, warn};
use crate::{HostError, Result};

/// A dense f32 parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl Tensor {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Self {
        Self { shape, data }
    }
}

pub type StateDict = BTreeMap<String, Tensor>;

/// Outcome of applying a state dict non-strictly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub loaded: Vec<String>,
    /// Keys present in the checkpoint that the model has no slot for
    pub unexpected: Vec<String>,
    /// Model parameters the checkpoint did not provide
    pub missing: Vec<String>,
}

/// Read every f32 tensor of a safetensors file.
pub fn load_checkpoint(path: &Path) -> Result<StateDict> {
    let bytes = std::fs::read(path)
        .map_err(|e| HostError::Checkpoint(format!("cannot read {}: {e}", path.display())))?;
    let tensors = SafeTensors::deserialize(&bytes)
        .map_err(|e| HostError::Checkpoint(format!("cannot decode {}: {e}", path.display())))?;

    let mut state = StateDict::new();
    for (name, view) in tensors.tensors() {
        if view.dtype() != Dtype::F32 {
            warn!(tensor = %name, dtype = ?view.dtype(), "skipping non-f32 tensor");
            continue;
        }
        let data = view
            .data()
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        state.insert(name, Tensor::new(view.shape().to_vec(), data));
    }

    debug!(path = %path.display(), tensors = state.len(), "checkpoint decoded");
    Ok(state)
}

/// Strip `prefix` from every key that starts with it. Other keys are kept
/// unchanged. An empty prefix is a no-op.
pub fn rename_keys(state: StateDict, prefix: &str) -> StateDict {
    if prefix.is_empty() {
        return state;
    }

    state
        .into_iter()
        .map(|(key, tensor)| match key.strip_prefix(prefix) {
            Some(stripped) => (stripped.to_string(), tensor),
            None => (key, tensor),
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Write a minimal safetensors file holding the given f32 tensors.
    pub(crate) fn write_safetensors(path: &Path, tensors: &[(&str, Vec<usize>, Vec<f32>)]) {
        let mut header = serde_json::Map::new();
        let mut payload = Vec::new();
        for (name, shape, data) in tensors {
            let start = payload.len();
            for v in data {
                payload.extend_from_slice(&v.to_le_bytes());
            }
            header.insert(
                name.to_string(),
                serde_json::json!({
                    "dtype": "F32",
                    "shape": shape,
                    "data_offsets": [start, payload.len()],
                }),
            );
        }
        let header = serde_json::Value::Object(header).to_string();

        let mut bytes = (header.len() as u64).to_le_bytes().to_vec();
        bytes.extend_from_slice(header.as_bytes());
        bytes.extend_from_slice(&payload);
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_rename_strips_prefix_only_at_start() {
        let mut state = StateDict::new();
        state.insert("model.decoder.w".into(), Tensor::new(vec![1], vec![1.0]));
        state.insert("normalizer.mean".into(), Tensor::new(vec![1], vec![2.0]));
        state.insert("decoder.model.b".into(), Tensor::new(vec![1], vec![3.0]));

        let renamed = rename_keys(state, "model.");
        let keys: Vec<_> = renamed.keys().cloned().collect();
        assert_eq!(keys, vec!["decoder.model.b", "decoder.w", "normalizer.mean"]);
    }

    #[test]
    fn test_load_checkpoint_reads_f32() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ckpt.safetensors");
        write_safetensors(&path, &[
            ("model.a", vec![2], vec![0.5, -1.5]),
            ("model.b", vec![1, 1], vec![4.0]),
        ]);

        let state = load_checkpoint(&path).unwrap();
        assert_eq!(state["model.a"], Tensor::new(vec![2], vec![0.5, -1.5]));
        assert_eq!(state["model.b"].shape, vec![1, 1]);
    }

    #[test]
    fn test_garbage_is_checkpoint_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.safetensors");
        std::fs::write(&path, b"not a checkpoint").unwrap();
        assert!(matches!(load_checkpoint(&path), Err(HostError::Checkpoint(_))));
    }
}
