//! Error types for duet-model.

use std::path::PathBuf;

/// Result type alias using [`HostError`].
pub type Result<T> = std::result::Result<T, HostError>;

/// Everything that can go wrong while loading or running the model.
///
/// Payloads are plain strings so a failed load can be remembered and handed
/// back to every later caller.
#[derive(Debug, Clone, thiserror::Error)]
pub enum HostError {
    /// Model or inference configuration is unreadable or invalid.
    #[error("config: {0}")]
    Config(String),

    /// A checkpoint path is configured but nothing exists there.
    #[error("checkpoint not found at {}", .0.display())]
    CheckpointMissing(PathBuf),

    /// The checkpoint exists but could not be decoded.
    #[error("checkpoint: {0}")]
    Checkpoint(String),

    /// The requested compute device cannot be used.
    #[error("device {0} is not available")]
    Device(String),

    /// Inference was requested before `initialize` succeeded.
    #[error("model is not loaded")]
    NotReady,

    /// The model failed or produced unusable output.
    #[error("inference failed: {0}")]
    Inference(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The encoder binary could not be started.
    #[error("encoder `{0}` is not available")]
    EncoderUnavailable(String),

    /// The encoder ran and reported failure.
    #[error("encoder failed: {0}")]
    Encoder(String),

    #[error("nothing to render")]
    Empty,

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
