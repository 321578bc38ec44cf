//! Model hosting for duet: owns the one motion model of the process and turns
//! prompts into smoothed two-person joint sequences, plus the video renderer
//! that encodes those sequences.

pub mod checkpoint;
pub mod config;
pub mod device;
pub mod error;
pub mod host;
pub mod model;
pub mod motion;
pub mod render;

pub use config::{InferConfig, ModelConfig};
pub use device::Device;
pub use error::{HostError, RenderError, Result};
pub use host::ModelHost;
pub use model::MotionModel;
pub use motion::{MotionPair, MotionSequence, NUM_JOINTS};
pub use render::{FfmpegRenderer, VideoRenderer};
