mod motion_types;
pub mod schemas;

pub use motion_types::{SeedPolicy, FrameCount, DEFAULT_NUM_FRAMES, MIN_NUM_FRAMES, MAX_NUM_FRAMES};

/// Route of the motion generation endpoint.
pub const GENERATE_PATH: &str = "/generate_motion";
/// Route of the translation endpoint.
pub const TRANSLATE_PATH: &str = "/translate";
/// Route of the readiness probe.
pub const HEALTH_PATH: &str = "/health";

/// Media type of every generated artifact.
pub const VIDEO_MEDIA_TYPE: &str = "video/mp4";
/// Target language used when a translation request names none.
pub const DEFAULT_TARGET_LANG: &str = "English";
