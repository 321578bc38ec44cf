use std::fmt;
use std::path::PathBuf;
use duet_core::schemas::GenerateMotionRequest;
use duet_core::{FrameCount, SeedPolicy, DEFAULT_TARGET_LANG};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Idle,
    Requested,
    Translating,
    Generating,
    Downloading,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Requested | Self::Translating | Self::Generating | Self::Downloading)
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Progress percentage shown when the job enters this state.
    pub fn milestone(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Requested => 5,
            Self::Translating => 15,
            Self::Generating => 30,
            Self::Downloading => 80,
            Self::Completed => 100,
            Self::Failed | Self::Cancelled => 0,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Requested => "requested",
            Self::Translating => "translating",
            Self::Generating => "generating",
            Self::Downloading => "downloading",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// Everything one job needs, fixed when it is submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct JobParams {
    pub prompt: String,
    pub output_dir: PathBuf,
    pub frames: FrameCount,
    pub seed: SeedPolicy,
    pub translate: bool,
    pub target_lang: String,
}

impl JobParams {
    pub fn new(prompt: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            prompt: prompt.into(),
            output_dir: output_dir.into(),
            frames: FrameCount::default(),
            seed: SeedPolicy::Random,
            translate: false,
            target_lang: DEFAULT_TARGET_LANG.to_string(),
        }
    }

    pub fn request(&self, text: &str) -> GenerateMotionRequest {
        GenerateMotionRequest {
            text: text.to_string(),
            num_frames: Some(self.frames.get()),
            seed: self.seed.seed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_groups() {
        assert!(!JobStatus::Idle.is_active());
        assert!(JobStatus::Downloading.is_active());
        assert!(JobStatus::Cancelled.is_complete());
        assert!(!JobStatus::Generating.is_complete());
        assert_eq!(JobStatus::Generating.milestone(), 30);
    }

    #[test]
    fn test_request_carries_params() {
        let mut params = JobParams::new("hug", "out");
        params.seed = SeedPolicy::Fixed(42);
        params.frames = FrameCount::new(120).unwrap();

        let req = params.request("two people hug");
        assert_eq!(req.text, "two people hug");
        assert_eq!(req.num_frames, Some(120));
        assert_eq!(req.seed, Some(42));
        assert_eq!(JobParams::new("x", "out").request("x").seed, None);
    }
}
