use std::fmt;

/// Frame count used when a request does not ask for one.
pub const DEFAULT_NUM_FRAMES: u32 = 210;
pub const MIN_NUM_FRAMES: u32 = 10;
pub const MAX_NUM_FRAMES: u32 = 2000;

/// How a generation call seeds its sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeedPolicy {
    /// Fresh entropy for every call
    #[default]
    Random,
    /// Caller-fixed seed, output is reproducible
    Fixed(u64),
}

impl SeedPolicy {
    pub fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::Fixed(seed),
            None => Self::Random,
        }
    }

    /// Seed to put on the wire, `None` for random
    pub fn seed(&self) -> Option<u64> {
        match self {
            Self::Random => None,
            Self::Fixed(seed) => Some(*seed),
        }
    }
}

impl fmt::Display for SeedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Random => write!(f, "random"),
            Self::Fixed(seed) => write!(f, "fixed({seed})"),
        }
    }
}

/// A frame count that has been checked against the accepted range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FrameCount(u32);

impl FrameCount {
    pub fn new(frames: u32) -> Result<Self, String> {
        if (MIN_NUM_FRAMES..=MAX_NUM_FRAMES).contains(&frames) {
            Ok(Self(frames))
        } else {
            Err(format!(
                "num_frames must be between {MIN_NUM_FRAMES} and {MAX_NUM_FRAMES}, got {frames}"
            ))
        }
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl Default for FrameCount {
    fn default() -> Self {
        Self(DEFAULT_NUM_FRAMES)
    }
}
