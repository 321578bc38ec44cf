//! The model seam.
//!
//! The network itself is an external concern; the host only needs something
//! that accepts weights and turns a prompt into two raw joint sequences.
//! [`ReferenceModel`] is the built-in implementation.

use std::f32::consts::TAU;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use crate::checkpoint::{LoadReport, StateDict, Tensor};
use crate::motion::{MotionSequence, Pose, NUM_JOINTS};
use crate::{Device, HostError, ModelConfig, Result};

pub trait MotionModel: Send {
    fn name(&self) -> &str;

    fn supports_device(&self, device: Device) -> bool;

    /// Apply parameters by name, ignoring keys the model does not know.
    fn load_state_dict(&mut self, state: StateDict) -> Result<LoadReport>;

    /// Produce unsmoothed joint positions for both agents, `frames` long each.
    fn generate(&mut self, prompt: &str, frames: usize, rng: &mut ChaCha8Rng) -> Result<[MotionSequence; 2]>;
}

/// Construct the model a config names.
pub fn build_model(config: &ModelConfig) -> Result<Box<dyn MotionModel>> {
    match config.name.as_str() {
        ReferenceModel::NAME => Ok(Box::new(ReferenceModel::default()) as Box<dyn MotionModel>),
        other => Err(HostError::Config(format!("unknown model `{other}`"))),
    }
}

const REST_POSE_KEY: &str = "motion_decoder.rest_pose";
const AMPLITUDE_KEY: &str = "motion_decoder.amplitude";

/// Horizontal distance of each agent from the scene center at the first frame.
const START_OFFSET: f32 = 0.7;
/// How much closer the agents get by the last frame.
const APPROACH: f32 = 0.25;
const JITTER: f32 = 0.01;

/// Procedural two-person motion decoder.
///
/// The prompt picks tempo and phase structure, the sampler adds per-joint
/// phases and jitter, and the rest pose and amplitudes are parameters that a
/// checkpoint can override. CPU only.
#[derive(Debug, Clone)]
pub struct ReferenceModel {
    rest_pose: Pose,
    amplitude: Pose,
}

impl ReferenceModel {
    pub const NAME: &'static str = "reference";
}

impl Default for ReferenceModel {
    fn default() -> Self {
        Self {
            rest_pose: REST_POSE,
            amplitude: default_amplitude(),
        }
    }
}

impl MotionModel for ReferenceModel {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn supports_device(&self, device: Device) -> bool {
        device == Device::Cpu
    }

    fn load_state_dict(&mut self, mut state: StateDict) -> Result<LoadReport> {
        let mut report = LoadReport::default();

        for (key, slot) in [(REST_POSE_KEY, &mut self.rest_pose), (AMPLITUDE_KEY, &mut self.amplitude)] {
            match state.remove(key) {
                Some(tensor) => {
                    *slot = pose_from_tensor(key, &tensor)?;
                    report.loaded.push(key.to_string());
                }
                None => report.missing.push(key.to_string()),
            }
        }
        report.unexpected = state.into_keys().collect();

        Ok(report)
    }

    fn generate(&mut self, prompt: &str, frames: usize, rng: &mut ChaCha8Rng) -> Result<[MotionSequence; 2]> {
        if frames == 0 {
            return Err(HostError::Inference("frame count must be positive".into()));
        }

        let key = prompt_key(prompt);
        // 0.3 .. 1.3 cycles per 30 frames
        let tempo = 0.3 + (key % 1000) as f32 / 1000.0;
        let omega = TAU * tempo / 30.0;

        let agents = [-1.0f32, 1.0].map(|side| {
            let phases: Vec<[f32; 3]> = (0..NUM_JOINTS)
                .map(|_| [rng.random::<f32>() * TAU, rng.random::<f32>() * TAU, rng.random::<f32>() * TAU])
                .collect();

            let poses = (0..frames)
                .map(|t| {
                    let progress = if frames > 1 { t as f32 / (frames - 1) as f32 } else { 0.0 };
                    let root_x = side * (START_OFFSET - APPROACH * progress);
                    let mut pose = [[0.0f32; 3]; NUM_JOINTS];
                    for j in 0..NUM_JOINTS {
                        for c in 0..3 {
                            let wave = (omega * t as f32 + phases[j][c]).sin();
                            let jitter = (rng.random::<f32>() - 0.5) * 2.0 * JITTER;
                            let mut v = self.rest_pose[j][c] + self.amplitude[j][c] * wave + jitter;
                            // agents face each other across the x axis
                            if c == 0 {
                                v = root_x - side * v;
                            }
                            pose[j][c] = v;
                        }
                    }
                    pose
                })
                .collect();

            MotionSequence::new(poses)
        });

        Ok(agents)
    }
}

fn pose_from_tensor(key: &str, tensor: &Tensor) -> Result<Pose> {
    if tensor.shape != [NUM_JOINTS, 3] || tensor.data.len() != NUM_JOINTS * 3 {
        return Err(HostError::Checkpoint(format!(
            "{key}: expected shape [{NUM_JOINTS}, 3], got {:?}",
            tensor.shape
        )));
    }
    let mut pose = [[0.0f32; 3]; NUM_JOINTS];
    for (j, chunk) in tensor.data.chunks_exact(3).enumerate() {
        pose[j] = [chunk[0], chunk[1], chunk[2]];
    }
    Ok(pose)
}

/// FNV-1a over the prompt bytes.
fn prompt_key(prompt: &str) -> u64 {
    prompt.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ b as u64).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

/// Standing pose, y up, meters.
const REST_POSE: Pose = [
    [0.0, 0.95, 0.0],    // pelvis
    [0.08, 0.88, 0.0],   // left hip
    [-0.08, 0.88, 0.0],  // right hip
    [0.0, 1.05, 0.0],    // spine
    [0.09, 0.5, 0.0],    // left knee
    [-0.09, 0.5, 0.0],   // right knee
    [0.0, 1.18, 0.0],    // chest
    [0.09, 0.08, 0.0],   // left ankle
    [-0.09, 0.08, 0.0],  // right ankle
    [0.0, 1.3, 0.0],     // upper chest
    [0.09, 0.02, 0.1],   // left foot
    [-0.09, 0.02, 0.1],  // right foot
    [0.0, 1.5, 0.0],     // neck
    [0.07, 1.42, 0.0],   // left collar
    [-0.07, 1.42, 0.0],  // right collar
    [0.0, 1.65, 0.0],    // head
    [0.18, 1.42, 0.0],   // left shoulder
    [-0.18, 1.42, 0.0],  // right shoulder
    [0.42, 1.42, 0.0],   // left elbow
    [-0.42, 1.42, 0.0],  // right elbow
    [0.65, 1.42, 0.0],   // left wrist
    [-0.65, 1.42, 0.0],  // right wrist
];

fn default_amplitude() -> Pose {
    let mut amplitude = [[0.02f32; 3]; NUM_JOINTS];
    for j in [4, 5, 7, 8, 10, 11] {
        amplitude[j] = [0.03, 0.08, 0.12];
    }
    for j in [18, 19, 20, 21] {
        amplitude[j] = [0.08, 0.2, 0.15];
    }
    amplitude
}
