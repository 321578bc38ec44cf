//! Joint-position sequences and temporal smoothing.

/// Joints per body.
pub const NUM_JOINTS: usize = 22;

pub type Joint = [f32; 3];
pub type Pose = [Joint; NUM_JOINTS];

/// One agent's joint positions over time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MotionSequence {
    pub frames: Vec<Pose>,
}

impl MotionSequence {
    pub fn new(frames: Vec<Pose>) -> Self {
        Self { frames }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn is_finite(&self) -> bool {
        self.frames
            .iter()
            .flat_map(|pose| pose.iter())
            .flat_map(|joint| joint.iter())
            .all(|v| v.is_finite())
    }

    /// Gaussian-smooth every joint coordinate along the time axis.
    ///
    /// Samples past either end replicate the boundary frame. `sigma <= 0`
    /// returns the sequence unchanged.
    pub fn smoothed(&self, sigma: f32) -> Self {
        if sigma <= 0.0 || self.frames.len() < 2 {
            return self.clone();
        }

        let kernel = gaussian_kernel(sigma);
        let radius = (kernel.len() / 2) as isize;
        let last = self.frames.len() as isize - 1;

        let frames = (0..self.frames.len() as isize)
            .map(|t| {
                let mut pose = [[0.0f32; 3]; NUM_JOINTS];
                for (k, weight) in kernel.iter().enumerate() {
                    let src = (t + k as isize - radius).clamp(0, last) as usize;
                    for (j, joint) in self.frames[src].iter().enumerate() {
                        for c in 0..3 {
                            pose[j][c] += weight * joint[c];
                        }
                    }
                }
                pose
            })
            .collect();

        Self { frames }
    }
}

/// Both agents of one generated interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionPair {
    pub agents: [MotionSequence; 2],
    pub fps: u32,
}

impl MotionPair {
    pub fn frame_count(&self) -> usize {
        self.agents[0].len().min(self.agents[1].len())
    }
}

/// Normalized Gaussian weights truncated at four standard deviations.
pub fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (4.0 * sigma + 0.5) as i32;
    let denom = 2.0 * sigma * sigma;
    let mut weights: Vec<f32> = (-radius..=radius)
        .map(|x| (-((x * x) as f32) / denom).exp())
        .collect();
    let sum: f32 = weights.iter().sum();
    for w in &mut weights {
        *w /= sum;
    }
    weights
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize) -> MotionSequence {
        let frames = (0..len)
            .map(|t| [[t as f32, 1.0, -(t as f32)]; NUM_JOINTS])
            .collect();
        MotionSequence::new(frames)
    }

    #[test]
    fn test_kernel_is_normalized_and_symmetric() {
        let kernel = gaussian_kernel(1.0);
        assert_eq!(kernel.len(), 9);
        assert!((kernel.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        for i in 0..kernel.len() / 2 {
            assert!((kernel[i] - kernel[kernel.len() - 1 - i]).abs() < 1e-7);
        }
    }

    #[test]
    fn test_smoothing_keeps_linear_interior() {
        let seq = ramp(30);
        let smooth = seq.smoothed(1.0);
        assert_eq!(smooth.len(), 30);
        for t in 5..25 {
            assert!((smooth.frames[t][0][0] - t as f32).abs() < 1e-4);
            assert!((smooth.frames[t][7][1] - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_edges_replicate_boundary() {
        let smooth = ramp(30).smoothed(1.0);
        // replicated zeros on the left pull the first frame no lower than 0
        assert!(smooth.frames[0][0][0] > 0.0);
        assert!(smooth.frames[0][0][0] < 1.0);
        assert!(smooth.frames[29][0][0] < 29.0);
    }

    #[test]
    fn test_smoothing_damps_spike() {
        let mut frames = vec![[[0.0f32; 3]; NUM_JOINTS]; 21];
        frames[10][3][2] = 1.0;
        let smooth = MotionSequence::new(frames).smoothed(1.0);
        assert!(smooth.frames[10][3][2] < 0.5);
        assert!(smooth.frames[9][3][2] > 0.0);
        assert!((smooth.frames[9][3][2] - smooth.frames[11][3][2]).abs() < 1e-7);
    }

    #[test]
    fn test_non_finite_detection() {
        let mut seq = ramp(3);
        assert!(seq.is_finite());
        seq.frames[1][4][0] = f32::NAN;
        assert!(!seq.is_finite());
    }
}
