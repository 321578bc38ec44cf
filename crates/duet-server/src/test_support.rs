//! Fixtures shared by the server tests.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use rand_chacha::ChaCha8Rng;
use duet_model::checkpoint::{LoadReport, StateDict};
use duet_model::model::ReferenceModel;
use duet_model::{Device, ModelHost, MotionModel, MotionPair, MotionSequence, RenderError, Result, VideoRenderer};

pub const FAKE_VIDEO_LEN: usize = 200 * 1024;

pub fn write_configs(dir: &Path, model_json: &str) -> (PathBuf, PathBuf) {
    let model = dir.join("model.json");
    let infer = dir.join("infer.json");
    std::fs::write(&model, model_json).unwrap();
    std::fs::write(&infer, r#"{"fps": 30, "smoothing_sigma": 1.0}"#).unwrap();
    (model, infer)
}

/// Reference model that counts its `generate` calls.
struct CountingModel {
    calls: Arc<AtomicUsize>,
    inner: ReferenceModel,
}

impl MotionModel for CountingModel {
    fn name(&self) -> &str {
        "counting"
    }

    fn supports_device(&self, device: Device) -> bool {
        self.inner.supports_device(device)
    }

    fn load_state_dict(&mut self, state: StateDict) -> Result<LoadReport> {
        self.inner.load_state_dict(state)
    }

    fn generate(&mut self, prompt: &str, frames: usize, rng: &mut ChaCha8Rng) -> Result<[MotionSequence; 2]> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.generate(prompt, frames, rng)
    }
}

pub fn counting_host(model: PathBuf, infer: PathBuf) -> (Arc<ModelHost>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let host = ModelHost::with_factory(model, infer, move |_| {
        Ok(Box::new(CountingModel {
            calls: counter.clone(),
            inner: ReferenceModel::default(),
        }) as Box<dyn MotionModel>)
    });
    (Arc::new(host), calls)
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Write,
    Silent,
    Fail,
}

/// Stands in for ffmpeg. Writes [`FAKE_VIDEO_LEN`] bytes and records how
/// many renders overlapped.
pub struct FakeRenderer {
    outcome: Outcome,
    delay: Duration,
    active: Arc<AtomicUsize>,
    pub peak: Arc<AtomicUsize>,
}

impl Default for FakeRenderer {
    fn default() -> Self {
        Self {
            outcome: Outcome::Write,
            delay: Duration::ZERO,
            active: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl FakeRenderer {
    pub fn silent() -> Self {
        Self { outcome: Outcome::Silent, ..Self::default() }
    }

    pub fn failing() -> Self {
        Self { outcome: Outcome::Fail, ..Self::default() }
    }

    pub fn slow(delay: Duration) -> Self {
        Self { delay, ..Self::default() }
    }
}

impl VideoRenderer for FakeRenderer {
    fn render(&self, motion: &MotionPair, _caption: &str, output: &Path) -> std::result::Result<(), RenderError> {
        let running = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.active.fetch_sub(1, Ordering::SeqCst);

        assert!(motion.frame_count() > 0);
        match self.outcome {
            Outcome::Write => std::fs::write(output, vec![b'v'; FAKE_VIDEO_LEN])?,
            Outcome::Silent => {}
            Outcome::Fail => return Err(RenderError::Encoder("boom".into())),
        }
        Ok(())
    }
}
