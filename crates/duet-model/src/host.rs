//! The process-wide model handle.
//!
//! A [`ModelHost`] is created once by whoever serves requests and shared by
//! reference. Loading happens at most once: callers that arrive while a load
//! is running block on it, and a failed load is remembered rather than
//! retried. Inference is only possible after a successful load.

use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock, PoisonError};
use std::time::Instant;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};
use duet_core::SeedPolicy;
use crate::checkpoint::{load_checkpoint, rename_keys};
use crate::model::{build_model, MotionModel};
use crate::{Device, HostError, InferConfig, ModelConfig, MotionPair, Result};

type ModelFactory = Box<dyn Fn(&ModelConfig) -> Result<Box<dyn MotionModel>> + Send + Sync>;

enum InitState {
    Pending,
    Ready,
    Failed(HostError),
}

struct LoadedModel {
    model: Mutex<Box<dyn MotionModel>>,
    device: Device,
    checkpoint: Option<PathBuf>,
    infer: InferConfig,
}

pub struct ModelHost {
    model_config_path: PathBuf,
    infer_config_path: PathBuf,
    factory: ModelFactory,
    init: Mutex<InitState>,
    loaded: OnceLock<LoadedModel>,
}

impl ModelHost {
    pub fn new(model_config_path: impl Into<PathBuf>, infer_config_path: impl Into<PathBuf>) -> Self {
        Self::with_factory(model_config_path, infer_config_path, build_model)
    }

    /// Like [`ModelHost::new`] but constructs the model through `factory`
    /// instead of the built-in registry.
    pub fn with_factory<F>(
        model_config_path: impl Into<PathBuf>,
        infer_config_path: impl Into<PathBuf>,
        factory: F,
    ) -> Self
    where
        F: Fn(&ModelConfig) -> Result<Box<dyn MotionModel>> + Send + Sync + 'static,
    {
        Self {
            model_config_path: model_config_path.into(),
            infer_config_path: infer_config_path.into(),
            factory: Box::new(factory),
            init: Mutex::new(InitState::Pending),
            loaded: OnceLock::new(),
        }
    }

    /// Load the model. Blocking; run it off the async executor.
    pub fn initialize(&self) -> Result<()> {
        let mut state = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        match &*state {
            InitState::Ready => return Ok(()),
            InitState::Failed(e) => return Err(e.clone()),
            InitState::Pending => {}
        }

        let started = Instant::now();
        match self.load() {
            Ok(loaded) => {
                info!(
                    device = %loaded.device,
                    checkpoint = ?loaded.checkpoint,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "model loaded"
                );
                // only this branch ever sets it, under the init lock
                let _ = self.loaded.set(loaded);
                *state = InitState::Ready;
                Ok(())
            }
            Err(e) => {
                *state = InitState::Failed(e.clone());
                Err(e)
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.loaded.get().is_some()
    }

    pub fn device(&self) -> Option<Device> {
        self.loaded.get().map(|l| l.device)
    }

    pub fn infer_config(&self) -> Option<&InferConfig> {
        self.loaded.get().map(|l| &l.infer)
    }

    /// Generate one smoothed sequence per agent.
    ///
    /// A failure here, including a panic inside the model, leaves the host
    /// usable for the next call.
    pub fn run_inference(&self, prompt: &str, frames: usize, seed: SeedPolicy) -> Result<MotionPair> {
        let loaded = self.loaded.get().ok_or(HostError::NotReady)?;

        let seed = match seed {
            SeedPolicy::Fixed(seed) => seed,
            SeedPolicy::Random => rand::rng().random(),
        };
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let raw = {
            let mut model = loaded.model.lock().unwrap_or_else(PoisonError::into_inner);
            panic::catch_unwind(AssertUnwindSafe(|| model.generate(prompt, frames, &mut rng)))
                .map_err(|_| HostError::Inference("model panicked".into()))??
        };

        let sigma = loaded.infer.smoothing_sigma;
        let agents = raw.map(|agent| agent.smoothed(sigma));
        for agent in &agents {
            if agent.len() != frames {
                return Err(HostError::Inference(format!(
                    "model returned {} frames, expected {frames}",
                    agent.len()
                )));
            }
            if !agent.is_finite() {
                return Err(HostError::Inference("model produced non-finite joint positions".into()));
            }
        }

        Ok(MotionPair { agents, fps: loaded.infer.fps })
    }

    fn load(&self) -> Result<LoadedModel> {
        let config = ModelConfig::from_path(&self.model_config_path)?;
        let infer = InferConfig::from_path(&self.infer_config_path)?;
        let device = config.device()?;

        let mut model = (self.factory)(&config)?;
        if !model.supports_device(device) {
            return Err(HostError::Device(format!("{device} (model `{}`)", model.name())));
        }

        let mut checkpoint = None;
        if let Some(path) = &config.checkpoint {
            if path.exists() {
                let state = rename_keys(load_checkpoint(path)?, &config.checkpoint_prefix);
                let report = model.load_state_dict(state)?;
                info!(
                    path = %path.display(),
                    loaded = report.loaded.len(),
                    missing = ?report.missing,
                    unexpected = report.unexpected.len(),
                    "checkpoint applied"
                );
                checkpoint = Some(path.clone());
            } else if config.allow_uninitialized_weights {
                warn!(path = %path.display(), "checkpoint not found, running with built-in weights");
            } else {
                return Err(HostError::CheckpointMissing(path.clone()));
            }
        }

        Ok(LoadedModel {
            model: Mutex::new(model),
            device,
            checkpoint,
            infer,
        })
    }
}
