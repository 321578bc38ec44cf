//! Text to video: validate, run the model, render, hand back the file.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{info, warn};
use duet_core::schemas::GenerateMotionRequest;
use duet_core::{FrameCount, SeedPolicy};
use duet_model::{HostError, ModelHost, RenderError, VideoRenderer};
use crate::artifact::{ArtifactGuard, ArtifactStore};

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("{0}")]
    Validation(String),

    /// The model is not (or not yet) loaded.
    #[error("Model not loaded")]
    ServiceUnavailable,

    #[error(transparent)]
    Inference(HostError),

    #[error(transparent)]
    Render(#[from] RenderError),

    /// Rendering reported success but left no file behind.
    #[error("artifact missing at {}", .0.display())]
    ArtifactMissing(PathBuf),

    #[error("results directory: {0}")]
    Io(#[from] io::Error),

    #[error("generation task failed: {0}")]
    Internal(String),
}

impl From<HostError> for GenerationError {
    fn from(e: HostError) -> Self {
        match e {
            HostError::NotReady => Self::ServiceUnavailable,
            other => Self::Inference(other),
        }
    }
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub frames: FrameCount,
    pub seed: SeedPolicy,
}

impl GenerationRequest {
    pub fn validate(body: GenerateMotionRequest) -> Result<Self, GenerationError> {
        let seed = body.seed_policy();
        let prompt = body.text.trim();
        if prompt.is_empty() {
            return Err(GenerationError::Validation("text must not be empty".into()));
        }

        let frames = match body.num_frames {
            Some(n) => FrameCount::new(n).map_err(GenerationError::Validation)?,
            None => FrameCount::default(),
        };

        Ok(Self {
            prompt: prompt.to_string(),
            frames,
            seed,
        })
    }
}

pub struct GenerationService {
    host: Arc<ModelHost>,
    store: ArtifactStore,
    renderer: Arc<dyn VideoRenderer>,
    permits: Arc<Semaphore>,
    lazy_load: bool,
}

impl GenerationService {
    pub fn new(
        host: Arc<ModelHost>,
        store: ArtifactStore,
        renderer: Arc<dyn VideoRenderer>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            host,
            store,
            renderer,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            lazy_load: false,
        }
    }

    /// Load the model on the first request that needs it instead of at startup.
    pub fn with_lazy_load(mut self, lazy_load: bool) -> Self {
        self.lazy_load = lazy_load;
        self
    }

    pub fn host(&self) -> &Arc<ModelHost> {
        &self.host
    }

    /// Run one generation to completion. On success the returned guard owns
    /// a file that exists on disk; dropping it deletes the file.
    ///
    /// The guard and the inference permit are owned by the blocking task and
    /// released when it ends, even if this future was dropped.
    pub async fn generate(&self, request: GenerationRequest) -> Result<ArtifactGuard, GenerationError> {
        self.ensure_ready().await?;

        let guard = ArtifactGuard::new(self.store.allocate()?);
        let task_id = guard.artifact().task_id;
        info!(%task_id, frames = request.frames.get(), seed = %request.seed, "generating motion for {:?}", request.prompt);

        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| GenerationError::Internal("inference queue closed".into()))?;

        let started = Instant::now();
        let host = self.host.clone();
        let renderer = self.renderer.clone();
        let guard = tokio::task::spawn_blocking(move || -> Result<ArtifactGuard, GenerationError> {
            let _permit = permit;
            let motion = host.run_inference(&request.prompt, request.frames.get() as usize, request.seed)?;
            renderer.render(&motion, &request.prompt, &guard.artifact().path)?;
            if !guard.artifact().exists() {
                return Err(GenerationError::ArtifactMissing(guard.artifact().path.clone()));
            }
            Ok(guard)
        })
        .await
        .map_err(|e| GenerationError::Internal(e.to_string()))??;

        info!(%task_id, elapsed_ms = started.elapsed().as_millis() as u64, "motion video ready");
        Ok(guard)
    }

    async fn ensure_ready(&self) -> Result<(), GenerationError> {
        if self.host.is_ready() {
            return Ok(());
        }

        if self.lazy_load {
            let host = self.host.clone();
            let loaded = tokio::task::spawn_blocking(move || host.initialize())
                .await
                .map_err(|e| GenerationError::Internal(e.to_string()))?;
            if let Err(e) = loaded {
                warn!("model load failed: {e}");
            }
        }

        if self.host.is_ready() {
            Ok(())
        } else {
            Err(GenerationError::ServiceUnavailable)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use crate::test_support::{counting_host, write_configs, FakeRenderer};

    fn service(dir: &std::path::Path, host: Arc<ModelHost>, renderer: FakeRenderer) -> GenerationService {
        GenerationService::new(host, ArtifactStore::new(dir.join("results")), Arc::new(renderer), 1)
    }

    fn request(text: &str) -> GenerationRequest {
        GenerationRequest::validate(GenerateMotionRequest::new(text)).unwrap()
    }

    #[test]
    fn test_validate() {
        let req = request("  two people shake hands ");
        assert_eq!(req.prompt, "two people shake hands");
        assert_eq!(req.frames.get(), 210);
        assert_eq!(req.seed, SeedPolicy::Random);

        let mut body = GenerateMotionRequest::new("wave");
        body.num_frames = Some(20);
        body.seed = Some(5);
        let req = GenerationRequest::validate(body).unwrap();
        assert_eq!(req.frames.get(), 20);
        assert_eq!(req.seed, SeedPolicy::Fixed(5));

        assert!(matches!(
            GenerationRequest::validate(GenerateMotionRequest::new("   ")),
            Err(GenerationError::Validation(_))
        ));

        let mut body = GenerateMotionRequest::new("wave");
        body.num_frames = Some(5);
        assert!(matches!(GenerationRequest::validate(body), Err(GenerationError::Validation(_))));
    }

    #[tokio::test]
    async fn test_generate_writes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let (model, infer) = write_configs(dir.path(), "{}");
        let host = Arc::new(ModelHost::new(model, infer));
        host.initialize().unwrap();

        let service = service(dir.path(), host, FakeRenderer::default());
        let guard = service.generate(request("two people bow")).await.unwrap();
        let artifact = guard.artifact().clone();

        assert!(artifact.exists());
        assert!(artifact.path.starts_with(dir.path().join("results")));
        drop(guard);
        assert!(!artifact.exists());
    }

    #[tokio::test]
    async fn test_not_loaded_runs_no_inference() {
        let dir = tempfile::tempdir().unwrap();
        let (model, infer) = write_configs(dir.path(), r#"{"checkpoint": "missing.safetensors"}"#);
        let (host, calls) = counting_host(model, infer);
        assert!(host.initialize().is_err());

        let service = service(dir.path(), host, FakeRenderer::default());
        let err = service.generate(request("hug")).await.unwrap_err();

        assert!(matches!(err, GenerationError::ServiceUnavailable));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_lazy_load_on_first_request() {
        let dir = tempfile::tempdir().unwrap();
        let (model, infer) = write_configs(dir.path(), "{}");
        let (host, calls) = counting_host(model, infer);

        let service = service(dir.path(), host.clone(), FakeRenderer::default()).with_lazy_load(true);
        assert!(!host.is_ready());
        service.generate(request("spin")).await.unwrap();

        assert!(host.is_ready());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_render_that_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (model, infer) = write_configs(dir.path(), "{}");
        let host = Arc::new(ModelHost::new(model, infer));
        host.initialize().unwrap();

        let service = service(dir.path(), host, FakeRenderer::silent());
        let err = service.generate(request("clap")).await.unwrap_err();
        assert!(matches!(err, GenerationError::ArtifactMissing(_)));
    }

    #[tokio::test]
    async fn test_render_failure_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let (model, infer) = write_configs(dir.path(), "{}");
        let host = Arc::new(ModelHost::new(model, infer));
        host.initialize().unwrap();

        let service = service(dir.path(), host, FakeRenderer::failing());
        let err = service.generate(request("clap")).await.unwrap_err();

        assert!(matches!(err, GenerationError::Render(_)));
        let leftovers = std::fs::read_dir(dir.path().join("results")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_inference_is_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let (model, infer) = write_configs(dir.path(), "{}");
        let host = Arc::new(ModelHost::new(model, infer));
        host.initialize().unwrap();

        let renderer = FakeRenderer::slow(Duration::from_millis(50));
        let peak = renderer.peak.clone();
        let service = Arc::new(service(dir.path(), host, renderer));

        let tasks: Vec<_> = (0..4)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move { service.generate(request(&format!("dance {i}"))).await })
            })
            .collect();
        let mut paths = Vec::new();
        for task in tasks {
            paths.push(task.await.unwrap().unwrap().artifact().path.clone());
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_abandoned_request_cleans_up_and_holds_permit() {
        let dir = tempfile::tempdir().unwrap();
        let (model, infer) = write_configs(dir.path(), "{}");
        let host = Arc::new(ModelHost::new(model, infer));
        host.initialize().unwrap();

        let renderer = FakeRenderer::slow(Duration::from_millis(400));
        let peak = renderer.peak.clone();
        let service = Arc::new(service(dir.path(), host, renderer));

        let abandoned = {
            let service = service.clone();
            tokio::spawn(async move { service.generate(request("two people wrestle")).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        abandoned.abort();
        assert!(abandoned.await.unwrap_err().is_cancelled());

        let next = service.generate(request("two people bow")).await.unwrap();
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        drop(next);

        tokio::time::sleep(Duration::from_millis(100)).await;
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("results")).unwrap().collect();
        assert!(leftovers.is_empty(), "leftover files: {leftovers:?}");
    }

    #[test]
    fn test_not_ready_maps_to_unavailable() {
        assert!(matches!(GenerationError::from(HostError::NotReady), GenerationError::ServiceUnavailable));
        assert!(matches!(
            GenerationError::from(HostError::Inference("nan".into())),
            GenerationError::Inference(_)
        ));
    }
}
