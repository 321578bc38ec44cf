use std::sync::Arc;
use duet_model::{FfmpegRenderer, ModelHost};
use crate::artifact::ArtifactStore;
use crate::config::ServerConfig;
use crate::generation::GenerationService;
use crate::translation::{TranslationProxy, Translator};

pub struct ServerState {
    generation: GenerationService,
    translator: Arc<dyn Translator>,
}

impl ServerState {
    pub fn new(generation: GenerationService, translator: Arc<dyn Translator>) -> Self {
        Self {
            generation,
            translator,
        }
    }

    /// Wire up the production services: ffmpeg rendering and the configured
    /// translation provider.
    pub fn from_config(config: &ServerConfig, host: Arc<ModelHost>) -> anyhow::Result<Self> {
        let renderer = FfmpegRenderer::new(&config.ffmpeg).with_size(config.video_width, config.video_height);
        let generation = GenerationService::new(
            host,
            ArtifactStore::new(&config.results_dir),
            Arc::new(renderer),
            config.max_concurrent_inference,
        )
        .with_lazy_load(!config.eager_load);
        let translator = TranslationProxy::new(config.translation.clone())?;

        Ok(Self::new(generation, Arc::new(translator)))
    }

    pub fn generation(&self) -> &GenerationService {
        &self.generation
    }

    pub fn translator(&self) -> &dyn Translator {
        self.translator.as_ref()
    }

    pub fn model_loaded(&self) -> bool {
        self.generation.host().is_ready()
    }
}
