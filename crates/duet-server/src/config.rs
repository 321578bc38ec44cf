use std::fmt::Display;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use anyhow::anyhow;

const DEFAULT_TRANSLATE_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub results_dir: PathBuf,
    pub model_config: PathBuf,
    pub infer_config: PathBuf,
    /// Load the model before accepting connections instead of on first request
    pub eager_load: bool,
    /// Inference calls admitted at once; one per accelerator stream
    pub max_concurrent_inference: usize,
    pub ffmpeg: PathBuf,
    pub video_width: u32,
    pub video_height: u32,
    pub translation: TranslationConfig,
}

#[derive(Debug, Clone)]
pub struct TranslationConfig {
    /// Provider credential. Checked per call, absent is not a startup error
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl ServerConfig {
    /// Read `.env` if there is one, then the process environment.
    pub fn load() -> anyhow::Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(anyhow!("failed to read .env: {e}"));
            }
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let max_concurrent_inference: usize = parse_var(&lookup, "DUET_MAX_CONCURRENT_INFERENCE", 1)?;
        if max_concurrent_inference == 0 {
            return Err(anyhow!("DUET_MAX_CONCURRENT_INFERENCE must be at least 1"));
        }

        Ok(Self {
            host: parse_var(&lookup, "DUET_HOST", IpAddr::from([0, 0, 0, 0]))?,
            port: parse_var(&lookup, "PORT", 8000)?,
            results_dir: lookup("DUET_RESULTS_DIR").unwrap_or_else(|| "results".into()).into(),
            model_config: lookup("DUET_MODEL_CONFIG").unwrap_or_else(|| "configs/model.json".into()).into(),
            infer_config: lookup("DUET_INFER_CONFIG").unwrap_or_else(|| "configs/infer.json".into()).into(),
            eager_load: parse_var(&lookup, "DUET_EAGER_LOAD", true)?,
            max_concurrent_inference,
            ffmpeg: lookup("DUET_FFMPEG").unwrap_or_else(|| "ffmpeg".into()).into(),
            video_width: parse_var(&lookup, "DUET_VIDEO_WIDTH", 640)?,
            video_height: parse_var(&lookup, "DUET_VIDEO_HEIGHT", 480)?,
            translation: TranslationConfig {
                api_key: lookup("DASHSCOPE_API_KEY").filter(|key| !key.trim().is_empty()),
                base_url: lookup("DASHSCOPE_BASE_URL").unwrap_or_else(|| DEFAULT_TRANSLATE_BASE_URL.into()),
                model: lookup("DUET_TRANSLATE_MODEL").unwrap_or_else(|| "qwen-mt-flash".into()),
                timeout: Duration::from_secs(parse_var(&lookup, "DUET_TRANSLATE_TIMEOUT_SECS", 30)?),
            },
        })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{key}={raw:?} is invalid: {e}")),
        None => Ok(default),
    }
}
