use std::path::PathBuf;
use std::time::Duration;
use anyhow::{anyhow, Context};

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Server base address, without a trailing route
    pub api_url: String,
    pub output_dir: PathBuf,
    pub generate_timeout: Duration,
    pub translate_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8000".into(),
            output_dir: "outputs".into(),
            generate_timeout: Duration::from_secs(300),
            translate_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    pub fn load() -> anyhow::Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(anyhow!("failed to read .env: {e}"));
            }
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let secs = |key: &str, default: Duration| -> anyhow::Result<Duration> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .with_context(|| format!("{key}={raw:?} is not a number of seconds")),
                None => Ok(default),
            }
        };

        Ok(Self {
            api_url: lookup("DUET_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_url),
            output_dir: lookup("DUET_OUTPUT_DIR").map(PathBuf::from).unwrap_or(defaults.output_dir),
            generate_timeout: secs("DUET_GENERATE_TIMEOUT_SECS", defaults.generate_timeout)?,
            translate_timeout: secs("DUET_TRANSLATE_TIMEOUT_SECS", defaults.translate_timeout)?,
        })
    }
}
