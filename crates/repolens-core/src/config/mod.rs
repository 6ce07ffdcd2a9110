mod env;
mod types;


pub use types::*;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use repolens_llm::GenerationParams;

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to sensible defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if the resulting configuration is invalid.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid setting.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            bail!(
                "generation.temperature must be within [0, 2], got {}",
                self.generation.temperature
            );
        }
        if self.retrieval.top_k == 0 {
            bail!("retrieval.top_k must be greater than zero");
        }
        if self.retrieval.embed_batch_size == 0 {
            bail!("retrieval.embed_batch_size must be greater than zero");
        }
        if self.llm.provider == ProviderKind::OpenAi
            && self.llm.api_key.as_deref().is_none_or(str::is_empty)
        {
            bail!("openai provider requires an API key (REPOLENS_OPENAI_API_KEY or OPENAI_API_KEY)");
        }
        Ok(())
    }

    #[must_use]
    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            temperature: self.generation.temperature,
            max_tokens: self.generation.max_tokens,
        }
    }

    #[must_use]
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.generation_seconds)
    }

    /// Idle lifetime of a registered repository, `None` when eviction is off.
    #[must_use]
    pub fn idle_ttl(&self) -> Option<Duration> {
        (self.registry.idle_ttl_seconds > 0)
            .then(|| Duration::from_secs(self.registry.idle_ttl_seconds))
    }
}
