//! Config path resolution and provider construction.

use std::path::{Path, PathBuf};

use anyhow::Context;
use repolens_llm::any::AnyProvider;
use repolens_llm::ollama::OllamaProvider;
use repolens_llm::openai::OpenAiProvider;

use crate::config::{Config, LlmConfig, ProviderKind};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OPENAI_CHAT_MODEL: &str = "gpt-3.5-turbo";
const OPENAI_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Priority: CLI `--config` > `REPOLENS_CONFIG` env > `config/default.toml`.
#[must_use]
pub fn resolve_config_path(cli: Option<&Path>) -> PathBuf {
    if let Some(path) = cli {
        return path.to_owned();
    }
    if let Ok(path) = std::env::var("REPOLENS_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}

/// # Errors
///
/// Returns an error if the openai provider is selected without an API key.
pub fn create_provider(config: &Config) -> anyhow::Result<AnyProvider> {
    let llm = &config.llm;
    match llm.provider {
        ProviderKind::Ollama => Ok(AnyProvider::Ollama(OllamaProvider::new(
            &llm.base_url,
            llm.model.clone(),
            llm.embedding_model.clone(),
        ))),
        ProviderKind::OpenAi => {
            let api_key = llm
                .api_key
                .clone()
                .filter(|k| !k.is_empty())
                .context("openai provider requires an API key")?;
            let (base_url, model, embedding_model) = openai_settings(llm);
            Ok(AnyProvider::OpenAi(OpenAiProvider::new(
                api_key,
                base_url,
                model,
                Some(embedding_model),
            )))
        }
    }
}

/// Ollama-flavoured defaults are swapped for their OpenAI counterparts.
fn openai_settings(llm: &LlmConfig) -> (String, String, String) {
    let defaults = LlmConfig::default();
    let pick = |value: &str, ollama_default: &str, openai: &str| {
        if value == ollama_default {
            openai.to_owned()
        } else {
            value.to_owned()
        }
    };
    (
        pick(&llm.base_url, &defaults.base_url, OPENAI_BASE_URL),
        pick(&llm.model, &defaults.model, OPENAI_CHAT_MODEL),
        pick(
            &llm.embedding_model,
            &defaults.embedding_model,
            OPENAI_EMBEDDING_MODEL,
        ),
    )
}
