#[cfg(feature = "mock")]
use crate::mock::MockProvider;
use crate::ollama::OllamaProvider;
use crate::openai::OpenAiProvider;

use crate::provider::{GenerationParams, LlmProvider, Message};

/// Generates a match over all `AnyProvider` variants, binding the inner provider
/// and evaluating the given closure for each arm.
macro_rules! delegate_provider {
    ($self:expr, |$p:ident| $expr:expr) => {
        match $self {
            AnyProvider::Ollama($p) => $expr,
            AnyProvider::OpenAi($p) => $expr,
            #[cfg(feature = "mock")]
            AnyProvider::Mock($p) => $expr,
        }
    };
}

#[derive(Debug, Clone)]
pub enum AnyProvider {
    Ollama(OllamaProvider),
    OpenAi(OpenAiProvider),
    #[cfg(feature = "mock")]
    Mock(MockProvider),
}

impl LlmProvider for AnyProvider {
    async fn chat(
        &self,
        messages: &[Message],
        params: GenerationParams,
    ) -> Result<String, crate::LlmError> {
        delegate_provider!(self, |p| p.chat(messages, params).await)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, crate::LlmError> {
        delegate_provider!(self, |p| p.embed(text).await)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, crate::LlmError> {
        delegate_provider!(self, |p| p.embed_batch(texts).await)
    }

    fn supports_embeddings(&self) -> bool {
        delegate_provider!(self, |p| p.supports_embeddings())
    }

    fn name(&self) -> &str {
        delegate_provider!(self, |p| p.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_ollama_name_and_embeddings() {
        let provider = AnyProvider::Ollama(OllamaProvider::new(
            "http://localhost:11434",
            "mistral:7b".into(),
            "nomic-embed-text".into(),
        ));
        assert_eq!(provider.name(), "ollama");
        assert!(provider.supports_embeddings());
    }

    #[test]
    fn any_openai_without_embedding_model() {
        let provider = AnyProvider::OpenAi(OpenAiProvider::new(
            "key".into(),
            "https://api.openai.com/v1".into(),
            "gpt-3.5-turbo".into(),
            None,
        ));
        assert_eq!(provider.name(), "openai");
        assert!(!provider.supports_embeddings());
    }

    #[test]
    fn any_provider_debug_hides_key() {
        let provider = AnyProvider::OpenAi(OpenAiProvider::new(
            "sk-secret".into(),
            "https://api.openai.com/v1".into(),
            "gpt-3.5-turbo".into(),
            None,
        ));
        let debug = format!("{provider:?}");
        assert!(debug.contains("OpenAi"));
        assert!(!debug.contains("sk-secret"));
    }

    #[tokio::test]
    async fn any_openai_chat_unreachable_errors() {
        let provider = AnyProvider::OpenAi(
            OpenAiProvider::new("k".into(), "http://127.0.0.1:1".into(), "m".into(), None)
                .with_max_retries(0),
        );
        let result = provider
            .chat(&[Message::user("hello")], GenerationParams::default())
            .await;
        assert!(result.is_err());
    }

    #[cfg(feature = "mock")]
    #[tokio::test]
    async fn any_mock_delegates() {
        let provider = AnyProvider::Mock(MockProvider::with_responses(vec!["hi".into()]));
        let out = provider
            .chat(&[Message::user("q")], GenerationParams::default())
            .await
            .unwrap();
        assert_eq!(out, "hi");
        assert_eq!(provider.name(), "mock");
    }
}
