//! Retrieval-augmented answer generation.

use std::sync::Arc;
use std::time::Duration;

use repolens_index::{ContextComposer, Retriever, SourceFile};
use repolens_llm::{GenerationParams, LlmProvider, Message};

use crate::error::{CoreError, Result};
use crate::response::{AnswerResponse, Outcome, Source};

pub const SYSTEM_PROMPT: &str = r#"You are an expert code analysis assistant. Your task is to provide different types of responses based on the question:

For high-level overview questions (e.g., "what does X file do?"):
- Provide a concise, high-level summary of the file's purpose and main functionality
- Focus on the big picture and key components
- Keep it brief and avoid technical details unless specifically asked

For specific library/function questions (e.g., "what does X library do?"):
- Explain the library's purpose and main functionality
- Reference specific lines where it's imported and used
- Show code snippets in a code editor style format:
  ```python
  # Example code snippet
  def example():
      pass
  ```
- Explain how it integrates with other parts of the codebase

For implementation details (e.g., "how does X work?"):
- Break down the code into understandable parts
- Reference specific lines and show relevant code snippets
- Explain the logic and flow
- Highlight important patterns or design decisions

Always:
- Be clear and concise
- Use appropriate technical terms
- Format code snippets nicely
- Reference specific lines when discussing implementation details
- Provide context when relevant"#;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Confidence for a top match at squared distance `distance`.
#[must_use]
pub fn confidence_for(distance: f32) -> f32 {
    (1.0 / (1.0 + distance.max(0.0))).clamp(0.0, 1.0)
}

#[must_use]
pub fn user_prompt(context: &str, question: &str, overview: Option<&str>) -> String {
    let mut prompt = String::new();
    if let Some(summary) = overview.filter(|s| !s.is_empty()) {
        prompt.push_str("Repository overview:\n");
        prompt.push_str(summary);
        prompt.push_str("\n\n");
    }
    prompt.push_str("Context:\n");
    prompt.push_str(context);
    prompt.push_str("\n\nQuestion: ");
    prompt.push_str(question);
    prompt.push_str(
        "\n\nPlease analyze the code and provide an appropriate response based on the question type.",
    );
    prompt
}

/// Turns retrieved chunks into a generated answer.
pub struct AnswerSynthesizer<P: LlmProvider> {
    provider: Arc<P>,
    composer: ContextComposer,
    params: GenerationParams,
    timeout: Duration,
    top_k: usize,
}

impl<P: LlmProvider> AnswerSynthesizer<P> {
    #[must_use]
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            composer: ContextComposer::default(),
            params: GenerationParams::default(),
            timeout: DEFAULT_TIMEOUT,
            top_k: repolens_index::retriever::DEFAULT_TOP_K,
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_composer(mut self, composer: ContextComposer) -> Self {
        self.composer = composer;
        self
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Answer `question` from `retriever`, building its index from `files`
    /// first if needed.
    ///
    /// Never fails: any embedding, provider, or timeout error becomes
    /// [`Outcome::Degraded`].
    pub async fn answer(
        &self,
        retriever: &Retriever<P>,
        files: &[SourceFile],
        question: &str,
        overview: Option<&str>,
    ) -> Outcome {
        match self.try_answer(retriever, files, question, overview).await {
            Ok(response) => Outcome::Answered(response),
            Err(e) => {
                tracing::warn!(provider = self.provider.name(), "answer degraded: {e}");
                Outcome::Degraded {
                    cause: format!("Error generating answer: {e}"),
                }
            }
        }
    }

    async fn try_answer(
        &self,
        retriever: &Retriever<P>,
        files: &[SourceFile],
        question: &str,
        overview: Option<&str>,
    ) -> Result<AnswerResponse> {
        retriever.ensure_built(files).await?;
        let hits = retriever.search(question, self.top_k).await?;
        let context = self.composer.compose(&hits);

        let messages = [
            Message::system(SYSTEM_PROMPT),
            Message::user(user_prompt(&context, question, overview)),
        ];
        let answer = tokio::time::timeout(self.timeout, self.provider.chat(&messages, self.params))
            .await
            .map_err(|_| CoreError::Timeout(self.timeout.as_secs()))??;

        let confidence = hits.first().map_or(0.0, |(_, d)| confidence_for(*d));
        let sources = hits
            .iter()
            .map(|(chunk, distance)| Source::from_chunk(chunk, *distance))
            .collect();
        Ok(AnswerResponse {
            answer,
            sources,
            confidence,
        })
    }
}
