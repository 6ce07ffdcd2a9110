//! Question-answering facade over the registry, router, and synthesizer.

use std::sync::Arc;

use repolens_index::{ContextComposer, Embedder, Retriever, SourceFile};
use repolens_llm::LlmProvider;
use serde::Serialize;

use crate::config::Config;
use crate::error::{CoreError, Result};
use crate::facts::analyze_repository;
use crate::registry::{RepositoryEntry, RepositoryRegistry};
use crate::response::AnswerResponse;
use crate::router::{QueryRouter, Route};
use crate::synthesizer::AnswerSynthesizer;

pub const UPLOAD_SUMMARY_QUESTION: &str = "What does this codebase do? Please provide a comprehensive summary explaining its purpose, main components, and how they work together.";

pub const DOC_QUESTIONS: [&str; 3] = [
    "What is the purpose of this file?",
    "What are the main functions or classes in this file?",
    "How does this file interact with other parts of the codebase?",
];

#[derive(Debug, Clone, Serialize)]
pub struct UploadReport {
    pub repo_id: String,
    pub files: Vec<String>,
    pub summary: String,
}

/// Generated notes for one file, plus the file with the notes prepended.
#[derive(Debug, Clone, Serialize)]
pub struct FileDocumentation {
    pub path: String,
    pub documentation: String,
    pub documented_content: String,
}

pub struct QaService<P: LlmProvider> {
    provider: Arc<P>,
    registry: RepositoryRegistry<P>,
    synthesizer: AnswerSynthesizer<P>,
    embed_batch_size: usize,
}

impl<P: LlmProvider> QaService<P> {
    #[must_use]
    pub fn new(provider: Arc<P>, config: &Config) -> Self {
        let synthesizer = AnswerSynthesizer::new(Arc::clone(&provider))
            .with_params(config.generation_params())
            .with_timeout(config.generation_timeout())
            .with_composer(ContextComposer::new(config.retrieval.max_context_chars))
            .with_top_k(config.retrieval.top_k);
        Self {
            provider,
            registry: RepositoryRegistry::new(config.idle_ttl()),
            synthesizer,
            embed_batch_size: config.retrieval.embed_batch_size,
        }
    }

    fn new_retriever(&self) -> Retriever<P> {
        Retriever::new(
            Embedder::new(Arc::clone(&self.provider)).with_batch_size(self.embed_batch_size),
        )
    }

    /// Register a repository, index it, and answer the overview question.
    ///
    /// A failed index build is not fatal: the summary comes back degraded and
    /// the next question retries the build.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyUpload`] when `files` is empty.
    pub async fn upload(&self, files: Vec<SourceFile>) -> Result<UploadReport> {
        if files.is_empty() {
            return Err(CoreError::EmptyUpload);
        }
        let facts = analyze_repository(&files);
        let entry = self
            .registry
            .register(files, facts, self.new_retriever())
            .await;
        tracing::info!(repo_id = %entry.id, files = entry.files.len(), "repository uploaded");

        if let Err(e) = entry.retriever.build(&entry.files).await {
            tracing::warn!(repo_id = %entry.id, "index build failed: {e}");
        }
        let summary = self
            .synthesizer
            .answer(
                &entry.retriever,
                &entry.files,
                UPLOAD_SUMMARY_QUESTION,
                Some(&entry.facts.summary),
            )
            .await
            .into_response();

        Ok(UploadReport {
            repo_id: entry.id.clone(),
            files: entry.files.iter().map(|f| f.path.clone()).collect(),
            summary: summary.answer,
        })
    }

    /// # Errors
    ///
    /// Returns [`CoreError::RepositoryNotFound`] for an unknown id.
    pub async fn repository(&self, repo_id: &str) -> Result<Arc<RepositoryEntry<P>>> {
        self.registry
            .get(repo_id)
            .await
            .ok_or_else(|| CoreError::RepositoryNotFound(repo_id.to_owned()))
    }

    /// Answer a question about an uploaded repository.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::RepositoryNotFound`] for an unknown id. Generation
    /// failures are reported in the answer, not as errors.
    pub async fn ask(&self, repo_id: &str, question: &str) -> Result<AnswerResponse> {
        let entry = self.repository(repo_id).await?;
        let route = QueryRouter::new(&entry.facts, &entry.files).route(question);
        let response = match route {
            Route::Direct(response) => response,
            Route::Retrieval { with_overview } => {
                let overview = with_overview.then_some(entry.facts.summary.as_str());
                self.synthesizer
                    .answer(&entry.retriever, &entry.files, question, overview)
                    .await
                    .into_response()
            }
        };
        Ok(response)
    }

    /// Document every file by asking [`DOC_QUESTIONS`] against that file alone.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::RepositoryNotFound`] for an unknown id.
    pub async fn generate_docs(&self, repo_id: &str) -> Result<Vec<FileDocumentation>> {
        let entry = self.repository(repo_id).await?;
        tracing::info!(repo_id, files = entry.files.len(), "generating documentation");

        let mut documented = Vec::with_capacity(entry.files.len());
        for file in &entry.files {
            let single = std::slice::from_ref(file);
            let retriever = self.new_retriever();
            let mut sections = Vec::with_capacity(DOC_QUESTIONS.len());
            for question in DOC_QUESTIONS {
                let response = self
                    .synthesizer
                    .answer(&retriever, single, question, None)
                    .await
                    .into_response();
                sections.push(format!("{question}\n{}\n", response.answer));
            }
            let documentation = sections.join("\n");
            tracing::debug!(file = %file.path, "file documented");
            documented.push(FileDocumentation {
                path: file.path.clone(),
                documented_content: format!("'''\n{documentation}\n'''\n\n{}", file.content),
                documentation,
            });
        }
        Ok(documented)
    }

    /// # Errors
    ///
    /// Returns [`CoreError::RepositoryNotFound`] for an unknown id.
    pub async fn remove(&self, repo_id: &str) -> Result<()> {
        if self.registry.remove(repo_id).await {
            tracing::info!(repo_id, "repository removed");
            Ok(())
        } else {
            Err(CoreError::RepositoryNotFound(repo_id.to_owned()))
        }
    }

    pub async fn evict_idle(&self) -> usize {
        self.registry.evict_idle().await
    }

    pub async fn repository_count(&self) -> usize {
        self.registry.len().await
    }
}
