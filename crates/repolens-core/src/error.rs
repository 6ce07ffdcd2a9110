//! Error types for repolens-core.

/// Errors surfaced by the question-answering service.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// No repository is registered under the given id.
    #[error("repository not found: {0}")]
    RepositoryNotFound(String),

    /// An upload contained no usable files.
    #[error("upload contains no files")]
    EmptyUpload,

    /// Indexing or retrieval failure.
    #[error("index error: {0}")]
    Index(#[from] repolens_index::IndexError),

    /// LLM provider failure.
    #[error("LLM error: {0}")]
    Llm(#[from] repolens_llm::LlmError),

    /// Generation exceeded its deadline.
    #[error("generation timed out after {0}s")]
    Timeout(u64),
}

/// Result type alias using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;
