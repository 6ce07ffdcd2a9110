//! Error types for repolens-index.

/// Errors that can occur while loading, embedding, or indexing code.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// IO error reading source files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory walk error.
    #[error("walk error: {0}")]
    Walk(#[from] ignore::Error),

    /// LLM provider error (embedding).
    #[error("LLM error: {0}")]
    Llm(#[from] repolens_llm::LlmError),

    /// A vector does not match the dimension fixed by the index.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The provider returned a different number of vectors than requested.
    #[error("expected {expected} embeddings, got {actual}")]
    EmbeddingCount { expected: usize, actual: usize },

    /// Generic catch-all error.
    #[error("{0}")]
    Other(String),
}

/// Result type alias using `IndexError`.
pub type Result<T> = std::result::Result<T, IndexError>;
