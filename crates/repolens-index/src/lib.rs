//! Retrieval half of the repolens pipeline.
//!
//! Source files are split into line-range chunks, every chunk is embedded
//! through an [`repolens_llm::LlmProvider`], and the vectors are held in an
//! exact flat L2 index. [`retriever::Retriever`] ties these together and
//! [`context::ContextComposer`] renders the hits for the prompt.

pub mod chunker;
pub mod context;
pub mod embedder;
pub mod error;
pub mod languages;
pub mod retriever;
pub mod source;
pub mod vector_index;

pub use chunker::{ChunkStrategy, CodeChunk, LinePrefixChunker};
pub use context::ContextComposer;
pub use embedder::Embedder;
pub use error::{IndexError, Result};
pub use retriever::{BuildReport, RetrievalResult, Retriever};
pub use source::SourceFile;
pub use vector_index::{FlatL2Index, VectorIndex};
