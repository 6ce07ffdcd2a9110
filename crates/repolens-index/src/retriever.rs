//! Chunk, embed, and search one repository's files.

use std::sync::{Arc, RwLock};
use std::time::Instant;

use repolens_llm::LlmProvider;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::chunker::{ChunkStrategy, CodeChunk, LinePrefixChunker};
use crate::embedder::Embedder;
use crate::error::{IndexError, Result};
use crate::source::SourceFile;
use crate::vector_index::{FlatL2Index, VectorIndex};

/// Default number of chunks returned by [`Retriever::search`].
pub const DEFAULT_TOP_K: usize = 5;

/// `(chunk, squared L2 distance)` pairs, nearest first.
pub type RetrievalResult = Vec<(CodeChunk, f32)>;

/// Summary of a completed index build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub files: usize,
    pub chunks: usize,
    pub dimension: Option<usize>,
    pub duration_ms: u64,
}

/// Published snapshot: chunk `i` is vector `i` in the index.
struct IndexState {
    chunks: Vec<CodeChunk>,
    index: FlatL2Index,
}

pub struct Retriever<P: LlmProvider> {
    embedder: Embedder<P>,
    chunker: Arc<dyn ChunkStrategy>,
    state: RwLock<Option<Arc<IndexState>>>,
    build_lock: Mutex<()>,
}

impl<P: LlmProvider> Retriever<P> {
    #[must_use]
    pub fn new(embedder: Embedder<P>) -> Self {
        Self::with_chunker(embedder, Arc::new(LinePrefixChunker::default()))
    }

    #[must_use]
    pub fn with_chunker(embedder: Embedder<P>, chunker: Arc<dyn ChunkStrategy>) -> Self {
        Self {
            embedder,
            chunker,
            state: RwLock::new(None),
            build_lock: Mutex::new(()),
        }
    }

    /// Replace the index with one built from `files`.
    ///
    /// The previous state is dropped before any work starts, so a failed
    /// build leaves the retriever empty.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding fails or vectors disagree on dimension.
    pub async fn build(&self, files: &[SourceFile]) -> Result<BuildReport> {
        let _guard = self.build_lock.lock().await;
        self.build_locked(files).await
    }

    /// Build only if nothing has been published yet.
    ///
    /// Returns `None` when an index already exists. Concurrent callers wait
    /// for the first build instead of starting their own.
    ///
    /// # Errors
    ///
    /// Returns an error if the build runs and fails.
    pub async fn ensure_built(&self, files: &[SourceFile]) -> Result<Option<BuildReport>> {
        let _guard = self.build_lock.lock().await;
        if self.snapshot()?.is_some() {
            return Ok(None);
        }
        self.build_locked(files).await.map(Some)
    }

    async fn build_locked(&self, files: &[SourceFile]) -> Result<BuildReport> {
        self.publish(None)?;
        let started = Instant::now();
        tracing::info!(files = files.len(), "index build started");

        let mut chunks: Vec<CodeChunk> = files
            .iter()
            .flat_map(|f| self.chunker.split(&f.path, &f.content))
            .collect();

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(IndexError::EmbeddingCount {
                expected: chunks.len(),
                actual: vectors.len(),
            });
        }
        for (chunk, vector) in chunks.iter_mut().zip(&vectors) {
            chunk.embedding = Some(vector.clone());
        }

        let mut index = FlatL2Index::new();
        index.build(vectors)?;
        let dimension = index.dimension();

        let report = BuildReport {
            files: files.len(),
            chunks: chunks.len(),
            dimension,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        self.publish(Some(Arc::new(IndexState { chunks, index })))?;

        tracing::info!(
            files = report.files,
            chunks = report.chunks,
            dimension = ?report.dimension,
            duration_ms = report.duration_ms,
            "index build finished"
        );
        Ok(report)
    }

    /// Top `k` chunks for `question`, nearest first.
    ///
    /// Returns an empty result when nothing is indexed.
    ///
    /// # Errors
    ///
    /// Returns an error if the question cannot be embedded.
    pub async fn search(&self, question: &str, k: usize) -> Result<RetrievalResult> {
        let Some(state) = self.snapshot()? else {
            return Ok(Vec::new());
        };
        if state.chunks.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query = self.embedder.embed_one(question).await?;
        let hits = state.index.query(&query, k)?;

        Ok(hits
            .into_iter()
            .filter_map(|(pos, dist)| state.chunks.get(pos).map(|c| (c.clone(), dist)))
            .collect())
    }

    /// Whether an index (possibly with zero chunks) has been published.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    pub fn is_built(&self) -> Result<bool> {
        Ok(self.snapshot()?.is_some())
    }

    /// Number of indexed chunks, zero when unbuilt.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    pub fn chunk_count(&self) -> Result<usize> {
        Ok(self.snapshot()?.map_or(0, |s| s.chunks.len()))
    }

    fn snapshot(&self) -> Result<Option<Arc<IndexState>>> {
        let guard = self
            .state
            .read()
            .map_err(|e| IndexError::Other(format!("index state lock poisoned: {e}")))?;
        Ok(guard.clone())
    }

    fn publish(&self, state: Option<Arc<IndexState>>) -> Result<()> {
        let mut guard = self
            .state
            .write()
            .map_err(|e| IndexError::Other(format!("index state lock poisoned: {e}")))?;
        *guard = state;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use repolens_llm::mock::MockProvider;
    use repolens_llm::{GenerationParams, LlmError, Message};

    use super::*;

    #[derive(Default)]
    struct FlakyEmbeddings {
        fail: AtomicBool,
    }

    impl LlmProvider for FlakyEmbeddings {
        async fn chat(
            &self,
            _: &[Message],
            _: GenerationParams,
        ) -> std::result::Result<String, LlmError> {
            Ok(String::new())
        }

        #[allow(clippy::cast_precision_loss)]
        async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, LlmError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(LlmError::Unavailable);
            }
            Ok(vec![text.len() as f32])
        }

        fn supports_embeddings(&self) -> bool {
            true
        }

        #[allow(clippy::unnecessary_literal_bound)]
        fn name(&self) -> &str {
            "flaky"
        }
    }

    fn retriever(provider: MockProvider) -> Retriever<MockProvider> {
        Retriever::new(Embedder::new(Arc::new(provider)))
    }

    fn hashed() -> MockProvider {
        MockProvider::default().with_hashed_embeddings(64)
    }

    fn repo() -> Vec<SourceFile> {
        vec![
            SourceFile::new(
                "app.py",
                "def foo():\n    return 1\n\ndef bar():\n    return 2\n",
            ),
            SourceFile::new(
                "config.py",
                "import os\n\nclass Settings:\n    path = os.getcwd()\n",
            ),
        ]
    }

    #[tokio::test]
    async fn search_before_build_is_empty() {
        let r = retriever(hashed());
        assert!(r.search("anything", DEFAULT_TOP_K).await.unwrap().is_empty());
        assert!(!r.is_built().unwrap());
    }

    #[tokio::test]
    async fn build_reports_counts() {
        let r = retriever(hashed());
        let report = r.build(&repo()).await.unwrap();
        assert_eq!(report.files, 2);
        assert_eq!(report.chunks, 4);
        assert_eq!(report.dimension, Some(64));
        assert_eq!(r.chunk_count().unwrap(), 4);
    }

    #[tokio::test]
    async fn search_ranks_matching_chunk_first() {
        let r = retriever(hashed());
        r.build(&repo()).await.unwrap();

        let hits = r.search("class Settings path", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0.file_path, "config.py");
        assert!(hits[0].1 <= hits[1].1);
        assert!(hits[0].0.embedding.is_some());
    }

    #[tokio::test]
    async fn search_k_larger_than_chunks() {
        let r = retriever(hashed());
        r.build(&repo()).await.unwrap();
        assert_eq!(r.search("foo", 50).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn rebuild_leaves_no_residue() {
        let r = retriever(hashed());
        r.build(&repo()).await.unwrap();
        r.build(&[SourceFile::new("only.py", "x = 1")]).await.unwrap();

        let hits = r.search("def foo", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0.file_path, "only.py");
    }

    #[tokio::test]
    async fn empty_files_yield_empty_search() {
        let r = retriever(hashed());
        let report = r.build(&[SourceFile::new("empty.py", "")]).await.unwrap();
        assert_eq!(report.chunks, 0);
        assert!(r.is_built().unwrap());
        assert!(r.search("anything", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_build_clears_previous_state() {
        let provider = Arc::new(FlakyEmbeddings::default());
        let r = Retriever::new(Embedder::new(Arc::clone(&provider)));
        r.build(&repo()).await.unwrap();
        assert!(r.is_built().unwrap());

        provider.fail.store(true, Ordering::SeqCst);
        assert!(r.build(&repo()).await.is_err());
        assert!(!r.is_built().unwrap());
        assert!(r.search("foo", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ensure_built_runs_once() {
        let r = retriever(hashed());
        assert!(r.ensure_built(&repo()).await.unwrap().is_some());
        assert!(r.ensure_built(&repo()).await.unwrap().is_none());
        assert_eq!(r.chunk_count().unwrap(), 4);
    }

    #[tokio::test]
    async fn concurrent_ensure_built_builds_once() {
        let r = Arc::new(retriever(hashed().with_delay(5)));
        let files = Arc::new(repo());
        let mut handles = Vec::new();
        for _ in 0..4 {
            let r = Arc::clone(&r);
            let files = Arc::clone(&files);
            handles.push(tokio::spawn(async move {
                r.ensure_built(&files).await.unwrap().is_some()
            }));
        }
        let mut built = 0;
        for h in handles {
            if h.await.unwrap() {
                built += 1;
            }
        }
        assert_eq!(built, 1);
    }
}
