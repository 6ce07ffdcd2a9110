//! Line-range chunking of source files.

use serde::{Deserialize, Serialize};

/// A contiguous range of lines from one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeChunk {
    pub content: String,
    pub file_path: String,
    /// First line, 1-based and inclusive.
    pub start_line: usize,
    /// Last line, inclusive.
    pub end_line: usize,
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
}

impl CodeChunk {
    /// `"start-end"` rendering used in answer sources.
    #[must_use]
    pub fn line_range(&self) -> String {
        format!("{}-{}", self.start_line, self.end_line)
    }
}

/// Splits one file into chunks that cover every line exactly once, in order.
pub trait ChunkStrategy: Send + Sync {
    fn split(&self, file_path: &str, content: &str) -> Vec<CodeChunk>;
}

/// Starts a new chunk at each line whose trimmed text begins with one of the
/// boundary prefixes, as long as the chunk in progress holds at least one
/// line. A boundary on the first line of a file opens the first chunk.
///
/// Only literal prefixes are recognized: `async def`, decorators, and
/// non-Python declarations do not open a chunk.
#[derive(Debug, Clone)]
pub struct LinePrefixChunker {
    prefixes: Vec<String>,
}

impl Default for LinePrefixChunker {
    fn default() -> Self {
        Self {
            prefixes: vec!["def ".into(), "class ".into()],
        }
    }
}

impl LinePrefixChunker {
    #[must_use]
    pub fn with_prefixes(prefixes: Vec<String>) -> Self {
        Self { prefixes }
    }

    fn is_boundary(&self, line: &str) -> bool {
        let trimmed = line.trim_start();
        self.prefixes.iter().any(|p| trimmed.starts_with(p.as_str()))
    }
}

impl ChunkStrategy for LinePrefixChunker {
    fn split(&self, file_path: &str, content: &str) -> Vec<CodeChunk> {
        if content.is_empty() {
            return Vec::new();
        }

        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut start_line = 1;

        for (idx, line) in content.split('\n').enumerate() {
            let line_no = idx + 1;
            if self.is_boundary(line) && !current.is_empty() {
                chunks.push(CodeChunk {
                    content: current.join("\n"),
                    file_path: file_path.to_owned(),
                    start_line,
                    end_line: line_no - 1,
                    embedding: None,
                });
                current.clear();
                start_line = line_no;
            }
            current.push(line);
        }

        let end_line = start_line + current.len() - 1;
        chunks.push(CodeChunk {
            content: current.join("\n"),
            file_path: file_path.to_owned(),
            start_line,
            end_line,
            embedding: None,
        });

        tracing::debug!(file = file_path, chunks = chunks.len(), "chunked file");
        chunks
    }
}
