//! Prompt context rendering for retrieved chunks.

use std::fmt::Write;

use crate::chunker::CodeChunk;

const HEADER: &str = "Relevant code sections:\n\n";

/// Renders retrieved chunks as fenced, file-labelled sections.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextComposer {
    max_chars: Option<usize>,
}

impl ContextComposer {
    #[must_use]
    pub fn new(max_chars: Option<usize>) -> Self {
        Self { max_chars }
    }

    /// Render `hits` in the given (rank) order.
    ///
    /// With a character cap, sections are appended while the total stays
    /// within it; the first section that would overflow and every later one
    /// are dropped. The header is always present.
    #[must_use]
    pub fn compose(&self, hits: &[(CodeChunk, f32)]) -> String {
        let mut out = String::from(HEADER);
        for (idx, (chunk, _)) in hits.iter().enumerate() {
            let section = render_section(chunk);
            if let Some(cap) = self.max_chars
                && out.chars().count() + section.chars().count() > cap
            {
                tracing::debug!(
                    kept = idx,
                    dropped = hits.len() - idx,
                    cap,
                    "context cap reached"
                );
                break;
            }
            out.push_str(&section);
        }
        out
    }
}

fn render_section(chunk: &CodeChunk) -> String {
    let mut section = String::with_capacity(chunk.content.len() + 64);
    let _ = write!(
        section,
        "File: {} (Lines {}-{})\n```\n{}\n```\n\n",
        chunk.file_path, chunk.start_line, chunk.end_line, chunk.content
    );
    section
}
