//! Answer payloads returned to callers.

use repolens_index::CodeChunk;
use serde::{Deserialize, Serialize};

/// One code reference backing an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub file: String,
    /// `"start-end"`, 1-based and inclusive.
    pub lines: String,
    pub content: String,
    /// Retrieval distance; `0.0` for exact structural matches.
    pub score: f32,
}

impl Source {
    #[must_use]
    pub fn from_chunk(chunk: &CodeChunk, score: f32) -> Self {
        Self {
            file: chunk.file_path.clone(),
            lines: chunk.line_range(),
            content: chunk.content.clone(),
            score,
        }
    }

    /// Source pointing at an exact structural match.
    #[must_use]
    pub fn exact(file: impl Into<String>, start: usize, end: usize, content: String) -> Self {
        Self {
            file: file.into(),
            lines: format!("{start}-{end}"),
            content,
            score: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub answer: String,
    pub sources: Vec<Source>,
    /// Always within `[0, 1]`.
    pub confidence: f32,
}

impl AnswerResponse {
    /// Direct lookup result: confident when something was found.
    #[must_use]
    pub fn direct(answer: impl Into<String>, sources: Vec<Source>) -> Self {
        let confidence = if sources.is_empty() { 0.0 } else { 1.0 };
        Self {
            answer: answer.into(),
            sources,
            confidence,
        }
    }

    /// Answer with no supporting references.
    #[must_use]
    pub fn not_found(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            sources: Vec::new(),
            confidence: 0.0,
        }
    }
}

/// Result at the synthesis boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Answered(AnswerResponse),
    /// Generation could not run; `cause` is shown to the user as the answer.
    Degraded { cause: String },
}

impl Outcome {
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    #[must_use]
    pub fn into_response(self) -> AnswerResponse {
        match self {
            Self::Answered(response) => response,
            Self::Degraded { cause } => AnswerResponse::not_found(cause),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_serializes_in_wire_shape() {
        let response = AnswerResponse {
            answer: "It adds numbers.".into(),
            sources: vec![Source::exact("app.py", 1, 3, "def add(a, b):".into())],
            confidence: 1.0,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "answer": "It adds numbers.",
                "sources": [{
                    "file": "app.py",
                    "lines": "1-3",
                    "content": "def add(a, b):",
                    "score": 0.0
                }],
                "confidence": 1.0
            })
        );
    }

    #[test]
    fn degraded_outcome_has_zero_confidence() {
        let response = Outcome::Degraded {
            cause: "Error generating answer: timeout".into(),
        }
        .into_response();
        assert_eq!(response.answer, "Error generating answer: timeout");
        assert!(response.sources.is_empty());
        assert!(response.confidence.abs() < f32::EPSILON);
    }

    #[test]
    fn direct_confidence_tracks_sources() {
        assert!((AnswerResponse::direct("none", vec![]).confidence).abs() < f32::EPSILON);
        let found = AnswerResponse::direct("one", vec![Source::exact("a.py", 1, 1, String::new())]);
        assert!((found.confidence - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn source_from_chunk_copies_range() {
        let chunk = CodeChunk {
            content: "def foo():".into(),
            file_path: "app.py".into(),
            start_line: 4,
            end_line: 6,
            embedding: None,
        };
        let source = Source::from_chunk(&chunk, 2.5);
        assert_eq!(source.lines, "4-6");
        assert!((source.score - 2.5).abs() < f32::EPSILON);
    }
}
