//! Question classification and direct structural answers.

mod handlers;
pub mod snippets;

use std::sync::LazyLock;

use regex::Regex;
use repolens_index::SourceFile;

use crate::facts::RepositoryFacts;
use crate::response::AnswerResponse;

/// What a question is about. The first matching rule wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryClassification {
    FileSpecific(String),
    Function(String),
    Class(String),
    Import(String),
    Summary,
    General,
}

impl QueryClassification {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::FileSpecific(_) => "file",
            Self::Function(_) => "function",
            Self::Class(_) => "class",
            Self::Import(_) => "import",
            Self::Summary => "summary",
            Self::General => "general",
        }
    }
}

struct Rule {
    pattern: Regex,
    build: fn(String) -> QueryClassification,
}

impl Rule {
    fn new(pattern: &str, build: fn(String) -> QueryClassification) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("routing regex is valid"),
            build,
        }
    }

    fn apply(&self, question: &str) -> Option<QueryClassification> {
        let caps = self.pattern.captures(question)?;
        let target = caps.get(2).map_or("", |m| m.as_str()).to_owned();
        Some((self.build)(target))
    }
}

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        Rule::new(
            r#"(file|in|about)\s+['"]?([a-zA-Z0-9_\-./]+\.[a-zA-Z0-9]+)['"]?"#,
            QueryClassification::FileSpecific,
        ),
        Rule::new(
            r#"(function|method)\s+['"]?([a-zA-Z0-9_]+)['"]?"#,
            QueryClassification::Function,
        ),
        Rule::new(
            r#"(class)\s+['"]?([a-zA-Z0-9_]+)['"]?"#,
            QueryClassification::Class,
        ),
        Rule::new(
            r#"(import|library|module|package)\s+['"]?([a-zA-Z0-9_\-.]+)['"]?"#,
            QueryClassification::Import,
        ),
        Rule::new(r"(summarize|summary|overview|explain|structure)", |_| {
            QueryClassification::Summary
        }),
    ]
});

#[must_use]
pub fn classify(question: &str) -> QueryClassification {
    RULES
        .iter()
        .find_map(|rule| rule.apply(question))
        .unwrap_or(QueryClassification::General)
}

/// Where a question should be answered.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// Answered from structural facts alone.
    Direct(AnswerResponse),
    /// Needs retrieval and generation; `with_overview` prepends the
    /// repository summary to the prompt.
    Retrieval { with_overview: bool },
}

/// Dispatches questions to direct lookups or the retrieval pipeline.
pub struct QueryRouter<'a> {
    facts: &'a RepositoryFacts,
    files: &'a [SourceFile],
}

impl<'a> QueryRouter<'a> {
    #[must_use]
    pub fn new(facts: &'a RepositoryFacts, files: &'a [SourceFile]) -> Self {
        Self { facts, files }
    }

    #[must_use]
    pub fn route(&self, question: &str) -> Route {
        let classification = classify(question);
        tracing::debug!(kind = classification.label(), ?classification, "question routed");

        let lookup = handlers::Lookup::new(self.facts, self.files);
        match classification {
            QueryClassification::FileSpecific(path) => {
                Route::Direct(lookup.file_question(question, &path))
            }
            QueryClassification::Function(name) => Route::Direct(lookup.function(&name)),
            QueryClassification::Class(name) => Route::Direct(lookup.class(&name)),
            QueryClassification::Import(library) => Route::Direct(lookup.library(&library)),
            QueryClassification::Summary => lookup
                .summary(question)
                .map_or(Route::Retrieval { with_overview: true }, Route::Direct),
            QueryClassification::General => Route::Retrieval {
                with_overview: false,
            },
        }
    }
}
