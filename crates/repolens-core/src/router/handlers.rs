use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;
use repolens_index::SourceFile;

use super::snippets::{
    directory_tree, extract_block, extract_classes, extract_functions, extract_imports,
    truncate_code,
};
use crate::facts::{ClassInfo, FunctionInfo, RepositoryFacts};
use crate::response::{AnswerResponse, Source};

static LANGUAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(python|javascript|typescript|html|css|java|ruby|go|rust)\b|(c\+\+)")
        .expect("language regex is valid")
});

const MAX_MATCHES: usize = 3;

fn display_language(word: &str) -> &'static str {
    match word.to_lowercase().as_str() {
        "python" => "Python",
        "javascript" => "JavaScript",
        "typescript" => "TypeScript",
        "html" => "HTML",
        "css" => "CSS",
        "java" => "Java",
        "ruby" => "Ruby",
        "go" => "Go",
        "rust" => "Rust",
        _ => "C++",
    }
}

fn whole_file(file: &SourceFile, max_lines: usize) -> Source {
    Source::exact(
        file.path.clone(),
        1,
        file.line_count(),
        truncate_code(&file.content, max_lines),
    )
}

pub(super) struct Lookup<'a> {
    facts: &'a RepositoryFacts,
    files: &'a [SourceFile],
}

impl<'a> Lookup<'a> {
    pub(super) fn new(facts: &'a RepositoryFacts, files: &'a [SourceFile]) -> Self {
        Self { facts, files }
    }

    /// Exact path, otherwise the only file whose path ends with `/{path}`.
    fn file(&self, path: &str) -> Option<&'a SourceFile> {
        if let Some(file) = self.files.iter().find(|f| f.path == path) {
            return Some(file);
        }
        let suffix = format!("/{path}");
        let mut candidates = self.files.iter().filter(|f| f.path.ends_with(&suffix));
        match (candidates.next(), candidates.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }

    fn content(&self, path: &str) -> Option<&'a str> {
        self.files
            .iter()
            .find(|f| f.path == path)
            .map(|f| f.content.as_str())
    }

    pub(super) fn file_question(&self, question: &str, path: &str) -> AnswerResponse {
        let Some(file) = self.file(path) else {
            return AnswerResponse::not_found(format!(
                "File '{path}' was not found in the repository."
            ));
        };
        let path = file.path.as_str();
        let functions = self.facts.functions_in(path);
        let classes = self.facts.classes_in(path);

        if question.contains("function") || question.contains("method") {
            let snippet = extract_functions(&file.content, functions);
            let answer = describe_functions(path, functions);
            AnswerResponse::direct(answer, snippet_sources(path, snippet))
        } else if question.contains("class") {
            let snippet = extract_classes(&file.content, classes);
            let answer = describe_classes(path, classes);
            AnswerResponse::direct(answer, snippet_sources(path, snippet))
        } else if question.contains("import") {
            let snippet = extract_imports(&file.content);
            AnswerResponse::direct(self.describe_imports(path), snippet_sources(path, snippet))
        } else {
            AnswerResponse::direct(self.describe_file(file), vec![whole_file(file, 30)])
        }
    }

    fn describe_imports(&self, path: &str) -> String {
        let mut answer = format!("File '{path}' imports the following:\n\n");
        for import in self.facts.imports_in(path) {
            let _ = writeln!(answer, "- {} (line {})", import.statement(), import.line_number);
        }
        answer
    }

    fn describe_file(&self, file: &SourceFile) -> String {
        let path = file.path.as_str();
        let functions = self.facts.functions_in(path);
        let classes = self.facts.classes_in(path);
        let (language, total_lines) = self
            .facts
            .file_summaries
            .get(path)
            .map_or(("Unknown", file.line_count()), |s| {
                (s.language.as_str(), s.total_lines)
            });

        let mut answer =
            format!("File '{path}' is a {language} file with {total_lines} lines of code.\n\n");
        answer.push_str("Statistics:\n");
        let _ = writeln!(answer, "- Functions: {}", functions.len());
        let _ = writeln!(answer, "- Classes: {}", classes.len());
        let _ = writeln!(answer, "- Imports: {}", self.facts.imports_in(path).len());

        if !functions.is_empty() || !classes.is_empty() {
            answer.push_str("\nMain Components:\n");
            for function in functions.iter().take(3) {
                let _ = writeln!(answer, "- Function: {}", function.name);
                push_doc(&mut answer, &function.docstring);
            }
            for class in classes.iter().take(3) {
                let _ = writeln!(answer, "- Class: {}", class.name);
                push_doc(&mut answer, &class.docstring);
            }
        }
        answer
    }

    pub(super) fn function(&self, name: &str) -> AnswerResponse {
        let needle = name.to_lowercase();
        let matches: Vec<(&String, &FunctionInfo)> = self
            .facts
            .functions
            .iter()
            .flat_map(|(path, fns)| fns.iter().map(move |f| (path, f)))
            .filter(|(_, f)| f.name.to_lowercase().contains(&needle))
            .collect();

        if matches.is_empty() {
            return AnswerResponse::not_found(format!(
                "No function named '{name}' found in the repository."
            ));
        }
        let sources = matches
            .iter()
            .take(MAX_MATCHES)
            .filter_map(|(path, f)| self.block_source(path, f.line_number))
            .collect();
        AnswerResponse::direct(
            format!("Found {} occurrences of function '{name}'.", matches.len()),
            sources,
        )
    }

    pub(super) fn class(&self, name: &str) -> AnswerResponse {
        let needle = name.to_lowercase();
        let matches: Vec<(&String, &ClassInfo)> = self
            .facts
            .classes
            .iter()
            .flat_map(|(path, classes)| classes.iter().map(move |c| (path, c)))
            .filter(|(_, c)| c.name.to_lowercase().contains(&needle))
            .collect();

        if matches.is_empty() {
            return AnswerResponse::not_found(format!(
                "No class named '{name}' found in the repository."
            ));
        }
        let sources = matches
            .iter()
            .take(MAX_MATCHES)
            .filter_map(|(path, c)| self.block_source(path, c.line_number))
            .collect();
        AnswerResponse::direct(
            format!("Found {} occurrences of class '{name}'.", matches.len()),
            sources,
        )
    }

    fn block_source(&self, path: &str, line_number: usize) -> Option<Source> {
        let block = extract_block(self.content(path)?, line_number)?;
        Some(Source::exact(path, block.start_line, block.end_line, block.code))
    }

    /// Where `library` is imported, plus definitions whose docs mention it.
    pub(super) fn library(&self, library: &str) -> AnswerResponse {
        let needle = library.to_lowercase();
        let mut files_using = 0usize;
        let mut imports = Vec::new();
        let mut functions = Vec::new();
        let mut classes = Vec::new();

        for (path, file_imports) in &self.facts.imports {
            let before = imports.len();
            imports.extend(
                file_imports
                    .iter()
                    .filter(|i| i.mentions(library))
                    .map(|i| (path, i.line_number)),
            );
            if imports.len() == before {
                continue;
            }
            files_using += 1;
            functions.extend(
                self.facts
                    .functions_in(path)
                    .iter()
                    .filter(|f| f.docstring.to_lowercase().contains(&needle))
                    .map(|f| (path, f.line_number)),
            );
            classes.extend(
                self.facts
                    .classes_in(path)
                    .iter()
                    .filter(|c| c.docstring.to_lowercase().contains(&needle))
                    .map(|c| (path, c.line_number)),
            );
        }

        if files_using == 0 {
            return AnswerResponse::not_found(format!(
                "The library '{library}' is not used in this repository."
            ));
        }

        let mut answer = format!("The library '{library}' is used in {files_using} files:\n\n");
        let _ = writeln!(answer, "Total imports: {}", imports.len());
        let _ = writeln!(answer, "Functions using the library: {}", functions.len());
        let _ = writeln!(answer, "Classes using the library: {}", classes.len());

        let mut sources = Vec::new();
        if let Some((path, line)) = imports.first()
            && let Some(source) = self.import_context(path, *line)
        {
            sources.push(source);
        }
        for (path, line) in [functions.first(), classes.first()].into_iter().flatten() {
            if let Some(source) = self.block_source(path, *line) {
                sources.push(source);
            }
        }
        AnswerResponse::direct(answer, sources)
    }

    /// The import line with one line before it and two after.
    fn import_context(&self, path: &str, line: usize) -> Option<Source> {
        let content = self.content(path)?;
        let lines: Vec<&str> = content.split('\n').collect();
        let start = line.saturating_sub(2);
        let end = (line + 2).min(lines.len());
        (start < end).then(|| Source::exact(path, start + 1, end, lines[start..end].join("\n")))
    }

    /// Language-filtered or structural overview, `None` when retrieval should answer.
    pub(super) fn summary(&self, question: &str) -> Option<AnswerResponse> {
        if let Some(caps) = LANGUAGE_RE.captures(question) {
            let word = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            let language = display_language(word);
            let matching: Vec<&SourceFile> = self
                .files
                .iter()
                .filter(|f| {
                    self.facts
                        .file_summaries
                        .get(&f.path)
                        .is_some_and(|s| s.language == language)
                })
                .collect();
            if matching.is_empty() {
                return Some(AnswerResponse::not_found(format!(
                    "No {language} files found in the repository."
                )));
            }
            let sources = matching
                .iter()
                .take(MAX_MATCHES)
                .map(|f| whole_file(f, 15))
                .collect();
            return Some(AnswerResponse::direct(
                format!("Found {} {language} files in the repository.", matching.len()),
                sources,
            ));
        }

        if question.contains("structure") {
            let tree = directory_tree(self.files.iter().map(|f| f.path.as_str()));
            let lines = tree.lines().count();
            return Some(AnswerResponse::direct(
                "Here's the overall structure of the repository:",
                vec![Source::exact("Directory Structure", 1, lines, tree)],
            ));
        }
        None
    }
}

fn push_doc(answer: &mut String, doc: &str) {
    if !doc.is_empty() {
        let _ = writeln!(answer, "  {}", doc.trim());
    }
}

fn snippet_sources(path: &str, snippet: Option<super::snippets::Snippet>) -> Vec<Source> {
    snippet
        .map(|s| vec![Source::exact(path, s.start_line, s.end_line, s.code)])
        .unwrap_or_default()
}

fn describe_functions(path: &str, functions: &[FunctionInfo]) -> String {
    let mut answer = format!(
        "File '{path}' contains {} functions/methods:\n\n",
        functions.len()
    );
    for function in functions {
        let _ = writeln!(answer, "- {}:", function.name);
        push_doc(&mut answer, &function.docstring);
        let _ = writeln!(answer, "  Args: {}", function.args.join(", "));
        if let Some(returns) = &function.returns {
            let _ = writeln!(answer, "  Returns: {returns}");
        }
        let _ = writeln!(answer, "  Complexity: {}\n", function.complexity);
    }
    answer
}

fn describe_classes(path: &str, classes: &[ClassInfo]) -> String {
    let mut answer = format!("File '{path}' contains {} classes:\n\n", classes.len());
    for class in classes {
        let _ = writeln!(answer, "- {}:", class.name);
        push_doc(&mut answer, &class.docstring);
        if !class.inheritance.is_empty() {
            let _ = writeln!(answer, "  Inherits from: {}", class.inheritance.join(", "));
        }
        let methods: Vec<&str> = class.methods.iter().map(|m| m.name.as_str()).collect();
        let _ = writeln!(answer, "  Methods: {}\n", methods.join(", "));
    }
    answer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::analyze_repository;

    fn repo() -> Vec<SourceFile> {
        vec![
            SourceFile::new(
                "app.py",
                "import requests\nfrom store import Store\n\n\ndef fetch_user(uid):\n    \"\"\"Fetch with requests.\"\"\"\n    return requests.get(uid)\n\n\ndef main():\n    fetch_user(1)\n",
            ),
            SourceFile::new(
                "pkg/store.py",
                "class Store(Base):\n    \"\"\"Keeps items.\"\"\"\n\n    def add(self, item):\n        pass\n",
            ),
            SourceFile::new("web/app.js", "const x = require('lodash');\n"),
        ]
    }

    fn with_lookup<T>(f: impl FnOnce(&Lookup<'_>) -> T) -> T {
        let files = repo();
        let facts = analyze_repository(&files);
        f(&Lookup::new(&facts, &files))
    }

    #[test]
    fn function_found_with_block() {
        let response = with_lookup(|l| l.function("fetch"));
        assert_eq!(response.answer, "Found 1 occurrences of function 'fetch'.");
        assert_eq!(response.sources.len(), 1);
        assert_eq!(response.sources[0].file, "app.py");
        assert_eq!(response.sources[0].lines, "5-7");
        assert!(response.sources[0].content.starts_with("def fetch_user(uid):"));
        assert!((response.confidence - 1.0).abs() < f32::EPSILON);
        assert!(response.sources[0].score.abs() < f32::EPSILON);
    }

    #[test]
    fn missing_class_is_not_found() {
        let response = with_lookup(|l| l.class("Nonexistent123"));
        assert_eq!(
            response.answer,
            "No class named 'Nonexistent123' found in the repository."
        );
        assert!(response.sources.is_empty());
        assert!(response.confidence.abs() < f32::EPSILON);
    }

    #[test]
    fn class_match_is_case_insensitive() {
        let response = with_lookup(|l| l.class("store"));
        assert_eq!(response.answer, "Found 1 occurrences of class 'store'.");
        assert_eq!(response.sources[0].file, "pkg/store.py");
        assert_eq!(response.sources[0].lines, "1-5");
    }

    #[test]
    fn unknown_file() {
        let response = with_lookup(|l| l.file_question("what is in nope.py", "nope.py"));
        assert_eq!(response.answer, "File 'nope.py' was not found in the repository.");
        assert!(response.sources.is_empty());
    }

    #[test]
    fn file_function_listing() {
        let response = with_lookup(|l| l.file_question("list the functions", "app.py"));
        assert!(response.answer.starts_with("File 'app.py' contains 2 functions/methods:\n\n"));
        assert!(response.answer.contains("- fetch_user:\n  Fetch with requests.\n  Args: uid\n  Complexity: 1\n\n"));
        assert_eq!(response.sources.len(), 1);
    }

    #[test]
    fn file_class_listing_resolves_suffix() {
        let response = with_lookup(|l| l.file_question("which class is here", "store.py"));
        assert!(response.answer.starts_with("File 'pkg/store.py' contains 1 classes:"));
        assert!(response.answer.contains("  Inherits from: Base\n  Methods: add\n"));
    }

    #[test]
    fn file_import_listing() {
        let response = with_lookup(|l| l.file_question("what does it import", "app.py"));
        assert_eq!(
            response.answer,
            "File 'app.py' imports the following:\n\n- import requests (line 1)\n- from store import Store (line 2)\n"
        );
    }

    #[test]
    fn file_overview() {
        let response = with_lookup(|l| l.file_question("tell me about it", "app.py"));
        assert!(response.answer.starts_with("File 'app.py' is a Python file with 12 lines of code.\n\n"));
        assert!(response.answer.contains("Statistics:\n- Functions: 2\n- Classes: 0\n- Imports: 2\n"));
        assert!(response.answer.contains("\nMain Components:\n- Function: fetch_user\n  Fetch with requests.\n- Function: main\n"));
        assert_eq!(response.sources[0].lines, "1-12");
    }

    #[test]
    fn library_usage() {
        let response = with_lookup(|l| l.library("requests"));
        assert_eq!(
            response.answer,
            "The library 'requests' is used in 1 files:\n\nTotal imports: 1\nFunctions using the library: 1\nClasses using the library: 0\n"
        );
        assert_eq!(response.sources.len(), 2);
        assert_eq!(response.sources[0].lines, "1-3");
        assert_eq!(response.sources[1].lines, "5-7");

        let missing = with_lookup(|l| l.library("django"));
        assert_eq!(missing.answer, "The library 'django' is not used in this repository.");
    }

    #[test]
    fn language_summary() {
        let response = with_lookup(|l| l.summary("summarize the python code")).unwrap();
        assert_eq!(response.answer, "Found 2 Python files in the repository.");
        assert_eq!(response.sources.len(), 2);

        let none = with_lookup(|l| l.summary("overview of the rust code")).unwrap();
        assert_eq!(none.answer, "No Rust files found in the repository.");
        assert!(none.sources.is_empty());
    }

    #[test]
    fn structure_summary() {
        let response = with_lookup(|l| l.summary("show the structure")).unwrap();
        assert_eq!(response.answer, "Here's the overall structure of the repository:");
        assert_eq!(response.sources[0].file, "Directory Structure");
        assert!(response.sources[0].content.contains("pkg\n  └─ store.py\n"));
    }

    #[test]
    fn plain_summary_defers_to_retrieval() {
        assert!(with_lookup(|l| l.summary("summarize this")).is_none());
    }
}
