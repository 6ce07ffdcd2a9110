//! Structural facts about an uploaded repository.
//!
//! Python files are parsed with tree-sitter; the JavaScript family is scanned
//! with patterns. Everything is keyed by the file's repository-relative path.

mod javascript;
mod python;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use repolens_index::SourceFile;
use repolens_index::languages::{self, is_javascript_family};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FunctionInfo {
    pub name: String,
    pub line_number: usize,
    pub args: Vec<String>,
    pub docstring: String,
    pub returns: Option<String>,
    pub is_async: bool,
    pub complexity: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClassInfo {
    pub name: String,
    pub line_number: usize,
    pub docstring: String,
    pub inheritance: Vec<String>,
    pub methods: Vec<FunctionInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    /// `import a.b [as c]`
    Import,
    /// `from m import n [as c]`
    From,
    /// `const x = require('m')`
    Require,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportInfo {
    pub kind: ImportKind,
    /// Source module; empty for a plain Python `import`.
    pub module: String,
    pub name: String,
    pub alias: Option<String>,
    pub line_number: usize,
}

impl ImportInfo {
    /// Render as a source-like statement, e.g. `from os import path as p`.
    #[must_use]
    pub fn statement(&self) -> String {
        let alias = self
            .alias
            .as_ref()
            .map(|a| format!(" as {a}"))
            .unwrap_or_default();
        match self.kind {
            ImportKind::Import if self.module.is_empty() => format!("import {}{alias}", self.name),
            ImportKind::Import => format!("import {} from '{}'", self.name, self.module),
            ImportKind::From => format!("from {} import {}{alias}", self.module, self.name),
            ImportKind::Require => format!("{} = require('{}')", self.name, self.module),
        }
    }

    /// Whether this import pulls in `library`, matched case-insensitively
    /// against the name and the module.
    #[must_use]
    pub fn mentions(&self, library: &str) -> bool {
        let needle = library.to_lowercase();
        self.name.to_lowercase().contains(&needle) || self.module.to_lowercase().contains(&needle)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileSummary {
    pub path: String,
    pub language: String,
    pub total_lines: usize,
    /// Lines that are neither blank nor `#` comments.
    pub code_lines: usize,
    pub size_bytes: usize,
}

impl FileSummary {
    fn of(file: &SourceFile) -> Self {
        Self {
            path: file.path.clone(),
            language: languages::language_name(&file.path).to_owned(),
            total_lines: file.line_count(),
            code_lines: file
                .content
                .split('\n')
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .count(),
            size_bytes: file.content.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Relationship {
    pub kind: String,
    pub target: String,
    pub line: usize,
}

/// Outgoing calls made by one function.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionCalls {
    pub file: String,
    pub function: String,
    pub calls: Vec<Relationship>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportantFile {
    pub path: String,
    pub reason: String,
    pub score: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RepositoryFacts {
    pub functions: BTreeMap<String, Vec<FunctionInfo>>,
    pub classes: BTreeMap<String, Vec<ClassInfo>>,
    pub imports: BTreeMap<String, Vec<ImportInfo>>,
    pub file_summaries: BTreeMap<String, FileSummary>,
    pub dependencies: BTreeMap<String, BTreeSet<String>>,
    pub relationships: Vec<FunctionCalls>,
    pub languages: BTreeMap<String, usize>,
    pub entry_points: Vec<String>,
    pub files_count: usize,
    pub total_lines: usize,
    pub summary: String,
}

/// Analyze every file and render the repository summary.
#[must_use]
pub fn analyze_repository(files: &[SourceFile]) -> RepositoryFacts {
    let mut facts = RepositoryFacts {
        files_count: files.len(),
        ..RepositoryFacts::default()
    };

    for file in files {
        let summary = FileSummary::of(file);
        facts.total_lines += summary.total_lines;
        *facts.languages.entry(summary.language.clone()).or_default() += 1;

        if summary.language == "Python" {
            facts.add_python(file);
        } else if is_javascript_family(&summary.language) {
            let script = javascript::analyze(&file.content);
            facts.insert_nonempty(&file.path, script.functions, script.classes, script.imports);
        }
        facts.file_summaries.insert(file.path.clone(), summary);
    }

    facts.entry_points = facts
        .imports
        .iter()
        .filter(|(_, imports)| (1..=2).contains(&imports.len()))
        .map(|(path, _)| path.clone())
        .collect();
    facts.summary = facts.render_summary();

    tracing::debug!(
        files = facts.files_count,
        languages = facts.languages.len(),
        entry_points = facts.entry_points.len(),
        "repository analyzed"
    );
    facts
}

impl RepositoryFacts {
    fn add_python(&mut self, file: &SourceFile) {
        let Some(py) = python::analyze(&file.path, &file.content) else {
            return;
        };
        if !py.dependencies.is_empty() {
            self.dependencies
                .entry(file.path.clone())
                .or_default()
                .extend(py.dependencies);
        }
        for (function, calls) in py.calls {
            if let Some(existing) = self
                .relationships
                .iter_mut()
                .find(|r| r.file == file.path && r.function == function)
            {
                existing.calls.extend(calls);
            } else {
                self.relationships.push(FunctionCalls {
                    file: file.path.clone(),
                    function,
                    calls,
                });
            }
        }
        self.insert_nonempty(&file.path, py.functions, py.classes, py.imports);
    }

    fn insert_nonempty(
        &mut self,
        path: &str,
        functions: Vec<FunctionInfo>,
        classes: Vec<ClassInfo>,
        imports: Vec<ImportInfo>,
    ) {
        if !functions.is_empty() {
            self.functions.insert(path.to_owned(), functions);
        }
        if !classes.is_empty() {
            self.classes.insert(path.to_owned(), classes);
        }
        if !imports.is_empty() {
            self.imports.insert(path.to_owned(), imports);
        }
    }

    /// Most frequent language, ties broken alphabetically.
    #[must_use]
    pub fn main_language(&self) -> &str {
        self.languages
            .iter()
            .fold(None::<(&String, usize)>, |best, (lang, &count)| match best {
                Some((_, c)) if c >= count => best,
                _ => Some((lang, count)),
            })
            .map_or(languages::UNKNOWN, |(lang, _)| lang.as_str())
    }

    #[must_use]
    pub fn functions_in(&self, path: &str) -> &[FunctionInfo] {
        self.functions.get(path).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn classes_in(&self, path: &str) -> &[ClassInfo] {
        self.classes.get(path).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn imports_in(&self, path: &str) -> &[ImportInfo] {
        self.imports.get(path).map_or(&[], Vec::as_slice)
    }

    /// Files ranked by size, definitions and imports, highest first.
    #[must_use]
    pub fn important_files(&self) -> Vec<ImportantFile> {
        #[allow(clippy::cast_precision_loss)]
        let mut ranked: Vec<ImportantFile> = self
            .file_summaries
            .values()
            .map(|summary| {
                let path = summary.path.as_str();
                let functions = self.functions_in(path).len();
                let classes = self.classes_in(path).len();
                let size = summary.code_lines as f64 / 100.0;
                let fn_score = functions as f64 * 2.0;
                let class_score = classes as f64 * 3.0;
                let import_score = self.imports_in(path).len() as f64 * 1.5;

                let lower = path.to_lowercase();
                let reason = if fn_score > class_score && fn_score > size {
                    format!("Contains {functions} functions")
                } else if class_score > fn_score && class_score > size {
                    format!("Contains {classes} classes")
                } else if lower.contains("main") || lower.contains("app") {
                    "Main application file".to_owned()
                } else if path.ends_with("__init__.py") {
                    "Module initialization file".to_owned()
                } else if import_score > fn_score && import_score > class_score {
                    "Key dependency hub".to_owned()
                } else {
                    "Important file".to_owned()
                };

                ImportantFile {
                    path: path.to_owned(),
                    reason,
                    score: size + fn_score + class_score + import_score,
                }
            })
            .collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked
    }

    fn render_summary(&self) -> String {
        let mut out = format!(
            "This is a {} repository containing {} files with a total of {} lines of code.",
            self.main_language(),
            self.files_count,
            self.total_lines
        );

        if self.languages.len() > 1 {
            out.push_str("\n\nLanguage Distribution:");
            for (lang, count) in &self.languages {
                let _ = write!(out, "\n- {lang}: {count} files");
            }
        }

        out.push_str("\n\nMain Components:");
        for (path, classes) in &self.classes {
            for class in classes.iter().filter(|c| !c.docstring.is_empty()) {
                let _ = write!(out, "\n\n- {} (in {path}):\n  {}", class.name, class.docstring.trim());
                if class.methods.is_empty() {
                    continue;
                }
                out.push_str("\n  Key methods:");
                for method in class.methods.iter().take(3) {
                    if !method.docstring.is_empty() {
                        let _ = write!(out, "\n  - {}: {}", method.name, method.docstring.trim());
                    }
                }
            }
        }

        let all_deps: BTreeSet<&String> = self.dependencies.values().flatten().collect();
        if !all_deps.is_empty() {
            out.push_str("\n\nKey Dependencies:");
            for dep in all_deps.into_iter().take(5) {
                let _ = write!(out, "\n- {dep}");
            }
        }

        if !self.entry_points.is_empty() {
            out.push_str("\n\nEntry Points:");
            for entry in &self.entry_points {
                let _ = write!(out, "\n- {entry}");
            }
        }

        if !self.relationships.is_empty() {
            out.push_str("\n\nKey Code Relationships:");
            for component in self.relationships.iter().take(3) {
                let _ = write!(out, "\n\n{} (in {}):", component.function, component.file);
                for rel in component.calls.iter().take(3) {
                    let _ = write!(out, "\n- {} {} at line {}", rel.kind, rel.target, rel.line);
                }
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> Vec<SourceFile> {
        vec![
            SourceFile::new(
                "app.py",
                "import os\nfrom store import Store\n\n\ndef main():\n    \"\"\"Run it.\"\"\"\n    s = Store()\n    return run(s)\n",
            ),
            SourceFile::new(
                "store.py",
                "# storage\nclass Store:\n    \"\"\"Keeps items.\"\"\"\n\n    def add(self, item):\n        \"\"\"Add one item.\"\"\"\n        pass\n",
            ),
            SourceFile::new("web/index.js", "const fs = require('fs');\nfunction start() {}\n"),
            SourceFile::new("README.md", "# readme\n"),
        ]
    }

    #[test]
    fn collects_per_file_facts() {
        let facts = analyze_repository(&repo());
        assert_eq!(facts.files_count, 4);
        assert_eq!(facts.functions_in("app.py")[0].name, "main");
        assert_eq!(facts.classes_in("store.py")[0].methods[0].name, "add");
        assert_eq!(facts.imports_in("web/index.js")[0].name, "fs");
        assert!(facts.functions_in("README.md").is_empty());
        assert_eq!(facts.languages["Python"], 2);
        assert_eq!(facts.main_language(), "Python");
    }

    #[test]
    fn file_summary_counts_code_lines() {
        let facts = analyze_repository(&repo());
        let store = &facts.file_summaries["store.py"];
        assert_eq!(store.language, "Python");
        assert_eq!(store.total_lines, 8);
        assert_eq!(store.code_lines, 5);
    }

    #[test]
    fn entry_points_have_one_or_two_imports() {
        let facts = analyze_repository(&repo());
        assert_eq!(facts.entry_points, vec!["app.py", "web/index.js"]);
    }

    #[test]
    fn dependencies_and_relationships() {
        let facts = analyze_repository(&repo());
        let deps: Vec<_> = facts.dependencies["app.py"].iter().cloned().collect();
        assert_eq!(deps, vec!["os", "store"]);
        assert_eq!(facts.relationships.len(), 1);
        assert_eq!(facts.relationships[0].function, "main");
        assert_eq!(facts.relationships[0].calls[1].target, "run");
    }

    #[test]
    fn summary_text_sections() {
        let facts = analyze_repository(&repo());
        let s = &facts.summary;
        assert!(s.starts_with(
            "This is a Python repository containing 4 files with a total of"
        ));
        assert!(s.contains("Language Distribution:\n- JavaScript: 1 files"));
        assert!(s.contains("- Store (in store.py):\n  Keeps items.\n  Key methods:\n  - add: Add one item."));
        assert!(s.contains("Key Dependencies:\n- os\n- store"));
        assert!(s.contains("Entry Points:\n- app.py\n- web/index.js"));
        assert!(s.contains("main (in app.py):\n- calls Store at line 7\n- calls run at line 8"));
    }

    #[test]
    fn empty_repository_is_unknown() {
        let facts = analyze_repository(&[]);
        assert_eq!(facts.main_language(), "Unknown");
        assert!(facts.summary.starts_with("This is a Unknown repository containing 0 files"));
        assert!(facts.important_files().is_empty());
    }

    #[test]
    fn main_language_ties_break_alphabetically() {
        let files = vec![
            SourceFile::new("a.py", "x = 1\n"),
            SourceFile::new("b.js", "let y = 2;\n"),
        ];
        assert_eq!(analyze_repository(&files).main_language(), "JavaScript");
    }

    #[test]
    fn important_files_ranked_with_reasons() {
        let facts = analyze_repository(&repo());
        let ranked = facts.important_files();
        assert_eq!(ranked.len(), 4);
        assert_eq!(ranked[0].path, "app.py");
        assert_eq!(ranked[0].reason, "Contains 1 functions");
        let store = ranked.iter().find(|f| f.path == "store.py").unwrap();
        assert_eq!(store.reason, "Contains 1 classes");
        let readme = ranked.iter().find(|f| f.path == "README.md").unwrap();
        assert_eq!(readme.reason, "Important file");
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn import_statement_rendering() {
        let facts = analyze_repository(&repo());
        let app = facts.imports_in("app.py");
        assert_eq!(app[0].statement(), "import os");
        assert_eq!(app[1].statement(), "from store import Store");
        assert!(app[1].mentions("store"));
        assert_eq!(
            facts.imports_in("web/index.js")[0].statement(),
            "fs = require('fs')"
        );
    }
}
