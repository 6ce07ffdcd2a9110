//! Line-based code excerpts used by direct answers.

use std::collections::BTreeSet;

use crate::facts::{ClassInfo, FunctionInfo};

/// A contiguous excerpt with 1-based inclusive line bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    pub start_line: usize,
    pub end_line: usize,
    pub code: String,
}

impl Snippet {
    fn from_lines(lines: &[&str], start: usize, end: usize) -> Option<Self> {
        let mut end = end.min(lines.len());
        while end > start + 1 && lines[end - 1].trim().is_empty() {
            end -= 1;
        }
        (start < end).then(|| Self {
            start_line: start + 1,
            end_line: end,
            code: lines[start..end].join("\n"),
        })
    }
}

/// Keep the first and last `max_lines / 2` lines around a `...` marker.
#[must_use]
pub fn truncate_code(content: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = content.split('\n').collect();
    if lines.len() <= max_lines {
        return content.to_owned();
    }
    let half = max_lines / 2;
    format!(
        "{}\n...\n{}",
        lines[..half].join("\n"),
        lines[lines.len() - half..].join("\n")
    )
}

/// Exclusive end of the indented block opened at `start`.
///
/// The block ends at the first non-blank line indented no deeper than the
/// opening line.
fn block_end(lines: &[&str], start: usize) -> usize {
    let opener = lines[start];
    let indent = opener.len() - opener.trim_start().len();
    let spaces = " ".repeat(indent + 1);
    let tabs = "\t".repeat(indent / 4 + 1);

    let mut end = start + 1;
    while end < lines.len() {
        let line = lines[end];
        if !line.trim().is_empty() && !line.starts_with(&spaces) && !line.starts_with(&tabs) {
            break;
        }
        end += 1;
    }
    end
}

/// The full definition starting at 1-based `line_number`.
#[must_use]
pub fn extract_block(content: &str, line_number: usize) -> Option<Snippet> {
    let lines: Vec<&str> = content.split('\n').collect();
    let start = line_number.saturating_sub(1);
    if start >= lines.len() {
        return None;
    }
    Snippet::from_lines(&lines, start, block_end(&lines, start))
}

/// Every listed definition with one leading line of context, blank-line separated.
///
/// Blocks shorter than `min_lines` are widened to `fallback` lines.
fn extract_definitions(
    content: &str,
    starts: impl Iterator<Item = usize>,
    min_lines: usize,
    fallback: usize,
) -> Option<Snippet> {
    let lines: Vec<&str> = content.split('\n').collect();
    let mut parts = Vec::new();
    let mut first = usize::MAX;
    let mut last = 0;

    for line_number in starts {
        let def = line_number.saturating_sub(1);
        if def >= lines.len() {
            continue;
        }
        let start = def.saturating_sub(1);
        let mut end = block_end(&lines, def);
        if end - start < min_lines {
            end = (start + fallback).min(lines.len());
        }
        if let Some(snippet) = Snippet::from_lines(&lines, start, end) {
            first = first.min(snippet.start_line);
            last = last.max(snippet.end_line);
            parts.push(snippet.code);
        }
    }

    (!parts.is_empty()).then(|| Snippet {
        start_line: first,
        end_line: last,
        code: parts.join("\n\n"),
    })
}

#[must_use]
pub fn extract_functions(content: &str, functions: &[FunctionInfo]) -> Option<Snippet> {
    extract_definitions(content, functions.iter().map(|f| f.line_number), 3, 15)
}

#[must_use]
pub fn extract_classes(content: &str, classes: &[ClassInfo]) -> Option<Snippet> {
    extract_definitions(content, classes.iter().map(|c| c.line_number), 5, 20)
}

/// Import, `from` and `require(` lines with one line of context on each side.
#[must_use]
pub fn extract_imports(content: &str) -> Option<Snippet> {
    let lines: Vec<&str> = content.split('\n').collect();
    let mut groups = Vec::new();
    let mut first = usize::MAX;
    let mut last = 0;

    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if trimmed.starts_with("import ") || trimmed.starts_with("from ") || trimmed.contains("require(")
        {
            let start = i.saturating_sub(1);
            let end = (i + 2).min(lines.len());
            first = first.min(start + 1);
            last = last.max(end);
            groups.push(lines[start..end].join("\n"));
        }
    }

    let code = groups.join("\n\n").trim().to_owned();
    (!code.is_empty()).then_some(Snippet {
        start_line: first,
        end_line: last,
        code,
    })
}

/// Indented tree of every directory and file path.
#[must_use]
pub fn directory_tree<'a>(paths: impl IntoIterator<Item = &'a str>) -> String {
    let mut entries: BTreeSet<String> = BTreeSet::new();
    for path in paths {
        let parts: Vec<&str> = path.split('/').collect();
        for depth in 1..parts.len() {
            entries.insert(parts[..depth].join("/"));
        }
        entries.insert(path.to_owned());
    }

    let mut tree = String::from("Repository structure:\n");
    for entry in &entries {
        let depth = entry.matches('/').count();
        let name = entry.rsplit('/').next().unwrap_or(entry);
        tree.push_str(&"  ".repeat(depth));
        if depth > 0 {
            tree.push_str("└─ ");
        }
        tree.push_str(name);
        tree.push('\n');
    }
    tree
}
