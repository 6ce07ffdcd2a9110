//! Pattern-based structure extraction for the JavaScript family.

use std::sync::LazyLock;

use regex::Regex;

use super::{ClassInfo, FunctionInfo, ImportInfo, ImportKind};

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"import\s+(?:\{[^}]*\}|[^{][^;]*?)\s+from\s+['"]([^'"]+)['"]"#)
        .expect("import regex is valid")
});

static REQUIRE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:const|let|var)\s+([^=]+)\s*=\s*require\(['"]([^'"]+)['"]\)"#)
        .expect("require regex is valid")
});

static FUNCTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:function\s+([a-zA-Z_$][a-zA-Z0-9_$]*)\s*\(([^)]*)\)|(?:const|let|var)\s+([a-zA-Z_$][a-zA-Z0-9_$]*)\s*=\s*(?:function|\([^)]*\)\s*=>))",
    )
    .expect("function regex is valid")
});

static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"class\s+([a-zA-Z_$][a-zA-Z0-9_$]*)\s*(?:extends\s+([a-zA-Z_$][a-zA-Z0-9_$]*))?\s*\{",
    )
    .expect("class regex is valid")
});

static METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:async\s+)?([a-zA-Z_$][a-zA-Z0-9_$]*)\s*\([^)]*\)\s*\{")
        .expect("method regex is valid")
});

const NOT_METHODS: &[&str] = &["constructor", "if", "for", "while", "switch"];

#[derive(Debug, Default)]
pub(crate) struct ScriptFacts {
    pub functions: Vec<FunctionInfo>,
    pub classes: Vec<ClassInfo>,
    pub imports: Vec<ImportInfo>,
}

fn line_at(source: &str, offset: usize) -> usize {
    source[..offset].matches('\n').count() + 1
}

pub(crate) fn analyze(source: &str) -> ScriptFacts {
    let mut facts = ScriptFacts::default();

    for caps in IMPORT_RE.captures_iter(source) {
        let (Some(whole), Some(module)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        facts.imports.push(ImportInfo {
            kind: ImportKind::Import,
            module: module.as_str().to_owned(),
            name: module.as_str().to_owned(),
            alias: None,
            line_number: line_at(source, whole.start()),
        });
    }

    for caps in REQUIRE_RE.captures_iter(source) {
        let (Some(whole), Some(binding), Some(module)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        facts.imports.push(ImportInfo {
            kind: ImportKind::Require,
            module: module.as_str().to_owned(),
            name: binding.as_str().trim().to_owned(),
            alias: None,
            line_number: line_at(source, whole.start()),
        });
    }

    for caps in FUNCTION_RE.captures_iter(source) {
        let Some(whole) = caps.get(0) else { continue };
        let Some(name) = caps.get(1).or_else(|| caps.get(3)) else {
            continue;
        };
        let args = caps
            .get(2)
            .map(|a| {
                a.as_str()
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();
        facts.functions.push(FunctionInfo {
            name: name.as_str().to_owned(),
            line_number: line_at(source, whole.start()),
            args,
            ..FunctionInfo::default()
        });
    }

    for caps in CLASS_RE.captures_iter(source) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let body_start = whole.end() - 1;
        let body = balanced_braces(&source[body_start..]);
        let methods = METHOD_RE
            .captures_iter(body)
            .filter_map(|m| {
                let at = m.get(0)?.start();
                let method = m.get(1)?.as_str();
                (!NOT_METHODS.contains(&method)).then(|| FunctionInfo {
                    name: method.to_owned(),
                    line_number: line_at(source, body_start + at),
                    ..FunctionInfo::default()
                })
            })
            .collect();
        facts.classes.push(ClassInfo {
            name: name.as_str().to_owned(),
            line_number: line_at(source, whole.start()),
            docstring: String::new(),
            inheritance: caps
                .get(2)
                .map(|p| vec![p.as_str().to_owned()])
                .unwrap_or_default(),
            methods,
        });
    }

    facts
}

/// Text from the first `{` through its matching `}`, or to the end when unbalanced.
fn balanced_braces(text: &str) -> &str {
    let Some(start) = text.find('{') else {
        return "";
    };
    let mut depth = 0usize;
    for (i, c) in text[start..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return &text[start..=start + i];
                }
            }
            _ => {}
        }
    }
    &text[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "import React from 'react';
import { useState, useEffect } from \"react\";
const path = require('path');

function render(node, options) {
  return node;
}

const helper = (x) => x * 2;

class Widget extends Component {
  constructor(props) {
    super(props);
  }

  async load(id) {
    if (id) {
      return fetch(id);
    }
  }
}
";

    #[test]
    fn finds_es6_and_commonjs_imports() {
        let facts = analyze(SAMPLE);
        assert_eq!(facts.imports.len(), 3);
        assert_eq!(facts.imports[0].module, "react");
        assert_eq!(facts.imports[0].kind, ImportKind::Import);
        assert_eq!(facts.imports[1].line_number, 2);
        let req = &facts.imports[2];
        assert_eq!(req.kind, ImportKind::Require);
        assert_eq!(req.name, "path");
        assert_eq!(req.module, "path");
        assert_eq!(req.line_number, 3);
    }

    #[test]
    fn finds_declarations_and_bindings() {
        let facts = analyze(SAMPLE);
        let names: Vec<_> = facts.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["render", "helper"]);
        assert_eq!(facts.functions[0].args, vec!["node", "options"]);
        assert_eq!(facts.functions[0].line_number, 5);
        assert_eq!(facts.functions[1].line_number, 9);
    }

    #[test]
    fn class_methods_skip_constructor_and_keywords() {
        let facts = analyze(SAMPLE);
        assert_eq!(facts.classes.len(), 1);
        let widget = &facts.classes[0];
        assert_eq!(widget.name, "Widget");
        assert_eq!(widget.inheritance, vec!["Component"]);
        assert_eq!(widget.line_number, 11);
        let methods: Vec<_> = widget.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(methods, vec!["load"]);
        assert_eq!(widget.methods[0].line_number, 16);
    }

    #[test]
    fn unbalanced_braces_run_to_end() {
        assert_eq!(balanced_braces("x { a { b }"), "{ a { b }");
        assert_eq!(balanced_braces("{ a } tail"), "{ a }");
        assert_eq!(balanced_braces("none"), "");
    }
}
