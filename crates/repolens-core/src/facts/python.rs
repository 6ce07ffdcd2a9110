//! Python structure extraction with tree-sitter.

use tree_sitter::{Node, Parser};

use super::{ClassInfo, FunctionInfo, ImportInfo, ImportKind, Relationship};

const BRANCH_KINDS: &[&str] = &[
    "if_statement",
    "elif_clause",
    "while_statement",
    "for_statement",
    "except_clause",
    "boolean_operator",
];

/// Everything extracted from one Python file.
#[derive(Debug, Default)]
pub(crate) struct PythonFacts {
    pub functions: Vec<FunctionInfo>,
    pub classes: Vec<ClassInfo>,
    pub imports: Vec<ImportInfo>,
    pub dependencies: Vec<String>,
    /// `(function name, outgoing calls)` for functions that call something.
    pub calls: Vec<(String, Vec<Relationship>)>,
}

/// Parse `source`. Returns `None` when the file does not parse cleanly.
pub(crate) fn analyze(path: &str, source: &str) -> Option<PythonFacts> {
    let mut parser = Parser::new();
    if let Err(e) = parser.set_language(&tree_sitter_python::LANGUAGE.into()) {
        tracing::warn!("python grammar unavailable: {e}");
        return None;
    }
    let tree = parser.parse(source, None)?;
    let root = tree.root_node();
    if root.has_error() {
        tracing::warn!(file = path, "skipping python file with syntax errors");
        return None;
    }

    let mut facts = PythonFacts::default();
    for node in descendants(root) {
        match node.kind() {
            "import_statement" => collect_import(&node, source, &mut facts),
            "import_from_statement" | "future_import_statement" => {
                collect_from_import(&node, source, &mut facts);
            }
            "function_definition" => {
                let info = function_info(&node, source);
                let calls = call_sites(&node, source);
                if !calls.is_empty() {
                    facts.calls.push((info.name.clone(), calls));
                }
                facts.functions.push(info);
            }
            "class_definition" => facts.classes.push(class_info(&node, source)),
            _ => {}
        }
    }
    Some(facts)
}

/// Named nodes in pre-order (source order).
fn descendants(root: Node<'_>) -> Vec<Node<'_>> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        out.push(node);
        let count = u32::try_from(node.named_child_count()).unwrap_or(u32::MAX);
        for i in (0..count).rev() {
            if let Some(child) = node.named_child(i) {
                stack.push(child);
            }
        }
    }
    out
}

fn named_children<'t>(node: &Node<'t>) -> Vec<Node<'t>> {
    let count = u32::try_from(node.named_child_count()).unwrap_or(u32::MAX);
    (0..count).filter_map(|i| node.named_child(i)).collect()
}

fn text<'s>(node: &Node<'_>, source: &'s str) -> &'s str {
    &source[node.byte_range()]
}

fn line_of(node: &Node<'_>) -> usize {
    node.start_position().row + 1
}

fn field_text(node: &Node<'_>, field: &str, source: &str) -> Option<String> {
    node.child_by_field_name(field)
        .map(|n| text(&n, source).to_owned())
}

fn function_info(node: &Node<'_>, source: &str) -> FunctionInfo {
    FunctionInfo {
        name: field_text(node, "name", source).unwrap_or_default(),
        line_number: line_of(node),
        args: node
            .child_by_field_name("parameters")
            .map(|p| positional_args(&p, source))
            .unwrap_or_default(),
        docstring: docstring(node, source),
        returns: field_text(node, "return_type", source),
        is_async: node.child(0).is_some_and(|c| c.kind() == "async"),
        complexity: complexity(node),
    }
}

/// Names of ordinary positional parameters, stopping at `*args` or a bare `*`.
fn positional_args(params: &Node<'_>, source: &str) -> Vec<String> {
    let mut args = Vec::new();
    for child in named_children(params) {
        match child.kind() {
            "identifier" => args.push(text(&child, source).to_owned()),
            "default_parameter" | "typed_default_parameter" => {
                if let Some(name) = field_text(&child, "name", source) {
                    args.push(name);
                }
            }
            "typed_parameter" => match child.named_child(0) {
                Some(inner) if inner.kind() == "identifier" => {
                    args.push(text(&inner, source).to_owned());
                }
                Some(inner) if inner.kind() == "list_splat_pattern" => break,
                _ => {}
            },
            "list_splat_pattern" | "keyword_separator" => break,
            _ => {}
        }
    }
    args
}

fn class_info(node: &Node<'_>, source: &str) -> ClassInfo {
    let inheritance = node
        .child_by_field_name("superclasses")
        .map(|list| {
            named_children(&list)
                .into_iter()
                .filter(|b| matches!(b.kind(), "identifier" | "attribute"))
                .map(|b| text(&b, source).to_owned())
                .collect()
        })
        .unwrap_or_default();

    let mut methods = Vec::new();
    if let Some(body) = node.child_by_field_name("body") {
        for stmt in named_children(&body) {
            let def = if stmt.kind() == "decorated_definition" {
                stmt.child_by_field_name("definition")
            } else {
                Some(stmt)
            };
            if let Some(def) = def.filter(|d| d.kind() == "function_definition") {
                methods.push(function_info(&def, source));
            }
        }
    }

    ClassInfo {
        name: field_text(node, "name", source).unwrap_or_default(),
        line_number: line_of(node),
        docstring: docstring(node, source),
        inheritance,
        methods,
    }
}

fn docstring(node: &Node<'_>, source: &str) -> String {
    let Some(body) = node.child_by_field_name("body") else {
        return String::new();
    };
    let Some(first) = named_children(&body)
        .into_iter()
        .find(|n| n.kind() != "comment")
    else {
        return String::new();
    };
    if first.kind() != "expression_statement" {
        return String::new();
    }
    match first.named_child(0) {
        Some(s) if s.kind() == "string" => clean_docstring(strip_quotes(text(&s, source))),
        _ => String::new(),
    }
}

fn strip_quotes(literal: &str) -> &str {
    let body = literal.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if let Some(inner) = body
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    body
}

/// First line trimmed, later lines dedented by their common indentation,
/// surrounding blank lines removed.
fn clean_docstring(raw: &str) -> String {
    let mut lines = raw.lines();
    let first = lines.next().unwrap_or("").trim().to_owned();
    let rest: Vec<&str> = lines.collect();
    let indent = rest
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut out: Vec<String> = std::iter::once(first)
        .chain(
            rest.iter()
                .map(|l| l.get(indent..).unwrap_or("").trim_end().to_owned()),
        )
        .collect();
    while out.last().is_some_and(String::is_empty) {
        out.pop();
    }
    while out.first().is_some_and(String::is_empty) {
        out.remove(0);
    }
    out.join("\n")
}

fn complexity(node: &Node<'_>) -> u32 {
    let branches = descendants(*node)
        .iter()
        .filter(|n| BRANCH_KINDS.contains(&n.kind()))
        .count();
    1 + u32::try_from(branches).unwrap_or(u32::MAX - 1)
}

fn call_sites(node: &Node<'_>, source: &str) -> Vec<Relationship> {
    descendants(*node)
        .into_iter()
        .filter(|n| n.kind() == "call")
        .filter_map(|call| {
            let func = call.child_by_field_name("function")?;
            (func.kind() == "identifier").then(|| Relationship {
                kind: "calls".into(),
                target: text(&func, source).to_owned(),
                line: line_of(&call),
            })
        })
        .collect()
}

fn collect_import(node: &Node<'_>, source: &str, facts: &mut PythonFacts) {
    for child in named_children(node) {
        let (name, alias) = match child.kind() {
            "dotted_name" => (text(&child, source).to_owned(), None),
            "aliased_import" => (
                field_text(&child, "name", source).unwrap_or_default(),
                field_text(&child, "alias", source),
            ),
            _ => continue,
        };
        let top = name.split('.').next().unwrap_or_default().to_owned();
        facts.dependencies.push(top);
        facts.imports.push(ImportInfo {
            kind: ImportKind::Import,
            module: String::new(),
            name,
            alias,
            line_number: line_of(node),
        });
    }
}

fn collect_from_import(node: &Node<'_>, source: &str, facts: &mut PythonFacts) {
    let module_node = node.child_by_field_name("module_name");
    let module = if node.kind() == "future_import_statement" {
        "__future__".to_owned()
    } else {
        module_node
            .map(|m| text(&m, source).trim_start_matches('.').to_owned())
            .unwrap_or_default()
    };
    if !module.is_empty() {
        facts.dependencies.push(module.clone());
    }

    for child in named_children(node) {
        if module_node.is_some_and(|m| m.id() == child.id()) {
            continue;
        }
        let (name, alias) = match child.kind() {
            "dotted_name" => (text(&child, source).to_owned(), None),
            "aliased_import" => (
                field_text(&child, "name", source).unwrap_or_default(),
                field_text(&child, "alias", source),
            ),
            "wildcard_import" => ("*".to_owned(), None),
            _ => continue,
        };
        facts.imports.push(ImportInfo {
            kind: ImportKind::From,
            module: module.clone(),
            name,
            alias,
            line_number: line_of(node),
        });
    }
}
