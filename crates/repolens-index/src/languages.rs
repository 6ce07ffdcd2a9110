//! Extension-based language naming.

use std::path::Path;

/// Display name used when an extension is not recognized.
pub const UNKNOWN: &str = "Unknown";

/// Lowercased extension of `path` including the leading dot, or empty.
#[must_use]
pub fn extension_of(path: &str) -> String {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// Human-readable language name for a file path.
#[must_use]
pub fn language_name(path: &str) -> &'static str {
    match extension_of(path).as_str() {
        ".py" => "Python",
        ".js" => "JavaScript",
        ".ts" => "TypeScript",
        ".jsx" => "React/JSX",
        ".tsx" => "React/TSX",
        ".html" => "HTML",
        ".css" => "CSS",
        ".scss" => "SCSS",
        ".java" => "Java",
        ".c" => "C",
        ".cpp" => "C++",
        ".h" => "C/C++ Header",
        ".hpp" => "C++ Header",
        ".cs" => "C#",
        ".php" => "PHP",
        ".rb" => "Ruby",
        ".go" => "Go",
        ".rs" => "Rust",
        ".swift" => "Swift",
        ".kt" => "Kotlin",
        ".sh" => "Shell",
        ".bat" => "Batch",
        ".ps1" => "PowerShell",
        ".sql" => "SQL",
        ".md" => "Markdown",
        ".json" => "JSON",
        ".xml" => "XML",
        ".yaml" | ".yml" => "YAML",
        ".toml" => "TOML",
        ".ini" => "INI",
        ".cfg" | ".conf" => "Config",
        ".txt" => "Text",
        _ => UNKNOWN,
    }
}

/// Languages whose structure is extracted with the JavaScript analyzer.
#[must_use]
pub fn is_javascript_family(language: &str) -> bool {
    matches!(
        language,
        "JavaScript" | "TypeScript" | "React/JSX" | "React/TSX"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_name_common_extensions() {
        assert_eq!(language_name("app.py"), "Python");
        assert_eq!(language_name("src/index.js"), "JavaScript");
        assert_eq!(language_name("ui/App.tsx"), "React/TSX");
        assert_eq!(language_name("src/main.rs"), "Rust");
        assert_eq!(language_name("config.yml"), "YAML");
    }

    #[test]
    fn language_name_is_case_insensitive() {
        assert_eq!(language_name("SCRIPT.PY"), "Python");
    }

    #[test]
    fn language_name_unknown_ext() {
        assert_eq!(language_name("file.xyz"), UNKNOWN);
        assert_eq!(language_name("Makefile"), UNKNOWN);
    }

    #[test]
    fn extension_of_keeps_dot() {
        assert_eq!(extension_of("a/b/c.Py"), ".py");
        assert_eq!(extension_of("README"), "");
        assert_eq!(extension_of("archive.tar.gz"), ".gz");
    }

    #[test]
    fn javascript_family_members() {
        assert!(is_javascript_family("React/JSX"));
        assert!(is_javascript_family("TypeScript"));
        assert!(!is_javascript_family("Python"));
    }
}
