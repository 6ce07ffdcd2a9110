//! Uploaded source files and directory loading.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::languages::extension_of;

const BINARY_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".ico", ".svg", ".pdf", ".doc", ".docx", ".ppt",
    ".pptx", ".xls", ".xlsx", ".zip", ".tar", ".gz", ".7z", ".rar", ".exe", ".dll", ".so",
    ".dylib", ".pyc", ".pyo", ".pyd", ".class", ".o", ".obj", ".bin", ".dat",
];

/// One text file of an uploaded repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Relative path with `/` separators, unique within a repository.
    pub path: String,
    pub content: String,
    /// Lowercased extension including the dot, empty when absent.
    pub extension: String,
}

impl SourceFile {
    #[must_use]
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = path.into();
        let extension = extension_of(&path);
        Self {
            path,
            content: content.into(),
            extension,
        }
    }

    /// Number of `'\n'`-separated lines, counting a trailing empty line.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.content.split('\n').count()
    }
}

/// Whether the path carries an extension that is never read as text.
#[must_use]
pub fn is_binary_path(path: &str) -> bool {
    BINARY_EXTENSIONS.contains(&extension_of(path).as_str())
}

/// Load every readable text file under `root`, sorted by relative path.
///
/// Hidden files and gitignored paths are skipped, as are binary extensions
/// and files that are not valid UTF-8.
///
/// # Errors
///
/// Returns an error if `root` cannot be read.
pub fn load_directory(root: &Path) -> Result<Vec<SourceFile>> {
    // Surface a missing root as an error instead of an empty walk.
    std::fs::metadata(root)?;

    let mut files = Vec::new();
    for entry in ignore::WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .build()
    {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("skipping unreadable entry: {e}");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let rel_path = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if is_binary_path(&rel_path) {
            tracing::debug!(path = %rel_path, "skipping binary file");
            continue;
        }

        let bytes = std::fs::read(entry.path())?;
        match String::from_utf8(bytes) {
            Ok(content) => files.push(SourceFile::new(rel_path, content)),
            Err(_) => tracing::debug!(path = %rel_path, "skipping non-UTF-8 file"),
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    tracing::info!(root = %root.display(), files = files.len(), "loaded source directory");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_derives_extension() {
        let f = SourceFile::new("pkg/Module.PY", "x = 1");
        assert_eq!(f.extension, ".py");
        assert_eq!(f.line_count(), 1);
    }

    #[test]
    fn binary_detection() {
        assert!(is_binary_path("img/logo.PNG"));
        assert!(is_binary_path("cache/mod.pyc"));
        assert!(!is_binary_path("src/app.py"));
        assert!(!is_binary_path("Makefile"));
    }

    #[test]
    fn load_directory_sorts_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("pkg")).unwrap();
        std::fs::write(dir.path().join("pkg/b.py"), "def b():\n    pass\n").unwrap();
        std::fs::write(dir.path().join("a.js"), "function a() {}\n").unwrap();
        std::fs::write(dir.path().join("logo.png"), [0x89, 0x50, 0x4e, 0x47]).unwrap();
        std::fs::write(dir.path().join("blob.txt"), [0xff, 0xfe, 0x00]).unwrap();
        std::fs::write(dir.path().join(".hidden.py"), "secret = 1").unwrap();

        let files = load_directory(dir.path()).unwrap();
        let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["a.js", "pkg/b.py"]);
        assert_eq!(files[1].content, "def b():\n    pass\n");
    }

    #[test]
    fn load_directory_missing_root_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(load_directory(&missing).is_err());
    }
}
