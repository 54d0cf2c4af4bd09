//! Language (grammar) identification for document models.
//!
//! Languages are detected from file extensions and identified by the
//! string ids the editor engine uses (`"rust"`, `"plaintext"`, ...).

use std::path::Path;

/// Languages the editor engine knows how to colorize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    C,
    Cpp,
    Json,
    Markdown,
    Html,
    Css,
    #[default]
    PlainText,
}

/// Grammar descriptor handed to status widgets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarInfo {
    /// Human readable name.
    pub name: &'static str,
    /// Extensions (with leading dot) associated with the grammar.
    pub file_types: &'static [&'static str],
    /// Engine language id.
    pub scope_name: &'static str,
}

impl Language {
    /// Returns all available languages (for grammar selection).
    pub fn all() -> &'static [Language] {
        &[
            Language::Rust,
            Language::Python,
            Language::JavaScript,
            Language::TypeScript,
            Language::C,
            Language::Cpp,
            Language::Json,
            Language::Markdown,
            Language::Html,
            Language::Css,
            Language::PlainText,
        ]
    }

    /// Detects language from a file path based on extension.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::PlainText)
    }

    /// Detects language from a file extension (without the dot).
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.to_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|lang| {
                lang.file_types()
                    .iter()
                    .any(|ft| ft.trim_start_matches('.') == ext)
            })
            .unwrap_or(Self::PlainText)
    }

    /// Looks a language up by engine id. Unknown ids map to plain text.
    pub fn from_id(id: &str) -> Self {
        Self::all()
            .iter()
            .copied()
            .find(|lang| lang.id() == id)
            .unwrap_or(Self::PlainText)
    }

    /// Returns the engine id of the language.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Rust => "rust",
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::Json => "json",
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::Css => "css",
            Self::PlainText => "plaintext",
        }
    }

    /// Returns the display name of the language.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Rust => "Rust",
            Self::Python => "Python",
            Self::JavaScript => "JavaScript",
            Self::TypeScript => "TypeScript",
            Self::C => "C",
            Self::Cpp => "C++",
            Self::Json => "JSON",
            Self::Markdown => "Markdown",
            Self::Html => "HTML",
            Self::Css => "CSS",
            Self::PlainText => "Plain Text",
        }
    }

    /// Returns the file extensions associated with the language.
    pub fn file_types(&self) -> &'static [&'static str] {
        match self {
            Self::Rust => &[".rs"],
            Self::Python => &[".py", ".pyw", ".pyi"],
            Self::JavaScript => &[".js", ".jsx", ".mjs", ".cjs"],
            Self::TypeScript => &[".ts", ".tsx", ".mts", ".cts"],
            Self::C => &[".c", ".h"],
            Self::Cpp => &[".cpp", ".cc", ".cxx", ".c++", ".hpp", ".hh", ".hxx", ".h++"],
            Self::Json => &[".json", ".jsonc", ".json5"],
            Self::Markdown => &[".md", ".markdown"],
            Self::Html => &[".html", ".htm"],
            Self::Css => &[".css"],
            Self::PlainText => &[".txt"],
        }
    }

    /// Returns the grammar descriptor for status widgets.
    pub fn grammar(&self) -> GrammarInfo {
        GrammarInfo {
            name: self.name(),
            file_types: self.file_types(),
            scope_name: self.id(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension() {
        assert_eq!(Language::from_extension("rs"), Language::Rust);
        assert_eq!(Language::from_extension("RS"), Language::Rust);
        assert_eq!(Language::from_extension("py"), Language::Python);
        assert_eq!(Language::from_extension("h"), Language::C);
        assert_eq!(Language::from_extension("hpp"), Language::Cpp);
        assert_eq!(Language::from_extension("unknown"), Language::PlainText);
    }

    #[test]
    fn test_from_path() {
        assert_eq!(Language::from_path(Path::new("main.rs")), Language::Rust);
        assert_eq!(
            Language::from_path(Path::new("/path/to/config.json")),
            Language::Json
        );
        assert_eq!(
            Language::from_path(Path::new("README.md")),
            Language::Markdown
        );
        assert_eq!(Language::from_path(Path::new("Makefile")), Language::PlainText);
    }

    #[test]
    fn test_id_round_trip() {
        for lang in Language::all() {
            assert_eq!(Language::from_id(lang.id()), *lang);
        }
        assert_eq!(Language::from_id("cobol"), Language::PlainText);
    }

    #[test]
    fn test_grammar_descriptor() {
        let grammar = Language::Cpp.grammar();
        assert_eq!(grammar.name, "C++");
        assert_eq!(grammar.scope_name, "cpp");
        assert!(grammar.file_types.contains(&".hpp"));
    }
}
