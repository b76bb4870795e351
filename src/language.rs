//! @ai:module:intent Define language-specific comment syntax used by the extractors
//! @ai:module:layer domain
//! @ai:module:public_api Language, CommentSyntax
//! @ai:module:stateless true

/// @ai:intent A programming language whose comments can be scanned for annotations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Rust,
    Python,
    TypeScript,
    JavaScript,
    Go,
    Java,
    C,
    Cpp,
}

/// @ai:intent Comment delimiters for a language
#[derive(Debug, Clone)]
pub struct CommentSyntax {
    /// Line comment markers, longest first.
    pub single_line: &'static [&'static str],
    pub block_start: &'static str,
    pub block_end: &'static str,
    /// Decoration repeated at the start of every block comment line (` * `).
    pub block_line_prefix: Option<&'static str>,
}

const C_FAMILY: CommentSyntax = CommentSyntax {
    single_line: &["//"],
    block_start: "/*",
    block_end: "*/",
    block_line_prefix: Some("*"),
};

impl Language {
    pub const ALL: [Language; 8] = [
        Language::Rust,
        Language::Python,
        Language::TypeScript,
        Language::JavaScript,
        Language::Go,
        Language::Java,
        Language::C,
        Language::Cpp,
    ];

    /// @ai:intent Get the comment syntax for this language
    /// @ai:effects pure
    pub fn comment_syntax(&self) -> CommentSyntax {
        match self {
            Language::Rust => CommentSyntax {
                single_line: &["///", "//!", "//"],
                ..C_FAMILY
            },
            Language::Python => CommentSyntax {
                single_line: &["#"],
                block_start: "\"\"\"",
                block_end: "\"\"\"",
                block_line_prefix: None,
            },
            Language::TypeScript
            | Language::JavaScript
            | Language::Go
            | Language::Java
            | Language::C
            | Language::Cpp => C_FAMILY,
        }
    }

    /// @ai:intent Get the file extensions scanned when configuration lists none
    /// @ai:effects pure
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Rust => &["rs"],
            Language::Python => &["py", "pyi"],
            Language::TypeScript => &["ts", "tsx"],
            Language::JavaScript => &["js", "jsx", "mjs"],
            Language::Go => &["go"],
            Language::Java => &["java"],
            Language::C => &["c", "h"],
            Language::Cpp => &["cpp", "cc", "cxx", "hpp", "hh", "hxx"],
        }
    }

    /// @ai:intent Get the extractor name used for this language in configuration
    /// @ai:effects pure
    pub fn name(&self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::Python => "python",
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Go => "go",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
        }
    }

    /// @ai:intent Resolve a configured extractor name to a language
    /// @ai:example ("python") -> Some(Python)
    /// @ai:example ("plaintext") -> None
    /// @ai:effects pure
    pub fn from_name(name: &str) -> Option<Language> {
        Self::ALL.into_iter().find(|lang| lang.name() == name)
    }
}
