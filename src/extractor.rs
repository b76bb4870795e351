//! @ai:module:intent Strip source text down to comment bodies for annotation matching
//! @ai:module:layer application
//! @ai:module:public_api Extractor, CommentExtractor, PlaintextExtractor, build_extractor, extractor_names
//! @ai:module:depends_on language, annotation, error
//! @ai:module:stateless true

use crate::annotation::Comment;
use crate::error::Result;
use crate::language::{CommentSyntax, Language};
use regex::Regex;

/// Name of the extractor that treats a whole file as one comment.
pub const PLAINTEXT: &str = "plaintext";

const PLAINTEXT_EXTENSIONS: &[&str] = &["txt", "md", "rst"];

/// @ai:intent Capability shared by every comment extractor
pub trait Extractor: Send + Sync {
    /// @ai:intent Identifier recorded as `found_by` on every occurrence
    fn name(&self) -> &str;

    /// @ai:intent File extensions claimed when configuration lists none
    fn default_extensions(&self) -> &'static [&'static str];

    /// @ai:intent Split file text into comment bodies with their starting line
    fn extract(&self, text: &str) -> Vec<Comment>;
}

/// @ai:intent Build the extractor registered under a configuration name
/// @ai:example ("python") -> Some(CommentExtractor(Python))
/// @ai:example ("plaintext") -> Some(PlaintextExtractor)
/// @ai:example ("cobol") -> None
pub fn build_extractor(name: &str) -> Result<Option<Box<dyn Extractor>>> {
    if name == PLAINTEXT {
        return Ok(Some(Box::new(PlaintextExtractor)));
    }
    match Language::from_name(name) {
        Some(language) => Ok(Some(Box::new(CommentExtractor::new(language)?))),
        None => Ok(None),
    }
}

/// @ai:intent List every extractor name the registry knows
pub fn extractor_names() -> Vec<&'static str> {
    Language::ALL
        .iter()
        .map(Language::name)
        .chain(std::iter::once(PLAINTEXT))
        .collect()
}

/// @ai:intent Regex-driven extractor for languages with block and line comments
#[derive(Debug, Clone)]
pub struct CommentExtractor {
    language: Language,
    syntax: CommentSyntax,
    comment_regex: Regex,
}

impl CommentExtractor {
    /// @ai:intent Compile the comment regex for a language
    /// @ai:effects pure
    pub fn new(language: Language) -> Result<Self> {
        let syntax = language.comment_syntax();
        let single = syntax
            .single_line
            .iter()
            .map(|marker| regex::escape(marker))
            .collect::<Vec<_>>()
            .join("|");

        let pattern = format!(
            r"(?s:{start}(?P<block>.*?){end})|(?P<lines>(?:{single})[^\n]*(?:\n[ \t]*(?:{single})[^\n]*)*)",
            start = regex::escape(syntax.block_start),
            end = regex::escape(syntax.block_end),
        );
        let comment_regex = Regex::new(&pattern)?;
        tracing::info!(
            extractor = language.name(),
            regex = comment_regex.as_str(),
            "Comment regex compiled"
        );

        Ok(Self {
            language,
            syntax,
            comment_regex,
        })
    }

    /// @ai:intent Remove the decorative block prefix (` * `) from each line
    /// @ai:effects pure
    fn clean_block(&self, block: &str) -> String {
        let Some(prefix) = self.syntax.block_line_prefix else {
            return block.to_string();
        };

        block
            .split('\n')
            .map(|line| {
                let trimmed = line.trim_start_matches([' ', '\t']);
                match trimmed.strip_prefix(prefix) {
                    Some(rest) => rest.strip_prefix(' ').unwrap_or(rest),
                    None => line,
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// @ai:intent Collapse a run of single-line comments into one body
    /// @ai:effects pure
    fn clean_line_run(&self, run: &str) -> String {
        run.split('\n')
            .map(|line| {
                let trimmed = line.trim_start_matches([' ', '\t']);
                let rest = self
                    .syntax
                    .single_line
                    .iter()
                    .find_map(|marker| trimmed.strip_prefix(marker))
                    .unwrap_or(trimmed);
                rest.strip_prefix(' ').unwrap_or(rest)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Extractor for CommentExtractor {
    fn name(&self) -> &str {
        self.language.name()
    }

    fn default_extensions(&self) -> &'static [&'static str] {
        self.language.extensions()
    }

    /// @ai:intent Find every block comment and every run of line comments
    /// @ai:post comments are returned in file order with 1-based start lines
    /// @ai:effects pure
    fn extract(&self, text: &str) -> Vec<Comment> {
        let mut lines = LineCounter::new(text);
        let mut comments = Vec::new();

        for caps in self.comment_regex.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            let start_line = lines.line_at(whole.start());

            let body = if let Some(block) = caps.name("block") {
                self.clean_block(block.as_str())
            } else if let Some(run) = caps.name("lines") {
                self.clean_line_run(run.as_str())
            } else {
                continue;
            };

            comments.push(Comment::new(body, start_line));
        }

        comments
    }
}

/// @ai:intent Extractor treating the whole file as a single comment
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextExtractor;

impl Extractor for PlaintextExtractor {
    fn name(&self) -> &str {
        PLAINTEXT
    }

    fn default_extensions(&self) -> &'static [&'static str] {
        PLAINTEXT_EXTENSIONS
    }

    fn extract(&self, text: &str) -> Vec<Comment> {
        vec![Comment::new(text, 1)]
    }
}

/// Incremental newline counter; offsets must be queried in ascending order.
struct LineCounter<'a> {
    text: &'a str,
    offset: usize,
    line: usize,
}

impl<'a> LineCounter<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            offset: 0,
            line: 1,
        }
    }

    fn line_at(&mut self, offset: usize) -> usize {
        self.line += self.text[self.offset..offset].matches('\n').count();
        self.offset = offset;
        self.line
    }
}
