//! Tree-sitter parsing wrapper producing immutable syntax trees.
//!
//! A [`Root`] owns the Tree-sitter tree together with the exact source text
//! and language it was built from. Roots are never mutated: rewriting
//! produces new text through [`Root::commit_edits`], not a modified tree.

use std::ops::Range;

use tracing::trace;

use crate::error::SyntaxError;
use crate::language::SupportedLanguage;
use crate::node::Node;

/// Filename reported for trees parsed from in-memory strings.
pub const ANONYMOUS_FILENAME: &str = "anonymous";

/// A parsed syntax tree and the source it was built from.
///
/// Tree-sitter is error-tolerant, so a root may contain `ERROR` and
/// `MISSING` nodes; use [`Root::has_errors`] to check.
#[derive(Debug, Clone)]
pub struct Root {
    tree: tree_sitter::Tree,
    source: String,
    language: SupportedLanguage,
    filename: String,
}

impl Root {
    /// Parses `source` with a fresh parser for `language`.
    ///
    /// # Errors
    ///
    /// Returns an error if the grammar cannot be loaded or Tree-sitter fails
    /// to produce a tree.
    pub fn parse(source: &str, language: SupportedLanguage) -> Result<Self, SyntaxError> {
        Parser::new(language)?.parse(source)
    }

    /// Returns the root node of the tree.
    #[must_use]
    pub fn root(&self) -> Node<'_> {
        Node::new(self.tree.root_node(), self)
    }

    /// Returns the filename this tree was parsed from.
    ///
    /// Trees parsed from strings report [`ANONYMOUS_FILENAME`].
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Returns a copy of this root labelled with `filename`.
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    /// Returns the underlying Tree-sitter tree.
    #[must_use]
    pub const fn tree(&self) -> &tree_sitter::Tree {
        &self.tree
    }

    /// Returns the source code that was parsed.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the language of the parsed code.
    #[must_use]
    pub const fn language(&self) -> SupportedLanguage {
        self.language
    }

    /// Returns whether the tree contains any `ERROR` or `MISSING` nodes.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    /// Collects all syntax errors found in the tree in document order.
    #[must_use]
    pub fn errors(&self) -> Vec<SyntaxErrorInfo> {
        self.root()
            .dfs()
            .filter(|node| node.inner().is_error() || node.inner().is_missing())
            .map(|node| SyntaxErrorInfo::from_node(node.inner(), &self.source))
            .collect()
    }
}

/// Information about a syntax error found during parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxErrorInfo {
    /// Byte range of the error in the source.
    pub byte_range: Range<usize>,
    /// Line number (one-based) where the error starts.
    pub line: u32,
    /// Column number (one-based) where the error starts.
    pub column: u32,
    /// A snippet of the problematic source text.
    pub context: String,
    /// Human-readable description of the error.
    pub message: String,
}

impl SyntaxErrorInfo {
    fn from_node(node: tree_sitter::Node<'_>, source: &str) -> Self {
        let byte_range = node.byte_range();

        let context = source
            .get(byte_range.clone())
            .map(|s| {
                if s.len() > 50 {
                    let truncated: String = s.chars().take(47).collect();
                    format!("{truncated}...")
                } else {
                    s.to_owned()
                }
            })
            .unwrap_or_default();

        let message = if node.is_missing() {
            format!("missing {}", node.kind())
        } else {
            "syntax error".to_owned()
        };

        let start = crate::position::Pos::from_point(node.start_position(), node.start_byte());
        let (line, column) = start.one_based();

        Self {
            byte_range,
            line,
            column,
            context,
            message,
        }
    }
}

/// Tree-sitter parser wrapper for a specific language.
///
/// Each parser instance is configured for a single language and may be
/// reused for many sources.
pub struct Parser {
    inner: tree_sitter::Parser,
    language: SupportedLanguage,
}

impl Parser {
    /// Creates a new parser for the given language.
    ///
    /// # Errors
    ///
    /// Returns an error if the Tree-sitter parser cannot be initialised
    /// with the language grammar.
    pub fn new(language: SupportedLanguage) -> Result<Self, SyntaxError> {
        let mut inner = tree_sitter::Parser::new();
        inner
            .set_language(&language.tree_sitter_language())
            .map_err(|e| SyntaxError::parser_init(language, e.to_string()))?;

        Ok(Self { inner, language })
    }

    /// Returns the language this parser is configured for.
    #[must_use]
    pub const fn language(&self) -> SupportedLanguage {
        self.language
    }

    /// Parses source code into an anonymous [`Root`].
    ///
    /// # Errors
    ///
    /// Returns an error if the parser fails to produce a syntax tree.
    pub fn parse(&mut self, source: &str) -> Result<Root, SyntaxError> {
        self.parse_named(source, ANONYMOUS_FILENAME)
    }

    /// Parses source code read from `filename`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parser fails to produce a syntax tree.
    pub fn parse_named(&mut self, source: &str, filename: &str) -> Result<Root, SyntaxError> {
        let tree = self
            .inner
            .parse(source, None)
            .ok_or_else(|| SyntaxError::parse(self.language, "parsing failed"))?;

        trace!(
            target: "stitch_syntax::parser",
            language = %self.language,
            filename,
            bytes = source.len(),
            "parsed source"
        );

        Ok(Root {
            tree,
            source: source.to_owned(),
            language: self.language,
            filename: filename.to_owned(),
        })
    }
}
