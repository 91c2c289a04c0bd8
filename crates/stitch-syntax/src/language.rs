//! Language names and Tree-sitter grammar selection.
//!
//! This module provides the [`SupportedLanguage`] enum for identifying
//! programming languages and mapping them to their Tree-sitter grammars and
//! node type tables.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Languages supported for structural search.
///
/// Each variant maps to a Tree-sitter grammar that parses source code for
/// that language. JavaScript sources are handled by the TypeScript variant,
/// whose TSX grammar accepts plain JavaScript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SupportedLanguage {
    /// Rust.
    #[default]
    Rust,
    /// Python.
    Python,
    /// TypeScript and JavaScript, parsed with the TSX grammar.
    TypeScript,
}

impl SupportedLanguage {
    /// Returns the Tree-sitter language grammar for this language.
    #[must_use]
    pub fn tree_sitter_language(self) -> tree_sitter::Language {
        match self {
            Self::Rust => tree_sitter_rust::LANGUAGE.into(),
            Self::Python => tree_sitter_python::LANGUAGE.into(),
            // TSX is a superset that also accepts plain JavaScript.
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }

    /// Returns the grammar's `node-types.json` description.
    ///
    /// The [`FieldIndex`](crate::FieldIndex) is generated from this table.
    #[must_use]
    pub const fn node_types(self) -> &'static str {
        match self {
            Self::Rust => tree_sitter_rust::NODE_TYPES,
            Self::Python => tree_sitter_python::NODE_TYPES,
            Self::TypeScript => tree_sitter_typescript::TSX_NODE_TYPES,
        }
    }

    /// Resolves a named node kind to the grammar's numeric kind id.
    ///
    /// Returns `None` when the grammar has no named node of that kind.
    #[must_use]
    pub fn kind_id(self, kind: &str) -> Option<u16> {
        let id = self.tree_sitter_language().id_for_node_kind(kind, true);
        (id != 0).then_some(id)
    }

    /// Returns the lower-case identifier for this language.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rust => "rust",
            Self::Python => "python",
            Self::TypeScript => "typescript",
        }
    }

    /// Returns all supported languages.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Rust, Self::Python, Self::TypeScript]
    }
}

impl fmt::Display for SupportedLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised when parsing a language identifier fails.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unsupported language: '{0}'")]
pub struct LanguageParseError(String);

impl LanguageParseError {
    /// Returns the input that failed to parse.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.0
    }
}

impl FromStr for SupportedLanguage {
    type Err = LanguageParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalised = input.trim().to_ascii_lowercase();
        match normalised.as_str() {
            "rust" | "rs" => Ok(Self::Rust),
            "python" | "py" => Ok(Self::Python),
            "typescript" | "ts" | "tsx" | "javascript" | "js" | "jsx" => Ok(Self::TypeScript),
            other => Err(LanguageParseError(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("rust", SupportedLanguage::Rust)]
    #[case("Python", SupportedLanguage::Python)]
    #[case("JavaScript", SupportedLanguage::TypeScript)]
    #[case(" tsx ", SupportedLanguage::TypeScript)]
    fn from_str_parses_language_names(#[case] input: &str, #[case] expected: SupportedLanguage) {
        assert_eq!(SupportedLanguage::from_str(input), Ok(expected));
    }

    #[test]
    fn from_str_reports_the_rejected_input() {
        let err = "go".parse::<SupportedLanguage>().expect_err("go is unsupported");
        assert_eq!(err.input(), "go");
    }

    #[rstest]
    #[case(SupportedLanguage::Rust, "function_item")]
    #[case(SupportedLanguage::Python, "function_definition")]
    #[case(SupportedLanguage::TypeScript, "member_expression")]
    fn kind_id_resolves_grammar_kinds(#[case] language: SupportedLanguage, #[case] kind: &str) {
        assert!(language.kind_id(kind).is_some());
    }

    #[test]
    fn kind_id_rejects_unknown_kinds() {
        assert_eq!(SupportedLanguage::Rust.kind_id("no_such_kind"), None);
    }
}
