//! Matchers that inspect a single node without capturing anything.

use regex::Regex;

use crate::environment::MetaVarEnv;
use crate::error::SyntaxError;
use crate::language::SupportedLanguage;
use crate::matcher::Matcher;
use crate::node::Node;

/// Kind reported for error-recovery nodes, valid in every grammar.
const ERROR_KIND: &str = "ERROR";

/// Matches nodes of one grammar kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindMatcher {
    kind: String,
    language: SupportedLanguage,
}

impl KindMatcher {
    /// Creates a matcher for `kind` in `language`.
    ///
    /// # Errors
    ///
    /// Returns [`SyntaxError::UnknownKind`] if the grammar defines no named
    /// node of that kind.
    pub fn new(kind: &str, language: SupportedLanguage) -> Result<Self, SyntaxError> {
        if kind != ERROR_KIND && language.kind_id(kind).is_none() {
            return Err(SyntaxError::unknown_kind(language, kind));
        }
        Ok(Self {
            kind: kind.to_owned(),
            language,
        })
    }

    /// Returns the kind this matcher accepts.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the language the kind was resolved against.
    #[must_use]
    pub const fn language(&self) -> SupportedLanguage {
        self.language
    }
}

impl Matcher for KindMatcher {
    fn match_node_with_env<'r>(
        &self,
        node: Node<'r>,
        _env: &mut MetaVarEnv<'r>,
    ) -> Option<Node<'r>> {
        node.is(&self.kind).then_some(node)
    }
}

/// Matches nodes whose source text matches a regular expression.
///
/// The expression is searched for anywhere in the text; anchor it with `^`
/// and `$` to require a full match.
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    regex: Regex,
}

impl RegexMatcher {
    /// Compiles `pattern` into a matcher.
    ///
    /// # Errors
    ///
    /// Returns [`SyntaxError::InvalidRegex`] if the expression is invalid.
    pub fn new(pattern: &str) -> Result<Self, SyntaxError> {
        let regex =
            Regex::new(pattern).map_err(|e| SyntaxError::invalid_regex(pattern, e.to_string()))?;
        Ok(Self { regex })
    }

    /// Returns the expression as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

impl Matcher for RegexMatcher {
    fn match_node_with_env<'r>(
        &self,
        node: Node<'r>,
        _env: &mut MetaVarEnv<'r>,
    ) -> Option<Node<'r>> {
        self.regex.is_match(node.text()).then_some(node)
    }
}
