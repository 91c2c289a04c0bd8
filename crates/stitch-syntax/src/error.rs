//! Error types for structural search and rewrite operations.
//!
//! Every fallible operation in `stitch-syntax` reports a [`SyntaxError`].
//! Parse and pattern failures, rule compilation failures, tree invariant
//! violations and rejected edit sets are distinct variants so callers can
//! tell a bad input apart from a bad rule or a bad edit plan.

use thiserror::Error;

use crate::language::SupportedLanguage;

/// Errors from structural search and rewrite operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SyntaxError {
    /// Failed to initialise the Tree-sitter parser for a language.
    #[error("failed to initialise parser for {language}: {message}")]
    ParserInitError {
        /// The language that failed to initialise.
        language: SupportedLanguage,
        /// Description of the failure.
        message: String,
    },

    /// Failed to parse source code.
    #[error("failed to parse {language}: {message}")]
    ParseError {
        /// The language that failed to parse.
        language: SupportedLanguage,
        /// Description of the failure.
        message: String,
    },

    /// Pattern compilation failed.
    #[error("invalid pattern for {language}: {message}")]
    PatternCompileError {
        /// The language the pattern was compiled for.
        language: SupportedLanguage,
        /// Description of the compilation failure.
        message: String,
    },

    /// Pattern contains invalid metavariable syntax or usage.
    #[error("invalid metavariable syntax: {message}")]
    InvalidMetavariable {
        /// Description of the metavariable error.
        message: String,
    },

    /// A `kind` rule names a node kind the grammar does not define.
    #[error("unknown node kind '{kind}' for {language}")]
    UnknownKind {
        /// The language whose grammar was consulted.
        language: SupportedLanguage,
        /// The kind that could not be resolved.
        kind: String,
    },

    /// A relational rule names a field the grammar never defines.
    #[error("unknown field '{field}' for {language}")]
    UnknownField {
        /// The language whose grammar was consulted.
        language: SupportedLanguage,
        /// The field that could not be resolved.
        field: String,
    },

    /// A `regex` rule or transformation carries an invalid expression.
    #[error("invalid regular expression '{pattern}': {message}")]
    InvalidRegex {
        /// The expression as written.
        pattern: String,
        /// Description reported by the regex engine.
        message: String,
    },

    /// A `matches` rule references a name that no registry entry defines.
    #[error("rule references undefined rule '{name}'")]
    UndefinedRule {
        /// The unresolved rule name.
        name: String,
    },

    /// Named rules reference each other in a cycle.
    #[error("cyclic rule reference: {}", path.join(" -> "))]
    CyclicRule {
        /// The reference chain, ending with the repeated name.
        path: Vec<String>,
    },

    /// A required grammar field has no child.
    ///
    /// This signals that the tree disagrees with the grammar's own node type
    /// table and is not a recoverable search condition.
    #[error("required field '{field}' of '{kind}' is missing")]
    RequiredFieldMissing {
        /// The kind of the node being inspected.
        kind: String,
        /// The field that should have been filled.
        field: String,
    },

    /// Two edits in one commit overlap.
    #[error("edits overlap: [{first_start}, {first_end}) and [{second_start}, {second_end})")]
    OverlappingEdits {
        /// Start of the earlier edit.
        first_start: usize,
        /// End of the earlier edit.
        first_end: usize,
        /// Start of the later edit.
        second_start: usize,
        /// End of the later edit.
        second_end: usize,
    },

    /// An edit addresses bytes outside the source or inside a UTF-8 sequence.
    #[error("edit [{start}, {end}) is not a valid range of a {len}-byte source")]
    EditOutOfBounds {
        /// Start of the offending edit.
        start: usize,
        /// End of the offending edit.
        end: usize,
        /// Length of the source text in bytes.
        len: usize,
    },

    /// Invalid replacement template.
    #[error("invalid replacement template: {message}")]
    InvalidReplacement {
        /// Description of the replacement error.
        message: String,
    },

    /// Internal error indicating a bug or system failure.
    #[error("internal error: {message}")]
    InternalError {
        /// Description of the internal error.
        message: String,
    },
}

impl SyntaxError {
    /// Creates a parser initialisation error.
    #[must_use]
    pub fn parser_init(language: SupportedLanguage, message: impl Into<String>) -> Self {
        Self::ParserInitError {
            language,
            message: message.into(),
        }
    }

    /// Creates a parse error.
    #[must_use]
    pub fn parse(language: SupportedLanguage, message: impl Into<String>) -> Self {
        Self::ParseError {
            language,
            message: message.into(),
        }
    }

    /// Creates a pattern compilation error.
    #[must_use]
    pub fn pattern_compile(language: SupportedLanguage, message: impl Into<String>) -> Self {
        Self::PatternCompileError {
            language,
            message: message.into(),
        }
    }

    /// Creates an invalid metavariable error.
    #[must_use]
    pub fn invalid_metavariable(message: impl Into<String>) -> Self {
        Self::InvalidMetavariable {
            message: message.into(),
        }
    }

    /// Creates an unknown kind error.
    #[must_use]
    pub fn unknown_kind(language: SupportedLanguage, kind: impl Into<String>) -> Self {
        Self::UnknownKind {
            language,
            kind: kind.into(),
        }
    }

    /// Creates an unknown field error.
    #[must_use]
    pub fn unknown_field(language: SupportedLanguage, field: impl Into<String>) -> Self {
        Self::UnknownField {
            language,
            field: field.into(),
        }
    }

    /// Creates an invalid regex error.
    #[must_use]
    pub fn invalid_regex(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRegex {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Creates an undefined rule error.
    #[must_use]
    pub fn undefined_rule(name: impl Into<String>) -> Self {
        Self::UndefinedRule { name: name.into() }
    }

    /// Creates a cyclic rule error from the offending reference chain.
    #[must_use]
    pub const fn cyclic_rule(path: Vec<String>) -> Self {
        Self::CyclicRule { path }
    }

    /// Creates a missing required field error.
    #[must_use]
    pub fn required_field_missing(kind: impl Into<String>, field: impl Into<String>) -> Self {
        Self::RequiredFieldMissing {
            kind: kind.into(),
            field: field.into(),
        }
    }

    /// Creates an invalid replacement error.
    #[must_use]
    pub fn invalid_replacement(message: impl Into<String>) -> Self {
        Self::InvalidReplacement {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    /// Returns whether this error rejected an edit plan.
    ///
    /// Commit failures are caller errors and are reported separately from
    /// parse and rule failures.
    #[must_use]
    pub const fn is_edit_error(&self) -> bool {
        matches!(
            self,
            Self::OverlappingEdits { .. } | Self::EditOutOfBounds { .. }
        )
    }
}
