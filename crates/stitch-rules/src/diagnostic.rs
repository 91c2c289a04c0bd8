//! Diagnostic types for structured error reporting.
//!
//! Every failure while loading or compiling a rule file is surfaced as a
//! [`DiagnosticReport`] holding one or more [`Diagnostic`] entries. Each
//! diagnostic carries a stable [`DiagnosticCode`], a human-readable message
//! and supplementary notes naming where in the rule file the problem sits.

use std::fmt;

use serde::{Deserialize, Serialize};
use stitch_syntax::SyntaxError;

/// Stable error codes for rule diagnostics.
///
/// Each variant corresponds to a documented `E_STITCH_*` error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum DiagnosticCode {
    /// The rule file is not well-formed YAML.
    EStitchYamlParse,
    /// The rule file is not well-formed JSON.
    EStitchJsonParse,
    /// The document does not have the shape of a rule configuration.
    EStitchSchemaInvalid,
    /// The `language` key names no supported language.
    EStitchUnknownLanguage,
    /// A pattern failed to compile for the rule's language.
    EStitchPatternInvalid,
    /// A rule is malformed: unknown kind or field, bad regex, undefined
    /// reference.
    EStitchRuleInvalid,
    /// Utility rules reference each other in a cycle.
    EStitchCyclicRule,
    /// A transformation is malformed or reads an undefined name.
    EStitchTransformInvalid,
    /// The `fix` template references an undefined name.
    EStitchFixInvalid,
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EStitchYamlParse => f.write_str("E_STITCH_YAML_PARSE"),
            Self::EStitchJsonParse => f.write_str("E_STITCH_JSON_PARSE"),
            Self::EStitchSchemaInvalid => f.write_str("E_STITCH_SCHEMA_INVALID"),
            Self::EStitchUnknownLanguage => f.write_str("E_STITCH_UNKNOWN_LANGUAGE"),
            Self::EStitchPatternInvalid => f.write_str("E_STITCH_PATTERN_INVALID"),
            Self::EStitchRuleInvalid => f.write_str("E_STITCH_RULE_INVALID"),
            Self::EStitchCyclicRule => f.write_str("E_STITCH_CYCLIC_RULE"),
            Self::EStitchTransformInvalid => f.write_str("E_STITCH_TRANSFORM_INVALID"),
            Self::EStitchFixInvalid => f.write_str("E_STITCH_FIX_INVALID"),
        }
    }
}

impl DiagnosticCode {
    /// Picks the code describing a core compilation failure.
    #[must_use]
    pub const fn for_syntax_error(error: &SyntaxError) -> Self {
        match error {
            SyntaxError::PatternCompileError { .. }
            | SyntaxError::InvalidMetavariable { .. }
            | SyntaxError::ParseError { .. }
            | SyntaxError::ParserInitError { .. } => Self::EStitchPatternInvalid,
            SyntaxError::CyclicRule { .. } => Self::EStitchCyclicRule,
            SyntaxError::InvalidReplacement { .. } => Self::EStitchFixInvalid,
            _ => Self::EStitchRuleInvalid,
        }
    }
}

/// A single diagnostic entry within a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The stable error code.
    code: DiagnosticCode,
    /// A human-readable description of the problem.
    message: String,
    /// Additional notes locating the problem in the rule file.
    notes: Vec<String>,
}

impl Diagnostic {
    /// Creates a new diagnostic.
    #[must_use]
    pub const fn new(code: DiagnosticCode, message: String, notes: Vec<String>) -> Self {
        Self {
            code,
            message,
            notes,
        }
    }

    /// Creates a diagnostic from a core compilation error.
    #[must_use]
    pub fn from_syntax_error(error: &SyntaxError) -> Self {
        Self::new(
            DiagnosticCode::for_syntax_error(error),
            error.to_string(),
            Vec::new(),
        )
    }

    /// Appends a note.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Returns the diagnostic code.
    #[must_use]
    pub const fn code(&self) -> DiagnosticCode {
        self.code
    }

    /// Returns the diagnostic message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the supplementary notes.
    #[must_use]
    pub fn notes(&self) -> &[String] {
        &self.notes
    }
}

/// Summarises the first diagnostic in a report for the `Display` impl.
fn diagnostic_summary(diagnostics: &[Diagnostic]) -> String {
    diagnostics.first().map_or_else(
        || String::from("empty diagnostic report"),
        |d| format!("{}: {}", d.code, d.message),
    )
}

/// A collection of diagnostics produced while loading or compiling rules.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("{}", diagnostic_summary(&self.diagnostics))]
pub struct DiagnosticReport {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticReport {
    /// Creates a report from a vector of diagnostics.
    #[must_use]
    pub const fn new(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }

    /// Creates a single-diagnostic report.
    #[must_use]
    pub fn single(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::from(Diagnostic::new(code, message.into(), Vec::new()))
    }

    /// Returns the diagnostics in this report.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Returns the code of the first diagnostic, if any.
    #[must_use]
    pub fn first_code(&self) -> Option<DiagnosticCode> {
        self.diagnostics.first().map(Diagnostic::code)
    }

    /// Returns `true` if the report contains no diagnostics.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Returns the number of diagnostics in the report.
    #[must_use]
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }
}

impl From<Diagnostic> for DiagnosticReport {
    fn from(diagnostic: Diagnostic) -> Self {
        Self::new(vec![diagnostic])
    }
}
