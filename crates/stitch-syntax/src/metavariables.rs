//! Meta-variable lexing shared by patterns and rewrite templates.
//!
//! Patterns and templates use `$NAME` and `$$$NAME` meta-variables. This
//! module centralises the naming rules so both sides agree on what counts as
//! a meta-variable and what is plain source text.

use std::iter::Peekable;
use std::str::CharIndices;

use crate::error::SyntaxError;

const PLACEHOLDER_PREFIX: &str = "__STITCH_MV_";
const PLACEHOLDER_SUFFIX: &str = "__";

/// The name used by non-capturing wildcards.
pub(crate) const WILDCARD_NAME: &str = "_";

/// How many nodes a meta-variable stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaVarKind {
    /// Matches exactly one named node (`$VAR`).
    Single,
    /// Matches a contiguous run of zero or more sibling nodes (`$$$VAR`).
    Multiple,
}

impl MetaVarKind {
    const fn from_dollars(dollars: usize) -> Self {
        if dollars == 3 {
            Self::Multiple
        } else {
            Self::Single
        }
    }

    /// Returns the `$` prefix written before a name of this kind.
    #[must_use]
    pub const fn sigil(self) -> &'static str {
        match self {
            Self::Single => "$",
            Self::Multiple => "$$$",
        }
    }
}

/// A meta-variable occurrence in a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaVariable {
    /// The capture name without the `$` prefix, or `None` for the
    /// non-capturing wildcards `$_`, `$$$_` and `$$$`.
    pub name: Option<String>,
    /// Whether one node or a run of nodes is matched.
    pub kind: MetaVarKind,
    /// Byte offset of the leading `$` in the pattern source.
    pub offset: usize,
}

/// Output of lexing a pattern: the source with each meta-variable replaced
/// by an identifier placeholder, plus the meta-variables in order.
#[derive(Debug)]
pub(crate) struct LexedPattern {
    pub(crate) normalised: String,
    pub(crate) metavariables: Vec<MetaVariable>,
}

/// Returns whether `c` may start a meta-variable name.
pub(crate) const fn is_valid_metavar_start_char(c: char) -> bool {
    c.is_ascii_uppercase() || c == '_'
}

/// Returns whether `c` may continue a meta-variable name.
pub(crate) const fn is_valid_metavar_continuation_char(c: char) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_'
}

/// Consumes a run of `$` characters, returning how many were read.
///
/// The iterator is expected to sit just after the first `$`.
pub(crate) fn consume_dollars(chars: &mut Peekable<CharIndices<'_>>) -> usize {
    let mut dollars = 1;
    while chars.next_if(|(_, c)| *c == '$').is_some() {
        dollars += 1;
    }
    dollars
}

/// Extracts a meta-variable name from a character stream.
///
/// Returns an empty string, consuming nothing, if the next character cannot
/// start a name.
pub(crate) fn extract_metavar_name(chars: &mut Peekable<CharIndices<'_>>) -> String {
    let mut name = String::new();
    if let Some((_, first)) = chars.next_if(|(_, c)| is_valid_metavar_start_char(*c)) {
        name.push(first);
        while let Some((_, c)) = chars.next_if(|(_, c)| is_valid_metavar_continuation_char(*c)) {
            name.push(c);
        }
    }
    name
}

/// Replaces every meta-variable in `source` with an identifier placeholder.
///
/// A `$` that is not followed by a valid name is kept as literal text, with
/// the exception of a bare `$$$`, which is a non-capturing multi wildcard.
///
/// # Errors
///
/// Returns [`SyntaxError::InvalidMetavariable`] for a name preceded by two
/// or more than three `$` characters.
pub(crate) fn lex_pattern(source: &str) -> Result<LexedPattern, SyntaxError> {
    let mut normalised = String::with_capacity(source.len());
    let mut metavariables = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some((offset, ch)) = chars.next() {
        if ch != '$' {
            normalised.push(ch);
            continue;
        }

        let dollars = consume_dollars(&mut chars);
        let name = extract_metavar_name(&mut chars);

        if name.is_empty() {
            if dollars == 3 {
                normalised.push_str(&placeholder(metavariables.len()));
                metavariables.push(MetaVariable {
                    name: None,
                    kind: MetaVarKind::Multiple,
                    offset,
                });
            } else {
                normalised.extend(std::iter::repeat_n('$', dollars));
            }
            continue;
        }

        if dollars == 2 || dollars > 3 {
            return Err(SyntaxError::invalid_metavariable(format!(
                "metavariable ${name} at offset {offset} has invalid '$' prefix length ({dollars})"
            )));
        }

        normalised.push_str(&placeholder(metavariables.len()));
        metavariables.push(MetaVariable {
            name: (name != WILDCARD_NAME).then_some(name),
            kind: MetaVarKind::from_dollars(dollars),
            offset,
        });
    }

    Ok(LexedPattern {
        normalised,
        metavariables,
    })
}

fn placeholder(index: usize) -> String {
    format!("{PLACEHOLDER_PREFIX}{index}{PLACEHOLDER_SUFFIX}")
}

/// Returns the index of the meta-variable a placeholder identifier stands
/// for, or `None` when `text` is not a placeholder.
pub(crate) fn placeholder_index(text: &str) -> Option<usize> {
    text.strip_prefix(PLACEHOLDER_PREFIX)?
        .strip_suffix(PLACEHOLDER_SUFFIX)?
        .parse()
        .ok()
}

/// A piece of a rewrite template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TemplateSegment {
    Text(String),
    Var { name: String, kind: MetaVarKind },
}

/// Splits a rewrite template into literal text and meta-variable
/// references.
///
/// Anything that is not a well-formed `$NAME` or `$$$NAME` reference is
/// literal text, including `$_` which never names a capture.
pub(crate) fn parse_template(template: &str) -> Vec<TemplateSegment> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut chars = template.char_indices().peekable();

    while let Some((_, ch)) = chars.next() {
        if ch != '$' {
            text.push(ch);
            continue;
        }

        let dollars = consume_dollars(&mut chars);
        let name = extract_metavar_name(&mut chars);
        let is_reference =
            !name.is_empty() && name != WILDCARD_NAME && (dollars == 1 || dollars == 3);
        if !is_reference {
            text.extend(std::iter::repeat_n('$', dollars));
            text.push_str(&name);
            continue;
        }

        if !text.is_empty() {
            segments.push(TemplateSegment::Text(std::mem::take(&mut text)));
        }
        segments.push(TemplateSegment::Var {
            name,
            kind: MetaVarKind::from_dollars(dollars),
        });
    }

    if !text.is_empty() {
        segments.push(TemplateSegment::Text(text));
    }
    segments
}
