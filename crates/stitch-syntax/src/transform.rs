//! Derived strings computed from captures after a match.
//!
//! A transformation reads the text of one capture (or of an earlier
//! transformation) and stores a new string under its own name. Rewrite
//! templates can then reference that name like any other meta-variable.

use std::borrow::Cow;

use regex::Regex;
use strum::{Display, EnumString};

use crate::environment::MetaVarEnv;
use crate::error::SyntaxError;
use crate::metavariables::{consume_dollars, extract_metavar_name};

/// Target case for a [`Transformation::Convert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(serialize_all = "camelCase")]
pub enum StringCase {
    /// `fooBar` becomes `FOOBAR`.
    UpperCase,
    /// `FooBar` becomes `foobar`.
    LowerCase,
    /// `fooBar` becomes `FooBar`.
    Capitalize,
    /// `foo_bar` becomes `fooBar`.
    CamelCase,
    /// `fooBar` becomes `foo_bar`.
    SnakeCase,
    /// `fooBar` becomes `foo-bar`.
    KebabCase,
    /// `foo_bar` becomes `FooBar`.
    PascalCase,
}

/// A derived-string computation over a capture.
#[derive(Debug, Clone)]
pub enum Transformation {
    /// Takes a character range of the source text.
    ///
    /// Offsets count characters, not bytes; negative offsets count back
    /// from the end.
    Substring {
        /// Name of the capture read.
        source: String,
        /// First character kept, defaulting to the start.
        start_char: Option<i64>,
        /// First character dropped, defaulting to the end.
        end_char: Option<i64>,
    },
    /// Replaces every match of a regular expression.
    Replace {
        /// Name of the capture read.
        source: String,
        /// Expression to search for.
        replace: Regex,
        /// Replacement text; `$1` and `$name` refer to regex groups.
        by: String,
    },
    /// Changes the case of the text.
    Convert {
        /// Name of the capture read.
        source: String,
        /// Case to convert to.
        to_case: StringCase,
    },
}

impl Transformation {
    /// Creates a substring transformation reading `source` (e.g. `$ARG`).
    ///
    /// # Errors
    ///
    /// Returns [`SyntaxError::InvalidMetavariable`] if `source` is not a
    /// meta-variable reference.
    pub fn substring(
        source: &str,
        start_char: Option<i64>,
        end_char: Option<i64>,
    ) -> Result<Self, SyntaxError> {
        Ok(Self::Substring {
            source: parse_source(source)?,
            start_char,
            end_char,
        })
    }

    /// Creates a regex replacement transformation reading `source`.
    ///
    /// # Errors
    ///
    /// Returns an error if `source` is not a meta-variable reference or if
    /// `replace` is not a valid regular expression.
    pub fn replace(
        source: &str,
        replace: &str,
        by: impl Into<String>,
    ) -> Result<Self, SyntaxError> {
        let regex =
            Regex::new(replace).map_err(|e| SyntaxError::invalid_regex(replace, e.to_string()))?;
        Ok(Self::Replace {
            source: parse_source(source)?,
            replace: regex,
            by: by.into(),
        })
    }

    /// Creates a case conversion reading `source`.
    ///
    /// # Errors
    ///
    /// Returns [`SyntaxError::InvalidMetavariable`] if `source` is not a
    /// meta-variable reference.
    pub fn convert(source: &str, to_case: StringCase) -> Result<Self, SyntaxError> {
        Ok(Self::Convert {
            source: parse_source(source)?,
            to_case,
        })
    }

    /// Returns the name of the capture this transformation reads.
    #[must_use]
    pub fn source(&self) -> &str {
        match self {
            Self::Substring { source, .. }
            | Self::Replace { source, .. }
            | Self::Convert { source, .. } => source,
        }
    }

    /// Computes the derived string, or `None` if the source is unbound.
    #[must_use]
    pub fn apply(&self, env: &MetaVarEnv<'_>) -> Option<String> {
        let text = env
            .text_of(self.source())
            .map(Cow::into_owned)
            .or_else(|| env.get_transformed(self.source()).map(str::to_owned))?;

        Some(match self {
            Self::Substring {
                start_char,
                end_char,
                ..
            } => substring(&text, *start_char, *end_char),
            Self::Replace { replace, by, .. } => {
                replace.replace_all(&text, by.as_str()).into_owned()
            }
            Self::Convert { to_case, .. } => convert_case(&text, *to_case),
        })
    }
}

/// Parses `$NAME` or `$$$NAME` into `NAME`.
fn parse_source(source: &str) -> Result<String, SyntaxError> {
    let mut chars = source.trim().char_indices().peekable();
    let invalid = || {
        SyntaxError::invalid_metavariable(format!(
            "transformation source '{source}' is not a metavariable"
        ))
    };

    if chars.next().is_none_or(|(_, c)| c != '$') {
        return Err(invalid());
    }
    let dollars = consume_dollars(&mut chars);
    let name = extract_metavar_name(&mut chars);
    if name.is_empty() || chars.next().is_some() || !(dollars == 1 || dollars == 3) {
        return Err(invalid());
    }
    Ok(name)
}

fn substring(text: &str, start_char: Option<i64>, end_char: Option<i64>) -> String {
    let chars: Vec<char> = text.chars().collect();
    let len = i64::try_from(chars.len()).unwrap_or(i64::MAX);
    let resolve = |offset: i64| {
        let absolute = if offset < 0 {
            len.saturating_add(offset)
        } else {
            offset
        };
        usize::try_from(absolute.clamp(0, len)).unwrap_or_default()
    };

    let from = start_char.map_or(0, resolve);
    let to = end_char.map_or(chars.len(), resolve);
    chars
        .get(from..to)
        .map(|kept| kept.iter().collect())
        .unwrap_or_default()
}

fn convert_case(text: &str, to_case: StringCase) -> String {
    match to_case {
        StringCase::UpperCase => text.to_uppercase(),
        StringCase::LowerCase => text.to_lowercase(),
        StringCase::Capitalize => capitalize(text),
        StringCase::SnakeCase => join_lower(&split_words(text), "_"),
        StringCase::KebabCase => join_lower(&split_words(text), "-"),
        StringCase::PascalCase => split_words(text)
            .iter()
            .map(|word| capitalize(&word.to_lowercase()))
            .collect(),
        StringCase::CamelCase => split_words(text)
            .iter()
            .enumerate()
            .map(|(i, word)| {
                let lower = word.to_lowercase();
                if i == 0 { lower } else { capitalize(&lower) }
            })
            .collect(),
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

fn join_lower(words: &[String], separator: &str) -> String {
    words
        .iter()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Splits identifiers written in any common case into words.
///
/// Separators are `_`, `-` and whitespace. A new word also starts at a
/// lower-to-upper transition (`fooBar`) and before the last capital of an
/// acronym followed by a lowercase letter (`HTTPServer`).
fn split_words(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, c) in chars.iter().copied().enumerate() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        let prev = i.checked_sub(1).and_then(|p| chars.get(p)).copied();
        let next = chars.get(i + 1).copied();
        let starts_word = c.is_uppercase()
            && !current.is_empty()
            && (prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit())
                || (prev.is_some_and(char::is_uppercase) && next.is_some_and(char::is_lowercase)));
        if starts_word {
            words.push(std::mem::take(&mut current));
        }
        current.push(c);
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}
