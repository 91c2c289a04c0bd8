//! Pattern compilation for structural code matching.
//!
//! A pattern is ordinary source code in the target language in which some
//! sub-expressions are replaced by meta-variables:
//!
//! - `$VAR` matches any single named node and captures it as `VAR`
//! - `$_` matches any single named node without capturing
//! - `$$$VAR` matches a run of zero or more sibling nodes and captures it
//! - `$$$_` and a bare `$$$` match such a run without capturing
//!
//! Names start with an uppercase ASCII letter or `_` and continue with
//! uppercase letters, digits or `_`. Compilation parses the pattern with the
//! target grammar and turns the resulting syntax tree into an owned
//! [`PatternNode`] tree that no longer borrows from any parse.

use std::collections::{BTreeSet, HashMap};
use std::ops::Range;

use tracing::debug;

use crate::error::SyntaxError;
use crate::language::SupportedLanguage;
use crate::metavariables::{MetaVarKind, MetaVariable, lex_pattern, placeholder_index};
use crate::node::Node;
use crate::parser::Parser;

/// A compiled structural pattern.
///
/// Patterns are immutable once compiled and may be shared between threads
/// and reused for any number of searches over trees of the same language.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    language: SupportedLanguage,
    metavariables: Vec<MetaVariable>,
    root: PatternNode,
}

/// A node of a compiled pattern tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternNode {
    /// A meta-variable standing for one node or a run of siblings.
    MetaVar {
        /// Capture name, or `None` for a non-capturing wildcard.
        name: Option<String>,
        /// Whether one node or a run of nodes is matched.
        kind: MetaVarKind,
    },
    /// A concrete node without children, matched by kind and text.
    Terminal {
        /// Grammar kind of the node.
        kind: &'static str,
        /// Exact source text of the node.
        text: String,
        /// Whether the node is named rather than an anonymous token.
        is_named: bool,
    },
    /// A concrete node matched by kind and, in order, by its children.
    Internal {
        /// Grammar kind of the node.
        kind: &'static str,
        /// Children in document order, anonymous tokens included.
        children: Vec<PatternChild>,
    },
}

/// A child of an [`PatternNode::Internal`] node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternChild {
    /// The grammar field the child occupies, if any.
    pub field: Option<&'static str>,
    /// The child pattern.
    pub node: PatternNode,
}

impl PatternNode {
    /// Returns the grammar kind for concrete nodes.
    #[must_use]
    pub const fn kind(&self) -> Option<&'static str> {
        match self {
            Self::MetaVar { .. } => None,
            Self::Terminal { kind, .. } | Self::Internal { kind, .. } => Some(kind),
        }
    }

    /// Returns whether this node is a multi-node meta-variable.
    #[must_use]
    pub const fn is_multi(&self) -> bool {
        matches!(
            self,
            Self::MetaVar {
                kind: MetaVarKind::Multiple,
                ..
            }
        )
    }
}

impl Pattern {
    /// Compiles a pattern string for the given language.
    ///
    /// Snippets that are not complete programs, such as Rust statements,
    /// are retried inside a function body before being rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern contains malformed meta-variables,
    /// uses one name both as `$NAME` and `$$$NAME`, or does not parse under
    /// the grammar.
    ///
    /// # Examples
    ///
    /// ```
    /// use stitch_syntax::{Pattern, SupportedLanguage};
    ///
    /// let pattern = Pattern::compile("console.log($ARG)", SupportedLanguage::TypeScript)?;
    /// assert_eq!(pattern.root().kind(), Some("call_expression"));
    /// # Ok::<(), stitch_syntax::SyntaxError>(())
    /// ```
    pub fn compile(source: &str, language: SupportedLanguage) -> Result<Self, SyntaxError> {
        let lexed = lex_pattern(source)?;
        validate_multiplicities(&lexed.metavariables)?;
        if lexed.normalised.trim().is_empty() {
            return Err(SyntaxError::pattern_compile(language, "pattern is empty"));
        }

        let metavariables = lexed.metavariables;
        let root = with_parsed(language, &lexed.normalised, |start, span| {
            Ok(convert(select_root(start, &span), &metavariables))
        })?;

        debug!(
            target: "stitch_syntax::pattern",
            %language,
            pattern = source,
            metavariables = metavariables.len(),
            "compiled pattern"
        );

        Ok(Self {
            source: source.to_owned(),
            language,
            metavariables,
            root,
        })
    }

    /// Compiles a pattern whose root is the first `selector` node found in
    /// `context`.
    ///
    /// This lets a fragment that only parses inside a larger construct, such
    /// as a class field or an object key, be used as a pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the context fails to compile as a pattern, if
    /// `selector` is not a kind of the grammar, or if no node of that kind
    /// appears in the context.
    pub fn contextual(
        context: &str,
        selector: &str,
        language: SupportedLanguage,
    ) -> Result<Self, SyntaxError> {
        if language.kind_id(selector).is_none() {
            return Err(SyntaxError::unknown_kind(language, selector));
        }
        let lexed = lex_pattern(context)?;
        validate_multiplicities(&lexed.metavariables)?;

        let metavariables = lexed.metavariables;
        let root = with_parsed(language, &lexed.normalised, |start, _| {
            start
                .dfs()
                .find(|node| node.is(selector))
                .map(|node| convert(node, &metavariables))
                .ok_or_else(|| {
                    SyntaxError::pattern_compile(
                        language,
                        format!("selector '{selector}' does not occur in the context"),
                    )
                })
        })?;

        Ok(Self {
            source: context.to_owned(),
            language,
            metavariables,
            root,
        })
    }

    /// Returns the original pattern source.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the language this pattern is compiled for.
    #[must_use]
    pub const fn language(&self) -> SupportedLanguage {
        self.language
    }

    /// Returns the meta-variables in the order they appear in the source.
    #[must_use]
    pub fn metavariables(&self) -> &[MetaVariable] {
        &self.metavariables
    }

    /// Returns whether this pattern has any meta-variables.
    #[must_use]
    pub fn has_metavariables(&self) -> bool {
        !self.metavariables.is_empty()
    }

    /// Returns the root of the compiled pattern tree.
    #[must_use]
    pub const fn root(&self) -> &PatternNode {
        &self.root
    }

    /// Returns the capture names this pattern can bind.
    #[must_use]
    pub fn defined_vars(&self) -> BTreeSet<&str> {
        self.metavariables
            .iter()
            .filter_map(|m| m.name.as_deref())
            .collect()
    }
}

/// Returns whether `kind` is a comment, which matching ignores.
pub(crate) fn is_comment(kind: &str) -> bool {
    kind == "comment" || kind.ends_with("_comment")
}

fn validate_multiplicities(metavariables: &[MetaVariable]) -> Result<(), SyntaxError> {
    let mut seen: HashMap<&str, MetaVarKind> = HashMap::new();
    for metavar in metavariables {
        let Some(name) = metavar.name.as_deref() else {
            continue;
        };
        match seen.insert(name, metavar.kind) {
            Some(previous) if previous != metavar.kind => {
                return Err(SyntaxError::invalid_metavariable(format!(
                    "metavariable {name} is used both as ${name} and $$${name}"
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Parses normalised pattern text, wrapping it in a function body when it
/// does not parse on its own, and hands the node to start from together
/// with the byte span the user's text occupies.
fn with_parsed<T>(
    language: SupportedLanguage,
    normalised: &str,
    select: impl FnOnce(Node<'_>, Range<usize>) -> Result<T, SyntaxError>,
) -> Result<T, SyntaxError> {
    let mut parser = Parser::new(language)?;

    let direct = parser.parse(normalised)?;
    if !direct.has_errors() {
        let span = trimmed_span(normalised, 0..normalised.len());
        return select(direct.root(), span);
    }

    let wrapper = Wrapper::new(language, normalised);
    let wrapped = parser.parse(&wrapper.text)?;
    if wrapped.has_errors() {
        return Err(SyntaxError::pattern_compile(
            language,
            "pattern contains syntax errors",
        ));
    }

    let body = wrapped
        .root()
        .dfs()
        .find(|node| node.is(wrapper.body_kind))
        .ok_or_else(|| SyntaxError::internal_error("pattern wrapper has no body"))?;
    select(body, wrapper.span)
}

struct Wrapper {
    text: String,
    span: Range<usize>,
    body_kind: &'static str,
}

impl Wrapper {
    fn new(language: SupportedLanguage, pattern: &str) -> Self {
        match language {
            SupportedLanguage::Rust => {
                let prefix = "fn __stitch_pattern__() { ";
                let trimmed = pattern.trim();
                let needs_semicolon = !trimmed.ends_with(';') && !trimmed.ends_with('}');
                let mut text = format!("{prefix}{trimmed}");
                let end = text.len();
                if needs_semicolon {
                    text.push(';');
                }
                text.push_str(" }");
                Self {
                    span: trimmed_span(&text, prefix.len()..end),
                    text,
                    body_kind: "block",
                }
            }
            SupportedLanguage::Python => {
                let mut text = String::from("def __stitch_pattern__():\n");
                let start = text.len();
                for line in pattern.lines() {
                    text.push_str("    ");
                    text.push_str(line);
                    text.push('\n');
                }
                Self {
                    span: trimmed_span(&text, start..text.len()),
                    text,
                    body_kind: "block",
                }
            }
            SupportedLanguage::TypeScript => {
                let prefix = "function __stitch_pattern__() { ";
                let text = format!("{prefix}{pattern} }}");
                let end = prefix.len() + pattern.len();
                Self {
                    span: trimmed_span(&text, prefix.len()..end),
                    text,
                    body_kind: "statement_block",
                }
            }
        }
    }
}

/// Shrinks `range` to exclude leading and trailing whitespace of `text`.
fn trimmed_span(text: &str, range: Range<usize>) -> Range<usize> {
    let content = text.get(range.clone()).unwrap_or_default();
    let start = range.start + (content.len() - content.trim_start().len());
    let end = range.start + content.trim_end().len();
    start..end.max(start)
}

/// Descends through nodes that merely wrap the user's snippet.
///
/// Starting from the program (or the wrapper function body), the walk
/// moves to the only named child for as long as that child still spans the
/// whole snippet.
fn select_root<'r>(start: Node<'r>, span: &Range<usize>) -> Node<'r> {
    let mut node = start;
    loop {
        let mut named = node.named_children().filter(|n| !is_comment(n.kind()));
        let (Some(only), None) = (named.next(), named.next()) else {
            return node;
        };
        let range = only.byte_range();
        if range.start > span.start || range.end < span.end {
            return node;
        }
        node = only;
    }
}

fn convert(node: Node<'_>, metavariables: &[MetaVariable]) -> PatternNode {
    if let Some(metavar) = placeholder_index(node.text()).and_then(|i| metavariables.get(i)) {
        return PatternNode::MetaVar {
            name: metavar.name.clone(),
            kind: metavar.kind,
        };
    }

    let children: Vec<_> = node
        .children_with_fields()
        .into_iter()
        .filter(|(child, _)| !is_comment(child.kind()))
        .map(|(child, field)| PatternChild {
            field,
            node: convert(child, metavariables),
        })
        .collect();

    if children.is_empty() {
        PatternNode::Terminal {
            kind: node.kind(),
            text: node.text().to_owned(),
            is_named: node.is_named(),
        }
    } else {
        PatternNode::Internal {
            kind: node.kind(),
            children,
        }
    }
}
