//! Structural rewrite engine for code transformations.
//!
//! A [`RewriteRule`] pairs anything that compiles to a [`RuleCore`] with a
//! replacement template. Captures (`$NAME`, `$$$NAME`) and transformation
//! outputs are substituted into the template, and the resulting edits are
//! committed against the parsed source in one step.
//!
//! A rule may widen what it replaces beyond the matched node. An expander
//! is a [`Relation`] tested against the following (`expand_end`) or
//! preceding (`expand_start`) siblings of the match; the first sibling it
//! accepts before its stop condition becomes the new edge of the edit. This
//! is how a rule deleting a list element also removes the trailing comma.

use tracing::{debug, trace};

use crate::edit::Edit;
use crate::environment::MetaVarEnv;
use crate::error::SyntaxError;
use crate::language::SupportedLanguage;
use crate::matcher::NodeMatch;
use crate::metavariables::{TemplateSegment, parse_template};
use crate::node::Node;
use crate::parser::Root;
use crate::rule::{Relation, RuleCore};

/// A structural rewrite rule.
///
/// Combines a matcher with a replacement template. Captures and transformed
/// names defined by the matcher can be referenced in the replacement.
#[derive(Debug, Clone)]
pub struct RewriteRule {
    core: RuleCore,
    replacement: String,
    segments: Vec<TemplateSegment>,
    expand_start: Option<Relation>,
    expand_end: Option<Relation>,
}

impl RewriteRule {
    /// Creates a new rewrite rule.
    ///
    /// `matcher` may be a [`Pattern`](crate::Pattern), a
    /// [`Rule`](crate::Rule) or a full [`RuleCore`].
    ///
    /// # Errors
    ///
    /// Returns [`SyntaxError::InvalidReplacement`] if the replacement refers
    /// to a name the matcher never defines.
    pub fn new(
        matcher: impl Into<RuleCore>,
        replacement: impl Into<String>,
    ) -> Result<Self, SyntaxError> {
        let core = matcher.into();
        let replacement_str = replacement.into();
        let segments = parse_template(&replacement_str);

        let defined = core.defined_vars();
        for segment in &segments {
            if let TemplateSegment::Var { name, kind } = segment
                && !defined.contains(name)
            {
                return Err(SyntaxError::invalid_replacement(format!(
                    "replacement references undefined metavariable: {}{name}",
                    kind.sigil()
                )));
            }
        }

        Ok(Self {
            core,
            replacement: replacement_str,
            segments,
            expand_start: None,
            expand_end: None,
        })
    }

    /// Widens each edit back to the first preceding sibling `relation`
    /// accepts.
    #[must_use]
    pub fn with_expand_start(mut self, relation: Relation) -> Self {
        self.expand_start = Some(relation);
        self
    }

    /// Widens each edit forward to the first following sibling `relation`
    /// accepts.
    #[must_use]
    pub fn with_expand_end(mut self, relation: Relation) -> Self {
        self.expand_end = Some(relation);
        self
    }

    /// Returns the backward expander, if any.
    #[must_use]
    pub const fn expand_start(&self) -> Option<&Relation> {
        self.expand_start.as_ref()
    }

    /// Returns the forward expander, if any.
    #[must_use]
    pub const fn expand_end(&self) -> Option<&Relation> {
        self.expand_end.as_ref()
    }

    /// Returns the matcher of this rule.
    #[must_use]
    pub const fn core(&self) -> &RuleCore {
        &self.core
    }

    /// Returns the replacement template.
    #[must_use]
    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// Renders the replacement for one match environment.
    ///
    /// Names bound by neither a capture nor a transformation (for example
    /// a capture from an `any` branch that did not match) render empty.
    #[must_use]
    pub fn render(&self, env: &MetaVarEnv<'_>) -> String {
        let mut out = String::with_capacity(self.replacement.len());
        for segment in &self.segments {
            match segment {
                TemplateSegment::Text(text) => out.push_str(text),
                TemplateSegment::Var { name, .. } => {
                    if let Some(text) = env.text_of(name) {
                        out.push_str(&text);
                    } else if let Some(text) = env.get_transformed(name) {
                        out.push_str(text);
                    }
                }
            }
        }
        out
    }

    /// Builds one edit per match below `node`.
    ///
    /// When matches nest, only the outermost is rewritten, so the returned
    /// edits never overlap.
    #[must_use]
    pub fn edits(&self, node: Node<'_>) -> Vec<Edit> {
        let mut edits: Vec<Edit> = Vec::new();
        for found in node.find_all(&self.core) {
            let range = self.replaced_range(&found);
            if edits.last().is_some_and(|prev| range.start < prev.end_pos) {
                trace!(
                    target: "stitch_syntax::rewriter",
                    start = range.start,
                    "skipping match nested in an earlier rewrite"
                );
                continue;
            }
            edits.push(Edit::new(
                range.start,
                range.end,
                self.render(found.get_env()),
            ));
        }
        edits
    }

    /// Returns the byte range one match replaces, after expansion.
    fn replaced_range(&self, found: &NodeMatch<'_>) -> std::ops::Range<usize> {
        let node = found.get_node();
        let mut range = node.byte_range();
        if let Some(relation) = &self.expand_start {
            let mut env = found.get_env().clone();
            if let Some(edge) = relation.find_sibling(node.prev_nearest_first(), &mut env) {
                range.start = edge.byte_range().start;
            }
        }
        if let Some(relation) = &self.expand_end {
            let mut env = found.get_env().clone();
            if let Some(edge) = relation.find_sibling(node.next_all(), &mut env) {
                range.end = edge.byte_range().end;
            }
        }
        range
    }
}

/// Engine for applying structural rewrites.
#[derive(Debug, Clone, Copy)]
pub struct Rewriter {
    language: SupportedLanguage,
}

impl Rewriter {
    /// Creates a new rewriter for the given language.
    #[must_use]
    pub const fn new(language: SupportedLanguage) -> Self {
        Self { language }
    }

    /// Returns the language this rewriter is configured for.
    #[must_use]
    pub const fn language(&self) -> SupportedLanguage {
        self.language
    }

    /// Applies a rewrite rule to source code.
    ///
    /// Finds all matches of the rule and replaces each with the rendered
    /// template.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or the edits cannot be committed.
    pub fn apply(&self, rule: &RewriteRule, source: &str) -> Result<RewriteResult, SyntaxError> {
        let parsed = Root::parse(source, self.language)?;
        self.apply_to_root(rule, &parsed)
    }

    /// Applies a rewrite rule to an already parsed tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the edits cannot be committed.
    pub fn apply_to_root(
        &self,
        rule: &RewriteRule,
        root: &Root,
    ) -> Result<RewriteResult, SyntaxError> {
        let edits = rule.edits(root.root());
        let num_replacements = edits.len();
        if num_replacements == 0 {
            return Ok(RewriteResult {
                output: root.source().to_owned(),
                num_replacements,
            });
        }

        let output = root.commit_edits(edits)?;
        debug!(
            target: "stitch_syntax::rewriter",
            language = %self.language,
            num_replacements,
            "applied rewrite"
        );
        Ok(RewriteResult {
            output,
            num_replacements,
        })
    }

    /// Applies multiple rewrite rules in sequence.
    ///
    /// Each rule is applied to the result of the previous rule.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing or committing fails for any rule.
    pub fn apply_all(
        &self,
        rules: &[RewriteRule],
        source: &str,
    ) -> Result<RewriteResult, SyntaxError> {
        let mut current = source.to_owned();
        let mut total_replacements: usize = 0;

        for rule in rules {
            let result = self.apply(rule, &current)?;
            total_replacements = total_replacements.saturating_add(result.num_replacements);
            current = result.output;
        }

        Ok(RewriteResult {
            output: current,
            num_replacements: total_replacements,
        })
    }
}

/// Result of a rewrite operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteResult {
    output: String,
    num_replacements: usize,
}

impl RewriteResult {
    /// Returns the transformed source code.
    #[must_use]
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Returns the number of replacements made.
    #[must_use]
    pub const fn num_replacements(&self) -> usize {
        self.num_replacements
    }

    /// Returns whether any replacements were made.
    #[must_use]
    pub const fn has_changes(&self) -> bool {
        self.num_replacements > 0
    }
}
