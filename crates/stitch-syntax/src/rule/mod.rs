//! Composable matching rules.
//!
//! A [`Rule`] is a tagged tree of atomic matchers (kind, pattern, regex),
//! boolean combinators and relational checks against the candidate's
//! ancestors, descendants and siblings. Rules referring to other rules by
//! name are resolved through a [`RuleRegistry`], which rejects undefined
//! names and reference cycles before any tree is searched.

mod registry;
mod rule_core;

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::warn;

use crate::environment::MetaVarEnv;
use crate::error::SyntaxError;
use crate::fields::FieldIndex;
use crate::language::SupportedLanguage;
use crate::matcher::{KindMatcher, Matcher, RegexMatcher};
use crate::node::Node;
use crate::pattern::Pattern;

pub use registry::RuleRegistry;
pub use rule_core::RuleCore;

/// A matching rule.
#[derive(Debug, Clone)]
pub enum Rule {
    /// Matches nodes of one kind.
    Kind(KindMatcher),
    /// Matches nodes structurally equal to a pattern.
    Pattern(Pattern),
    /// Matches nodes whose text matches a regular expression.
    Regex(RegexMatcher),
    /// Matches when every sub-rule matches the same node.
    All(Vec<Rule>),
    /// Matches when some sub-rule matches, keeping only its captures.
    Any(Vec<Rule>),
    /// Matches when the sub-rule does not match. Captures nothing.
    Not(Box<Rule>),
    /// Matches when an ancestor satisfies the relation.
    Inside(Box<Relation>),
    /// Matches when a descendant satisfies the relation.
    Has(Box<Relation>),
    /// Matches when a later sibling satisfies the relation.
    Precedes(Box<Relation>),
    /// Matches when an earlier sibling satisfies the relation.
    Follows(Box<Relation>),
    /// Matches when the named rule matches.
    Matches(ReferentRule),
}

/// The inner rule of a relational check and how far the search reaches.
#[derive(Debug, Clone)]
pub struct Relation {
    rule: Rule,
    stop_by: StopBy,
    field: Option<String>,
}

/// Where a relational search stops.
#[derive(Debug, Clone, Default)]
pub enum StopBy {
    /// Only the immediate parent, child or sibling is considered.
    Neighbor,
    /// The search runs to the root, the leaves or the last sibling.
    #[default]
    End,
    /// The search stops after the first node matching this rule, which is
    /// itself still considered.
    Rule(Box<Rule>),
}

/// A reference to a rule registered under a name.
#[derive(Debug, Clone)]
pub struct ReferentRule {
    name: String,
    target: Option<Arc<Rule>>,
}

impl ReferentRule {
    /// Returns the referenced name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns whether the reference has been resolved by a registry.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.target.is_some()
    }
}

impl Rule {
    /// Creates a `kind` rule.
    ///
    /// # Errors
    ///
    /// Returns [`SyntaxError::UnknownKind`] if the grammar lacks the kind.
    pub fn kind(kind: &str, language: SupportedLanguage) -> Result<Self, SyntaxError> {
        KindMatcher::new(kind, language).map(Self::Kind)
    }

    /// Creates a `pattern` rule.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern does not compile.
    pub fn pattern(source: &str, language: SupportedLanguage) -> Result<Self, SyntaxError> {
        Pattern::compile(source, language).map(Self::Pattern)
    }

    /// Creates a `regex` rule.
    ///
    /// # Errors
    ///
    /// Returns [`SyntaxError::InvalidRegex`] for an invalid expression.
    pub fn regex(pattern: &str) -> Result<Self, SyntaxError> {
        RegexMatcher::new(pattern).map(Self::Regex)
    }

    /// Creates an unresolved reference to a named rule.
    ///
    /// References match nothing until resolved with
    /// [`RuleRegistry::resolve`] or [`RuleCore::resolve`].
    #[must_use]
    pub fn matches(name: impl Into<String>) -> Self {
        Self::Matches(ReferentRule {
            name: name.into(),
            target: None,
        })
    }

    /// Wraps the rule in a `not`.
    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Returns the capture names this rule can bind.
    ///
    /// Names under a `not` are excluded because a negated rule never
    /// contributes bindings.
    #[must_use]
    pub fn defined_vars(&self) -> BTreeSet<String> {
        let mut vars = BTreeSet::new();
        self.collect_vars(&mut vars);
        vars
    }

    fn collect_vars(&self, vars: &mut BTreeSet<String>) {
        match self {
            Self::Pattern(pattern) => {
                vars.extend(pattern.defined_vars().into_iter().map(str::to_owned));
            }
            Self::All(rules) | Self::Any(rules) => {
                for rule in rules {
                    rule.collect_vars(vars);
                }
            }
            Self::Inside(relation)
            | Self::Has(relation)
            | Self::Precedes(relation)
            | Self::Follows(relation) => relation.rule.collect_vars(vars),
            Self::Matches(referent) => {
                if let Some(target) = &referent.target {
                    target.collect_vars(vars);
                }
            }
            Self::Kind(_) | Self::Regex(_) | Self::Not(_) => {}
        }
    }

    /// Adds the names of all rules this rule refers to.
    pub(crate) fn collect_references(&self, names: &mut BTreeSet<String>) {
        match self {
            Self::All(rules) | Self::Any(rules) => {
                for rule in rules {
                    rule.collect_references(names);
                }
            }
            Self::Not(rule) => rule.collect_references(names),
            Self::Inside(relation)
            | Self::Has(relation)
            | Self::Precedes(relation)
            | Self::Follows(relation) => {
                relation.rule.collect_references(names);
                if let StopBy::Rule(stop) = &relation.stop_by {
                    stop.collect_references(names);
                }
            }
            Self::Matches(referent) => {
                names.insert(referent.name.clone());
            }
            Self::Kind(_) | Self::Pattern(_) | Self::Regex(_) => {}
        }
    }

    /// Rebuilds the rule with every reference bound to its target.
    pub(crate) fn resolve_with(
        self,
        lookup: &impl Fn(&str) -> Option<Arc<Self>>,
    ) -> Result<Self, SyntaxError> {
        let resolve_all = |rules: Vec<Self>| -> Result<Vec<Self>, SyntaxError> {
            rules.into_iter().map(|rule| rule.resolve_with(lookup)).collect()
        };
        Ok(match self {
            Self::All(rules) => Self::All(resolve_all(rules)?),
            Self::Any(rules) => Self::Any(resolve_all(rules)?),
            Self::Not(rule) => Self::Not(Box::new((*rule).resolve_with(lookup)?)),
            Self::Inside(relation) => Self::Inside(Box::new((*relation).resolve_with(lookup)?)),
            Self::Has(relation) => Self::Has(Box::new((*relation).resolve_with(lookup)?)),
            Self::Precedes(relation) => Self::Precedes(Box::new((*relation).resolve_with(lookup)?)),
            Self::Follows(relation) => Self::Follows(Box::new((*relation).resolve_with(lookup)?)),
            Self::Matches(referent) => {
                let target = lookup(&referent.name)
                    .ok_or_else(|| SyntaxError::undefined_rule(&referent.name))?;
                Self::Matches(ReferentRule {
                    name: referent.name,
                    target: Some(target),
                })
            }
            atomic @ (Self::Kind(_) | Self::Pattern(_) | Self::Regex(_)) => atomic,
        })
    }
}

impl Matcher for Rule {
    fn match_node_with_env<'r>(
        &self,
        node: Node<'r>,
        env: &mut MetaVarEnv<'r>,
    ) -> Option<Node<'r>> {
        match self {
            Self::Kind(kind) => kind.match_node_with_env(node, env),
            Self::Pattern(pattern) => pattern.match_node_with_env(node, env),
            Self::Regex(regex) => regex.match_node_with_env(node, env),
            Self::All(rules) => {
                for rule in rules {
                    rule.match_node_with_env(node, env)?;
                }
                Some(node)
            }
            Self::Any(rules) => rules.iter().find_map(|rule| {
                let mut trial = env.clone();
                rule.match_node_with_env(node, &mut trial)?;
                *env = trial;
                Some(node)
            }),
            Self::Not(rule) => {
                let mut scratch = env.clone();
                rule.match_node_with_env(node, &mut scratch)
                    .is_none()
                    .then_some(node)
            }
            Self::Inside(relation) => relation.match_inside(node, env),
            Self::Has(relation) => relation.match_has(node, env),
            Self::Precedes(relation) => {
                relation.match_siblings(node, node.next_all(), env)
            }
            Self::Follows(relation) => {
                relation.match_siblings(node, node.prev_nearest_first(), env)
            }
            Self::Matches(referent) => {
                let Some(target) = &referent.target else {
                    warn!(
                        target: "stitch_syntax::rule",
                        name = referent.name.as_str(),
                        "unresolved rule reference matches nothing"
                    );
                    return None;
                };
                target.match_node_with_env(node, env)
            }
        }
    }
}

impl Relation {
    /// Creates a relation that searches all the way with no field filter.
    #[must_use]
    pub const fn new(rule: Rule) -> Self {
        Self {
            rule,
            stop_by: StopBy::End,
            field: None,
        }
    }

    /// Sets how far the relational search reaches.
    #[must_use]
    pub fn with_stop_by(mut self, stop_by: StopBy) -> Self {
        self.stop_by = stop_by;
        self
    }

    /// Restricts the relation to a grammar field.
    ///
    /// For `has` the related node must sit in `field` of the candidate; for
    /// `inside` the path from the candidate must enter the ancestor through
    /// `field`.
    ///
    /// # Errors
    ///
    /// Returns [`SyntaxError::UnknownField`] if no kind of the grammar
    /// defines the field.
    pub fn with_field(
        mut self,
        field: &str,
        language: SupportedLanguage,
    ) -> Result<Self, SyntaxError> {
        if !FieldIndex::for_language(language).is_known_field(field) {
            return Err(SyntaxError::unknown_field(language, field));
        }
        self.field = Some(field.to_owned());
        Ok(self)
    }

    /// Returns the inner rule.
    #[must_use]
    pub const fn rule(&self) -> &Rule {
        &self.rule
    }

    /// Returns the stop condition.
    #[must_use]
    pub const fn stop_by(&self) -> &StopBy {
        &self.stop_by
    }

    /// Returns the field filter, if any.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Resolves rule references in the inner rule and the stop rule.
    ///
    /// # Errors
    ///
    /// Returns [`SyntaxError::UndefinedRule`] if a reference names a rule
    /// the registry lacks.
    pub fn resolve(self, registry: &RuleRegistry) -> Result<Self, SyntaxError> {
        self.resolve_with(&|name: &str| registry.get(name).cloned())
    }

    fn resolve_with(
        self,
        lookup: &impl Fn(&str) -> Option<Arc<Rule>>,
    ) -> Result<Self, SyntaxError> {
        let stop_by = match self.stop_by {
            StopBy::Rule(stop) => StopBy::Rule(Box::new((*stop).resolve_with(lookup)?)),
            other => other,
        };
        Ok(Self {
            rule: self.rule.resolve_with(lookup)?,
            stop_by,
            field: self.field,
        })
    }

    /// Tests one related node, keeping its captures on success.
    fn try_target<'r>(&self, target: Node<'r>, env: &mut MetaVarEnv<'r>) -> bool {
        let mut trial = env.clone();
        if self.rule.match_node_with_env(target, &mut trial).is_some() {
            *env = trial;
            return true;
        }
        false
    }

    fn stops_at(&self, node: Node<'_>) -> bool {
        match &self.stop_by {
            StopBy::Neighbor => true,
            StopBy::End => false,
            StopBy::Rule(stop) => stop.match_node(node).is_some(),
        }
    }

    fn match_inside<'r>(&self, node: Node<'r>, env: &mut MetaVarEnv<'r>) -> Option<Node<'r>> {
        let mut child = node;
        for ancestor in node.ancestors() {
            let via_field = self.field.as_deref().is_none_or(|field| {
                ancestor
                    .field_children(field)
                    .iter()
                    .any(|filled| *filled == child)
            });
            if via_field && self.try_target(ancestor, env) {
                return Some(node);
            }
            if self.stops_at(ancestor) {
                return None;
            }
            child = ancestor;
        }
        None
    }

    fn match_has<'r>(&self, node: Node<'r>, env: &mut MetaVarEnv<'r>) -> Option<Node<'r>> {
        let roots = match self.field.as_deref() {
            Some(field) => node.field_children(field),
            None => node.children().collect(),
        };
        roots
            .into_iter()
            .any(|child| self.search_down(child, env))
            .then_some(node)
    }

    fn search_down<'r>(&self, node: Node<'r>, env: &mut MetaVarEnv<'r>) -> bool {
        if self.try_target(node, env) {
            return true;
        }
        if self.stops_at(node) {
            return false;
        }
        node.children().any(|child| self.search_down(child, env))
    }

    fn match_siblings<'r>(
        &self,
        node: Node<'r>,
        siblings: impl Iterator<Item = Node<'r>>,
        env: &mut MetaVarEnv<'r>,
    ) -> Option<Node<'r>> {
        self.find_sibling(siblings, env).map(|_| node)
    }

    /// Returns the first of `siblings` the inner rule matches, giving up at
    /// the stop condition. The field filter does not apply to siblings.
    pub(crate) fn find_sibling<'r>(
        &self,
        siblings: impl Iterator<Item = Node<'r>>,
        env: &mut MetaVarEnv<'r>,
    ) -> Option<Node<'r>> {
        for sibling in siblings {
            if self.try_target(sibling, env) {
                return Some(sibling);
            }
            if self.stops_at(sibling) {
                return None;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests;
