//! A rule bundled with capture constraints and transformations.

use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

use crate::environment::MetaVarEnv;
use crate::error::SyntaxError;
use crate::matcher::Matcher;
use crate::node::Node;
use crate::pattern::Pattern;
use crate::rule::{Rule, RuleRegistry};
use crate::transform::Transformation;

/// The matching half of a complete rule definition.
///
/// A node matches when the main rule matches and every constrained capture
/// satisfies its constraint. Transformations then run in declaration order,
/// so later ones may read the output of earlier ones.
#[derive(Debug, Clone)]
pub struct RuleCore {
    rule: Rule,
    constraints: BTreeMap<String, Rule>,
    transforms: Vec<(String, Transformation)>,
}

impl RuleCore {
    /// Wraps `rule` with no constraints or transformations.
    #[must_use]
    pub const fn new(rule: Rule) -> Self {
        Self {
            rule,
            constraints: BTreeMap::new(),
            transforms: Vec::new(),
        }
    }

    /// Requires the node captured as `name` to also match `constraint`.
    ///
    /// Constraints only inspect `$NAME` captures. A name the main rule left
    /// unbound passes.
    #[must_use]
    pub fn with_constraint(mut self, name: impl Into<String>, constraint: Rule) -> Self {
        self.constraints.insert(name.into(), constraint);
        self
    }

    /// Stores the output of `transform` under `name` after each match.
    #[must_use]
    pub fn with_transform(mut self, name: impl Into<String>, transform: Transformation) -> Self {
        self.transforms.push((name.into(), transform));
        self
    }

    /// Resolves rule references in the main rule and the constraints.
    ///
    /// # Errors
    ///
    /// Returns [`SyntaxError::UndefinedRule`] if a reference names a rule
    /// the registry lacks.
    pub fn resolve(self, registry: &RuleRegistry) -> Result<Self, SyntaxError> {
        let constraints = self
            .constraints
            .into_iter()
            .map(|(name, constraint)| Ok((name, registry.resolve(constraint)?)))
            .collect::<Result<_, SyntaxError>>()?;
        Ok(Self {
            rule: registry.resolve(self.rule)?,
            constraints,
            transforms: self.transforms,
        })
    }

    /// Returns the main rule.
    #[must_use]
    pub const fn rule(&self) -> &Rule {
        &self.rule
    }

    /// Returns the transformations in the order they run.
    #[must_use]
    pub fn transforms(&self) -> &[(String, Transformation)] {
        &self.transforms
    }

    /// Returns every name a rewrite template may reference.
    ///
    /// This covers the captures of the main rule and the names of the
    /// transformations.
    #[must_use]
    pub fn defined_vars(&self) -> BTreeSet<String> {
        let mut vars = self.rule.defined_vars();
        vars.extend(self.transforms.iter().map(|(name, _)| name.clone()));
        vars
    }

    fn constraints_hold(&self, env: &MetaVarEnv<'_>) -> bool {
        self.constraints.iter().all(|(name, constraint)| {
            let Some(captured) = env.get_match(name) else {
                return true;
            };
            let holds = constraint.match_node(captured).is_some();
            if !holds {
                trace!(
                    target: "stitch_syntax::rule",
                    capture = name.as_str(),
                    text = captured.text(),
                    "capture rejected by constraint"
                );
            }
            holds
        })
    }
}

impl Matcher for RuleCore {
    fn match_node_with_env<'r>(
        &self,
        node: Node<'r>,
        env: &mut MetaVarEnv<'r>,
    ) -> Option<Node<'r>> {
        let matched = self.rule.match_node_with_env(node, env)?;
        if !self.constraints_hold(env) {
            return None;
        }
        for (name, transform) in &self.transforms {
            if let Some(value) = transform.apply(env) {
                env.insert_transformed(name.as_str(), value);
            }
        }
        Some(matched)
    }
}

impl From<Rule> for RuleCore {
    fn from(rule: Rule) -> Self {
        Self::new(rule)
    }
}

impl From<Pattern> for RuleCore {
    fn from(pattern: Pattern) -> Self {
        Self::new(Rule::Pattern(pattern))
    }
}
