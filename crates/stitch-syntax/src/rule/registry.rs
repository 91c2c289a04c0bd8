//! Named rules and reference resolution.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use tracing::debug;

use crate::error::SyntaxError;
use crate::rule::Rule;

/// A set of named rules that `matches` references can point at.
///
/// Building a registry checks the reference graph once: every referenced
/// name must be defined and no rule may reach itself. Resolved rules hold
/// their targets directly, so matching never consults the registry.
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    rules: HashMap<String, Arc<Rule>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

impl RuleRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from named rules that may refer to one another.
    ///
    /// # Errors
    ///
    /// Returns [`SyntaxError::UndefinedRule`] for a reference to a missing
    /// name and [`SyntaxError::CyclicRule`] when references form a cycle.
    pub fn from_rules<I, S>(rules: I) -> Result<Self, SyntaxError>
    where
        I: IntoIterator<Item = (S, Rule)>,
        S: Into<String>,
    {
        let mut pending: BTreeMap<String, Rule> = rules
            .into_iter()
            .map(|(name, rule)| (name.into(), rule))
            .collect();

        let graph: BTreeMap<String, BTreeSet<String>> = pending
            .iter()
            .map(|(name, rule)| {
                let mut references = BTreeSet::new();
                rule.collect_references(&mut references);
                (name.clone(), references)
            })
            .collect();

        let order = topological_order(&graph)?;

        let mut resolved: HashMap<String, Arc<Rule>> = HashMap::with_capacity(order.len());
        for name in order {
            let Some(rule) = pending.remove(&name) else {
                continue;
            };
            let linked = rule.resolve_with(&|target: &str| resolved.get(target).cloned())?;
            resolved.insert(name, Arc::new(linked));
        }

        debug!(
            target: "stitch_syntax::rule",
            rules = resolved.len(),
            "built rule registry"
        );
        Ok(Self { rules: resolved })
    }

    /// Resolves every reference in `rule` against this registry.
    ///
    /// # Errors
    ///
    /// Returns [`SyntaxError::UndefinedRule`] if `rule` refers to a name the
    /// registry does not define.
    pub fn resolve(&self, rule: Rule) -> Result<Rule, SyntaxError> {
        rule.resolve_with(&|name: &str| self.rules.get(name).cloned())
    }

    /// Returns the rule registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<Rule>> {
        self.rules.get(name)
    }

    /// Returns whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Returns the number of registered rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns whether no rules are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Orders names so each rule comes after every rule it refers to.
fn topological_order(
    graph: &BTreeMap<String, BTreeSet<String>>,
) -> Result<Vec<String>, SyntaxError> {
    let mut state: HashMap<&str, Visit> = HashMap::with_capacity(graph.len());
    let mut order = Vec::with_capacity(graph.len());
    let mut path = Vec::new();

    for name in graph.keys() {
        visit(name, graph, &mut state, &mut path, &mut order)?;
    }
    Ok(order)
}

fn visit<'g>(
    name: &'g str,
    graph: &'g BTreeMap<String, BTreeSet<String>>,
    state: &mut HashMap<&'g str, Visit>,
    path: &mut Vec<&'g str>,
    order: &mut Vec<String>,
) -> Result<(), SyntaxError> {
    match state.get(name) {
        Some(Visit::Done) => return Ok(()),
        Some(Visit::InProgress) => {
            let start = path.iter().position(|n| *n == name).unwrap_or_default();
            let mut cycle: Vec<String> = path
                .iter()
                .skip(start)
                .map(|n| (*n).to_owned())
                .collect();
            cycle.push(name.to_owned());
            return Err(SyntaxError::cyclic_rule(cycle));
        }
        None => {}
    }

    let references = graph
        .get(name)
        .ok_or_else(|| SyntaxError::undefined_rule(name))?;

    state.insert(name, Visit::InProgress);
    path.push(name);
    for reference in references {
        let Some((target, _)) = graph.get_key_value(reference.as_str()) else {
            return Err(SyntaxError::undefined_rule(reference.as_str()));
        };
        visit(target, graph, state, path, order)?;
    }
    path.pop();
    state.insert(name, Visit::Done);
    order.push(name.to_owned());
    Ok(())
}
