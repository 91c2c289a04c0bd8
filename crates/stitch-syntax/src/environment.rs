//! Meta-variable bindings collected while matching.
//!
//! A name is bound at most once per match. Binding a name again succeeds
//! only when the new node (or node run) is structurally identical to the
//! existing binding, which is what gives `$A + $A` its meaning.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::node::Node;

/// The value bound to a meta-variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedValue<'a, 'r> {
    /// A `$NAME` binding.
    Single(Node<'r>),
    /// A `$$$NAME` binding, anonymous tokens included.
    Multiple(&'a [Node<'r>]),
}

/// Mapping from capture names to bound nodes and derived strings.
#[derive(Debug, Clone, Default)]
pub struct MetaVarEnv<'r> {
    single: HashMap<String, Node<'r>>,
    multi: HashMap<String, Vec<Node<'r>>>,
    transformed: HashMap<String, String>,
}

impl<'r> MetaVarEnv<'r> {
    /// Creates an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` to `node`.
    ///
    /// Returns `None` when `name` is already bound to a structurally
    /// different node; the environment is left untouched in that case.
    pub fn insert(&mut self, name: &str, node: Node<'r>) -> Option<&mut Self> {
        if let Some(existing) = self.single.get(name) {
            return nodes_equivalent(*existing, node).then_some(self);
        }
        self.single.insert(name.to_owned(), node);
        Some(self)
    }

    /// Binds `name` to an ordered run of sibling nodes.
    ///
    /// Returns `None` when `name` is already bound to a run that differs
    /// element-wise; the environment is left untouched in that case.
    pub fn insert_multi(&mut self, name: &str, nodes: Vec<Node<'r>>) -> Option<&mut Self> {
        if let Some(existing) = self.multi.get(name) {
            let equal = existing.len() == nodes.len()
                && existing
                    .iter()
                    .zip(&nodes)
                    .all(|(a, b)| nodes_equivalent(*a, *b));
            return equal.then_some(self);
        }
        self.multi.insert(name.to_owned(), nodes);
        Some(self)
    }

    /// Returns the node bound to a `$NAME` capture.
    #[must_use]
    pub fn get_match(&self, name: &str) -> Option<Node<'r>> {
        self.single.get(name).copied()
    }

    /// Returns the named nodes of a `$$$NAME` capture.
    ///
    /// Separators such as commas are left out. The result is empty when the
    /// name was never bound as a run.
    #[must_use]
    pub fn get_multiple_matches(&self, name: &str) -> Vec<Node<'r>> {
        self.multi
            .get(name)
            .map(|nodes| nodes.iter().copied().filter(Node::is_named).collect())
            .unwrap_or_default()
    }

    /// Returns the binding of `name`, whatever its multiplicity.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<MatchedValue<'_, 'r>> {
        if let Some(node) = self.single.get(name) {
            return Some(MatchedValue::Single(*node));
        }
        self.multi
            .get(name)
            .map(|nodes| MatchedValue::Multiple(nodes.as_slice()))
    }

    /// Returns the source text a capture covers.
    ///
    /// For runs this is the text from the start of the first node to the end
    /// of the last, so separators and spacing are preserved. An empty run
    /// yields an empty string.
    #[must_use]
    pub fn text_of(&self, name: &str) -> Option<Cow<'r, str>> {
        match self.lookup(name)? {
            MatchedValue::Single(node) => Some(Cow::Borrowed(node.text())),
            MatchedValue::Multiple(nodes) => {
                let (Some(first), Some(last)) = (nodes.first(), nodes.last()) else {
                    return Some(Cow::Borrowed(""));
                };
                let range = first.byte_range().start..last.byte_range().end;
                let text = first.get_root().source().get(range).unwrap_or_default();
                Some(Cow::Borrowed(text))
            }
        }
    }

    /// Merges `other` into `self`.
    ///
    /// Returns `false`, leaving `self` unchanged, if any name is bound in
    /// both environments to different structures.
    #[must_use]
    pub fn merge(&mut self, other: &Self) -> bool {
        let mut merged = self.clone();
        for (name, node) in &other.single {
            if merged.insert(name, *node).is_none() {
                return false;
            }
        }
        for (name, nodes) in &other.multi {
            if merged.insert_multi(name, nodes.clone()).is_none() {
                return false;
            }
        }
        for (name, text) in &other.transformed {
            merged
                .transformed
                .entry(name.clone())
                .or_insert_with(|| text.clone());
        }
        *self = merged;
        true
    }

    /// Stores a derived string under `name`.
    pub fn insert_transformed(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.transformed.insert(name.into(), value.into());
    }

    /// Returns a derived string stored by a transformation.
    #[must_use]
    pub fn get_transformed(&self, name: &str) -> Option<&str> {
        self.transformed.get(name).map(String::as_str)
    }

    /// Returns whether nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.single.is_empty() && self.multi.is_empty() && self.transformed.is_empty()
    }

    /// Returns the names of all node captures, sorted.
    #[must_use]
    pub fn captured_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self
            .single
            .keys()
            .chain(self.multi.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }
}

/// Returns whether two nodes have the same shape and the same leaf text.
pub(crate) fn nodes_equivalent(a: Node<'_>, b: Node<'_>) -> bool {
    if a == b {
        return true;
    }
    if a.kind() != b.kind() {
        return false;
    }
    if a.is_leaf() || b.is_leaf() {
        return a.is_leaf() && b.is_leaf() && a.text() == b.text();
    }
    let mut left = a.children();
    let mut right = b.children();
    left.len() == right.len() && left.all(|l| right.next().is_some_and(|r| nodes_equivalent(l, r)))
}
