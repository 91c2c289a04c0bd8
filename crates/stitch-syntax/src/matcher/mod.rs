//! Matching and whole-tree search.
//!
//! Everything that can decide whether a node matches implements
//! [`Matcher`]: compiled [`Pattern`]s, the atomic kind and regex matchers,
//! [`Rule`](crate::Rule) trees and [`RuleCore`](crate::RuleCore). Pattern
//! strings go through the `*_pattern` methods on [`Node`], which compile
//! them for the node's language and report compile failures. Searches walk
//! a tree in pre-order and yield [`NodeMatch`] values lazily.

mod atomic;
mod matching;

use std::ops::Deref;
use std::sync::Arc;

use tracing::trace;

use crate::environment::MetaVarEnv;
use crate::error::SyntaxError;
use crate::node::{Dfs, Node};
use crate::pattern::Pattern;

pub use atomic::{KindMatcher, RegexMatcher};

/// Decides whether a node matches, recording captures along the way.
pub trait Matcher {
    /// Tests `node`, adding any captures to `env`.
    ///
    /// Returns the matched node, normally `node` itself, or `None`. When
    /// `None` is returned `env` may hold bindings from the failed attempt
    /// and should be discarded by the caller.
    fn match_node_with_env<'r>(
        &self,
        node: Node<'r>,
        env: &mut MetaVarEnv<'r>,
    ) -> Option<Node<'r>>;

    /// Tests `node` with a fresh environment.
    fn match_node<'r>(&self, node: Node<'r>) -> Option<NodeMatch<'r>> {
        let mut env = MetaVarEnv::new();
        let matched = self.match_node_with_env(node, &mut env)?;
        Some(NodeMatch::new(matched, env))
    }
}

impl<T: Matcher + ?Sized> Matcher for &T {
    fn match_node_with_env<'r>(
        &self,
        node: Node<'r>,
        env: &mut MetaVarEnv<'r>,
    ) -> Option<Node<'r>> {
        (**self).match_node_with_env(node, env)
    }
}

impl<T: Matcher + ?Sized> Matcher for Box<T> {
    fn match_node_with_env<'r>(
        &self,
        node: Node<'r>,
        env: &mut MetaVarEnv<'r>,
    ) -> Option<Node<'r>> {
        (**self).match_node_with_env(node, env)
    }
}

impl<T: Matcher + ?Sized> Matcher for Arc<T> {
    fn match_node_with_env<'r>(
        &self,
        node: Node<'r>,
        env: &mut MetaVarEnv<'r>,
    ) -> Option<Node<'r>> {
        (**self).match_node_with_env(node, env)
    }
}

impl Matcher for Pattern {
    fn match_node_with_env<'r>(
        &self,
        node: Node<'r>,
        env: &mut MetaVarEnv<'r>,
    ) -> Option<Node<'r>> {
        if node.language() != self.language() {
            return None;
        }
        matching::match_node(self.root(), node, env).then_some(node)
    }
}

/// A matched node together with its captures.
#[derive(Debug, Clone)]
pub struct NodeMatch<'r> {
    node: Node<'r>,
    env: MetaVarEnv<'r>,
}

impl<'r> NodeMatch<'r> {
    /// Pairs a node with the environment that matched it.
    #[must_use]
    pub const fn new(node: Node<'r>, env: MetaVarEnv<'r>) -> Self {
        Self { node, env }
    }

    /// Returns the matched node.
    #[must_use]
    pub const fn get_node(&self) -> Node<'r> {
        self.node
    }

    /// Returns the captures of the match.
    #[must_use]
    pub const fn get_env(&self) -> &MetaVarEnv<'r> {
        &self.env
    }

    /// Returns the node bound to a `$NAME` capture.
    #[must_use]
    pub fn get_match(&self, name: &str) -> Option<Node<'r>> {
        self.env.get_match(name)
    }

    /// Returns the named nodes of a `$$$NAME` capture, or an empty list.
    #[must_use]
    pub fn get_multiple_matches(&self, name: &str) -> Vec<Node<'r>> {
        self.env.get_multiple_matches(name)
    }

    /// Returns a string derived by a transformation.
    #[must_use]
    pub fn get_transformed(&self, name: &str) -> Option<&str> {
        self.env.get_transformed(name)
    }

    /// Splits the match into its node and environment.
    #[must_use]
    pub fn into_parts(self) -> (Node<'r>, MetaVarEnv<'r>) {
        (self.node, self.env)
    }
}

impl<'r> Deref for NodeMatch<'r> {
    type Target = Node<'r>;

    fn deref(&self) -> &Self::Target {
        &self.node
    }
}

/// Lazy pre-order search for every match below a node.
///
/// Matches are yielded with strictly increasing start offsets: when a node
/// and one of its descendants both match at the same offset, only the outer
/// node is reported. Dropping the iterator early abandons the search.
pub struct FindAll<'r, M> {
    dfs: Dfs<'r>,
    matcher: M,
    last_start: Option<usize>,
}

impl<'r, M: Matcher> Iterator for FindAll<'r, M> {
    type Item = NodeMatch<'r>;

    fn next(&mut self) -> Option<Self::Item> {
        for candidate in self.dfs.by_ref() {
            let Some(found) = self.matcher.match_node(candidate) else {
                continue;
            };
            let start = found.byte_range().start;
            if self.last_start == Some(start) {
                trace!(
                    target: "stitch_syntax::matcher",
                    start,
                    kind = found.kind(),
                    "skipping nested match at the same offset"
                );
                continue;
            }
            self.last_start = Some(start);
            return Some(found);
        }
        None
    }
}

impl<'r> Node<'r> {
    /// Returns the first match in pre-order, starting with this node.
    pub fn find<M: Matcher>(&self, matcher: M) -> Option<NodeMatch<'r>> {
        self.find_all(matcher).next()
    }

    /// Returns a lazy iterator over all matches in this subtree.
    pub fn find_all<M: Matcher>(&self, matcher: M) -> FindAll<'r, M> {
        FindAll {
            dfs: self.dfs(),
            matcher,
            last_start: None,
        }
    }

    /// Returns whether this node itself matches.
    pub fn matches<M: Matcher>(&self, matcher: M) -> bool {
        matcher.match_node(*self).is_some()
    }

    /// Returns whether some strict ancestor matches.
    pub fn inside<M: Matcher>(&self, matcher: M) -> bool {
        self.ancestors().any(|node| matcher.match_node(node).is_some())
    }

    /// Returns whether some strict descendant matches.
    pub fn has<M: Matcher>(&self, matcher: M) -> bool {
        self.dfs()
            .skip(1)
            .any(|node| matcher.match_node(node).is_some())
    }

    /// Returns whether some later sibling matches.
    pub fn precedes<M: Matcher>(&self, matcher: M) -> bool {
        self.next_all().any(|node| matcher.match_node(node).is_some())
    }

    /// Returns whether some earlier sibling matches.
    pub fn follows<M: Matcher>(&self, matcher: M) -> bool {
        self.prev_nearest_first()
            .any(|node| matcher.match_node(node).is_some())
    }

    /// Compiles `pattern` for this node's language.
    fn compile_pattern(&self, pattern: &str) -> Result<Pattern, SyntaxError> {
        Pattern::compile(pattern, self.language())
    }

    /// Compiles `pattern` and returns its first match in this subtree.
    ///
    /// Compile a [`Pattern`] once and use [`Node::find`] when the same
    /// pattern is searched for repeatedly.
    ///
    /// # Errors
    ///
    /// Returns the compile error when `pattern` is not valid for the tree's
    /// language.
    pub fn find_pattern(&self, pattern: &str) -> Result<Option<NodeMatch<'r>>, SyntaxError> {
        Ok(self.find(self.compile_pattern(pattern)?))
    }

    /// Compiles `pattern` and returns a lazy search for all its matches.
    ///
    /// # Errors
    ///
    /// Returns the compile error when `pattern` is not valid for the tree's
    /// language.
    pub fn find_all_pattern(&self, pattern: &str) -> Result<FindAll<'r, Pattern>, SyntaxError> {
        Ok(self.find_all(self.compile_pattern(pattern)?))
    }

    /// Compiles `pattern` and returns whether this node matches it.
    ///
    /// # Errors
    ///
    /// Returns the compile error when `pattern` is not valid for the tree's
    /// language.
    pub fn matches_pattern(&self, pattern: &str) -> Result<bool, SyntaxError> {
        Ok(self.matches(self.compile_pattern(pattern)?))
    }

    /// Compiles `pattern` and returns whether some strict ancestor matches.
    ///
    /// # Errors
    ///
    /// Returns the compile error when `pattern` is not valid for the tree's
    /// language.
    pub fn inside_pattern(&self, pattern: &str) -> Result<bool, SyntaxError> {
        Ok(self.inside(self.compile_pattern(pattern)?))
    }

    /// Compiles `pattern` and returns whether some strict descendant
    /// matches.
    ///
    /// # Errors
    ///
    /// Returns the compile error when `pattern` is not valid for the tree's
    /// language.
    pub fn has_pattern(&self, pattern: &str) -> Result<bool, SyntaxError> {
        Ok(self.has(self.compile_pattern(pattern)?))
    }

    /// Compiles `pattern` and returns whether some later sibling matches.
    ///
    /// # Errors
    ///
    /// Returns the compile error when `pattern` is not valid for the tree's
    /// language.
    pub fn precedes_pattern(&self, pattern: &str) -> Result<bool, SyntaxError> {
        Ok(self.precedes(self.compile_pattern(pattern)?))
    }

    /// Compiles `pattern` and returns whether some earlier sibling matches.
    ///
    /// # Errors
    ///
    /// Returns the compile error when `pattern` is not valid for the tree's
    /// language.
    pub fn follows_pattern(&self, pattern: &str) -> Result<bool, SyntaxError> {
        Ok(self.follows(self.compile_pattern(pattern)?))
    }
}
