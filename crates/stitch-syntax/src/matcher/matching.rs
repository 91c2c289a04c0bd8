//! Backtracking comparison of a pattern tree against a candidate node.

use crate::environment::MetaVarEnv;
use crate::metavariables::MetaVarKind;
use crate::node::Node;
use crate::pattern::{PatternChild, PatternNode, is_comment};

/// Matches `pattern` against `candidate`, recording captures in `env`.
///
/// On failure `env` may hold bindings from the partial attempt.
pub(crate) fn match_node<'r>(
    pattern: &PatternNode,
    candidate: Node<'r>,
    env: &mut MetaVarEnv<'r>,
) -> bool {
    match pattern {
        PatternNode::MetaVar { name, kind } => bind_metavar(name.as_deref(), *kind, candidate, env),
        PatternNode::Terminal { kind, text, .. } => {
            candidate.kind() == *kind && candidate.text() == text
        }
        PatternNode::Internal { kind, children } => {
            if candidate.kind() != *kind {
                return false;
            }
            let candidates: Vec<_> = candidate
                .children_with_fields()
                .into_iter()
                .filter(|(child, _)| !is_comment(child.kind()))
                .collect();
            SequenceMatcher { env }.matches(children, &candidates)
        }
    }
}

fn bind_metavar<'r>(
    name: Option<&str>,
    kind: MetaVarKind,
    candidate: Node<'r>,
    env: &mut MetaVarEnv<'r>,
) -> bool {
    match (kind, name) {
        (MetaVarKind::Single, _) if !candidate.is_named() => false,
        (_, None) => true,
        (MetaVarKind::Single, Some(name)) => env.insert(name, candidate).is_some(),
        (MetaVarKind::Multiple, Some(name)) => env.insert_multi(name, vec![candidate]).is_some(),
    }
}

/// Matches a pattern child list against candidate children.
///
/// Multi meta-variables consume the longest run of siblings that still
/// lets the rest of the list match, shrinking one node at a time.
struct SequenceMatcher<'e, 'r> {
    env: &'e mut MetaVarEnv<'r>,
}

type Candidate<'r> = (Node<'r>, Option<&'static str>);

impl<'r> SequenceMatcher<'_, 'r> {
    fn matches(&mut self, patterns: &[PatternChild], candidates: &[Candidate<'r>]) -> bool {
        let Some((first, rest)) = patterns.split_first() else {
            // Trailing tokens such as an optional `;` are tolerated.
            return candidates.iter().all(|(node, _)| !node.is_named());
        };

        if let PatternNode::MetaVar {
            name,
            kind: MetaVarKind::Multiple,
        } = &first.node
        {
            return self.match_run(name.as_deref(), rest, candidates);
        }

        let Some(((node, field), remaining)) = candidates.split_first() else {
            return false;
        };
        if first.field.is_some() && first.field != *field {
            return false;
        }

        let snapshot = self.env.clone();
        if match_node(&first.node, *node, self.env) && self.matches(rest, remaining) {
            return true;
        }
        *self.env = snapshot;
        false
    }

    fn match_run(
        &mut self,
        name: Option<&str>,
        rest: &[PatternChild],
        candidates: &[Candidate<'r>],
    ) -> bool {
        for len in (0..=candidates.len()).rev() {
            let (Some(run), Some(remaining)) = (candidates.get(..len), candidates.get(len..)) else {
                continue;
            };

            let snapshot = self.env.clone();
            let bound = match name {
                Some(name) => {
                    let nodes = run.iter().map(|(node, _)| *node).collect();
                    self.env.insert_multi(name, nodes).is_some()
                }
                None => true,
            };
            if bound && self.matches(rest, remaining) {
                return true;
            }
            *self.env = snapshot;
        }
        false
    }
}
