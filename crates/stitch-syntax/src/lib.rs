//! Tree-sitter powered structural search and rewrite.
//!
//! This crate finds code by shape rather than by text. It provides:
//!
//! - **Immutable syntax trees** via [`Root`] and the borrowed [`Node`] view,
//!   with parent, child, sibling and field navigation
//! - **Pattern matching** via [`Pattern`], compiled from ordinary-looking
//!   source snippets with meta-variable placeholders
//! - **Composable rules** via [`Rule`], [`RuleCore`] and [`RuleRegistry`]
//!   for kind, regex, boolean and relational checks
//! - **Text edits** via [`Edit`] and [`Root::commit_edits`], and template
//!   rewrites via [`Rewriter`]
//!
//! # Supported Languages
//!
//! Currently supports Rust, Python and TypeScript. JavaScript is parsed
//! with the TypeScript (TSX) grammar. Languages are named, never detected:
//! callers choose the [`SupportedLanguage`] for each source.
//!
//! # Pattern Language
//!
//! The pattern language follows [ast-grep](https://ast-grep.github.io/):
//!
//! - `$VAR` matches one named node and captures it
//! - `$_` matches one named node without capturing it
//! - `$$$VAR` matches a run of zero or more sibling nodes
//! - `$$$` and `$$$_` match a run without capturing it
//!
//! A name used twice must match structurally identical code both times, so
//! `$A + $A` matches `x + x` but not `x + y`.
//!
//! # Search Order
//!
//! [`Node::find_all`] yields matches in pre-order with strictly increasing
//! start offsets. A match nested inside the previous one that starts at the
//! same offset is suppressed: `$F($$$A)` over `foo()();` reports `foo()()`
//! but not the inner `foo()`. Nested matches that start later, such as the
//! `b(1)` of `a(b(1))`, are still reported.
//!
//! # Example: Searching
//!
//! ```
//! use stitch_syntax::{Pattern, Root, SupportedLanguage};
//!
//! let root = Root::parse("console.log(\"hi\"); warn(1);", SupportedLanguage::TypeScript)?;
//! let pattern = Pattern::compile("console.log($MSG)", SupportedLanguage::TypeScript)?;
//!
//! for found in root.root().find_all(&pattern) {
//!     let message = found.get_match("MSG").map(|node| node.text());
//!     assert_eq!(message, Some("\"hi\""));
//! }
//! # Ok::<(), stitch_syntax::SyntaxError>(())
//! ```
//!
//! # Example: Rewriting
//!
//! ```
//! use stitch_syntax::{Pattern, RewriteRule, Rewriter, SupportedLanguage};
//!
//! let pattern = Pattern::compile("dbg!($EXPR)", SupportedLanguage::Rust)?;
//! let rule = RewriteRule::new(pattern, "println!(\"{:?}\", $EXPR)")?;
//!
//! let result = Rewriter::new(SupportedLanguage::Rust).apply(&rule, "fn main() { dbg!(x); }")?;
//! assert!(result.has_changes());
//! # Ok::<(), stitch_syntax::SyntaxError>(())
//! ```

mod edit;
mod environment;
mod error;
mod fields;
mod language;
mod matcher;
mod metavariables;
mod node;
mod parser;
mod pattern;
mod position;
mod rewriter;
mod rule;
mod transform;

pub use edit::Edit;
pub use environment::{MatchedValue, MetaVarEnv};
pub use error::SyntaxError;
pub use fields::{FieldDescriptor, FieldIndex};
pub use language::{LanguageParseError, SupportedLanguage};
pub use matcher::{FindAll, KindMatcher, Matcher, NodeMatch, RegexMatcher};
pub use metavariables::{MetaVarKind, MetaVariable};
pub use node::{Children, Dfs, Node};
pub use parser::{ANONYMOUS_FILENAME, Parser, Root, SyntaxErrorInfo};
pub use pattern::{Pattern, PatternChild, PatternNode};
pub use position::{Pos, Range};
pub use rewriter::{RewriteResult, RewriteRule, Rewriter};
pub use rule::{ReferentRule, Relation, Rule, RuleCore, RuleRegistry, StopBy};
pub use transform::{StringCase, Transformation};

#[cfg(test)]
mod tests;
