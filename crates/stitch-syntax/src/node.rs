//! Read-only views over nodes of a parsed [`Root`].
//!
//! A [`Node`] is a borrowed handle: the tree it belongs to and the
//! Tree-sitter node id. Nodes never copy text out of the source and never
//! outlive their root.

use std::fmt;
use std::iter::successors;

use crate::error::SyntaxError;
use crate::fields::FieldIndex;
use crate::language::SupportedLanguage;
use crate::parser::Root;
use crate::position::{Pos, Range};

/// A node of a parsed syntax tree.
#[derive(Clone, Copy)]
pub struct Node<'r> {
    inner: tree_sitter::Node<'r>,
    root: &'r Root,
}

impl<'r> Node<'r> {
    pub(crate) const fn new(inner: tree_sitter::Node<'r>, root: &'r Root) -> Self {
        Self { inner, root }
    }

    /// Returns the underlying Tree-sitter node.
    #[must_use]
    pub const fn inner(&self) -> tree_sitter::Node<'r> {
        self.inner
    }

    /// Returns the node id, unique and stable within one tree.
    #[must_use]
    pub fn id(&self) -> usize {
        self.inner.id()
    }

    /// Returns the grammar kind of the node, e.g. `call_expression`.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.inner.kind()
    }

    /// Returns the grammar's numeric id for the node kind.
    #[must_use]
    pub fn kind_id(&self) -> u16 {
        self.inner.kind_id()
    }

    /// Returns whether the node has the given kind.
    #[must_use]
    pub fn is(&self, kind: &str) -> bool {
        self.kind() == kind
    }

    /// Returns whether the node is a named grammar node rather than an
    /// anonymous token such as `(` or `;`.
    #[must_use]
    pub fn is_named(&self) -> bool {
        self.inner.is_named()
    }

    /// Returns whether the node has no children at all.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.inner.child_count() == 0
    }

    /// Returns whether the node has no named children.
    ///
    /// String literals are named leaves in this sense even though their
    /// quotes are anonymous children.
    #[must_use]
    pub fn is_named_leaf(&self) -> bool {
        self.inner.named_child_count() == 0
    }

    /// Returns whether the node is an `ERROR` node produced by recovery.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.inner.is_error()
    }

    /// Returns the start and end positions of the node.
    #[must_use]
    pub fn range(&self) -> Range {
        Range::new(self.start_pos(), self.end_pos())
    }

    /// Returns the start position of the node.
    #[must_use]
    pub fn start_pos(&self) -> Pos {
        Pos::from_point(self.inner.start_position(), self.inner.start_byte())
    }

    /// Returns the end position of the node.
    #[must_use]
    pub fn end_pos(&self) -> Pos {
        Pos::from_point(self.inner.end_position(), self.inner.end_byte())
    }

    /// Returns the byte offsets covered by the node.
    #[must_use]
    pub fn byte_range(&self) -> std::ops::Range<usize> {
        self.inner.byte_range()
    }

    /// Returns the source text of the node.
    #[must_use]
    pub fn text(&self) -> &'r str {
        self.root
            .source()
            .get(self.inner.byte_range())
            .unwrap_or_default()
    }

    /// Returns the root this node belongs to.
    #[must_use]
    pub const fn get_root(&self) -> &'r Root {
        self.root
    }

    /// Returns the language of the tree.
    #[must_use]
    pub const fn language(&self) -> SupportedLanguage {
        self.root.language()
    }

    /// Returns the S-expression form of the subtree, for debugging.
    #[must_use]
    pub fn to_sexp(&self) -> String {
        self.inner.to_sexp()
    }

    /// Returns the parent node, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.inner.parent().map(|inner| Self::new(inner, self.root))
    }

    /// Returns the `nth` child, counting anonymous tokens.
    #[must_use]
    pub fn child(&self, nth: usize) -> Option<Self> {
        self.children().nth(nth)
    }

    /// Returns all children in document order, anonymous tokens included.
    #[must_use]
    pub fn children(&self) -> Children<'r> {
        let mut cursor = self.inner.walk();
        cursor.goto_first_child();
        Children {
            cursor,
            root: self.root,
            remaining: self.inner.child_count(),
        }
    }

    /// Returns the named children in document order.
    pub fn named_children(&self) -> impl Iterator<Item = Node<'r>> + use<'r> {
        self.children().filter(Self::is_named)
    }

    /// Returns the strict ancestors, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = Node<'r>> + use<'r> {
        successors(self.parent(), Self::parent)
    }

    /// Returns the immediately following sibling.
    #[must_use]
    pub fn next(&self) -> Option<Self> {
        self.inner
            .next_sibling()
            .map(|inner| Self::new(inner, self.root))
    }

    /// Returns the immediately preceding sibling.
    #[must_use]
    pub fn prev(&self) -> Option<Self> {
        self.inner
            .prev_sibling()
            .map(|inner| Self::new(inner, self.root))
    }

    /// Returns all following siblings in document order.
    pub fn next_all(&self) -> impl Iterator<Item = Node<'r>> + use<'r> {
        successors(self.next(), Self::next)
    }

    /// Returns all preceding siblings in document order.
    #[must_use]
    pub fn prev_all(&self) -> Vec<Self> {
        let mut siblings: Vec<_> = self.prev_nearest_first().collect();
        siblings.reverse();
        siblings
    }

    /// Returns the preceding siblings starting with the closest one.
    pub(crate) fn prev_nearest_first(&self) -> impl Iterator<Item = Node<'r>> + use<'r> {
        successors(self.prev(), Self::prev)
    }

    /// Returns a pre-order traversal of the subtree, starting with `self`.
    #[must_use]
    pub fn dfs(&self) -> Dfs<'r> {
        Dfs::new(*self)
    }

    /// Returns the child filling the grammar field `name`.
    ///
    /// Optional fields without a child, and fields the grammar never
    /// attaches to this kind, yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`SyntaxError::RequiredFieldMissing`] when the grammar's field
    /// table marks the field as required but the tree has no child for it.
    pub fn field(&self, name: &str) -> Result<Option<Self>, SyntaxError> {
        if let Some(inner) = self.inner.child_by_field_name(name) {
            return Ok(Some(Self::new(inner, self.root)));
        }

        let required = FieldIndex::for_language(self.language())
            .descriptor(self.kind(), name)
            .is_some_and(|descriptor| descriptor.required);
        if required && !self.inner.has_error() {
            return Err(SyntaxError::required_field_missing(self.kind(), name));
        }

        Ok(None)
    }

    /// Returns every child tagged with the grammar field `name`.
    #[must_use]
    pub fn field_children(&self, name: &str) -> Vec<Self> {
        let mut cursor = self.inner.walk();
        self.inner
            .children_by_field_name(name, &mut cursor)
            .map(|inner| Self::new(inner, self.root))
            .collect()
    }

    /// Returns each child paired with the field it occupies, if any.
    pub(crate) fn children_with_fields(&self) -> Vec<(Self, Option<&'static str>)> {
        let mut cursor = self.inner.walk();
        let mut out = Vec::with_capacity(self.inner.child_count());
        if cursor.goto_first_child() {
            loop {
                out.push((Self::new(cursor.node(), self.root), cursor.field_name()));
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
        }
        out
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl Eq for Node<'_> {}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.kind())
            .field("range", &self.byte_range())
            .field("text", &self.text())
            .finish()
    }
}

/// Iterator over the children of a node.
pub struct Children<'r> {
    cursor: tree_sitter::TreeCursor<'r>,
    root: &'r Root,
    remaining: usize,
}

impl<'r> Iterator for Children<'r> {
    type Item = Node<'r>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = Node::new(self.cursor.node(), self.root);
        self.cursor.goto_next_sibling();
        self.remaining -= 1;
        Some(node)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Children<'_> {}

/// Pre-order traversal of a subtree.
///
/// The traversal is driven by a Tree-sitter cursor, so it allocates nothing
/// per node and can be dropped at any point.
pub struct Dfs<'r> {
    cursor: tree_sitter::TreeCursor<'r>,
    root: &'r Root,
    start: Option<usize>,
}

impl<'r> Dfs<'r> {
    fn new(node: Node<'r>) -> Self {
        Self {
            cursor: node.inner.walk(),
            root: node.root,
            start: Some(node.id()),
        }
    }
}

impl<'r> Iterator for Dfs<'r> {
    type Item = Node<'r>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.start?;
        let current = Node::new(self.cursor.node(), self.root);
        if self.cursor.goto_first_child() {
            return Some(current);
        }
        while self.cursor.node().id() != start {
            if self.cursor.goto_next_sibling() {
                return Some(current);
            }
            if !self.cursor.goto_parent() {
                break;
            }
        }
        self.start = None;
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(source: &str) -> Root {
        Root::parse(source, SupportedLanguage::TypeScript).expect("parse")
    }

    fn first_of_kind<'r>(root: &'r Root, kind: &str) -> Node<'r> {
        root.root()
            .dfs()
            .find(|node| node.is(kind))
            .unwrap_or_else(|| panic!("no {kind} node"))
    }

    #[test]
    fn dfs_visits_nodes_in_pre_order() {
        let root = parse("a + b");
        let kinds: Vec<_> = root
            .root()
            .dfs()
            .filter(Node::is_named)
            .map(|n| n.kind())
            .collect();
        assert_eq!(
            kinds,
            vec![
                "program",
                "expression_statement",
                "binary_expression",
                "identifier",
                "identifier"
            ]
        );
    }

    #[test]
    fn dfs_of_subtree_stays_inside_subtree() {
        let root = parse("f(a); g(b);");
        let call = first_of_kind(&root, "call_expression");
        let texts: Vec<_> = call.dfs().filter(Node::is_named).map(|n| n.text()).collect();
        assert_eq!(texts, vec!["f(a)", "f", "(a)", "a"]);
    }

    #[test]
    fn siblings_are_reported_in_document_order() {
        let root = parse("f(1, 2, 3)");
        let args = first_of_kind(&root, "arguments");
        let two = args
            .named_children()
            .nth(1)
            .expect("second argument");

        let after: Vec<_> = two.next_all().filter(Node::is_named).map(|n| n.text()).collect();
        let before: Vec<_> = two
            .prev_all()
            .into_iter()
            .filter(Node::is_named)
            .map(|n| n.text())
            .collect();
        assert_eq!(after, vec!["3"]);
        assert_eq!(before, vec!["1"]);
        assert_eq!(two.prev().map(|n| n.text()), Some(","));
    }

    #[test]
    fn ancestors_walk_towards_the_root() {
        let root = parse("f(a)");
        let ident = first_of_kind(&root, "identifier");
        let kinds: Vec<_> = ident.ancestors().map(|n| n.kind()).collect();
        assert_eq!(kinds, vec!["call_expression", "expression_statement", "program"]);
    }

    #[test]
    fn field_returns_filled_child() {
        let root = parse("console.log(1)");
        let member = first_of_kind(&root, "member_expression");
        let object = member.field("object").expect("field lookup");
        assert_eq!(object.map(|n| n.text()), Some("console"));
    }

    #[test]
    fn field_returns_none_for_unfilled_optional_field() {
        let root = Root::parse("fn main() {}", SupportedLanguage::Rust).expect("parse");
        let func = first_of_kind(&root, "function_item");
        assert!(func.field("return_type").expect("field lookup").is_none());
    }

    #[rstest]
    #[case(SupportedLanguage::Rust, "fn (")]
    #[case(SupportedLanguage::Rust, "struct { x: }")]
    #[case(SupportedLanguage::Python, "def (:\n    pass")]
    #[case(SupportedLanguage::TypeScript, "function (a { return")]
    fn field_lookups_on_recovered_trees_do_not_fail(
        #[case] language: SupportedLanguage,
        #[case] source: &str,
    ) {
        let root = Root::parse(source, language).expect("parse");
        assert!(root.has_errors());

        let index = FieldIndex::for_language(language);
        for node in root.root().dfs() {
            for field in index.fields_of(node.kind()) {
                assert!(
                    node.field(field).is_ok(),
                    "{}.{field} failed on recovered source {source:?}",
                    node.kind()
                );
            }
        }
    }

    #[rstest]
    #[case(SupportedLanguage::Rust, "fn main(a: u8) -> u8 { let x = a + 1; x }")]
    #[case(SupportedLanguage::Python, "def f(a):\n    return a.b(1)\n")]
    #[case(SupportedLanguage::TypeScript, "function f(a) { return a.b[1] + 2; }")]
    fn required_fields_are_filled_in_well_formed_trees(
        #[case] language: SupportedLanguage,
        #[case] source: &str,
    ) {
        let root = Root::parse(source, language).expect("parse");
        assert!(!root.has_errors());

        let index = FieldIndex::for_language(language);
        for node in root.root().dfs() {
            for field in index.fields_of(node.kind()) {
                let required = index
                    .descriptor(node.kind(), field)
                    .is_some_and(|descriptor| descriptor.required);
                let filled = node.field(field).expect("well-formed trees fill required fields");
                assert!(!required || filled.is_some(), "{}.{field} is empty", node.kind());
            }
        }
    }

    #[test]
    fn field_children_collects_repeatable_fields() {
        let root = Root::parse("#[derive(Debug)] struct A;", SupportedLanguage::Rust)
            .expect("parse");
        let item = first_of_kind(&root, "struct_item");
        let names = item.field_children("name");
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn child_counts_anonymous_tokens() {
        let root = parse("f(a)");
        let args = first_of_kind(&root, "arguments");
        assert_eq!(args.child(0).map(|n| n.text()), Some("("));
        assert_eq!(args.child(1).map(|n| n.text()), Some("a"));
        assert_eq!(args.child(3), None);
    }

    #[test]
    fn positions_are_zero_based() {
        let root = parse("x;\n  foo");
        let foo = root
            .root()
            .dfs()
            .find(|n| n.text() == "foo" && n.is("identifier"))
            .expect("foo");
        assert_eq!(foo.start_pos(), Pos::new(1, 2, 5));
        assert_eq!(foo.end_pos(), Pos::new(1, 5, 8));
    }
}
