//! Properties that hold for every tree and every search.

use rstest::rstest;

use crate::{
    FieldIndex, MetaVarEnv, Matcher, Node, Pattern, Root, Rule, RuleCore, RuleRegistry,
    SupportedLanguage,
};

/// Matches nodes by kind name without consulting the grammar.
struct KindIs(&'static str);

impl Matcher for KindIs {
    fn match_node_with_env<'r>(
        &self,
        node: Node<'r>,
        _env: &mut MetaVarEnv<'r>,
    ) -> Option<Node<'r>> {
        node.is(self.0).then_some(node)
    }
}

const fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn compiled_artefacts_are_shareable_across_threads() {
    assert_send_sync::<Root>();
    assert_send_sync::<Pattern>();
    assert_send_sync::<Rule>();
    assert_send_sync::<RuleCore>();
    assert_send_sync::<RuleRegistry>();
    assert_send_sync::<FieldIndex>();
}

#[rstest]
#[case(SupportedLanguage::Rust, "fn main() {\n    let x = 1;\n}")]
#[case(SupportedLanguage::Python, "def f(a, b):\n    return a + b")]
#[case(SupportedLanguage::TypeScript, "const greet = (name: string) => `hi ${name}`;")]
#[case(SupportedLanguage::TypeScript, "// leading comment\nlet é = 'ü';")]
fn root_text_round_trips(#[case] language: SupportedLanguage, #[case] source: &str) {
    let root = Root::parse(source, language).expect("parse");
    assert_eq!(root.root().text(), source);
    assert_eq!(root.commit_edits(Vec::new()).expect("commit"), source);
}

#[rstest]
#[case(SupportedLanguage::TypeScript, "function f(a) { if (a) { return g(a, [1]); } }")]
#[case(SupportedLanguage::Python, "class A:\n    def m(self):\n        return [x for x in y]\n")]
#[case(SupportedLanguage::Rust, "impl S { fn m(&self) -> u8 { match x { _ => 1 } } }")]
fn containment_and_inversion_agree(#[case] language: SupportedLanguage, #[case] source: &str) {
    let root = Root::parse(source, language).expect("parse");
    let named: Vec<_> = root.root().dfs().filter(Node::is_named).collect();

    for parent in &named {
        for child in parent.dfs().skip(1).filter(Node::is_named) {
            assert!(
                parent.has(KindIs(child.kind())),
                "{} should contain a {}",
                parent.kind(),
                child.kind()
            );
            assert!(
                child.inside(KindIs(parent.kind())),
                "{} should be inside a {}",
                child.kind(),
                parent.kind()
            );
            assert!(parent.range().contains(&child.range()));
        }
    }
}

#[rstest]
#[case("$F($$$)")]
#[case("$X")]
#[case("$A + $B")]
fn find_all_offsets_strictly_increase(#[case] pattern: &str) {
    let root = Root::parse(
        "f(a + b, g(c + d)); h(1 + 2 + 3);",
        SupportedLanguage::TypeScript,
    )
    .expect("parse");
    let compiled = Pattern::compile(pattern, SupportedLanguage::TypeScript).expect("pattern");
    let starts: Vec<_> = root
        .root()
        .find_all(&compiled)
        .map(|m| m.byte_range().start)
        .collect();

    assert!(!starts.is_empty());
    assert!(starts.windows(2).all(|pair| matches!(pair, [a, b] if a < b)));
}

#[rstest]
#[case("1 + 1", true)]
#[case("x + x", true)]
#[case("f(a) + f(a)", true)]
#[case("1 + 2", false)]
#[case("f(a) + f(b)", false)]
fn reused_names_require_identical_code(#[case] source: &str, #[case] expected: bool) {
    let root = Root::parse(source, SupportedLanguage::TypeScript).expect("parse");
    let pattern = Pattern::compile("$A + $A", SupportedLanguage::TypeScript).expect("pattern");
    assert_eq!(root.root().find(&pattern).is_some(), expected);
}

#[test]
fn multi_capture_binds_every_argument() {
    let root = Root::parse("f(1,2,3)", SupportedLanguage::TypeScript).expect("parse");
    let pattern = Pattern::compile("f($$$ARGS)", SupportedLanguage::TypeScript).expect("pattern");
    let found = root.root().find(&pattern).expect("match");
    let args: Vec<_> = found
        .get_multiple_matches("ARGS")
        .iter()
        .map(|n| n.text())
        .collect();
    assert_eq!(args, vec!["1", "2", "3"]);
}
