//! Tests for rule combinators, relations and rule cores.

use rstest::{fixture, rstest};

use super::*;
use crate::language::SupportedLanguage;
use crate::parser::Root;
use crate::transform::{StringCase, Transformation};

const TS: SupportedLanguage = SupportedLanguage::TypeScript;

fn kind(name: &str) -> Rule {
    Rule::kind(name, TS).expect("kind")
}

fn pattern(source: &str) -> Rule {
    Rule::pattern(source, TS).expect("pattern")
}

fn relation(rule: Rule) -> Box<Relation> {
    Box::new(Relation::new(rule))
}

fn texts<M: Matcher>(root: &Root, matcher: M) -> Vec<String> {
    root.root()
        .find_all(matcher)
        .map(|m| m.text().to_owned())
        .collect()
}

#[fixture]
fn nested() -> Root {
    Root::parse("function f() { if (x) { g(1); } return 2; }", TS).expect("parse")
}

// ---------------------------------------------------------------------------
// Boolean combinators
// ---------------------------------------------------------------------------

#[test]
fn all_shares_one_environment() {
    let root = Root::parse("1 + 2; 3 + 3;", TS).expect("parse");
    let rule = Rule::All(vec![pattern("$A + $B"), pattern("$B + $A")]);
    assert_eq!(texts(&root, &rule), vec!["3 + 3"]);
}

#[test]
fn any_keeps_only_the_winning_captures() {
    let root = Root::parse("foo(1); bar(2);", TS).expect("parse");
    let rule = Rule::Any(vec![pattern("foo($A)"), pattern("bar($B)")]);
    let found: Vec<_> = root.root().find_all(&rule).collect();
    let [foo, bar] = found.as_slice() else {
        panic!("expected two matches");
    };
    assert_eq!(foo.get_match("A").map(|n| n.text()), Some("1"));
    assert!(foo.get_match("B").is_none());
    assert_eq!(bar.get_match("B").map(|n| n.text()), Some("2"));
    assert!(bar.get_match("A").is_none());
}

#[test]
fn not_excludes_matches_and_binds_nothing() {
    let root = Root::parse("foo(1); bar(2);", TS).expect("parse");
    let rule = Rule::All(vec![kind("call_expression"), pattern("foo($A)").negate()]);
    let found = root.root().find(&rule).expect("match");
    assert_eq!(found.text(), "bar(2)");
    assert!(found.get_env().is_empty());
    assert!(rule.defined_vars().is_empty());
}

#[test]
fn defined_vars_collects_through_combinators() {
    let rule = Rule::All(vec![
        pattern("$F($$$ARGS)"),
        Rule::Has(relation(pattern("$X + 1"))),
        Rule::Any(vec![pattern("$Y"), pattern("$Z").negate()]),
    ]);
    let vars: Vec<_> = rule.defined_vars().into_iter().collect();
    assert_eq!(vars, vec!["ARGS", "F", "X", "Y"]);
}

// ---------------------------------------------------------------------------
// Relations
// ---------------------------------------------------------------------------

#[rstest]
#[case::end(StopBy::End, "if_statement", true)]
#[case::end_reaches_root(StopBy::End, "function_declaration", true)]
#[case::neighbor(StopBy::Neighbor, "if_statement", false)]
#[case::neighbor_parent(StopBy::Neighbor, "expression_statement", true)]
#[case::stop_rule_inclusive(StopBy::Rule(Box::new(kind("if_statement"))), "if_statement", true)]
#[case::stop_rule_blocks(
    StopBy::Rule(Box::new(kind("statement_block"))),
    "function_declaration",
    false
)]
fn inside_honours_stop_by(
    nested: Root,
    #[case] stop_by: StopBy,
    #[case] ancestor: &str,
    #[case] expected: bool,
) {
    let rule = Rule::All(vec![
        pattern("g($A)"),
        Rule::Inside(Box::new(Relation::new(kind(ancestor)).with_stop_by(stop_by))),
    ]);
    assert_eq!(nested.root().find(&rule).is_some(), expected);
}

#[rstest]
#[case::end(StopBy::End, true)]
#[case::neighbor(StopBy::Neighbor, false)]
#[case::stop_at_block(StopBy::Rule(Box::new(kind("statement_block"))), false)]
fn has_honours_stop_by(nested: Root, #[case] stop_by: StopBy, #[case] expected: bool) {
    let rule = Rule::All(vec![
        kind("function_declaration"),
        Rule::Has(Box::new(
            Relation::new(kind("return_statement")).with_stop_by(stop_by),
        )),
    ]);
    assert_eq!(nested.root().find(&rule).is_some(), expected);
}

#[test]
fn has_field_restricts_where_the_descendant_sits() {
    let root = Root::parse("foo(bar); bar(foo);", TS).expect("parse");
    let by_function = Relation::new(Rule::regex("^bar$").expect("regex"))
        .with_field("function", TS)
        .expect("field");
    let rule = Rule::All(vec![kind("call_expression"), Rule::Has(Box::new(by_function))]);
    assert_eq!(texts(&root, &rule), vec!["bar(foo)"]);
}

#[test]
fn inside_field_restricts_the_path_into_the_ancestor() {
    let root = Root::parse("let x = y; let z = x;", TS).expect("parse");
    let in_value = Relation::new(kind("variable_declarator"))
        .with_field("value", TS)
        .expect("field");
    let rule = Rule::All(vec![
        kind("identifier"),
        Rule::regex("^x$").expect("regex"),
        Rule::Inside(Box::new(in_value)),
    ]);
    let starts: Vec<_> = root
        .root()
        .find_all(&rule)
        .map(|m| m.byte_range().start)
        .collect();
    assert_eq!(starts, vec![19]);
}

#[test]
fn unknown_fields_are_rejected() {
    let err = Relation::new(kind("identifier"))
        .with_field("no_such_field", TS)
        .expect_err("unknown field");
    assert!(matches!(err, SyntaxError::UnknownField { .. }));
}

#[rstest]
#[case::precedes_end(true, StopBy::End, "c();", vec!["a();", "b();"])]
#[case::precedes_neighbor(true, StopBy::Neighbor, "c();", vec!["b();"])]
#[case::follows_end(false, StopBy::End, "a();", vec!["b();", "c();"])]
#[case::follows_neighbor(false, StopBy::Neighbor, "a();", vec!["b();"])]
fn sibling_relations_respect_direction(
    #[case] precedes: bool,
    #[case] stop_by: StopBy,
    #[case] sibling: &str,
    #[case] expected: Vec<&str>,
) {
    let root = Root::parse("a(); b(); c();", TS).expect("parse");
    let related = Box::new(Relation::new(pattern(sibling)).with_stop_by(stop_by));
    let relational = if precedes {
        Rule::Precedes(related)
    } else {
        Rule::Follows(related)
    };
    let rule = Rule::All(vec![kind("expression_statement"), relational]);
    assert_eq!(texts(&root, &rule), expected);
}

#[test]
fn relational_captures_are_visible_to_the_caller() {
    let root = Root::parse("foo(a + 1);", TS).expect("parse");
    let rule = Rule::All(vec![
        pattern("$F($$$)"),
        Rule::Has(relation(pattern("$X + 1"))),
    ]);
    let found = root.root().find(&rule).expect("match");
    assert_eq!(found.get_match("F").map(|n| n.text()), Some("foo"));
    assert_eq!(found.get_match("X").map(|n| n.text()), Some("a"));
}

#[test]
fn relations_agree_with_node_queries() {
    let root = Root::parse("f(1, g(2)); let v = [3];", TS).expect("parse");
    let inside_arguments = Rule::All(vec![
        kind("number"),
        Rule::Inside(relation(kind("arguments"))),
    ]);
    let found: Vec<_> = root.root().find_all(&inside_arguments).collect();
    assert_eq!(found.len(), 2);
    for node in &found {
        assert!(node.inside(kind("arguments")));
    }

    let has_number = Rule::Has(relation(kind("number")));
    for node in root.root().find_all(&has_number) {
        assert!(node.has(kind("number")));
    }
}

#[test]
fn unresolved_references_match_nothing() {
    let root = Root::parse("f(1);", TS).expect("parse");
    let reference = Rule::matches("calls");
    let Rule::Matches(referent) = &reference else {
        panic!("expected a reference");
    };
    assert_eq!(referent.name(), "calls");
    assert!(!referent.is_resolved());
    assert!(root.root().find(&reference).is_none());
}

// ---------------------------------------------------------------------------
// Rule cores
// ---------------------------------------------------------------------------

#[test]
fn constraints_filter_single_captures() {
    let root = Root::parse("foo(1); foo(x);", TS).expect("parse");
    let core = RuleCore::new(pattern("foo($A)")).with_constraint("A", kind("number"));
    assert_eq!(texts(&root, &core), vec!["foo(1)"]);
}

#[test]
fn constraints_on_unbound_names_pass() {
    let root = Root::parse("foo(1); foo(x);", TS).expect("parse");
    let core = RuleCore::new(pattern("foo($A)")).with_constraint("Z", kind("number"));
    assert_eq!(texts(&root, &core), vec!["foo(1)", "foo(x)"]);
}

#[test]
fn transforms_run_in_order_and_chain() {
    let root = Root::parse("let fooBar = 1;", TS).expect("parse");
    let core = RuleCore::new(pattern("let $NAME = $V"))
        .with_transform(
            "SNAKE",
            Transformation::convert("$NAME", StringCase::SnakeCase).expect("convert"),
        )
        .with_transform(
            "SHOUT",
            Transformation::convert("$SNAKE", StringCase::UpperCase).expect("convert"),
        );

    let found = root.root().find(&core).expect("match");
    assert_eq!(found.get_transformed("SNAKE"), Some("foo_bar"));
    assert_eq!(found.get_transformed("SHOUT"), Some("FOO_BAR"));

    let vars: Vec<_> = core.defined_vars().into_iter().collect();
    assert_eq!(vars, vec!["NAME", "SHOUT", "SNAKE", "V"]);
}

#[test]
fn rule_cores_resolve_constraints_through_the_registry() {
    let registry = RuleRegistry::from_rules([
        ("call", pattern("foo($A)")),
        ("num", kind("number")),
    ])
    .expect("registry");
    let core = RuleCore::new(Rule::matches("call"))
        .with_constraint("A", Rule::matches("num"))
        .resolve(&registry)
        .expect("resolve");

    let root = Root::parse("foo(1); foo(x);", TS).expect("parse");
    assert_eq!(texts(&root, &core), vec!["foo(1)"]);
    assert_eq!(
        core.defined_vars().into_iter().collect::<Vec<_>>(),
        vec!["A"]
    );
}
