//! Behaviour-driven tests for structural search and rewrite.

use std::str::FromStr;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use crate::{
    Pattern, Range, RewriteResult, RewriteRule, Rewriter, Root, Rule, RuleRegistry,
    SupportedLanguage, SyntaxError,
};

// ---------------------------------------------------------------------------
// Typed wrappers for Gherkin step parameters
// ---------------------------------------------------------------------------

/// A quoted string value from a Gherkin feature file.
#[derive(Debug, Clone, PartialEq, Eq)]
struct QuotedString(String);

impl FromStr for QuotedString {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim_matches('"').to_owned()))
    }
}

impl QuotedString {
    fn as_str(&self) -> &str {
        &self.0
    }

    fn list(&self) -> Vec<&str> {
        self.0.split(',').collect()
    }
}

// ---------------------------------------------------------------------------
// Test world
// ---------------------------------------------------------------------------

/// Owned view of one match, detached from the tree it came from.
#[derive(Debug, Clone)]
struct MatchSnapshot {
    range: Range,
    text: String,
    captures: Vec<(String, String)>,
    multi_captures: Vec<(String, Vec<String>)>,
}

#[derive(Default)]
struct TestWorld {
    language: Option<SupportedLanguage>,
    root: Option<Root>,
    pattern_match: Option<MatchSnapshot>,
    kind_match: Option<MatchSnapshot>,
    all_matches: Vec<MatchSnapshot>,
    rewrite: Option<RewriteResult>,
    error: Option<SyntaxError>,
}

impl TestWorld {
    fn language(&self) -> SupportedLanguage {
        self.language.expect("language should be set")
    }

    fn root(&self) -> &Root {
        self.root.as_ref().expect("source should be set")
    }

    fn pattern(&self, source: &QuotedString) -> Pattern {
        Pattern::compile(source.as_str(), self.language()).expect("pattern should compile")
    }
}

fn snapshot(found: &crate::NodeMatch<'_>, pattern: Option<&Pattern>) -> MatchSnapshot {
    let names: Vec<&str> = pattern
        .map(|p| p.defined_vars().into_iter().collect())
        .unwrap_or_default();
    MatchSnapshot {
        range: found.range(),
        text: found.text().to_owned(),
        captures: names
            .iter()
            .filter_map(|name| {
                found
                    .get_match(name)
                    .map(|node| ((*name).to_owned(), node.text().to_owned()))
            })
            .collect(),
        multi_captures: names
            .iter()
            .map(|name| {
                let nodes = found.get_multiple_matches(name);
                (
                    (*name).to_owned(),
                    nodes.iter().map(|n| n.text().to_owned()).collect(),
                )
            })
            .collect(),
    }
}

#[fixture]
fn world() -> TestWorld {
    TestWorld::default()
}

// ---------------------------------------------------------------------------
// Given steps
// ---------------------------------------------------------------------------

#[given("language {name}")]
fn given_language(world: &mut TestWorld, name: QuotedString) {
    world.language = Some(SupportedLanguage::from_str(name.as_str()).expect("language"));
}

#[given("source {source}")]
fn given_source(world: &mut TestWorld, source: QuotedString) {
    world.root = Some(Root::parse(source.as_str(), world.language()).expect("parse"));
}

// ---------------------------------------------------------------------------
// When steps
// ---------------------------------------------------------------------------

#[when("the pattern {pattern} is searched")]
fn when_pattern_searched(world: &mut TestWorld, pattern: QuotedString) {
    let compiled = world.pattern(&pattern);
    let recorded = {
        let found = world.root().root().find(&compiled).expect("pattern should match");
        snapshot(&found, Some(&compiled))
    };
    world.pattern_match = Some(recorded);
}

#[when("the kind {kind} is searched")]
fn when_kind_searched(world: &mut TestWorld, kind: QuotedString) {
    let rule = Rule::kind(kind.as_str(), world.language()).expect("kind");
    let recorded = {
        let found = world.root().root().find(&rule).expect("kind should match");
        snapshot(&found, None)
    };
    world.kind_match = Some(recorded);
}

#[when("all matches of the pattern {pattern} are collected")]
fn when_all_matches_collected(world: &mut TestWorld, pattern: QuotedString) {
    let compiled = world.pattern(&pattern);
    let matches = world
        .root()
        .root()
        .find_all(&compiled)
        .map(|found| snapshot(&found, Some(&compiled)))
        .collect();
    world.all_matches = matches;
}

#[when("the pattern {pattern} is rewritten to {replacement}")]
fn when_rewritten(world: &mut TestWorld, pattern: QuotedString, replacement: QuotedString) {
    let rule = RewriteRule::new(world.pattern(&pattern), replacement.as_str()).expect("rule");
    let result = Rewriter::new(world.language())
        .apply_to_root(&rule, world.root())
        .expect("rewrite");
    world.rewrite = Some(result);
}

#[when("every match of the pattern {pattern} is replaced by {text}")]
fn when_every_match_replaced(world: &mut TestWorld, pattern: QuotedString, text: QuotedString) {
    let compiled = world.pattern(&pattern);
    let root = world.root();
    let edits: Vec<_> = root
        .root()
        .find_all(&compiled)
        .map(|found| found.replace(text.as_str()))
        .collect();
    world.error = root.commit_edits(edits).err();
}

#[when("the rules {first} and {second} are registered as referring to each other")]
fn when_rules_cycle(world: &mut TestWorld, first: QuotedString, second: QuotedString) {
    world.error = RuleRegistry::from_rules([
        (first.as_str(), Rule::matches(second.as_str())),
        (second.as_str(), Rule::matches(first.as_str())),
    ])
    .err();
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

#[then("the first match range is {range}")]
fn then_first_match_range(world: &mut TestWorld, range: QuotedString) {
    let found = world.pattern_match.as_ref().expect("pattern match");
    assert_eq!(found.range.to_string(), range.as_str());
}

#[then("the match byte ranges are {ranges}")]
fn then_match_byte_ranges(world: &mut TestWorld, ranges: QuotedString) {
    let actual: Vec<String> = world
        .all_matches
        .iter()
        .map(|m| {
            let bytes = m.range.byte_range();
            format!("{}..{}", bytes.start, bytes.end)
        })
        .collect();
    assert_eq!(actual, ranges.list());
}

#[then("the capture {name} is the string literal {value}")]
fn then_capture_string_literal(world: &mut TestWorld, name: QuotedString, value: QuotedString) {
    let found = world.pattern_match.as_ref().expect("pattern match");
    let captured = found
        .captures
        .iter()
        .find(|(capture, _)| capture == name.as_str())
        .map(|(_, text)| text.as_str());
    assert_eq!(captured, Some(format!("\"{}\"", value.as_str()).as_str()));
}

#[then("the kind match range equals the pattern match range")]
fn then_kind_range_matches(world: &mut TestWorld) {
    let by_pattern = world.pattern_match.as_ref().expect("pattern match");
    let by_kind = world.kind_match.as_ref().expect("kind match");
    assert_eq!(by_kind.range, by_pattern.range);
}

#[then("the matched texts are {texts}")]
fn then_matched_texts(world: &mut TestWorld, texts: QuotedString) {
    let actual: Vec<&str> = world.all_matches.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(actual, texts.list());
}

#[then("the multi capture {name} holds {values}")]
fn then_multi_capture(world: &mut TestWorld, name: QuotedString, values: QuotedString) {
    let found = world.pattern_match.as_ref().expect("pattern match");
    let (_, captured) = found
        .multi_captures
        .iter()
        .find(|(capture, _)| capture == name.as_str())
        .expect("multi capture should be recorded");
    assert_eq!(captured, &values.list());
}

#[then("the output is {output}")]
fn then_output(world: &mut TestWorld, output: QuotedString) {
    let result = world.rewrite.as_ref().expect("rewrite result");
    assert_eq!(result.output(), output.as_str());
}

#[then("{count} replacements were made")]
fn then_replacement_count(world: &mut TestWorld, count: usize) {
    let result = world.rewrite.as_ref().expect("rewrite result");
    assert_eq!(result.num_replacements(), count);
}

#[then("the commit is rejected as overlapping")]
fn then_commit_rejected(world: &mut TestWorld) {
    let error = world.error.as_ref().expect("commit should fail");
    assert!(matches!(error, SyntaxError::OverlappingEdits { .. }));
}

#[then("the original source is {source}")]
fn then_original_source(world: &mut TestWorld, source: QuotedString) {
    assert_eq!(world.root().source(), source.as_str());
}

#[then("registration fails with the cycle {cycle}")]
fn then_registration_cycle(world: &mut TestWorld, cycle: QuotedString) {
    let error = world.error.as_ref().expect("registration should fail");
    assert!(matches!(error, SyntaxError::CyclicRule { .. }));
    assert!(
        error.to_string().contains(cycle.as_str()),
        "expected '{}' in '{error}'",
        cycle.as_str()
    );
}

// ---------------------------------------------------------------------------
// Scenario registration
// ---------------------------------------------------------------------------

#[scenario(
    path = "tests/features/stitch_syntax.feature",
    name = "A member access pattern reports its range"
)]
fn member_access_range(world: TestWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/stitch_syntax.feature",
    name = "Every occurrence is found in document order"
)]
fn every_occurrence_in_order(world: TestWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/stitch_syntax.feature",
    name = "A capture exposes the bound source text"
)]
fn capture_exposes_text(world: TestWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/stitch_syntax.feature",
    name = "A kind rule finds the same node as a pattern"
)]
fn kind_rule_agrees_with_pattern(world: TestWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/stitch_syntax.feature",
    name = "A reused capture name requires identical code"
)]
fn reused_capture_name(world: TestWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/stitch_syntax.feature",
    name = "A multi capture binds a run of arguments"
)]
fn multi_capture_run(world: TestWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/stitch_syntax.feature",
    name = "Matches are rewritten with their captures"
)]
fn matches_rewritten(world: TestWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/stitch_syntax.feature",
    name = "Overlapping edits are rejected without partial output"
)]
fn overlapping_edits_rejected(world: TestWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/stitch_syntax.feature",
    name = "Named rules that refer to each other are rejected"
)]
fn cyclic_rules_rejected(world: TestWorld) {
    let _ = world;
}
