//! End-to-end tests for `stitch-rules` through its public API.

use insta::assert_snapshot;
use rstest::rstest;

use stitch_rules::{DiagnosticCode, EngineConfig, RuleConfig, compile_json, compile_yaml};
use stitch_syntax::{Root, SupportedLanguage};

// =============================================================================
// Happy Path
// =============================================================================

const NO_CONSOLE_LOG: &str = "id: no-console-log
language: typescript
utils:
  is-console:
    pattern: console
rule:
  pattern: console.log($ARG)
  inside:
    kind: function_declaration
    stopBy: end
constraints:
  ARG:
    kind: string
transform:
  INNER:
    substring:
      source: $ARG
      startChar: 1
      endChar: -1
fix: logger.info('$INNER')
";

#[test]
fn documented_rule_file_scans_and_fixes() {
    let rule = compile_yaml(NO_CONSOLE_LOG).unwrap_or_else(|err| panic!("compile: {err}"));
    let root = Root::parse(
        "function boot() {\n  console.log('starting');\n}\nconsole.log('done');",
        SupportedLanguage::TypeScript,
    )
    .unwrap_or_else(|err| panic!("parse: {err}"));

    let report = rule.scan(&root, &EngineConfig::default());
    let texts: Vec<_> = report.findings().iter().map(|f| f.text()).collect();
    assert_eq!(texts, vec!["console.log('starting')"]);

    let fixed = rule
        .fix(&root)
        .unwrap_or_else(|err| panic!("fix: {err}"))
        .unwrap_or_else(|| panic!("rule should carry a fix"));
    assert_eq!(
        fixed.output(),
        "function boot() {\n  logger.info('starting');\n}\nconsole.log('done');"
    );
}

#[rstest]
#[case::rust(
    r#"{"id": "unwrap", "language": "rust", "rule": {"pattern": "$X.unwrap()"}}"#,
    SupportedLanguage::Rust,
    "fn f() { a.unwrap(); b.expect(\"x\"); c.unwrap(); }",
    vec!["a.unwrap()", "c.unwrap()"]
)]
#[case::python(
    r#"{"id": "print", "language": "python", "rule": {"all": [{"kind": "call"}, {"regex": "^print"}]}}"#,
    SupportedLanguage::Python,
    "print(1)\nlen(x)\nprint(2)",
    vec!["print(1)", "print(2)"]
)]
#[case::typescript(
    r#"{"id": "debugger", "language": "typescript", "rule": {"kind": "debugger_statement"}}"#,
    SupportedLanguage::TypeScript,
    "debugger; f(); debugger;",
    vec!["debugger;", "debugger;"]
)]
fn json_rule_files_work_in_every_language(
    #[case] document: &str,
    #[case] language: SupportedLanguage,
    #[case] source: &str,
    #[case] expected: Vec<&str>,
) {
    let rule = compile_json(document).unwrap_or_else(|err| panic!("compile: {err}"));
    let root = Root::parse(source, language).unwrap_or_else(|err| panic!("parse: {err}"));

    let report = rule.scan(&root, &EngineConfig::default());
    let texts: Vec<_> = report.findings().iter().map(|f| f.text()).collect();
    assert_eq!(texts, expected);
}

#[test]
fn precedes_and_follows_order_siblings() {
    let rule = compile_yaml(
        "id: init-before-use
language: typescript
rule:
  kind: expression_statement
  follows:
    pattern: init();
    stopBy: end
  precedes:
    pattern: shutdown();
    stopBy: end
",
    )
    .unwrap_or_else(|err| panic!("compile: {err}"));
    let root = Root::parse(
        "work(); init(); use(); shutdown(); late();",
        SupportedLanguage::TypeScript,
    )
    .unwrap_or_else(|err| panic!("parse: {err}"));

    let report = rule.scan(&root, &EngineConfig::default());
    let texts: Vec<_> = report.findings().iter().map(|f| f.text()).collect();
    assert_eq!(texts, vec!["use();"]);
}

#[test]
fn loaded_rule_files_serialise_back_to_their_keys() {
    let config = RuleConfig::from_yaml_str(
        "id: a\nlanguage: typescript\nrule:\n  kind: number\n  inside:\n    kind: call_expression\n    stopBy: neighbor\n",
    )
    .unwrap_or_else(|err| panic!("load: {err}"));

    let json = serde_json::to_string(&config).unwrap_or_else(|err| panic!("serialize: {err}"));
    assert_snapshot!(json, @r#"{"id":"a","language":"typescript","rule":{"kind":"number","inside":{"kind":"call_expression","stopBy":"neighbor"}}}"#);
}

// =============================================================================
// Unhappy Path: Diagnostics
// =============================================================================

#[test]
fn cyclic_utility_report() {
    let Err(report) = compile_yaml(
        "id: loop\nlanguage: typescript\nutils:\n  a:\n    matches: b\n  b:\n    matches: a\nrule:\n  matches: a\n",
    ) else {
        panic!("cyclic utilities should be rejected");
    };
    assert_eq!(report.first_code(), Some(DiagnosticCode::EStitchCyclicRule));
    assert_snapshot!(report.to_string(), @"E_STITCH_CYCLIC_RULE: cyclic rule reference: a -> b -> a");
}

#[test]
fn unknown_language_report() {
    let Err(report) = compile_yaml("id: a\nlanguage: cobol\nrule:\n  kind: x\n") else {
        panic!("unknown languages should be rejected");
    };
    let diagnostic = report
        .diagnostics()
        .first()
        .unwrap_or_else(|| panic!("diagnostic"));
    assert_eq!(diagnostic.code(), DiagnosticCode::EStitchUnknownLanguage);
    assert_eq!(diagnostic.notes(), ["in rule 'a'"]);
}

#[test]
fn undefined_transform_source_report() {
    let Err(report) = compile_yaml(
        "id: a\nlanguage: typescript\nrule:\n  pattern: f($A)\ntransform:\n  B:\n    substring:\n      source: $C\n",
    ) else {
        panic!("undefined sources should be rejected");
    };
    assert_snapshot!(
        report.to_string(),
        @"E_STITCH_TRANSFORM_INVALID: transformation reads undefined metavariable: $C"
    );
}

#[test]
fn diagnostics_serialise_for_machine_consumers() {
    let Err(report) = compile_yaml("id: a\nlanguage: typescript\nrule:\n  kind: nope\n") else {
        panic!("unknown kinds should be rejected");
    };
    let json = serde_json::to_string(&report).unwrap_or_else(|err| panic!("serialize: {err}"));
    assert_snapshot!(json, @r#"{"diagnostics":[{"code":"EStitchRuleInvalid","message":"unknown node kind 'nope' for typescript","notes":["at rule.kind","in rule 'a'"]}]}"#);
}
