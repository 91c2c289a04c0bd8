//! Tests for [`EngineConfig`] and [`TelemetryConfig`].

use std::str::FromStr;

use rstest::rstest;

use crate::telemetry::parse_filter;
use crate::{EngineConfig, LogFormat, TelemetryConfig};

#[test]
fn default_config_has_expected_values() {
    let config = EngineConfig::default();
    assert_eq!(config.max_matches_per_rule(), 10_000);
    assert_eq!(config.max_capture_text_bytes(), 1_048_576);
}

#[test]
fn partial_documents_keep_the_other_defaults() {
    let config: EngineConfig =
        serde_json::from_str(r#"{"max_matches_per_rule": 5}"#).expect("deserialize");
    assert_eq!(config, EngineConfig::new(5, 1_048_576));
}

#[test]
fn unknown_engine_keys_are_rejected() {
    let result = serde_json::from_str::<EngineConfig>(r#"{"max_nodes": 5}"#);
    assert!(result.is_err());
}

#[rstest]
#[case("json", LogFormat::Json)]
#[case("JSON", LogFormat::Json)]
#[case("compact", LogFormat::Compact)]
fn log_formats_parse_case_insensitively(#[case] input: &str, #[case] expected: LogFormat) {
    assert_eq!(LogFormat::from_str(input).expect("format"), expected);
}

#[test]
fn log_format_displays_in_snake_case() {
    assert_eq!(LogFormat::Json.to_string(), "json");
    assert_eq!(LogFormat::default(), LogFormat::Compact);
}

#[test]
fn telemetry_defaults_to_warnings() {
    let config = TelemetryConfig::default();
    assert_eq!(config.filter, "warn");
    assert_eq!(config.format, LogFormat::Compact);
}

#[rstest]
#[case("stitch_syntax=debug,stitch_rules=trace", true)]
#[case("info", true)]
#[case("stitch_syntax=loud", false)]
fn filter_directives_are_validated(#[case] directive: &str, #[case] valid: bool) {
    assert_eq!(parse_filter(directive).is_ok(), valid);
}
