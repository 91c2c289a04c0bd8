//! Declarative rule files for the stitch structural search engine.
//!
//! A rule file names a language, a rule tree built from `pattern`, `kind`,
//! `regex`, `all`, `any`, `not`, `inside`, `has`, `precedes`, `follows` and
//! `matches` keys, optional `utils`, `constraints` and `transform`
//! sections, and an optional `fix` template. This crate reads such files
//! from YAML or JSON, compiles them into `stitch_syntax` rules and runs them
//! over parsed trees. It does not discover files; callers hand it text.
//!
//! # Core types
//!
//! - [`RuleConfig`] and the `Serializable*` types: the file's shape
//! - [`CompiledRule`]: a rule ready to scan and fix trees
//! - [`Finding`] and [`ScanReport`]: owned scan results
//! - [`DiagnosticReport`] and [`Diagnostic`]: structured error reporting
//! - [`EngineConfig`]: match and capture limits
//! - [`telemetry`]: optional `tracing` subscriber installation
//!
//! # Example
//!
//! ```
//! use stitch_rules::{EngineConfig, compile_yaml};
//! use stitch_syntax::{Root, SupportedLanguage};
//!
//! let rule = compile_yaml(
//!     "id: no-log\nlanguage: typescript\nrule:\n  pattern: console.log($A)\nfix: logger.info($A)\n",
//! )?;
//! let root = Root::parse("console.log(1);", SupportedLanguage::TypeScript)?;
//! let report = rule.scan(&root, &EngineConfig::default());
//! assert_eq!(report.findings()[0].replacement(), Some("logger.info(1)"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod compile;
mod config;
mod diagnostic;
mod load;
mod scan;
mod serializable;
pub mod telemetry;

pub use config::EngineConfig;
pub use diagnostic::{Diagnostic, DiagnosticCode, DiagnosticReport};
pub use load::{compile_json, compile_yaml};
pub use scan::{CompiledRule, Finding, ScanReport};
pub use serializable::{
    ConvertConfig, PatternStyle, ReplaceConfig, RuleConfig, SerializableFixConfig,
    SerializableFixer, SerializableRelation, SerializableRule, SerializableStopBy,
    SerializableTransformation, SubstringConfig,
};
pub use telemetry::{LogFormat, TelemetryConfig};

#[cfg(test)]
mod tests;
