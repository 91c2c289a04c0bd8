//! Reading rule files from YAML and JSON text.
//!
//! Loading happens in two steps. The text is first read into a generic
//! document, so malformed YAML or JSON is reported apart from a
//! well-formed document with the wrong shape. The document is then
//! deserialised into a [`RuleConfig`].

use serde_json::Value;
use tracing::debug;

use crate::diagnostic::{DiagnosticCode, DiagnosticReport};
use crate::scan::CompiledRule;
use crate::serializable::RuleConfig;

impl RuleConfig {
    /// Reads a rule file written in YAML.
    ///
    /// # Errors
    ///
    /// Returns `E_STITCH_YAML_PARSE` for malformed YAML and
    /// `E_STITCH_SCHEMA_INVALID` when the document is not a rule file, for
    /// instance because it carries an unknown key.
    pub fn from_yaml_str(source: &str) -> Result<Self, DiagnosticReport> {
        let document: Value = serde_saphyr::from_str(source).map_err(|error| {
            DiagnosticReport::single(DiagnosticCode::EStitchYamlParse, error.to_string())
        })?;
        Self::from_document(document)
    }

    /// Reads a rule file written in JSON.
    ///
    /// # Errors
    ///
    /// Returns `E_STITCH_JSON_PARSE` for malformed JSON and
    /// `E_STITCH_SCHEMA_INVALID` when the document is not a rule file.
    pub fn from_json_str(source: &str) -> Result<Self, DiagnosticReport> {
        let document: Value = serde_json::from_str(source).map_err(|error| {
            DiagnosticReport::single(DiagnosticCode::EStitchJsonParse, error.to_string())
        })?;
        Self::from_document(document)
    }

    fn from_document(document: Value) -> Result<Self, DiagnosticReport> {
        let config: Self = serde_json::from_value(document).map_err(|error| {
            DiagnosticReport::single(DiagnosticCode::EStitchSchemaInvalid, error.to_string())
        })?;
        debug!(
            target: "stitch_rules::load",
            id = config.id.as_str(),
            language = config.language.as_str(),
            "loaded rule file"
        );
        Ok(config)
    }
}

/// Reads and compiles a YAML rule file.
///
/// # Errors
///
/// Returns the report of [`RuleConfig::from_yaml_str`] or
/// [`RuleConfig::compile`].
pub fn compile_yaml(source: &str) -> Result<CompiledRule, DiagnosticReport> {
    RuleConfig::from_yaml_str(source)?.compile()
}

/// Reads and compiles a JSON rule file.
///
/// # Errors
///
/// Returns the report of [`RuleConfig::from_json_str`] or
/// [`RuleConfig::compile`].
pub fn compile_json(source: &str) -> Result<CompiledRule, DiagnosticReport> {
    RuleConfig::from_json_str(source)?.compile()
}
