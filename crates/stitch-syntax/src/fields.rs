//! Per-grammar field tables.
//!
//! Every Tree-sitter grammar ships a `node-types.json` describing which
//! fields each node kind carries, whether a field is required, whether it
//! repeats and which kinds may fill it. [`FieldIndex`] is that table, built
//! once per language on first use and shared for the lifetime of the
//! process.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use once_cell::sync::Lazy;
use serde::Deserialize;
use tracing::warn;

use crate::error::SyntaxError;
use crate::language::SupportedLanguage;

static RUST: Lazy<FieldIndex> = Lazy::new(|| FieldIndex::load(SupportedLanguage::Rust));
static PYTHON: Lazy<FieldIndex> = Lazy::new(|| FieldIndex::load(SupportedLanguage::Python));
static TYPESCRIPT: Lazy<FieldIndex> =
    Lazy::new(|| FieldIndex::load(SupportedLanguage::TypeScript));

/// Describes one field of one node kind.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldDescriptor {
    /// Whether every well-formed node of the kind fills this field.
    pub required: bool,
    /// Whether the field may hold several children.
    pub multiple: bool,
    /// Kinds permitted to fill the field, named and anonymous alike.
    pub possible_kinds: BTreeSet<String>,
}

/// Field lookup table for a single grammar.
#[derive(Debug, Clone, Default)]
pub struct FieldIndex {
    kinds: HashMap<String, BTreeMap<String, FieldDescriptor>>,
}

#[derive(Deserialize)]
struct NodeTypeEntry {
    #[serde(rename = "type")]
    kind: String,
    named: bool,
    #[serde(default)]
    fields: BTreeMap<String, RawField>,
}

#[derive(Deserialize)]
struct RawField {
    multiple: bool,
    required: bool,
    #[serde(default)]
    types: Vec<RawFieldType>,
}

#[derive(Deserialize)]
struct RawFieldType {
    #[serde(rename = "type")]
    kind: String,
}

impl FieldIndex {
    /// Returns the shared index for `language`.
    #[must_use]
    pub fn for_language(language: SupportedLanguage) -> &'static Self {
        match language {
            SupportedLanguage::Rust => &RUST,
            SupportedLanguage::Python => &PYTHON,
            SupportedLanguage::TypeScript => &TYPESCRIPT,
        }
    }

    /// Builds an index from the contents of a `node-types.json` file.
    ///
    /// # Errors
    ///
    /// Returns [`SyntaxError::InternalError`] if the document is not a valid
    /// node type table.
    pub fn from_node_types(json: &str) -> Result<Self, SyntaxError> {
        let entries: Vec<NodeTypeEntry> = serde_json::from_str(json)
            .map_err(|e| SyntaxError::internal_error(format!("invalid node types: {e}")))?;

        let kinds = entries
            .into_iter()
            .filter(|entry| entry.named && !entry.fields.is_empty())
            .map(|entry| {
                let fields = entry
                    .fields
                    .into_iter()
                    .map(|(name, raw)| {
                        let descriptor = FieldDescriptor {
                            required: raw.required,
                            multiple: raw.multiple,
                            possible_kinds: raw.types.into_iter().map(|t| t.kind).collect(),
                        };
                        (name, descriptor)
                    })
                    .collect();
                (entry.kind, fields)
            })
            .collect();

        Ok(Self { kinds })
    }

    fn load(language: SupportedLanguage) -> Self {
        Self::from_node_types(language.node_types()).unwrap_or_else(|error| {
            warn!(
                target: "stitch_syntax::fields",
                %language,
                %error,
                "falling back to an empty field index"
            );
            Self::default()
        })
    }

    /// Returns the descriptor of `field` on `kind`, or `None` when the
    /// grammar never attaches that field to that kind.
    #[must_use]
    pub fn descriptor(&self, kind: &str, field: &str) -> Option<&FieldDescriptor> {
        self.kinds.get(kind)?.get(field)
    }

    /// Returns the names of all fields defined for `kind`, sorted.
    pub fn fields_of(&self, kind: &str) -> impl Iterator<Item = &str> {
        self.kinds
            .get(kind)
            .into_iter()
            .flat_map(|fields| fields.keys().map(String::as_str))
    }

    /// Returns whether `field` is defined on any kind of the grammar.
    #[must_use]
    pub fn is_known_field(&self, field: &str) -> bool {
        self.kinds.values().any(|fields| fields.contains_key(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(SupportedLanguage::Rust, "function_item", "name", true)]
    #[case(SupportedLanguage::Rust, "function_item", "return_type", false)]
    #[case(SupportedLanguage::Python, "function_definition", "body", true)]
    #[case(SupportedLanguage::TypeScript, "member_expression", "property", true)]
    fn descriptors_report_required_flag(
        #[case] language: SupportedLanguage,
        #[case] kind: &str,
        #[case] field: &str,
        #[case] required: bool,
    ) {
        let descriptor = FieldIndex::for_language(language)
            .descriptor(kind, field)
            .expect("field is defined");
        assert_eq!(descriptor.required, required);
    }

    #[test]
    fn unknown_pairs_have_no_descriptor() {
        let index = FieldIndex::for_language(SupportedLanguage::Rust);
        assert!(index.descriptor("function_item", "no_such_field").is_none());
        assert!(index.descriptor("no_such_kind", "name").is_none());
    }

    #[test]
    fn fields_of_lists_sorted_field_names() {
        let json = r#"[
            {"type": "pair", "named": true, "fields": {
                "value": {"multiple": false, "required": true, "types": [{"type": "number", "named": true}]},
                "key": {"multiple": false, "required": false, "types": [{"type": "string", "named": true}]}
            }},
            {"type": "+", "named": false}
        ]"#;
        let index = FieldIndex::from_node_types(json).expect("valid table");
        let names: Vec<_> = index.fields_of("pair").collect();
        assert_eq!(names, vec!["key", "value"]);
        assert!(index.is_known_field("key"));
        let value = index.descriptor("pair", "value").expect("value field");
        assert!(value.possible_kinds.contains("number"));
    }

    #[test]
    fn malformed_tables_are_rejected() {
        let err = FieldIndex::from_node_types("{").expect_err("not an array");
        assert!(matches!(err, SyntaxError::InternalError { .. }));
    }
}
