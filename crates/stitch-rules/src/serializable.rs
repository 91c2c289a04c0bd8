//! The declarative shape of a rule file.
//!
//! These types mirror the YAML and JSON documents users write. They carry
//! no grammar knowledge; [`RuleConfig::compile`](crate::RuleConfig::compile)
//! checks them against a language and builds the core rule tree.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize, Serializer};

/// A complete rule file: the rule, its helpers and an optional fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    /// Identifier reported with every finding.
    pub id: String,
    /// Language name, e.g. `typescript`.
    pub language: String,
    /// Human-readable description reported with every finding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Named helper rules that `matches` may reference.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub utils: BTreeMap<String, SerializableRule>,
    /// The main rule.
    pub rule: SerializableRule,
    /// Extra rules the node bound to a `$NAME` capture must satisfy.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub constraints: BTreeMap<String, SerializableRule>,
    /// Derived strings computed from captures after each match.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub transform: BTreeMap<String, SerializableTransformation>,
    /// Replacement for every match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<SerializableFixer>,
}

/// A replacement template, alone or with rules widening the replaced range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SerializableFixer {
    /// The template replaces exactly the matched node.
    Str(String),
    /// The template replaces the node plus the siblings the expanders reach.
    Config(SerializableFixConfig),
}

impl SerializableFixer {
    /// Returns the replacement template.
    #[must_use]
    pub fn template(&self) -> &str {
        match self {
            Self::Str(template) => template,
            Self::Config(config) => &config.template,
        }
    }
}

/// The object form of `fix`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SerializableFixConfig {
    /// Replacement template.
    pub template: String,
    /// Extends the replaced range back to the first earlier sibling matching
    /// this relation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expand_start: Option<SerializableRelation>,
    /// Extends the replaced range to the first later sibling matching this
    /// relation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expand_end: Option<SerializableRelation>,
}

/// One rule object.
///
/// Every key present must hold; an object with several keys is an implicit
/// `all`. An object with no keys at all is rejected at compile time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SerializableRule {
    /// Structural pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<PatternStyle>,
    /// Grammar node kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Regular expression over the node text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    /// Some ancestor must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inside: Option<Box<SerializableRelation>>,
    /// Some descendant must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has: Option<Box<SerializableRelation>>,
    /// Some later sibling must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precedes: Option<Box<SerializableRelation>>,
    /// Some earlier sibling must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follows: Option<Box<SerializableRelation>>,
    /// Every sub-rule must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all: Option<Vec<SerializableRule>>,
    /// At least one sub-rule must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub any: Option<Vec<SerializableRule>>,
    /// The sub-rule must not match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<SerializableRule>>,
    /// Name of a utility rule that must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matches: Option<String>,
}

impl SerializableRule {
    /// Returns whether no key is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.pattern.is_none()
            && self.kind.is_none()
            && self.regex.is_none()
            && self.inside.is_none()
            && self.has.is_none()
            && self.precedes.is_none()
            && self.follows.is_none()
            && self.all.is_none()
            && self.any.is_none()
            && self.not.is_none()
            && self.matches.is_none()
    }
}

/// A pattern given as a plain string or as a fragment within a context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatternStyle {
    /// The whole string is the pattern.
    Str(String),
    /// `context` is parsed and the first `selector` node inside it becomes
    /// the pattern.
    Contextual {
        /// Source surrounding the fragment.
        context: String,
        /// Kind of the node to extract.
        selector: String,
    },
}

/// The body of `inside`, `has`, `precedes` or `follows`.
///
/// The rule keys sit beside `stopBy` and `field` in the same object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializableRelation {
    /// The rule the related node must match.
    #[serde(flatten)]
    pub rule: SerializableRule,
    /// How far the search reaches.
    #[serde(default)]
    pub stop_by: SerializableStopBy,
    /// Grammar field the related node must occupy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Keys that are neither rule keys nor relation options.
    #[serde(flatten)]
    pub unknown: BTreeMap<String, serde_json::Value>,
}

/// How far a relational search reaches.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SerializableStopBy {
    /// Only the nearest node in the search direction.
    Neighbor,
    /// All the way to the root, the first child or the last sibling.
    #[default]
    End,
    /// Up to and including the first node matching the rule.
    Rule(Box<SerializableRule>),
}

struct StopByVisitor;

impl<'de> Visitor<'de> for StopByVisitor {
    type Value = SerializableStopBy;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("`neighbor`, `end` or a rule object")
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        match value {
            "neighbor" => Ok(SerializableStopBy::Neighbor),
            "end" => Ok(SerializableStopBy::End),
            other => Err(de::Error::custom(format!(
                "unknown stopBy `{other}`, expected `neighbor`, `end` or a rule object"
            ))),
        }
    }

    fn visit_map<A>(self, map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let rule = SerializableRule::deserialize(de::value::MapAccessDeserializer::new(map))?;
        Ok(SerializableStopBy::Rule(Box::new(rule)))
    }
}

impl<'de> Deserialize<'de> for SerializableStopBy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(StopByVisitor)
    }
}

impl Serialize for SerializableStopBy {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Neighbor => serializer.serialize_str("neighbor"),
            Self::End => serializer.serialize_str("end"),
            Self::Rule(rule) => rule.serialize(serializer),
        }
    }
}

/// A string transformation applied to a capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub enum SerializableTransformation {
    /// Character-offset slice.
    Substring(SubstringConfig),
    /// Regex replacement.
    Replace(ReplaceConfig),
    /// Case conversion.
    Convert(ConvertConfig),
}

impl SerializableTransformation {
    /// Returns the `$NAME` reference the transformation reads.
    #[must_use]
    pub fn source(&self) -> &str {
        match self {
            Self::Substring(config) => &config.source,
            Self::Replace(config) => &config.source,
            Self::Convert(config) => &config.source,
        }
    }
}

/// Options of a `substring` transformation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SubstringConfig {
    /// Capture reference, e.g. `$ARG`.
    pub source: String,
    /// First character kept; negative values count from the end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_char: Option<i64>,
    /// First character dropped; negative values count from the end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_char: Option<i64>,
}

/// Options of a `replace` transformation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReplaceConfig {
    /// Capture reference, e.g. `$ARG`.
    pub source: String,
    /// Regular expression to search for.
    pub replace: String,
    /// Replacement text; `$1` and `${name}` refer to regex groups.
    pub by: String,
}

/// Options of a `convert` transformation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConvertConfig {
    /// Capture reference, e.g. `$ARG`.
    pub source: String,
    /// Target case, e.g. `snakeCase`.
    pub to_case: String,
}
