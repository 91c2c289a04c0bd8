//! Running compiled rules over parsed trees.

use std::collections::BTreeMap;

use serde::Serialize;
use stitch_syntax::{
    FindAll, NodeMatch, Range, RewriteResult, RewriteRule, Rewriter, Root, RuleCore,
    SupportedLanguage,
};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::diagnostic::{Diagnostic, DiagnosticReport};

/// A rule file compiled for its language, ready to run.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    id: String,
    language: SupportedLanguage,
    message: Option<String>,
    core: RuleCore,
    fixer: Option<RewriteRule>,
}

impl CompiledRule {
    pub(crate) const fn new(
        id: String,
        language: SupportedLanguage,
        message: Option<String>,
        core: RuleCore,
        fixer: Option<RewriteRule>,
    ) -> Self {
        Self {
            id,
            language,
            message,
            core,
            fixer,
        }
    }

    /// Returns the rule identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the language the rule was compiled for.
    #[must_use]
    pub const fn language(&self) -> SupportedLanguage {
        self.language
    }

    /// Returns the rule message, if the file declared one.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns the compiled matcher.
    #[must_use]
    pub const fn core(&self) -> &RuleCore {
        &self.core
    }

    /// Returns the compiled fix, if the file declared one.
    #[must_use]
    pub const fn fixer(&self) -> Option<&RewriteRule> {
        self.fixer.as_ref()
    }

    /// Lazily searches `root` for matches in pre-order.
    ///
    /// A tree of another language yields nothing.
    #[must_use]
    pub fn find_all<'r>(&'r self, root: &'r Root) -> FindAll<'r, &'r RuleCore> {
        root.root().find_all(&self.core)
    }

    /// Collects the findings of the rule in `root`.
    ///
    /// At most `config.max_matches_per_rule()` findings are kept; texts are
    /// clipped to `config.max_capture_text_bytes()`.
    #[must_use]
    pub fn scan(&self, root: &Root, config: &EngineConfig) -> ScanReport {
        if root.language() != self.language {
            debug!(
                target: "stitch_rules::scan",
                id = self.id.as_str(),
                rule_language = %self.language,
                tree_language = %root.language(),
                "skipping tree of another language"
            );
            return ScanReport::default();
        }

        let limit = config.max_matches_per_rule();
        let mut matches = self.find_all(root);
        let findings: Vec<Finding> = matches
            .by_ref()
            .take(limit)
            .map(|found| self.finding(&found, config.max_capture_text_bytes()))
            .collect();
        let truncated = findings.len() == limit && matches.next().is_some();

        if truncated {
            warn!(
                target: "stitch_rules::scan",
                id = self.id.as_str(),
                filename = root.filename(),
                limit,
                "finding limit reached; remaining matches dropped"
            );
        }
        debug!(
            target: "stitch_rules::scan",
            id = self.id.as_str(),
            filename = root.filename(),
            findings = findings.len(),
            "scanned tree"
        );
        ScanReport {
            findings,
            truncated,
        }
    }

    /// Applies the fix to every outermost match in `root`.
    ///
    /// Returns `Ok(None)` when the rule has no fix.
    ///
    /// # Errors
    ///
    /// Returns a report if the edits cannot be committed.
    pub fn fix(&self, root: &Root) -> Result<Option<RewriteResult>, DiagnosticReport> {
        let Some(fixer) = &self.fixer else {
            return Ok(None);
        };
        Rewriter::new(self.language)
            .apply_to_root(fixer, root)
            .map(Some)
            .map_err(|error| {
                DiagnosticReport::from(
                    Diagnostic::from_syntax_error(&error)
                        .with_note(format!("while fixing with rule '{}'", self.id)),
                )
            })
    }

    fn finding(&self, found: &NodeMatch<'_>, max_bytes: usize) -> Finding {
        let env = found.get_env();
        let captures = env
            .captured_names()
            .into_iter()
            .filter_map(|name| {
                env.text_of(name)
                    .map(|text| (name.to_owned(), clip(&text, max_bytes).to_owned()))
            })
            .collect();
        let transformed = self
            .core
            .transforms()
            .iter()
            .filter_map(|(name, _)| {
                env.get_transformed(name)
                    .map(|text| (name.clone(), clip(text, max_bytes).to_owned()))
            })
            .collect();

        Finding {
            rule_id: self.id.clone(),
            range: found.range(),
            text: clip(found.text(), max_bytes).to_owned(),
            captures,
            transformed,
            replacement: self.fixer.as_ref().map(|fixer| fixer.render(env)),
        }
    }
}

/// Cuts `text` to at most `max_bytes`, backing off to a character boundary.
fn clip(text: &str, max_bytes: usize) -> &str {
    let mut end = max_bytes.min(text.len());
    while !text.is_char_boundary(end) {
        end = end.saturating_sub(1);
    }
    text.get(..end).unwrap_or_default()
}

/// The findings of one rule in one tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    findings: Vec<Finding>,
    truncated: bool,
}

impl ScanReport {
    /// Returns the findings in document order.
    #[must_use]
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Returns whether matches past the configured limit were dropped.
    #[must_use]
    pub const fn truncated(&self) -> bool {
        self.truncated
    }

    /// Returns whether nothing was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    /// Returns the number of findings kept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.findings.len()
    }
}

/// One match of a rule, detached from the tree it was found in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    rule_id: String,
    range: Range,
    text: String,
    captures: BTreeMap<String, String>,
    transformed: BTreeMap<String, String>,
    replacement: Option<String>,
}

impl Finding {
    /// Returns the identifier of the rule that matched.
    #[must_use]
    pub fn rule_id(&self) -> &str {
        &self.rule_id
    }

    /// Returns the matched range.
    #[must_use]
    pub const fn range(&self) -> Range {
        self.range
    }

    /// Returns the matched text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the text of every capture by name.
    ///
    /// `$$$NAME` runs map to the text spanning the whole run.
    #[must_use]
    pub const fn captures(&self) -> &BTreeMap<String, String> {
        &self.captures
    }

    /// Returns the outputs of the rule's transformations by name.
    #[must_use]
    pub const fn transformed(&self) -> &BTreeMap<String, String> {
        &self.transformed
    }

    /// Returns the rendered fix for this match, if the rule has one.
    #[must_use]
    pub fn replacement(&self) -> Option<&str> {
        self.replacement.as_deref()
    }
}
