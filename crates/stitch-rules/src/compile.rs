//! Compilation of rule files into core rules.
//!
//! Every rule object, utility, constraint and transformation is compiled
//! even after an earlier one fails, so a single report lists every problem
//! in the file. Each diagnostic carries a note with the dotted path of the
//! offending key, e.g. `rule.inside.has[0]`.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use stitch_syntax::{
    Pattern, Relation, RewriteRule, Rule, RuleCore, RuleRegistry, StopBy, StringCase,
    SupportedLanguage, SyntaxError, Transformation,
};
use tracing::debug;

use crate::diagnostic::{Diagnostic, DiagnosticCode, DiagnosticReport};
use crate::scan::CompiledRule;
use crate::serializable::{
    PatternStyle, RuleConfig, SerializableFixer, SerializableRelation, SerializableRule,
    SerializableStopBy, SerializableTransformation,
};

impl RuleConfig {
    /// Compiles the rule file for its declared language.
    ///
    /// # Errors
    ///
    /// Returns a [`DiagnosticReport`] listing every problem found: an
    /// unknown language, empty or malformed rule objects, patterns that do
    /// not compile, utility cycles, undefined references, invalid
    /// transformations and fix templates naming undefined captures.
    pub fn compile(&self) -> Result<CompiledRule, DiagnosticReport> {
        let language = SupportedLanguage::from_str(&self.language).map_err(|error| {
            DiagnosticReport::from(
                Diagnostic::new(
                    DiagnosticCode::EStitchUnknownLanguage,
                    error.to_string(),
                    Vec::new(),
                )
                .with_note(format!("in rule '{}'", self.id)),
            )
        })?;

        let compiler = RuleCompiler::new(language);
        let mut diagnostics = Vec::new();

        let utils = compiler.compile_named(&self.utils, "utils", &mut diagnostics);
        let main = match compiler.compile(&self.rule, "rule") {
            Ok(rule) => Some(rule),
            Err(diagnostic) => {
                diagnostics.push(diagnostic);
                None
            }
        };
        let constraints =
            compiler.compile_named(&self.constraints, "constraints", &mut diagnostics);

        let resolved = if diagnostics.is_empty() {
            main.and_then(|rule| resolve_main(rule, utils, &mut diagnostics))
        } else {
            None
        };

        let captures = resolved.as_ref().map(|(_, rule)| rule.defined_vars());
        let transforms = match compile_transforms(&self.transform, captures.as_ref()) {
            Ok(ordered) => Some(ordered),
            Err(mut failed) => {
                diagnostics.append(&mut failed);
                None
            }
        };

        let (Some((registry, rule)), Some(ordered), true) =
            (resolved, transforms, diagnostics.is_empty())
        else {
            return Err(self.report(diagnostics));
        };

        let constrained = constraints
            .into_iter()
            .fold(RuleCore::new(rule), |acc, (name, constraint)| {
                acc.with_constraint(name, constraint)
            });
        let core = ordered
            .into_iter()
            .fold(constrained, |acc, (name, transform)| {
                acc.with_transform(name, transform)
            })
            .resolve(&registry)
            .map_err(|error| self.report(vec![located(&error, "constraints")]))?;

        let fixer = self
            .fix
            .as_ref()
            .map(|fix| compiler.fixer(fix, core.clone(), &registry))
            .transpose()
            .map_err(|failed| self.report(failed))?;

        debug!(
            target: "stitch_rules::compile",
            id = self.id.as_str(),
            %language,
            utils = registry.len(),
            has_fix = fixer.is_some(),
            "compiled rule"
        );
        Ok(CompiledRule::new(
            self.id.clone(),
            language,
            self.message.clone(),
            core,
            fixer,
        ))
    }

    fn report(&self, diagnostics: Vec<Diagnostic>) -> DiagnosticReport {
        let id = &self.id;
        DiagnosticReport::new(
            diagnostics
                .into_iter()
                .map(|diagnostic| diagnostic.with_note(format!("in rule '{id}'")))
                .collect(),
        )
    }
}

/// Builds the utility registry and resolves the main rule against it, so
/// captures bound inside referenced utilities count as defined.
fn resolve_main(
    rule: Rule,
    utils: Vec<(String, Rule)>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<(RuleRegistry, Rule)> {
    let registry = match RuleRegistry::from_rules(utils) {
        Ok(registry) => registry,
        Err(error) => {
            diagnostics.push(located(&error, "utils"));
            return None;
        }
    };
    match registry.resolve(rule) {
        Ok(resolved) => Some((registry, resolved)),
        Err(error) => {
            diagnostics.push(located(&error, "rule"));
            None
        }
    }
}

fn located(error: &SyntaxError, path: &str) -> Diagnostic {
    Diagnostic::from_syntax_error(error).with_note(format!("at {path}"))
}

fn schema_error(message: impl Into<String>, path: &str) -> Diagnostic {
    Diagnostic::new(
        DiagnosticCode::EStitchSchemaInvalid,
        message.into(),
        Vec::new(),
    )
    .with_note(format!("at {path}"))
}

/// Builds core rules for one language.
struct RuleCompiler {
    language: SupportedLanguage,
}

impl RuleCompiler {
    const fn new(language: SupportedLanguage) -> Self {
        Self { language }
    }

    fn compile(&self, rule: &SerializableRule, path: &str) -> Result<Rule, Diagnostic> {
        if rule.is_empty() {
            return Err(schema_error(
                "a rule object needs at least one rule key",
                path,
            ));
        }

        let mut parts = Vec::new();
        if let Some(pattern) = &rule.pattern {
            parts.push(self.pattern(pattern, &format!("{path}.pattern"))?);
        }
        if let Some(kind) = &rule.kind {
            parts.push(
                Rule::kind(kind, self.language)
                    .map_err(|error| located(&error, &format!("{path}.kind")))?,
            );
        }
        if let Some(regex) = &rule.regex {
            parts.push(
                Rule::regex(regex).map_err(|error| located(&error, &format!("{path}.regex")))?,
            );
        }
        if let Some(all) = &rule.all {
            parts.push(Rule::All(self.compile_each(all, &format!("{path}.all"))?));
        }
        if let Some(any) = &rule.any {
            parts.push(Rule::Any(self.compile_each(any, &format!("{path}.any"))?));
        }
        if let Some(not) = &rule.not {
            parts.push(self.compile(not, &format!("{path}.not"))?.negate());
        }
        if let Some(name) = &rule.matches {
            parts.push(Rule::matches(name.as_str()));
        }
        if let Some(inside) = &rule.inside {
            parts.push(Rule::Inside(Box::new(
                self.relation(inside, &format!("{path}.inside"))?,
            )));
        }
        if let Some(has) = &rule.has {
            parts.push(Rule::Has(Box::new(self.relation(has, &format!("{path}.has"))?)));
        }
        if let Some(precedes) = &rule.precedes {
            parts.push(Rule::Precedes(Box::new(
                self.relation(precedes, &format!("{path}.precedes"))?,
            )));
        }
        if let Some(follows) = &rule.follows {
            parts.push(Rule::Follows(Box::new(
                self.relation(follows, &format!("{path}.follows"))?,
            )));
        }

        Ok(match <[Rule; 1]>::try_from(parts) {
            Ok([single]) => single,
            Err(several) => Rule::All(several),
        })
    }

    fn compile_named(
        &self,
        rules: &BTreeMap<String, SerializableRule>,
        section: &str,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<(String, Rule)> {
        let mut compiled = Vec::with_capacity(rules.len());
        for (name, rule) in rules {
            match self.compile(rule, &format!("{section}.{name}")) {
                Ok(built) => compiled.push((name.clone(), built)),
                Err(diagnostic) => diagnostics.push(diagnostic),
            }
        }
        compiled
    }

    fn compile_each(
        &self,
        rules: &[SerializableRule],
        path: &str,
    ) -> Result<Vec<Rule>, Diagnostic> {
        rules
            .iter()
            .enumerate()
            .map(|(index, rule)| self.compile(rule, &format!("{path}[{index}]")))
            .collect()
    }

    fn pattern(&self, pattern: &PatternStyle, path: &str) -> Result<Rule, Diagnostic> {
        let compiled = match pattern {
            PatternStyle::Str(source) => Pattern::compile(source, self.language),
            PatternStyle::Contextual { context, selector } => {
                Pattern::contextual(context, selector, self.language)
            }
        };
        compiled
            .map(Rule::Pattern)
            .map_err(|error| located(&error, path))
    }

    /// Builds the rewrite for `fix`, reporting the template and both
    /// expanders together.
    fn fixer(
        &self,
        fix: &SerializableFixer,
        core: RuleCore,
        registry: &RuleRegistry,
    ) -> Result<RewriteRule, Vec<Diagnostic>> {
        let (expand_start, expand_end) = match fix {
            SerializableFixer::Str(_) => (None, None),
            SerializableFixer::Config(config) => {
                (config.expand_start.as_ref(), config.expand_end.as_ref())
            }
        };

        let mut diagnostics = Vec::new();
        let mut expander = |relation: Option<&SerializableRelation>, path: &str| {
            let compiled = self.expander(relation?, registry, path);
            compiled.map_err(|diagnostic| diagnostics.push(diagnostic)).ok()
        };
        let start = expander(expand_start, "fix.expandStart");
        let end = expander(expand_end, "fix.expandEnd");
        let rewrite = RewriteRule::new(core, fix.template())
            .map_err(|error| diagnostics.push(located(&error, "fix")))
            .ok();

        let (Some(mut rewrite), true) = (rewrite, diagnostics.is_empty()) else {
            return Err(diagnostics);
        };
        if let Some(relation) = start {
            rewrite = rewrite.with_expand_start(relation);
        }
        if let Some(relation) = end {
            rewrite = rewrite.with_expand_end(relation);
        }
        Ok(rewrite)
    }

    fn expander(
        &self,
        relation: &SerializableRelation,
        registry: &RuleRegistry,
        path: &str,
    ) -> Result<Relation, Diagnostic> {
        if relation.field.is_some() {
            return Err(schema_error(
                "`field` does not apply to a fix expander",
                &format!("{path}.field"),
            ));
        }
        self.relation(relation, path)?
            .resolve(registry)
            .map_err(|error| located(&error, path))
    }

    fn relation(
        &self,
        relation: &SerializableRelation,
        path: &str,
    ) -> Result<Relation, Diagnostic> {
        if let Some(key) = relation.unknown.keys().next() {
            return Err(schema_error(format!("unknown field `{key}`"), path));
        }

        let stop_by = match &relation.stop_by {
            SerializableStopBy::Neighbor => StopBy::Neighbor,
            SerializableStopBy::End => StopBy::End,
            SerializableStopBy::Rule(rule) => {
                StopBy::Rule(Box::new(self.compile(rule, &format!("{path}.stopBy"))?))
            }
        };
        let compiled = Relation::new(self.compile(&relation.rule, path)?).with_stop_by(stop_by);

        match &relation.field {
            Some(field) => compiled
                .with_field(field, self.language)
                .map_err(|error| located(&error, &format!("{path}.field"))),
            None => Ok(compiled),
        }
    }
}

/// Compiles the `transform` section and orders it so every transformation
/// runs after the transformation it reads.
///
/// Sources are checked against `captures` when the main rule is known; with
/// `None` only the transformations themselves are checked.
fn compile_transforms(
    transforms: &BTreeMap<String, SerializableTransformation>,
    captures: Option<&BTreeSet<String>>,
) -> Result<Vec<(String, Transformation)>, Vec<Diagnostic>> {
    let mut compiled = BTreeMap::new();
    let mut diagnostics = Vec::new();

    for (name, transform) in transforms {
        let path = format!("transform.{name}");
        match compile_transform(transform) {
            Ok(built) => {
                let source = built.source();
                let defined = captures.is_none_or(|names| names.contains(source))
                    || transforms.contains_key(source);
                if defined {
                    compiled.insert(name.clone(), built);
                } else {
                    diagnostics.push(transform_error(
                        format!("transformation reads undefined metavariable: ${source}"),
                        &path,
                    ));
                }
            }
            Err(message) => diagnostics.push(transform_error(message, &path)),
        }
    }

    if !diagnostics.is_empty() {
        return Err(diagnostics);
    }
    order_transforms(compiled).map_err(|diagnostic| vec![diagnostic])
}

fn compile_transform(transform: &SerializableTransformation) -> Result<Transformation, String> {
    match transform {
        SerializableTransformation::Substring(config) => {
            Transformation::substring(&config.source, config.start_char, config.end_char)
                .map_err(|error| error.to_string())
        }
        SerializableTransformation::Replace(config) => {
            Transformation::replace(&config.source, &config.replace, config.by.as_str())
                .map_err(|error| error.to_string())
        }
        SerializableTransformation::Convert(config) => {
            let to_case = StringCase::from_str(&config.to_case)
                .map_err(|_| format!("unknown case '{}'", config.to_case))?;
            Transformation::convert(&config.source, to_case).map_err(|error| error.to_string())
        }
    }
}

fn transform_error(message: String, path: &str) -> Diagnostic {
    Diagnostic::new(DiagnosticCode::EStitchTransformInvalid, message, Vec::new())
        .with_note(format!("at {path}"))
}

/// Orders transformations so each one follows the one it reads.
///
/// Every transformation reads exactly one name, so dependencies form chains
/// and a cycle is detected by meeting a name already on the current chain.
fn order_transforms(
    mut pending: BTreeMap<String, Transformation>,
) -> Result<Vec<(String, Transformation)>, Diagnostic> {
    let mut ordered = Vec::with_capacity(pending.len());

    while let Some(first) = pending.keys().next().cloned() {
        let mut chain = vec![first.clone()];
        let mut current = first;
        while let Some(source) = pending.get(&current).map(|t| t.source().to_owned()) {
            if chain.contains(&source) {
                chain.push(source);
                return Err(transform_error(
                    format!("cyclic transformation: {}", chain.join(" -> ")),
                    "transform",
                ));
            }
            if !pending.contains_key(&source) {
                break;
            }
            chain.push(source.clone());
            current = source;
        }

        for name in chain.into_iter().rev() {
            if let Some(transform) = pending.remove(&name) {
                ordered.push((name, transform));
            }
        }
    }

    Ok(ordered)
}
