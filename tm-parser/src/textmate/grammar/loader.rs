//! Loading grammars from the TextMate JSON form
//!
//! The on-disk shape is the de-facto standard used by TextMate, Sublime
//! Text's converters and VS Code: a `scopeName`, a `patterns` array, and a
//! `repository` of named rules, nested arbitrarily. Building a [`Grammar`]
//! from it does three things:
//!
//! 1. Interns every rule into the arena, depth first
//! 2. Resolves `#name` (lexically, innermost repository first), `$self`
//!    and `$base` references to rule ids; anything else (references into
//!    other grammars) is left unresolved and tolerated
//! 3. Validates the range-rule invariant (`begin` and `end` both present
//!    or both absent)
//!
//! Repository entries are interned before their bodies are built, so
//! self-referential and mutually-recursive repository items resolve
//! without any special casing.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Deserialize;

use crate::textmate::grammar::{
    CaptureAttribute, CapturesMap, Grammar, GrammarError, IncludeRule, MatchRule, Rule, RuleId,
    ScopeRule, ROOT_RULE,
};
use crate::textmate::regex::RegexPattern;
use crate::textmate::scope::Scope;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGrammar {
    scope_name: Option<String>,
    #[serde(default)]
    patterns: Vec<RawRule>,
    #[serde(default)]
    repository: HashMap<String, RawRule>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRule {
    include: Option<String>,
    name: Option<String>,
    content_name: Option<String>,
    #[serde(rename = "match")]
    match_pattern: Option<String>,
    begin: Option<String>,
    end: Option<String>,
    #[serde(default)]
    captures: BTreeMap<String, RawCapture>,
    #[serde(default)]
    begin_captures: BTreeMap<String, RawCapture>,
    #[serde(default)]
    end_captures: BTreeMap<String, RawCapture>,
    #[serde(default)]
    patterns: Vec<RawRule>,
    #[serde(default)]
    repository: HashMap<String, RawRule>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCapture {
    name: Option<String>,
    #[serde(default)]
    patterns: Vec<RawRule>,
}

/// Parse a JSON grammar document and build the rule tree.
pub fn load_from_json(json: &str) -> Result<Grammar, GrammarError> {
    let raw: RawGrammar = serde_json::from_str(json)?;
    let scope_name = raw.scope_name.as_deref().map(Scope::new);

    let mut builder = Builder { rules: Vec::new() };

    // Reserve the root slot so `$self` can resolve to it while the tree
    // is still being built.
    builder.rules.push(Rule::Scope(ScopeRule {
        name: None,
        content_name: None,
        begin: None,
        end: None,
        captures: CapturesMap::new(),
        begin_captures: CapturesMap::new(),
        end_captures: CapturesMap::new(),
        patterns: Vec::new(),
    }));

    let root_patterns = builder.build_level(&raw.patterns, &raw.repository, &[])?;
    if let Rule::Scope(root) = &mut builder.rules[ROOT_RULE.as_index()] {
        root.patterns = root_patterns;
    }

    Ok(Grammar::new(scope_name, builder.rules))
}

struct Builder {
    rules: Vec<Rule>,
}

/// One lexical level of repository bindings, innermost last
type RepoChain = Vec<HashMap<String, RuleId>>;

impl Builder {
    fn alloc(&mut self, rule: Rule) -> RuleId {
        let id = RuleId(self.rules.len() as u32);
        self.rules.push(rule);
        id
    }

    /// Build the patterns of one nesting level together with the
    /// repository visible from it. Repository ids are allocated up front
    /// so entries can reference each other and themselves.
    fn build_level(
        &mut self,
        patterns: &[RawRule],
        repository: &HashMap<String, RawRule>,
        outer: &[HashMap<String, RuleId>],
    ) -> Result<Vec<RuleId>, GrammarError> {
        let mut chain: RepoChain = outer.to_vec();

        if !repository.is_empty() {
            let mut level = HashMap::with_capacity(repository.len());
            for key in repository.keys() {
                let placeholder = self.alloc(Rule::Include(IncludeRule {
                    reference: format!("#{}", key),
                    target: None,
                }));
                level.insert(key.clone(), placeholder);
            }
            chain.push(level);

            for (key, raw) in repository {
                let id = chain.last().and_then(|l| l.get(key)).copied();
                if let Some(id) = id {
                    let rule = self.build_rule(raw, &chain)?;
                    self.rules[id.as_index()] = rule;
                }
            }
        }

        patterns
            .iter()
            .map(|raw| {
                let rule = self.build_rule(raw, &chain)?;
                Ok(self.alloc(rule))
            })
            .collect()
    }

    fn build_rule(&mut self, raw: &RawRule, chain: &RepoChain) -> Result<Rule, GrammarError> {
        if let Some(reference) = &raw.include {
            return Ok(Rule::Include(IncludeRule {
                reference: reference.clone(),
                target: resolve_reference(reference, chain),
            }));
        }

        let display = raw.name.as_deref().unwrap_or("<unnamed>").to_string();

        if let Some(source) = &raw.match_pattern {
            let captures = self.build_captures(&raw.captures, chain)?;
            return Ok(Rule::Match(MatchRule {
                name: raw.name.as_deref().map(Scope::new),
                pattern: Arc::new(RegexPattern::new(
                    source.clone(),
                    format!("match of {}", display),
                )),
                captures,
            }));
        }

        if raw.begin.is_some() != raw.end.is_some() {
            return Err(GrammarError::UnpairedRange { rule: display });
        }

        let patterns = self.build_level(&raw.patterns, &raw.repository, chain)?;
        Ok(Rule::Scope(ScopeRule {
            name: raw.name.as_deref().map(Scope::new),
            content_name: raw.content_name.as_deref().map(Scope::new),
            begin: raw
                .begin
                .as_ref()
                .map(|s| Arc::new(RegexPattern::new(s.clone(), format!("begin of {}", display)))),
            end: raw
                .end
                .as_ref()
                .map(|s| Arc::new(RegexPattern::new(s.clone(), format!("end of {}", display)))),
            captures: self.build_captures(&raw.captures, chain)?,
            begin_captures: self.build_captures(&raw.begin_captures, chain)?,
            end_captures: self.build_captures(&raw.end_captures, chain)?,
            patterns,
        }))
    }

    fn build_captures(
        &mut self,
        raw: &BTreeMap<String, RawCapture>,
        chain: &RepoChain,
    ) -> Result<CapturesMap, GrammarError> {
        let mut captures = CapturesMap::new();
        for (key, attr) in raw {
            // Non-numeric keys occur in the wild; skip them like every
            // other TextMate implementation does.
            let Ok(index) = key.parse::<u32>() else {
                continue;
            };
            let patterns = if attr.patterns.is_empty() {
                Vec::new()
            } else {
                self.build_level(&attr.patterns, &HashMap::new(), chain)?
            };
            captures.insert(
                index,
                CaptureAttribute {
                    name: attr.name.as_deref().map(Scope::new),
                    patterns,
                },
            );
        }
        Ok(captures)
    }
}

fn resolve_reference(reference: &str, chain: &RepoChain) -> Option<RuleId> {
    match reference {
        "$self" | "$base" => Some(ROOT_RULE),
        _ => {
            let key = reference.strip_prefix('#')?;
            chain.iter().rev().find_map(|level| level.get(key)).copied()
        }
    }
}
