//! Grammar model: the immutable rule tree the engine walks
//!
//! A grammar is a flat arena of rules referenced by [`RuleId`]; nesting and
//! repository references are edges between ids, so cyclic grammars (a
//! repository item including a context that includes itself) cost nothing
//! to represent and resolution is a plain index lookup.
//!
//! Rules come in three shapes:
//!
//! - *Match rule*: one regex, fires and is done
//! - *Scope rule*: either a range rule (`begin` + `end`, both present) that
//!   opens a nested region, or a group rule (neither) whose `patterns` are
//!   inlined where it appears
//! - *Include rule*: a symbolic reference (`#name`, `$self`), resolved once
//!   at build time; an unresolvable reference stays in the tree but
//!   contributes nothing when plans are collected
//!
//! Loading from the TextMate JSON form lives in [`loader`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::textmate::regex::RegexPattern;
use crate::textmate::scope::Scope;

pub mod loader;

pub use loader::load_from_json;

/// Index of a rule in the grammar's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleId(pub(crate) u32);

impl RuleId {
    pub fn as_index(self) -> usize {
        self.0 as usize
    }
}

/// Attribute attached to one capture group: a scope to apply over the
/// captured range and/or patterns to run inside it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureAttribute {
    pub name: Option<Scope>,
    pub patterns: Vec<RuleId>,
}

/// Capture-index to attribute mapping; key `0` is the whole match.
pub type CapturesMap = BTreeMap<u32, CaptureAttribute>;

/// A rule with a single regex; fires, scopes its match, and is done.
#[derive(Debug)]
pub struct MatchRule {
    pub name: Option<Scope>,
    pub pattern: Arc<RegexPattern>,
    pub captures: CapturesMap,
}

/// A scope rule: a range rule when `begin`/`end` are present, otherwise a
/// group rule whose `patterns` are inlined at plan-collection time.
#[derive(Debug)]
pub struct ScopeRule {
    pub name: Option<Scope>,
    pub content_name: Option<Scope>,
    pub begin: Option<Arc<RegexPattern>>,
    pub end: Option<Arc<RegexPattern>>,
    pub captures: CapturesMap,
    pub begin_captures: CapturesMap,
    pub end_captures: CapturesMap,
    pub patterns: Vec<RuleId>,
}

impl ScopeRule {
    /// Range rules open a nested region; group rules are inlined.
    pub fn is_range(&self) -> bool {
        self.begin.is_some()
    }

    /// Captures applied to the begin match (`beginCaptures`, falling back
    /// to the shared `captures` table as TextMate grammars expect).
    pub fn captures_for_begin(&self) -> &CapturesMap {
        if self.begin_captures.is_empty() {
            &self.captures
        } else {
            &self.begin_captures
        }
    }

    /// Captures applied to the end match (`endCaptures` or `captures`).
    pub fn captures_for_end(&self) -> &CapturesMap {
        if self.end_captures.is_empty() {
            &self.captures
        } else {
            &self.end_captures
        }
    }
}

/// A symbolic reference to another rule, resolved at grammar build time.
#[derive(Debug)]
pub struct IncludeRule {
    pub reference: String,
    pub target: Option<RuleId>,
}

/// The three rule shapes
#[derive(Debug)]
pub enum Rule {
    Match(MatchRule),
    Scope(ScopeRule),
    Include(IncludeRule),
}

/// An immutable, shareable rule tree.
///
/// Rule 0 is a synthetic group rule holding the grammar's top-level
/// `patterns`; `$self` includes resolve to it.
#[derive(Debug)]
pub struct Grammar {
    scope_name: Option<Scope>,
    rules: Vec<Rule>,
}

pub(crate) const ROOT_RULE: RuleId = RuleId(0);

impl Grammar {
    pub(crate) fn new(scope_name: Option<Scope>, rules: Vec<Rule>) -> Self {
        Grammar { scope_name, rules }
    }

    /// The grammar's declared root scope (`scopeName`), if any
    pub fn scope_name(&self) -> Option<&Scope> {
        self.scope_name.as_ref()
    }

    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.as_index()]
    }

    /// The grammar's top-level patterns (what the root frame starts with)
    pub fn root_patterns(&self) -> &[RuleId] {
        match self.rule(ROOT_RULE) {
            Rule::Scope(scope) => &scope.patterns,
            _ => &[],
        }
    }

    /// Follow an include reference. `None` for references the grammar
    /// could not resolve (external grammars, missing repository keys);
    /// those are tolerated and contribute nothing.
    pub fn resolve_include(&self, include: &IncludeRule) -> Option<RuleId> {
        include.target
    }
}

/// Errors raised while building a grammar
#[derive(Debug)]
pub enum GrammarError {
    /// The JSON document does not have the grammar shape
    Json(serde_json::Error),
    /// A scope rule with `begin` but no `end`, or the reverse
    UnpairedRange { rule: String },
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarError::Json(e) => write!(f, "grammar is not valid JSON: {}", e),
            GrammarError::UnpairedRange { rule } => {
                write!(f, "rule {} has `begin` without `end` (or the reverse)", rule)
            }
        }
    }
}

impl std::error::Error for GrammarError {}

impl From<serde_json::Error> for GrammarError {
    fn from(e: serde_json::Error) -> Self {
        GrammarError::Json(e)
    }
}
