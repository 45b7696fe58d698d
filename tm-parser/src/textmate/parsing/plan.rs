//! Match planning and the multi-pattern leftmost search
//!
//! Before each search the engine flattens the current state into an
//! ordered list of *match plans*: the frame's end pattern first (when it
//! has one), then every rule reachable from the frame's patterns with
//! group rules inlined and include rules resolved. The order only matters
//! as a tie-break — when two plans match at the same offset, the earlier
//! plan wins.
//!
//! Plan collection does not descend into range rules (their bodies only
//! become relevant after their begin anchor fires), so it terminates on
//! any grammar; a visited set guards against include/group cycles on top
//! of that.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use crate::textmate::grammar::{Grammar, Rule, RuleId};
use crate::textmate::parsing::state::ParserState;
use crate::textmate::regex::{MatchRegion, RegexError, RegexPattern};

/// What a plan does when it wins the search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanKind {
    /// Fire a match rule
    MatchRule(RuleId),
    /// Enter a range rule via its begin anchor
    BeginRule(RuleId),
    /// Close the current frame via its end pattern
    EndPattern,
}

/// One candidate for the next search
#[derive(Debug, Clone)]
pub struct MatchPlan {
    pub kind: PlanKind,
    pub pattern: Arc<RegexPattern>,
}

impl fmt::Display for MatchPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.kind {
            PlanKind::MatchRule(_) => "match",
            PlanKind::BeginRule(_) => "begin",
            PlanKind::EndPattern => "end",
        };
        write!(f, "{} /{}/", verb, self.pattern.source())
    }
}

/// Enumerate the candidate plans for the current frame, in tie-break order.
pub fn collect_match_plans(grammar: &Grammar, state: &ParserState) -> Vec<MatchPlan> {
    let mut plans = Vec::new();

    if let Some(end) = &state.end_pattern {
        plans.push(MatchPlan {
            kind: PlanKind::EndPattern,
            pattern: Arc::clone(end),
        });
    }

    let mut visited = Vec::new();
    expand_patterns(grammar, &state.patterns, &mut visited, &mut plans);
    plans
}

fn expand_patterns(
    grammar: &Grammar,
    patterns: &[RuleId],
    visited: &mut Vec<RuleId>,
    plans: &mut Vec<MatchPlan>,
) {
    for &id in patterns {
        expand_rule(grammar, id, visited, plans);
    }
}

fn expand_rule(grammar: &Grammar, id: RuleId, visited: &mut Vec<RuleId>, plans: &mut Vec<MatchPlan>) {
    // `visited` is the recursion stack, not a seen-set: a rule reached
    // twice along different paths is yielded twice (order is a tie-break,
    // so repeats are harmless), only cycles are cut.
    match grammar.rule(id) {
        Rule::Include(include) => {
            if let Some(target) = grammar.resolve_include(include) {
                if !visited.contains(&target) {
                    visited.push(target);
                    expand_rule(grammar, target, visited, plans);
                    visited.pop();
                }
            }
        }
        Rule::Match(rule) => plans.push(MatchPlan {
            kind: PlanKind::MatchRule(id),
            pattern: Arc::clone(&rule.pattern),
        }),
        Rule::Scope(rule) => match &rule.begin {
            Some(begin) => plans.push(MatchPlan {
                kind: PlanKind::BeginRule(id),
                pattern: Arc::clone(begin),
            }),
            None => {
                if !visited.contains(&id) {
                    visited.push(id);
                    expand_patterns(grammar, &rule.patterns, visited, plans);
                    visited.pop();
                }
            }
        },
    }
}

/// Run every plan against `line[range]` and return the one matching at the
/// smallest start offset, earliest plan winning ties, together with its
/// match. Plans whose index is in `excluded` are skipped. `None` when
/// nothing matches.
pub fn leftmost_match(
    line: &str,
    range: Range<usize>,
    plans: &[MatchPlan],
    excluded: &[usize],
) -> Result<Option<(usize, MatchRegion)>, RegexError> {
    let mut best: Option<(usize, MatchRegion)> = None;

    for (index, plan) in plans.iter().enumerate() {
        if excluded.contains(&index) {
            continue;
        }
        if let Some(found) = plan.pattern.search(line, range.clone())? {
            let better = match &best {
                Some((_, current)) => found.start() < current.start(),
                None => true,
            };
            if better {
                let at_start = found.start() == range.start;
                best = Some((index, found));
                // Nothing can beat a match at the range start; later plans
                // lose the tie-break anyway.
                if at_start {
                    break;
                }
            }
        }
    }

    Ok(best)
}
