//! The per-line engine
//!
//! This is the state machine that drives one source line against the
//! active rule set:
//!
//! 1. Resolve the top frame's phase (apply `contentName`, or finish a
//!    deferred pop)
//! 2. Drop capture anchors the position has moved past
//! 3. Work out how far the next search may look: up to the next pending
//!    capture anchor, the frame's end position, or the end of the line
//! 4. Run the multi-pattern leftmost search over the collected plans
//! 5. No match: emit the remaining run, then enter the anchor, pop the
//!    exhausted frame, or finish the line
//! 6. Match: emit the run before it, then fire the winning plan (match
//!    rule, begin rule, or the frame's end pattern)
//!
//! Tokens carry the scope path at the moment their range is closed, which
//! is always the current top frame's path: text runs are emitted before
//! any new frame is pushed.
//!
//! Zero-width matches transition state but emit nothing, and a rule gets
//! at most one zero-width transition per position — the search skips a
//! plan that asks for a second one, which is what keeps degenerate
//! grammars (empty begin and end, for instance) from spinning in place.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::textmate::grammar::{Grammar, Rule, RuleId, ScopeRule};
use crate::textmate::parsing::captures::{build_anchor_tree, CaptureAnchor};
use crate::textmate::parsing::plan::{collect_match_plans, leftmost_match, MatchPlan, PlanKind};
use crate::textmate::parsing::state::{ParserState, Phase, StateStack};
use crate::textmate::parsing::trace::TraceSink;
use crate::textmate::parsing::{ParseError, Token};
use crate::textmate::regex::{resolve_backreferences, MatchRegion, RegexPattern};

/// Upper bound of the next search, in precedence order: the earliest
/// pending capture anchor, then the frame's end position, then the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchEnd {
    Anchor(usize),
    EndPosition(usize),
    Line(usize),
}

impl SearchEnd {
    fn position(self) -> usize {
        match self {
            SearchEnd::Anchor(p) | SearchEnd::EndPosition(p) | SearchEnd::Line(p) => p,
        }
    }
}

/// Identity of a plan for the zero-width ledger. End patterns are keyed by
/// stack depth: after the frame pops, the parent's end pattern is a
/// different plan and may take its own zero-width transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlanKey {
    Rule(RuleId),
    End(usize),
}

/// Remembers which plans already made a zero-width transition at the
/// current position; reset whenever the position moves.
#[derive(Debug, Default)]
struct ZeroWidthLedger {
    position: usize,
    keys: Vec<PlanKey>,
}

impl ZeroWidthLedger {
    fn record(&mut self, position: usize, key: PlanKey) {
        if self.position != position {
            self.position = position;
            self.keys.clear();
        }
        if !self.keys.contains(&key) {
            self.keys.push(key);
        }
    }

    fn contains(&self, position: usize, key: PlanKey) -> bool {
        self.position == position && self.keys.contains(&key)
    }
}

/// Parses one line against a grammar, consuming and returning the state
/// stack. Construct with the stack left behind by the previous line (or
/// [`StateStack::root`] for the first one) and call [`parse`].
///
/// [`parse`]: LineParser::parse
pub struct LineParser<'a> {
    grammar: &'a Grammar,
    line: &'a str,
    line_end: usize,
    position: usize,
    stack: StateStack,
    tokens: Vec<Token>,
    trace: Option<&'a mut dyn TraceSink>,
    zero_width: ZeroWidthLedger,
}

impl<'a> LineParser<'a> {
    pub fn new(
        grammar: &'a Grammar,
        line: &'a str,
        stack: StateStack,
        trace: Option<&'a mut dyn TraceSink>,
    ) -> Self {
        LineParser {
            grammar,
            line,
            line_end: line.len(),
            position: 0,
            stack,
            tokens: Vec::new(),
            trace,
            zero_width: ZeroWidthLedger::default(),
        }
    }

    /// Run the line to its end.
    ///
    /// On error the stack was left mid-transition and must not be reused.
    pub fn parse(mut self) -> Result<(Vec<Token>, StateStack), ParseError> {
        loop {
            match self.stack.top().phase {
                Some(Phase::PushContent(rule_id)) => {
                    let rule = scope_rule(self.grammar, rule_id)?;
                    if let Some(content_name) = rule.content_name.clone() {
                        self.trace_line("apply contentName");
                        self.stack.top_mut().scope_path.push(content_name);
                    }
                    self.stack.top_mut().phase = Some(Phase::Content(rule_id));
                }
                Some(Phase::Pop(_)) => {
                    self.trace_line("pop state");
                    self.pop_frame()?;
                    continue;
                }
                Some(Phase::Content(_)) | None => {}
            }

            let search_end = self.compute_search_end();
            let plans = collect_match_plans(self.grammar, self.stack.top());

            if self.trace.is_some() {
                self.trace_line(&format!("match plans, position {}", self.position));
                let count = plans.len();
                for (index, plan) in plans.iter().enumerate() {
                    self.trace_line(&format!("[{}/{}]{}", index + 1, count, plan));
                }
            }

            match self.search_plans(&plans, search_end.position())? {
                None => {
                    self.emit_up_to(search_end.position());
                    self.position = search_end.position();
                    match search_end {
                        SearchEnd::Anchor(_) => self.enter_front_anchor()?,
                        SearchEnd::EndPosition(_) => {
                            self.trace_line("pop");
                            self.pop_frame()?;
                        }
                        SearchEnd::Line(_) => {
                            self.trace_line("no match, end line");
                            self.drop_leftover_anchors();
                            return Ok((self.tokens, self.stack));
                        }
                    }
                }
                Some((index, matched)) => {
                    self.trace_line(&format!("match!: {}", plans[index]));
                    self.emit_up_to(matched.start());
                    self.position = matched.start();
                    if matched.is_empty() {
                        let key = self.plan_key(&plans[index]);
                        self.zero_width.record(self.position, key);
                    }
                    match plans[index].kind {
                        PlanKind::MatchRule(id) => self.apply_match_rule(id, &matched)?,
                        PlanKind::BeginRule(id) => self.apply_begin_rule(id, &matched)?,
                        PlanKind::EndPattern => self.apply_end_pattern(&matched)?,
                    }
                }
            }
        }
    }

    /// Leftmost search over the plans, skipping any plan that wants a
    /// second zero-width transition at the same position.
    fn search_plans(
        &self,
        plans: &[MatchPlan],
        search_end: usize,
    ) -> Result<Option<(usize, MatchRegion)>, ParseError> {
        let range = self.position..search_end;
        let mut excluded: Vec<usize> = Vec::new();
        loop {
            match leftmost_match(self.line, range.clone(), plans, &excluded)? {
                Some((index, m))
                    if m.is_empty()
                        && self.zero_width.contains(m.start(), self.plan_key(&plans[index])) =>
                {
                    excluded.push(index);
                }
                other => return Ok(other),
            }
        }
    }

    fn plan_key(&self, plan: &MatchPlan) -> PlanKey {
        match plan.kind {
            PlanKind::MatchRule(id) | PlanKind::BeginRule(id) => PlanKey::Rule(id),
            PlanKind::EndPattern => PlanKey::End(self.stack.depth()),
        }
    }

    /// Drop anchors behind the position, then pick the search bound.
    fn compute_search_end(&mut self) -> SearchEnd {
        let position = self.position;
        let top = self.stack.top_mut();

        while top
            .capture_anchors
            .front()
            .map_or(false, |a| a.range.start < position)
        {
            top.capture_anchors.pop_front();
        }

        if let Some(front) = top.capture_anchors.front() {
            if top.end_position.map_or(true, |p| front.range.end <= p) {
                return SearchEnd::Anchor(front.range.start);
            }
        }
        match top.end_position {
            Some(p) => SearchEnd::EndPosition(p),
            None => SearchEnd::Line(self.line_end),
        }
    }

    /// Emit a token for `[position, end)` under the current scope path.
    /// Empty runs produce nothing.
    fn emit_up_to(&mut self, end: usize) {
        if end > self.position {
            self.tokens.push(Token {
                span: self.position..end,
                scopes: self.stack.top().scope_path.clone(),
            });
        }
    }

    fn apply_match_rule(&mut self, id: RuleId, matched: &MatchRegion) -> Result<(), ParseError> {
        let rule = match self.grammar.rule(id) {
            Rule::Match(rule) => rule,
            _ => {
                return Err(ParseError::GrammarIntegrity(
                    "match plan points at a rule that is not a match rule".to_string(),
                ))
            }
        };

        let mut scope_path = self.stack.top().scope_path.clone();
        if let Some(name) = &rule.name {
            scope_path.push(name.clone());
        }

        let anchor = build_anchor_tree(matched, &rule.captures);
        let mut capture_anchors = VecDeque::new();
        let has_anchor = anchor.is_some();
        if let Some(anchor) = anchor {
            capture_anchors.push_back(anchor);
        }

        self.trace_line("push state");
        self.stack.push(ParserState {
            phase: None,
            patterns: Vec::new(),
            capture_anchors,
            scope_path,
            end_pattern: None,
            end_position: Some(matched.end()),
        });
        if has_anchor {
            self.enter_front_anchor()?;
        }
        Ok(())
    }

    fn apply_begin_rule(&mut self, id: RuleId, matched: &MatchRegion) -> Result<(), ParseError> {
        let rule = scope_rule(self.grammar, id)?;
        let end = rule.end.as_ref().ok_or_else(|| {
            ParseError::GrammarIntegrity("begin plan on a scope rule without an end".to_string())
        })?;

        let mut scope_path = self.stack.top().scope_path.clone();
        if let Some(name) = &rule.name {
            scope_path.push(name.clone());
        }

        // Interpolate the begin captures into the end source. When nothing
        // was substituted the rule's own pattern value is reused, so its
        // compile cache keeps working across lines and matches.
        let end_pattern = match resolve_backreferences(end.source(), self.line, matched) {
            Some(resolved) => Arc::new(RegexPattern::new(
                resolved,
                format!("{} (resolved)", end.origin()),
            )),
            None => Arc::clone(end),
        };

        let anchor = build_anchor_tree(matched, rule.captures_for_begin());

        self.trace_line("push state");
        self.stack.push(ParserState {
            phase: Some(Phase::PushContent(id)),
            patterns: rule.patterns.clone(),
            capture_anchors: VecDeque::new(),
            scope_path,
            end_pattern: Some(end_pattern),
            end_position: None,
        });
        if let Some(anchor) = anchor {
            self.push_anchor_state(anchor);
        }
        Ok(())
    }

    fn apply_end_pattern(&mut self, matched: &MatchRegion) -> Result<(), ParseError> {
        let rule_id = match self.stack.top().phase {
            Some(Phase::Content(id)) => id,
            _ => {
                return Err(ParseError::GrammarIntegrity(
                    "end pattern matched on a frame no scope rule owns".to_string(),
                ))
            }
        };
        let rule = scope_rule(self.grammar, rule_id)?;

        if let Some(content_name) = &rule.content_name {
            let popped = self.stack.top_mut().scope_path.pop();
            if popped.as_ref() != Some(content_name) {
                return Err(ParseError::GrammarIntegrity(format!(
                    "expected contentName `{}` at the top of the scope path",
                    content_name
                )));
            }
        }

        // The frame survives one more iteration so the end anchor (pushed
        // below) tokenizes the end match inside it.
        self.stack.top_mut().phase = Some(Phase::Pop(rule_id));

        if let Some(anchor) = build_anchor_tree(matched, rule.captures_for_end()) {
            self.push_anchor_state(anchor);
        }
        Ok(())
    }

    /// Take the earliest pending anchor of the top frame and enter it.
    fn enter_front_anchor(&mut self) -> Result<(), ParseError> {
        let anchor = self
            .stack
            .top_mut()
            .capture_anchors
            .pop_front()
            .ok_or_else(|| {
                ParseError::GrammarIntegrity(
                    "anchor transition without a pending anchor".to_string(),
                )
            })?;
        self.push_anchor_state(anchor);
        Ok(())
    }

    /// Push the frame for one capture anchor: its attribute's patterns and
    /// scope, its children as the pending anchors, bounded by its range.
    fn push_anchor_state(&mut self, anchor: CaptureAnchor) {
        let mut scope_path = self.stack.top().scope_path.clone();
        let (patterns, name) = match anchor.attribute {
            Some(attribute) => (attribute.patterns, attribute.name),
            None => (Vec::new(), None),
        };
        if let Some(name) = name {
            scope_path.push(name);
        }

        self.trace_line("push state: anchor");
        self.stack.push(ParserState {
            phase: None,
            patterns,
            capture_anchors: anchor.children.into(),
            scope_path,
            end_pattern: None,
            end_position: Some(anchor.range.end),
        });
    }

    fn pop_frame(&mut self) -> Result<(), ParseError> {
        self.stack.pop().map(|_| ()).ok_or_else(|| {
            ParseError::GrammarIntegrity("attempted to pop the root state".to_string())
        })
    }

    /// A grammar should never leave anchors pending at the end of a line;
    /// if one does, dropping them is recoverable where aborting is not.
    fn drop_leftover_anchors(&mut self) {
        let top = self.stack.top_mut();
        if !top.capture_anchors.is_empty() {
            log::warn!(
                "{} capture anchor(s) pending at end of line; dropping",
                top.capture_anchors.len()
            );
            top.capture_anchors.clear();
        }
    }

    fn trace_line(&mut self, text: &str) {
        if let Some(sink) = self.trace.as_mut() {
            sink.line(text);
        }
    }
}

fn scope_rule(grammar: &Grammar, id: RuleId) -> Result<&ScopeRule, ParseError> {
    match grammar.rule(id) {
        Rule::Scope(rule) => Ok(rule),
        _ => Err(ParseError::GrammarIntegrity(format!(
            "rule {} is not a scope rule",
            id.as_index()
        ))),
    }
}
