//! Parser state and the state stack
//!
//! One [`ParserState`] frame is the engine's position at one nesting level:
//! which patterns are live, which scope path applies, what terminates the
//! frame (an end pattern, a fixed end position, or nothing but the line),
//! and which capture anchors are still pending inside it.
//!
//! The stack is never empty: the root frame carries the grammar's
//! top-level patterns and an empty scope path. Between lines the stack is
//! moved, not copied — the document driver hands the stack left by line N
//! to the parser of line N+1.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::textmate::grammar::{Grammar, RuleId};
use crate::textmate::parsing::captures::CaptureAnchor;
use crate::textmate::regex::RegexPattern;
use crate::textmate::scope::{Scope, ScopePath};

/// Where a frame opened by a range rule stands in its lifecycle.
///
/// The `contentName` boundary and the deferred pop both need one
/// iteration of delay, which is what the phase records:
///
/// - `PushContent`: the begin match has been consumed; `contentName` (if
///   any) is appended on the next iteration, then the phase becomes
///   `Content`
/// - `Content`: the body is being parsed; the frame's end pattern is live
/// - `Pop`: the end match has been consumed; the frame is removed on the
///   next iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    PushContent(RuleId),
    Content(RuleId),
    Pop(RuleId),
}

/// One frame on the state stack
#[derive(Debug)]
pub struct ParserState {
    pub(crate) phase: Option<Phase>,
    /// Rules active at this level
    pub(crate) patterns: Vec<RuleId>,
    /// Pending sub-scoping anchors, ordered by start, consumed from the front
    pub(crate) capture_anchors: VecDeque<CaptureAnchor>,
    /// Scope path accumulated up to and including this frame
    pub(crate) scope_path: ScopePath,
    /// Regex terminating this frame, if it was opened by a range rule
    pub(crate) end_pattern: Option<Arc<RegexPattern>>,
    /// Upper bound within the current line, or `None` for unbounded
    pub(crate) end_position: Option<usize>,
}

/// Non-empty LIFO of parser states; the top frame is the current state.
#[derive(Debug)]
pub struct StateStack {
    frames: Vec<ParserState>,
}

impl StateStack {
    /// The stack a document starts with: a single root frame holding the
    /// grammar's top-level patterns and an empty scope path.
    pub fn root(grammar: &Grammar) -> Self {
        StateStack {
            frames: vec![ParserState {
                phase: None,
                patterns: grammar.root_patterns().to_vec(),
                capture_anchors: VecDeque::new(),
                scope_path: ScopePath::new(),
                end_pattern: None,
                end_position: None,
            }],
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Scope path of the current state (what an emitted token would carry)
    pub fn top_scopes(&self) -> &[Scope] {
        &self.top().scope_path
    }

    pub(crate) fn top(&self) -> &ParserState {
        self.frames
            .last()
            .expect("state stack invariant: never empty")
    }

    pub(crate) fn top_mut(&mut self) -> &mut ParserState {
        self.frames
            .last_mut()
            .expect("state stack invariant: never empty")
    }

    /// Push a frame, clamping its `end_position` so it never exceeds the
    /// bound of the frame below it.
    pub(crate) fn push(&mut self, mut state: ParserState) {
        if let (Some(new_end), Some(top_end)) = (state.end_position, self.top().end_position) {
            if new_end > top_end {
                state.end_position = Some(top_end);
            }
        }
        self.frames.push(state);
    }

    /// Pop the top frame. Refuses to pop the root (`None`): a pop request
    /// that reaches the root is a grammar-integrity violation the caller
    /// reports.
    pub(crate) fn pop(&mut self) -> Option<ParserState> {
        if self.frames.len() > 1 {
            self.frames.pop()
        } else {
            None
        }
    }

    #[cfg(test)]
    pub(crate) fn frames(&self) -> &[ParserState] {
        &self.frames
    }
}
