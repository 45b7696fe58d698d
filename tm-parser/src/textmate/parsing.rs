//! Per-line parsing: state stack, match planner, capture anchors, engine
//!
//! The modules here implement the line-at-a-time state machine:
//!
//! 1. [`state`] holds the parser state frames and the stack discipline
//! 2. [`plan`] enumerates the candidate regexes for the next search and
//!    runs the multi-pattern leftmost search
//! 3. [`captures`] builds the anchor tree that defers capture-group
//!    sub-scoping until the position reaches each capture
//! 4. [`line_parser`] drives one line: search, emit, push, pop
//! 5. [`trace`] is the diagnostic sink the engine narrates into
//!
//! The output type ([`Token`]) and the engine error ([`ParseError`]) live
//! here because every submodule touches them.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::textmate::regex::RegexError;
use crate::textmate::scope::ScopePath;

pub mod captures;
pub mod line_parser;
pub mod plan;
pub mod state;
pub mod trace;

pub use line_parser::LineParser;
pub use state::StateStack;

/// A tokenized run of text: a half-open byte range within one line and the
/// scope path in effect over it. Tokens never overlap and are emitted in
/// strictly increasing start order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub span: Range<usize>,
    pub scopes: ScopePath,
}

/// Errors that abort a line parse.
///
/// A state stack that went through a failed parse is left partially
/// mutated; callers must discard it rather than feed it to the next line.
#[derive(Debug)]
pub enum ParseError {
    /// Pattern compilation or searching failed
    Regex(RegexError),
    /// The grammar (or the engine's own bookkeeping) broke an invariant,
    /// e.g. an end match on a frame that no scope rule owns
    GrammarIntegrity(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Regex(e) => write!(f, "{}", e),
            ParseError::GrammarIntegrity(msg) => {
                write!(f, "grammar integrity violation: {}", msg)
            }
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Regex(e) => Some(e),
            ParseError::GrammarIntegrity(_) => None,
        }
    }
}

impl From<RegexError> for ParseError {
    fn from(e: RegexError) -> Self {
        ParseError::Regex(e)
    }
}
