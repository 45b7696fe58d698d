//! Tokenizer entry points
//!
//! [`Tokenizer`] binds a grammar to the per-line engine. The line-level
//! call is the real interface: it takes the line's text and the state
//! stack left by the previous line, and returns the tokens plus the stack
//! to feed into the next line. `tokenize` is the document driver built on
//! top of it — split on newlines, thread the stack through.
//!
//! The grammar is read-only and can back any number of tokenizers (and
//! threads) at once; each state stack belongs to exactly one document.

use crate::textmate::grammar::Grammar;
use crate::textmate::parsing::line_parser::LineParser;
use crate::textmate::parsing::trace::TraceSink;
use crate::textmate::parsing::{ParseError, StateStack, Token};

pub struct Tokenizer<'g> {
    grammar: &'g Grammar,
}

impl<'g> Tokenizer<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Tokenizer { grammar }
    }

    /// The state a document starts in.
    pub fn initial_state(&self) -> StateStack {
        StateStack::root(self.grammar)
    }

    /// Parse one line (text without its terminator) against the inbound
    /// state, returning the tokens covering the line and the state to
    /// carry into the next one.
    ///
    /// On error the stack is lost with the parse: a partially-mutated
    /// stack must not be fed to another line.
    pub fn parse_line(
        &self,
        line: &str,
        stack: StateStack,
    ) -> Result<(Vec<Token>, StateStack), ParseError> {
        LineParser::new(self.grammar, line, stack, None).parse()
    }

    /// Like [`parse_line`], narrating every step into `sink`.
    ///
    /// [`parse_line`]: Tokenizer::parse_line
    pub fn parse_line_with_trace(
        &self,
        line: &str,
        stack: StateStack,
        sink: &mut dyn TraceSink,
    ) -> Result<(Vec<Token>, StateStack), ParseError> {
        LineParser::new(self.grammar, line, stack, Some(sink)).parse()
    }

    /// Tokenize a whole document: one token list per line, in order.
    pub fn tokenize(&self, text: &str) -> Result<Vec<Vec<Token>>, ParseError> {
        let mut stack = self.initial_state();
        let mut lines = Vec::new();
        for line in text.split('\n') {
            let (tokens, next) = self.parse_line(line, stack)?;
            lines.push(tokens);
            stack = next;
        }
        Ok(lines)
    }
}
