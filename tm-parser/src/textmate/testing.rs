//! Assertion helpers for token streams
//!
//! The integration tests verify tokenizer output structurally: exact
//! spans, exact scope paths, and the partition property over a whole
//! line. The fluent helper here keeps those assertions readable:
//!
//! ```ignore
//! assert_tokens(&tokens)
//!     .count(3)
//!     .token(0, 0..1, &[])
//!     .token(1, 1..4, &["k"])
//!     .token(2, 4..5, &[])
//!     .covers(0..5);
//! ```

use std::ops::Range;

use crate::textmate::parsing::Token;

/// Entry point: wrap a token slice for fluent assertions.
pub fn assert_tokens(tokens: &[Token]) -> TokenAssertions<'_> {
    TokenAssertions { tokens }
}

pub struct TokenAssertions<'a> {
    tokens: &'a [Token],
}

impl<'a> TokenAssertions<'a> {
    #[track_caller]
    pub fn count(self, expected: usize) -> Self {
        assert_eq!(
            self.tokens.len(),
            expected,
            "expected {} tokens, got {}: {:?}",
            expected,
            self.tokens.len(),
            self.tokens
        );
        self
    }

    /// Assert one token's span and full scope path.
    #[track_caller]
    pub fn token(self, index: usize, span: Range<usize>, scopes: &[&str]) -> Self {
        let token = self
            .tokens
            .get(index)
            .unwrap_or_else(|| panic!("no token at index {} in {:?}", index, self.tokens));
        assert_eq!(token.span, span, "span of token {}: {:?}", index, token);
        let actual: Vec<&str> = token.scopes.iter().map(|s| s.as_str()).collect();
        assert_eq!(actual, scopes, "scopes of token {}: {:?}", index, token);
        self
    }

    /// Assert the tokens partition `range`: contiguous, non-overlapping,
    /// first starting and last ending at the bounds.
    #[track_caller]
    pub fn covers(self, range: Range<usize>) -> Self {
        let mut position = range.start;
        for (index, token) in self.tokens.iter().enumerate() {
            assert_eq!(
                token.span.start, position,
                "gap or overlap before token {}: {:?}",
                index, self.tokens
            );
            assert!(
                token.span.end > token.span.start,
                "empty token {}: {:?}",
                index,
                token
            );
            position = token.span.end;
        }
        assert_eq!(position, range.end, "tokens stop short of {:?}", range);
        self
    }
}
