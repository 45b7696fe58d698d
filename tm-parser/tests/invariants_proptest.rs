//! Property-based tests for the engine invariants
//!
//! These run arbitrary printable lines through a representative grammar
//! (keywords, numbers, strings with escapes, nestable parens) and check
//! the structural guarantees the tokenizer makes regardless of input:
//! tokens partition the line, starts strictly increase, scope paths stay
//! rooted, and back-reference resolution is well-behaved.

use proptest::prelude::*;
use tm_parser::textmate::grammar::{load_from_json, Grammar};
use tm_parser::textmate::parsing::Token;
use tm_parser::textmate::regex::{resolve_backreferences, RegexPattern};
use tm_parser::textmate::Tokenizer;

fn sample_grammar() -> Grammar {
    load_from_json(
        r##"{
            "scopeName": "source.sample",
            "patterns": [
                { "match": "\\b(if|else|while)\\b", "name": "keyword" },
                { "match": "[0-9]+", "name": "number" },
                { "name": "string", "begin": "\"", "end": "\"",
                  "patterns": [ { "match": "\\\\.", "name": "escape" } ] },
                { "name": "paren", "begin": "\\(", "end": "\\)",
                  "patterns": [ { "include": "$self" } ] }
            ]
        }"##,
    )
    .unwrap()
}

/// Printable-ASCII lines, newline-free so each one is a single line
fn line_strategy() -> impl Strategy<Value = String> {
    "[ -~]{0,48}"
}

/// Lines biased towards the grammar's own delimiters, so ranges actually
/// open, nest and close instead of almost never appearing
fn delimiter_heavy_line_strategy() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            Just("\"".to_string()),
            Just("(".to_string()),
            Just(")".to_string()),
            Just("\\".to_string()),
            Just("if".to_string()),
            Just("42".to_string()),
            "[a-z ]{1,4}",
        ],
        0..16,
    )
    .prop_map(|parts| parts.concat())
}

fn check_partition(tokens: &[Token], line_len: usize) {
    let mut position = 0;
    for token in tokens {
        assert_eq!(token.span.start, position, "gap or overlap in {:?}", tokens);
        assert!(token.span.end > token.span.start, "empty token in {:?}", tokens);
        position = token.span.end;
    }
    assert_eq!(position, line_len, "line not fully covered by {:?}", tokens);
}

proptest! {
    #[test]
    fn tokens_partition_every_line(line in line_strategy()) {
        let grammar = sample_grammar();
        let tokenizer = Tokenizer::new(&grammar);
        let (tokens, _) = tokenizer.parse_line(&line, tokenizer.initial_state()).unwrap();
        check_partition(&tokens, line.len());
    }

    #[test]
    fn tokens_partition_delimiter_heavy_lines(line in delimiter_heavy_line_strategy()) {
        let grammar = sample_grammar();
        let tokenizer = Tokenizer::new(&grammar);
        let (tokens, _) = tokenizer.parse_line(&line, tokenizer.initial_state()).unwrap();
        check_partition(&tokens, line.len());
    }

    #[test]
    fn token_starts_strictly_increase(line in delimiter_heavy_line_strategy()) {
        let grammar = sample_grammar();
        let tokenizer = Tokenizer::new(&grammar);
        let (tokens, _) = tokenizer.parse_line(&line, tokenizer.initial_state()).unwrap();
        for pair in tokens.windows(2) {
            prop_assert!(pair[0].span.start < pair[1].span.start);
        }
    }

    #[test]
    fn multi_line_documents_tokenize_to_the_end(
        lines in proptest::collection::vec(delimiter_heavy_line_strategy(), 1..6)
    ) {
        let grammar = sample_grammar();
        let tokenizer = Tokenizer::new(&grammar);
        let text = lines.join("\n");
        let tokenized = tokenizer.tokenize(&text).unwrap();
        prop_assert_eq!(tokenized.len(), lines.len());
        for (tokens, line) in tokenized.iter().zip(&lines) {
            check_partition(tokens, line.len());
        }
    }

    #[test]
    fn parsing_the_same_line_twice_is_deterministic(line in delimiter_heavy_line_strategy()) {
        let grammar = sample_grammar();
        let tokenizer = Tokenizer::new(&grammar);
        let (first, _) = tokenizer.parse_line(&line, tokenizer.initial_state()).unwrap();
        let (second, _) = tokenizer.parse_line(&line, tokenizer.initial_state()).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn backreference_resolution_without_backrefs_is_identity(
        source in "[a-zA-Z0-9 .*+?()\\[\\]|]{0,24}"
    ) {
        let begin = RegexPattern::new("(x)", "test");
        let m = begin.search("x", 0..1).unwrap().unwrap();
        prop_assert_eq!(resolve_backreferences(&source, "x", &m), None);
    }

    #[test]
    fn backreference_resolution_is_deterministic(
        text in "[a-z]{1,8}"
    ) {
        let begin = RegexPattern::new("([a-z]+)", "test");
        let m = begin.search(&text, 0..text.len()).unwrap().unwrap();
        let first = resolve_backreferences(r"\1\z", &text, &m);
        let second = resolve_backreferences(r"\1\z", &text, &m);
        prop_assert_eq!(first.clone(), second);
        prop_assert_eq!(first, Some(format!("{}\\z", text)));
    }
}
