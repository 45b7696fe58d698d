//! End-to-end tokenization scenarios for the per-line engine
//!
//! Each test loads a small grammar, runs one line (or a few) through the
//! tokenizer, and verifies the exact token spans and scope paths with
//! assert_tokens. The scenarios exercise every transition the engine has:
//! plain match rules, range entry/exit, contentName boundaries, capture
//! sub-scoping (flat, nested, and with inner patterns), back-reference
//! interpolation, zero-width matches, and the leftmost/tie-break rule.

use rstest::rstest;
use tm_parser::textmate::grammar::{load_from_json, Grammar};
use tm_parser::textmate::parsing::Token;
use tm_parser::textmate::testing::assert_tokens;
use tm_parser::textmate::Tokenizer;

fn grammar(json: &str) -> Grammar {
    load_from_json(json).unwrap()
}

fn parse_one(g: &Grammar, line: &str) -> Vec<Token> {
    let tokenizer = Tokenizer::new(g);
    let (tokens, _) = tokenizer.parse_line(line, tokenizer.initial_state()).unwrap();
    tokens
}

#[test]
fn test_match_rule_scopes_its_range() {
    let g = grammar(r##"{ "patterns": [ { "match": "foo", "name": "k" } ] }"##);
    let tokens = parse_one(&g, "xfoox");

    assert_tokens(&tokens)
        .count(3)
        .token(0, 0..1, &[])
        .token(1, 1..4, &["k"])
        .token(2, 4..5, &[])
        .covers(0..5);
}

#[test]
fn test_range_rule_scopes_delimiters_and_body() {
    let g = grammar(r##"{ "patterns": [ { "name": "s", "begin": "\"", "end": "\"" } ] }"##);
    let tokens = parse_one(&g, "a\"b\"c");

    assert_tokens(&tokens)
        .count(5)
        .token(0, 0..1, &[])
        .token(1, 1..2, &["s"])
        .token(2, 2..3, &["s"])
        .token(3, 3..4, &["s"])
        .token(4, 4..5, &[])
        .covers(0..5);
}

#[test]
fn test_content_name_covers_only_the_body() {
    let g = grammar(
        r##"{ "patterns": [ { "name": "s", "contentName": "c", "begin": "\"", "end": "\"" } ] }"##,
    );
    let tokens = parse_one(&g, "a\"b\"c");

    assert_tokens(&tokens)
        .count(5)
        .token(0, 0..1, &[])
        .token(1, 1..2, &["s"])
        .token(2, 2..3, &["s", "c"])
        .token(3, 3..4, &["s"])
        .token(4, 4..5, &[])
        .covers(0..5);
}

#[rstest]
#[case::single_quote("x'y'z")]
#[case::double_quote("x\"y\"z")]
fn test_backreferenced_end_closes_on_the_begin_delimiter(#[case] line: &str) {
    let g = grammar(
        r##"{ "patterns": [ { "name": "q", "begin": "([\"'])", "end": "\\1" } ] }"##,
    );
    let tokens = parse_one(&g, line);

    assert_tokens(&tokens)
        .count(5)
        .token(0, 0..1, &[])
        .token(1, 1..2, &["q"])
        .token(2, 2..3, &["q"])
        .token(3, 3..4, &["q"])
        .token(4, 4..5, &[])
        .covers(0..5);
}

#[test]
fn test_backreferenced_end_does_not_close_on_the_other_delimiter() {
    let g = grammar(
        r##"{ "patterns": [ { "name": "q", "begin": "([\"'])", "end": "\\1" } ] }"##,
    );
    // The string opens with ' so the " inside must not close it.
    let tokens = parse_one(&g, "'a\"b");

    assert_tokens(&tokens)
        .count(2)
        .token(0, 0..1, &["q"])
        .token(1, 1..4, &["q"])
        .covers(0..4);
}

#[test]
fn test_capture_scopes_split_the_match() {
    let g = grammar(
        r##"{
            "patterns": [
                { "match": "(a)(b)",
                  "captures": { "1": { "name": "x" }, "2": { "name": "y" } } }
            ]
        }"##,
    );
    let tokens = parse_one(&g, "ab");

    assert_tokens(&tokens)
        .count(2)
        .token(0, 0..1, &["x"])
        .token(1, 1..2, &["y"])
        .covers(0..2);
}

#[test]
fn test_leftmost_match_wins_with_plan_order_tie_break() {
    let g = grammar(
        r##"{
            "patterns": [
                { "match": "foo", "name": "first" },
                { "match": "foobar", "name": "second" }
            ]
        }"##,
    );
    let tokens = parse_one(&g, "foobar");

    assert_tokens(&tokens)
        .count(2)
        .token(0, 0..3, &["first"])
        .token(1, 3..6, &[])
        .covers(0..6);
}

#[test]
fn test_match_name_and_captures_compose() {
    let g = grammar(
        r##"{
            "patterns": [
                { "match": "(a)b(c)", "name": "m",
                  "captures": { "1": { "name": "x" }, "2": { "name": "y" } } }
            ]
        }"##,
    );
    let tokens = parse_one(&g, "abc");

    assert_tokens(&tokens)
        .count(3)
        .token(0, 0..1, &["m", "x"])
        .token(1, 1..2, &["m"])
        .token(2, 2..3, &["m", "y"])
        .covers(0..3);
}

#[test]
fn test_nested_capture_groups_nest_scopes() {
    let g = grammar(
        r##"{
            "patterns": [
                { "match": "((a)b)",
                  "captures": { "1": { "name": "outer" }, "2": { "name": "inner" } } }
            ]
        }"##,
    );
    let tokens = parse_one(&g, "ab");

    assert_tokens(&tokens)
        .count(2)
        .token(0, 0..1, &["outer", "inner"])
        .token(1, 1..2, &["outer"])
        .covers(0..2);
}

#[test]
fn test_capture_with_inner_patterns_retokenizes_the_capture() {
    let g = grammar(
        r##"{
            "patterns": [
                { "match": "(\\w+):",
                  "captures": {
                      "1": { "name": "word",
                             "patterns": [ { "match": "o", "name": "oh" } ] }
                  } }
            ]
        }"##,
    );
    let tokens = parse_one(&g, "foo:");

    assert_tokens(&tokens)
        .count(4)
        .token(0, 0..1, &["word"])
        .token(1, 1..2, &["word", "oh"])
        .token(2, 2..3, &["word", "oh"])
        .token(3, 3..4, &[])
        .covers(0..4);
}

#[test]
fn test_capture_patterns_cannot_match_past_the_capture() {
    // The inner rule would happily match `abcd`, but it runs inside the
    // capture's bounds and the search range stops at the capture end.
    let g = grammar(
        r##"{
            "patterns": [
                { "match": "(ab)cd",
                  "captures": {
                      "1": { "name": "head",
                             "patterns": [ { "match": "abcd", "name": "greedy" } ] }
                  } }
            ]
        }"##,
    );
    let tokens = parse_one(&g, "abcd");

    assert_tokens(&tokens)
        .count(2)
        .token(0, 0..2, &["head"])
        .token(1, 2..4, &[])
        .covers(0..4);
}

#[test]
fn test_begin_and_end_captures() {
    let g = grammar(
        r##"{
            "patterns": [
                { "name": "s", "begin": "\"", "end": "\"",
                  "beginCaptures": { "0": { "name": "open" } },
                  "endCaptures": { "0": { "name": "close" } } }
            ]
        }"##,
    );
    let tokens = parse_one(&g, "a\"b\"c");

    assert_tokens(&tokens)
        .count(5)
        .token(0, 0..1, &[])
        .token(1, 1..2, &["s", "open"])
        .token(2, 2..3, &["s"])
        .token(3, 3..4, &["s", "close"])
        .token(4, 4..5, &[])
        .covers(0..5);
}

#[test]
fn test_inner_rule_takes_precedence_inside_a_range() {
    let g = grammar(
        r##"{
            "patterns": [
                { "name": "s", "begin": "\"", "end": "\"",
                  "patterns": [ { "match": "\\\\.", "name": "esc" } ] }
            ]
        }"##,
    );
    let tokens = parse_one(&g, "\"a\\\"b\"");

    assert_tokens(&tokens)
        .count(5)
        .token(0, 0..1, &["s"])
        .token(1, 1..2, &["s"])
        .token(2, 2..4, &["s", "esc"])
        .token(3, 4..5, &["s"])
        .token(4, 5..6, &["s"])
        .covers(0..6);
}

#[test]
fn test_nested_ranges_unwind_in_order() {
    let g = grammar(
        r##"{
            "patterns": [
                { "name": "p", "begin": "\\(", "end": "\\)",
                  "patterns": [ { "include": "$self" } ] }
            ]
        }"##,
    );
    let tokens = parse_one(&g, "((x))");

    assert_tokens(&tokens)
        .count(5)
        .token(0, 0..1, &["p"])
        .token(1, 1..2, &["p", "p"])
        .token(2, 2..3, &["p", "p"])
        .token(3, 3..4, &["p", "p"])
        .token(4, 4..5, &["p"])
        .covers(0..5);
}

#[test]
fn test_group_rule_patterns_are_inlined() {
    let g = grammar(
        r##"{
            "patterns": [
                { "patterns": [
                    { "match": "a", "name": "x" },
                    { "match": "b", "name": "y" }
                ] }
            ]
        }"##,
    );
    let tokens = parse_one(&g, "ab");

    assert_tokens(&tokens)
        .count(2)
        .token(0, 0..1, &["x"])
        .token(1, 1..2, &["y"])
        .covers(0..2);
}

#[test]
fn test_zero_width_match_transitions_without_a_token() {
    let g = grammar(r##"{ "patterns": [ { "match": "(?=x)", "name": "z" } ] }"##);
    let tokens = parse_one(&g, "ax");

    // The lookahead fires at position 1 but emits nothing, and the line
    // still terminates.
    assert_tokens(&tokens)
        .count(2)
        .token(0, 0..1, &[])
        .token(1, 1..2, &[])
        .covers(0..2);
}

#[test]
fn test_zero_width_begin_and_end_terminate() {
    // Empty begin and empty end: the rule gets exactly one push/pop cycle
    // at position 0 and the rest of the line tokenizes normally.
    let g = grammar(r##"{ "patterns": [ { "name": "q", "begin": "", "end": "" } ] }"##);
    let tokens = parse_one(&g, "ab");

    assert_tokens(&tokens).count(1).token(0, 0..2, &[]).covers(0..2);
}

#[test]
fn test_unresolved_include_is_skipped() {
    let g = grammar(
        r##"{
            "patterns": [
                { "include": "source.elsewhere" },
                { "match": "a", "name": "x" }
            ]
        }"##,
    );
    let tokens = parse_one(&g, "a");

    assert_tokens(&tokens).count(1).token(0, 0..1, &["x"]);
}

#[test]
fn test_empty_line_produces_no_tokens() {
    let g = grammar(r##"{ "patterns": [ { "match": "a", "name": "x" } ] }"##);
    let tokens = parse_one(&g, "");
    assert_tokens(&tokens).count(0);
}

#[test]
fn test_multi_line_string_with_backreference() {
    let g = grammar(
        r##"{ "patterns": [ { "name": "q", "begin": "(['\"])", "end": "\\1" } ] }"##,
    );
    let tokenizer = Tokenizer::new(&g);
    let lines = tokenizer.tokenize("a'b\ncd'e").unwrap();

    assert_tokens(&lines[0])
        .count(3)
        .token(0, 0..1, &[])
        .token(1, 1..2, &["q"])
        .token(2, 2..3, &["q"])
        .covers(0..3);
    // The resolved end pattern survives the line break on the stack.
    assert_tokens(&lines[1])
        .count(3)
        .token(0, 0..2, &["q"])
        .token(1, 2..3, &["q"])
        .token(2, 3..4, &[])
        .covers(0..4);
}

#[test]
fn test_invalid_match_pattern_surfaces_a_compile_error() {
    let g = grammar(r##"{ "patterns": [ { "match": "(oops" } ] }"##);
    let tokenizer = Tokenizer::new(&g);
    let err = tokenizer
        .parse_line("x", tokenizer.initial_state())
        .unwrap_err();
    assert!(err.to_string().contains("invalid pattern"));
}
