//! Command-line interface for the TextMate tokenizer
//! This binary tokenizes a source file against a JSON grammar and prints
//! the scope-annotated tokens, either human-readable or as JSON.
//!
//! Usage:
//!   tm `<path>` --grammar `<grammar.json>` [--format `<format>`] [--trace]

use clap::{Arg, ArgAction, Command};
use tm_parser::textmate::grammar::load_from_json;
use tm_parser::textmate::parsing::trace::TraceSink;
use tm_parser::textmate::{StateStack, Token, Tokenizer};

fn main() {
    env_logger::init();

    let matches = Command::new("tm")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Tokenize a file with a TextMate grammar")
        .arg_required_else_help(true)
        .arg(
            Arg::new("path")
                .help("Path to the file to tokenize")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("grammar")
                .long("grammar")
                .short('g')
                .help("Path to the grammar (TextMate JSON)")
                .required(true),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .short('f')
                .help("Output format: plain or json")
                .default_value("plain"),
        )
        .arg(
            Arg::new("trace")
                .long("trace")
                .help("Narrate every engine step to stderr")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let path = matches
        .get_one::<String>("path")
        .expect("path is a required argument");
    let grammar_path = matches
        .get_one::<String>("grammar")
        .expect("grammar is a required argument");
    let format = matches.get_one::<String>("format").expect("has a default");
    let trace = matches.get_flag("trace");

    let grammar_json = read_or_exit(grammar_path);
    let source = read_or_exit(path);

    let grammar = load_from_json(&grammar_json).unwrap_or_else(|e| {
        eprintln!("Grammar error: {}", e);
        std::process::exit(1);
    });

    let tokenizer = Tokenizer::new(&grammar);
    let lines = tokenize_lines(&tokenizer, &source, trace).unwrap_or_else(|e| {
        eprintln!("Tokenization error: {}", e);
        std::process::exit(1);
    });

    match format.as_str() {
        "plain" => print_plain(&lines, &source),
        "json" => {
            let json = serde_json::to_string_pretty(&lines).unwrap_or_else(|e| {
                eprintln!("Error formatting tokens: {}", e);
                std::process::exit(1);
            });
            println!("{}", json);
        }
        other => {
            eprintln!("Format '{}' not supported", other);
            eprintln!("Available formats: plain, json");
            std::process::exit(1);
        }
    }
}

/// Trace sink that narrates onto stderr, prefixed per line so engine
/// output is easy to separate from the token listing on stdout.
struct StderrTrace {
    line_number: usize,
}

impl TraceSink for StderrTrace {
    fn line(&mut self, text: &str) {
        eprintln!("[line {}] {}", self.line_number, text);
    }
}

fn tokenize_lines(
    tokenizer: &Tokenizer,
    source: &str,
    trace: bool,
) -> Result<Vec<Vec<Token>>, tm_parser::textmate::ParseError> {
    let mut stack: StateStack = tokenizer.initial_state();
    let mut lines = Vec::new();

    for (index, line) in source.split('\n').enumerate() {
        let (tokens, next) = if trace {
            let mut sink = StderrTrace {
                line_number: index + 1,
            };
            tokenizer.parse_line_with_trace(line, stack, &mut sink)?
        } else {
            tokenizer.parse_line(line, stack)?
        };
        lines.push(tokens);
        stack = next;
    }

    Ok(lines)
}

fn print_plain(lines: &[Vec<Token>], source: &str) {
    for ((number, tokens), text) in (1..).zip(lines).zip(source.split('\n')) {
        println!("line {}: {}", number, text);
        for token in tokens {
            let scopes = token
                .scopes
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            println!(
                "  [{:>3}..{:<3}) {:?} {}",
                token.span.start,
                token.span.end,
                &text[token.span.clone()],
                scopes
            );
        }
    }
}

fn read_or_exit(path: &str) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Cannot read {}: {}", path, e);
        std::process::exit(1);
    })
}
