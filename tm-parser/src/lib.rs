//! # tm-parser
//!
//! A tokenizer for TextMate grammars.
//!
//! Given a grammar (a tree of nested pattern rules with regex-based
//! match/begin/end anchors) and a source document, the library produces a
//! sequence of typed tokens: byte ranges annotated with a stack of scope
//! names. The work happens one line at a time; the state stack left behind
//! by line N is the input state for line N+1, so a document is tokenized by
//! threading the stack through its lines in order.
//!
//! File Layout
//!
//! Everything lives under the `textmate` module, split along the stages of
//! the pipeline:
//!
//! src/textmate
//!   ├── scope        Scope names and scope paths
//!   ├── regex        Oniguruma-backed pattern values and range searches
//!   ├── grammar      Rule tree, captures maps, JSON loading
//!   ├── parsing      State stack, match planner, capture anchors, engine
//!   ├── tokenizer    Per-line entry point and the document driver
//!   └── testing      Assertion helpers for integration tests

pub mod textmate;
