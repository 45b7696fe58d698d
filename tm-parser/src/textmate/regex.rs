//! Oniguruma-backed regex patterns
//!
//! TextMate grammars lean on Oniguruma features (possessive quantifiers,
//! `\A`/`\G`/`\z`, lookarounds, back-references), so the matching core is
//! the `onig` crate rather than a DFA engine. This module wraps it behind
//! the small surface the parser needs:
//!
//! 1. A pattern value that carries its source text and an origin tag
//!    (where in the grammar it came from, for error messages)
//! 2. One-time lazy compilation, cached inside the pattern value
//! 3. A range-bounded search returning the whole match and every numbered
//!    capture as half-open byte ranges into the line
//! 4. Back-reference interpolation for `end` sources (`\1`, `\2`, ...)
//!
//! Positions are UTF-8 byte offsets throughout; that is what Oniguruma
//! works in and what the rest of the engine reports.

use std::fmt;
use std::ops::Range;

use once_cell::sync::OnceCell;
use onig::{Region, SearchOptions};

/// Substituted for a back-reference whose begin capture did not participate.
/// U+FFFF cannot occur in well-formed source text, so the resolved end
/// pattern can never match.
const UNMATCHABLE: char = '\u{FFFF}';

/// Error type for pattern compilation and searching
#[derive(Debug, Clone, PartialEq)]
pub enum RegexError {
    /// The pattern source does not compile
    Compile {
        origin: String,
        pattern: String,
        message: String,
    },
    /// The engine reported a failure while searching
    Search { origin: String, message: String },
}

impl fmt::Display for RegexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegexError::Compile {
                origin,
                pattern,
                message,
            } => {
                write!(f, "invalid pattern /{}/ ({}): {}", pattern, origin, message)
            }
            RegexError::Search { origin, message } => {
                write!(f, "regex search failed ({}): {}", origin, message)
            }
        }
    }
}

impl std::error::Error for RegexError {}

/// A successful search: the whole match plus every numbered capture group,
/// as half-open byte ranges into the searched line. Non-participating
/// groups are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRegion {
    groups: Vec<Option<Range<usize>>>,
}

impl MatchRegion {
    /// Start of the whole match
    pub fn start(&self) -> usize {
        self.groups[0].as_ref().map(|r| r.start).unwrap_or(0)
    }

    /// End of the whole match
    pub fn end(&self) -> usize {
        self.groups[0].as_ref().map(|r| r.end).unwrap_or(0)
    }

    /// True for a zero-width match
    pub fn is_empty(&self) -> bool {
        self.start() == self.end()
    }

    /// The N-th capture group, `0` being the whole match
    pub fn group(&self, index: usize) -> Option<Range<usize>> {
        self.groups.get(index).and_then(|g| g.clone())
    }

    /// Number of capture slots, including the whole match
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

/// A regex pattern with lazily-compiled Oniguruma machinery.
///
/// Compilation happens on the first search and the outcome (success or the
/// error message) is cached in the value, so a pattern is compiled at most
/// once no matter how many lines it is tried against. Equality is over the
/// pattern source only, which is also what the cache is keyed on.
pub struct RegexPattern {
    source: String,
    origin: String,
    compiled: OnceCell<Result<onig::Regex, String>>,
}

impl RegexPattern {
    /// Create a pattern from its source, tagged with where in the grammar
    /// it came from (used verbatim in error messages).
    pub fn new(source: impl Into<String>, origin: impl Into<String>) -> Self {
        RegexPattern {
            source: source.into(),
            origin: origin.into(),
            compiled: OnceCell::new(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    fn compiled(&self) -> Result<&onig::Regex, RegexError> {
        self.compiled
            .get_or_init(|| onig::Regex::new(&self.source).map_err(|e| e.to_string()))
            .as_ref()
            .map_err(|message| RegexError::Compile {
                origin: self.origin.clone(),
                pattern: self.source.clone(),
                message: message.clone(),
            })
    }

    /// Check that the pattern compiles without running a search.
    pub fn validate(&self) -> Result<(), RegexError> {
        self.compiled().map(|_| ())
    }

    /// Search `line` within `range` (half-open, byte offsets).
    ///
    /// The search honors the range exactly: a match starts at or after
    /// `range.start` and cannot extend past `range.end` (the engine sees
    /// the line truncated there, so `$`/`\z` match at the range end).
    /// Text before `range.start` stays visible to lookbehind and `^`.
    /// Zero-width matches are reported like any other.
    pub fn search(&self, line: &str, range: Range<usize>) -> Result<Option<MatchRegion>, RegexError> {
        let regex = self.compiled()?;
        let haystack = &line[..range.end];

        let mut region = Region::new();
        let found = regex.search_with_options(
            haystack,
            range.start,
            haystack.len(),
            SearchOptions::SEARCH_OPTION_NONE,
            Some(&mut region),
        );

        match found {
            None => Ok(None),
            Some(_) => {
                let groups: Vec<Option<Range<usize>>> = (0..region.len())
                    .map(|i| region.pos(i).map(|(s, e)| s..e))
                    .collect();
                if groups.first().map_or(true, |g| g.is_none()) {
                    return Err(RegexError::Search {
                        origin: self.origin.clone(),
                        message: "match reported without a whole-match range".to_string(),
                    });
                }
                Ok(Some(MatchRegion { groups }))
            }
        }
    }
}

impl fmt::Debug for RegexPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegexPattern")
            .field("source", &self.source)
            .field("origin", &self.origin)
            .finish()
    }
}

impl PartialEq for RegexPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Interpolate begin-match captures into an `end` pattern source.
///
/// Scans for `\` followed by decimal digits; each occurrence is replaced by
/// the literal text of that begin capture (verbatim, no escaping), or by a
/// scalar that cannot match (U+FFFF) when the group did not participate.
///
/// Returns `None` when the source contains no back-references, so the
/// caller can keep using the original pattern value and its compile cache.
pub fn resolve_backreferences(
    end_source: &str,
    line: &str,
    begin_match: &MatchRegion,
) -> Option<String> {
    if !end_source.contains('\\') {
        return None;
    }

    let mut resolved = String::with_capacity(end_source.len());
    let mut substituted = false;
    let bytes = end_source.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() && bytes[i + 1].is_ascii_digit() {
            let mut j = i + 1;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            // The digit run is bounded, but an absurd grammar could still
            // overflow usize; treat that like a non-participating group.
            let group = end_source[i + 1..j].parse::<usize>().ok();
            match group.and_then(|n| begin_match.group(n)) {
                Some(range) => resolved.push_str(&line[range]),
                None => resolved.push(UNMATCHABLE),
            }
            substituted = true;
            i = j;
        } else {
            let ch = end_source[i..].chars().next().unwrap_or('\u{0}');
            resolved.push(ch);
            i += ch.len_utf8();
        }
    }

    if substituted {
        Some(resolved)
    } else {
        None
    }
}
