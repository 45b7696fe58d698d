//! Diagnostic trace sinks
//!
//! With tracing on, the line parser narrates every step it takes — the
//! plans it considers, the match it picks, every push and pop — as plain
//! text lines. Positions in the trace are UTF-8 byte offsets from the
//! start of the line, so the output is stable across platforms and usable
//! in snapshot tests.

/// Receives the engine's trace lines, one call per line.
pub trait TraceSink {
    fn line(&mut self, text: &str);
}

/// Forwards trace lines to the `log` facade at debug level.
#[derive(Debug, Default)]
pub struct LogTrace;

impl TraceSink for LogTrace {
    fn line(&mut self, text: &str) {
        log::debug!(target: "tm_parser::trace", "{}", text);
    }
}

/// Collects trace lines in memory; what the snapshot tests use.
#[derive(Debug, Default)]
pub struct BufferTrace {
    lines: Vec<String>,
}

impl BufferTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_text(self) -> String {
        self.lines.join("\n")
    }
}

impl TraceSink for BufferTrace {
    fn line(&mut self, text: &str) {
        self.lines.push(text.to_string());
    }
}
