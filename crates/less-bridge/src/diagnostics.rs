//! Structured errors recovered from the compiler's stderr.
//!
//! Different lessc/runtime combinations report failures in different shapes,
//! so parsing is a list of grammars tried in order. The first one that
//! recognizes the text wins; the positional grammar always accepts.

use crate::paths::ApplicationRoot;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

/// A diagnostic reported by the compiler
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompilerError {
    pub message: String,
    pub file_name: String,
    pub line: u32,
    pub column: u32,
}

impl CompilerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), ..Default::default() }
    }

    /// Replace real root paths with `~` and normalize backticks.
    pub fn anonymize(mut self, root: Option<&ApplicationRoot>) -> Self {
        if let Some(root) = root {
            self.message = root.rewrite(&self.message);
            self.file_name = root.rewrite(&self.file_name);
        }
        self.message = self.message.replace('`', "'");
        self
    }
}

impl fmt::Display for CompilerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on line {}", self.message, self.line)?;
        if self.column != 0 {
            write!(f, ", column {}", self.column)?;
        }
        write!(f, " in file '{}'", self.file_name)
    }
}

/// One recognized stderr shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorGrammar {
    /// `key: value` lines, triggered by a `message:` tag
    Tagged,
    /// `SomeError: text in path on line L, column C:` on the first line
    SingleLine,
    /// Message on lines 1-2, `on line L, column C:` on line 3
    Positional,
}

impl ErrorGrammar {
    /// Grammars in priority order
    pub const ALL: [ErrorGrammar; 3] =
        [ErrorGrammar::Tagged, ErrorGrammar::SingleLine, ErrorGrammar::Positional];

    /// Parse `lines` (`\r` stripped, empty ones removed before stripping),
    /// or `None` if this grammar does not recognize them
    pub fn parse(self, lines: &[&str]) -> Option<CompilerError> {
        match self {
            ErrorGrammar::Tagged => parse_tagged(lines),
            ErrorGrammar::SingleLine => parse_single_line(lines),
            ErrorGrammar::Positional => Some(parse_positional(lines)),
        }
    }
}

/// Parse compiler stderr into a structured error. Never fails; fields the
/// text does not provide keep their defaults.
pub fn parse_stderr(stderr: &str) -> CompilerError {
    let lines: Vec<&str> = stderr
        .split('\n')
        .filter(|l| !l.is_empty())
        .map(|l| l.trim_end_matches('\r'))
        .collect();

    ErrorGrammar::ALL
        .iter()
        .find_map(|grammar| grammar.parse(&lines))
        .unwrap_or_default()
}

fn parse_tagged(lines: &[&str]) -> Option<CompilerError> {
    if !lines.iter().any(|l| l.contains("message:")) {
        return None;
    }

    let mut error = CompilerError::default();
    for line in lines {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();

        match key.trim() {
            "message" => error.message = value.to_string(),
            "filename" => error.file_name = value.to_string(),
            "line" => error.line = value.parse().unwrap_or(0),
            "column" => error.column = value.parse().unwrap_or(0),
            _ => {}
        }
    }

    Some(error)
}

fn single_line_header() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^[A-Z][A-Za-z]*Error: ").expect("valid regex"))
}

fn single_line_location() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        // FileError: 'x.less' wasn't found in /app/main.less on line 1, column 9:
        Regex::new(concat!(
            r"^(?P<message>.*)\s+in (?P<file>.+?) ",
            r"on line (?P<line>\d+), column (?P<column>\d+):\s*$"
        ))
        .expect("valid regex")
    })
}

fn single_line_position() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"line (?P<line>\d+), column (?P<column>\d+):\s*$").expect("valid regex")
    })
}

fn parse_single_line(lines: &[&str]) -> Option<CompilerError> {
    let first = lines.first()?.trim();
    if !single_line_header().is_match(first) {
        return None;
    }

    let mut error = CompilerError::new(first);

    if let Some(caps) = single_line_position().captures(first) {
        error.line = caps["line"].parse().unwrap_or(0);
        error.column = caps["column"].parse().unwrap_or(0);
    }

    if let Some(caps) = single_line_location().captures(first) {
        error.message = caps["message"].trim_end().to_string();
        error.file_name = caps["file"].replace('\\', "/");
    }

    Some(error)
}

fn parse_positional(lines: &[&str]) -> CompilerError {
    let mut error = CompilerError::default();
    let mut message = String::new();

    for (i, line) in lines.iter().enumerate() {
        if (i == 1 || i == 2) && !line.trim().is_empty() {
            message.push(' ');
            message.push_str(line.trim());
        }

        if i == 3 {
            let mut parts = line.split(',');
            if let Some(line_part) = parts.next() {
                error.line = line_part.replace("on line", "").trim().parse().unwrap_or(0);
            }
            if let Some(column_part) = parts.next() {
                error.column = column_part
                    .replace("column", "")
                    .trim()
                    .trim_end_matches(':')
                    .trim()
                    .parse()
                    .unwrap_or(0);
            }
        }
    }

    error.message = message.trim().to_string();

    // Single-line output carries its message on line 0
    if error.message.is_empty() {
        if let Some(first) = lines.first() {
            error.message = first.trim().to_string();
        }
    }

    error
}
