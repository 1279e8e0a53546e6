// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error handling for the MoDeL compiler
//!
//! Per-phase error enums composed into one umbrella `CompilerError`,
//! plus a small diagnostic reporter for terminal output.

use std::fmt;
use thiserror::Error;

/// Source location information for error reporting
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl SourceLocation {
    pub fn new(file: String, line: usize, column: usize, offset: usize) -> Self {
        Self { file, line, column, offset }
    }

    pub fn unknown() -> Self {
        Self { file: "<unknown>".to_string(), line: 0, column: 0, offset: 0 }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Source span covering a range of characters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpan {
    pub start: SourceLocation,
    pub end: SourceLocation,
}

impl SourceSpan {
    pub fn new(start: SourceLocation, end: SourceLocation) -> Self {
        Self { start, end }
    }

    pub fn single(location: SourceLocation) -> Self {
        Self { start: location.clone(), end: location }
    }
}

/// Errors raised while following `include` directives and joining lines
#[derive(Error, Debug, Clone)]
pub enum ReaderError {
    #[error("cannot include self at {location}")]
    SelfInclude { location: SourceLocation },

    #[error("included file forms a cycle: {cycle} at {location}")]
    CircularInclude { cycle: String, location: SourceLocation },

    #[error("cannot read included file '{path}': {message}")]
    Io { path: String, message: String },
}

/// Lexical analysis errors
#[derive(Error, Debug, Clone)]
pub enum LexerError {
    #[error("unexpected character '{character}' at {location}")]
    UnexpectedCharacter { character: char, location: SourceLocation },

    #[error("unterminated string literal at {location}")]
    UnterminatedString { location: SourceLocation },

    #[error("invalid number format '{value}' at {location}")]
    InvalidNumber { value: String, location: SourceLocation },
}

/// Parsing errors
#[derive(Error, Debug, Clone)]
pub enum ParserError {
    #[error("unexpected token {found}, expected {expected} at {location}")]
    UnexpectedToken { found: String, expected: String, location: SourceLocation },

    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: String },

    #[error("iterator list count does not match name count at {location}")]
    IteratorShapeMismatch { location: SourceLocation },

    #[error("lexer error: {source}")]
    Lexer {
        #[from]
        source: LexerError,
    },
}

/// Errors raised while elaborating (binding iterators, expanding formulas)
#[derive(Error, Debug, Clone)]
pub enum ElaborationError {
    #[error("iterator lists have mismatched lengths ({lengths:?}) at {location}")]
    IteratorShapeError { lengths: Vec<usize>, location: SourceLocation },

    #[error("iterator name '{name}' is declared more than once at {location}")]
    DuplicateIteratorName { name: String, location: SourceLocation },

    #[error("placeholder or index variable '{name}' has no binding at {location}")]
    UnboundPlaceholder { name: String, location: SourceLocation },
}

/// Errors raised while building the dependency graph
#[derive(Error, Debug, Clone)]
pub enum GraphError {
    #[error("failed to serialize dependency graph: {message}")]
    Serialization { message: String },
}

/// Compiler errors encompassing all phases
#[derive(Error, Debug, Clone)]
pub enum CompilerError {
    #[error("{source}")]
    Reader {
        #[from]
        source: ReaderError,
    },

    #[error("{source}")]
    Lexer {
        #[from]
        source: LexerError,
    },

    #[error("{source}")]
    Parser {
        #[from]
        source: ParserError,
    },

    #[error("{source}")]
    Elaboration {
        #[from]
        source: ElaborationError,
    },

    #[error("{source}")]
    Graph {
        #[from]
        source: GraphError,
    },

    #[error("I/O error: {message}")]
    Io { message: String },
}

impl From<std::io::Error> for CompilerError {
    fn from(err: std::io::Error) -> Self {
        CompilerError::Io { message: err.to_string() }
    }
}

impl From<csv::Error> for CompilerError {
    fn from(err: csv::Error) -> Self {
        CompilerError::Io { message: format!("calibration csv: {err}") }
    }
}

/// Diagnostic severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message with location and severity
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub location: Option<SourceSpan>,
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn error(message: String, location: Option<SourceSpan>) -> Self {
        Self { severity: Severity::Error, message, location, help: None }
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }
}

/// Error reporter for displaying diagnostics on stderr
pub struct ErrorReporter {
    use_colors: bool,
}

impl ErrorReporter {
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    pub fn report_diagnostic(&self, diagnostic: &Diagnostic) {
        let color = if self.use_colors {
            match diagnostic.severity {
                Severity::Error => "\x1b[31m",
                Severity::Warning => "\x1b[33m",
            }
        } else {
            ""
        };
        let reset = if self.use_colors { "\x1b[0m" } else { "" };

        if let Some(span) = &diagnostic.location {
            eprintln!("{color}{}: {}{reset} ({})", diagnostic.severity, diagnostic.message, span.start);
        } else {
            eprintln!("{color}{}: {}{reset}", diagnostic.severity, diagnostic.message);
        }

        if let Some(help) = &diagnostic.help {
            eprintln!("  = help: {help}");
        }
    }

    pub fn report_error(&self, error: &CompilerError) {
        self.report_diagnostic(&Diagnostic::error(error.to_string(), None));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_location_display() {
        let loc = SourceLocation::new("in.mdl".to_string(), 10, 5, 100);
        assert_eq!(loc.to_string(), "in.mdl:10:5");
    }

    #[test]
    fn test_compiler_error_from_lexer() {
        let lex = LexerError::UnexpectedCharacter { character: '#', location: SourceLocation::unknown() };
        let parse_err: ParserError = lex.into();
        let compiler_err: CompilerError = parse_err.into();
        assert!(compiler_err.to_string().contains("unexpected character"));
    }

    #[test]
    fn test_diagnostic_creation() {
        let loc = SourceLocation::new("in.mdl".to_string(), 1, 1, 0);
        let span = SourceSpan::single(loc);
        let diag = Diagnostic::error("test error".to_string(), Some(span))
            .with_help("fix it".to_string());
        assert_eq!(diag.severity, Severity::Error);
        assert!(diag.help.is_some());
    }
}
