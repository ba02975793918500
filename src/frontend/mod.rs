use std::path::PathBuf;

use colored::Colorize;
use thiserror::Error;

use self::lexer::Span;

pub mod ast;
pub mod lexer;
pub mod parser;

#[derive(Debug)]
pub struct SourceFile {
    pub contents: String,
    pub origin: SourceFileOrigin,
}

impl SourceFile {
    pub fn from_memory(contents: impl Into<String>) -> Self {
        Self {
            contents: contents.into(),
            origin: SourceFileOrigin::Memory,
        }
    }

    pub fn value_of_span(&self, span: Span) -> &str {
        &self.contents[span.start..span.end]
    }

    /// 1-based line number of a byte position
    pub fn row_for_position(&self, position: usize) -> usize {
        self.contents[..position.min(self.contents.len())]
            .matches('\n')
            .count()
            + 1
    }

    /// 1-based column of a byte position
    pub fn column_for_position(&self, position: usize) -> usize {
        let position = position.min(self.contents.len());
        let line_start = self.contents[..position]
            .rfind('\n')
            .map(|i| i + 1)
            .unwrap_or(0);

        position - line_start + 1
    }

    /// Prints the line containing the span with the span underlined
    pub fn highlight_span(&self, span: Span) {
        let row = self.row_for_position(span.start);
        let column = self.column_for_position(span.start);
        let Some(line) = self.contents.lines().nth(row - 1) else {
            return;
        };

        let gutter = row.to_string();
        let width = span.end.saturating_sub(span.start).max(1);

        eprintln!("{} {} {}", gutter.blue(), "|".blue(), line);
        eprintln!(
            "{} {} {}{}",
            " ".repeat(gutter.len()),
            "|".blue(),
            " ".repeat(column - 1),
            "^".repeat(width).red()
        );
    }
}

#[derive(Debug)]
pub enum SourceFileOrigin {
    Memory,
    File(PathBuf),
}

impl core::fmt::Display for SourceFileOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceFileOrigin::Memory => f.write_str("<memory>"),
            SourceFileOrigin::File(path) => f.write_fmt(format_args!("{}", path.display())),
        }
    }
}

/// Lexical or syntactic error. Parsing stops at the first one.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ParseError {
    pub span: Span,
    pub message: String,
}

impl ParseError {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }

    /// Reports the error on stderr along with the offending source line
    pub fn report(&self, source: &SourceFile) {
        eprintln!(
            "{} {} ({}:{}:{})",
            "syntax error:".red().bold(),
            self.message,
            source.origin,
            source.row_for_position(self.span.start),
            source.column_for_position(self.span.start)
        );
        source.highlight_span(self.span);
    }
}
