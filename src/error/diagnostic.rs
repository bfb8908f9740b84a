//! Terminal rendering of a [`KeelError`]
//!
//! Syntax errors point a caret at the offending column. Runtime errors
//! underline the word they were raised on and name the task that was
//! running. Errors without a location print the message alone.

use colored::Colorize;
use std::fmt;

use super::{KeelError, SourceLocation};

/// A borrowed error plus, optionally, the Buildfile text it came from
pub struct Diagnostic<'a> {
    error: &'a KeelError,
    source: Option<&'a str>,
}

#[derive(Clone, Copy)]
enum Marker {
    Caret,
    Underline,
}

impl<'a> Diagnostic<'a> {
    pub fn new(error: &'a KeelError) -> Self {
        Self { error, source: None }
    }

    /// Quote the offending line from `source`.
    pub fn with_source(mut self, source: &'a str) -> Self {
        self.source = Some(source);
        self
    }

    fn excerpt(&self, f: &mut fmt::Formatter<'_>, location: &SourceLocation, marker: Marker) -> fmt::Result {
        writeln!(f, "  {} {}", "-->".blue().bold(), location)?;

        let Some(line) = self
            .source
            .and_then(|source| source.lines().nth(location.line.checked_sub(1)?))
        else {
            return Ok(());
        };

        let gutter = location.line.to_string();
        let blank = " ".repeat(gutter.len());
        writeln!(f, "  {} {}", format!("{} |", gutter).blue().bold(), line)?;

        // Reuse the line's own tabs so the marker lines up.
        let column = location.column.saturating_sub(1);
        let padding: String = line
            .chars()
            .take(column)
            .map(|c| if c == '\t' { '\t' } else { ' ' })
            .collect();
        let mark = match marker {
            Marker::Caret => "^".red().bold(),
            Marker::Underline => {
                let width = line
                    .chars()
                    .skip(column)
                    .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '$')
                    .count()
                    .max(1);
                "~".repeat(width).red().bold()
            }
        };
        writeln!(f, "  {} {}{}", format!("{} |", blank).blue().bold(), padding, mark)
    }
}

impl fmt::Display for Diagnostic<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}: {}", self.error.kind().red().bold(), self.error.message())?;

        match self.error {
            KeelError::SyntaxError { location, .. } => self.excerpt(f, location, Marker::Caret),
            KeelError::RuntimeError { location, task, .. } => {
                if let Some(location) = location {
                    self.excerpt(f, location, Marker::Underline)?;
                }
                if let Some(task) = task {
                    writeln!(f, "  {} while running task '{}'", "=".blue().bold(), task)?;
                }
                Ok(())
            }
            KeelError::InternalError { .. } => writeln!(
                f,
                "  {} this is a defect in the keel engine, not in your Buildfile",
                "note:".yellow().bold()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn render(diagnostic: Diagnostic<'_>) -> String {
        colored::control::set_override(false);
        diagnostic.to_string()
    }

    #[test]
    fn test_syntax_error_gets_caret() {
        let source = "let x = 42\nlet y = !\nlet z = 10";
        let err = KeelError::syntax_error("Unexpected character '!'", SourceLocation::at(2, 9));

        assert_eq!(
            render(Diagnostic::new(&err).with_source(source)),
            "Syntax Error: Unexpected character '!'\n  --> 2:9\n  2 | let y = !\n    |         ^\n"
        );
    }

    #[test]
    fn test_runtime_error_underlines_word_and_names_task() {
        let source = "task build {\n    log(missing)\n}";
        let err = KeelError::runtime_error("Undefined variable 'missing'", Some(SourceLocation::at(2, 9)))
            .in_task("build");

        let rendered = render(Diagnostic::new(&err).with_source(source));
        assert_eq!(
            rendered,
            "Runtime Error: Undefined variable 'missing'\n  --> 2:9\n  2 |     log(missing)\n    |         ~~~~~~~\n  = while running task 'build'\n"
        );
    }

    #[test]
    fn test_runtime_error_without_location_has_no_excerpt() {
        let err = KeelError::runtime_error("Undefined task 'nope'", None);
        assert_eq!(
            render(Diagnostic::new(&err).with_source("task a {}")),
            "Runtime Error: Undefined task 'nope'\n"
        );
    }

    #[test]
    fn test_marker_follows_tabs() {
        let source = "task t {\n\tlog(x)\n}";
        let err = KeelError::runtime_error("boom", Some(SourceLocation::at(2, 6))).in_task("t");
        let rendered = render(Diagnostic::new(&err).with_source(source));
        assert!(rendered.contains("    | \t    ~\n"));
    }

    #[test]
    fn test_location_past_end_of_source() {
        let err = KeelError::syntax_error("Unexpected end of input", SourceLocation::at(9, 1));
        assert_eq!(
            render(Diagnostic::new(&err).with_source("task t {")),
            "Syntax Error: Unexpected end of input\n  --> 9:1\n"
        );
    }

    #[test]
    fn test_internal_error_gets_note() {
        let err = KeelError::internal_error("task declaration inside a body");
        let rendered = render(Diagnostic::new(&err));
        assert!(rendered.starts_with("Internal Error: task declaration inside a body\n"));
        assert!(rendered.contains("defect in the keel engine"));
    }
}
