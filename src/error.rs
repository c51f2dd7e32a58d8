use ariadne::{Color, Fmt, Label, Report, ReportKind, Source};
use std::fmt;

/// Location of a token or node in a script.
///
/// `start`/`end` are character offsets (what `ariadne` labels use), `line`
/// and `column` are 1-based and drive the fixed error report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// Span covering `self` through the end of `other`, keeping the start position.
    pub fn to(&self, other: &Span) -> Self {
        Self {
            start: self.start,
            end: other.end.max(self.start),
            line: self.line,
            column: self.column,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    LexError,
    ParseError,
    RuntimeError,
    ModuleError,
}

#[derive(Debug, Clone)]
pub struct ScriptError {
    pub kind: ErrorKind,
    pub span: Span,
    pub message: String,
    pub help: Option<String>,
}

impl ScriptError {
    pub fn new(kind: ErrorKind, span: Span, message: String) -> Self {
        Self {
            kind,
            span,
            message,
            help: None,
        }
    }

    pub fn new_with_help(kind: ErrorKind, span: Span, message: String, help: String) -> Self {
        Self {
            kind,
            span,
            message,
            help: Some(help),
        }
    }

    pub fn lex_error(span: Span, message: String) -> Self {
        Self::new(ErrorKind::LexError, span, message)
    }

    pub fn parse_error(span: Span, message: String) -> Self {
        Self::new(ErrorKind::ParseError, span, message)
    }

    pub fn parse_error_with_help(span: Span, message: String, help: String) -> Self {
        Self::new_with_help(ErrorKind::ParseError, span, message, help)
    }

    pub fn runtime_error(span: Span, message: String) -> Self {
        Self::new(ErrorKind::RuntimeError, span, message)
    }

    pub fn runtime_error_with_help(span: Span, message: String, help: String) -> Self {
        Self::new_with_help(ErrorKind::RuntimeError, span, message, help)
    }

    pub fn module_error(span: Span, message: String) -> Self {
        Self::new(ErrorKind::ModuleError, span, message)
    }

    /// Renders the single-shot report printed before a script run aborts.
    ///
    /// ```text
    /// [Error]
    /// File: main.es, Position: 3:7
    ///
    /// x = 1 + "a"
    ///       ^
    ///
    /// -> Can't use '+' for operands of type 'int' & 'string'
    /// ```
    pub fn render(&self, source: &str, filename: &str) -> String {
        let line_text = source
            .lines()
            .nth(self.span.line.saturating_sub(1))
            .unwrap_or("");

        // Keep tabs so the caret lines up with the echoed source line.
        let padding: String = line_text
            .chars()
            .take(self.span.column.saturating_sub(1))
            .map(|c| if c == '\t' { '\t' } else { ' ' })
            .collect();

        format!(
            "[Error]\nFile: {}, Position: {}:{}\n\n{}\n{}^\n\n-> {}",
            filename, self.span.line, self.span.column, line_text, padding, self.message
        )
    }

    pub fn report(&self, source: &str, filename: &str) {
        eprintln!("{}", self.render(source, filename));
    }

    pub fn report_pretty(&self, source: &str, filename: &str) {
        let color = match self.kind {
            ErrorKind::LexError => Color::Red,
            ErrorKind::ParseError => Color::Yellow,
            ErrorKind::RuntimeError => Color::Magenta,
            ErrorKind::ModuleError => Color::Blue,
        };

        let kind_str = match self.kind {
            ErrorKind::LexError => "Lexical Error",
            ErrorKind::ParseError => "Parse Error",
            ErrorKind::RuntimeError => "Runtime Error",
            ErrorKind::ModuleError => "Module Error",
        };

        let end = self.span.end.max(self.span.start + 1);
        let mut report_builder = Report::build(ReportKind::Error, filename, self.span.start)
            .with_message(format!("{}: {}", kind_str.fg(color), self.message))
            .with_label(
                Label::new((filename, self.span.start..end))
                    .with_message(&self.message)
                    .with_color(color),
            );

        if let Some(ref help_text) = self.help {
            report_builder =
                report_builder.with_note(format!("{}: {}", "help".fg(Color::Cyan), help_text));
        }

        // Fall back to the plain report if the terminal write fails.
        if report_builder
            .finish()
            .eprint((filename, Source::from(source)))
            .is_err()
        {
            self.report(source, filename);
        }
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ScriptError {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn render_aligns_caret_with_column() {
        let source = "x = 1\nprint(y)\n";
        let error = ScriptError::runtime_error(
            Span::new(12, 13, 2, 7),
            "Undefined variable 'y'".to_string(),
        );

        assert_eq!(
            error.render(source, "main.es"),
            "[Error]\nFile: main.es, Position: 2:7\n\nprint(y)\n      ^\n\n-> Undefined variable 'y'"
        );
    }

    #[test]
    fn render_keeps_tabs_in_padding() {
        let source = "\tfoo bar";
        let error = ScriptError::parse_error(Span::new(5, 8, 1, 6), "bad".to_string());
        let rendered = error.render(source, "t.es");
        assert!(rendered.contains("\tfoo bar\n\t    ^"));
    }
}
