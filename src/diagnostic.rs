use crate::source::{Position, SourceText};

/// Diagnostic severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiagnosticLevel {
    #[default]
    Error,
    Warning,
    Note,
}

/// Individual diagnostic with rich context
#[derive(Debug, Clone, Default)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
    pub location: Option<Position>,
    pub hints: Vec<String>, // Suggestions for fixing
}

/// Syntax errors raised by the cursor and the parser. None of them is recovered.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("{message}")]
    Syntax {
        message: String,
        location: Position,
        line_text: String,
    },

    #[error("unterminated comment")]
    UnterminatedComment { location: Position, line_text: String },

    #[error("invalid numeric literal '{text}'")]
    InvalidNumber {
        text: String,
        location: Position,
        line_text: String,
    },

    #[error("nesting deeper than {limit} levels")]
    NestingTooDeep {
        limit: usize,
        location: Position,
        line_text: String,
    },
}

impl ParseError {
    pub fn location(&self) -> Position {
        match self {
            ParseError::Syntax { location, .. } => *location,
            ParseError::UnterminatedComment { location, .. } => *location,
            ParseError::InvalidNumber { location, .. } => *location,
            ParseError::NestingTooDeep { location, .. } => *location,
        }
    }

    /// The full source line the error was raised on.
    pub fn line_text(&self) -> &str {
        match self {
            ParseError::Syntax { line_text, .. }
            | ParseError::UnterminatedComment { line_text, .. }
            | ParseError::InvalidNumber { line_text, .. }
            | ParseError::NestingTooDeep { line_text, .. } => line_text,
        }
    }
}

impl From<ParseError> for Diagnostic {
    fn from(error: ParseError) -> Self {
        Diagnostic {
            level: DiagnosticLevel::Error,
            message: error.to_string(),
            location: Some(error.location()),
            hints: Vec::new(),
        }
    }
}

/// Collects diagnostics for one translation run
#[derive(Debug, Default)]
pub struct DiagnosticEngine {
    pub diagnostics: Vec<Diagnostic>,
    pub report_notes: bool,
}

impl DiagnosticEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_notes(report_notes: bool) -> Self {
        DiagnosticEngine {
            diagnostics: Vec::new(),
            report_notes,
        }
    }

    pub fn report_diagnostic(&mut self, diagnostic: Diagnostic) {
        if diagnostic.level == DiagnosticLevel::Note && !self.report_notes {
            return;
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn report_note(&mut self, message: String, location: Option<Position>) {
        self.report_diagnostic(Diagnostic {
            level: DiagnosticLevel::Note,
            message,
            location,
            hints: Vec::new(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.level == DiagnosticLevel::Error)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn clear(&mut self) {
        self.diagnostics.clear();
    }
}

/// Renders diagnostics as `level: message`, a `-->` location line and the offending source line.
pub struct ErrorFormatter {
    pub show_source: bool,
    pub show_hints: bool,
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        ErrorFormatter {
            show_source: true,
            show_hints: true,
        }
    }
}

impl ErrorFormatter {
    pub fn format_diagnostic(&self, diag: &Diagnostic, source: Option<&SourceText>) -> String {
        let level_str = match diag.level {
            DiagnosticLevel::Error => "error",
            DiagnosticLevel::Warning => "warning",
            DiagnosticLevel::Note => "note",
        };

        let mut result = format!("{}: {}", level_str, diag.message);

        if let Some(location) = diag.location {
            let path = source.map(|s| s.path()).unwrap_or("<input>");
            result.push_str(&format!("\n --> {}:{}", path, location));

            if self.show_source
                && let Some(source) = source
            {
                let line = source.line_text(location.line);
                let caret_pad = " ".repeat(location.column.saturating_sub(1) as usize);
                result.push_str(&format!("\n  |\n  | {}\n  | {}^", line, caret_pad));
            }
        }

        if self.show_hints {
            for hint in &diag.hints {
                result.push_str(&format!("\n  hint: {}", hint));
            }
        }

        result
    }

    pub fn format_diagnostics(&self, diagnostics: &[Diagnostic], source: Option<&SourceText>) -> String {
        diagnostics
            .iter()
            .map(|diag| self.format_diagnostic(diag, source))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn print_diagnostics(&self, diagnostics: &[Diagnostic], source: Option<&SourceText>) {
        for diag in diagnostics {
            eprintln!("{}", self.format_diagnostic(diag, source));
        }
    }
}
