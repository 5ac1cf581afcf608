use crate::ast::Span;
use serde::Serialize;
use std::fmt;

/// Diagnostic severity level (matches LSP DiagnosticSeverity)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error = 1,
    Warning = 2,
    Info = 3,
    Hint = 4,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Hint => "hint",
        }
    }
}

/// Diagnostic kind/category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    Type,
    /// The checker itself failed on a unit
    Internal,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::Type => "type",
            DiagnosticKind::Internal => "internal",
        }
    }
}

/// Diagnostic error code for categorization (e.g., "T0101")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DiagnosticCode {
    pub code: String,
    /// Brief description of the error code
    pub title: String,
}

impl DiagnosticCode {
    pub fn new(code: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            title: title.into(),
        }
    }
}

/// A diagnostic message with location and context
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    pub filename: String,
    pub code: Option<DiagnosticCode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn new(
        kind: DiagnosticKind,
        severity: Severity,
        message: String,
        span: Span,
        filename: String,
    ) -> Self {
        Self {
            kind,
            severity,
            message,
            span,
            filename,
            code: None,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn error(kind: DiagnosticKind, message: String, span: Span, filename: String) -> Self {
        Self::new(kind, Severity::Error, message, span, filename)
    }

    pub fn warning(kind: DiagnosticKind, message: String, span: Span, filename: String) -> Self {
        Self::new(kind, Severity::Warning, message, span, filename)
    }

    pub fn with_code(mut self, code: DiagnosticCode) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Format the diagnostic with source code snippet
    pub fn format(&self, source: &str) -> String {
        let line_index = LineIndex::new(source);
        let formatter = DiagnosticFormatter {
            diagnostic: self,
            source,
            line_index: &line_index,
        };
        formatter.format()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.severity.as_str())?;
        if let Some(code) = &self.code {
            write!(f, "[{}]", code.code)?;
        }
        write!(
            f,
            ": {} at {}:{}:{}",
            self.message, self.filename, self.span.start, self.span.end
        )
    }
}

/// Line index for efficient offset-to-line/column conversion
#[derive(Debug)]
pub struct LineIndex {
    /// Starting byte offset of each line
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, ch) in source.char_indices() {
            if ch == '\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// Convert byte offset to (line, column) (both 1-indexed)
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line.saturating_sub(1),
        };

        let line_start = self.line_starts[line];
        let col = offset.saturating_sub(line_start);

        (line + 1, col + 1)
    }

    /// Get the byte range for a given line (1-indexed)
    pub fn line_range(&self, line: usize) -> Option<(usize, usize)> {
        if line == 0 || line > self.line_starts.len() {
            return None;
        }
        let start = self.line_starts[line - 1];
        let end = if line < self.line_starts.len() {
            self.line_starts[line].saturating_sub(1) // Exclude newline
        } else {
            usize::MAX // Last line extends to EOF
        };
        Some((start, end))
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

struct DiagnosticFormatter<'a> {
    diagnostic: &'a Diagnostic,
    source: &'a str,
    line_index: &'a LineIndex,
}

impl DiagnosticFormatter<'_> {
    fn format(&self) -> String {
        let mut output = String::new();

        let header = match &self.diagnostic.code {
            Some(code) => format!("{}[{}]", self.diagnostic.severity.as_str(), code.code),
            None => self.diagnostic.severity.as_str().to_string(),
        };
        output.push_str(&format!("{header}: {}\n", self.diagnostic.message));

        let (start_line, start_col) = self.line_index.line_col(self.diagnostic.span.start);
        let (end_line, end_col) = self.line_index.line_col(self.diagnostic.span.end);

        output.push_str(&format!(
            "  --> {}:{}:{}\n",
            self.diagnostic.filename, start_line, start_col
        ));

        output.push_str(&self.format_snippet(start_line, start_col, end_line, end_col));

        for note in &self.diagnostic.notes {
            output.push_str(&format!("note: {note}\n"));
        }

        if let Some(help) = &self.diagnostic.help {
            output.push_str(&format!("help: {help}\n"));
        }

        output
    }

    fn format_snippet(
        &self,
        start_line: usize,
        start_col: usize,
        end_line: usize,
        end_col: usize,
    ) -> String {
        let mut output = String::new();

        let max_line = end_line.max(start_line);
        let line_num_width = max_line.to_string().len();

        // one line of context on each side
        let context_start = start_line.saturating_sub(1).max(1);
        let context_end = (end_line + 1).min(self.line_index.line_count());

        output.push_str(&format!("{:width$} |\n", "", width = line_num_width));

        for line_num in context_start..=context_end {
            if let Some((line_start, line_end)) = self.line_index.line_range(line_num) {
                let line_end = line_end.min(self.source.len());
                let line_text = &self.source[line_start..line_end];

                output.push_str(&format!("{line_num:line_num_width$} | {line_text}\n"));

                if line_num >= start_line && line_num <= end_line {
                    output.push_str(&format!("{:width$} | ", "", width = line_num_width));

                    let line_span_start = if line_num == start_line {
                        start_col - 1
                    } else {
                        0
                    };
                    let line_span_end = if line_num == end_line {
                        end_col - 1
                    } else {
                        line_text.chars().count()
                    };

                    output.push_str(&" ".repeat(line_span_start));
                    let span_width = line_span_end.saturating_sub(line_span_start).max(1);
                    output.push('^');
                    output.push_str(&"~".repeat(span_width - 1));
                    output.push('\n');
                }
            }
        }

        output.push_str(&format!("{:width$} |\n", "", width = line_num_width));

        output
    }
}
