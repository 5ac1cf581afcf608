//! Whole-program checking with severity-mapped diagnostics
//!
//! [`Pipeline`] runs the checking pass over every unit of a [`Program`] and
//! turns the reported [`TypeError`]s into [`Diagnostic`]s. The severity of
//! each diagnostic comes from the error's category unless the options ask
//! for strict checking.
//!
//! ## Usage
//!
//! ```no_run
//! # use vela_core::ast::Program;
//! # use vela_core::config::CheckerOptions;
//! # use vela_core::elements::ElementTable;
//! # use vela_core::pipeline::Pipeline;
//! let elements = ElementTable::new();
//! let program = Program::default();
//!
//! let report = Pipeline::new(CheckerOptions::default()).check(&elements, &program);
//! for diagnostic in &report.diagnostics {
//!     eprintln!("{diagnostic}");
//! }
//! assert!(!report.has_errors());
//! ```

use tracing::{info, warn};

use crate::ast::{Program, Span};
use crate::config::CheckerOptions;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Severity};
use crate::elements::ElementTable;
use crate::typecheck::{
    DiagnosticSink, ProgramState, TypeError, TypeErrorCode, TypeTable, check_unit,
};
use crate::types::SubclassIndex;

/// Result of checking a program: the expression types and every diagnostic.
#[derive(Debug, Default)]
pub struct CheckReport {
    pub types: TypeTable,
    pub diagnostics: Vec<Diagnostic>,
}

impl CheckReport {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Warning)
    }

    /// Diagnostics reported against `filename`.
    pub fn for_file<'r>(&'r self, filename: &'r str) -> impl Iterator<Item = &'r Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.filename == filename)
    }
}

/// Checks programs with a fixed set of options.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    options: CheckerOptions,
}

impl Pipeline {
    pub fn new(options: CheckerOptions) -> Self {
        Pipeline { options }
    }

    pub fn options(&self) -> &CheckerOptions {
        &self.options
    }

    /// Check every unit in order, one checker per unit.
    ///
    /// A unit that breaks an element-table invariant produces a single
    /// internal diagnostic; the remaining units are still checked.
    pub fn check(&self, elements: &ElementTable, program: &Program) -> CheckReport {
        let subclasses = SubclassIndex::build(elements);
        let mut state = ProgramState::new();
        let mut diagnostics = Vec::new();

        for unit in &program.units {
            let mut sink = UnitSink {
                filename: &unit.filename,
                strict: self.options.strict,
                diagnostics: &mut diagnostics,
            };
            if let Err(err) = check_unit(elements, &subclasses, &self.options, &mut state, &mut sink, unit) {
                warn!(unit = %unit.filename, error = %err, "unit could not be checked");
                let error = TypeError::new(TypeErrorCode::InternalError, Span::default(), err.to_string());
                diagnostics.push(to_diagnostic(&error, &unit.filename, self.options.strict));
            }
        }

        let report = CheckReport {
            types: state.into_types(),
            diagnostics,
        };
        info!(
            units = program.units.len(),
            errors = report.errors().count(),
            warnings = report.warnings().count(),
            "checked program"
        );
        report
    }
}

/// The severity a reported error gets under `strict`.
pub fn severity_of(code: TypeErrorCode, strict: bool) -> Severity {
    if strict {
        Severity::Error
    } else {
        code.category().default_severity()
    }
}

pub fn to_diagnostic(error: &TypeError, filename: &str, strict: bool) -> Diagnostic {
    let kind = match error.code {
        TypeErrorCode::InternalError => DiagnosticKind::Internal,
        _ => DiagnosticKind::Type,
    };
    let mut diagnostic = Diagnostic::new(
        kind,
        severity_of(error.code, strict),
        error.message.clone(),
        error.span,
        filename.to_string(),
    )
    .with_code(error.code.diagnostic_code());
    for note in &error.notes {
        diagnostic = diagnostic.with_note(note.clone());
    }
    match &error.help {
        Some(help) => diagnostic.with_help(help.clone()),
        None => diagnostic,
    }
}

struct UnitSink<'d> {
    filename: &'d str,
    strict: bool,
    diagnostics: &'d mut Vec<Diagnostic>,
}

impl DiagnosticSink for UnitSink<'_> {
    fn report(&mut self, error: TypeError) {
        self.diagnostics.push(to_diagnostic(&error, self.filename, self.strict));
    }
}
