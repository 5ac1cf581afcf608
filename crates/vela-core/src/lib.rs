//! Static type checking for Vela.
//!
//! The crate takes a resolved program (an [`ElementTable`] plus a tree of
//! [`Program`] units) and computes a type for every expression, reporting
//! type errors as it goes. See [`typecheck`] for the checking pass and
//! [`pipeline`] for the whole-program entry point.

pub mod ast;
pub mod config;
pub mod diagnostics;
pub mod elements;
pub mod pipeline;
pub mod typecheck;
pub mod types;

// Re-export commonly used types for convenience
pub use ast::{Expr, Program, Stmt};
pub use config::CheckerOptions;
pub use diagnostics::{Diagnostic, Severity};
pub use elements::ElementTable;
pub use pipeline::{CheckReport, Pipeline};
pub use types::Type;
