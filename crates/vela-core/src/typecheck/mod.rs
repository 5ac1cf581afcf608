//! Static type checker for Vela.
//!
//! This module implements the checking pass over resolved trees. Typing is
//! optional: declarations may omit types, and types the checker computes
//! itself are marked inferred and treated as hints.
//!
//! ## Type System Features
//!
//! - **Assignability**: compatibility is the symmetric `T <: S || S <: T`,
//!   which allows implicit downcasts
//! - **Narrowing**: `is` tests refine variable types inside the guarded code
//! - **Argument binding**: required, optional positional, named and rest
//!   parameters, including the legacy positional binding of named parameters
//! - **Class checks**: unimplemented abstract members, override legality and
//!   default-class constructors
//!
//! ## Type Checking Process
//!
//! 1. **Validation**: element references in the unit are checked against
//!    the element table
//! 2. **Declarations**: classes, functions and variables are checked in
//!    order, every expression's type is recorded in the [`TypeTable`]
//! 3. **Error collection**: every error goes to a [`DiagnosticSink`]; the
//!    pass always completes and substitutes `dynamic` where it must
//!
//! One [`Checker`] handles one compilation unit on one thread; units of a
//! program share only the [`ProgramState`].

mod classes;
mod environment;
mod errors;
mod expressions;
mod invocation;
mod narrowing;
mod operators;
mod statements;
mod validate;

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument};

use crate::ast::{CompilationUnit, Declaration, NodeId, Program, Span};
use crate::config::CheckerOptions;
use crate::elements::{ElementId, ElementTable};
use crate::types::{SubclassIndex, Type};

pub use errors::{
    DiagnosticSink, ErrorCategory, InternalError, TypeError, TypeErrorCode, TypecheckResult,
};

pub(crate) use environment::Checker;

/// The type computed for every expression node.
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    types: HashMap<NodeId, Type>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: NodeId, ty: Type) {
        self.types.insert(node, ty);
    }

    pub fn get(&self, node: NodeId) -> Option<&Type> {
        self.types.get(&node)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Type)> {
        self.types.iter().map(|(node, ty)| (*node, ty))
    }
}

/// State shared by the checkers of one program run.
#[derive(Debug, Default)]
pub struct ProgramState {
    pub types: TypeTable,
    /// Classes already reported as abstract, so each is reported once
    diagnosed_abstract: HashSet<ElementId>,
}

impl ProgramState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_types(self) -> TypeTable {
        self.types
    }
}

/// Check one compilation unit, reporting type errors to `sink`.
///
/// An `Err` means the unit could not be checked at all; nothing has been
/// recorded for it in that case.
#[instrument(skip_all, fields(unit = %unit.filename))]
pub fn check_unit(
    elements: &ElementTable,
    subclasses: &SubclassIndex,
    options: &CheckerOptions,
    state: &mut ProgramState,
    sink: &mut dyn DiagnosticSink,
    unit: &CompilationUnit,
) -> Result<(), InternalError> {
    validate::validate_unit(elements, unit)?;

    let mut checker = Checker::new(elements, subclasses, options, state, sink, unit.library);
    for decl in &unit.declarations {
        match decl {
            Declaration::Class(class) => checker.check_class(class),
            Declaration::Function(func) => checker.check_function(func),
            Declaration::Variable(var) => checker.check_top_level_variable(var),
        }
    }
    debug!(declarations = unit.declarations.len(), "checked unit");
    Ok(())
}

/// Type check a program with default options and return the type of every
/// expression, or every error found.
pub fn typecheck_program(elements: &ElementTable, program: &Program) -> TypecheckResult<TypeTable> {
    typecheck_program_with(elements, program, &CheckerOptions::default())
}

pub fn typecheck_program_with(
    elements: &ElementTable,
    program: &Program,
    options: &CheckerOptions,
) -> TypecheckResult<TypeTable> {
    let subclasses = SubclassIndex::build(elements);
    let mut state = ProgramState::new();
    let mut errors: Vec<TypeError> = Vec::new();
    for unit in &program.units {
        if let Err(err) = check_unit(elements, &subclasses, options, &mut state, &mut errors, unit) {
            errors.push(TypeError::new(
                TypeErrorCode::InternalError,
                Span::default(),
                format!("{}: {err}", unit.filename),
            ));
        }
    }

    if errors.is_empty() {
        Ok(state.into_types())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
pub(super) mod tests {
    use super::*;
    use crate::ast::{AstBuilder, CompilationUnit, Declaration, FunctionDecl, Stmt};
    use crate::elements::{LibraryId, Modifiers};

    /// An element table with one user library, shared by the checker tests.
    pub struct Fixture {
        pub table: ElementTable,
        pub lib: LibraryId,
    }

    impl Fixture {
        pub fn new() -> Self {
            let mut table = ElementTable::new();
            let lib = table.new_library();
            Fixture { table, lib }
        }
    }

    pub fn check_decls_with(
        fx: &Fixture,
        options: CheckerOptions,
        declarations: Vec<Declaration>,
    ) -> (TypeTable, Vec<TypeError>) {
        let subclasses = SubclassIndex::build(&fx.table);
        let mut state = ProgramState::new();
        let mut errors: Vec<TypeError> = Vec::new();
        let unit = CompilationUnit {
            filename: "test.vela".to_string(),
            library: fx.lib,
            declarations,
        };
        check_unit(&fx.table, &subclasses, &options, &mut state, &mut errors, &unit)
            .expect("test unit refers to known elements");
        (state.into_types(), errors)
    }

    pub fn check_decls(fx: &Fixture, declarations: Vec<Declaration>) -> (TypeTable, Vec<TypeError>) {
        check_decls_with(fx, CheckerOptions::default(), declarations)
    }

    /// Check `body` as the body of a fresh top-level `void main()`.
    pub fn check_body_with(
        fx: &mut Fixture,
        options: CheckerOptions,
        body: Vec<Stmt>,
    ) -> (TypeTable, Vec<TypeError>) {
        let main = fx
            .table
            .add_method(None, fx.lib, "main", vec![], Type::void(), Modifiers::default());
        check_decls_with(fx, options, vec![Declaration::Function(AstBuilder::method(main, Some(body)))])
    }

    pub fn check_body(fx: &mut Fixture, body: Vec<Stmt>) -> (TypeTable, Vec<TypeError>) {
        check_body_with(fx, CheckerOptions::default(), body)
    }

    fn program(library: LibraryId, declarations: Vec<Declaration>) -> Program {
        Program {
            units: vec![CompilationUnit {
                filename: "main.vela".to_string(),
                library,
                declarations,
            }],
        }
    }

    fn main_function(table: &mut ElementTable, lib: LibraryId, body: Vec<Stmt>) -> Declaration {
        let main = table.add_method(None, lib, "main", vec![], Type::void(), Modifiers::default());
        Declaration::Function(FunctionDecl {
            element: main,
            body: Some(body),
            span: Span::default(),
        })
    }

    #[test]
    fn test_empty_program() {
        let table = ElementTable::new();
        let types = typecheck_program(&table, &Program::default()).unwrap();
        assert!(types.is_empty());
    }

    #[test]
    fn test_literal_types_are_recorded() {
        let mut table = ElementTable::new();
        let lib = table.new_library();
        let mut b = AstBuilder::new();
        let one = b.int(1);
        let text = b.string("hi");
        let id = one.id;
        let text_id = text.id;
        let decl = main_function(&mut table, lib, vec![Stmt::Expr(one), Stmt::Expr(text)]);
        let types = typecheck_program(&table, &program(lib, vec![decl])).unwrap();
        assert_eq!(types.get(id), Some(&table.core().int_type()));
        assert_eq!(types.get(text_id), Some(&table.core().string_type()));
    }

    #[test]
    fn test_incompatible_initializer() {
        let mut table = ElementTable::new();
        let lib = table.new_library();
        let int = table.core().int_type();
        let x = table.add_variable(None, lib, "x", int);
        let mut b = AstBuilder::new();
        let value = b.string("five");
        let decl = main_function(&mut table, lib, vec![AstBuilder::var(x, Some(value))]);
        let errors = typecheck_program(&table, &program(lib, vec![decl])).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, TypeErrorCode::IncompatibleAssignment);
        assert!(errors[0].message.contains("'String'"));
    }

    #[test]
    fn test_unknown_element_is_internal_error() {
        let mut table = ElementTable::new();
        let lib = table.new_library();
        let mut b = AstBuilder::new();
        let bogus = b.ident("ghost", ElementId(9_999));
        let decl = main_function(&mut table, lib, vec![Stmt::Expr(bogus)]);
        let errors = typecheck_program(&table, &program(lib, vec![decl])).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, TypeErrorCode::InternalError);
        assert!(errors[0].message.starts_with("main.vela"));
    }

    #[test]
    fn test_internal_error_does_not_stop_other_units() {
        let mut table = ElementTable::new();
        let lib = table.new_library();
        let mut b = AstBuilder::new();
        let bogus = b.ident("ghost", ElementId(9_999));
        let broken = main_function(&mut table, lib, vec![Stmt::Expr(bogus)]);
        let int = table.core().int_type();
        let x = table.add_variable(None, lib, "x", int);
        let value = b.string("five");
        let healthy = main_function(&mut table, lib, vec![AstBuilder::var(x, Some(value))]);
        let mut program = program(lib, vec![broken]);
        program.units.push(CompilationUnit {
            filename: "other.vela".to_string(),
            library: lib,
            declarations: vec![healthy],
        });
        let errors = typecheck_program(&table, &program).unwrap_err();
        let codes: Vec<_> = errors.iter().map(|error| error.code).collect();
        assert_eq!(
            codes,
            vec![TypeErrorCode::InternalError, TypeErrorCode::IncompatibleAssignment]
        );
    }
}
