//! Checker state: the enclosing-declaration context, the overlay of
//! refined variable types and error reporting.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::trace;

use crate::ast::{NodeId, Span};
use crate::config::CheckerOptions;
use crate::elements::{Element, ElementId, ElementTable, LibraryId};
use crate::types::{SubclassIndex, Type, Types};

use super::errors::{DiagnosticSink, TypeError, TypeErrorCode};
use super::ProgramState;

/// Where the checker currently is. Replaced wholesale when entering a
/// class or function body and put back on the way out.
#[derive(Debug, Clone, Default)]
pub(super) struct Context {
    pub class: Option<ElementId>,
    /// Declared return type of the enclosing function, if any
    pub return_type: Option<Type>,
    pub is_static: bool,
}

/// Overlay entries replaced by a narrowing, replayed in reverse to undo it.
#[derive(Debug, Default)]
pub(super) struct Restore {
    entries: Vec<(ElementId, Option<Type>)>,
}

impl Restore {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Checks one compilation unit.
pub(crate) struct Checker<'a> {
    pub(super) types: Types<'a>,
    pub(super) elements: &'a ElementTable,
    pub(super) options: &'a CheckerOptions,
    pub(super) subclasses: &'a SubclassIndex,
    pub(super) library: LibraryId,
    pub(super) context: Context,
    state: &'a mut ProgramState,
    sink: &'a mut dyn DiagnosticSink,
    /// Current types of variables that differ from the declared ones
    locals: HashMap<ElementId, Type>,
    /// One frame per block; narrowings that outlive their statement
    scopes: Vec<Restore>,
}

impl<'a> Checker<'a> {
    pub fn new(
        elements: &'a ElementTable,
        subclasses: &'a SubclassIndex,
        options: &'a CheckerOptions,
        state: &'a mut ProgramState,
        sink: &'a mut dyn DiagnosticSink,
        library: LibraryId,
    ) -> Self {
        Checker {
            types: Types::new(elements),
            elements,
            options,
            subclasses,
            library,
            context: Context::default(),
            state,
            sink,
            locals: HashMap::new(),
            scopes: Vec::new(),
        }
    }

    pub fn error(&mut self, code: TypeErrorCode, span: Span, message: impl Into<String>) {
        self.report(TypeError::new(code, span, message));
    }

    pub fn report(&mut self, error: TypeError) {
        self.sink.report(error);
    }

    /// Render a type for a message.
    pub fn show(&self, ty: &Type) -> String {
        format!("'{}'", ty.display(self.elements))
    }

    pub fn name(&self, id: ElementId) -> &'a str {
        self.elements.name(id)
    }

    /// Elements reachable from a validated unit are always in the table.
    pub fn element(&self, id: ElementId) -> &'a Element {
        self.elements.get(id)
    }

    pub fn record(&mut self, node: NodeId, ty: Type) {
        self.state.types.insert(node, ty);
    }

    /// Returns `true` the first time a class is reported as abstract.
    pub fn first_abstract_report(&mut self, class: ElementId) -> bool {
        self.state.diagnosed_abstract.insert(class)
    }

    pub fn this_type(&self) -> Option<Type> {
        self.context.class.map(|class| self.elements.this_type(class))
    }

    /// Run `f` with `context` in place, restoring the previous one after.
    pub fn with_context<R>(&mut self, context: Context, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = std::mem::replace(&mut self.context, context);
        let result = f(self);
        self.context = saved;
        result
    }

    /// Current type of a variable or parameter.
    pub fn variable_type(&self, variable: ElementId) -> Type {
        self.locals
            .get(&variable)
            .cloned()
            .unwrap_or_else(|| self.elements.get(variable).ty.clone())
    }

    pub fn is_refined(&self, variable: ElementId) -> bool {
        self.locals.contains_key(&variable)
    }

    /// Permanently refine a variable, e.g. from its initializer.
    pub fn set_variable_type(&mut self, variable: ElementId, ty: Type) {
        self.locals.insert(variable, ty);
    }

    /// Apply narrowings, returning the record that undoes them.
    pub fn narrow(&mut self, narrowings: IndexMap<ElementId, Type>) -> Restore {
        let mut restore = Restore::default();
        for (variable, ty) in narrowings {
            trace!(
                variable = self.name(variable),
                ty = %ty.display(self.elements),
                "narrowing"
            );
            let previous = self.locals.insert(variable, ty);
            restore.entries.push((variable, previous));
        }
        restore
    }

    pub fn restore(&mut self, restore: Restore) {
        for (variable, previous) in restore.entries.into_iter().rev() {
            match previous {
                Some(ty) => self.locals.insert(variable, ty),
                None => self.locals.remove(&variable),
            };
        }
    }

    pub fn enter_block(&mut self) {
        self.scopes.push(Restore::default());
    }

    pub fn exit_block(&mut self) {
        if let Some(scope) = self.scopes.pop() {
            self.restore(scope);
        }
    }

    /// Keep a narrowing alive until the enclosing block ends.
    pub fn keep_until_block_end(&mut self, restore: Restore) {
        match self.scopes.last_mut() {
            Some(scope) => scope.entries.extend(restore.entries),
            None => self.restore(restore),
        }
    }
}
