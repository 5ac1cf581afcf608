//! Statements and function bodies.

use tracing::debug;

use crate::ast::{Expr, FunctionDecl, Span, Stmt, SwitchCase, VariableDecl};
use crate::elements::ElementKind;
use crate::types::Type;

use super::environment::Context;
use super::errors::TypeErrorCode;
use super::Checker;

impl Checker<'_> {
    /// Check a top-level function.
    pub fn check_function(&mut self, func: &FunctionDecl) {
        let context = Context {
            class: None,
            return_type: Some(self.declared_return_type(func)),
            is_static: true,
        };
        debug!(function = self.name(func.element), "checking function");
        self.with_context(context, |checker| checker.check_function_body(func));
    }

    /// Check a function declared inside another body; it sees the same
    /// `this` as its surroundings.
    pub(super) fn check_nested_function(&mut self, func: &FunctionDecl) {
        let context = Context {
            return_type: Some(self.declared_return_type(func)),
            ..self.context.clone()
        };
        self.with_context(context, |checker| checker.check_function_body(func));
    }

    pub fn check_top_level_variable(&mut self, decl: &VariableDecl) {
        let context = Context {
            class: None,
            return_type: None,
            is_static: true,
        };
        self.with_context(context, |checker| checker.check_variable(decl));
    }

    pub(super) fn declared_return_type(&self, func: &FunctionDecl) -> Type {
        let element = self.element(func.element);
        if element.kind == ElementKind::Constructor {
            return Type::void();
        }
        element
            .ty
            .as_function()
            .map_or_else(Type::dynamic, |signature| signature.return_type.clone())
    }

    pub(super) fn check_function_body(&mut self, func: &FunctionDecl) {
        if let Some(body) = &func.body {
            self.check_block(body);
        }
    }

    /// Check a block in its own scope. Returns whether control never falls
    /// off its end.
    pub(super) fn check_block(&mut self, statements: &[Stmt]) -> bool {
        self.enter_block();
        let mut exits = false;
        for stmt in statements {
            exits |= self.check_stmt(stmt);
        }
        self.exit_block();
        exits
    }

    fn check_stmt(&mut self, stmt: &Stmt) -> bool {
        match stmt {
            Stmt::Expr(expr) => {
                self.check_expr(expr);
                false
            }
            Stmt::Var(decl) => {
                self.check_variable(decl);
                false
            }
            Stmt::Function(func) => {
                self.check_nested_function(func);
                false
            }
            Stmt::Return { value, span } => {
                self.check_return(value.as_ref(), *span);
                true
            }
            Stmt::Throw { value, .. } => {
                self.check_expr(value);
                true
            }
            Stmt::If {
                condition,
                then_block,
                else_block,
                ..
            } => self.check_if(condition, then_block, else_block.as_deref()),
            Stmt::While { condition, body, .. } => {
                self.check_condition(condition);
                let restore = self.narrow_for(condition, true);
                self.check_block(body);
                self.restore(restore);
                false
            }
            Stmt::Block { statements, .. } => self.check_block(statements),
            Stmt::Switch { subject, cases, .. } => {
                self.check_switch(subject, cases);
                false
            }
        }
    }

    /// Check a condition, which must be a `bool`.
    pub(super) fn check_condition(&mut self, condition: &Expr) {
        let ty = self.check_expr(condition);
        let bool_type = self.types.core().bool_type();
        if !self.types.is_assignable(&ty, &bool_type) {
            self.error(
                TypeErrorCode::ConditionNotBool,
                condition.span,
                format!("conditions must be 'bool', found {}", self.show(&ty)),
            );
        }
    }

    fn check_if(&mut self, condition: &Expr, then_block: &[Stmt], else_block: Option<&[Stmt]>) -> bool {
        self.check_condition(condition);

        let restore = self.narrow_for(condition, true);
        let then_exits = self.check_block(then_block);
        self.restore(restore);

        let else_exits = match else_block {
            Some(block) => {
                let restore = self.narrow_for(condition, false);
                let exits = self.check_block(block);
                self.restore(restore);
                exits
            }
            None => false,
        };

        // Code after the `if` only runs through the branch that falls through
        match (then_exits, else_exits) {
            (true, false) => {
                let restore = self.narrow_for(condition, false);
                self.keep_until_block_end(restore);
            }
            (false, true) => {
                let restore = self.narrow_for(condition, true);
                self.keep_until_block_end(restore);
            }
            _ => {}
        }
        then_exits && else_exits
    }

    fn check_return(&mut self, value: Option<&Expr>, span: Span) {
        let expected = self.context.return_type.clone();
        let Some(value) = value else {
            return;
        };
        let ty = self.check_expr(value);
        let Some(expected) = expected else {
            return;
        };
        if expected.is_void() {
            if !ty.is_dynamic() && !ty.is_void() {
                self.error(
                    TypeErrorCode::IncompatibleReturn,
                    value.span,
                    format!("cannot return {} from a function returning 'void'", self.show(&ty)),
                );
            }
        } else if !self.types.is_assignable(&ty, &expected) {
            let span = if value.span.is_empty() { span } else { value.span };
            self.error(
                TypeErrorCode::IncompatibleReturn,
                span,
                format!(
                    "{} is not assignable to the return type {}",
                    self.show(&ty),
                    self.show(&expected)
                ),
            );
        }
    }

    fn check_switch(&mut self, subject: &Expr, cases: &[SwitchCase]) {
        let subject_ty = self.check_expr(subject);
        for case in cases {
            for label in &case.labels {
                let ty = self.check_expr(label);
                if !self.types.is_assignable(&ty, &subject_ty) {
                    self.error(
                        TypeErrorCode::IncompatibleCaseExpression,
                        label.span,
                        format!(
                            "case expression {} is not assignable to the switch type {}",
                            self.show(&ty),
                            self.show(&subject_ty)
                        ),
                    );
                }
            }
            self.check_block(&case.body);
        }
    }

    /// Check a variable or field declaration's initializer.
    pub(super) fn check_variable(&mut self, decl: &VariableDecl) {
        let element = self.element(decl.element);
        let Some(initializer) = &decl.initializer else {
            return;
        };
        let value_ty = self.check_expr(initializer);
        let declared = self.variable_type(decl.element);
        if declared.is_inferred() {
            if self.options.infer_local_types && !value_ty.is_dynamic() && !value_ty.is_void() {
                self.set_variable_type(decl.element, value_ty.inferred());
            }
            return;
        }
        if !self.types.is_assignable(&value_ty, &declared) {
            self.error(
                TypeErrorCode::IncompatibleAssignment,
                initializer.span,
                format!(
                    "{} is not assignable to {}, the type of '{}'",
                    self.show(&value_ty),
                    self.show(&declared),
                    element.name
                ),
            );
        }
    }
}
