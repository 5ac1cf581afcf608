//! Binary and unary operators.
//!
//! Numeric operators on `int`, `double` and `num` are typed directly; every
//! other operator is a call of the operator method on the left operand.

use crate::ast::{BinaryOp, Expr, Span, UnaryOp};
use crate::elements::CoreTypes;
use crate::types::Type;

use super::errors::TypeErrorCode;
use super::Checker;

impl Checker<'_> {
    pub(super) fn check_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr, span: Span) -> Type {
        if matches!(op, BinaryOp::And | BinaryOp::Or) {
            self.check_condition(left);
            // the right operand only runs when `left` is true for `&&`, false for `||`
            let restore = self.narrow_for(left, op == BinaryOp::And);
            self.check_condition(right);
            self.restore(restore);
            return self.types.core().bool_type();
        }
        let left_ty = self.check_expr(left);
        let right_ty = self.check_expr(right);
        self.binary_result(op, &left_ty, &right_ty, right.span, span)
    }

    /// Result type of `left op right` for already-typed operands.
    pub(super) fn binary_result(
        &mut self,
        op: BinaryOp,
        left_ty: &Type,
        right_ty: &Type,
        right_span: Span,
        span: Span,
    ) -> Type {
        let core = *self.types.core();
        match op {
            BinaryOp::Eq | BinaryOp::Ne => {
                self.check_equality(left_ty, right_ty, right_span);
                return core.bool_type();
            }
            BinaryOp::And | BinaryOp::Or => return core.bool_type(),
            _ => {}
        }
        if op.is_arithmetic() && core.is_numeric(left_ty) && core.is_numeric(right_ty) {
            return match op {
                BinaryOp::Div => core.double_type(),
                BinaryOp::TruncDiv => core.int_type(),
                _ if core.is_double(left_ty) || core.is_double(right_ty) => core.double_type(),
                _ if core.is_int(left_ty) && core.is_int(right_ty) => core.int_type(),
                _ => core.num_type(),
            };
        }
        if op.is_bitwise() && is_integral(&core, left_ty) && is_integral(&core, right_ty) {
            return core.int_type();
        }
        let Some(name) = op.method_name() else {
            return Type::dynamic();
        };
        self.check_operator(left_ty, name, &[(right_ty.clone(), right_span)], span)
    }

    /// `==` and `!=` check the right operand against the `==` method when
    /// the left operand has one, and are silent when it does not.
    fn check_equality(&mut self, left_ty: &Type, right_ty: &Type, right_span: Span) {
        if left_ty.is_dynamic() {
            return;
        }
        let Some(member) = self.types.lookup_member(left_ty, "==") else {
            return;
        };
        let signature = member.get_type(&self.types);
        let Some(parameter) = signature.as_function().and_then(|func| func.parameters.first()) else {
            return;
        };
        if !self.types.is_assignable(right_ty, parameter) {
            self.error(
                TypeErrorCode::IncompatibleArgument,
                right_span,
                format!(
                    "{} is not assignable to {}, the operand type of '=='",
                    self.show(right_ty),
                    self.show(parameter)
                ),
            );
        }
    }

    /// Call operator method `name` on `receiver_ty` with typed operands.
    pub(super) fn check_operator(
        &mut self,
        receiver_ty: &Type,
        name: &str,
        operands: &[(Type, Span)],
        span: Span,
    ) -> Type {
        if receiver_ty.is_dynamic() {
            return Type::dynamic();
        }
        let Some(member) = self.types.lookup_member(receiver_ty, name) else {
            if !receiver_ty.is_inferred() || self.options.report_inferred_member_misses {
                self.error(
                    TypeErrorCode::OperatorNotDefined,
                    span,
                    format!("operator '{name}' is not defined for {}", self.show(receiver_ty)),
                );
            }
            return Type::dynamic();
        };
        let signature = member.get_type(&self.types);
        let Some(func) = signature.as_function() else {
            return Type::dynamic();
        };
        for ((operand, operand_span), parameter) in operands.iter().zip(&func.parameters) {
            if !self.types.is_assignable(operand, parameter) {
                self.error(
                    TypeErrorCode::IncompatibleArgument,
                    *operand_span,
                    format!(
                        "{} is not assignable to {}, the operand type of '{name}'",
                        self.show(operand),
                        self.show(parameter)
                    ),
                );
            }
        }
        func.return_type.clone()
    }

    pub(super) fn check_unary(&mut self, op: UnaryOp, operand: &Expr, span: Span) -> Type {
        let core = *self.types.core();
        match op {
            UnaryOp::Not => {
                self.check_condition(operand);
                core.bool_type()
            }
            UnaryOp::Neg => {
                let ty = self.check_expr(operand);
                if core.is_numeric(&ty) {
                    ty.exact()
                } else {
                    self.check_operator(&ty, "unary-", &[], span)
                }
            }
            UnaryOp::BitNot => {
                let ty = self.check_expr(operand);
                if is_integral(&core, &ty) {
                    core.int_type()
                } else {
                    self.check_operator(&ty, "~", &[], span)
                }
            }
            UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec => {
                let Some(target) = self.check_target(operand) else {
                    return Type::dynamic();
                };
                let step = if matches!(op, UnaryOp::PreInc | UnaryOp::PostInc) {
                    BinaryOp::Add
                } else {
                    BinaryOp::Sub
                };
                let updated = self.binary_result(step, &target.ty, &core.int_type(), span, span);
                let result = self.assign_to(&target, updated, span);
                match op {
                    UnaryOp::PostInc | UnaryOp::PostDec => target.ty,
                    _ => result,
                }
            }
        }
    }
}

/// Bit operations on `num` are taken to mean `int`.
fn is_integral(core: &CoreTypes, ty: &Type) -> bool {
    core.is_int(ty) || core.is_num(ty)
}
