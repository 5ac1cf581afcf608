//! Flow-sensitive refinement from `is` tests.
//!
//! A condition implies a set of variable types when it is known to be true
//! (positive) or false (negative). `a is T && b is U` narrows both when
//! true; `!(a is T) || b is U` narrows `a` and negates `b` when false.

use indexmap::IndexMap;
use tracing::trace;

use crate::ast::{BinaryOp, Expr, ExprKind, UnaryOp};
use crate::elements::{ElementId, ElementKind};
use crate::types::Type;

use super::environment::Restore;
use super::Checker;

impl Checker<'_> {
    /// Variable types implied by `condition` evaluating to `positive`.
    pub(super) fn narrowings(&self, condition: &Expr, positive: bool) -> IndexMap<ElementId, Type> {
        let mut narrowings = IndexMap::new();
        self.collect_narrowings(condition, positive, &mut narrowings);
        narrowings
    }

    fn collect_narrowings(&self, expr: &Expr, positive: bool, out: &mut IndexMap<ElementId, Type>) {
        match &expr.kind {
            ExprKind::Is { expr: subject, ty, negated } => {
                if *negated == positive {
                    return;
                }
                let Some(variable) = subject.identifier_element() else {
                    return;
                };
                if !self.is_narrowable(variable) {
                    return;
                }
                let narrowed = ty.inferred();
                let combined = match out.get(&variable) {
                    Some(previous) => self.types.narrow_union(previous, &narrowed),
                    None => narrowed,
                };
                out.insert(variable, combined);
            }
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand,
            } => self.collect_narrowings(operand, !positive, out),
            ExprKind::Binary {
                op: BinaryOp::And,
                left,
                right,
            } if positive => {
                self.collect_narrowings(left, true, out);
                self.collect_narrowings(right, true, out);
            }
            ExprKind::Binary {
                op: BinaryOp::Or,
                left,
                right,
            } if !positive => {
                self.collect_narrowings(left, false, out);
                self.collect_narrowings(right, false, out);
            }
            _ => {}
        }
    }

    fn is_narrowable(&self, id: ElementId) -> bool {
        self.elements.lookup(id).is_some_and(|element| {
            matches!(
                element.kind,
                ElementKind::Variable | ElementKind::Parameter | ElementKind::Field
            )
        })
    }

    /// Apply the narrowings of `condition`; undo with [`Checker::restore`].
    pub(super) fn narrow_for(&mut self, condition: &Expr, positive: bool) -> Restore {
        let narrowings = self.narrowings(condition, positive);
        if !narrowings.is_empty() {
            trace!(positive, count = narrowings.len(), "narrowing variables");
        }
        self.narrow(narrowings)
    }
}
