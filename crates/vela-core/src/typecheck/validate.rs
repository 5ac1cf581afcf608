//! Up-front validation of the element references in a unit.
//!
//! Every element the unit mentions is checked, and so is everything the
//! table stores for it: members, constructors, parameters, supertypes,
//! bounds and declared types, transitively.

use std::cell::RefCell;
use std::collections::HashSet;

use crate::ast::*;
use crate::elements::{Element, ElementDetail, ElementId, ElementKind, ElementTable};
use crate::types::{FunctionType, Type, TypeRepr};

use super::errors::InternalError;

pub(super) fn validate_unit(elements: &ElementTable, unit: &CompilationUnit) -> Result<(), InternalError> {
    let validator = Validator {
        elements,
        checked: RefCell::new(HashSet::new()),
    };
    for decl in &unit.declarations {
        match decl {
            Declaration::Class(class) => {
                let element = validator.element(class.element)?;
                if element.kind != ElementKind::Class {
                    return Err(InternalError::NotAClass {
                        name: element.name.clone(),
                    });
                }
                for member in &class.members {
                    match member {
                        MemberDecl::Method(func) => validator.function(func)?,
                        MemberDecl::Field(field) => validator.variable(field)?,
                    }
                }
            }
            Declaration::Function(func) => validator.function(func)?,
            Declaration::Variable(var) => validator.variable(var)?,
        }
    }
    Ok(())
}

struct Validator<'a> {
    elements: &'a ElementTable,
    checked: RefCell<HashSet<ElementId>>,
}

impl<'a> Validator<'a> {
    fn element(&self, id: ElementId) -> Result<&'a Element, InternalError> {
        let element = self
            .elements
            .lookup(id)
            .ok_or(InternalError::UnknownElement(id))?;
        let first_visit = self.checked.borrow_mut().insert(id);
        if first_visit {
            self.contents(element)?;
        }
        Ok(element)
    }

    /// Ids and types the table stores for `element`.
    fn contents(&self, element: &Element) -> Result<(), InternalError> {
        let mut ids: Vec<ElementId> = element.enclosing.into_iter().collect();
        let mut types: Vec<&Type> = vec![&element.ty];
        match &element.detail {
            ElementDetail::None | ElementDetail::Parameter(_) => {}
            ElementDetail::Class(info) => {
                ids.extend(&info.type_parameters);
                ids.extend(&info.members);
                ids.extend(&info.constructors);
                types.extend(info.supertype.iter().chain(&info.interfaces).chain(&info.default_class));
            }
            ElementDetail::Method(info) => ids.extend(&info.parameters),
            ElementDetail::Field(info) => ids.extend(info.getter.iter().chain(&info.setter)),
            ElementDetail::TypeVariable(info) => types.extend(&info.bound),
            ElementDetail::Alias(info) => {
                ids.extend(&info.type_parameters);
                self.function_type(&info.function_type)?;
            }
        }
        for id in ids {
            if !self.elements.contains(id) {
                return Err(InternalError::DanglingReference {
                    owner: element.name.clone(),
                    id,
                });
            }
            self.element(id)?;
        }
        types.into_iter().try_for_each(|ty| self.ty(ty))
    }

    fn function(&self, func: &FunctionDecl) -> Result<(), InternalError> {
        let element = self.element(func.element)?;
        if element.ty.as_function().is_none() {
            return Err(InternalError::MissingSignature {
                name: element.name.clone(),
            });
        }
        self.ty(&element.ty)?;
        if let Some(body) = &func.body {
            self.block(body)?;
        }
        Ok(())
    }

    fn variable(&self, var: &VariableDecl) -> Result<(), InternalError> {
        self.element(var.element)?;
        if let Some(init) = &var.initializer {
            self.expr(init)?;
        }
        Ok(())
    }

    fn block(&self, stmts: &[Stmt]) -> Result<(), InternalError> {
        stmts.iter().try_for_each(|stmt| self.stmt(stmt))
    }

    fn stmt(&self, stmt: &Stmt) -> Result<(), InternalError> {
        match stmt {
            Stmt::Expr(expr) | Stmt::Throw { value: expr, .. } => self.expr(expr),
            Stmt::Var(var) => self.variable(var),
            Stmt::Function(func) => self.function(func),
            Stmt::Return { value, .. } => value.iter().try_for_each(|value| self.expr(value)),
            Stmt::If {
                condition,
                then_block,
                else_block,
                ..
            } => {
                self.expr(condition)?;
                self.block(then_block)?;
                else_block.iter().try_for_each(|block| self.block(block))
            }
            Stmt::While { condition, body, .. } => {
                self.expr(condition)?;
                self.block(body)
            }
            Stmt::Block { statements, .. } => self.block(statements),
            Stmt::Switch { subject, cases, .. } => {
                self.expr(subject)?;
                for case in cases {
                    case.labels.iter().try_for_each(|label| self.expr(label))?;
                    self.block(&case.body)?;
                }
                Ok(())
            }
        }
    }

    fn ty(&self, ty: &Type) -> Result<(), InternalError> {
        match ty.repr() {
            TypeRepr::Dynamic | TypeRepr::Void => Ok(()),
            TypeRepr::Interface(iface) | TypeRepr::FunctionAlias(iface) => {
                self.element(iface.element)?;
                iface.arguments.iter().try_for_each(|arg| self.ty(arg))
            }
            TypeRepr::Function(func) => self.function_type(func),
            TypeRepr::Variable(variable) => self.element(*variable).map(|_| ()),
            TypeRepr::Union(members) => members.iter().try_for_each(|member| self.ty(member)),
        }
    }

    fn function_type(&self, func: &FunctionType) -> Result<(), InternalError> {
        func.element.iter().try_for_each(|id| self.element(*id).map(|_| ()))?;
        func.parameters
            .iter()
            .chain(func.optional.values())
            .chain(func.named.values())
            .chain(func.rest.iter())
            .try_for_each(|param| self.ty(param))?;
        self.ty(&func.return_type)
    }

    fn arguments(&self, arguments: &[Argument]) -> Result<(), InternalError> {
        arguments.iter().try_for_each(|arg| self.expr(&arg.value))
    }

    fn expr(&self, expr: &Expr) -> Result<(), InternalError> {
        match &expr.kind {
            ExprKind::Literal(_) | ExprKind::This | ExprKind::Super => Ok(()),
            ExprKind::Identifier { element, .. } => {
                element.iter().try_for_each(|id| self.element(*id).map(|_| ()))
            }
            ExprKind::Binary { left, right, .. } => {
                self.expr(left)?;
                self.expr(right)
            }
            ExprKind::Unary { operand, .. } => self.expr(operand),
            ExprKind::Assign { target, value, .. } => {
                self.expr(target)?;
                self.expr(value)
            }
            ExprKind::PropertyAccess { receiver, .. } => self.expr(receiver),
            ExprKind::Index { receiver, index } => {
                self.expr(receiver)?;
                self.expr(index)
            }
            ExprKind::MethodInvocation {
                receiver,
                element,
                arguments,
                ..
            } => {
                receiver.iter().try_for_each(|receiver| self.expr(receiver))?;
                element.iter().try_for_each(|id| self.element(*id).map(|_| ()))?;
                self.arguments(arguments)
            }
            ExprKind::Call { callee, arguments } => {
                self.expr(callee)?;
                self.arguments(arguments)
            }
            ExprKind::New { ty, arguments, .. } => {
                self.ty(ty)?;
                self.arguments(arguments)
            }
            ExprKind::Is { expr, ty, .. } | ExprKind::As { expr, ty } => {
                self.ty(ty)?;
                self.expr(expr)
            }
            ExprKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => {
                self.expr(condition)?;
                self.expr(then_expr)?;
                self.expr(else_expr)
            }
            ExprKind::ListLiteral {
                type_argument,
                elements,
            } => {
                type_argument.iter().try_for_each(|ty| self.ty(ty))?;
                elements.iter().try_for_each(|element| self.expr(element))
            }
            ExprKind::MapLiteral {
                type_argument,
                entries,
            } => {
                type_argument.iter().try_for_each(|ty| self.ty(ty))?;
                entries.iter().try_for_each(|entry| {
                    self.expr(&entry.key)?;
                    self.expr(&entry.value)
                })
            }
            ExprKind::Function(func) => self.function(func),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{LibraryId, Modifiers};

    #[test]
    fn test_class_decl_must_name_a_class() {
        let mut table = ElementTable::new();
        let lib = table.new_library();
        let x = table.add_variable(None, lib, "x", Type::dynamic());
        let unit = AstBuilder::unit(lib, vec![AstBuilder::class(x, vec![])]);
        assert_eq!(
            validate_unit(&table, &unit),
            Err(InternalError::NotAClass {
                name: "x".to_string()
            })
        );
    }

    #[test]
    fn test_function_needs_signature() {
        let mut table = ElementTable::new();
        let lib = table.new_library();
        let f = table.add_variable(None, lib, "f", Type::dynamic());
        let unit = AstBuilder::unit(lib, vec![Declaration::Function(AstBuilder::method(f, Some(vec![])))]);
        assert!(matches!(
            validate_unit(&table, &unit),
            Err(InternalError::MissingSignature { .. })
        ));
    }

    #[test]
    fn test_valid_unit() {
        let mut table = ElementTable::new();
        let lib = LibraryId(1);
        let f = table.add_method(None, lib, "f", vec![], Type::void(), Modifiers::default());
        let mut b = AstBuilder::new();
        let list = b.list(Some(table.core().int_type()), vec![]);
        let unit = AstBuilder::unit(
            lib,
            vec![Declaration::Function(AstBuilder::method(f, Some(vec![Stmt::Expr(list)])))],
        );
        assert_eq!(validate_unit(&table, &unit), Ok(()));
    }

    #[test]
    fn test_dangling_member_in_table() {
        let mut table = ElementTable::new();
        let lib = table.new_library();
        let a = table.add_class("A", lib);
        if let ElementDetail::Class(info) = &mut table.get_mut(a).detail {
            info.members.push(ElementId(99_999));
        }
        let x = table.add_variable(None, lib, "x", Type::interface(a, vec![]));
        let unit = AstBuilder::unit(lib, vec![Declaration::Variable(AstBuilder::field(x, None))]);
        assert_eq!(
            validate_unit(&table, &unit),
            Err(InternalError::DanglingReference {
                owner: "A".to_string(),
                id: ElementId(99_999),
            })
        );
    }

    #[test]
    fn test_dangling_supertype_in_table() {
        let mut table = ElementTable::new();
        let lib = table.new_library();
        let a = table.add_class("A", lib);
        table.set_supertype(a, Type::interface(ElementId(4_242), vec![]));
        let unit = AstBuilder::unit(lib, vec![AstBuilder::class(a, vec![])]);
        assert_eq!(
            validate_unit(&table, &unit),
            Err(InternalError::UnknownElement(ElementId(4_242)))
        );
    }
}
