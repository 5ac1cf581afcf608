//! Expression checking: literals, names, member access, assignment and
//! collection literals.

use std::collections::HashSet;

use crate::ast::{BinaryOp, Expr, ExprKind, Literal, MapEntry, Span};
use crate::elements::{ElementId, ElementKind};
use crate::types::{InterfaceType, Member, Type};

use super::errors::TypeErrorCode;
use super::Checker;

/// Where an assignment stores its value.
pub(super) struct Target {
    /// Set when the target is a local variable or parameter
    pub variable: Option<ElementId>,
    pub ty: Type,
}

impl<'a> Checker<'a> {
    /// Type `expr`, record the result and return it.
    pub fn check_expr(&mut self, expr: &Expr) -> Type {
        let ty = self.compute_expr(expr);
        self.record(expr.id, ty.clone());
        ty
    }

    fn compute_expr(&mut self, expr: &Expr) -> Type {
        let span = expr.span;
        match &expr.kind {
            ExprKind::Literal(literal) => self.literal_type(literal),
            ExprKind::Identifier { name, element } => self.check_identifier(name, *element, span),
            ExprKind::This => self.check_this(span),
            ExprKind::Super => self.check_super(span),
            ExprKind::Binary { op, left, right } => self.check_binary(*op, left, right, span),
            ExprKind::Unary { op, operand } => self.check_unary(*op, operand, span),
            ExprKind::Assign { op, target, value } => self.check_assign(*op, target, value, span),
            ExprKind::PropertyAccess { receiver, name } => {
                self.check_property_access(receiver, name, span)
            }
            ExprKind::Index { receiver, index } => self.check_index(receiver, index, span),
            ExprKind::MethodInvocation {
                receiver,
                name,
                element,
                arguments,
            } => self.check_method_invocation(receiver.as_deref(), name, *element, arguments, span),
            ExprKind::Call { callee, arguments } => self.check_call(callee, arguments, span),
            ExprKind::New {
                ty,
                constructor,
                arguments,
            } => self.check_new(ty, constructor.as_deref(), arguments, span),
            ExprKind::Is { expr, .. } => {
                self.check_expr(expr);
                self.types.core().bool_type()
            }
            ExprKind::As { expr, ty } => {
                self.check_expr(expr);
                ty.clone()
            }
            ExprKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => self.check_conditional(condition, then_expr, else_expr),
            ExprKind::ListLiteral {
                type_argument,
                elements,
            } => self.check_list_literal(type_argument.as_ref(), elements),
            ExprKind::MapLiteral {
                type_argument,
                entries,
            } => self.check_map_literal(type_argument.as_ref(), entries),
            ExprKind::Function(func) => {
                self.check_nested_function(func);
                self.element(func.element).ty.clone()
            }
        }
    }

    fn literal_type(&self, literal: &Literal) -> Type {
        let core = self.types.core();
        match literal {
            Literal::Int(_) => core.int_type(),
            Literal::Double(_) => core.double_type(),
            Literal::String(_) => core.string_type(),
            Literal::Bool(_) => core.bool_type(),
            Literal::Null => Type::dynamic(),
        }
    }

    pub(super) fn check_identifier(&mut self, name: &str, element: Option<ElementId>, span: Span) -> Type {
        let Some(id) = element else {
            self.error(TypeErrorCode::CannotResolve, span, format!("cannot resolve '{name}'"));
            return Type::dynamic();
        };
        match self.element(id).kind {
            ElementKind::Variable | ElementKind::Parameter => self.variable_type(id),
            ElementKind::Field | ElementKind::Method => self.check_unqualified_member(id, span),
            // Class names only mean something as receivers of static access
            ElementKind::Class
            | ElementKind::Constructor
            | ElementKind::TypeVariable
            | ElementKind::FunctionAlias => Type::dynamic(),
        }
    }

    /// A field or method named without a receiver.
    fn check_unqualified_member(&mut self, id: ElementId, span: Span) -> Type {
        if self.is_refined(id) {
            return self.variable_type(id);
        }
        let element = self.element(id);
        let in_class = element
            .enclosing
            .is_some_and(|owner| self.elements.lookup(owner).is_some_and(|e| e.kind == ElementKind::Class));
        if !in_class || element.is_static() {
            return element.ty.clone();
        }
        let this_type = match self.this_type() {
            Some(this_type) if !self.context.is_static => this_type,
            _ => {
                self.error(
                    TypeErrorCode::InstanceMemberAccessedStatically,
                    span,
                    format!("instance member '{}' cannot be accessed from a static context", element.name),
                );
                return Type::dynamic();
            }
        };
        match self.types.lookup_member(&this_type, &element.name) {
            Some(member) => self.read_member(&member, span),
            None => element.ty.clone(),
        }
    }

    fn check_this(&mut self, span: Span) -> Type {
        match self.this_type() {
            Some(this_type) if !self.context.is_static => this_type,
            _ => {
                self.error(
                    TypeErrorCode::ThisOutsideInstance,
                    span,
                    "'this' is only available inside instance members",
                );
                Type::dynamic()
            }
        }
    }

    fn check_super(&mut self, span: Span) -> Type {
        let Some(this_type) = self.this_type().filter(|_| !self.context.is_static) else {
            self.error(
                TypeErrorCode::ThisOutsideInstance,
                span,
                "'super' is only available inside instance members",
            );
            return Type::dynamic();
        };
        this_type
            .as_interface()
            .and_then(|iface| self.types.supertype(iface))
            .map_or_else(|| self.types.core().object_type(), Type::from)
    }

    /// The class named by `receiver` in `C.member`, if it names one.
    pub(super) fn class_reference(&mut self, receiver: &Expr) -> Option<ElementId> {
        let id = receiver.identifier_element()?;
        if self.elements.lookup(id)?.kind != ElementKind::Class {
            return None;
        }
        self.record(receiver.id, Type::dynamic());
        Some(id)
    }

    /// Resolve `C.name` against the own members of class `C`.
    pub(super) fn static_member(&mut self, class: ElementId, name: &str, span: Span) -> Option<Member> {
        let Some(id) = self.elements.own_member(class, name) else {
            self.error(
                TypeErrorCode::MemberNotFound,
                span,
                format!("class '{}' has no static member '{name}'", self.name(class)),
            );
            return None;
        };
        if !self.element(id).is_static() {
            self.error(
                TypeErrorCode::InstanceMemberAccessedStatically,
                span,
                format!("instance member '{name}' cannot be accessed through class '{}'", self.name(class)),
            );
        }
        Some(Member::new(InterfaceType::new(class, Vec::new()), id))
    }

    /// Resolve `receiver.name` for a receiver of type `receiver_ty`.
    ///
    /// `None` means the member is unknown: either an error was reported or
    /// the receiver type is too imprecise to tell.
    pub(super) fn resolve_member(&mut self, receiver_ty: &Type, name: &str, span: Span) -> Option<Member> {
        if receiver_ty.is_dynamic() {
            return None;
        }
        if let Some(member) = self.types.lookup_member(receiver_ty, name) {
            let element = member.element(&self.types);
            if element.is_private() && element.library != self.library {
                self.error(
                    TypeErrorCode::MemberNotFound,
                    span,
                    format!("'{name}' is private to the library of '{}'", self.name(member.holder.element)),
                );
                return None;
            }
            if member.is_static(&self.types) {
                self.error(
                    TypeErrorCode::StaticMemberAccessedThroughInstance,
                    span,
                    format!(
                        "static member '{name}' of '{}' cannot be accessed through an instance",
                        self.name(member.holder.element)
                    ),
                );
            }
            return Some(member);
        }
        if receiver_ty.is_inferred() {
            if let Some(iface) = self.types.interface_view(receiver_ty)
                && let Some(member) = self.subclasses.lookup_subtype_member(&self.types, iface.element, name)
            {
                return Some(member);
            }
            if !self.options.report_inferred_member_misses {
                return None;
            }
        }
        self.error(
            TypeErrorCode::MemberNotFound,
            span,
            format!("'{name}' is not defined for {}", self.show(receiver_ty)),
        );
        None
    }

    pub(super) fn read_member(&mut self, member: &Member, span: Span) -> Type {
        match member.getter_type(&self.types) {
            Some(ty) => ty,
            None => {
                self.error(
                    TypeErrorCode::FieldHasNoGetter,
                    span,
                    format!("'{}' has a setter but no getter", member.name(&self.types)),
                );
                Type::dynamic()
            }
        }
    }

    fn check_property_access(&mut self, receiver: &Expr, name: &str, span: Span) -> Type {
        if let Some(class) = self.class_reference(receiver) {
            return match self.static_member(class, name, span) {
                Some(member) => self.read_member(&member, span),
                None => Type::dynamic(),
            };
        }
        let receiver_ty = self.check_expr(receiver);
        match self.resolve_member(&receiver_ty, name, span) {
            Some(member) => self.read_member(&member, span),
            None => Type::dynamic(),
        }
    }

    fn check_index(&mut self, receiver: &Expr, index: &Expr, span: Span) -> Type {
        let receiver_ty = self.check_expr(receiver);
        let index_ty = self.check_expr(index);
        self.check_operator(&receiver_ty, "[]", &[(index_ty, index.span)], span)
    }

    /// Type the left-hand side of an assignment. `None` after an error.
    pub(super) fn check_target(&mut self, target: &Expr) -> Option<Target> {
        let resolved = self.resolve_target(target);
        if let Some(resolved) = &resolved {
            self.record(target.id, resolved.ty.clone());
        }
        resolved
    }

    fn resolve_target(&mut self, target: &Expr) -> Option<Target> {
        let span = target.span;
        match &target.kind {
            ExprKind::Identifier { name, element } => {
                let Some(id) = *element else {
                    self.error(TypeErrorCode::CannotResolve, span, format!("cannot resolve '{name}'"));
                    return None;
                };
                match self.element(id).kind {
                    ElementKind::Variable | ElementKind::Parameter => Some(Target {
                        variable: Some(id),
                        ty: self.variable_type(id),
                    }),
                    ElementKind::Field => self.unqualified_field_target(id, span),
                    _ => {
                        self.error(
                            TypeErrorCode::NotAssignableTarget,
                            span,
                            format!("cannot assign to {} '{name}'", self.element(id).kind.as_str()),
                        );
                        None
                    }
                }
            }
            ExprKind::PropertyAccess { receiver, name } => {
                let member = match self.class_reference(receiver) {
                    Some(class) => self.static_member(class, name, span),
                    None => {
                        let receiver_ty = self.check_expr(receiver);
                        if receiver_ty.is_dynamic() {
                            return Some(Target {
                                variable: None,
                                ty: Type::dynamic(),
                            });
                        }
                        self.resolve_member(&receiver_ty, name, span)
                    }
                };
                match member {
                    Some(member) => self.member_target(&member, span),
                    None => Some(Target {
                        variable: None,
                        ty: Type::dynamic(),
                    }),
                }
            }
            ExprKind::Index { receiver, index } => {
                let receiver_ty = self.check_expr(receiver);
                let index_ty = self.check_expr(index);
                self.index_target(&receiver_ty, index_ty, index.span, span)
            }
            _ => {
                self.check_expr(target);
                self.error(
                    TypeErrorCode::NotAssignableTarget,
                    span,
                    "expression cannot be assigned to",
                );
                None
            }
        }
    }

    fn unqualified_field_target(&mut self, id: ElementId, span: Span) -> Option<Target> {
        let element = self.element(id);
        let holder = match element.enclosing {
            Some(class) if element.is_static() => Some(Type::interface(class, Vec::new())),
            Some(_) if !self.context.is_static => self.this_type(),
            _ => None,
        };
        let Some(holder) = holder else {
            self.error(
                TypeErrorCode::InstanceMemberAccessedStatically,
                span,
                format!("instance member '{}' cannot be accessed from a static context", element.name),
            );
            return None;
        };
        match self.types.lookup_member(&holder, &element.name) {
            Some(member) => self.member_target(&member, span),
            None => Some(Target {
                variable: None,
                ty: element.ty.clone(),
            }),
        }
    }

    fn member_target(&mut self, member: &Member, span: Span) -> Option<Target> {
        match member.setter_type(&self.types) {
            Some(ty) => Some(Target { variable: None, ty }),
            None => {
                let name = member.name(&self.types);
                let message = if member.element(&self.types).is_field() {
                    format!("'{name}' is final or has no setter")
                } else {
                    format!("method '{name}' cannot be assigned to")
                };
                self.error(TypeErrorCode::FieldHasNoSetter, span, message);
                None
            }
        }
    }

    fn index_target(&mut self, receiver_ty: &Type, index_ty: Type, index_span: Span, span: Span) -> Option<Target> {
        if receiver_ty.is_dynamic() {
            return Some(Target {
                variable: None,
                ty: Type::dynamic(),
            });
        }
        let Some(member) = self.types.lookup_member(receiver_ty, "[]=") else {
            if receiver_ty.is_inferred() && !self.options.report_inferred_member_misses {
                return Some(Target {
                    variable: None,
                    ty: Type::dynamic(),
                });
            }
            self.error(
                TypeErrorCode::OperatorNotDefined,
                span,
                format!("operator '[]=' is not defined for {}", self.show(receiver_ty)),
            );
            return None;
        };
        let signature = member.get_type(&self.types);
        let Some(func) = signature.as_function() else {
            return Some(Target {
                variable: None,
                ty: Type::dynamic(),
            });
        };
        if let Some(key) = func.parameters.first()
            && !self.types.is_assignable(&index_ty, key)
        {
            self.error(
                TypeErrorCode::IncompatibleArgument,
                index_span,
                format!("index {} is not assignable to {}", self.show(&index_ty), self.show(key)),
            );
        }
        Some(Target {
            variable: None,
            ty: func.parameters.get(1).cloned().unwrap_or_else(Type::dynamic),
        })
    }

    /// Store a value of type `value_ty` into `target`, returning the type of
    /// the assignment expression.
    pub(super) fn assign_to(&mut self, target: &Target, value_ty: Type, span: Span) -> Type {
        if target.ty.is_inferred() {
            if let Some(variable) = target.variable
                && self.options.infer_local_types
            {
                let refined = self.refine_on_assignment(&target.ty, &value_ty);
                self.set_variable_type(variable, refined);
            }
            return value_ty;
        }
        if !self.types.is_assignable(&value_ty, &target.ty) {
            self.error(
                TypeErrorCode::IncompatibleAssignment,
                span,
                format!("{} is not assignable to {}", self.show(&value_ty), self.show(&target.ty)),
            );
            return target.ty.clone();
        }
        value_ty
    }

    /// New inferred type of an untyped variable after an assignment.
    fn refine_on_assignment(&self, current: &Type, value_ty: &Type) -> Type {
        if current.is_dynamic() {
            return value_ty.inferred();
        }
        let (current, value) = (current.exact(), value_ty.exact());
        if self.types.is_subtype(&value, &current) || self.types.is_subtype(&current, &value) {
            current.inferred()
        } else {
            Type::dynamic().inferred()
        }
    }

    fn check_assign(&mut self, op: Option<BinaryOp>, target: &Expr, value: &Expr, span: Span) -> Type {
        let Some(slot) = self.check_target(target) else {
            return self.check_expr(value);
        };
        let value_ty = self.check_expr(value);
        let assigned = match op {
            Some(op) => self.binary_result(op, &slot.ty, &value_ty, value.span, span),
            None => value_ty,
        };
        self.assign_to(&slot, assigned, value.span)
    }

    fn check_conditional(&mut self, condition: &Expr, then_expr: &Expr, else_expr: &Expr) -> Type {
        self.check_condition(condition);
        let restore = self.narrow_for(condition, true);
        let then_ty = self.check_expr(then_expr);
        self.restore(restore);
        let restore = self.narrow_for(condition, false);
        let else_ty = self.check_expr(else_expr);
        self.restore(restore);
        self.types.least_upper_bound(&then_ty, &else_ty)
    }

    fn check_list_literal(&mut self, type_argument: Option<&Type>, elements: &[Expr]) -> Type {
        let element_ty = type_argument.cloned().unwrap_or_else(Type::dynamic);
        for element in elements {
            let ty = self.check_expr(element);
            if !self.types.is_assignable(&ty, &element_ty) {
                self.error(
                    TypeErrorCode::IncompatibleElement,
                    element.span,
                    format!(
                        "list element {} is not assignable to {}",
                        self.show(&ty),
                        self.show(&element_ty)
                    ),
                );
            }
        }
        self.types.core().list_of(element_ty)
    }

    fn check_map_literal(&mut self, type_argument: Option<&Type>, entries: &[MapEntry]) -> Type {
        let key_ty = self.types.core().string_type();
        let value_ty = type_argument.cloned().unwrap_or_else(Type::dynamic);
        let mut seen: HashSet<&str> = HashSet::new();
        for entry in entries {
            let ty = self.check_expr(&entry.key);
            if !self.types.is_assignable(&ty, &key_ty) {
                self.error(
                    TypeErrorCode::IncompatibleElement,
                    entry.key.span,
                    format!("map keys must be 'String', found {}", self.show(&ty)),
                );
            }
            if let ExprKind::Literal(Literal::String(key)) = &entry.key.kind
                && !seen.insert(key.as_str())
            {
                self.error(
                    TypeErrorCode::DuplicateMapKey,
                    entry.key.span,
                    format!("duplicate map key '{key}'"),
                );
            }
            let ty = self.check_expr(&entry.value);
            if !self.types.is_assignable(&ty, &value_ty) {
                self.error(
                    TypeErrorCode::IncompatibleElement,
                    entry.value.span,
                    format!(
                        "map value {} is not assignable to {}",
                        self.show(&ty),
                        self.show(&value_ty)
                    ),
                );
            }
        }
        self.types.core().map_of(key_ty, value_ty)
    }
}
