//! Invocations: method calls, calls of function values, instance creation
//! and the binding of arguments to parameters.

use std::collections::HashSet;

use tracing::trace;

use crate::ast::{Argument, Expr, Span};
use crate::elements::ElementId;
use crate::types::{FunctionType, InterfaceType, Member, Type, TypeRepr};

use super::errors::TypeErrorCode;
use super::Checker;

/// What calling a value of some type means.
enum Callable {
    Signature(FunctionType),
    /// Callable, but with nothing known about the parameters
    Unknown,
    NotCallable,
}

impl Checker<'_> {
    pub(super) fn check_method_invocation(
        &mut self,
        receiver: Option<&Expr>,
        name: &str,
        element: Option<ElementId>,
        arguments: &[Argument],
        span: Span,
    ) -> Type {
        let Some(receiver) = receiver else {
            if element.is_none() {
                self.error(
                    TypeErrorCode::CannotResolve,
                    span,
                    format!("cannot resolve function '{name}'"),
                );
                self.check_arguments(arguments);
                return Type::dynamic();
            }
            let callee = self.check_identifier(name, element, span);
            return self.invoke_type(&callee, arguments, span);
        };
        let member = match self.class_reference(receiver) {
            Some(class) => self.static_member(class, name, span),
            None => {
                let receiver_ty = self.check_expr(receiver);
                self.resolve_member(&receiver_ty, name, span)
            }
        };
        let Some(member) = member else {
            self.check_arguments(arguments);
            return Type::dynamic();
        };
        let callee = if member.element(&self.types).is_method() {
            member.get_type(&self.types)
        } else {
            self.read_member(&member, span)
        };
        self.invoke_type(&callee, arguments, span)
    }

    pub(super) fn check_call(&mut self, callee: &Expr, arguments: &[Argument], span: Span) -> Type {
        let callee_ty = self.check_expr(callee);
        self.invoke_type(&callee_ty, arguments, span)
    }

    fn invoke_type(&mut self, callee: &Type, arguments: &[Argument], span: Span) -> Type {
        match self.callable(callee) {
            Callable::Signature(signature) => self.check_invocation(&signature, arguments, span),
            Callable::Unknown => {
                self.check_arguments(arguments);
                Type::dynamic()
            }
            Callable::NotCallable => {
                self.error(
                    TypeErrorCode::NotAFunction,
                    span,
                    format!("{} is not a function", self.show(callee)),
                );
                self.check_arguments(arguments);
                Type::dynamic()
            }
        }
    }

    fn callable(&self, ty: &Type) -> Callable {
        match ty.repr() {
            TypeRepr::Function(signature) => Callable::Signature(signature.clone()),
            TypeRepr::FunctionAlias(alias) => match self.types.expand_alias(alias) {
                Some(expanded) => self.callable(&expanded),
                None => Callable::Unknown,
            },
            TypeRepr::Variable(variable) => self.callable(&self.types.resolve_variable(*variable)),
            TypeRepr::Dynamic => Callable::Unknown,
            _ if ty.is_inferred() => Callable::Unknown,
            _ if self
                .types
                .is_assignable(ty, &self.types.core().function_type()) =>
            {
                Callable::Unknown
            }
            _ => Callable::NotCallable,
        }
    }

    fn check_arguments(&mut self, arguments: &[Argument]) {
        for argument in arguments {
            self.check_expr(&argument.value);
        }
    }

    /// Bind `arguments` to the parameters of `signature` and return the
    /// call's result type.
    ///
    /// Positional arguments fill the required parameters, then the optional
    /// positional ones, then (with `legacy_positional_named`) the named
    /// parameters in declaration order. Named arguments bind by name. A rest
    /// parameter takes whatever positional arguments are left.
    pub(super) fn check_invocation(&mut self, signature: &FunctionType, arguments: &[Argument], span: Span) -> Type {
        let argument_types: Vec<Type> = arguments
            .iter()
            .map(|argument| self.check_expr(&argument.value))
            .collect();
        let mut positional = arguments
            .iter()
            .zip(&argument_types)
            .filter(|(argument, _)| argument.name.is_none());

        for (index, parameter) in signature.parameters.iter().enumerate() {
            match positional.next() {
                Some((argument, ty)) => self.bind_argument(ty, parameter, argument),
                None => self.error(
                    TypeErrorCode::MissingArgument,
                    span,
                    format!(
                        "missing argument for required parameter {}",
                        self.parameter_label(signature, index)
                    ),
                ),
            }
        }
        for parameter in signature.optional.values() {
            let Some((argument, ty)) = positional.next() else {
                break;
            };
            self.bind_argument(ty, parameter, argument);
        }

        let mut bound_positionally: HashSet<&str> = HashSet::new();
        if self.options.legacy_positional_named {
            for (name, parameter) in &signature.named {
                let Some((argument, ty)) = positional.next() else {
                    break;
                };
                self.bind_argument(ty, parameter, argument);
                bound_positionally.insert(name.as_str());
            }
        }

        for (argument, ty) in positional {
            match &signature.rest {
                Some(rest) => self.bind_argument(ty, rest, argument),
                None => self.error(
                    TypeErrorCode::ExtraArgument,
                    argument.value.span,
                    format!(
                        "too many positional arguments: expected at most {}",
                        signature.parameters.len() + signature.optional.len()
                    ),
                ),
            }
        }

        let mut bound_by_name: HashSet<&str> = HashSet::new();
        for (argument, ty) in arguments.iter().zip(&argument_types) {
            let Some(name) = argument.name.as_deref() else {
                continue;
            };
            let Some(parameter) = signature.named.get(name) else {
                self.error(
                    TypeErrorCode::NoSuchNamedParameter,
                    argument.value.span,
                    format!("no parameter named '{name}'"),
                );
                continue;
            };
            if bound_positionally.contains(name) {
                self.error(
                    TypeErrorCode::NamedArgumentUsedPositionally,
                    argument.value.span,
                    format!("parameter '{name}' is already bound by a positional argument"),
                );
                continue;
            }
            if !bound_by_name.insert(name) {
                self.error(
                    TypeErrorCode::DuplicateNamedArgument,
                    argument.value.span,
                    format!("parameter '{name}' is given more than once"),
                );
                continue;
            }
            self.bind_argument(ty, parameter, argument);
        }

        signature.return_type.clone()
    }

    fn bind_argument(&mut self, argument_ty: &Type, parameter: &Type, argument: &Argument) {
        if !self.types.is_assignable(argument_ty, parameter) {
            self.error(
                TypeErrorCode::IncompatibleArgument,
                argument.value.span,
                format!(
                    "argument type {} is not assignable to parameter type {}",
                    self.show(argument_ty),
                    self.show(parameter)
                ),
            );
        }
    }

    /// `'name'` of the `index`th required parameter, or its position.
    fn parameter_label(&self, signature: &FunctionType, index: usize) -> String {
        signature
            .element
            .and_then(|function| {
                self.elements
                    .parameters(function)
                    .iter()
                    .filter_map(|param| self.elements.lookup(*param))
                    .filter(|param| param.parameter_info().is_some_and(|info| !info.is_optional))
                    .nth(index)
            })
            .map_or_else(|| format!("#{}", index + 1), |param| format!("'{}'", param.name))
    }

    pub(super) fn check_new(
        &mut self,
        ty: &Type,
        constructor: Option<&str>,
        arguments: &[Argument],
        span: Span,
    ) -> Type {
        let Some(iface) = ty.as_interface().filter(|iface| self.elements.class_info(iface.element).is_some())
        else {
            self.check_arguments(arguments);
            return ty.clone();
        };
        let class = iface.element;
        self.check_type_arguments(iface, span, "instance creation");

        let name = constructor.unwrap_or("");
        let Some(signature) = self.constructor_signature(iface, name, span) else {
            self.check_arguments(arguments);
            return ty.exact();
        };
        let is_factory = signature
            .element
            .and_then(|ctor| self.elements.lookup(ctor))
            .is_some_and(|ctor| ctor.modifiers.is_factory);
        if !is_factory {
            self.check_instantiable(class, span);
        }
        self.check_invocation(&signature, arguments, span);
        ty.exact()
    }

    /// The constructor `name` of `iface`, specialized to its arguments.
    fn constructor_signature(&mut self, iface: &InterfaceType, name: &str, span: Span) -> Option<FunctionType> {
        let class = iface.element;
        let Some(ctor) = self.elements.constructor(class, name) else {
            let has_constructors = self
                .elements
                .class_info(class)
                .is_some_and(|info| !info.constructors.is_empty());
            if name.is_empty() && !has_constructors {
                // implicit default constructor
                return Some(FunctionType::new(Vec::new(), Type::from(iface.clone())));
            }
            let message = if name.is_empty() {
                format!("class '{}' has no unnamed constructor", self.name(class))
            } else {
                format!("class '{}' has no constructor named '{name}'", self.name(class))
            };
            self.error(TypeErrorCode::MemberNotFound, span, message);
            return None;
        };
        let member = Member::new(iface.clone(), ctor);
        match member.get_type(&self.types).repr() {
            TypeRepr::Function(signature) => Some(signature.clone()),
            _ => None,
        }
    }

    fn check_instantiable(&mut self, class: ElementId, span: Span) {
        let element = self.element(class);
        let has_default_class = element
            .class_info()
            .is_some_and(|info| info.default_class.is_some());
        if element.is_interface() {
            if !has_default_class {
                self.error(
                    TypeErrorCode::AbstractClassInstantiation,
                    span,
                    format!("interface '{}' has no default class and cannot be instantiated", element.name),
                );
            }
            return;
        }
        if element.is_abstract() {
            self.error(
                TypeErrorCode::AbstractClassInstantiation,
                span,
                format!("abstract class '{}' cannot be instantiated", element.name),
            );
            return;
        }
        let missing = self.unimplemented_members(class);
        if missing.is_empty() || !self.first_abstract_report(class) {
            return;
        }
        trace!(class = %element.name, missing = missing.len(), "implicitly abstract class instantiated");
        let names: Vec<&str> = missing.iter().map(|(_, member)| self.name(*member)).collect();
        self.error(
            TypeErrorCode::AbstractClassInstantiation,
            span,
            format!(
                "class '{}' cannot be instantiated because it does not implement {}",
                element.name,
                names.join(", ")
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{check_body, check_body_with, Fixture};
    use super::*;
    use crate::ast::{AstBuilder, Stmt};
    use crate::config::CheckerOptions;
    use crate::elements::{Modifiers, ParamSpec};

    /// `f(int a, [String b], {bool c, int d})`
    fn declare_f(fx: &mut Fixture) -> ElementId {
        let core = *fx.table.core();
        fx.table.add_method(
            None,
            fx.lib,
            "f",
            vec![
                ParamSpec::required("a", core.int_type()),
                ParamSpec::optional("b", core.string_type()),
                ParamSpec::named("c", core.bool_type()),
                ParamSpec::named("d", core.int_type()),
            ],
            Type::void(),
            Modifiers::default(),
        )
    }

    fn call_f(fx: &mut Fixture, options: CheckerOptions, build: impl FnOnce(&mut AstBuilder) -> Vec<Argument>) -> Vec<TypeErrorCode> {
        let f = declare_f(fx);
        let mut b = AstBuilder::new();
        let arguments = build(&mut b);
        let call = b.call_named("f", f, arguments);
        let (_, errors) = check_body_with(fx, options, vec![Stmt::Expr(call)]);
        errors.into_iter().map(|error| error.code).collect()
    }

    #[test]
    fn test_well_formed_call() {
        let mut fx = Fixture::new();
        let errors = call_f(&mut fx, CheckerOptions::default(), |b| {
            vec![
                Argument::positional(b.int(1)),
                Argument::positional(b.string("x")),
                Argument::named("d", b.int(2)),
            ]
        });
        assert!(errors.is_empty());
    }

    #[test]
    fn test_missing_required_argument() {
        let mut fx = Fixture::new();
        let errors = call_f(&mut fx, CheckerOptions::default(), |_| vec![]);
        assert_eq!(errors, vec![TypeErrorCode::MissingArgument]);
    }

    #[test]
    fn test_legacy_positional_named_binding() {
        let mut fx = Fixture::new();
        let errors = call_f(&mut fx, CheckerOptions::default(), |b| {
            vec![
                Argument::positional(b.int(1)),
                Argument::positional(b.string("x")),
                Argument::positional(b.bool(true)),
                Argument::named("c", b.bool(false)),
            ]
        });
        assert_eq!(errors, vec![TypeErrorCode::NamedArgumentUsedPositionally]);
    }

    #[test]
    fn test_positional_named_binding_disabled() {
        let mut fx = Fixture::new();
        let options = CheckerOptions {
            legacy_positional_named: false,
            ..CheckerOptions::default()
        };
        let errors = call_f(&mut fx, options, |b| {
            vec![
                Argument::positional(b.int(1)),
                Argument::positional(b.string("x")),
                Argument::positional(b.bool(true)),
            ]
        });
        assert_eq!(errors, vec![TypeErrorCode::ExtraArgument]);
    }

    #[test]
    fn test_named_argument_errors() {
        let mut fx = Fixture::new();
        let errors = call_f(&mut fx, CheckerOptions::default(), |b| {
            vec![
                Argument::positional(b.int(1)),
                Argument::named("e", b.int(2)),
                Argument::named("d", b.int(3)),
                Argument::named("d", b.int(4)),
                Argument::named("c", b.string("no")),
            ]
        });
        assert_eq!(
            errors,
            vec![
                TypeErrorCode::NoSuchNamedParameter,
                TypeErrorCode::DuplicateNamedArgument,
                TypeErrorCode::IncompatibleArgument,
            ]
        );
    }

    #[test]
    fn test_rest_parameter_absorbs_leftovers() {
        let mut fx = Fixture::new();
        let core = *fx.table.core();
        let signature = FunctionType::new(vec![core.int_type()], Type::void()).with_rest(core.string_type());
        let g = fx.table.add_variable(None, fx.lib, "g", Type::function(signature));
        let mut b = AstBuilder::new();
        let callee = b.ident("g", g);
        let args = vec![
            Argument::positional(b.int(1)),
            Argument::positional(b.string("a")),
            Argument::positional(b.int(2)),
        ];
        let call = b.call(callee, args);
        let (_, errors) = check_body(&mut fx, vec![Stmt::Expr(call)]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, TypeErrorCode::IncompatibleArgument);
    }

    #[test]
    fn test_calling_a_non_function() {
        let mut fx = Fixture::new();
        let int = fx.table.core().int_type();
        let n = fx.table.add_variable(None, fx.lib, "n", int);
        let mut b = AstBuilder::new();
        let callee = b.ident("n", n);
        let call = b.call(callee, vec![]);
        let (_, errors) = check_body(&mut fx, vec![Stmt::Expr(call)]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, TypeErrorCode::NotAFunction);
    }

    #[test]
    fn test_generic_method_specializes() {
        let mut fx = Fixture::new();
        let core = *fx.table.core();
        let list = fx.table.add_variable(None, fx.lib, "xs", core.list_of(core.string_type()));
        let mut b = AstBuilder::new();
        let receiver = b.ident("xs", list);
        let bad = vec![Argument::positional(b.int(1))];
        let add = b.invoke(receiver, "add", bad);
        let receiver = b.ident("xs", list);
        let zero = b.int(0);
        let read = b.index(receiver, zero);
        let read_id = read.id;
        let (types, errors) = check_body(&mut fx, vec![Stmt::Expr(add), Stmt::Expr(read)]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, TypeErrorCode::IncompatibleArgument);
        assert_eq!(types.get(read_id), Some(&core.string_type()));
    }

    #[test]
    fn test_new_abstract_class() {
        let mut fx = Fixture::new();
        let shape = fx.table.add_class("Shape", fx.lib);
        fx.table.set_abstract(shape);
        let mut b = AstBuilder::new();
        let create = b.new_instance(Type::interface(shape, vec![]), None, vec![]);
        let (_, errors) = check_body(&mut fx, vec![Stmt::Expr(create)]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, TypeErrorCode::AbstractClassInstantiation);
    }

    #[test]
    fn test_factory_constructor_of_abstract_class() {
        let mut fx = Fixture::new();
        let shape = fx.table.add_class("Shape", fx.lib);
        fx.table.set_abstract(shape);
        fx.table.add_constructor(shape, "circle", vec![], Modifiers::factory());
        let mut b = AstBuilder::new();
        let create = b.new_instance(Type::interface(shape, vec![]), Some("circle"), vec![]);
        let id = create.id;
        let (types, errors) = check_body(&mut fx, vec![Stmt::Expr(create)]);
        assert!(errors.is_empty());
        assert_eq!(types.get(id), Some(&Type::interface(shape, vec![])));
    }

    #[test]
    fn test_constructor_arguments_and_bounds() {
        let mut fx = Fixture::new();
        let core = *fx.table.core();
        let boxed = fx.table.add_class("Box", fx.lib);
        let t = fx.table.add_class_type_parameter(boxed, "T", Some(core.num_type()));
        fx.table.add_constructor(boxed, "", vec![ParamSpec::required("value", Type::variable(t))], Modifiers::default());
        let mut b = AstBuilder::new();
        let ok_args = vec![Argument::positional(b.int(1))];
        let ok = b.new_instance(Type::interface(boxed, vec![core.int_type()]), None, ok_args);
        let bad_args = vec![Argument::positional(b.string("s"))];
        let bad = b.new_instance(Type::interface(boxed, vec![core.int_type()]), None, bad_args);
        let null_args = vec![Argument::positional(b.null())];
        let out_of_bounds = b.new_instance(Type::interface(boxed, vec![core.string_type()]), None, null_args);
        let (_, errors) = check_body(
            &mut fx,
            vec![Stmt::Expr(ok), Stmt::Expr(bad), Stmt::Expr(out_of_bounds)],
        );
        let codes: Vec<_> = errors.iter().map(|error| error.code).collect();
        assert_eq!(
            codes,
            vec![
                TypeErrorCode::IncompatibleArgument,
                TypeErrorCode::TypeArgumentNotWithinBounds,
            ]
        );
    }

    #[test]
    fn test_missing_named_constructor() {
        let mut fx = Fixture::new();
        let point = fx.table.add_class("Point", fx.lib);
        let mut b = AstBuilder::new();
        let implicit = b.new_instance(Type::interface(point, vec![]), None, vec![]);
        let named = b.new_instance(Type::interface(point, vec![]), Some("origin"), vec![]);
        let (_, errors) = check_body(&mut fx, vec![Stmt::Expr(implicit), Stmt::Expr(named)]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, TypeErrorCode::MemberNotFound);
        assert!(errors[0].message.contains("'origin'"));
    }
}
