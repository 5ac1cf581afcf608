//! Class declarations: header bounds, unimplemented abstract members,
//! override legality, default-class constructors and member bodies.

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::debug;

use crate::ast::{ClassDecl, Literal, MemberDecl, Span};
use crate::elements::ElementId;
use crate::types::{InterfaceType, Member, Type};

use super::environment::Context;
use super::errors::{TypeError, TypeErrorCode};
use super::Checker;

impl<'a> Checker<'a> {
    pub fn check_class(&mut self, decl: &ClassDecl) {
        let class = decl.element;
        self.check_class_header(class, decl.span);
        self.check_abstract_members(class, decl.span);
        self.check_overrides(class, decl.span);
        self.check_default_class_constructors(class, decl.span);

        for member in &decl.members {
            match member {
                MemberDecl::Method(func) => {
                    let context = Context {
                        class: Some(class),
                        return_type: Some(self.declared_return_type(func)),
                        is_static: self.is_static_member(func.element),
                    };
                    self.with_context(context, |checker| checker.check_function_body(func));
                }
                MemberDecl::Field(field) => {
                    let context = Context {
                        class: Some(class),
                        return_type: None,
                        is_static: self.is_static_member(field.element),
                    };
                    self.with_context(context, |checker| checker.check_variable(field));
                }
            }
        }
    }

    /// Static members and factories have no `this`.
    fn is_static_member(&self, id: ElementId) -> bool {
        let element = self.element(id);
        element.is_static() || element.modifiers.is_factory
    }

    fn check_class_header(&mut self, class: ElementId, span: Span) {
        let Some(info) = self.elements.class_info(class) else {
            return;
        };
        let context = format!("the supertypes of '{}'", self.name(class));
        for sup in info.supertype.iter().chain(&info.interfaces) {
            if let Some(iface) = sup.as_interface() {
                self.check_type_arguments(iface, span, &context);
            }
        }
    }

    /// Check the arguments of `iface` against the bounds of its class's type
    /// parameters, with strict subtyping.
    pub(super) fn check_type_arguments(&mut self, iface: &InterfaceType, span: Span, context: &str) {
        if iface.arguments.is_empty() || self.types.is_raw(iface) {
            return;
        }
        let Some(info) = self.elements.class_info(iface.element) else {
            return;
        };
        let parameters = self.elements.type_parameter_types(iface.element);
        for (argument, parameter) in iface.arguments.iter().zip(&info.type_parameters) {
            let Some(bound) = self.elements.type_variable_bound(*parameter) else {
                continue;
            };
            let bound = bound.subst(&iface.arguments, &parameters);
            if !self.types.is_subtype(argument, &bound) {
                self.error(
                    TypeErrorCode::TypeArgumentNotWithinBounds,
                    span,
                    format!(
                        "type argument {} does not extend {}, the bound of '{}', in {context}",
                        self.show(argument),
                        self.show(&bound),
                        self.name(*parameter)
                    ),
                );
            }
        }
    }

    /// Abstract members `class` inherits without implementing, as
    /// `(declaring type, member)` pairs in ancestor order.
    pub(super) fn unimplemented_members(&self, class: ElementId) -> Vec<(ElementId, ElementId)> {
        let this_type = self.elements.this_type(class);
        let library = self.element(class).library;

        // Interfaces alone never implement anything
        let mut implemented: HashSet<&str> = HashSet::new();
        let mut current = this_type.as_interface().cloned();
        let mut visited = HashSet::new();
        while let Some(iface) = current {
            if !visited.insert(iface.element) {
                break;
            }
            let holder = self.element(iface.element);
            if let Some(info) = holder.class_info().filter(|_| !holder.is_interface()) {
                for member in info.members.iter().map(|id| self.element(*id)) {
                    if !member.is_static() && !member.is_abstract() {
                        implemented.insert(member.name.as_str());
                    }
                }
            }
            current = self.types.supertype(&iface);
        }

        let mut reported: HashSet<&str> = HashSet::new();
        let mut missing = Vec::new();
        for ancestor in self.types.ancestors(&this_type) {
            let holder = self.element(ancestor.element);
            let Some(info) = holder.class_info() else {
                continue;
            };
            for &id in &info.members {
                let member = self.element(id);
                if member.is_static() || !(member.is_abstract() || holder.is_interface()) {
                    continue;
                }
                if member.is_private() && member.library != library {
                    continue;
                }
                if implemented.contains(member.name.as_str()) || !reported.insert(member.name.as_str()) {
                    continue;
                }
                missing.push((ancestor.element, id));
            }
        }
        missing
    }

    fn check_abstract_members(&mut self, class: ElementId, span: Span) {
        let element = self.element(class);
        if element.is_abstract() || element.is_interface() {
            return;
        }
        let missing = self.unimplemented_members(class);
        if missing.is_empty() {
            return;
        }
        let mut by_holder: IndexMap<ElementId, Vec<&str>> = IndexMap::new();
        for (holder, member) in &missing {
            by_holder.entry(*holder).or_default().push(self.name(*member));
        }
        let mut message = format!(
            "class '{}' does not implement inherited abstract members:",
            element.name
        );
        for (holder, names) in &by_holder {
            message.push_str(&format!("\n  from '{}': {}", self.name(*holder), names.join(", ")));
        }
        debug!(class = %element.name, missing = missing.len(), "unimplemented abstract members");
        self.first_abstract_report(class);
        let mut error = TypeError::new(TypeErrorCode::UnimplementedAbstractMembers, span, message);
        for (holder, member) in &missing {
            let kind = self.element(*member).kind.as_str();
            error = error.with_note(format!(
                "{kind} '{}' is declared in '{}'",
                self.name(*member),
                self.name(*holder)
            ));
        }
        let help = format!("implement the members above or declare '{}' abstract", element.name);
        self.report(error.with_help(help));
    }

    fn check_overrides(&mut self, class: ElementId, class_span: Span) {
        let Some(info) = self.elements.class_info(class) else {
            return;
        };
        let Some(this_type) = self.elements.this_type(class).as_interface().cloned() else {
            return;
        };
        let inherited_from: Vec<Type> = self
            .types
            .supertype(&this_type)
            .into_iter()
            .chain(self.types.interfaces(&this_type))
            .map(Type::from)
            .collect();

        for &id in &info.members {
            let element = self.element(id);
            let span = if element.span.is_empty() { class_span } else { element.span };
            let mut seen = HashSet::new();
            for sup in &inherited_from {
                let Some(inherited) = self.types.lookup_member(sup, &element.name) else {
                    continue;
                };
                if seen.insert(inherited.element) {
                    self.check_override(id, &inherited, span);
                }
            }
        }
    }

    fn check_override(&mut self, id: ElementId, inherited: &Member, span: Span) {
        let element = self.element(id);
        let overridden = self.element(inherited.element);
        let holder = self.name(inherited.holder.element);
        let name = &element.name;
        match (element.is_static(), overridden.is_static()) {
            (true, true) => return,
            (true, false) => {
                self.error(
                    TypeErrorCode::OverrideStaticMismatch,
                    span,
                    format!("static member '{name}' cannot override the instance member of '{holder}'"),
                );
                return;
            }
            (false, true) => {
                self.error(
                    TypeErrorCode::OverrideInstanceMismatch,
                    span,
                    format!("instance member '{name}' cannot override the static member of '{holder}'"),
                );
                return;
            }
            (false, false) => {}
        }

        let inherited_ty = inherited.get_type(&self.types);
        match (element.is_method(), overridden.is_method()) {
            (true, true) => self.check_method_override(id, inherited, &inherited_ty, span),
            (false, false) => {
                if !self.types.is_assignable(&element.ty, &inherited_ty) {
                    self.error(
                        TypeErrorCode::OverrideTypeMismatch,
                        span,
                        format!(
                            "'{name}' has type {}, which does not match {} inherited from '{holder}'",
                            self.show(&element.ty),
                            self.show(&inherited_ty)
                        ),
                    );
                }
            }
            (is_method, _) => {
                let (own, other) = if is_method { ("method", "field") } else { ("field", "method") };
                self.error(
                    TypeErrorCode::OverrideKindMismatch,
                    span,
                    format!("{own} '{name}' cannot override the {other} of '{holder}'"),
                );
            }
        }
    }

    fn check_method_override(&mut self, id: ElementId, inherited: &Member, inherited_ty: &Type, span: Span) {
        let element = self.element(id);
        let holder = self.name(inherited.holder.element);
        let name = &element.name;
        let (Some(own), Some(other)) = (element.ty.as_function(), inherited_ty.as_function()) else {
            return;
        };

        if own.parameters.len() != other.parameters.len() {
            self.error(
                TypeErrorCode::OverrideRequiredParameterCount,
                span,
                format!(
                    "'{name}' has {} required parameters, but the method it overrides in '{holder}' has {}",
                    own.parameters.len(),
                    other.parameters.len()
                ),
            );
            return;
        }
        let own_named: Vec<&str> = own.named.keys().map(String::as_str).collect();
        let other_named: Vec<&str> = other.named.keys().map(String::as_str).collect();
        if own_named != other_named {
            let error = TypeError::new(
                TypeErrorCode::OverrideNamedParameters,
                span,
                format!(
                    "'{name}' must declare the named parameters {{{}}} of the method it overrides in '{holder}', found {{{}}}",
                    other_named.join(", "),
                    own_named.join(", ")
                ),
            )
            .with_help("named parameters must keep their names and order");
            self.report(error);
            return;
        }

        let defaults = self.default_values(inherited.element);
        for (parameter, value) in self.default_values(id) {
            if let Some(Some(expected)) = defaults.get(parameter)
                && value.as_ref().is_some_and(|value| value != expected)
            {
                self.error(
                    TypeErrorCode::OverrideDefaultValue,
                    span,
                    format!("parameter '{parameter}' of '{name}' changes the default value inherited from '{holder}'"),
                );
            }
        }

        if !self.types.is_subtype(&element.ty, inherited_ty) {
            self.error(
                TypeErrorCode::OverrideTypeMismatch,
                span,
                format!(
                    "'{name}' has type {}, which is not a subtype of {} inherited from '{holder}'",
                    self.show(&element.ty),
                    self.show(inherited_ty)
                ),
            );
        }
    }

    /// Optional parameters of a method with their default values.
    fn default_values(&self, method: ElementId) -> IndexMap<&'a str, Option<&'a Literal>> {
        self.elements
            .parameters(method)
            .iter()
            .map(|id| self.element(*id))
            .filter_map(|param| {
                let info = param.parameter_info()?;
                info.is_optional
                    .then(|| (param.name.as_str(), info.default_value.as_ref()))
            })
            .collect()
    }

    /// Every constructor of an interface must have a counterpart with the
    /// same positional parameters on its default class.
    fn check_default_class_constructors(&mut self, class: ElementId, span: Span) {
        let element = self.element(class);
        let Some(info) = element.class_info().filter(|_| element.is_interface()) else {
            return;
        };
        let Some(default_class) = info.default_class.as_ref().and_then(Type::element) else {
            return;
        };
        // The default class has its own type variables; line them up
        let interface_parameters = self.elements.type_parameter_types(class);
        let default_parameters = self.elements.type_parameter_types(default_class);
        let align = |ty: &Type| {
            if interface_parameters.len() == default_parameters.len() {
                ty.subst(&interface_parameters, &default_parameters)
            } else {
                ty.clone()
            }
        };

        for &ctor in &info.constructors {
            let ctor_name = &self.element(ctor).name;
            let display = if ctor_name.is_empty() {
                element.name.clone()
            } else {
                format!("{}.{ctor_name}", element.name)
            };
            let Some(target) = self.elements.constructor(default_class, ctor_name) else {
                self.error(
                    TypeErrorCode::DefaultConstructorMissing,
                    span,
                    format!(
                        "default class '{}' has no constructor matching '{display}'",
                        self.name(default_class)
                    ),
                );
                continue;
            };
            let expected = self.positional_parameters(ctor, &|ty: &Type| ty.clone());
            let actual = self.positional_parameters(target, &align);
            let matches = expected.len() == actual.len()
                && expected
                    .iter()
                    .zip(&actual)
                    .all(|((n1, t1), (n2, t2))| n1 == n2 && self.types.is_assignable(t1, t2));
            if !matches {
                self.error(
                    TypeErrorCode::DefaultConstructorMismatch,
                    span,
                    format!(
                        "constructor '{display}' does not match the constructor of default class '{}': expected ({}), found ({})",
                        self.name(default_class),
                        self.describe_parameters(&expected),
                        self.describe_parameters(&actual)
                    ),
                );
            }
        }
    }

    /// Required and optional positional parameters as `(name, type)`.
    fn positional_parameters(&self, ctor: ElementId, map: &dyn Fn(&Type) -> Type) -> Vec<(String, Type)> {
        self.elements
            .parameters(ctor)
            .iter()
            .map(|id| self.element(*id))
            .filter(|param| param.parameter_info().is_some_and(|info| !info.is_named))
            .map(|param| (param.name.clone(), map(&param.ty)))
            .collect()
    }

    fn describe_parameters(&self, parameters: &[(String, Type)]) -> String {
        parameters
            .iter()
            .map(|(name, ty)| format!("{} {name}", ty.display(self.elements)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{check_decls, Fixture};
    use super::*;
    use crate::ast::{AstBuilder, Stmt};
    use crate::elements::{Modifiers, ParamSpec};
    use crate::typecheck::TypeError;

    fn check_class_only(fx: &Fixture, class: ElementId) -> Vec<TypeError> {
        check_decls(fx, vec![AstBuilder::class(class, vec![])]).1
    }

    fn codes(errors: &[TypeError]) -> Vec<TypeErrorCode> {
        errors.iter().map(|error| error.code).collect()
    }

    /// `abstract class Shape { abstract num area(); String describe() }`
    fn shape(fx: &mut Fixture) -> ElementId {
        let core = *fx.table.core();
        let shape = fx.table.add_class("Shape", fx.lib);
        fx.table.set_abstract(shape);
        fx.table.add_method(Some(shape), fx.lib, "area", vec![], core.num_type(), Modifiers::abstract_());
        fx.table.add_method(Some(shape), fx.lib, "describe", vec![], core.string_type(), Modifiers::default());
        shape
    }

    #[test]
    fn test_missing_abstract_method_reported_once() {
        let mut fx = Fixture::new();
        let shape = shape(&mut fx);
        let square = fx.table.add_class("Square", fx.lib);
        fx.table.set_supertype(square, Type::interface(shape, vec![]));
        let errors = check_class_only(&fx, square);
        assert_eq!(codes(&errors), vec![TypeErrorCode::UnimplementedAbstractMembers]);
        assert!(errors[0].message.contains("area"));
        assert!(errors[0].message.contains("from 'Shape'"));
        assert!(!errors[0].message.contains("describe"));
        assert_eq!(errors[0].notes, vec!["method 'area' is declared in 'Shape'".to_string()]);
        assert_eq!(
            errors[0].help.as_deref(),
            Some("implement the members above or declare 'Square' abstract")
        );
    }

    #[test]
    fn test_implemented_abstract_method() {
        let mut fx = Fixture::new();
        let shape = shape(&mut fx);
        let square = fx.table.add_class("Square", fx.lib);
        fx.table.set_supertype(square, Type::interface(shape, vec![]));
        let num = fx.table.core().num_type();
        fx.table.add_method(Some(square), fx.lib, "area", vec![], num, Modifiers::default());
        assert!(check_class_only(&fx, square).is_empty());
    }

    #[test]
    fn test_interface_members_must_be_implemented() {
        let mut fx = Fixture::new();
        let core = *fx.table.core();
        let named = fx.table.add_interface("Named", fx.lib);
        fx.table.add_getter(named, "name", core.string_type(), Modifiers::abstract_());
        let person = fx.table.add_class("Person", fx.lib);
        fx.table.add_implemented(person, Type::interface(named, vec![]));
        assert_eq!(
            codes(&check_class_only(&fx, person)),
            vec![TypeErrorCode::UnimplementedAbstractMembers]
        );
        fx.table.add_field(person, "name", core.string_type(), Modifiers::default());
        assert!(check_class_only(&fx, person).is_empty());
    }

    #[test]
    fn test_private_members_of_other_libraries_are_skipped() {
        let mut fx = Fixture::new();
        let other = fx.table.new_library();
        let base = fx.table.add_class("Base", other);
        fx.table.set_abstract(base);
        fx.table.add_method(Some(base), other, "_secret", vec![], Type::void(), Modifiers::abstract_());
        let sub = fx.table.add_class("Sub", fx.lib);
        fx.table.set_supertype(sub, Type::interface(base, vec![]));
        assert!(check_class_only(&fx, sub).is_empty());
    }

    #[test]
    fn test_static_instance_override_mismatch() {
        let mut fx = Fixture::new();
        let a = fx.table.add_class("A", fx.lib);
        fx.table.add_method(Some(a), fx.lib, "m", vec![], Type::void(), Modifiers::default());
        fx.table.add_method(Some(a), fx.lib, "s", vec![], Type::void(), Modifiers::static_());
        let b = fx.table.add_class("B", fx.lib);
        fx.table.set_supertype(b, Type::interface(a, vec![]));
        fx.table.add_method(Some(b), fx.lib, "m", vec![], Type::void(), Modifiers::static_());
        fx.table.add_method(Some(b), fx.lib, "s", vec![], Type::void(), Modifiers::default());
        assert_eq!(
            codes(&check_class_only(&fx, b)),
            vec![
                TypeErrorCode::OverrideStaticMismatch,
                TypeErrorCode::OverrideInstanceMismatch,
            ]
        );
    }

    #[test]
    fn test_override_parameter_shape() {
        let mut fx = Fixture::new();
        let core = *fx.table.core();
        let a = fx.table.add_class("A", fx.lib);
        fx.table.add_method(
            Some(a),
            fx.lib,
            "m",
            vec![ParamSpec::required("x", core.int_type())],
            Type::void(),
            Modifiers::default(),
        );
        fx.table.add_method(
            Some(a),
            fx.lib,
            "n",
            vec![
                ParamSpec::named("a", core.int_type()),
                ParamSpec::named("b", core.int_type()),
            ],
            Type::void(),
            Modifiers::default(),
        );
        fx.table.add_method(
            Some(a),
            fx.lib,
            "o",
            vec![ParamSpec::optional("p", core.int_type()).with_default(Literal::Int(1))],
            Type::void(),
            Modifiers::default(),
        );
        let b = fx.table.add_class("B", fx.lib);
        fx.table.set_supertype(b, Type::interface(a, vec![]));
        fx.table.add_method(Some(b), fx.lib, "m", vec![], Type::void(), Modifiers::default());
        fx.table.add_method(
            Some(b),
            fx.lib,
            "n",
            vec![
                ParamSpec::named("b", core.int_type()),
                ParamSpec::named("a", core.int_type()),
            ],
            Type::void(),
            Modifiers::default(),
        );
        fx.table.add_method(
            Some(b),
            fx.lib,
            "o",
            vec![ParamSpec::optional("p", core.int_type()).with_default(Literal::Int(2))],
            Type::void(),
            Modifiers::default(),
        );
        assert_eq!(
            codes(&check_class_only(&fx, b)),
            vec![
                TypeErrorCode::OverrideRequiredParameterCount,
                TypeErrorCode::OverrideNamedParameters,
                TypeErrorCode::OverrideDefaultValue,
            ]
        );
    }

    #[test]
    fn test_override_return_type() {
        let mut fx = Fixture::new();
        let core = *fx.table.core();
        let a = fx.table.add_class("A", fx.lib);
        fx.table.add_method(Some(a), fx.lib, "m", vec![], core.num_type(), Modifiers::default());
        fx.table.add_method(Some(a), fx.lib, "n", vec![], core.num_type(), Modifiers::default());
        let b = fx.table.add_class("B", fx.lib);
        fx.table.set_supertype(b, Type::interface(a, vec![]));
        fx.table.add_method(Some(b), fx.lib, "m", vec![], core.int_type(), Modifiers::default());
        fx.table.add_method(Some(b), fx.lib, "n", vec![], core.string_type(), Modifiers::default());
        let errors = check_class_only(&fx, b);
        assert_eq!(codes(&errors), vec![TypeErrorCode::OverrideTypeMismatch]);
        assert!(errors[0].message.starts_with("'n'"));
    }

    #[test]
    fn test_field_overriding_method() {
        let mut fx = Fixture::new();
        let core = *fx.table.core();
        let a = fx.table.add_class("A", fx.lib);
        fx.table.add_method(Some(a), fx.lib, "size", vec![], core.int_type(), Modifiers::default());
        let b = fx.table.add_class("B", fx.lib);
        fx.table.set_supertype(b, Type::interface(a, vec![]));
        fx.table.add_field(b, "size", core.int_type(), Modifiers::default());
        assert_eq!(
            codes(&check_class_only(&fx, b)),
            vec![TypeErrorCode::OverrideKindMismatch]
        );
    }

    #[test]
    fn test_supertype_arguments_within_bounds() {
        let mut fx = Fixture::new();
        let core = *fx.table.core();
        let boxed = fx.table.add_class("Box", fx.lib);
        fx.table.add_class_type_parameter(boxed, "T", Some(core.num_type()));
        let good = fx.table.add_class("IntBox", fx.lib);
        fx.table.set_supertype(good, Type::interface(boxed, vec![core.int_type()]));
        let bad = fx.table.add_class("StringBox", fx.lib);
        fx.table.set_supertype(bad, Type::interface(boxed, vec![core.string_type()]));
        assert!(check_class_only(&fx, good).is_empty());
        let errors = check_class_only(&fx, bad);
        assert_eq!(codes(&errors), vec![TypeErrorCode::TypeArgumentNotWithinBounds]);
        assert!(errors[0].message.contains("'StringBox'"));
    }

    #[test]
    fn test_default_class_constructors() {
        let mut fx = Fixture::new();
        let core = *fx.table.core();
        let list_like = fx.table.add_interface("Sequence", fx.lib);
        let impl_class = fx.table.add_class("ArraySequence", fx.lib);
        fx.table.set_default_class(list_like, Type::interface(impl_class, vec![]));
        fx.table.add_constructor(
            list_like,
            "",
            vec![ParamSpec::required("capacity", core.int_type())],
            Modifiers::default(),
        );
        fx.table.add_constructor(list_like, "empty", vec![], Modifiers::default());
        fx.table.add_constructor(
            impl_class,
            "",
            vec![ParamSpec::required("capacity", core.string_type())],
            Modifiers::default(),
        );
        let errors = check_class_only(&fx, list_like);
        assert_eq!(
            codes(&errors),
            vec![
                TypeErrorCode::DefaultConstructorMismatch,
                TypeErrorCode::DefaultConstructorMissing,
            ]
        );
        assert!(errors[0].message.contains("expected (int capacity), found (String capacity)"));
    }

    #[test]
    fn test_member_bodies_see_this() {
        let mut fx = Fixture::new();
        let core = *fx.table.core();
        let counter = fx.table.add_class("Counter", fx.lib);
        let count = fx.table.add_field(counter, "count", core.int_type(), Modifiers::default());
        let inc = fx.table.add_method(Some(counter), fx.lib, "inc", vec![], core.int_type(), Modifiers::default());
        let reset = fx.table.add_method(Some(counter), fx.lib, "reset", vec![], Type::void(), Modifiers::static_());
        let mut b = AstBuilder::new();
        let read = b.ident("count", count);
        let read_id = read.id;
        let from_static = b.ident("count", count);
        let zero = b.int(0);
        let field_init = b.string("zero");
        let decl = AstBuilder::class(
            counter,
            vec![
                MemberDecl::Field(AstBuilder::field(count, Some(field_init))),
                MemberDecl::Method(AstBuilder::method(inc, Some(vec![AstBuilder::ret(Some(read))]))),
                MemberDecl::Method(AstBuilder::method(
                    reset,
                    Some(vec![Stmt::Expr(b.assign(from_static, zero))]),
                )),
            ],
        );
        let (types, errors) = check_decls(&fx, vec![decl]);
        assert_eq!(
            codes(&errors),
            vec![
                TypeErrorCode::IncompatibleAssignment,
                TypeErrorCode::InstanceMemberAccessedStatically,
            ]
        );
        assert_eq!(types.get(read_id), Some(&core.int_type()));
    }
}
