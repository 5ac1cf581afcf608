//! Walking the class hierarchy with type arguments substituted.

use std::collections::HashSet;

use tracing::trace;

use super::{InterfaceType, Type, TypeRepr};
use crate::elements::{CoreTypes, ElementId, ElementTable};

/// Type algorithms over one element table: hierarchy walking, subtyping,
/// least upper bounds and member lookup.
#[derive(Debug, Clone, Copy)]
pub struct Types<'a> {
    elements: &'a ElementTable,
}

impl<'a> Types<'a> {
    pub fn new(elements: &'a ElementTable) -> Self {
        Types { elements }
    }

    pub fn elements(&self) -> &'a ElementTable {
        self.elements
    }

    pub fn core(&self) -> &'a CoreTypes {
        self.elements.core()
    }

    /// Number of type parameters the element of `iface` declares.
    pub fn parameter_count(&self, element: ElementId) -> usize {
        match self.elements.lookup(element).map(|e| &e.detail) {
            Some(crate::elements::ElementDetail::Class(info)) => info.type_parameters.len(),
            Some(crate::elements::ElementDetail::Alias(info)) => info.type_parameters.len(),
            _ => 0,
        }
    }

    /// A type is raw when its argument count differs from the declared
    /// parameter count; `List` written without arguments is raw, `int` is not.
    pub fn is_raw(&self, iface: &InterfaceType) -> bool {
        iface.arguments.len() != self.parameter_count(iface.element)
    }

    /// Bound of a type variable; unbounded variables are bounded by `Object`.
    pub fn variable_bound(&self, variable: ElementId) -> Type {
        self.elements
            .type_variable_bound(variable)
            .cloned()
            .unwrap_or_else(|| self.core().object_type())
    }

    /// Follow variable-to-variable bounds until a non-variable type.
    /// A cycle among bounds resolves to `Object`.
    pub fn resolve_variable(&self, variable: ElementId) -> Type {
        let mut visited = HashSet::new();
        visited.insert(variable);
        let mut bound = self.variable_bound(variable);
        while let Some(next) = bound.as_variable() {
            if !visited.insert(next) {
                trace!(variable = variable.0, "cyclic type variable bounds");
                return self.core().object_type();
            }
            bound = self.variable_bound(next);
        }
        bound
    }

    /// View an ancestor declaration `sup` (written in terms of the type
    /// parameters of `sub`'s class) from `sub`. Raw subtypes see raw
    /// ancestors.
    pub fn as_supertype(&self, sub: &InterfaceType, sup: &Type) -> Type {
        if self.is_raw(sub) {
            return match sup.repr() {
                TypeRepr::Interface(iface) => Type::interface(iface.element, Vec::new()),
                TypeRepr::FunctionAlias(iface) => Type::alias(iface.element, Vec::new()),
                _ => sup.clone(),
            };
        }
        let parameters = self.elements.type_parameter_types(sub.element);
        sup.subst(&sub.arguments, &parameters)
    }

    /// Direct supertype of `iface`, substituted. Function aliases are
    /// function types and so sit directly below `Function`.
    pub fn supertype(&self, iface: &InterfaceType) -> Option<InterfaceType> {
        let element = self.elements.lookup(iface.element)?;
        if element.alias_info().is_some() {
            return Some(InterfaceType::new(self.core().function, Vec::new()));
        }
        let declared = element.class_info()?.supertype.as_ref()?;
        self.as_supertype(iface, declared).as_interface().cloned()
    }

    /// Directly implemented interfaces of `iface`, substituted.
    pub fn interfaces(&self, iface: &InterfaceType) -> Vec<InterfaceType> {
        let Some(info) = self.elements.class_info(iface.element) else {
            return Vec::new();
        };
        info.interfaces
            .iter()
            .filter_map(|declared| self.as_supertype(iface, declared).as_interface().cloned())
            .collect()
    }

    /// Interface view of any type: functions are instances of the core
    /// `Function` interface and variables are viewed through their bound.
    pub fn interface_view(&self, ty: &Type) -> Option<InterfaceType> {
        match ty.repr() {
            TypeRepr::Interface(iface) | TypeRepr::FunctionAlias(iface) => Some(iface.clone()),
            TypeRepr::Function(_) => Some(InterfaceType::new(self.core().function, Vec::new())),
            TypeRepr::Variable(variable) => self.interface_view(&self.resolve_variable(*variable)),
            TypeRepr::Dynamic | TypeRepr::Void | TypeRepr::Union(_) => None,
        }
    }

    /// The ancestor of `ty` declared by `target`, with type arguments
    /// substituted along the way, if there is one.
    pub fn as_instance_of(&self, ty: &Type, target: ElementId) -> Option<InterfaceType> {
        if let TypeRepr::Union(members) = ty.repr() {
            return members.iter().find_map(|member| self.as_instance_of(member, target));
        }
        let start = self.interface_view(ty)?;
        let mut visited = HashSet::new();
        self.walk(&start, target, &mut visited)
    }

    fn walk(
        &self,
        iface: &InterfaceType,
        target: ElementId,
        visited: &mut HashSet<InterfaceType>,
    ) -> Option<InterfaceType> {
        if iface.element == target {
            return Some(iface.clone());
        }
        if !visited.insert(iface.clone()) {
            return None;
        }
        if let Some(sup) = self.supertype(iface)
            && let Some(found) = self.walk(&sup, target, visited)
        {
            return Some(found);
        }
        self.interfaces(iface)
            .iter()
            .find_map(|interface| self.walk(interface, target, visited))
    }

    /// All ancestors of `ty` including itself: the superclass chain depth
    /// first, then implemented interfaces, with `Object` last.
    pub fn ancestors(&self, ty: &Type) -> Vec<InterfaceType> {
        let mut out = Vec::new();
        match ty.repr() {
            TypeRepr::Union(members) => {
                for member in members {
                    for ancestor in self.ancestors(member) {
                        if !out.contains(&ancestor) {
                            out.push(ancestor);
                        }
                    }
                }
                return out;
            }
            _ => {
                if let Some(start) = self.interface_view(ty) {
                    let mut visited = HashSet::new();
                    self.linearize(&start, &mut out, &mut visited);
                }
            }
        }
        let object = InterfaceType::new(self.core().object, Vec::new());
        out.retain(|ancestor| ancestor != &object);
        if self.interface_view(ty).is_some() {
            out.push(object);
        }
        out
    }

    fn linearize(
        &self,
        iface: &InterfaceType,
        out: &mut Vec<InterfaceType>,
        visited: &mut HashSet<InterfaceType>,
    ) {
        if !visited.insert(iface.clone()) {
            return;
        }
        out.push(iface.clone());
        if let Some(sup) = self.supertype(iface) {
            self.linearize(&sup, out, visited);
        }
        for interface in self.interfaces(iface) {
            self.linearize(&interface, out, visited);
        }
    }

    /// Expand a function alias applied to `iface.arguments` into its
    /// function type. Raw aliases expand with `dynamic` arguments.
    pub fn expand_alias(&self, iface: &InterfaceType) -> Option<Type> {
        let info = self.elements.lookup(iface.element)?.alias_info()?;
        let parameters: Vec<Type> = info.type_parameters.iter().map(|p| Type::variable(*p)).collect();
        let arguments = if self.is_raw(iface) {
            vec![Type::dynamic(); parameters.len()]
        } else {
            iface.arguments.clone()
        };
        Some(Type::function(super::subst::subst_function(
            &info.function_type,
            &arguments,
            &parameters,
        )))
    }
}
