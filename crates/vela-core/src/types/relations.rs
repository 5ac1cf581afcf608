//! Subtyping, assignability, least upper bounds and intersections.

use std::collections::HashSet;

use tracing::trace;

use super::{FunctionType, InterfaceType, Type, TypeRepr, Types};
use crate::elements::ElementId;

impl Types<'_> {
    /// `t <: s`. `dynamic` is both top and bottom.
    pub fn is_subtype(&self, t: &Type, s: &Type) -> bool {
        if t.is_dynamic() || s.is_dynamic() || t == s {
            return true;
        }
        if let TypeRepr::Union(members) = t.repr() {
            return members.iter().any(|member| self.is_subtype(member, s));
        }
        match s.repr() {
            TypeRepr::Dynamic => true,
            TypeRepr::Void => t.is_void(),
            TypeRepr::Interface(target) => self.is_interface_subtype(t, target),
            TypeRepr::FunctionAlias(alias) => match t.repr() {
                TypeRepr::Variable(variable) => self.is_subtype(&self.resolve_variable(*variable), s),
                TypeRepr::Interface(_) => self.is_interface_subtype(t, alias),
                TypeRepr::FunctionAlias(own) if own.element == alias.element => {
                    self.is_interface_subtype(t, alias)
                }
                _ => self
                    .expand_alias(alias)
                    .is_some_and(|expanded| self.is_subtype(t, &expanded)),
            },
            TypeRepr::Function(sf) => match t.repr() {
                TypeRepr::Function(tf) => self.is_function_subtype(tf, sf),
                TypeRepr::FunctionAlias(alias) => self
                    .expand_alias(alias)
                    .and_then(|expanded| expanded.as_function().cloned())
                    .is_some_and(|tf| self.is_function_subtype(&tf, sf)),
                _ => false,
            },
            TypeRepr::Variable(target) => self.is_variable_subtype(t, *target),
            TypeRepr::Union(members) => members.iter().all(|member| self.is_subtype(t, member)),
        }
    }

    fn is_interface_subtype(&self, t: &Type, target: &InterfaceType) -> bool {
        if t.is_void() {
            return false;
        }
        if target.element == self.core().object {
            return true;
        }
        let Some(found) = self.as_instance_of(t, target.element) else {
            return false;
        };
        if self.is_raw(&found) || self.is_raw(target) {
            return true;
        }
        found.arguments.len() == target.arguments.len()
            && found
                .arguments
                .iter()
                .zip(&target.arguments)
                .all(|(a, b)| self.is_subtype(a, b))
    }

    /// A variable satisfies a variable-kind target only through a chain of
    /// variable bounds; a concrete bound never does.
    fn is_variable_subtype(&self, t: &Type, target: ElementId) -> bool {
        let mut visited = HashSet::new();
        let mut current = t.as_variable();
        while let Some(variable) = current {
            if variable == target {
                return true;
            }
            if !visited.insert(variable) {
                return false;
            }
            current = self
                .elements()
                .type_variable_bound(variable)
                .and_then(Type::as_variable);
        }
        false
    }

    /// Subtyping between signatures. Required parameters are compared with
    /// assignability, not subtyping.
    pub fn is_function_subtype(&self, t: &FunctionType, s: &FunctionType) -> bool {
        if !(s.return_type.is_void() || self.is_assignable(&t.return_type, &s.return_type)) {
            return false;
        }
        match (&t.rest, &s.rest) {
            (None, None) => {}
            (Some(t_rest), Some(s_rest)) => {
                if !self.is_assignable(s_rest, t_rest) {
                    return false;
                }
            }
            _ => return false,
        }
        if t.named.is_empty() && !s.named.is_empty() {
            return false;
        }
        for (i, (name, s_ty)) in s.named.iter().enumerate() {
            match t.named.get_index(i) {
                Some((t_name, t_ty)) if t_name == name && self.is_assignable(t_ty, s_ty) => {}
                _ => return false,
            }
        }
        for (i, s_ty) in s.optional.values().enumerate() {
            match t.optional.get_index(i) {
                Some((_, t_ty)) if self.is_assignable(t_ty, s_ty) => {}
                _ => return false,
            }
        }
        self.are_assignable(&s.parameters, &t.parameters)
    }

    /// `t <: s || s <: t`, and anything inferred is assignable both ways.
    pub fn is_assignable(&self, t: &Type, s: &Type) -> bool {
        if t.is_inferred() || s.is_inferred() {
            return true;
        }
        self.is_subtype(t, s) || self.is_subtype(s, t)
    }

    /// Element-wise assignability of two lists of equal length.
    pub fn are_assignable(&self, ts: &[Type], ss: &[Type]) -> bool {
        ts.len() == ss.len() && ts.iter().zip(ss).all(|(t, s)| self.is_assignable(t, s))
    }

    pub fn least_upper_bound(&self, t: &Type, s: &Type) -> Type {
        if self.is_subtype(t, s) {
            return s.clone();
        }
        if self.is_subtype(s, t) {
            return t.clone();
        }
        let others = self.ancestors(s);
        let lub = self
            .ancestors(t)
            .into_iter()
            .find(|ancestor| others.contains(ancestor))
            .map(Type::from)
            .unwrap_or_else(|| self.core().object_type());
        trace!(
            t = %t.display(self.elements()),
            s = %s.display(self.elements()),
            lub = %lub.display(self.elements()),
            "least upper bound"
        );
        lub
    }

    /// Most specific common ancestors of `types`: `Object` when nothing is
    /// shared, a single type, or a union of incomparable ancestors.
    pub fn intersection(&self, types: &[Type]) -> Type {
        let Some(first) = types.first() else {
            return self.core().object_type();
        };
        if types.iter().all(|ty| ty == first) {
            return first.clone();
        }
        let mut common = self.ancestors(first);
        for ty in &types[1..] {
            let ancestors = self.ancestors(ty);
            common.retain(|ancestor| ancestors.contains(ancestor));
        }
        let specific: Vec<InterfaceType> = common
            .iter()
            .filter(|candidate| {
                !common.iter().any(|other| {
                    other != *candidate && self.ancestors(&Type::from((*other).clone())).contains(*candidate)
                })
            })
            .cloned()
            .collect();
        match specific.len() {
            0 => self.core().object_type(),
            1 => Type::from(specific[0].clone()),
            _ => Type::union(specific.into_iter().map(Type::from).collect()),
        }
    }

    /// Combine two narrowings of the same variable: the more specific one
    /// wins, incomparable ones give up to an inferred `dynamic`.
    pub fn narrow_union(&self, a: &Type, b: &Type) -> Type {
        if self.is_subtype(a, b) && !a.is_dynamic() {
            a.clone()
        } else if self.is_subtype(b, a) {
            b.clone()
        } else {
            Type::dynamic().inferred()
        }
    }
}
