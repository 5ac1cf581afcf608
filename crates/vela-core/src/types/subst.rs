//! Type-argument substitution.

use indexmap::IndexMap;

use super::{FunctionType, InterfaceType, Type, TypeRepr};

impl Type {
    /// Replace type variables listed in `parameters` by the argument at the
    /// same position in `arguments`.
    ///
    /// Arguments and parameters are walked in lock-step, so a variable that
    /// does not occur in `parameters` (or whose position has no argument) is
    /// left alone. The quality of `self` is preserved.
    pub fn subst(&self, arguments: &[Type], parameters: &[Type]) -> Type {
        if arguments.is_empty() && parameters.is_empty() {
            return self.clone();
        }
        let repr = match self.repr() {
            TypeRepr::Dynamic | TypeRepr::Void => return self.clone(),
            TypeRepr::Variable(element) => {
                let replacement = arguments
                    .iter()
                    .zip(parameters)
                    .find(|(_, param)| param.as_variable() == Some(*element))
                    .map(|(arg, _)| arg.clone());
                return match replacement {
                    Some(arg) if self.is_inferred() => arg.inferred(),
                    Some(arg) => arg,
                    None => self.clone(),
                };
            }
            TypeRepr::Interface(iface) => {
                TypeRepr::Interface(subst_interface(iface, arguments, parameters))
            }
            TypeRepr::FunctionAlias(iface) => {
                TypeRepr::FunctionAlias(subst_interface(iface, arguments, parameters))
            }
            TypeRepr::Function(func) => TypeRepr::Function(subst_function(func, arguments, parameters)),
            TypeRepr::Union(members) => TypeRepr::Union(subst_all(members, arguments, parameters)),
        };
        Type::from_repr(repr).with_quality(self.quality())
    }
}

fn subst_all(types: &[Type], arguments: &[Type], parameters: &[Type]) -> Vec<Type> {
    types.iter().map(|ty| ty.subst(arguments, parameters)).collect()
}

fn subst_map(
    map: &IndexMap<String, Type>,
    arguments: &[Type],
    parameters: &[Type],
) -> IndexMap<String, Type> {
    map.iter()
        .map(|(name, ty)| (name.clone(), ty.subst(arguments, parameters)))
        .collect()
}

fn subst_interface(iface: &InterfaceType, arguments: &[Type], parameters: &[Type]) -> InterfaceType {
    InterfaceType {
        element: iface.element,
        arguments: subst_all(&iface.arguments, arguments, parameters),
    }
}

pub(crate) fn subst_function(
    func: &FunctionType,
    arguments: &[Type],
    parameters: &[Type],
) -> FunctionType {
    FunctionType {
        element: func.element,
        parameters: subst_all(&func.parameters, arguments, parameters),
        optional: subst_map(&func.optional, arguments, parameters),
        named: subst_map(&func.named, arguments, parameters),
        rest: func.rest.as_ref().map(|rest| rest.subst(arguments, parameters)),
        return_type: func.return_type.subst(arguments, parameters),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::ElementTable;

    #[test]
    fn test_subst_replaces_matching_variable() {
        let mut table = ElementTable::new();
        let t = table.add_type_variable("T", None);
        let u = table.add_type_variable("U", None);
        let core = table.core();

        let list_of_t = core.list_of(Type::variable(t));
        let result = list_of_t.subst(&[core.int_type()], &[Type::variable(t)]);
        assert_eq!(result, core.list_of(core.int_type()));

        // U is not a parameter, so it stays untouched
        let list_of_u = core.list_of(Type::variable(u));
        assert_eq!(
            list_of_u.subst(&[core.int_type()], &[Type::variable(t)]),
            list_of_u
        );
    }

    #[test]
    fn test_subst_is_positional() {
        let mut table = ElementTable::new();
        let k = table.add_type_variable("K", None);
        let v = table.add_type_variable("V", None);
        let core = table.core();

        let map = core.map_of(Type::variable(v), Type::variable(k));
        let result = map.subst(
            &[core.string_type(), core.int_type()],
            &[Type::variable(k), Type::variable(v)],
        );
        assert_eq!(result, core.map_of(core.int_type(), core.string_type()));
    }

    #[test]
    fn test_subst_function_parts() {
        let mut table = ElementTable::new();
        let t = table.add_type_variable("T", None);
        let core = table.core();
        let tv = Type::variable(t);

        let func = Type::function(
            FunctionType::new(vec![tv.clone()], tv.clone())
                .with_optional("o", tv.clone())
                .with_named("n", tv.clone())
                .with_rest(tv.clone()),
        );
        let expected = Type::function(
            FunctionType::new(vec![core.int_type()], core.int_type())
                .with_optional("o", core.int_type())
                .with_named("n", core.int_type())
                .with_rest(core.int_type()),
        );
        assert_eq!(func.subst(&[core.int_type()], &[tv]), expected);
    }

    #[test]
    fn test_subst_empty_is_identity() {
        let mut table = ElementTable::new();
        let t = table.add_type_variable("T", None);
        let core = table.core();
        for ty in [
            Type::dynamic(),
            Type::void(),
            Type::variable(t),
            core.list_of(Type::variable(t)),
            Type::function(FunctionType::new(vec![Type::variable(t)], Type::void())),
        ] {
            assert_eq!(ty.subst(&[], &[]), ty);
        }
    }

    #[test]
    fn test_subst_preserves_quality() {
        let mut table = ElementTable::new();
        let t = table.add_type_variable("T", None);
        let core = table.core();
        let inferred = core.list_of(Type::variable(t)).inferred();
        let result = inferred.subst(&[core.int_type()], &[Type::variable(t)]);
        assert!(result.is_inferred());
    }
}
