//! Property-based tests for the type relations.
//!
//! Types are generated over the core library: interface types with and
//! without type arguments, function types, unions, `dynamic`, each either
//! exact or inferred.

use proptest::prelude::*;
use vela_core::elements::{CoreTypes, ElementTable};
use vela_core::types::{FunctionType, Type, Types};

fn core() -> CoreTypes {
    *ElementTable::new().core()
}

fn arb_leaf() -> impl Strategy<Value = Type> {
    let core = core();
    prop_oneof![
        Just(Type::dynamic()),
        Just(core.object_type()),
        Just(core.num_type()),
        Just(core.int_type()),
        Just(core.double_type()),
        Just(core.string_type()),
        Just(core.bool_type()),
        Just(core.function_type()),
    ]
}

fn arb_type() -> impl Strategy<Value = Type> {
    let core = core();
    let inner = arb_leaf().prop_recursive(3, 16, 3, move |inner| {
        prop_oneof![
            inner.clone().prop_map(move |element| core.list_of(element)),
            (inner.clone(), inner.clone()).prop_map(move |(k, v)| core.map_of(k, v)),
            (prop::collection::vec(inner.clone(), 0..3), inner.clone())
                .prop_map(|(params, ret)| Type::function(FunctionType::new(params, ret))),
        ]
    });
    (inner, any::<bool>()).prop_map(|(ty, inferred)| if inferred { ty.inferred() } else { ty })
}

proptest! {
    /// Property: `dynamic` is both the top and the bottom type
    #[test]
    fn dynamic_is_top_and_bottom(ty in arb_type()) {
        let table = ElementTable::new();
        let types = Types::new(&table);
        prop_assert!(types.is_subtype(&ty, &Type::dynamic()));
        prop_assert!(types.is_subtype(&Type::dynamic(), &ty));
    }

    /// Property: subtyping is reflexive
    #[test]
    fn subtyping_is_reflexive(ty in arb_type()) {
        let table = ElementTable::new();
        let types = Types::new(&table);
        prop_assert!(types.is_subtype(&ty, &ty));
    }

    /// Property: a raw generic type is a subtype of every parameterization
    #[test]
    fn raw_is_subtype_of_parameterized(element in arb_type(), value in arb_type()) {
        let table = ElementTable::new();
        let types = Types::new(&table);
        let core = table.core();
        let raw_list = Type::interface(core.list, vec![]);
        let raw_map = Type::interface(core.map, vec![]);
        prop_assert!(types.is_subtype(&raw_list, &core.list_of(element)));
        prop_assert!(types.is_subtype(&raw_map, &core.map_of(core.string_type(), value)));
    }

    /// Property: assignability is symmetric
    #[test]
    fn assignability_is_symmetric(t in arb_type(), s in arb_type()) {
        let table = ElementTable::new();
        let types = Types::new(&table);
        prop_assert_eq!(types.is_assignable(&t, &s), types.is_assignable(&s, &t));
    }

    /// Property: substituting nothing changes nothing
    #[test]
    fn empty_substitution_is_identity(ty in arb_type()) {
        let substituted = ty.subst(&[], &[]);
        prop_assert_eq!(&substituted, &ty);
        prop_assert_eq!(substituted.quality(), ty.quality());
    }

    /// Property: the least upper bound of a type with itself is the type
    #[test]
    fn lub_of_self_is_self(ty in arb_type()) {
        let table = ElementTable::new();
        let types = Types::new(&table);
        prop_assert_eq!(types.least_upper_bound(&ty, &ty), ty);
    }

    /// Property: the intersection of a single type is that type
    #[test]
    fn intersection_of_one_is_itself(ty in arb_type()) {
        let table = ElementTable::new();
        let types = Types::new(&table);
        prop_assert_eq!(types.intersection(std::slice::from_ref(&ty)), ty);
    }

    /// Property: the least upper bound is above both operands
    #[test]
    fn lub_is_an_upper_bound(t in arb_leaf(), s in arb_leaf()) {
        let table = ElementTable::new();
        let types = Types::new(&table);
        let lub = types.least_upper_bound(&t, &s);
        prop_assert!(types.is_subtype(&t, &lub));
        prop_assert!(types.is_subtype(&s, &lub));
    }
}

#[test]
fn test_void_return_accepts_any_return() {
    let table = ElementTable::new();
    let types = Types::new(&table);
    let int = table.core().int_type();
    let returns_int = FunctionType::new(vec![int.clone()], int.clone());
    let returns_void = FunctionType::new(vec![int], Type::void());
    assert!(types.is_function_subtype(&returns_int, &returns_void));
    assert!(!types.is_function_subtype(&returns_void, &returns_int));
}

#[test]
fn test_named_parameters_extend_by_prefix() {
    let table = ElementTable::new();
    let types = Types::new(&table);
    let int = table.core().int_type();
    let base = FunctionType::new(vec![], Type::void());
    let ab = base.clone().with_named("a", int.clone()).with_named("b", int.clone());
    let a = base.clone().with_named("a", int.clone());
    let ac = base.with_named("a", int.clone()).with_named("c", int);
    assert!(types.is_function_subtype(&ab, &a));
    assert!(!types.is_function_subtype(&ab, &ac));
}
