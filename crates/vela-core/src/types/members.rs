//! Member lookup through the class hierarchy.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, trace};

use super::{InterfaceType, Type, TypeRepr, Types};
use crate::elements::{Element, ElementId, ElementKind, ElementTable};

/// A member element seen through the interface type it was found on.
///
/// `holder` is the declaring class applied to the receiver's (substituted)
/// arguments, so inherited generic members specialize correctly.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub holder: InterfaceType,
    pub element: ElementId,
}

impl Member {
    pub fn new(holder: InterfaceType, element: ElementId) -> Self {
        Member { holder, element }
    }

    pub fn name<'t>(&self, types: &Types<'t>) -> &'t str {
        types.elements().name(self.element)
    }

    pub fn element<'t>(&self, types: &Types<'t>) -> &'t Element {
        types.elements().get(self.element)
    }

    pub fn is_static(&self, types: &Types<'_>) -> bool {
        self.element(types).is_static()
    }

    /// Substitute the holder's arguments into a type written against the
    /// declaring class. Raw holders specialize to `dynamic`.
    pub fn specialize(&self, types: &Types<'_>, ty: &Type) -> Type {
        let parameters = types.elements().type_parameter_types(self.holder.element);
        if parameters.is_empty() {
            return ty.clone();
        }
        if types.is_raw(&self.holder) {
            return ty.subst(&vec![Type::dynamic(); parameters.len()], &parameters);
        }
        ty.subst(&self.holder.arguments, &parameters)
    }

    /// Declared type of the member, specialized to the holder.
    pub fn get_type(&self, types: &Types<'_>) -> Type {
        self.specialize(types, &self.element(types).ty)
    }

    /// Type read through `receiver.name`. Methods read as their signature.
    pub fn getter_type(&self, types: &Types<'_>) -> Option<Type> {
        let element = self.element(types);
        let Some(info) = element.field_info() else {
            return Some(self.get_type(types));
        };
        if !info.is_property {
            return Some(self.get_type(types));
        }
        let accessor = info
            .getter
            .or_else(|| self.accessor(types, "get:", &element.name))?;
        let signature = types.elements().function_type(accessor)?;
        Some(self.specialize(types, &signature.return_type))
    }

    /// Type written through `receiver.name = value`; `None` when the member
    /// cannot be assigned.
    pub fn setter_type(&self, types: &Types<'_>) -> Option<Type> {
        let element = self.element(types);
        let info = element.field_info()?;
        if !info.is_property {
            return (!element.modifiers.is_final).then(|| self.get_type(types));
        }
        let accessor = info
            .setter
            .or_else(|| self.accessor(types, "set:", &element.name))?;
        let signature = types.elements().function_type(accessor)?;
        let parameter = signature.parameters.first()?;
        Some(self.specialize(types, parameter))
    }

    fn accessor(&self, types: &Types<'_>, prefix: &str, name: &str) -> Option<ElementId> {
        let holder = Type::from(self.holder.clone());
        types
            .lookup_member(&holder, &format!("{prefix}{name}"))
            .map(|member| member.element)
    }
}

impl Types<'_> {
    /// Find `name` on `ty`: own members first, then the supertype, then each
    /// interface, then `Object`. Unions try their members in order.
    pub fn lookup_member(&self, ty: &Type, name: &str) -> Option<Member> {
        if let TypeRepr::Union(members) = ty.repr() {
            return members.iter().find_map(|member| self.lookup_member(member, name));
        }
        let start = self.interface_view(ty)?;
        let mut visited = HashSet::new();
        // interfaces have no supertype but still inherit from Object
        let found = self.lookup_in(&start, name, &mut visited).or_else(|| {
            let object = InterfaceType::new(self.core().object, Vec::new());
            self.lookup_in(&object, name, &mut visited)
        });
        trace!(name, found = found.is_some(), "member lookup");
        found
    }

    fn lookup_in(
        &self,
        iface: &InterfaceType,
        name: &str,
        visited: &mut HashSet<InterfaceType>,
    ) -> Option<Member> {
        if !visited.insert(iface.clone()) {
            return None;
        }
        if let Some(element) = self.elements().own_member(iface.element, name) {
            return Some(Member::new(iface.clone(), element));
        }
        if let Some(sup) = self.supertype(iface)
            && let Some(found) = self.lookup_in(&sup, name, visited)
        {
            return Some(found);
        }
        self.interfaces(iface)
            .iter()
            .find_map(|interface| self.lookup_in(interface, name, visited))
    }

    /// Whether `class` is `ancestor` or inherits from it.
    pub fn extends(&self, class: ElementId, ancestor: ElementId) -> bool {
        class == ancestor
            || self
                .as_instance_of(&Type::interface(class, Vec::new()), ancestor)
                .is_some()
    }
}

/// Reverse edges of the class hierarchy, built once per program.
#[derive(Debug, Clone, Default)]
pub struct SubclassIndex {
    subclasses: HashMap<ElementId, Vec<ElementId>>,
}

impl SubclassIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every class of `elements` under its supertype and interfaces.
    pub fn build(elements: &ElementTable) -> Self {
        let mut index = Self::new();
        for (id, element) in elements.iter() {
            if element.kind != ElementKind::Class {
                continue;
            }
            let Some(info) = element.class_info() else {
                continue;
            };
            for sup in info.supertype.iter().chain(&info.interfaces) {
                if let Some(parent) = sup.element() {
                    index.register(parent, id);
                }
            }
        }
        debug!(classes = index.subclasses.len(), "built subclass index");
        index
    }

    pub fn register(&mut self, class: ElementId, subclass: ElementId) {
        let entry = self.subclasses.entry(class).or_default();
        if !entry.contains(&subclass) {
            entry.push(subclass);
        }
    }

    pub fn subclasses(&self, class: ElementId) -> &[ElementId] {
        self.subclasses.get(&class).map_or(&[], Vec::as_slice)
    }

    /// Look `name` up on the known subclasses of `class`, transitively.
    /// Several unrelated declarations make the answer ambiguous.
    pub fn lookup_subtype_member(
        &self,
        types: &Types<'_>,
        class: ElementId,
        name: &str,
    ) -> Option<Member> {
        let mut queue: VecDeque<ElementId> = self.subclasses(class).iter().copied().collect();
        let mut visited = HashSet::new();
        let mut found: Vec<(ElementId, ElementId)> = Vec::new();
        while let Some(sub) = queue.pop_front() {
            if !visited.insert(sub) {
                continue;
            }
            if let Some(member) = types.elements().own_member(sub, name) {
                found.push((sub, member));
            }
            queue.extend(self.subclasses(sub).iter().copied());
        }
        let roots: Vec<_> = found
            .iter()
            .filter(|(class, _)| {
                !found
                    .iter()
                    .any(|(other, _)| other != class && types.extends(*class, *other))
            })
            .collect();
        match roots.as_slice() {
            [(holder, member)] => Some(Member::new(InterfaceType::new(*holder, Vec::new()), *member)),
            [] => None,
            _ => {
                debug!(name, candidates = roots.len(), "ambiguous sub-type member");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::Modifiers;

    #[test]
    fn test_inherited_generic_member_specializes() {
        let mut table = ElementTable::new();
        let lib = table.new_library();
        let base = table.add_class("Base", lib);
        let t = table.add_class_type_parameter(base, "T", None);
        table.add_field(base, "value", Type::variable(t), Modifiers::default());
        let derived = table.add_class("Derived", lib);
        let u = table.add_class_type_parameter(derived, "U", None);
        table.set_supertype(derived, Type::interface(base, vec![Type::variable(u)]));

        let types = Types::new(&table);
        let string = table.core().string_type();
        let receiver = Type::interface(derived, vec![string.clone()]);
        let member = types.lookup_member(&receiver, "value").unwrap();
        assert_eq!(member.holder.element, base);
        assert_eq!(member.get_type(&types), string);
        assert_eq!(member.setter_type(&types), Some(string));
    }

    #[test]
    fn test_raw_receiver_specializes_to_dynamic() {
        let table = ElementTable::new();
        let types = Types::new(&table);
        let raw = Type::interface(table.core().list, vec![]);
        let member = types.lookup_member(&raw, "[]").unwrap();
        let signature = member.get_type(&types);
        assert!(signature.as_function().unwrap().return_type.is_dynamic());
    }

    #[test]
    fn test_supertype_wins_over_interfaces() {
        let mut table = ElementTable::new();
        let lib = table.new_library();
        let int = table.core().int_type();
        let string = table.core().string_type();
        let iface = table.add_interface("Sized", lib);
        table.add_field(iface, "size", string, Modifiers::default());
        let base = table.add_class("Base", lib);
        let from_base = table.add_field(base, "size", int, Modifiers::default());
        let class = table.add_class("C", lib);
        table.set_supertype(class, Type::interface(base, vec![]));
        table.add_implemented(class, Type::interface(iface, vec![]));
        let types = Types::new(&table);
        let member = types.lookup_member(&Type::interface(class, vec![]), "size").unwrap();
        assert_eq!(member.element, from_base);
    }

    #[test]
    fn test_final_field_has_no_setter() {
        let table = ElementTable::new();
        let types = Types::new(&table);
        let member = types
            .lookup_member(&table.core().string_type(), "length")
            .unwrap();
        assert_eq!(member.getter_type(&types), Some(table.core().int_type()));
        assert_eq!(member.setter_type(&types), None);
    }

    #[test]
    fn test_property_accessors() {
        let mut table = ElementTable::new();
        let lib = table.new_library();
        let int = table.core().int_type();
        let class = table.add_class("C", lib);
        table.add_getter(class, "readOnly", int.clone(), Modifiers::default());
        table.add_getter(class, "both", int.clone(), Modifiers::default());
        table.add_setter(class, "both", int.clone(), Modifiers::default());
        table.add_setter(class, "writeOnly", int.clone(), Modifiers::default());
        let types = Types::new(&table);
        let receiver = Type::interface(class, vec![]);

        let read_only = types.lookup_member(&receiver, "readOnly").unwrap();
        assert_eq!(read_only.getter_type(&types), Some(int.clone()));
        assert_eq!(read_only.setter_type(&types), None);

        let both = types.lookup_member(&receiver, "both").unwrap();
        assert_eq!(both.setter_type(&types), Some(int.clone()));

        let write_only = types.lookup_member(&receiver, "writeOnly").unwrap();
        assert_eq!(write_only.getter_type(&types), None);
        assert_eq!(write_only.setter_type(&types), Some(int));
    }

    #[test]
    fn test_interfaces_inherit_object_members() {
        let mut table = ElementTable::new();
        let lib = table.new_library();
        let pet = table.add_interface("Pet", lib);
        let types = Types::new(&table);
        let core = table.core();
        let member = types
            .lookup_member(&Type::interface(pet, vec![]), "toString")
            .unwrap();
        assert_eq!(member.holder.element, core.object);
        assert!(types.lookup_member(&core.function_type(), "==").is_some());
        assert!(types.lookup_member(&Type::interface(pet, vec![]), "missing").is_none());
    }

    #[test]
    fn test_union_lookup_tries_members_in_order() {
        let table = ElementTable::new();
        let types = Types::new(&table);
        let core = table.core();
        let union = Type::union(vec![core.int_type(), core.string_type()]);
        let member = types.lookup_member(&union, "length").unwrap();
        assert_eq!(member.holder.element, core.string);
        assert!(types.lookup_member(&union, "missing").is_none());
    }

    #[test]
    fn test_subtype_member_lookup() {
        let mut table = ElementTable::new();
        let lib = table.new_library();
        let void = Type::void();
        let shape = table.add_class("Shape", lib);
        let circle = table.add_class("Circle", lib);
        table.set_supertype(circle, Type::interface(shape, vec![]));
        let radius = table.add_method(Some(circle), lib, "radius", vec![], void.clone(), Modifiers::default());
        let small = table.add_class("SmallCircle", lib);
        table.set_supertype(small, Type::interface(circle, vec![]));
        table.add_method(Some(small), lib, "radius", vec![], void.clone(), Modifiers::default());

        let index = SubclassIndex::build(&table);
        let types = Types::new(&table);
        let found = index.lookup_subtype_member(&types, shape, "radius").unwrap();
        assert_eq!(found.element, radius);
        assert!(index.lookup_subtype_member(&types, shape, "area").is_none());

        let square = table.add_class("Square", lib);
        table.set_supertype(square, Type::interface(shape, vec![]));
        table.add_method(Some(square), lib, "radius", vec![], void, Modifiers::default());
        let index = SubclassIndex::build(&table);
        let types = Types::new(&table);
        assert!(index.lookup_subtype_member(&types, shape, "radius").is_none());
    }
}
