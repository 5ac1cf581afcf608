//! The core library every element table starts with.

use serde::{Deserialize, Serialize};

use super::{ElementId, ElementTable, LibraryId, Modifiers, ParamSpec};
use crate::types::Type;

/// Handles of the core library classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreTypes {
    pub object: ElementId,
    pub boolean: ElementId,
    pub num: ElementId,
    pub int: ElementId,
    pub double: ElementId,
    pub string: ElementId,
    pub function: ElementId,
    pub list: ElementId,
    pub map: ElementId,
}

impl CoreTypes {
    pub fn object_type(&self) -> Type {
        Type::interface(self.object, Vec::new())
    }

    pub fn bool_type(&self) -> Type {
        Type::interface(self.boolean, Vec::new())
    }

    pub fn num_type(&self) -> Type {
        Type::interface(self.num, Vec::new())
    }

    pub fn int_type(&self) -> Type {
        Type::interface(self.int, Vec::new())
    }

    pub fn double_type(&self) -> Type {
        Type::interface(self.double, Vec::new())
    }

    pub fn string_type(&self) -> Type {
        Type::interface(self.string, Vec::new())
    }

    pub fn function_type(&self) -> Type {
        Type::interface(self.function, Vec::new())
    }

    pub fn list_of(&self, element: Type) -> Type {
        Type::interface(self.list, vec![element])
    }

    pub fn map_of(&self, key: Type, value: Type) -> Type {
        Type::interface(self.map, vec![key, value])
    }

    pub fn is_int(&self, ty: &Type) -> bool {
        ty.element() == Some(self.int)
    }

    pub fn is_double(&self, ty: &Type) -> bool {
        ty.element() == Some(self.double)
    }

    pub fn is_num(&self, ty: &Type) -> bool {
        ty.element() == Some(self.num)
    }

    /// `int`, `double` or `num`
    pub fn is_numeric(&self, ty: &Type) -> bool {
        self.is_int(ty) || self.is_double(ty) || self.is_num(ty)
    }
}

fn operator(table: &mut ElementTable, class: ElementId, name: &str, params: Vec<Type>, ret: Type) {
    let params = params
        .into_iter()
        .enumerate()
        .map(|(i, ty)| ParamSpec::required(format!("arg{i}"), ty))
        .collect();
    table.add_method(Some(class), LibraryId::CORE, name, params, ret, Modifiers::default());
}

pub(super) fn bootstrap() -> ElementTable {
    let placeholder = ElementId(0);
    let mut table = ElementTable {
        elements: Vec::new(),
        core: CoreTypes {
            object: placeholder,
            boolean: placeholder,
            num: placeholder,
            int: placeholder,
            double: placeholder,
            string: placeholder,
            function: placeholder,
            list: placeholder,
            map: placeholder,
        },
        next_library: 0,
    };

    let lib = LibraryId::CORE;
    let object = table.add_class("Object", lib);
    if let Some(info) = table.class_info_mut(object) {
        info.supertype = None;
    }
    table.core.object = object;

    let boolean = table.add_class("bool", lib);
    let num = table.add_class("num", lib);
    table.set_abstract(num);
    let int = table.add_class("int", lib);
    let double = table.add_class("double", lib);
    let string = table.add_class("String", lib);
    let function = table.add_interface("Function", lib);
    let list = table.add_class("List", lib);
    let map = table.add_class("Map", lib);
    table.core = CoreTypes {
        object,
        boolean,
        num,
        int,
        double,
        string,
        function,
        list,
        map,
    };
    let core = table.core;

    let num_type = core.num_type();
    table.set_supertype(int, num_type.clone());
    table.set_supertype(double, num_type.clone());

    operator(&mut table, object, "==", vec![core.object_type()], core.bool_type());
    table.add_method(
        Some(object),
        lib,
        "toString",
        Vec::new(),
        core.string_type(),
        Modifiers::default(),
    );

    for name in ["+", "-", "*", "/", "%"] {
        operator(&mut table, num, name, vec![num_type.clone()], num_type.clone());
    }
    operator(&mut table, num, "~/", vec![num_type.clone()], core.int_type());
    for name in ["<", ">", "<=", ">="] {
        operator(&mut table, num, name, vec![num_type.clone()], core.bool_type());
    }
    operator(&mut table, num, "unary-", Vec::new(), num_type.clone());

    for name in ["&", "|", "^", "<<", ">>"] {
        operator(&mut table, int, name, vec![core.int_type()], core.int_type());
    }
    operator(&mut table, int, "~", Vec::new(), core.int_type());

    operator(&mut table, string, "+", vec![core.string_type()], core.string_type());
    operator(&mut table, string, "[]", vec![core.int_type()], core.string_type());
    table.add_field(string, "length", core.int_type(), Modifiers::final_());

    let e = Type::variable(table.add_class_type_parameter(list, "E", None));
    operator(&mut table, list, "[]", vec![core.int_type()], e.clone());
    operator(&mut table, list, "[]=", vec![core.int_type(), e.clone()], Type::void());
    operator(&mut table, list, "add", vec![e], Type::void());
    table.add_field(list, "length", core.int_type(), Modifiers::final_());

    let k = Type::variable(table.add_class_type_parameter(map, "K", None));
    let v = Type::variable(table.add_class_type_parameter(map, "V", None));
    operator(&mut table, map, "[]", vec![k.clone()], v.clone());
    operator(&mut table, map, "[]=", vec![k.clone(), v], Type::void());
    operator(&mut table, map, "containsKey", vec![k], core.bool_type());
    table.add_field(map, "length", core.int_type(), Modifiers::final_());

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_is_root() {
        let table = ElementTable::new();
        let core = table.core();
        assert_eq!(table.class_info(core.object).unwrap().supertype, None);
        assert_eq!(
            table.class_info(core.int).unwrap().supertype,
            Some(core.num_type())
        );
        assert_eq!(table.name(core.string), "String");
    }

    #[test]
    fn test_generic_core_classes() {
        let table = ElementTable::new();
        let core = table.core();
        assert_eq!(table.class_info(core.list).unwrap().type_parameters.len(), 1);
        assert_eq!(table.class_info(core.map).unwrap().type_parameters.len(), 2);
        assert!(table.own_member(core.list, "[]=").is_some());
    }

    #[test]
    fn test_numeric_predicates() {
        let table = ElementTable::new();
        let core = table.core();
        assert!(core.is_numeric(&core.int_type()));
        assert!(core.is_numeric(&core.num_type()));
        assert!(!core.is_numeric(&core.string_type()));
    }
}
