//! Static type representation.
//!
//! [`Type`] is an immutable, cheaply clonable value. Its shape is one of the
//! closed set of [`TypeRepr`] variants; on top of the shape every type carries
//! a [`Quality`] telling whether it was written by the user or computed by the
//! checker. Equality and hashing look at the shape only.
//!
//! The algorithms that need the element model (hierarchy walking,
//! subtyping, member lookup) live on [`Types`].

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::elements::{ElementId, ElementTable};

mod hierarchy;
mod members;
mod relations;
mod subst;

pub use hierarchy::Types;
pub use members::{Member, SubclassIndex};

/// Whether a type was declared by the user or inferred by the checker.
///
/// Inferred types are hints: assignability treats them like `dynamic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Quality {
    #[default]
    Exact,
    Inferred,
}

/// Tag of a type's shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Dynamic,
    Void,
    Interface,
    FunctionAlias,
    Function,
    Variable,
    Union,
}

impl TypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeKind::Dynamic => "dynamic",
            TypeKind::Void => "void",
            TypeKind::Interface => "interface",
            TypeKind::FunctionAlias => "function alias",
            TypeKind::Function => "function",
            TypeKind::Variable => "type variable",
            TypeKind::Union => "union",
        }
    }
}

/// A nominal type: a class, interface or function alias applied to zero or
/// more type arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterfaceType {
    pub element: ElementId,
    #[serde(default)]
    pub arguments: Vec<Type>,
}

impl InterfaceType {
    pub fn new(element: ElementId, arguments: Vec<Type>) -> Self {
        InterfaceType { element, arguments }
    }
}

/// A callable signature.
///
/// `optional` and `named` keep declaration order, which matters for override
/// checks and subtyping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionType {
    #[serde(default)]
    pub element: Option<ElementId>,
    #[serde(default)]
    pub parameters: Vec<Type>,
    #[serde(default)]
    pub optional: IndexMap<String, Type>,
    #[serde(default)]
    pub named: IndexMap<String, Type>,
    #[serde(default)]
    pub rest: Option<Type>,
    pub return_type: Type,
}

impl FunctionType {
    pub fn new(parameters: Vec<Type>, return_type: Type) -> Self {
        FunctionType {
            element: None,
            parameters,
            optional: IndexMap::new(),
            named: IndexMap::new(),
            rest: None,
            return_type,
        }
    }

    pub fn with_element(mut self, element: ElementId) -> Self {
        self.element = Some(element);
        self
    }

    pub fn with_optional(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.optional.insert(name.into(), ty);
        self
    }

    pub fn with_named(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.named.insert(name.into(), ty);
        self
    }

    pub fn with_rest(mut self, ty: Type) -> Self {
        self.rest = Some(ty);
        self
    }
}

impl PartialEq for FunctionType {
    fn eq(&self, other: &Self) -> bool {
        self.element == other.element
            && self.return_type == other.return_type
            && self.parameters == other.parameters
            && self.rest == other.rest
            && self.optional.iter().eq(other.optional.iter())
            && self.named.iter().eq(other.named.iter())
    }
}

impl Eq for FunctionType {}

impl Hash for FunctionType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.element.hash(state);
        self.parameters.hash(state);
        for (name, ty) in self.optional.iter().chain(self.named.iter()) {
            name.hash(state);
            ty.hash(state);
        }
        self.rest.hash(state);
        self.return_type.hash(state);
    }
}

/// The shape of a type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeRepr {
    Dynamic,
    Void,
    Interface(InterfaceType),
    FunctionAlias(InterfaceType),
    Function(FunctionType),
    Variable(ElementId),
    /// Several incomparable types a value is known to conform to at once
    Union(Vec<Type>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Type {
    repr: Rc<TypeRepr>,
    #[serde(default)]
    quality: Quality,
}

impl Type {
    pub fn from_repr(repr: TypeRepr) -> Self {
        Type {
            repr: Rc::new(repr),
            quality: Quality::Exact,
        }
    }

    pub fn dynamic() -> Self {
        Self::from_repr(TypeRepr::Dynamic)
    }

    pub fn void() -> Self {
        Self::from_repr(TypeRepr::Void)
    }

    pub fn interface(element: ElementId, arguments: Vec<Type>) -> Self {
        Self::from_repr(TypeRepr::Interface(InterfaceType::new(element, arguments)))
    }

    pub fn alias(element: ElementId, arguments: Vec<Type>) -> Self {
        Self::from_repr(TypeRepr::FunctionAlias(InterfaceType::new(element, arguments)))
    }

    pub fn function(function: FunctionType) -> Self {
        Self::from_repr(TypeRepr::Function(function))
    }

    pub fn variable(element: ElementId) -> Self {
        Self::from_repr(TypeRepr::Variable(element))
    }

    pub fn union(members: Vec<Type>) -> Self {
        Self::from_repr(TypeRepr::Union(members))
    }

    pub fn repr(&self) -> &TypeRepr {
        &self.repr
    }

    pub fn kind(&self) -> TypeKind {
        match &*self.repr {
            TypeRepr::Dynamic => TypeKind::Dynamic,
            TypeRepr::Void => TypeKind::Void,
            TypeRepr::Interface(_) => TypeKind::Interface,
            TypeRepr::FunctionAlias(_) => TypeKind::FunctionAlias,
            TypeRepr::Function(_) => TypeKind::Function,
            TypeRepr::Variable(_) => TypeKind::Variable,
            TypeRepr::Union(_) => TypeKind::Union,
        }
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    pub fn is_inferred(&self) -> bool {
        self.quality == Quality::Inferred
    }

    /// The same type, marked as computed by the checker.
    pub fn inferred(&self) -> Type {
        self.with_quality(Quality::Inferred)
    }

    pub fn exact(&self) -> Type {
        self.with_quality(Quality::Exact)
    }

    pub fn with_quality(&self, quality: Quality) -> Type {
        Type {
            repr: Rc::clone(&self.repr),
            quality,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(*self.repr, TypeRepr::Dynamic)
    }

    pub fn is_void(&self) -> bool {
        matches!(*self.repr, TypeRepr::Void)
    }

    /// Interface-shaped view: interfaces and function aliases.
    pub fn as_interface(&self) -> Option<&InterfaceType> {
        match &*self.repr {
            TypeRepr::Interface(iface) | TypeRepr::FunctionAlias(iface) => Some(iface),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionType> {
        match &*self.repr {
            TypeRepr::Function(func) => Some(func),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<ElementId> {
        match &*self.repr {
            TypeRepr::Variable(element) => Some(*element),
            _ => None,
        }
    }

    /// The element of an interface or alias type
    pub fn element(&self) -> Option<ElementId> {
        self.as_interface().map(|iface| iface.element)
    }

    pub fn display<'a>(&'a self, elements: &'a ElementTable) -> TypeDisplay<'a> {
        TypeDisplay { ty: self, elements }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.repr, &other.repr) || self.repr == other.repr
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.repr.hash(state);
    }
}

impl From<InterfaceType> for Type {
    fn from(iface: InterfaceType) -> Self {
        Type::from_repr(TypeRepr::Interface(iface))
    }
}

impl From<FunctionType> for Type {
    fn from(function: FunctionType) -> Self {
        Type::function(function)
    }
}

/// Renders a type with element names resolved.
pub struct TypeDisplay<'a> {
    ty: &'a Type,
    elements: &'a ElementTable,
}

impl TypeDisplay<'_> {
    fn nested<'b>(&'b self, ty: &'b Type) -> TypeDisplay<'b> {
        TypeDisplay {
            ty,
            elements: self.elements,
        }
    }

    fn write_list(&self, f: &mut fmt::Formatter<'_>, types: &[Type], sep: &str) -> fmt::Result {
        for (i, ty) in types.iter().enumerate() {
            if i > 0 {
                write!(f, "{sep}")?;
            }
            write!(f, "{}", self.nested(ty))?;
        }
        Ok(())
    }
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ty.repr() {
            TypeRepr::Dynamic => write!(f, "dynamic"),
            TypeRepr::Void => write!(f, "void"),
            TypeRepr::Interface(iface) | TypeRepr::FunctionAlias(iface) => {
                write!(f, "{}", self.elements.name(iface.element))?;
                if !iface.arguments.is_empty() {
                    write!(f, "<")?;
                    self.write_list(f, &iface.arguments, ", ")?;
                    write!(f, ">")?;
                }
                Ok(())
            }
            TypeRepr::Function(func) => {
                write!(f, "(")?;
                let mut first = true;
                let mut sep = |f: &mut fmt::Formatter<'_>| -> fmt::Result {
                    if !std::mem::take(&mut first) {
                        write!(f, ", ")?;
                    }
                    Ok(())
                };
                for param in &func.parameters {
                    sep(f)?;
                    write!(f, "{}", self.nested(param))?;
                }
                if !func.optional.is_empty() {
                    sep(f)?;
                    write!(f, "[")?;
                    for (i, (name, ty)) in func.optional.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{} {name}", self.nested(ty))?;
                    }
                    write!(f, "]")?;
                }
                if !func.named.is_empty() {
                    sep(f)?;
                    write!(f, "{{")?;
                    for (i, (name, ty)) in func.named.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{name}: {}", self.nested(ty))?;
                    }
                    write!(f, "}}")?;
                }
                if let Some(rest) = &func.rest {
                    sep(f)?;
                    write!(f, "...{}", self.nested(rest))?;
                }
                write!(f, ") -> {}", self.nested(&func.return_type))
            }
            TypeRepr::Variable(element) => write!(f, "{}", self.elements.name(*element)),
            TypeRepr::Union(members) => self.write_list(f, members, " | "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_ignores_quality() {
        let core = ElementTable::new();
        let int = core.core().int_type();
        assert_eq!(int, int.inferred());
        assert_eq!(int.inferred().quality(), Quality::Inferred);
        assert_eq!(int.inferred().exact().quality(), Quality::Exact);
    }

    #[test]
    fn test_raw_and_parameterized_are_distinct() {
        let table = ElementTable::new();
        let core = table.core();
        let raw = Type::interface(core.list, vec![]);
        let applied = core.list_of(core.int_type());
        assert_ne!(raw, applied);
        assert_eq!(applied, core.list_of(core.int_type()));
    }

    #[test]
    fn test_function_equality_respects_named_order() {
        let table = ElementTable::new();
        let core = table.core();
        let a = FunctionType::new(vec![], Type::void())
            .with_named("a", core.int_type())
            .with_named("b", core.string_type());
        let b = FunctionType::new(vec![], Type::void())
            .with_named("b", core.string_type())
            .with_named("a", core.int_type());
        assert_eq!(Type::function(a.clone()), Type::function(a.clone()));
        assert_ne!(Type::function(a), Type::function(b));
    }

    #[test]
    fn test_function_equality_respects_rest_and_element() {
        let table = ElementTable::new();
        let core = table.core();
        let plain = FunctionType::new(vec![core.int_type()], Type::void());
        let rest = plain.clone().with_rest(core.int_type());
        let owned = plain.clone().with_element(core.object);
        assert_ne!(Type::function(plain.clone()), Type::function(rest));
        assert_ne!(Type::function(plain), Type::function(owned));
    }

    #[test]
    fn test_display() {
        let table = ElementTable::new();
        let core = table.core();
        let map = core.map_of(core.string_type(), core.list_of(core.int_type()));
        assert_eq!(map.display(&table).to_string(), "Map<String, List<int>>");

        let func = FunctionType::new(vec![core.int_type()], Type::void())
            .with_optional("b", core.double_type())
            .with_named("c", core.bool_type());
        assert_eq!(
            Type::function(func).display(&table).to_string(),
            "(int, [double b], {c: bool}) -> void"
        );
        assert_eq!(Type::dynamic().display(&table).to_string(), "dynamic");
    }

    #[test]
    fn test_kind_tags() {
        let table = ElementTable::new();
        let core = table.core();
        assert_eq!(Type::dynamic().kind(), TypeKind::Dynamic);
        assert_eq!(Type::void().kind(), TypeKind::Void);
        assert_eq!(core.int_type().kind(), TypeKind::Interface);
        assert_eq!(
            Type::function(FunctionType::new(vec![], Type::void())).kind(),
            TypeKind::Function
        );
        assert_eq!(TypeKind::Variable.as_str(), "type variable");
    }
}
