//! Element (symbol) model.
//!
//! Elements are the resolved declarations the checker reasons about:
//! classes, methods, constructors, fields, variables, parameters, type
//! variables and function aliases. They live in an [`ElementTable`] arena and
//! are addressed by [`ElementId`]. The checker only reads elements; declared
//! types are already attached by the resolver.

use serde::{Deserialize, Serialize};

mod builtins;

pub use builtins::CoreTypes;

use crate::ast::{Literal, Span};
use crate::types::{FunctionType, InterfaceType, Type};

/// Handle of an element in an [`ElementTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub u32);

/// Library a declaration belongs to; privacy is library-scoped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LibraryId(pub u32);

impl LibraryId {
    pub const CORE: LibraryId = LibraryId(0);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Class,
    Method,
    Constructor,
    Field,
    Variable,
    Parameter,
    TypeVariable,
    FunctionAlias,
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Class => "class",
            ElementKind::Method => "method",
            ElementKind::Constructor => "constructor",
            ElementKind::Field => "field",
            ElementKind::Variable => "variable",
            ElementKind::Parameter => "parameter",
            ElementKind::TypeVariable => "type variable",
            ElementKind::FunctionAlias => "function alias",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_final: bool,
    pub is_getter: bool,
    pub is_setter: bool,
    pub is_factory: bool,
}

impl Modifiers {
    pub fn static_() -> Self {
        Modifiers {
            is_static: true,
            ..Default::default()
        }
    }

    pub fn abstract_() -> Self {
        Modifiers {
            is_abstract: true,
            ..Default::default()
        }
    }

    pub fn final_() -> Self {
        Modifiers {
            is_final: true,
            ..Default::default()
        }
    }

    pub fn factory() -> Self {
        Modifiers {
            is_factory: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassInfo {
    pub supertype: Option<Type>,
    pub interfaces: Vec<Type>,
    pub type_parameters: Vec<ElementId>,
    /// Legacy "interface with default implementation" binding
    pub default_class: Option<Type>,
    pub members: Vec<ElementId>,
    pub constructors: Vec<ElementId>,
    pub is_interface: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodInfo {
    pub parameters: Vec<ElementId>,
}

/// Fields declared through accessors have `is_property` set; their getter
/// and setter live outside the member list, either linked here or found on
/// the holder under the `get:`/`set:` prefixed names.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldInfo {
    pub getter: Option<ElementId>,
    pub setter: Option<ElementId>,
    pub is_property: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterInfo {
    pub is_named: bool,
    pub is_optional: bool,
    pub default_value: Option<Literal>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeVariableInfo {
    pub bound: Option<Type>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasInfo {
    pub type_parameters: Vec<ElementId>,
    pub function_type: FunctionType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElementDetail {
    None,
    Class(ClassInfo),
    Method(MethodInfo),
    Field(FieldInfo),
    Parameter(ParameterInfo),
    TypeVariable(TypeVariableInfo),
    Alias(AliasInfo),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub name: String,
    pub kind: ElementKind,
    /// Declared type: the this-type for classes, the signature for methods
    /// and constructors, the value type for fields, variables and parameters
    pub ty: Type,
    #[serde(default)]
    pub enclosing: Option<ElementId>,
    #[serde(default)]
    pub library: LibraryId,
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub span: Span,
    pub detail: ElementDetail,
}

impl Element {
    pub fn is_static(&self) -> bool {
        self.modifiers.is_static
    }

    pub fn is_abstract(&self) -> bool {
        self.modifiers.is_abstract
    }

    pub fn is_private(&self) -> bool {
        self.name.starts_with('_')
    }

    pub fn is_method(&self) -> bool {
        self.kind == ElementKind::Method
    }

    pub fn is_field(&self) -> bool {
        self.kind == ElementKind::Field
    }

    pub fn class_info(&self) -> Option<&ClassInfo> {
        match &self.detail {
            ElementDetail::Class(info) => Some(info),
            _ => None,
        }
    }

    pub fn method_info(&self) -> Option<&MethodInfo> {
        match &self.detail {
            ElementDetail::Method(info) => Some(info),
            _ => None,
        }
    }

    pub fn field_info(&self) -> Option<&FieldInfo> {
        match &self.detail {
            ElementDetail::Field(info) => Some(info),
            _ => None,
        }
    }

    pub fn parameter_info(&self) -> Option<&ParameterInfo> {
        match &self.detail {
            ElementDetail::Parameter(info) => Some(info),
            _ => None,
        }
    }

    pub fn alias_info(&self) -> Option<&AliasInfo> {
        match &self.detail {
            ElementDetail::Alias(info) => Some(info),
            _ => None,
        }
    }

    /// Interfaces are abstract by nature
    pub fn is_interface(&self) -> bool {
        self.class_info().is_some_and(|info| info.is_interface)
    }
}

/// How a parameter binds at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamKind {
    Required,
    Optional,
    Named,
}

/// Parameter description used by the builder methods.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub ty: Type,
    pub kind: ParamKind,
    pub default_value: Option<Literal>,
}

impl ParamSpec {
    pub fn required(name: impl Into<String>, ty: Type) -> Self {
        ParamSpec {
            name: name.into(),
            ty,
            kind: ParamKind::Required,
            default_value: None,
        }
    }

    pub fn optional(name: impl Into<String>, ty: Type) -> Self {
        ParamSpec {
            kind: ParamKind::Optional,
            ..Self::required(name, ty)
        }
    }

    pub fn named(name: impl Into<String>, ty: Type) -> Self {
        ParamSpec {
            kind: ParamKind::Named,
            ..Self::required(name, ty)
        }
    }

    pub fn with_default(mut self, value: Literal) -> Self {
        self.default_value = Some(value);
        self
    }
}

/// Arena of elements, bootstrapped with the core library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementTable {
    elements: Vec<Element>,
    core: CoreTypes,
    next_library: u32,
}

impl Default for ElementTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ElementTable {
    /// Create a table holding only the core library.
    pub fn new() -> Self {
        builtins::bootstrap()
    }

    pub fn core(&self) -> &CoreTypes {
        &self.core
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains(&self, id: ElementId) -> bool {
        (id.0 as usize) < self.elements.len()
    }

    /// Panics on ids that did not come from this table.
    pub fn get(&self, id: ElementId) -> &Element {
        &self.elements[id.0 as usize]
    }

    pub fn lookup(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: ElementId) -> &mut Element {
        &mut self.elements[id.0 as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = (ElementId, &Element)> {
        self.elements
            .iter()
            .enumerate()
            .map(|(i, element)| (ElementId(i as u32), element))
    }

    pub fn name(&self, id: ElementId) -> &str {
        self.lookup(id).map_or("<unknown>", |element| element.name.as_str())
    }

    pub fn class_info(&self, id: ElementId) -> Option<&ClassInfo> {
        self.lookup(id).and_then(Element::class_info)
    }

    pub fn type_variable_bound(&self, id: ElementId) -> Option<&Type> {
        match &self.lookup(id)?.detail {
            ElementDetail::TypeVariable(info) => info.bound.as_ref(),
            _ => None,
        }
    }

    /// Type parameters of a class or alias, as variable types.
    pub fn type_parameter_types(&self, id: ElementId) -> Vec<Type> {
        let params = match self.lookup(id).map(|element| &element.detail) {
            Some(ElementDetail::Class(info)) => &info.type_parameters,
            Some(ElementDetail::Alias(info)) => &info.type_parameters,
            _ => return Vec::new(),
        };
        params.iter().map(|param| Type::variable(*param)).collect()
    }

    /// The class applied to its own type parameters.
    pub fn this_type(&self, class: ElementId) -> Type {
        Type::interface(class, self.type_parameter_types(class))
    }

    /// First member of `class` named `name`, not looking at ancestors.
    pub fn own_member(&self, class: ElementId, name: &str) -> Option<ElementId> {
        self.class_info(class)?
            .members
            .iter()
            .copied()
            .find(|member| self.lookup(*member).is_some_and(|element| element.name == name))
    }

    /// Constructor of `class` named `name`; the unnamed constructor is `""`.
    pub fn constructor(&self, class: ElementId, name: &str) -> Option<ElementId> {
        self.class_info(class)?
            .constructors
            .iter()
            .copied()
            .find(|ctor| self.lookup(*ctor).is_some_and(|element| element.name == name))
    }

    /// Parameters of a method or constructor, as elements.
    pub fn parameters(&self, method: ElementId) -> &[ElementId] {
        self.lookup(method)
            .and_then(Element::method_info)
            .map_or(&[], |info| info.parameters.as_slice())
    }

    /// The function type a method, constructor or function-typed value
    /// declares.
    pub fn function_type(&self, id: ElementId) -> Option<&FunctionType> {
        self.lookup(id)?.ty.as_function()
    }

    pub fn new_library(&mut self) -> LibraryId {
        self.next_library += 1;
        LibraryId(self.next_library)
    }

    fn push(&mut self, element: Element) -> ElementId {
        let id = ElementId(self.elements.len() as u32);
        self.elements.push(element);
        id
    }

    fn class_info_mut(&mut self, class: ElementId) -> Option<&mut ClassInfo> {
        match &mut self.get_mut(class).detail {
            ElementDetail::Class(info) => Some(info),
            _ => None,
        }
    }

    fn add_class_like(&mut self, name: &str, library: LibraryId, is_interface: bool) -> ElementId {
        let supertype = (!is_interface).then(|| self.core.object_type());
        let id = self.push(Element {
            name: name.to_string(),
            kind: ElementKind::Class,
            ty: Type::dynamic(),
            enclosing: None,
            library,
            modifiers: Modifiers::default(),
            span: Span::default(),
            detail: ElementDetail::Class(ClassInfo {
                supertype,
                is_interface,
                ..Default::default()
            }),
        });
        self.get_mut(id).ty = Type::interface(id, Vec::new());
        id
    }

    /// Add a class extending `Object`.
    pub fn add_class(&mut self, name: &str, library: LibraryId) -> ElementId {
        self.add_class_like(name, library, false)
    }

    /// Add an interface; interfaces have no supertype and all their members
    /// are abstract.
    pub fn add_interface(&mut self, name: &str, library: LibraryId) -> ElementId {
        self.add_class_like(name, library, true)
    }

    pub fn set_abstract(&mut self, class: ElementId) {
        self.get_mut(class).modifiers.is_abstract = true;
    }

    pub fn set_span(&mut self, id: ElementId, span: Span) {
        self.get_mut(id).span = span;
    }

    pub fn set_supertype(&mut self, class: ElementId, supertype: Type) {
        if let Some(info) = self.class_info_mut(class) {
            info.supertype = Some(supertype);
        }
    }

    pub fn add_implemented(&mut self, class: ElementId, interface: Type) {
        if let Some(info) = self.class_info_mut(class) {
            info.interfaces.push(interface);
        }
    }

    pub fn set_default_class(&mut self, interface: ElementId, default_class: Type) {
        if let Some(info) = self.class_info_mut(interface) {
            info.default_class = Some(default_class);
        }
    }

    /// Add a free-standing type variable (method-level or alias-level).
    pub fn add_type_variable(&mut self, name: &str, bound: Option<Type>) -> ElementId {
        let id = self.push(Element {
            name: name.to_string(),
            kind: ElementKind::TypeVariable,
            ty: Type::dynamic(),
            enclosing: None,
            library: LibraryId::CORE,
            modifiers: Modifiers::default(),
            span: Span::default(),
            detail: ElementDetail::TypeVariable(TypeVariableInfo { bound }),
        });
        self.get_mut(id).ty = Type::variable(id);
        id
    }

    pub fn set_type_variable_bound(&mut self, variable: ElementId, bound: Type) {
        if let ElementDetail::TypeVariable(info) = &mut self.get_mut(variable).detail {
            info.bound = Some(bound);
        }
    }

    /// Add a type parameter to `class`, extending its this-type.
    pub fn add_class_type_parameter(
        &mut self,
        class: ElementId,
        name: &str,
        bound: Option<Type>,
    ) -> ElementId {
        let library = self.get(class).library;
        let variable = self.add_type_variable(name, bound);
        {
            let element = self.get_mut(variable);
            element.enclosing = Some(class);
            element.library = library;
        }
        if let Some(info) = self.class_info_mut(class) {
            info.type_parameters.push(variable);
        }
        let this_type = self.this_type(class);
        self.get_mut(class).ty = this_type;
        variable
    }

    /// Add a function alias standing for `function_type`.
    pub fn add_alias(
        &mut self,
        name: &str,
        library: LibraryId,
        type_parameters: Vec<ElementId>,
        function_type: FunctionType,
    ) -> ElementId {
        let arguments = type_parameters.iter().map(|p| Type::variable(*p)).collect();
        let id = self.push(Element {
            name: name.to_string(),
            kind: ElementKind::FunctionAlias,
            ty: Type::dynamic(),
            enclosing: None,
            library,
            modifiers: Modifiers::default(),
            span: Span::default(),
            detail: ElementDetail::Alias(AliasInfo {
                type_parameters,
                function_type,
            }),
        });
        self.get_mut(id).ty = Type::alias(id, arguments);
        id
    }

    fn add_parameters(&mut self, owner: ElementId, params: Vec<ParamSpec>) -> FunctionType {
        let library = self.get(owner).library;
        let mut ids = Vec::with_capacity(params.len());
        let mut function = FunctionType::new(Vec::new(), Type::dynamic()).with_element(owner);
        for param in params {
            match param.kind {
                ParamKind::Required => function.parameters.push(param.ty.clone()),
                ParamKind::Optional => {
                    function.optional.insert(param.name.clone(), param.ty.clone());
                }
                ParamKind::Named => {
                    function.named.insert(param.name.clone(), param.ty.clone());
                }
            }
            ids.push(self.push(Element {
                name: param.name,
                kind: ElementKind::Parameter,
                ty: param.ty,
                enclosing: Some(owner),
                library,
                modifiers: Modifiers::default(),
                span: Span::default(),
                detail: ElementDetail::Parameter(ParameterInfo {
                    is_named: param.kind == ParamKind::Named,
                    is_optional: param.kind != ParamKind::Required,
                    default_value: param.default_value,
                }),
            }));
        }
        if let ElementDetail::Method(info) = &mut self.get_mut(owner).detail {
            info.parameters = ids;
        }
        function
    }

    /// Add a method to `owner` (a class), or a top-level function when
    /// `owner` is `None`.
    pub fn add_method(
        &mut self,
        owner: Option<ElementId>,
        library: LibraryId,
        name: &str,
        params: Vec<ParamSpec>,
        return_type: Type,
        modifiers: Modifiers,
    ) -> ElementId {
        let library = owner.map_or(library, |owner| self.get(owner).library);
        let id = self.push(Element {
            name: name.to_string(),
            kind: ElementKind::Method,
            ty: Type::dynamic(),
            enclosing: owner,
            library,
            modifiers,
            span: Span::default(),
            detail: ElementDetail::Method(MethodInfo::default()),
        });
        let mut function = self.add_parameters(id, params);
        function.return_type = return_type;
        self.get_mut(id).ty = Type::function(function);
        if let Some(owner) = owner
            && let Some(info) = self.class_info_mut(owner)
        {
            info.members.push(id);
        }
        id
    }

    /// Add a constructor to `class`. The unnamed constructor is `""`.
    pub fn add_constructor(
        &mut self,
        class: ElementId,
        name: &str,
        params: Vec<ParamSpec>,
        modifiers: Modifiers,
    ) -> ElementId {
        let library = self.get(class).library;
        let id = self.push(Element {
            name: name.to_string(),
            kind: ElementKind::Constructor,
            ty: Type::dynamic(),
            enclosing: Some(class),
            library,
            modifiers,
            span: Span::default(),
            detail: ElementDetail::Method(MethodInfo::default()),
        });
        let mut function = self.add_parameters(id, params);
        function.return_type = self.this_type(class);
        self.get_mut(id).ty = Type::function(function);
        if let Some(info) = self.class_info_mut(class) {
            info.constructors.push(id);
        }
        id
    }

    /// Add a plain field to `class`.
    pub fn add_field(&mut self, class: ElementId, name: &str, ty: Type, modifiers: Modifiers) -> ElementId {
        let library = self.get(class).library;
        let id = self.push(Element {
            name: name.to_string(),
            kind: ElementKind::Field,
            ty,
            enclosing: Some(class),
            library,
            modifiers,
            span: Span::default(),
            detail: ElementDetail::Field(FieldInfo::default()),
        });
        if let Some(info) = self.class_info_mut(class) {
            info.members.push(id);
        }
        id
    }

    fn property(&mut self, class: ElementId, name: &str, ty: &Type, modifiers: Modifiers) -> ElementId {
        if let Some(existing) = self.own_member(class, name)
            && self.get(existing).field_info().is_some_and(|info| info.is_property)
        {
            return existing;
        }
        let field = self.add_field(class, name, ty.clone(), modifiers);
        if let ElementDetail::Field(info) = &mut self.get_mut(field).detail {
            info.is_property = true;
        }
        field
    }

    /// Declare a getter; creates (or extends) the property field `name`.
    pub fn add_getter(&mut self, class: ElementId, name: &str, ty: Type, modifiers: Modifiers) -> ElementId {
        let field = self.property(class, name, &ty, modifiers);
        let library = self.get(class).library;
        let getter = self.push(Element {
            name: format!("get:{name}"),
            kind: ElementKind::Method,
            ty: Type::function(FunctionType::new(Vec::new(), ty)),
            enclosing: Some(class),
            library,
            modifiers: Modifiers {
                is_getter: true,
                ..modifiers
            },
            span: Span::default(),
            detail: ElementDetail::Method(MethodInfo::default()),
        });
        if let ElementDetail::Field(info) = &mut self.get_mut(field).detail {
            info.getter = Some(getter);
        }
        field
    }

    /// Declare a setter; creates (or extends) the property field `name`.
    pub fn add_setter(&mut self, class: ElementId, name: &str, ty: Type, modifiers: Modifiers) -> ElementId {
        let field = self.property(class, name, &ty, modifiers);
        let library = self.get(class).library;
        let setter = self.push(Element {
            name: format!("set:{name}"),
            kind: ElementKind::Method,
            ty: Type::function(FunctionType::new(vec![ty], Type::void())),
            enclosing: Some(class),
            library,
            modifiers: Modifiers {
                is_setter: true,
                ..modifiers
            },
            span: Span::default(),
            detail: ElementDetail::Method(MethodInfo::default()),
        });
        if let ElementDetail::Field(info) = &mut self.get_mut(field).detail {
            info.setter = Some(setter);
        }
        field
    }

    /// Add a local or top-level variable. An untyped declaration passes an
    /// inferred `dynamic`, which the checker refines from the initializer.
    pub fn add_variable(&mut self, enclosing: Option<ElementId>, library: LibraryId, name: &str, ty: Type) -> ElementId {
        self.push(Element {
            name: name.to_string(),
            kind: ElementKind::Variable,
            ty,
            enclosing,
            library,
            modifiers: Modifiers::default(),
            span: Span::default(),
            detail: ElementDetail::None,
        })
    }

    /// Raw view of an interface type: same element, no arguments.
    pub fn raw(&self, iface: &InterfaceType) -> InterfaceType {
        InterfaceType::new(iface.element, Vec::new())
    }
}
