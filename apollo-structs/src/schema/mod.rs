//! The type registry: every named type of a schema, including the `struct` and `structUnion`
//! kinds, plus the directive definitions the selection validator consults.
use std::ops::Deref;
use std::sync::Arc;

use apollo_compiler::Name;
use apollo_compiler::ast::Type;
use apollo_compiler::collections::IndexMap;
use apollo_compiler::collections::IndexSet;
use apollo_compiler::name;

use crate::error::StructError;

pub(crate) mod field_graph;
mod parser;
pub(crate) mod validators;

pub const TYPENAME_FIELD: Name = name!("__typename");

pub(crate) const BUILT_IN_SCALARS: [Name; 5] = [
    name!("Int"),
    name!("Float"),
    name!("String"),
    name!("Boolean"),
    name!("ID"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum TypeKind {
    #[strum(to_string = "a scalar")]
    Scalar,
    #[strum(to_string = "an enum")]
    Enum,
    #[strum(to_string = "an object type")]
    Object,
    #[strum(to_string = "an interface")]
    Interface,
    #[strum(to_string = "a union")]
    Union,
    #[strum(to_string = "an input object")]
    InputObject,
    #[strum(to_string = "a struct")]
    Struct,
    #[strum(to_string = "a struct union")]
    StructUnion,
}

impl TypeKind {
    /// Scalars and enums are always leaves. Structs and struct unions become leaves when
    /// selected without a sub-selection.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Scalar | Self::Enum)
    }

    pub fn is_struct_like(&self) -> bool {
        matches!(self, Self::Struct | Self::StructUnion)
    }

    /// Whether a struct field may reference a type of this kind.
    pub fn is_allowed_in_struct(&self) -> bool {
        self.is_leaf() || self.is_struct_like()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputValueDefinition {
    pub name: Name,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    pub name: Name,
    pub ty: Type,
    /// Always empty for a valid struct field.
    pub arguments: Vec<InputValueDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarType {
    pub name: Name,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumType {
    pub name: Name,
    pub values: IndexSet<Name>,
}

/// Object types, interfaces and input objects: anything with a field list that is not a struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldsType {
    pub name: Name,
    pub implements: Vec<Name>,
    pub fields: IndexMap<Name, FieldDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionType {
    pub name: Name,
    pub members: Vec<Name>,
}

/// A named composite type holding only leaf-compatible fields, valid on input and output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructType {
    pub name: Name,
    pub fields: IndexMap<Name, FieldDefinition>,
}

/// "One of a fixed set of structs". Members keep their declaration order, duplicates included,
/// so that validation can report them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructUnionType {
    pub name: Name,
    pub members: Vec<Name>,
}

impl StructUnionType {
    pub fn has_member(&self, name: &str) -> bool {
        self.members.iter().any(|member| *member == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDefinition {
    Scalar(ScalarType),
    Enum(EnumType),
    Object(FieldsType),
    Interface(FieldsType),
    Union(UnionType),
    InputObject(FieldsType),
    Struct(StructType),
    StructUnion(StructUnionType),
}

impl TypeDefinition {
    pub fn name(&self) -> &Name {
        match self {
            Self::Scalar(ty) => &ty.name,
            Self::Enum(ty) => &ty.name,
            Self::Object(ty) | Self::Interface(ty) | Self::InputObject(ty) => &ty.name,
            Self::Union(ty) => &ty.name,
            Self::Struct(ty) => &ty.name,
            Self::StructUnion(ty) => &ty.name,
        }
    }

    pub fn kind(&self) -> TypeKind {
        match self {
            Self::Scalar(_) => TypeKind::Scalar,
            Self::Enum(_) => TypeKind::Enum,
            Self::Object(_) => TypeKind::Object,
            Self::Interface(_) => TypeKind::Interface,
            Self::Union(_) => TypeKind::Union,
            Self::InputObject(_) => TypeKind::InputObject,
            Self::Struct(_) => TypeKind::Struct,
            Self::StructUnion(_) => TypeKind::StructUnion,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display, strum_macros::EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DirectiveLocation {
    Query,
    Mutation,
    Subscription,
    Field,
    FragmentDefinition,
    FragmentSpread,
    InlineFragment,
    VariableDefinition,
    Schema,
    Scalar,
    Object,
    FieldDefinition,
    ArgumentDefinition,
    Interface,
    Union,
    Enum,
    EnumValue,
    InputObject,
    InputFieldDefinition,
    /// A field selection inside a struct-scoped selection set.
    StructField,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveDefinition {
    pub name: Name,
    pub arguments: Vec<InputValueDefinition>,
    pub repeatable: bool,
    pub locations: Vec<DirectiveLocation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootOperations {
    pub query: Name,
    pub mutation: Option<Name>,
    pub subscription: Option<Name>,
}

impl Default for RootOperations {
    fn default() -> Self {
        Self {
            query: name!("Query"),
            mutation: None,
            subscription: None,
        }
    }
}

/// A schema as read from SDL. Nothing about its struct types has been checked yet; see
/// [`StructSchema::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructSchema {
    pub types: IndexMap<Name, TypeDefinition>,
    pub directives: IndexMap<Name, DirectiveDefinition>,
    pub root_operations: RootOperations,
}

impl Default for StructSchema {
    fn default() -> Self {
        let mut types = IndexMap::default();
        for name in BUILT_IN_SCALARS {
            types.insert(name.clone(), TypeDefinition::Scalar(ScalarType { name }));
        }
        Self {
            types,
            directives: IndexMap::default(),
            root_operations: RootOperations::default(),
        }
    }
}

impl StructSchema {
    /// Reads a schema definition document. Syntax errors and duplicate definitions are
    /// reported here, everything else by [`StructSchema::validate`].
    pub fn parse(source: &str) -> Result<Self, StructError> {
        parser::parse_schema(source)
    }

    /// Runs the type registry validator, collecting every problem with the declared struct and
    /// struct union types.
    pub fn validate(self) -> Result<ValidStructSchema, StructError> {
        validators::validate_struct_types(&self)?;
        Ok(ValidStructSchema(Arc::new(self)))
    }

    pub fn get_type(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    pub fn kind_of(&self, name: &str) -> Option<TypeKind> {
        self.types.get(name).map(TypeDefinition::kind)
    }

    pub fn get_struct(&self, name: &str) -> Option<&StructType> {
        match self.types.get(name)? {
            TypeDefinition::Struct(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn get_struct_union(&self, name: &str) -> Option<&StructUnionType> {
        match self.types.get(name)? {
            TypeDefinition::StructUnion(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn get_enum(&self, name: &str) -> Option<&EnumType> {
        match self.types.get(name)? {
            TypeDefinition::Enum(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn structs(&self) -> impl Iterator<Item = &StructType> {
        self.types.values().filter_map(|ty| match ty {
            TypeDefinition::Struct(ty) => Some(ty),
            _ => None,
        })
    }

    pub fn struct_unions(&self) -> impl Iterator<Item = &StructUnionType> {
        self.types.values().filter_map(|ty| match ty {
            TypeDefinition::StructUnion(ty) => Some(ty),
            _ => None,
        })
    }

    /// The output field `field_name` of an object type, interface or struct.
    pub fn field_definition(&self, type_name: &str, field_name: &str) -> Option<&FieldDefinition> {
        match self.types.get(type_name)? {
            TypeDefinition::Object(ty) | TypeDefinition::Interface(ty) => ty.fields.get(field_name),
            TypeDefinition::Struct(ty) => ty.fields.get(field_name),
            _ => None,
        }
    }
}

/// A schema whose struct and struct union types passed validation. Cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidStructSchema(Arc<StructSchema>);

impl ValidStructSchema {
    pub fn parse_and_validate(source: &str) -> Result<Self, StructError> {
        StructSchema::parse(source)?.validate()
    }

    pub fn schema(&self) -> &StructSchema {
        &self.0
    }
}

impl Deref for ValidStructSchema {
    type Target = StructSchema;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
