//! Input coercion for struct and struct union values.
//!
//! A struct union input names its concrete member with `__typename`. Every problem is reported
//! with the path of the offending input value, and all of them are returned together.
use std::fmt::Display;
use std::fmt::Formatter;

use apollo_compiler::Name;
use apollo_compiler::ast::Type;
use apollo_compiler::collections::IndexMap;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map;
use serde_json_bytes::Value;
use tracing::debug;
use tracing::instrument;

use crate::config::StructConfig;
use crate::error::MultipleStructErrors;
use crate::error::SingleStructError;
use crate::error::StructError;
use crate::schema::StructSchema;
use crate::schema::StructType;
use crate::schema::StructUnionType;
use crate::schema::TYPENAME_FIELD;
use crate::schema::TypeDefinition;
use crate::schema::ValidStructSchema;

mod leaf;

pub use leaf::BuiltinLeafCoercion;
pub use leaf::LeafCoercion;
use leaf::render;

/// An input value after coercion against its declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoercedValue {
    Null,
    /// A scalar or enum value.
    Leaf(Value),
    List(Vec<CoercedValue>),
    Struct(StructValue),
}

/// A value of one concrete struct. Only the fields present in the input are set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructValue {
    pub type_name: Name,
    pub fields: IndexMap<Name, CoercedValue>,
}

impl CoercedValue {
    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            Self::Struct(value) => Some(value),
            _ => None,
        }
    }

    /// The JSON form of the value. Struct values carry their `__typename`, so the output is
    /// accepted again as input.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Leaf(value) => value.clone(),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Struct(value) => {
                let mut object = Map::new();
                object.insert(
                    ByteString::from(TYPENAME_FIELD.as_str()),
                    Value::String(value.type_name.as_str().into()),
                );
                for (name, field) in &value.fields {
                    object.insert(ByteString::from(name.as_str()), field.to_json());
                }
                Value::Object(object)
            }
        }
    }
}

impl StructValue {
    pub fn get(&self, field_name: &str) -> Option<&CoercedValue> {
        self.fields.get(field_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathElement {
    Key(String),
    Index(usize),
}

/// Where a value sits in the input, rendered as `input.content[1].text`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct InputPath(Vec<PathElement>);

impl InputPath {
    fn with_key(&self, key: &str) -> Self {
        let mut path = self.clone();
        path.0.push(PathElement::Key(key.to_string()));
        path
    }

    fn with_index(&self, index: usize) -> Self {
        let mut path = self.clone();
        path.0.push(PathElement::Index(index));
        path
    }
}

impl Display for InputPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (i, element) in self.0.iter().enumerate() {
            match element {
                PathElement::Key(key) if i == 0 => f.write_str(key)?,
                PathElement::Key(key) => write!(f, ".{key}")?,
                PathElement::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// Coerces raw input values against struct-aware types.
pub struct InputCoercer<'a> {
    schema: &'a StructSchema,
    config: StructConfig,
    leaves: &'a dyn LeafCoercion,
}

impl<'a> InputCoercer<'a> {
    pub fn new(schema: &'a ValidStructSchema) -> Self {
        Self {
            schema,
            config: StructConfig::default(),
            leaves: &BuiltinLeafCoercion,
        }
    }

    pub fn with_config(mut self, config: StructConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the coercion of scalars and enums.
    pub fn with_leaf_coercion(mut self, leaves: &'a dyn LeafCoercion) -> Self {
        self.leaves = leaves;
        self
    }

    /// Coerces `value`, named `name` in error paths, against `ty`.
    ///
    /// # Errors
    /// Every input coercion problem, each with the path of the offending value.
    #[instrument(level = "trace", skip(self, ty, value))]
    pub fn coerce(
        &self,
        name: &str,
        ty: &Type,
        value: &Value,
    ) -> Result<CoercedValue, StructError> {
        let mut errors = MultipleStructErrors::new();
        let path = InputPath::default().with_key(name);
        let coerced = self.coerce_value(ty, value, &path, &mut errors);
        debug!(%ty, errors = errors.len(), "coerced input value");
        errors.into_result()?;
        coerced.ok_or_else(|| {
            crate::internal_error!("Coercion of \"{name}\" failed without an error")
        })
    }

    /// Finds the member of struct union `union_name` that the input object names with its
    /// `__typename`.
    pub fn resolve_union_member(
        &self,
        union_name: &str,
        value: &Value,
    ) -> Result<&'a StructType, StructError> {
        let schema = self.schema;
        let Some(union_type) = schema.get_struct_union(union_name) else {
            return Err(crate::internal_error!("\"{union_name}\" is not a struct union"));
        };
        let Value::Object(object) = value else {
            return Err(SingleStructError::InvalidInputValue {
                path: union_name.to_string(),
                message: format!(
                    "Expected an object for \"{union_name}\", found {}",
                    render(value)
                ),
            }
            .into());
        };
        let path = InputPath::default().with_key(union_name);
        Ok(self.discriminate(union_type, object, &path)?)
    }

    fn coerce_value(
        &self,
        ty: &Type,
        value: &Value,
        path: &InputPath,
        errors: &mut MultipleStructErrors,
    ) -> Option<CoercedValue> {
        if value.is_null() {
            if ty.is_non_null() {
                errors.push(SingleStructError::InvalidInputValue {
                    path: path.to_string(),
                    message: format!("Expected a non-null value of type \"{ty}\""),
                });
                return None;
            }
            return Some(CoercedValue::Null);
        }
        match ty {
            Type::Named(name) | Type::NonNullNamed(name) => {
                self.coerce_named(name, value, path, errors)
            }
            Type::List(item) | Type::NonNullList(item) => match value {
                Value::Array(items) => {
                    let mut coerced = Vec::with_capacity(items.len());
                    for (index, item_value) in items.iter().enumerate() {
                        let item_path = path.with_index(index);
                        coerced.push(self.coerce_value(item, item_value, &item_path, errors));
                    }
                    coerced
                        .into_iter()
                        .collect::<Option<Vec<_>>>()
                        .map(CoercedValue::List)
                }
                // A single value where a list is expected is a list of one.
                _ => self
                    .coerce_value(item, value, path, errors)
                    .map(|item| CoercedValue::List(vec![item])),
            },
        }
    }

    fn coerce_named(
        &self,
        type_name: &Name,
        value: &Value,
        path: &InputPath,
        errors: &mut MultipleStructErrors,
    ) -> Option<CoercedValue> {
        let invalid = |message: String| SingleStructError::InvalidInputValue {
            path: path.to_string(),
            message,
        };
        match self.schema.get_type(type_name) {
            Some(TypeDefinition::Scalar(_)) => match self.leaves.coerce_scalar(type_name, value) {
                Ok(value) => Some(CoercedValue::Leaf(value)),
                Err(message) => {
                    errors.push(invalid(message));
                    None
                }
            },
            Some(TypeDefinition::Enum(enum_type)) => {
                match self.leaves.coerce_enum(enum_type, value) {
                    Ok(value) => Some(CoercedValue::Leaf(value)),
                    Err(message) => {
                        errors.push(invalid(message));
                        None
                    }
                }
            }
            Some(TypeDefinition::Struct(struct_type)) => {
                let Value::Object(object) = value else {
                    errors.push(invalid(format!(
                        "Expected an object for struct \"{type_name}\", found {}",
                        render(value)
                    )));
                    return None;
                };
                if let Some(declared) = object.get(TYPENAME_FIELD.as_str()) {
                    if declared.as_str() != Some(type_name.as_str()) {
                        errors.push(SingleStructError::TypeMismatch {
                            path: path.to_string(),
                            expected: type_name.clone(),
                            found: discriminator_text(declared),
                        });
                        return None;
                    }
                }
                self.coerce_struct_fields(struct_type, object, path, errors)
            }
            Some(TypeDefinition::StructUnion(union_type)) => {
                let Value::Object(object) = value else {
                    errors.push(invalid(format!(
                        "Expected an object for struct union \"{type_name}\", found {}",
                        render(value)
                    )));
                    return None;
                };
                match self.discriminate(union_type, object, path) {
                    Ok(member) => self.coerce_struct_fields(member, object, path, errors),
                    Err(error) => {
                        errors.push(error);
                        None
                    }
                }
            }
            Some(other) => {
                errors.push(invalid(format!(
                    "\"{type_name}\" is {} and cannot be coerced as struct input",
                    other.kind()
                )));
                None
            }
            None => {
                errors.push(invalid(format!("Unknown type \"{type_name}\"")));
                None
            }
        }
    }

    fn discriminate(
        &self,
        union_type: &StructUnionType,
        object: &Map<ByteString, Value>,
        path: &InputPath,
    ) -> Result<&'a StructType, SingleStructError> {
        let discriminator = match object.get(TYPENAME_FIELD.as_str()) {
            None | Some(Value::Null) => {
                return Err(SingleStructError::MissingDiscriminator {
                    path: path.to_string(),
                    union_name: union_type.name.clone(),
                });
            }
            Some(value) => value,
        };
        let member = discriminator
            .as_str()
            .filter(|name| union_type.has_member(name))
            .and_then(|name| self.schema.get_struct(name));
        member.ok_or_else(|| SingleStructError::UnknownDiscriminator {
            path: path.to_string(),
            union_name: union_type.name.clone(),
            discriminator: discriminator_text(discriminator),
        })
    }

    fn coerce_struct_fields(
        &self,
        struct_type: &StructType,
        object: &Map<ByteString, Value>,
        path: &InputPath,
        errors: &mut MultipleStructErrors,
    ) -> Option<CoercedValue> {
        let errors_before = errors.len();
        if self.config.reject_unknown_input_fields {
            for key in object.keys() {
                let key = key.as_str();
                if key != TYPENAME_FIELD.as_str() && !struct_type.fields.contains_key(key) {
                    errors.push(SingleStructError::UnknownInputField {
                        path: path.to_string(),
                        type_name: struct_type.name.clone(),
                        field_name: key.to_string(),
                    });
                }
            }
        }

        let mut fields = IndexMap::default();
        for field in struct_type.fields.values() {
            match object.get(field.name.as_str()) {
                Some(value) => {
                    let field_path = path.with_key(&field.name);
                    let coerced = self.coerce_value(&field.ty, value, &field_path, errors);
                    if let Some(coerced) = coerced {
                        fields.insert(field.name.clone(), coerced);
                    }
                }
                None if field.ty.is_non_null() => {
                    errors.push(SingleStructError::MissingRequiredField {
                        path: path.to_string(),
                        type_name: struct_type.name.clone(),
                        field_name: field.name.clone(),
                    });
                }
                None => {}
            }
        }

        (errors.len() == errors_before).then(|| {
            CoercedValue::Struct(StructValue {
                type_name: struct_type.name.clone(),
                fields,
            })
        })
    }
}

fn discriminator_text(value: &Value) -> String {
    match value.as_str() {
        Some(name) => name.to_string(),
        None => render(value),
    }
}

/// Coerces `value` against `ty` with the built-in leaf coercion.
pub fn coerce_input(
    schema: &ValidStructSchema,
    name: &str,
    ty: &Type,
    value: &Value,
    config: StructConfig,
) -> Result<CoercedValue, StructError> {
    InputCoercer::new(schema).with_config(config).coerce(name, ty, value)
}
