use apollo_compiler::Name;
use serde_json_bytes::Value;

use crate::schema::EnumType;

/// Coerces scalar and enum input values. Errors are plain messages; the caller attaches the
/// input path.
pub trait LeafCoercion {
    fn coerce_scalar(&self, scalar: &Name, value: &Value) -> Result<Value, String>;

    fn coerce_enum(&self, enum_type: &EnumType, value: &Value) -> Result<Value, String> {
        match value {
            Value::String(name) if enum_type.values.contains(name.as_str()) => Ok(value.clone()),
            _ => Err(format!(
                "Value {} does not exist in \"{}\" enum",
                render(value),
                enum_type.name
            )),
        }
    }
}

/// The built-in scalars. Custom scalars are passed through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinLeafCoercion;

impl LeafCoercion for BuiltinLeafCoercion {
    fn coerce_scalar(&self, scalar: &Name, value: &Value) -> Result<Value, String> {
        match (scalar.as_str(), value) {
            ("Int", Value::Number(number)) => match number.as_i64() {
                Some(int) if i32::try_from(int).is_ok() => Ok(value.clone()),
                Some(_) => Err(format!(
                    "Int cannot represent non 32-bit signed integer value: {number}"
                )),
                None => Err(format!("Int cannot represent non-integer value: {number}")),
            },
            ("Int", _) => Err(format!(
                "Int cannot represent non-integer value: {}",
                render(value)
            )),
            ("Float", Value::Number(_)) => Ok(value.clone()),
            ("Float", _) => Err(format!(
                "Float cannot represent non numeric value: {}",
                render(value)
            )),
            ("String", Value::String(_)) => Ok(value.clone()),
            ("String", _) => Err(format!(
                "String cannot represent a non string value: {}",
                render(value)
            )),
            ("Boolean", Value::Bool(_)) => Ok(value.clone()),
            ("Boolean", _) => Err(format!(
                "Boolean cannot represent a non boolean value: {}",
                render(value)
            )),
            ("ID", Value::String(_)) => Ok(value.clone()),
            ("ID", Value::Number(number)) if number.is_i64() || number.is_u64() => {
                Ok(Value::String(number.to_string().into()))
            }
            ("ID", _) => Err(format!("ID cannot represent value: {}", render(value))),
            _ => Ok(value.clone()),
        }
    }
}

pub(crate) fn render(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}
