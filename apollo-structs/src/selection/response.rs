//! Shaping struct values for a response.
use serde_json_bytes::ByteString;
use serde_json_bytes::Map;
use serde_json_bytes::Value;

use super::FieldSelections;
use super::StructSelection;
use super::StructSelectionSet;
use crate::coercion::CoercedValue;
use crate::coercion::StructValue;
use crate::schema::TYPENAME_FIELD;

impl StructSelection {
    /// Projects `value` onto this selection. `__typename` resolves to the concrete struct of the
    /// value, and selected fields absent from the value are `null`. An entire-value selection
    /// returns the value whole, `__typename` included.
    pub fn apply(&self, value: &CoercedValue) -> Value {
        match (self, value) {
            (_, CoercedValue::Null) => Value::Null,
            (_, CoercedValue::Leaf(leaf)) => leaf.clone(),
            (_, CoercedValue::List(items)) => {
                Value::Array(items.iter().map(|item| self.apply(item)).collect())
            }
            (StructSelection::EntireValue, CoercedValue::Struct(_)) => value.to_json(),
            (StructSelection::Narrowed(selection_set), CoercedValue::Struct(value)) => {
                selection_set.apply(value)
            }
        }
    }
}

impl StructSelectionSet {
    fn apply(&self, value: &StructValue) -> Value {
        match self {
            StructSelectionSet::Struct(fields) => fields.apply(value),
            StructSelectionSet::Union(union) => match union.members.get(&value.type_name) {
                Some(fields) => fields.apply(value),
                None => Value::Object(Map::new()),
            },
        }
    }
}

impl FieldSelections {
    fn apply(&self, value: &StructValue) -> Value {
        let mut object = Map::new();
        for (name, selection) in &self.fields {
            let field = if *name == TYPENAME_FIELD {
                Value::String(value.type_name.as_str().into())
            } else {
                value
                    .get(name)
                    .map_or(Value::Null, |field| selection.apply(field))
            };
            object.insert(ByteString::from(name.as_str()), field);
        }
        Value::Object(object)
    }
}
