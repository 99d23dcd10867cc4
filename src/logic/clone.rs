use crate::model::{from_property_map, to_property_map, CatalogEntity};
use serde_json::Value;

/// Defensive copies of property values handed out by modification proxies.
///
/// Scalars have value semantics and are returned as-is. Containers are
/// rebuilt element-wise into fresh containers so staged edits never alias
/// the original's storage. Anything deeper than the property map shapes the
/// entities serialize to is copied the same way, recursively.
pub struct Cloner;

impl Cloner {
    pub fn clone_value(value: &Value) -> Value {
        match value {
            Value::Null => Value::Null,
            Value::Bool(b) => Value::Bool(*b),
            Value::Number(n) => Value::Number(n.clone()),
            Value::String(s) => Value::String(s.clone()),
            Value::Array(items) => Value::Array(items.iter().map(Self::clone_value).collect()),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::clone_value(v)))
                    .collect(),
            ),
        }
    }

    /// Independent copy of a typed entity, via its property map. Falls back
    /// to plain `Clone` if the round trip fails, which for our full-shape
    /// entity structs it does not.
    pub fn clone_entity<E: CatalogEntity>(entity: &E) -> E {
        from_property_map(to_property_map(entity)).unwrap_or_else(|_| entity.clone())
    }
}
